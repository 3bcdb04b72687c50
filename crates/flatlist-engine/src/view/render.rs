//! Render a view as list markup.
//!
//! | View node              | Markup                                  |
//! |------------------------|-----------------------------------------|
//! | List, unordered        | `<ul>`                                  |
//! | List, ordered          | `<ol>`                                  |
//! | List, todo             | `<ul class="todo-list">`                |
//! | Item                   | `<li>`                                  |
//! | Block, inline          | its text, straight inside the `<li>`    |
//! | Paragraph              | `<p>`                                   |
//! | Heading                | `<h1>` .. `<h6>`                        |
//! | Table                  | `<table><tr><td>`                       |
//!
//! Marker edges become empty `<marker-start name="..">` and
//! `<marker-end name="..">` elements at their offset.

use flatlist_markup::{Element, MarkupNode};

use crate::models::block::byte_offset;
use crate::models::{BlockKind, ListKind, ListStyle, MarkerBoundary, MarkerEdge};
use crate::view::{BlockView, ViewId, ViewKind, ViewTree};

pub const TODO_CLASS: &str = "todo-list";
pub const MARKER_START: &str = "marker-start";
pub const MARKER_END: &str = "marker-end";

/// Render the whole view.
pub fn to_markup(view: &ViewTree) -> Vec<MarkupNode> {
    view.children(view.root())
        .iter()
        .flat_map(|child| render_node(view, *child))
        .collect()
}

fn render_node(view: &ViewTree, id: ViewId) -> Vec<MarkupNode> {
    let Some(node) = view.node(id) else {
        return Vec::new();
    };
    let children = || -> Vec<MarkupNode> {
        node.children
            .iter()
            .flat_map(|child| render_node(view, *child))
            .collect()
    };
    match &node.kind {
        ViewKind::Root => children(),
        ViewKind::List { kind, style } => {
            vec![list_element(*kind, style).with_children(children()).into()]
        }
        ViewKind::Item { .. } => vec![Element::new("li").with_children(children()).into()],
        ViewKind::Block(block) if block.inline => inline_content(&block.text, &block.markers),
        ViewKind::Block(block) => vec![block_element(block).into()],
    }
}

fn list_element(kind: ListKind, style: &ListStyle) -> Element {
    let mut element = match kind {
        ListKind::Unordered => Element::new("ul"),
        ListKind::Ordered => Element::new("ol"),
        ListKind::Todo => Element::new("ul").with_attr("class", TODO_CLASS),
    };
    if let Some(marker) = &style.marker {
        element = element.with_attr("type", marker.as_str());
    }
    if let Some(start) = style.start {
        element = element.with_attr("start", start.to_string());
    }
    if style.reversed {
        element = element.with_attr("reversed", "");
    }
    element
}

fn block_element(block: &BlockView) -> Element {
    match &block.kind {
        BlockKind::Paragraph => {
            Element::new("p").with_children(inline_content(&block.text, &block.markers))
        }
        BlockKind::Heading { level } => Element::new(format!("h{}", (*level).clamp(1, 6)))
            .with_children(inline_content(&block.text, &block.markers)),
        BlockKind::Table { rows } => {
            let rows = rows.iter().map(|row| {
                let cells = row
                    .iter()
                    .map(|cell| MarkupNode::from(Element::new("td").with_text(cell.as_str())));
                MarkupNode::from(Element::new("tr").with_children(cells))
            });
            Element::new("table").with_children(rows)
        }
    }
}

/// Text split at marker offsets, with a marker element at each edge.
pub fn inline_content(text: &str, markers: &[MarkerBoundary]) -> Vec<MarkupNode> {
    let mut out = Vec::new();
    let mut written = 0;
    for marker in markers {
        let at = byte_offset(text, marker.offset).max(written);
        if at > written {
            out.push(MarkupNode::text(&text[written..at]));
            written = at;
        }
        let name = match marker.edge {
            MarkerEdge::Start => MARKER_START,
            MarkerEdge::End => MARKER_END,
        };
        out.push(Element::new(name).with_attr("name", marker.name.as_str()).into());
    }
    if written < text.len() {
        out.push(MarkupNode::text(&text[written..]));
    }
    out
}
