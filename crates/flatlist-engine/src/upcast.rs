//! # Upcast Converter
//!
//! Turns list markup, from a file or pasted from elsewhere, into flat
//! blocks. Every `<li>` gets a fresh item id and every list block gets the
//! number of lists around it, minus one, as its indent.
//!
//! Foreign markup is often not shaped the way this crate writes it, so the
//! converter is lenient:
//!
//! - Text directly inside an `<li>` becomes an implicit paragraph.
//! - A list nested straight inside a list, with no `<li>` around it, hangs
//!   below the previous item (its indent is one more than its parent's).
//! - An `<li>` that opens with a nested list continues the previous item;
//!   if there is none, an empty paragraph stands in for the missing text.
//! - Content after a nested list inside the same `<li>` starts a new item.
//! - Text or blocks between items end the run as plain paragraphs.
//! - Empty items become empty paragraphs.
//! - Unknown wrappers are looked through, unknown inline elements keep
//!   their text.
//!
//! Text is taken as the parser hands it over: formatting whitespace around
//! block tags is already gone, and whatever is left (including whitespace
//! written as character references) is content, so marker offsets need no
//! rebasing.
//!
//! The output may still break the list invariants (for example an indent
//! jump from `<ul><ul>`); the postfixer repairs that once the blocks are in
//! a document.

use flatlist_markup::{Element, MarkupNode};

use crate::models::{
    Block, BlockId, BlockKind, IdGenerator, ItemId, ListAttributes, ListKind, ListStyle, MarkerBoundary,
};
use crate::view::render::{MARKER_END, MARKER_START, TODO_CLASS};

/// Convert a markup fragment into blocks.
pub fn upcast(nodes: &[MarkupNode], ids: &mut IdGenerator) -> Vec<Block> {
    let mut upcast = Upcast {
        ids,
        out: Vec::new(),
    };
    upcast.flow(nodes);
    log::trace!("upcast produced {} block(s)", upcast.out.len());
    upcast.out
}

/// Parse markup text and convert it.
pub fn upcast_str(markup: &str, ids: &mut IdGenerator) -> Vec<Block> {
    upcast(&flatlist_markup::parse(markup), ids)
}

/// The list an item sits in.
#[derive(Debug, Clone)]
struct ListContext {
    indent: usize,
    kind: ListKind,
    style: ListStyle,
}

/// Progress through the content of one `<li>`.
struct ItemState {
    list: ListContext,
    item: ItemId,
    /// A block was emitted for this item
    emitted: bool,
    /// A nested list was seen since the last block
    after_nested: bool,
}

/// Inline content collected until the next block boundary.
#[derive(Debug, Default)]
struct Pending {
    text: String,
    markers: Vec<MarkerBoundary>,
}

impl Pending {
    fn is_blank(&self) -> bool {
        self.text.is_empty() && self.markers.is_empty()
    }

    fn take(&mut self) -> Pending {
        std::mem::take(self)
    }

    fn into_block(self, id: BlockId, kind: BlockKind) -> Block {
        let mut block = Block::new(id, kind, self.text);
        block.markers = self.markers;
        block
    }
}

enum Shape {
    List,
    Item,
    Paragraph,
    Heading(u8),
    Table,
    Wrapper,
    Inline,
}

fn shape(element: &Element) -> Shape {
    match element.name.as_str() {
        "ul" | "ol" => Shape::List,
        "li" => Shape::Item,
        "p" => Shape::Paragraph,
        "h1" => Shape::Heading(1),
        "h2" => Shape::Heading(2),
        "h3" => Shape::Heading(3),
        "h4" => Shape::Heading(4),
        "h5" => Shape::Heading(5),
        "h6" => Shape::Heading(6),
        "table" => Shape::Table,
        "div" | "section" | "article" | "blockquote" | "thead" | "tbody" | "tfoot" | "tr"
        | "td" | "th" | "body" | "html" | "main" => Shape::Wrapper,
        _ => Shape::Inline,
    }
}

fn list_context(element: &Element, indent: usize) -> ListContext {
    let kind = match element.name.as_str() {
        "ol" => ListKind::Ordered,
        _ if element.has_class(TODO_CLASS) => ListKind::Todo,
        _ => ListKind::Unordered,
    };
    ListContext {
        indent,
        kind,
        style: ListStyle {
            marker: element.attr("type").map(str::to_string),
            start: element.attr("start").and_then(|s| s.trim().parse().ok()),
            reversed: element.has_attr("reversed"),
        },
    }
}

struct Upcast<'g> {
    ids: &'g mut IdGenerator,
    out: Vec<Block>,
}

impl Upcast<'_> {
    /// Content outside any item.
    fn flow(&mut self, nodes: &[MarkupNode]) {
        let mut pending = Pending::default();
        for node in nodes {
            let MarkupNode::Element(element) = node else {
                collect_inline(std::slice::from_ref(node), &mut pending);
                continue;
            };
            match shape(element) {
                Shape::Inline => collect_inline(std::slice::from_ref(node), &mut pending),
                Shape::Wrapper => {
                    self.flush_plain(&mut pending);
                    self.flow(&element.children);
                }
                Shape::List => {
                    self.flush_plain(&mut pending);
                    self.list(element, 0);
                }
                Shape::Item => {
                    self.flush_plain(&mut pending);
                    let list = ListContext {
                        indent: 0,
                        kind: ListKind::Unordered,
                        style: ListStyle::default(),
                    };
                    self.item(element, list);
                }
                Shape::Paragraph | Shape::Heading(_) | Shape::Table => {
                    self.flush_plain(&mut pending);
                    if let Some(block) = self.block(element) {
                        self.out.push(block);
                    }
                }
            }
        }
        self.flush_plain(&mut pending);
    }

    fn list(&mut self, element: &Element, indent: usize) {
        let context = list_context(element, indent);
        self.list_children(&element.children, &context);
    }

    fn list_children(&mut self, nodes: &[MarkupNode], context: &ListContext) {
        for node in nodes {
            match node {
                node if node.is_blank_text() => {}
                MarkupNode::Text(text) => {
                    // Stray text ends the run
                    let id = self.ids.block_id();
                    self.out.push(Block::paragraph(id, text.as_str()));
                }
                MarkupNode::Element(element) => match shape(element) {
                    Shape::Item => self.item(element, context.clone()),
                    Shape::List => self.list(element, context.indent + 1),
                    Shape::Wrapper => self.list_children(&element.children, context),
                    Shape::Paragraph | Shape::Heading(_) | Shape::Table => {
                        if let Some(block) = self.block(element) {
                            self.out.push(block);
                        }
                    }
                    Shape::Inline => {
                        let mut pending = Pending::default();
                        collect_inline(std::slice::from_ref(node), &mut pending);
                        self.flush_plain(&mut pending);
                    }
                },
            }
        }
    }

    fn item(&mut self, element: &Element, list: ListContext) {
        let item = self.ids.item_id();
        let mut state = ItemState {
            list,
            item,
            emitted: false,
            after_nested: false,
        };
        let mut pending = Pending::default();
        self.item_content(&element.children, &mut state, &mut pending);

        if !pending.is_blank() || (!state.emitted && !state.after_nested) {
            self.emit_paragraph(&mut state, pending.take());
        }
    }

    fn item_content(&mut self, nodes: &[MarkupNode], state: &mut ItemState, pending: &mut Pending) {
        for node in nodes {
            let MarkupNode::Element(element) = node else {
                collect_inline(std::slice::from_ref(node), pending);
                continue;
            };
            match shape(element) {
                Shape::Inline => collect_inline(std::slice::from_ref(node), pending),
                Shape::Wrapper => self.item_content(&element.children, state, pending),
                Shape::List | Shape::Item => {
                    if !pending.is_blank() || (!state.emitted && !self.has_item_at(state.list.indent)) {
                        self.emit_paragraph(state, pending.take());
                    }
                    *pending = Pending::default();
                    let indent = state.list.indent + 1;
                    if matches!(shape(element), Shape::List) {
                        self.list(element, indent);
                    } else {
                        let list = ListContext {
                            indent,
                            kind: ListKind::Unordered,
                            style: ListStyle::default(),
                        };
                        self.item(element, list);
                    }
                    state.after_nested = true;
                }
                Shape::Paragraph | Shape::Heading(_) | Shape::Table => {
                    if !pending.is_blank() {
                        self.emit_paragraph(state, pending.take());
                    }
                    *pending = Pending::default();
                    if let Some(block) = self.block(element) {
                        self.emit_in_item(state, block);
                    }
                }
            }
        }
    }

    /// Whether the last block emitted can adopt a list nested at `indent + 1`.
    fn has_item_at(&self, indent: usize) -> bool {
        self.out
            .last()
            .and_then(|b| b.list.as_ref())
            .is_some_and(|l| l.indent >= indent)
    }

    fn emit_paragraph(&mut self, state: &mut ItemState, pending: Pending) {
        let block = pending.into_block(self.ids.block_id(), BlockKind::Paragraph);
        self.emit_in_item(state, block);
    }

    fn emit_in_item(&mut self, state: &mut ItemState, block: Block) {
        if state.after_nested {
            state.item = self.ids.item_id();
            state.after_nested = false;
        }
        state.emitted = true;
        let list = ListAttributes::new(state.list.indent, state.item, state.list.kind)
            .with_style(state.list.style.clone());
        self.out.push(block.with_list(list));
    }

    fn flush_plain(&mut self, pending: &mut Pending) {
        let pending = pending.take();
        if pending.is_blank() {
            return;
        }
        let block = pending.into_block(self.ids.block_id(), BlockKind::Paragraph);
        self.out.push(block);
    }

    /// A paragraph, heading or table element as a block.
    fn block(&mut self, element: &Element) -> Option<Block> {
        let kind = match shape(element) {
            Shape::Paragraph => BlockKind::Paragraph,
            Shape::Heading(level) => BlockKind::Heading { level },
            Shape::Table => BlockKind::Table {
                rows: table_rows(element),
            },
            _ => return None,
        };
        let mut pending = Pending::default();
        if !matches!(kind, BlockKind::Table { .. }) {
            collect_inline(&element.children, &mut pending);
        }
        Some(pending.into_block(self.ids.block_id(), kind))
    }
}

/// Append the text and marker edges of inline nodes.
fn collect_inline(nodes: &[MarkupNode], pending: &mut Pending) {
    for node in nodes {
        match node {
            MarkupNode::Text(text) => pending.text.push_str(text),
            MarkupNode::Element(element) => {
                let offset = pending.text.chars().count();
                let name = || element.attr("name").unwrap_or_default().to_string();
                match element.name.as_str() {
                    MARKER_START => pending.markers.push(MarkerBoundary::start(name(), offset)),
                    MARKER_END => pending.markers.push(MarkerBoundary::end(name(), offset)),
                    "br" => pending.text.push('\n'),
                    _ => collect_inline(&element.children, pending),
                }
            }
        }
    }
}

fn table_rows(table: &Element) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    collect_rows(&table.children, &mut rows);
    rows
}

fn collect_rows(nodes: &[MarkupNode], rows: &mut Vec<Vec<String>>) {
    for element in nodes.iter().filter_map(MarkupNode::as_element) {
        match element.name.as_str() {
            "tr" => rows.push(
                element
                    .children
                    .iter()
                    .filter_map(MarkupNode::as_element)
                    .filter(|cell| cell.name == "td" || cell.name == "th")
                    .map(Element::text_content)
                    .collect(),
            ),
            _ => collect_rows(&element.children, rows),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn run(markup: &str) -> Vec<Block> {
        upcast_str(markup, &mut IdGenerator::sequential(1))
    }

    /// (indent, item id, text) per block; `-` for plain blocks.
    fn shape_of(blocks: &[Block]) -> Vec<String> {
        blocks
            .iter()
            .map(|b| match &b.list {
                Some(l) => format!("{} {} {}", l.indent, l.item_id, b.text),
                None => format!("- {}", b.text),
            })
            .collect()
    }

    #[test]
    fn nested_items_get_indents() {
        let blocks = run("<ul><li>A<ul><li>B</li></ul></li><li>C</li></ul>");
        let indents: Vec<_> = blocks.iter().map(|b| b.list.as_ref().unwrap().indent).collect();
        assert_eq!(indents, vec![0, 1, 0]);
        let texts: Vec<_> = blocks.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(texts, vec!["A", "B", "C"]);
    }

    #[test]
    fn every_item_gets_a_fresh_id() {
        let blocks = run("<ul><li>A</li><li>B</li></ul>");
        assert_ne!(
            blocks[0].list.as_ref().unwrap().item_id,
            blocks[1].list.as_ref().unwrap().item_id
        );
    }

    #[test]
    fn multi_block_item_shares_id() {
        let blocks = run("<ol><li><p>A</p><h2>B</h2></li></ol>");
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].list, blocks[1].list);
        assert_eq!(blocks[1].kind, BlockKind::Heading { level: 2 });
        assert_eq!(blocks[0].list.as_ref().unwrap().kind, ListKind::Ordered);
    }

    #[test]
    fn list_without_item_wrapper_is_one_level_deeper() {
        let blocks = run("<ul><ul><li>X</li></ul></ul>");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].list.as_ref().unwrap().indent, 1);
    }

    #[test]
    fn item_opening_with_nested_list_continues_previous_item() {
        let blocks = run("<ul><li>A</li><li><ul><li>B</li></ul></li></ul>");
        assert_eq!(shape_of(&blocks), vec!["0 1 A", "1 4 B"]);
    }

    #[test]
    fn first_item_opening_with_nested_list_gets_placeholder() {
        let blocks = run("<ul><li><ul><li>B</li></ul></li></ul>");
        assert_eq!(shape_of(&blocks), vec!["0 1 ", "1 3 B"]);
    }

    #[test]
    fn content_after_nested_list_starts_new_item() {
        let blocks = run("<ul><li>A<ul><li>B</li></ul>C</li></ul>");
        assert_eq!(shape_of(&blocks), vec!["0 1 A", "1 3 B", "0 6 C"]);
    }

    #[rstest]
    #[case::stray_text("<ul><li>A</li>stray<li>B</li></ul>", vec!["0 1 A", "- stray", "0 4 B"])]
    #[case::empty_item("<ul><li></li></ul>", vec!["0 1 "])]
    #[case::bare_item("<li>A</li>", vec!["0 1 A"])]
    #[case::wrapper("<div><ul><li>A</li></ul></div><p>B</p>", vec!["0 1 A", "- B"])]
    #[case::plain_text("hello", vec!["- hello"])]
    #[case::blank_text_dropped("<p>A</p>\n  <p>B</p>", vec!["- A", "- B"])]
    #[case::indented_markup("<ul>\n  <li>\n    A\n  </li>\n</ul>", vec!["0 1 A"])]
    fn degenerate_markup(#[case] markup: &str, #[case] expected: Vec<&str>) {
        assert_eq!(shape_of(&run(markup)), expected);
    }

    #[test]
    fn list_style_is_read() {
        let blocks = run("<ol type=\"a\" start=\"3\" reversed><li>A</li></ol><ul class=\"todo-list\"><li>T</li></ul>");
        let first = blocks[0].list.as_ref().unwrap();
        assert_eq!(first.style.marker.as_deref(), Some("a"));
        assert_eq!(first.style.start, Some(3));
        assert!(first.style.reversed);
        assert_eq!(blocks[1].list.as_ref().unwrap().kind, ListKind::Todo);
    }

    #[test]
    fn markers_become_offsets() {
        let blocks = run("<ul><li>ab<marker-start name=\"c\"></marker-start>cd<marker-end name=\"c\"></marker-end></li></ul>");
        assert_eq!(blocks[0].text, "abcd");
        assert_eq!(
            blocks[0].markers,
            vec![MarkerBoundary::start("c", 2), MarkerBoundary::end("c", 4)]
        );
    }

    #[test]
    fn unknown_inline_elements_keep_text() {
        let blocks = run("<p>a <b>bold</b> <span>c</span></p>");
        assert_eq!(blocks[0].text, "a bold c");
        assert_eq!(blocks[0].id, BlockId(1));
    }

    #[test]
    fn content_whitespace_survives() {
        let blocks = run("<ul><li>&#32;A&#32;</li><li>x&#10;</li></ul><p>&#32;&#32;p</p>");
        let texts: Vec<_> = blocks.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(texts, vec![" A ", "x\n", "  p"]);
    }

    #[test]
    fn markers_keep_offsets_next_to_whitespace() {
        let blocks = run("<p>&#32;<marker-start name=\"c\"></marker-start>a <marker-end name=\"c\"></marker-end>&#32;</p>");
        assert_eq!(blocks[0].text, " a  ");
        assert_eq!(
            blocks[0].markers,
            vec![MarkerBoundary::start("c", 1), MarkerBoundary::end("c", 3)]
        );
    }

    #[test]
    fn whitespace_only_item_is_not_merged_into_previous() {
        let blocks = run("<ul><li>A</li><li>&#32;<ul><li>B</li></ul></li></ul>");
        assert_eq!(shape_of(&blocks), vec!["0 1 A", "0 3  ", "1 5 B"]);
    }

    #[test]
    fn tables_keep_cell_text() {
        let blocks = run("<table><tbody><tr><th>h</th></tr><tr><td>a</td><td>b</td></tr></tbody></table>");
        assert_eq!(
            blocks[0].kind,
            BlockKind::Table {
                rows: vec![vec!["h".to_string()], vec!["a".to_string(), "b".to_string()]]
            }
        );
    }
}
