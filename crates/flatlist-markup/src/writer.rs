//! Serialise markup fragments back to text.
//!
//! [`write`] produces compact output. [`write_pretty`] puts every block-level
//! element whose children are all block-level on its own lines; elements
//! with inline content are written compactly so the text reads back
//! unchanged.
//!
//! The parser drops raw whitespace next to block-level tags, so whitespace
//! at those edges of a text node is written as character references
//! (`&#32;`, `&#10;`) to keep it.

use std::fmt::Write;

use crate::node::{Element, MarkupNode, is_block_element, is_void_element};

/// Write nodes without any added whitespace.
pub fn write(nodes: &[MarkupNode]) -> String {
    let mut out = String::new();
    write_nodes(&mut out, nodes, true);
    out
}

/// Write nodes with one block element per line, indented by `indent_width`
/// spaces per nesting level.
pub fn write_pretty(nodes: &[MarkupNode], indent_width: usize) -> String {
    let mut out = String::new();
    for node in nodes {
        write_block(&mut out, node, 0, indent_width);
    }
    out
}

/// Write sibling nodes. `edges_are_blocks` says whether the tags around
/// them (the parent's, or the ends of the input) are block-level.
fn write_nodes(out: &mut String, nodes: &[MarkupNode], edges_are_blocks: bool) {
    for (i, node) in nodes.iter().enumerate() {
        match node {
            MarkupNode::Text(text) => {
                let lead = i
                    .checked_sub(1)
                    .map_or(edges_are_blocks, |prev| is_block_node(&nodes[prev]));
                let trail = nodes.get(i + 1).map_or(edges_are_blocks, is_block_node);
                write_text(out, text, lead, trail);
            }
            MarkupNode::Element(element) => write_element(out, element),
        }
    }
}

fn write_element(out: &mut String, element: &Element) {
    open_tag(out, element);
    if is_void_element(&element.name) {
        return;
    }
    write_nodes(out, &element.children, is_block_element(&element.name));
    close_tag(out, element);
}

fn is_block_node(node: &MarkupNode) -> bool {
    matches!(node, MarkupNode::Element(e) if is_block_element(&e.name))
}

/// Escape text, encoding the whitespace at block edges.
fn write_text(out: &mut String, text: &str, lead: bool, trail: bool) {
    let is_space = |c: char| c.is_ascii_whitespace();
    let start = if lead {
        text.len() - text.trim_start_matches(is_space).len()
    } else {
        0
    };
    let end = if trail {
        text.trim_end_matches(is_space).len()
    } else {
        text.len()
    }
    .max(start);
    encode_spaces(out, &text[..start]);
    out.push_str(&html_escape::encode_text(&text[start..end]));
    encode_spaces(out, &text[end..]);
}

fn encode_spaces(out: &mut String, spaces: &str) {
    for c in spaces.chars() {
        let _ = write!(out, "&#{};", u32::from(c));
    }
}

fn write_block(out: &mut String, node: &MarkupNode, depth: usize, indent_width: usize) {
    let pad = " ".repeat(depth * indent_width);
    match node {
        MarkupNode::Element(element) if has_only_block_children(element) => {
            out.push_str(&pad);
            open_tag(out, element);
            out.push('\n');
            for child in &element.children {
                write_block(out, child, depth + 1, indent_width);
            }
            out.push_str(&pad);
            close_tag(out, element);
            out.push('\n');
        }
        MarkupNode::Element(element) => {
            out.push_str(&pad);
            write_element(out, element);
            out.push('\n');
        }
        MarkupNode::Text(text) => {
            out.push_str(&pad);
            write_text(out, text, true, true);
            out.push('\n');
        }
    }
}

fn has_only_block_children(element: &Element) -> bool {
    !element.children.is_empty()
        && element.children.iter().all(|child| match child {
            MarkupNode::Element(e) => is_block_element(&e.name),
            MarkupNode::Text(_) => false,
        })
}

fn open_tag(out: &mut String, element: &Element) {
    out.push('<');
    out.push_str(&element.name);
    for (key, value) in &element.attrs {
        if value.is_empty() {
            let _ = write!(out, " {key}");
        } else {
            let _ = write!(
                out,
                " {key}=\"{}\"",
                html_escape::encode_double_quoted_attribute(value)
            );
        }
    }
    out.push('>');
}

fn close_tag(out: &mut String, element: &Element) {
    let _ = write!(out, "</{}>", element.name);
}
