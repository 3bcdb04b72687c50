//! # Parser - Event-Based Tree Construction
//!
//! Transforms the token stream into a markup fragment. The parser keeps a
//! stack of open element names and emits [`Event`]s; the [`Sink`] builds
//! the owned tree from them.
//!
//! ## Error Tolerance
//!
//! Markup pasted from other editors is frequently malformed. The parser
//! never fails; instead it applies a small set of recovery rules:
//!
//! - An `<li>` closes a still-open `<li>` of the same list.
//! - A block-level start tag closes an open `<p>`.
//! - `<tr>`, `<td>`/`<th>` and headings close their open predecessor.
//! - An end tag with no matching open element is ignored.
//! - An end tag closes every element opened after its match.
//! - Elements still open at the end of input are closed.
//!
//! Declarations and comments are dropped. Text is entity-decoded.
//!
//! Raw whitespace next to a block-level tag (or the ends of the input) is
//! formatting and is stripped before decoding, so pretty-printed markup
//! reads the same as compact markup. Whitespace written as a character
//! reference (`&#32;`, `&#10;`) is content and survives.
//!
//! ```
//! use flatlist_markup::parse;
//!
//! let nodes = parse("<ul><li>A<li>B</ul>");
//! let list = nodes[0].as_element().unwrap();
//! assert_eq!(list.children.len(), 2);
//! ```

pub mod event;
pub mod sink;

use crate::lexer::{Token, TokenKind, end_tag_name, lex, parse_start_tag, start_tag_name};
use crate::node::{MarkupNode, is_block_element, is_void_element};
use event::Event;
use sink::Sink;

/// The parser state machine.
pub struct Parser<'t, 'input> {
    tokens: &'t [Token<'input>],
    pos: usize,
    events: Vec<Event>,
    open: Vec<String>,
}

impl<'t, 'input> Parser<'t, 'input> {
    /// Create a new parser from a slice of tokens.
    pub fn new(tokens: &'t [Token<'input>]) -> Self {
        Self {
            tokens,
            pos: 0,
            events: Vec::new(),
            open: Vec::new(),
        }
    }

    /// Parse the tokens and return the markup fragment.
    pub fn parse(mut self) -> Vec<MarkupNode> {
        while let Some(token) = self.tokens.get(self.pos) {
            match token.kind {
                TokenKind::Text => self.text(token.text),
                TokenKind::StartTag => self.start_tag(token.text),
                TokenKind::EndTag => self.end_tag(&end_tag_name(token.text)),
                TokenKind::Declaration => {}
            }
            self.pos += 1;
        }
        self.close_to(0);
        Sink::new(self.events).finish()
    }

    fn text(&mut self, raw: &str) {
        let mut raw = raw;
        if block_boundary(self.tokens[..self.pos].iter().rev()) {
            raw = raw.trim_start_matches(|c: char| c.is_ascii_whitespace());
        }
        if block_boundary(self.tokens.iter().skip(self.pos + 1)) {
            raw = raw.trim_end_matches(|c: char| c.is_ascii_whitespace());
        }
        if raw.is_empty() {
            return;
        }
        let text = html_escape::decode_html_entities(raw).into_owned();
        self.events.push(Event::Text(text));
    }

    fn start_tag(&mut self, text: &str) {
        let tag = parse_start_tag(text);
        let name = tag.name.as_str();

        if is_block_element(name) {
            self.close_open_paragraph();
        }
        match name {
            "li" => self.close_sibling(&["li"], &["ul", "ol"]),
            "tr" => self.close_sibling(&["tr"], &["table"]),
            "td" | "th" => self.close_sibling(&["td", "th"], &["tr", "table"]),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                self.close_sibling(&["h1", "h2", "h3", "h4", "h5", "h6"], &[])
            }
            _ => {}
        }

        self.events.push(Event::Open {
            name: tag.name.clone(),
            attrs: tag.attrs,
        });
        if tag.self_closing || is_void_element(&tag.name) {
            self.events.push(Event::Close);
        } else {
            self.open.push(tag.name);
        }
    }

    fn end_tag(&mut self, name: &str) {
        match self.open.iter().rposition(|open| open == name) {
            Some(index) => self.close_to(index),
            None => log::trace!("ignoring stray end tag </{name}>"),
        }
    }

    /// Close the innermost open element named in `names`, unless one of
    /// `scope` is open above it.
    fn close_sibling(&mut self, names: &[&str], scope: &[&str]) {
        let found = self
            .open
            .iter()
            .enumerate()
            .rev()
            .find(|(_, open)| names.contains(&open.as_str()) || scope.contains(&open.as_str()));
        if let Some((index, open)) = found
            && names.contains(&open.as_str())
        {
            self.close_to(index);
        }
    }

    /// Close an open `<p>` when only inline elements are open above it.
    fn close_open_paragraph(&mut self) {
        let found = self
            .open
            .iter()
            .rposition(|open| open == "p" || is_block_element(open));
        if let Some(index) = found
            && self.open[index] == "p"
        {
            self.close_to(index);
        }
    }

    /// Pop the open stack down to (and including) `index`.
    fn close_to(&mut self, index: usize) {
        while self.open.len() > index {
            self.open.pop();
            self.events.push(Event::Close);
        }
    }
}

/// Whether the first tag in `tokens`, looking past declarations, is a
/// block-level tag. Running out of tokens counts as a boundary.
fn block_boundary<'a, 'input: 'a>(mut tokens: impl Iterator<Item = &'a Token<'input>>) -> bool {
    match tokens.find(|t| t.kind != TokenKind::Declaration) {
        None => true,
        Some(token) => match token.kind {
            TokenKind::StartTag => is_block_element(&start_tag_name(token.text)),
            TokenKind::EndTag => is_block_element(&end_tag_name(token.text)),
            _ => false,
        },
    }
}

/// Parse markup text into a fragment.
pub fn parse(input: &str) -> Vec<MarkupNode> {
    let tokens = lex(input);
    Parser::new(&tokens).parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Element;
    use pretty_assertions::assert_eq;

    fn li(text: &str) -> MarkupNode {
        Element::new("li").with_text(text).into()
    }

    #[test]
    fn parses_nested_lists() {
        let nodes = parse("<ul><li>A<ol><li>B</li></ol></li></ul>");
        let expected: MarkupNode = Element::new("ul")
            .with_child(
                Element::new("li")
                    .with_text("A")
                    .with_child(Element::new("ol").with_child(li("B")).into())
                    .into(),
            )
            .into();
        assert_eq!(nodes, vec![expected]);
    }

    #[test]
    fn unclosed_items_close_each_other() {
        let nodes = parse("<ul><li>A<li>B</ul>");
        let expected: MarkupNode = Element::new("ul").with_children([li("A"), li("B")]).into();
        assert_eq!(nodes, vec![expected]);
    }

    #[test]
    fn nested_item_does_not_close_outer_item() {
        let nodes = parse("<ul><li>A<ul><li>B</ul><li>C</ul>");
        let ul = nodes[0].as_element().unwrap();
        assert_eq!(ul.children.len(), 2);
        let first = ul.children[0].as_element().unwrap();
        assert_eq!(first.children.len(), 2);
    }

    #[test]
    fn block_start_closes_paragraph() {
        let nodes = parse("<li><p>A<p>B</li>");
        let item = nodes[0].as_element().unwrap();
        assert_eq!(item.children.len(), 2);
    }

    #[test]
    fn stray_end_tags_are_ignored() {
        let nodes = parse("</li><p>A</p></ul>");
        assert_eq!(nodes, vec![Element::new("p").with_text("A").into()]);
    }

    #[test]
    fn end_tag_closes_inner_elements() {
        let nodes = parse("<ul><li><b>A</ul><p>B</p>");
        assert_eq!(nodes.len(), 2);
    }

    #[test]
    fn entities_are_decoded() {
        let nodes = parse("<p>a &amp; b &lt;c&gt;</p>");
        let p = nodes[0].as_element().unwrap();
        assert_eq!(p.text_content(), "a & b <c>");
    }

    #[test]
    fn self_closing_and_void_elements_have_no_children() {
        let nodes = parse("<p>a<marker-start name=\"m\"/>b<br>c</p>");
        let p = nodes[0].as_element().unwrap();
        assert_eq!(p.children.len(), 5);
        assert_eq!(p.text_content(), "abc");
    }

    #[test]
    fn formatting_whitespace_around_blocks_is_dropped() {
        let nodes = parse("<ul>\n  <li>\n    A <b>x</b> y\n  </li>\n</ul>\n");
        let expected: MarkupNode = Element::new("ul")
            .with_child(
                Element::new("li")
                    .with_text("A ")
                    .with_child(Element::new("b").with_text("x").into())
                    .with_text(" y")
                    .into(),
            )
            .into();
        assert_eq!(nodes, vec![expected]);
    }

    #[test]
    fn encoded_whitespace_is_content() {
        let nodes = parse("<p>&#32;a&#10;</p> <p> \t</p>");
        assert_eq!(nodes, vec![Element::new("p").with_text(" a\n").into(), Element::new("p").into()]);
    }

    #[test]
    fn comments_are_dropped() {
        let nodes = parse("<!DOCTYPE html><p>a<!-- note -->b</p>");
        assert_eq!(nodes, vec![Element::new("p").with_text("ab").into()]);
    }
}
