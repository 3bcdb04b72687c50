//! Owned markup tree produced by the parser and consumed by the writer.

/// A node of a markup fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupNode {
    Element(Element),
    Text(String),
}

/// An element with its attributes and children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Lowercased element name
    pub name: String,
    /// Attributes in source order
    pub attrs: Vec<(String, String)>,
    pub children: Vec<MarkupNode>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((key.into(), value.into()));
        self
    }

    pub fn with_child(mut self, child: MarkupNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = MarkupNode>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_child(MarkupNode::Text(text.into()))
    }

    /// Value of the first attribute named `key`.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attr(&self, key: &str) -> bool {
        self.attr(key).is_some()
    }

    /// Whether the whitespace separated `class` attribute contains `class`.
    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|v| v.split_ascii_whitespace().any(|c| c == class))
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }
}

impl From<Element> for MarkupNode {
    fn from(element: Element) -> Self {
        MarkupNode::Element(element)
    }
}

impl MarkupNode {
    pub fn text(text: impl Into<String>) -> Self {
        MarkupNode::Text(text.into())
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            MarkupNode::Element(e) => Some(e),
            MarkupNode::Text(_) => None,
        }
    }

    /// Text node made only of whitespace (formatting between block tags).
    pub fn is_blank_text(&self) -> bool {
        matches!(self, MarkupNode::Text(t) if t.trim().is_empty())
    }
}

fn collect_text(nodes: &[MarkupNode], out: &mut String) {
    for node in nodes {
        match node {
            MarkupNode::Text(t) => out.push_str(t),
            MarkupNode::Element(e) => collect_text(&e.children, out),
        }
    }
}

/// Element names treated as block level by the parser and the writer.
pub fn is_block_element(name: &str) -> bool {
    matches!(
        name,
        "ul" | "ol"
            | "li"
            | "p"
            | "div"
            | "section"
            | "article"
            | "blockquote"
            | "table"
            | "thead"
            | "tbody"
            | "tr"
            | "td"
            | "th"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
    )
}

/// Elements that never have children.
pub fn is_void_element(name: &str) -> bool {
    matches!(name, "br" | "hr" | "img" | "input" | "meta" | "link" | "wbr")
}
