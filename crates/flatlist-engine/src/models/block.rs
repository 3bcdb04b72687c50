use serde::{Deserialize, Serialize};

use crate::models::ids::{BlockId, ItemId};

/// What sort of container an item lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum ListKind {
    Unordered,
    Ordered,
    Todo,
}

/// Presentation attributes of a list container.
///
/// All items of one container carry the same style; the first item's
/// style is the one that counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListStyle {
    /// Marker type, e.g. `disc`, `square`, `a`, `I`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker: Option<String>,
    /// First number of an ordered list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<u32>,
    #[serde(default)]
    pub reversed: bool,
}

impl ListStyle {
    pub fn is_default(&self) -> bool {
        self == &ListStyle::default()
    }
}

/// Attributes that make a block part of a list item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListAttributes {
    /// Nesting depth, 0 for top-level items
    pub indent: usize,
    pub item_id: ItemId,
    pub kind: ListKind,
    #[serde(default)]
    pub style: ListStyle,
}

impl ListAttributes {
    pub fn new(indent: usize, item_id: ItemId, kind: ListKind) -> Self {
        Self {
            indent,
            item_id,
            kind,
            style: ListStyle::default(),
        }
    }

    pub fn with_style(mut self, style: ListStyle) -> Self {
        self.style = style;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockKind {
    Paragraph,
    /// Levels 1 to 6
    Heading { level: u8 },
    /// Plain cell text, row by row
    Table { rows: Vec<Vec<String>> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerEdge {
    Start,
    End,
}

/// One edge of a named decoration range (a comment, a suggestion, a
/// collaborator's selection). A range may start in one block and end in
/// another; each block carries the edges that fall inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerBoundary {
    pub name: String,
    /// Character offset into the block text
    pub offset: usize,
    pub edge: MarkerEdge,
}

impl MarkerBoundary {
    pub fn start(name: impl Into<String>, offset: usize) -> Self {
        Self {
            name: name.into(),
            offset,
            edge: MarkerEdge::Start,
        }
    }

    pub fn end(name: impl Into<String>, offset: usize) -> Self {
        Self {
            name: name.into(),
            offset,
            edge: MarkerEdge::End,
        }
    }
}

/// A block of the flat document sequence.
///
/// Blocks with `list` set are list blocks; consecutive list blocks form a
/// run, and the nesting of the run is derived from `indent` alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub kind: BlockKind,
    #[serde(default)]
    pub text: String,
    /// Sorted by offset; edges at the same offset keep insertion order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub markers: Vec<MarkerBoundary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list: Option<ListAttributes>,
}

impl Block {
    pub fn new(id: BlockId, kind: BlockKind, text: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            text: text.into(),
            markers: Vec::new(),
            list: None,
        }
    }

    pub fn paragraph(id: BlockId, text: impl Into<String>) -> Self {
        Self::new(id, BlockKind::Paragraph, text)
    }

    pub fn with_list(mut self, list: ListAttributes) -> Self {
        self.list = Some(list);
        self
    }

    pub fn with_marker(mut self, marker: MarkerBoundary) -> Self {
        self.add_marker(marker);
        self
    }

    pub fn is_list(&self) -> bool {
        self.list.is_some()
    }

    pub fn is_paragraph(&self) -> bool {
        matches!(self.kind, BlockKind::Paragraph)
    }

    /// Text length in characters.
    pub fn text_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Insert a marker edge after any edges already at its offset.
    pub fn add_marker(&mut self, marker: MarkerBoundary) {
        let at = self
            .markers
            .iter()
            .position(|m| m.offset > marker.offset)
            .unwrap_or(self.markers.len());
        self.markers.insert(at, marker);
    }

    /// Insert `text` at character `offset`. End edges at the insertion
    /// point move right so a range being typed at its end grows.
    pub fn insert_text(&mut self, offset: usize, text: &str) {
        let at = byte_offset(&self.text, offset);
        self.text.insert_str(at, text);
        let added = text.chars().count();
        for marker in &mut self.markers {
            if marker.offset > offset || (marker.offset == offset && marker.edge == MarkerEdge::End)
            {
                marker.offset += added;
            }
        }
        self.markers.sort_by_key(|m| m.offset);
    }

    /// Split at character `offset`, returning the tail as a new block with
    /// the same kind and list attributes.
    ///
    /// Start edges at the split point move to the tail, end edges stay.
    pub fn split_off(&mut self, offset: usize, id: BlockId) -> Block {
        let at = byte_offset(&self.text, offset);
        let tail_text = self.text.split_off(at);

        let (head, tail): (Vec<_>, Vec<_>) = self.markers.drain(..).partition(|m| {
            m.offset < offset || (m.offset == offset && m.edge == MarkerEdge::End)
        });
        self.markers = head;

        Block {
            id,
            kind: self.kind.clone(),
            text: tail_text,
            markers: tail
                .into_iter()
                .map(|m| MarkerBoundary {
                    offset: m.offset - offset,
                    ..m
                })
                .collect(),
            list: self.list.clone(),
        }
    }

    /// Append another block's text and markers to this one.
    pub fn append(&mut self, other: Block) {
        let base = self.text_len();
        self.text.push_str(&other.text);
        self.markers
            .extend(other.markers.into_iter().map(|m| MarkerBoundary {
                offset: m.offset + base,
                ..m
            }));
    }
}

/// Byte index of character `offset`, clamped to the end of `text`.
pub(crate) fn byte_offset(text: &str, offset: usize) -> usize {
    text.char_indices()
        .nth(offset)
        .map(|(byte, _)| byte)
        .unwrap_or(text.len())
}
