//! # Nested List View
//!
//! The view is the nested rendering of the flat sequence: list containers
//! hold items, items hold their blocks followed by nested lists.
//!
//! ```text
//! Root
//! ├── List (ul)
//! │   ├── Item a
//! │   │   ├── Block "A"          (inline: the only block of the item)
//! │   │   └── List (ol)
//! │   │       └── Item b
//! │   │           └── Block "B"
//! │   └── Item c
//! │       ├── Block "C1"
//! │       └── Block "C2"
//! └── Block "plain paragraph"
//! ```
//!
//! Nodes live in an arena keyed by [`ViewId`]. Ids are never reused, so a
//! node that survives an edit keeps its id and a renderer can diff by id.
//! The tree is only ever mutated by the [`downcast`] converter; everything
//! else reads it.
//!
//! Every node records its index among its parent's children, kept current
//! on insert and detach, so `path` and the document-order neighbour walks
//! cost O(depth) rather than scanning sibling lists.

pub mod downcast;
pub mod render;

use std::collections::HashMap;
use std::fmt;

use crate::models::{BlockId, BlockKind, ItemId, ListKind, ListStyle, MarkerBoundary, MarkerEdge};

pub use downcast::ViewPatch;

/// Identity of a view node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(pub u64);

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewKind {
    Root,
    List { kind: ListKind, style: ListStyle },
    Item { item_id: ItemId },
    Block(BlockView),
}

/// Rendered state of one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockView {
    pub block_id: BlockId,
    pub kind: BlockKind,
    pub text: String,
    pub markers: Vec<MarkerBoundary>,
    /// Rendered without its own paragraph wrapper, directly in the item
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewNode {
    pub id: ViewId,
    pub parent: Option<ViewId>,
    /// Position in the parent's `children`; meaningless while detached
    pub index: usize,
    pub children: Vec<ViewId>,
    pub kind: ViewKind,
}

impl ViewNode {
    pub fn as_block(&self) -> Option<&BlockView> {
        match &self.kind {
            ViewKind::Block(block) => Some(block),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ViewTree {
    nodes: HashMap<ViewId, ViewNode>,
    root: ViewId,
    next: u64,
    blocks: HashMap<BlockId, ViewId>,
}

impl Default for ViewTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewTree {
    /// An empty view holding only the root.
    pub fn new() -> Self {
        let root = ViewId(0);
        let mut nodes = HashMap::new();
        nodes.insert(
            root,
            ViewNode {
                id: root,
                parent: None,
                index: 0,
                children: Vec::new(),
                kind: ViewKind::Root,
            },
        );
        Self {
            nodes,
            root,
            next: 1,
            blocks: HashMap::new(),
        }
    }

    pub fn root(&self) -> ViewId {
        self.root
    }

    pub fn node(&self, id: ViewId) -> Option<&ViewNode> {
        self.nodes.get(&id)
    }

    /// Number of nodes, the root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the view holds nothing but the root.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    pub fn children(&self, id: ViewId) -> &[ViewId] {
        self.nodes.get(&id).map_or(&[], |n| n.children.as_slice())
    }

    pub fn parent(&self, id: ViewId) -> Option<ViewId> {
        self.nodes.get(&id).and_then(|n| n.parent)
    }

    /// The node rendering `block`.
    pub fn block_node(&self, block: BlockId) -> Option<ViewId> {
        self.blocks.get(&block).copied()
    }

    /// The block rendered by `id`, if it is a block node.
    pub fn block_of(&self, id: ViewId) -> Option<BlockId> {
        self.node(id)
            .and_then(ViewNode::as_block)
            .map(|b| b.block_id)
    }

    /// Whether `id` is the root or hangs below it.
    pub fn is_attached(&self, id: ViewId) -> bool {
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    pub fn index_in_parent(&self, id: ViewId) -> Option<usize> {
        let node = self.node(id)?;
        node.parent.map(|_| node.index)
    }

    /// Child indices leading from the root to `id`, in O(depth).
    pub fn path(&self, id: ViewId) -> Option<Vec<usize>> {
        let mut path = Vec::new();
        let mut current = id;
        while current != self.root {
            path.push(self.index_in_parent(current)?);
            current = self.parent(current)?;
        }
        path.reverse();
        Some(path)
    }

    /// The node at a child-index path.
    pub fn resolve(&self, path: &[usize]) -> Option<ViewId> {
        path.iter()
            .try_fold(self.root, |node, &index| self.children(node).get(index).copied())
    }

    /// First block node in document order within the subtree of `id`.
    pub fn first_block(&self, id: ViewId) -> Option<ViewId> {
        if self.block_of(id).is_some() {
            return Some(id);
        }
        self.children(id).iter().find_map(|c| self.first_block(*c))
    }

    /// Last block node in document order within the subtree of `id`.
    pub fn last_block(&self, id: ViewId) -> Option<ViewId> {
        if self.block_of(id).is_some() {
            return Some(id);
        }
        self.children(id).iter().rev().find_map(|c| self.last_block(*c))
    }

    /// The block node rendered just before `id`'s subtree.
    pub fn prev_block(&self, id: ViewId) -> Option<ViewId> {
        let mut current = id;
        loop {
            let parent = self.parent(current)?;
            let index = self.index_in_parent(current)?;
            let siblings = self.children(parent);
            if let Some(found) = siblings[..index].iter().rev().find_map(|s| self.last_block(*s)) {
                return Some(found);
            }
            current = parent;
        }
    }

    /// The block node rendered just after `id`'s subtree.
    pub fn next_block(&self, id: ViewId) -> Option<ViewId> {
        let mut current = id;
        loop {
            let parent = self.parent(current)?;
            let index = self.index_in_parent(current)?;
            let siblings = self.children(parent);
            if let Some(found) = siblings[index + 1..].iter().find_map(|s| self.first_block(*s)) {
                return Some(found);
            }
            current = parent;
        }
    }

    /// Blocks in rendered order.
    pub fn block_order(&self) -> Vec<BlockId> {
        let mut out = Vec::new();
        self.collect_blocks(self.root, &mut out);
        out
    }

    fn collect_blocks(&self, id: ViewId, out: &mut Vec<BlockId>) {
        if let Some(block) = self.block_of(id) {
            out.push(block);
        }
        for child in self.children(id) {
            self.collect_blocks(*child, out);
        }
    }

    /// Indented text rendering of the tree, one node per line. Node ids are
    /// left out so two views of the same document compare equal.
    pub fn outline(&self) -> String {
        let mut out = String::new();
        for child in self.children(self.root) {
            self.outline_node(*child, 0, &mut out);
        }
        out
    }

    fn outline_node(&self, id: ViewId, depth: usize, out: &mut String) {
        let Some(node) = self.node(id) else {
            return;
        };
        out.push_str(&"  ".repeat(depth));
        match &node.kind {
            ViewKind::Root => out.push_str("root"),
            ViewKind::List { kind, style } => {
                out.push_str(match kind {
                    ListKind::Unordered => "ul",
                    ListKind::Ordered => "ol",
                    ListKind::Todo => "todo",
                });
                if let Some(marker) = &style.marker {
                    out.push_str(&format!(" type={marker}"));
                }
                if let Some(start) = style.start {
                    out.push_str(&format!(" start={start}"));
                }
                if style.reversed {
                    out.push_str(" reversed");
                }
            }
            ViewKind::Item { item_id } => out.push_str(&format!("li {item_id}")),
            ViewKind::Block(block) => {
                if !block.inline {
                    match &block.kind {
                        BlockKind::Paragraph => out.push_str("p "),
                        BlockKind::Heading { level } => out.push_str(&format!("h{level} ")),
                        BlockKind::Table { rows } => out.push_str(&format!("table {} ", rows.len())),
                    }
                }
                out.push_str(&format!("{:?}", block.text));
                for marker in &block.markers {
                    let edge = match marker.edge {
                        MarkerEdge::Start => '[',
                        MarkerEdge::End => ']',
                    };
                    out.push_str(&format!(" {edge}{}@{}", marker.name, marker.offset));
                }
            }
        }
        out.push('\n');
        for child in &node.children {
            self.outline_node(*child, depth + 1, out);
        }
    }

    // Mutation, for the downcast converter only

    pub(crate) fn create(&mut self, kind: ViewKind) -> ViewId {
        let id = ViewId(self.next);
        self.next += 1;
        if let ViewKind::Block(block) = &kind {
            self.blocks.insert(block.block_id, id);
        }
        self.nodes.insert(
            id,
            ViewNode {
                id,
                parent: None,
                index: 0,
                children: Vec::new(),
                kind,
            },
        );
        id
    }

    pub(crate) fn kind_mut(&mut self, id: ViewId) -> Option<&mut ViewKind> {
        self.nodes.get_mut(&id).map(|n| &mut n.kind)
    }

    /// Attach a detached node as child `index` of `parent`.
    pub(crate) fn insert_child(&mut self, parent: ViewId, index: usize, child: ViewId) {
        debug_assert!(self.parent(child).is_none(), "{child} is still attached");
        let Some(node) = self.nodes.get_mut(&parent) else {
            return;
        };
        let index = index.min(node.children.len());
        node.children.insert(index, child);
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = Some(parent);
        }
        self.reindex_from(parent, index);
    }

    pub(crate) fn detach(&mut self, id: ViewId) {
        let Some((parent, index)) = self
            .nodes
            .get_mut(&id)
            .and_then(|n| n.parent.take().map(|p| (p, n.index)))
        else {
            return;
        };
        if let Some(node) = self.nodes.get_mut(&parent) {
            debug_assert_eq!(node.children.get(index), Some(&id), "stale index for {id}");
            if node.children.get(index) == Some(&id) {
                node.children.remove(index);
            }
        }
        self.reindex_from(parent, index);
    }

    /// Refresh the recorded index of `parent`'s children from `from` on.
    fn reindex_from(&mut self, parent: ViewId, from: usize) {
        let Some(children) = self.nodes.get_mut(&parent).map(|n| std::mem::take(&mut n.children)) else {
            return;
        };
        for (index, child) in children.iter().enumerate().skip(from) {
            if let Some(node) = self.nodes.get_mut(child) {
                node.index = index;
            }
        }
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children = children;
        }
    }

    /// Drop a detached node. Its children must already be gone.
    pub(crate) fn delete(&mut self, id: ViewId) {
        self.detach(id);
        if let Some(node) = self.nodes.remove(&id) {
            debug_assert!(node.children.is_empty(), "{id} deleted with children");
            if let ViewKind::Block(block) = node.kind
                && self.blocks.get(&block.block_id) == Some(&id)
            {
                self.blocks.remove(&block.block_id);
            }
        }
    }
}
