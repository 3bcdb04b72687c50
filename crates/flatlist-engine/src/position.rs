//! # Position Translator
//!
//! Maps positions between the flat sequence and the nested view.
//!
//! A sequence position is either a boundary before a block or a character
//! offset inside one. A tree position is a child-index path plus either a
//! boundary between children or a character offset in the node's text:
//!
//! ```text
//! Before(1)              ->  [0, 0] Child(1)        between two blocks of an item
//! Inside { 2, 3 }        ->  [0, 1, 0] Text(3)      a multi-block item's block
//! Inside { 0, 3 }        ->  [0, 0] Text(3)         an inline block: the item's text
//! Before(len)            ->  [] Child(root.len)     end of document
//! ```
//!
//! Inline blocks have no wrapper element, so their text positions are
//! addressed on the item. Going back, any `Child(k)` boundary of a root,
//! list or item resolves to the next block boundary in document order.
//!
//! Both directions cost O(depth). Paths come from parent links and the
//! index each view node keeps of itself. A `Child(k)` boundary descends
//! first children to the next block, and every list and item in a view
//! holds at least one block, so the descent never backtracks. At the end
//! of a container it climbs ancestors to the next sibling instead.

use thiserror::Error;

use crate::models::{BlockId, BlockSequence};
use crate::view::{ViewId, ViewKind, ViewTree};

/// A position in the block sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelPosition {
    /// The boundary before the block at this index; the sequence length is
    /// the end of the document.
    Before(usize),
    /// A character offset inside a block's text.
    Inside { block: usize, offset: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreeOffset {
    /// Between children, before the child at this index
    Child(usize),
    /// Character offset in the node's text
    Text(usize),
}

/// A position in the view.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TreePosition {
    pub path: Vec<usize>,
    pub offset: TreeOffset,
}

impl TreePosition {
    pub fn child(path: Vec<usize>, index: usize) -> Self {
        Self {
            path,
            offset: TreeOffset::Child(index),
        }
    }

    pub fn text(path: Vec<usize>, offset: usize) -> Self {
        Self {
            path,
            offset: TreeOffset::Text(offset),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PositionError {
    #[error("block index {index} out of range for {len} block(s)")]
    BlockOutOfRange { index: usize, len: usize },
    #[error("offset {offset} out of range for block {block} of length {len}")]
    OffsetOutOfRange {
        block: usize,
        offset: usize,
        len: usize,
    },
    #[error("no view node at path {0:?}")]
    InvalidPath(Vec<usize>),
    #[error("view node at {0:?} has no text")]
    NotATextPosition(Vec<usize>),
    #[error("view node at {0:?} has no children")]
    NotAContainer(Vec<usize>),
    #[error("child index {index} out of range for {len} child(ren)")]
    ChildOutOfRange { index: usize, len: usize },
    #[error("block {0} is not in both the sequence and the view")]
    StaleView(BlockId),
}

/// Map a sequence position into the view.
pub fn to_tree_position(
    seq: &BlockSequence,
    view: &ViewTree,
    pos: ModelPosition,
) -> Result<TreePosition, PositionError> {
    match pos {
        ModelPosition::Before(index) if index == seq.len() => Ok(TreePosition::child(
            Vec::new(),
            view.children(view.root()).len(),
        )),
        ModelPosition::Before(index) => {
            let node = block_node(seq, view, index)?;
            let path = node_path(view, node, seq[index].id)?;
            let (parent, last) = split_last(path);
            Ok(TreePosition::child(parent, last))
        }
        ModelPosition::Inside { block, offset } => {
            let node = block_node(seq, view, block)?;
            let len = seq[block].text_len();
            if offset > len {
                return Err(PositionError::OffsetOutOfRange { block, offset, len });
            }
            let mut path = node_path(view, node, seq[block].id)?;
            if is_inline(view, node) {
                path.pop();
            }
            Ok(TreePosition::text(path, offset))
        }
    }
}

/// Map a view position back into the sequence.
pub fn to_sequence_position(
    seq: &BlockSequence,
    view: &ViewTree,
    pos: &TreePosition,
) -> Result<ModelPosition, PositionError> {
    let node = view
        .resolve(&pos.path)
        .ok_or_else(|| PositionError::InvalidPath(pos.path.clone()))?;

    match pos.offset {
        TreeOffset::Text(offset) => {
            let block_node = text_node(view, node)
                .ok_or_else(|| PositionError::NotATextPosition(pos.path.clone()))?;
            let block = block_index(seq, view, block_node)?;
            let len = seq[block].text_len();
            if offset > len {
                return Err(PositionError::OffsetOutOfRange { block, offset, len });
            }
            Ok(ModelPosition::Inside { block, offset })
        }
        TreeOffset::Child(index) => {
            if view.block_of(node).is_some() {
                return Err(PositionError::NotAContainer(pos.path.clone()));
            }
            let children = view.children(node);
            if index > children.len() {
                return Err(PositionError::ChildOutOfRange {
                    index,
                    len: children.len(),
                });
            }
            let next = children[index..]
                .iter()
                .find_map(|child| view.first_block(*child))
                .or_else(|| view.next_block(node));
            match next {
                Some(block_node) => Ok(ModelPosition::Before(block_index(seq, view, block_node)?)),
                None => Ok(ModelPosition::Before(seq.len())),
            }
        }
    }
}

fn block_node(seq: &BlockSequence, view: &ViewTree, index: usize) -> Result<ViewId, PositionError> {
    let block = seq.get(index).ok_or(PositionError::BlockOutOfRange {
        index,
        len: seq.len(),
    })?;
    view.block_node(block.id)
        .ok_or(PositionError::StaleView(block.id))
}

fn block_index(seq: &BlockSequence, view: &ViewTree, node: ViewId) -> Result<usize, PositionError> {
    // Only called with block nodes
    let Some(id) = view.block_of(node) else {
        return Err(PositionError::InvalidPath(view.path(node).unwrap_or_default()));
    };
    seq.position(id).ok_or(PositionError::StaleView(id))
}

fn node_path(view: &ViewTree, node: ViewId, block: BlockId) -> Result<Vec<usize>, PositionError> {
    view.path(node).ok_or(PositionError::StaleView(block))
}

fn is_inline(view: &ViewTree, node: ViewId) -> bool {
    view.node(node)
        .and_then(|n| n.as_block())
        .is_some_and(|b| b.inline)
}

/// The block node whose text a `Text` offset on `node` addresses.
fn text_node(view: &ViewTree, node: ViewId) -> Option<ViewId> {
    match &view.node(node)?.kind {
        ViewKind::Block(_) => Some(node),
        ViewKind::Item { .. } => view
            .children(node)
            .first()
            .copied()
            .filter(|child| is_inline(view, *child)),
        ViewKind::Root | ViewKind::List { .. } => None,
    }
}

fn split_last(mut path: Vec<usize>) -> (Vec<usize>, usize) {
    let last = path.pop().unwrap_or_default();
    (path, last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Block, ItemId, ListAttributes, ListKind};
    use crate::view::downcast::build;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn item(id: u128, item: u128, indent: usize, text: &str) -> Block {
        Block::paragraph(BlockId(id), text).with_list(ListAttributes::new(
            indent,
            ItemId(item),
            ListKind::Unordered,
        ))
    }

    /// A with nested B, then a two-block item C, then a plain paragraph.
    fn document() -> BlockSequence {
        BlockSequence::from_blocks([
            item(1, 10, 0, "A"),
            item(2, 20, 1, "B"),
            item(3, 30, 0, "C1"),
            item(4, 30, 0, "C2"),
            Block::paragraph(BlockId(5), "plain"),
        ])
    }

    fn all_positions(seq: &BlockSequence) -> Vec<ModelPosition> {
        let mut out = Vec::new();
        for (index, block) in seq.iter().enumerate() {
            out.push(ModelPosition::Before(index));
            for offset in 0..=block.text_len() {
                out.push(ModelPosition::Inside {
                    block: index,
                    offset,
                });
            }
        }
        out.push(ModelPosition::Before(seq.len()));
        out
    }

    #[rstest]
    #[case::first_block(ModelPosition::Before(0), TreePosition::child(vec![0, 0], 0))]
    #[case::nested_block(ModelPosition::Before(1), TreePosition::child(vec![0, 0, 1, 0], 0))]
    #[case::inline_text(ModelPosition::Inside { block: 1, offset: 1 }, TreePosition::text(vec![0, 0, 1, 0], 1))]
    #[case::second_block_of_item(ModelPosition::Before(3), TreePosition::child(vec![0, 1], 1))]
    #[case::block_text(ModelPosition::Inside { block: 3, offset: 2 }, TreePosition::text(vec![0, 1, 1], 2))]
    #[case::plain(ModelPosition::Before(4), TreePosition::child(vec![], 1))]
    #[case::end(ModelPosition::Before(5), TreePosition::child(vec![], 2))]
    fn canonical_images(#[case] model: ModelPosition, #[case] tree: TreePosition) {
        let seq = document();
        let view = build(&seq);
        assert_eq!(to_tree_position(&seq, &view, model), Ok(tree.clone()));
        assert_eq!(to_sequence_position(&seq, &view, &tree), Ok(model));
    }

    #[test]
    fn every_position_round_trips() {
        let seq = document();
        let view = build(&seq);
        for pos in all_positions(&seq) {
            let tree = to_tree_position(&seq, &view, pos).unwrap();
            assert_eq!(to_sequence_position(&seq, &view, &tree), Ok(pos), "via {tree:?}");
        }
    }

    #[rstest]
    #[case::list_start(TreePosition::child(vec![0], 0), ModelPosition::Before(0))]
    #[case::after_text_before_nested(TreePosition::child(vec![0, 0], 1), ModelPosition::Before(1))]
    #[case::end_of_item(TreePosition::child(vec![0, 0], 2), ModelPosition::Before(2))]
    #[case::end_of_list(TreePosition::child(vec![0], 2), ModelPosition::Before(4))]
    #[case::end_of_nested_list(TreePosition::child(vec![0, 0, 1], 1), ModelPosition::Before(2))]
    #[case::inline_block_node(TreePosition::text(vec![0, 0, 0], 1), ModelPosition::Inside { block: 0, offset: 1 })]
    fn non_canonical_positions_resolve(#[case] tree: TreePosition, #[case] model: ModelPosition) {
        let seq = document();
        let view = build(&seq);
        assert_eq!(to_sequence_position(&seq, &view, &tree), Ok(model));
    }

    #[test]
    fn invalid_positions_are_rejected() {
        let seq = document();
        let view = build(&seq);
        assert_eq!(
            to_tree_position(&seq, &view, ModelPosition::Before(9)),
            Err(PositionError::BlockOutOfRange { index: 9, len: 5 })
        );
        assert_eq!(
            to_tree_position(&seq, &view, ModelPosition::Inside { block: 0, offset: 2 }),
            Err(PositionError::OffsetOutOfRange { block: 0, offset: 2, len: 1 })
        );
        assert_eq!(
            to_sequence_position(&seq, &view, &TreePosition::text(vec![0], 0)),
            Err(PositionError::NotATextPosition(vec![0]))
        );
        assert_eq!(
            to_sequence_position(&seq, &view, &TreePosition::child(vec![7], 0)),
            Err(PositionError::InvalidPath(vec![7]))
        );
        assert_eq!(
            to_sequence_position(&seq, &view, &TreePosition::child(vec![], 3)),
            Err(PositionError::ChildOutOfRange { index: 3, len: 2 })
        );
        assert_eq!(
            to_sequence_position(&seq, &view, &TreePosition::child(vec![1], 0)),
            Err(PositionError::NotAContainer(vec![1]))
        );
    }

    #[test]
    fn stale_view_is_reported() {
        let seq = document();
        let view = build(&BlockSequence::new());
        assert_eq!(
            to_tree_position(&seq, &view, ModelPosition::Before(0)),
            Err(PositionError::StaleView(BlockId(1)))
        );
    }
}
