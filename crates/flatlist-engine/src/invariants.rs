//! Checks for the two list invariants every derived view relies on:
//!
//! 1. Indent continuity: a run head has indent 0 and each list block is at
//!    most one level deeper than the list block before it.
//! 2. Item identity: the blocks of an item are contiguous, share indent and
//!    kind, and the id appears nowhere else in the document.
//!
//! The postfixer establishes both; the view converters assume them and
//! treat a violation as a programming error.

use thiserror::Error;

use crate::models::{BlockId, BlockSequence, ItemId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("block {block} at {index}: indent {indent} exceeds allowed {max}")]
    IndentJump {
        block: BlockId,
        index: usize,
        indent: usize,
        max: usize,
    },
    #[error("block {block} at {index}: item {item} changes indent or kind mid-item")]
    MixedItem {
        block: BlockId,
        index: usize,
        item: ItemId,
    },
    #[error("item {item} has {contiguous} contiguous block(s) at {index} but {total} in total")]
    ScatteredItem {
        item: ItemId,
        index: usize,
        contiguous: usize,
        total: usize,
    },
}

/// Check the whole document.
pub fn check(seq: &BlockSequence) -> Result<(), InvariantViolation> {
    check_blocks(seq, 0..seq.len())
}

/// Check the blocks at `indices` against their predecessors.
///
/// Each check only looks at the block, the one before it and the blocks
/// of its own item, so checking the neighbourhood of an edit stays cheap.
pub fn check_blocks(
    seq: &BlockSequence,
    indices: impl IntoIterator<Item = usize>,
) -> Result<(), InvariantViolation> {
    for index in indices {
        check_block(seq, index)?;
    }
    Ok(())
}

fn check_block(seq: &BlockSequence, index: usize) -> Result<(), InvariantViolation> {
    let block = &seq[index];
    let Some(list) = &block.list else {
        return Ok(());
    };
    let prev = index
        .checked_sub(1)
        .and_then(|i| seq[i].list.as_ref());

    let max = prev.map_or(0, |p| p.indent + 1);
    if list.indent > max {
        return Err(InvariantViolation::IndentJump {
            block: block.id,
            index,
            indent: list.indent,
            max,
        });
    }

    match prev {
        Some(p) if p.item_id == list.item_id => {
            if p.indent != list.indent || p.kind != list.kind {
                return Err(InvariantViolation::MixedItem {
                    block: block.id,
                    index,
                    item: list.item_id,
                });
            }
        }
        _ => {
            // First block of its item: the rest must follow directly
            let contiguous = seq.blocks()[index..]
                .iter()
                .take_while(|b| b.list.as_ref().is_some_and(|l| l.item_id == list.item_id))
                .count();
            let total = seq.item_occurrences(list.item_id);
            if contiguous != total {
                return Err(InvariantViolation::ScatteredItem {
                    item: list.item_id,
                    index,
                    contiguous,
                    total,
                });
            }
        }
    }
    Ok(())
}

/// Panic with the violation if the document is not valid.
pub fn assert_valid(seq: &BlockSequence, indices: impl IntoIterator<Item = usize>) {
    if let Err(violation) = check_blocks(seq, indices) {
        panic!("list invariant violated: {violation}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Block, ListAttributes, ListKind};

    fn item(id: u128, item: u128, indent: usize) -> Block {
        Block::paragraph(BlockId(id), "x").with_list(ListAttributes::new(
            indent,
            ItemId(item),
            ListKind::Unordered,
        ))
    }

    #[test]
    fn valid_document_passes() {
        let seq = BlockSequence::from_blocks([
            item(1, 1, 0),
            item(2, 1, 0),
            item(3, 2, 1),
            Block::paragraph(BlockId(4), "plain"),
            item(5, 3, 0),
        ]);
        assert_eq!(check(&seq), Ok(()));
    }

    #[test]
    fn run_head_must_start_at_zero() {
        let seq = BlockSequence::from_blocks([Block::paragraph(BlockId(9), "p"), item(1, 1, 1)]);
        assert!(matches!(
            check(&seq),
            Err(InvariantViolation::IndentJump { index: 1, max: 0, .. })
        ));
    }

    #[test]
    fn scattered_item_is_reported() {
        let seq = BlockSequence::from_blocks([item(1, 1, 0), item(2, 2, 0), item(3, 1, 0)]);
        assert!(matches!(
            check(&seq),
            Err(InvariantViolation::ScatteredItem { index: 0, contiguous: 1, total: 2, .. })
        ));
    }

    #[test]
    fn mixed_item_is_reported() {
        let seq = BlockSequence::from_blocks([item(1, 1, 0), item(2, 1, 1)]);
        assert!(matches!(check(&seq), Err(InvariantViolation::MixedItem { index: 1, .. })));
    }

    #[test]
    #[should_panic(expected = "list invariant violated")]
    fn assert_valid_panics() {
        let seq = BlockSequence::from_blocks([item(1, 1, 2)]);
        assert_valid(&seq, 0..1);
    }
}
