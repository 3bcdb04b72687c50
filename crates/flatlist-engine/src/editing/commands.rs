use thiserror::Error;

use crate::models::{
    Block, BlockId, BlockKind, BlockSequence, IdGenerator, ListAttributes, ListKind, ListStyle,
    MarkerBoundary,
};

/// An edit to the block sequence.
///
/// Commands only know about blocks. The list-aware ones (`SetIndent`,
/// `ToggleList`, ...) write attributes and leave repairing the
/// surrounding run to the postfixer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cmd {
    InsertBlock { at: usize, block: Block },
    RemoveBlock { at: usize },
    /// Move so the block ends up at index `to`
    MoveBlock { from: usize, to: usize },
    /// Split at a character offset; the tail gets a fresh block id
    SplitBlock { at: usize, offset: usize },
    /// Append the block to the one before it
    MergeBlocks { at: usize },
    SetText { at: usize, text: String },
    InsertText { at: usize, offset: usize, text: String },
    SetBlockKind { at: usize, kind: BlockKind },
    SetList { at: usize, list: Option<ListAttributes> },
    SetIndent { at: usize, indent: usize },
    SetListKind { at: usize, kind: ListKind },
    SetListStyle { at: usize, style: ListStyle },
    /// Make a plain block a list item of `kind`, switch an item of another
    /// kind to `kind`, or take an item of `kind` out of the list.
    ToggleList { at: usize, kind: ListKind },
    SetMarkers { at: usize, markers: Vec<MarkerBoundary> },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CmdError {
    #[error("index {index} out of range for {len} block(s)")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("offset {offset} out of range for block {block} of length {len}")]
    OffsetOutOfRange {
        block: usize,
        offset: usize,
        len: usize,
    },
    #[error("block at {0} is not a list item")]
    NotAListBlock(usize),
    #[error("block at {0} has no predecessor to merge into")]
    NothingToMerge(usize),
    #[error("block {0} is already in the document")]
    DuplicateBlock(BlockId),
}

impl Cmd {
    /// Check the command against the current sequence, then apply it.
    /// Nothing is changed when the command is rejected.
    pub(crate) fn apply_to(
        self,
        seq: &mut BlockSequence,
        ids: &mut IdGenerator,
    ) -> Result<(), CmdError> {
        self.validate(seq)?;
        log::trace!("applying {self:?}");
        match self {
            Cmd::InsertBlock { at, block } => seq.insert(at, block),
            Cmd::RemoveBlock { at } => {
                seq.remove(at);
            }
            Cmd::MoveBlock { from, to } => seq.move_block(from, to),
            Cmd::SplitBlock { at, offset } => seq.split(at, offset, ids.block_id()),
            Cmd::MergeBlocks { at } => seq.merge_with_previous(at),
            Cmd::SetText { at, text } => seq.set_text(at, text),
            Cmd::InsertText { at, offset, text } => seq.insert_text(at, offset, &text),
            Cmd::SetBlockKind { at, kind } => seq.set_kind(at, kind),
            Cmd::SetList { at, list } => {
                seq.set_list(at, list);
            }
            Cmd::SetIndent { at, indent } => {
                update_list(seq, at, |list| list.indent = indent);
            }
            Cmd::SetListKind { at, kind } => {
                update_list(seq, at, |list| list.kind = kind);
            }
            Cmd::SetListStyle { at, style } => {
                update_list(seq, at, |list| list.style = style);
            }
            Cmd::ToggleList { at, kind } => toggle_list(seq, at, kind, ids),
            Cmd::SetMarkers { at, markers } => seq.set_markers(at, markers),
        }
        Ok(())
    }

    fn validate(&self, seq: &BlockSequence) -> Result<(), CmdError> {
        let len = seq.len();
        let index = |index: usize| -> Result<(), CmdError> {
            if index < len {
                Ok(())
            } else {
                Err(CmdError::IndexOutOfRange { index, len })
            }
        };
        let offset = |block: usize, offset: usize| -> Result<(), CmdError> {
            index(block)?;
            let len = seq[block].text_len();
            if offset <= len {
                Ok(())
            } else {
                Err(CmdError::OffsetOutOfRange { block, offset, len })
            }
        };
        let list = |at: usize| -> Result<(), CmdError> {
            index(at)?;
            if seq[at].is_list() {
                Ok(())
            } else {
                Err(CmdError::NotAListBlock(at))
            }
        };

        match self {
            Cmd::InsertBlock { at, block } => {
                if *at > len {
                    return Err(CmdError::IndexOutOfRange { index: *at, len });
                }
                if seq.contains(block.id) {
                    return Err(CmdError::DuplicateBlock(block.id));
                }
                Ok(())
            }
            Cmd::MoveBlock { from, to } => {
                index(*from)?;
                index(*to)
            }
            Cmd::MergeBlocks { at } => {
                index(*at)?;
                if *at == 0 {
                    return Err(CmdError::NothingToMerge(0));
                }
                Ok(())
            }
            Cmd::SplitBlock { at, offset: o } | Cmd::InsertText { at, offset: o, .. } => {
                offset(*at, *o)
            }
            Cmd::SetMarkers { at, markers } => {
                index(*at)?;
                markers
                    .iter()
                    .try_for_each(|marker| offset(*at, marker.offset))
            }
            Cmd::SetIndent { at, .. } | Cmd::SetListKind { at, .. } | Cmd::SetListStyle { at, .. } => {
                list(*at)
            }
            Cmd::RemoveBlock { at }
            | Cmd::SetText { at, .. }
            | Cmd::SetBlockKind { at, .. }
            | Cmd::SetList { at, .. }
            | Cmd::ToggleList { at, .. } => index(*at),
        }
    }
}

fn update_list(seq: &mut BlockSequence, at: usize, update: impl FnOnce(&mut ListAttributes)) -> bool {
    let Some(mut list) = seq[at].list.clone() else {
        return false;
    };
    update(&mut list);
    seq.set_list(at, Some(list))
}

fn toggle_list(seq: &mut BlockSequence, at: usize, kind: ListKind, ids: &mut IdGenerator) {
    let list = match &seq[at].list {
        Some(list) if list.kind == kind => None,
        Some(list) => Some(ListAttributes {
            kind,
            ..list.clone()
        }),
        None => {
            // Join the list right above, at its depth
            let indent = at
                .checked_sub(1)
                .and_then(|prev| seq[prev].list.as_ref())
                .map_or(0, |prev| prev.indent);
            Some(ListAttributes::new(indent, ids.item_id(), kind))
        }
    };
    seq.set_list(at, list);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ItemId;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn seq() -> BlockSequence {
        let mut seq = BlockSequence::from_blocks([
            Block::paragraph(BlockId(1), "one"),
            Block::paragraph(BlockId(2), "two").with_list(ListAttributes::new(
                0,
                ItemId(20),
                ListKind::Unordered,
            )),
        ]);
        seq.take_changes();
        seq
    }

    #[rstest]
    #[case::insert_past_end(
        Cmd::InsertBlock { at: 3, block: Block::paragraph(BlockId(9), "") },
        CmdError::IndexOutOfRange { index: 3, len: 2 }
    )]
    #[case::duplicate(
        Cmd::InsertBlock { at: 0, block: Block::paragraph(BlockId(2), "") },
        CmdError::DuplicateBlock(BlockId(2))
    )]
    #[case::remove(Cmd::RemoveBlock { at: 2 }, CmdError::IndexOutOfRange { index: 2, len: 2 })]
    #[case::move_to(Cmd::MoveBlock { from: 0, to: 2 }, CmdError::IndexOutOfRange { index: 2, len: 2 })]
    #[case::split(
        Cmd::SplitBlock { at: 0, offset: 4 },
        CmdError::OffsetOutOfRange { block: 0, offset: 4, len: 3 }
    )]
    #[case::merge_first(Cmd::MergeBlocks { at: 0 }, CmdError::NothingToMerge(0))]
    #[case::indent_plain(Cmd::SetIndent { at: 0, indent: 1 }, CmdError::NotAListBlock(0))]
    #[case::marker(
        Cmd::SetMarkers { at: 1, markers: vec![MarkerBoundary::start("c", 9)] },
        CmdError::OffsetOutOfRange { block: 1, offset: 9, len: 3 }
    )]
    fn invalid_commands_are_rejected(#[case] cmd: Cmd, #[case] expected: CmdError) {
        let mut seq = seq();
        let mut ids = IdGenerator::sequential(100);
        assert_eq!(cmd.apply_to(&mut seq, &mut ids), Err(expected));
        assert!(seq.changes().is_empty());
    }

    #[test]
    fn split_uses_a_fresh_id() {
        let mut seq = seq();
        let mut ids = IdGenerator::sequential(100);
        Cmd::SplitBlock { at: 1, offset: 1 }
            .apply_to(&mut seq, &mut ids)
            .unwrap();
        assert_eq!(seq[2].id, BlockId(100));
        assert_eq!(seq[1].text, "t");
        assert_eq!(seq[2].text, "wo");
        assert_eq!(seq[2].list, seq[1].list);
    }

    #[test]
    fn set_indent_only_touches_indent() {
        let mut seq = seq();
        let mut ids = IdGenerator::sequential(100);
        Cmd::SetIndent { at: 1, indent: 3 }
            .apply_to(&mut seq, &mut ids)
            .unwrap();
        let list = seq[1].list.as_ref().unwrap();
        assert_eq!((list.indent, list.item_id), (3, ItemId(20)));
    }

    #[test]
    fn toggle_list_cycles() {
        let mut seq = seq();
        let mut ids = IdGenerator::sequential(100);

        Cmd::ToggleList { at: 1, kind: ListKind::Ordered }
            .apply_to(&mut seq, &mut ids)
            .unwrap();
        assert_eq!(seq[1].list.as_ref().unwrap().kind, ListKind::Ordered);

        Cmd::ToggleList { at: 1, kind: ListKind::Ordered }
            .apply_to(&mut seq, &mut ids)
            .unwrap();
        assert_eq!(seq[1].list, None);

        Cmd::ToggleList { at: 0, kind: ListKind::Todo }
            .apply_to(&mut seq, &mut ids)
            .unwrap();
        assert_eq!(
            seq[0].list,
            Some(ListAttributes::new(0, ItemId(100), ListKind::Todo))
        );
    }
}
