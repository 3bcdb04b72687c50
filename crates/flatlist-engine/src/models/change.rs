use crate::models::block::ListAttributes;
use crate::models::ids::BlockId;

/// One entry of the change log kept by [`BlockSequence`](super::BlockSequence).
///
/// Changes name blocks by id, not position: later edits in the same batch
/// shift positions but never invalidate an id. A move is logged as a
/// `Remove` followed by an `Insert` of the same block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Insert {
        block: BlockId,
    },
    /// `prev` and `next` are the neighbours the block had when it was removed
    Remove {
        block: BlockId,
        prev: Option<BlockId>,
        next: Option<BlockId>,
    },
    /// List attributes changed; `old` is the value before the change
    Attributes {
        block: BlockId,
        old: Option<ListAttributes>,
    },
    /// Text, markers or block kind changed
    Content {
        block: BlockId,
    },
}

impl Change {
    pub fn block(&self) -> BlockId {
        match self {
            Change::Insert { block }
            | Change::Remove { block, .. }
            | Change::Attributes { block, .. }
            | Change::Content { block } => *block,
        }
    }
}
