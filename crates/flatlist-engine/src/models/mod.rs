//! The flat document model: blocks, their ids and the sequence holding them.

pub mod block;
pub mod change;
pub mod ids;
pub mod sequence;

pub use block::{Block, BlockKind, ListAttributes, ListKind, ListStyle, MarkerBoundary, MarkerEdge};
pub use change::Change;
pub use ids::{BlockId, IdGenerator, ItemId};
pub use sequence::BlockSequence;
