use crate::models::BlockId;
use crate::view::ViewPatch;

/// Result of applying a batch of commands
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Patch {
    /// Blocks the commands touched, first touch first; removed blocks included
    pub changed: Vec<BlockId>,
    /// Blocks whose list attributes the postfixer rewrote
    pub postfixed: Vec<BlockId>,
    pub view: ViewPatch,
    pub version: u64,
}

impl Patch {
    /// Whether the batch left the document unchanged.
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }
}
