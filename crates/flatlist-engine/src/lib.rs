pub mod editing;
pub mod invariants;
pub mod io;
pub mod models;
pub mod position;
pub mod postfix;
pub mod upcast;
pub mod view;


// Re-export key types for easier usage
pub use editing::{Cmd, CmdError, Document, Patch};
pub use invariants::InvariantViolation;
pub use io::*;
pub use models::*;
pub use position::{ModelPosition, PositionError, TreeOffset, TreePosition};
pub use postfix::{PostfixReport, postfix};
pub use upcast::{upcast, upcast_str};
pub use view::{ViewId, ViewKind, ViewPatch, ViewTree};
