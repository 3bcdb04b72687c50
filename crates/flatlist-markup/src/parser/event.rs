//! # Parser Events
//!
//! The parser does not build the tree itself. It emits a **flat sequence**
//! of events that describe the tree, and the [`Sink`](super::sink::Sink)
//! turns them into [`MarkupNode`](crate::MarkupNode)s.
//!
//! ```text
//! Open(ul)
//!   Open(li)
//!     Text("A")
//!   Close
//! Close
//! ```
//!
//! Every `Open` is matched by exactly one `Close`; the parser guarantees
//! this even for malformed input by closing elements implicitly.

/// An event emitted by the parser during tree construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Begin an element.
    Open {
        name: String,
        attrs: Vec<(String, String)>,
    },

    /// Character data, already entity-decoded.
    Text(String),

    /// Finish the innermost open element.
    Close,
}

impl Event {
    /// Create an open event with no attributes.
    pub fn open(name: &str) -> Self {
        Event::Open {
            name: name.to_string(),
            attrs: Vec::new(),
        }
    }
}
