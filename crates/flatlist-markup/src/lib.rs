//! # flatlist-markup
//!
//! Reader and writer for the serialized list markup: nested `<ul>`/`<ol>`
//! containers holding `<li>` items, whose content is paragraphs, headings,
//! tables and inline text.
//!
//! ## Architecture Overview
//!
//! ```text
//! Source Text → Lexer → Tokens → Parser → Events → Sink → Vec<MarkupNode>
//!               (Logos)          (open stack)            (owned tree)
//! ```
//!
//! The reader is deliberately forgiving: markup pasted from other editors
//! often nests lists without `<li>` wrappers, leaves items unclosed or
//! scatters text between items. The parser produces *some* tree for every
//! input and leaves the interpretation of odd shapes to the consumer.
//!
//! ## Quick Start
//!
//! ```
//! use flatlist_markup::{parse, write};
//!
//! let nodes = parse("<ul><li>One<li>Two</ul>");
//! assert_eq!(write(&nodes), "<ul><li>One</li><li>Two</li></ul>");
//! ```

pub mod lexer;
pub mod node;
pub mod parser;
pub mod writer;

pub use node::{Element, MarkupNode};
pub use parser::parse;
pub use writer::{write, write_pretty};
