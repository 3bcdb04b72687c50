/*!
 * # Editing Core Module
 *
 * The host side of the list engine: a [`Document`] owns the flat block
 * sequence, keeps its nested view current and is the only way to change
 * either.
 *
 * ## Architecture Overview
 *
 * ### 1. Single Source of Truth: the Block Sequence
 * - The document is a flat **`BlockSequence`**; every list block carries
 *   its `indent`, `item_id` and `kind`
 * - Nesting is never stored, it is derived from `indent` alone
 * - The sequence logs every edit as a **`Change`** keyed by block id
 *
 * ### 2. Command-Based Editing
 * - All edits are **Commands** (`Cmd` enum) applied in batches
 * - Commands know nothing about lists: they may leave an indent jump or a
 *   duplicated item id behind
 *
 * ### 3. Postfix Before Anything Observes
 * - After each batch the **postfixer** repairs the runs around the
 *   touched blocks with as few attribute writes as it can
 * - Its own writes go through the same change log
 *
 * ### 4. Incremental View
 * - The **downcast** converter updates only the view nodes around the
 *   changes; untouched nodes keep their `ViewId`
 * - Renderers diff by `ViewId` using the returned `ViewPatch`
 *
 * ### 5. Markup In and Out
 * - Markup is read through the **upcast** converter, which accepts any
 *   nesting and leaves the repairs to the postfixer
 * - Markup is written from the view
 *
 * ## Module Structure
 *
 * - **`document`**: `Document` and the edit loop
 * - **`commands`**: `Cmd`, `CmdError` and how each command edits the sequence
 * - **`patch`**: what one batch changed
 *
 * ## Usage Pattern
 *
 * ```rust
 * use flatlist_engine::editing::*;
 * use flatlist_engine::models::{IdGenerator, ListKind};
 *
 * // 1. Read markup (never fails)
 * let mut doc = Document::from_markup("<p>groceries</p><p>milk</p>", IdGenerator::sequential(1));
 *
 * // 2. Apply edits as a batch
 * let patch = doc
 *     .apply([
 *         Cmd::ToggleList { at: 0, kind: ListKind::Todo },
 *         Cmd::ToggleList { at: 1, kind: ListKind::Todo },
 *         Cmd::SetIndent { at: 1, indent: 1 },
 *     ])
 *     .unwrap();
 * assert_eq!(patch.version, 1);
 *
 * // 3. Write markup from the view
 * assert_eq!(
 *     doc.to_markup_string(),
 *     "<ul class=\"todo-list\"><li>groceries<ul class=\"todo-list\"><li>milk</li></ul></li></ul>"
 * );
 * ```
 */

pub mod commands;
pub mod document;
pub mod patch;

pub use commands::{Cmd, CmdError};
pub use document::Document;
pub use patch::Patch;
