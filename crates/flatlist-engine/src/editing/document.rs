use flatlist_markup::MarkupNode;

use crate::editing::{Cmd, CmdError, Patch};
use crate::invariants::{self, InvariantViolation};
use crate::models::{Block, BlockId, BlockSequence, Change, IdGenerator};
use crate::position::{self, ModelPosition, PositionError, TreePosition};
use crate::upcast;
use crate::view::{ViewTree, downcast, render};

/// A document: the block sequence, its derived view and the id source.
///
/// The sequence is the single source of truth. Every edit goes through
/// [`Document::apply`], which runs the full edit loop:
///
/// 1. **Commands**: each [`Cmd`] is checked and applied to the sequence,
///    which logs the blocks it touched.
/// 2. **Postfix**: the runs around the touched blocks are repaired so the
///    list invariants hold again.
/// 3. **Downcast**: the view is brought up to date for the touched blocks
///    and everything the postfixer rewrote.
///
/// Nothing outside this type ever sees the sequence between steps 1 and 3.
///
/// ```rust
/// use flatlist_engine::editing::{Cmd, Document};
/// use flatlist_engine::models::IdGenerator;
///
/// let mut doc = Document::from_markup(
///     "<ul><li>A</li><li>B</li></ul>",
///     IdGenerator::sequential(1),
/// );
/// doc.apply([Cmd::SetIndent { at: 1, indent: 1 }]).unwrap();
///
/// assert_eq!(
///     doc.to_markup_string(),
///     "<ul><li>A<ul><li>B</li></ul></li></ul>"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct Document {
    pub(crate) blocks: BlockSequence,
    pub(crate) view: ViewTree,
    pub(crate) ids: IdGenerator,
    /// Incremented on every batch that changed something
    pub(crate) version: u64,
}

impl Default for Document {
    fn default() -> Self {
        Self::new(IdGenerator::default())
    }
}

impl Document {
    pub fn new(ids: IdGenerator) -> Self {
        Self {
            blocks: BlockSequence::new(),
            view: ViewTree::new(),
            ids,
            version: 0,
        }
    }

    /// A document holding `blocks`, repaired and rendered.
    pub fn from_blocks(blocks: impl IntoIterator<Item = Block>, ids: IdGenerator) -> Self {
        let mut doc = Self {
            blocks: BlockSequence::from_blocks(blocks),
            view: ViewTree::new(),
            ids,
            version: 0,
        };
        doc.sync();
        doc.version = 0;
        doc
    }

    /// Parse list markup into a document. Never fails; malformed markup
    /// gives a best-effort document.
    pub fn from_markup(markup: &str, mut ids: IdGenerator) -> Self {
        let blocks = upcast::upcast_str(markup, &mut ids);
        Self::from_blocks(blocks, ids)
    }

    /// Create a document from raw markup bytes
    pub fn from_bytes(bytes: &[u8], ids: IdGenerator) -> anyhow::Result<Self> {
        let text = std::str::from_utf8(bytes)?;
        Ok(Self::from_markup(text, ids))
    }

    /// Apply a batch of commands (the core edit loop).
    ///
    /// Commands are applied in order, each against the state the previous
    /// ones left. If one is rejected the batch stops there: the commands
    /// before it stay applied, the document is repaired and rendered as
    /// usual, and the error is returned.
    pub fn apply(&mut self, cmds: impl IntoIterator<Item = Cmd>) -> Result<Patch, CmdError> {
        let mut failed = None;
        for cmd in cmds {
            if let Err(err) = cmd.apply_to(&mut self.blocks, &mut self.ids) {
                log::debug!("command rejected: {err}");
                failed = Some(err);
                break;
            }
        }
        let patch = self.sync();
        match failed {
            Some(err) => Err(err),
            None => Ok(patch),
        }
    }

    /// Insert pasted markup before the block at `at`.
    pub fn insert_markup(&mut self, at: usize, markup: &str) -> Result<Patch, CmdError> {
        let blocks = upcast::upcast_str(markup, &mut self.ids);
        let cmds = blocks
            .into_iter()
            .enumerate()
            .map(|(i, block)| Cmd::InsertBlock { at: at + i, block });
        self.apply(cmds)
    }

    /// Postfix and downcast whatever the sequence logged.
    fn sync(&mut self) -> Patch {
        let changes = self.blocks.take_changes();
        if changes.is_empty() {
            return Patch {
                version: self.version,
                ..Patch::default()
            };
        }

        let report = crate::postfix::postfix(&mut self.blocks, &changes, &mut self.ids);
        let mut all = changes;
        let edited = touched_blocks(&all);
        all.extend(self.blocks.take_changes());

        let view = downcast::apply(&mut self.view, &self.blocks, &all);
        self.version += 1;
        log::debug!(
            "version {}: {} block(s) edited, {} postfixed, {} view node(s) created",
            self.version,
            edited.len(),
            report.changed.len(),
            view.created.len()
        );

        Patch {
            changed: edited,
            postfixed: report.changed,
            view,
            version: self.version,
        }
    }

    pub fn blocks(&self) -> &BlockSequence {
        &self.blocks
    }

    pub fn view(&self) -> &ViewTree {
        &self.view
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.block(id)
    }

    /// Check the list invariants over the whole document.
    pub fn check(&self) -> Result<(), InvariantViolation> {
        invariants::check(&self.blocks)
    }

    pub fn to_markup(&self) -> Vec<MarkupNode> {
        render::to_markup(&self.view)
    }

    /// The document as compact markup.
    pub fn to_markup_string(&self) -> String {
        flatlist_markup::write(&self.to_markup())
    }

    /// The document as markup with one element per line.
    pub fn to_markup_pretty(&self, indent_width: usize) -> String {
        flatlist_markup::write_pretty(&self.to_markup(), indent_width)
    }

    pub fn tree_position(&self, pos: ModelPosition) -> Result<TreePosition, PositionError> {
        position::to_tree_position(&self.blocks, &self.view, pos)
    }

    pub fn sequence_position(&self, pos: &TreePosition) -> Result<ModelPosition, PositionError> {
        position::to_sequence_position(&self.blocks, &self.view, pos)
    }
}

/// Distinct blocks named by `changes`, in first-touch order.
fn touched_blocks(changes: &[Change]) -> Vec<BlockId> {
    let mut seen = std::collections::HashSet::new();
    changes
        .iter()
        .map(Change::block)
        .filter(|id| seen.insert(*id))
        .collect()
}
