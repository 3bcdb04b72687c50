use std::collections::HashMap;
use std::ops::{Index, Range};

use crate::models::block::{Block, BlockKind, ListAttributes, MarkerBoundary};
use crate::models::change::Change;
use crate::models::ids::{BlockId, ItemId};

/// The flat, ordered block sequence: the single source of truth of a
/// document.
///
/// Every mutation goes through a method here so the id index, the item
/// occurrence counts and the change log stay in step with the blocks.
/// Positions passed to the mutators must be in range; like `Vec`, they
/// panic otherwise. Callers holding untrusted positions validate first
/// (see [`Cmd`](crate::editing::Cmd)).
#[derive(Debug, Clone, Default)]
pub struct BlockSequence {
    blocks: Vec<Block>,
    index: HashMap<BlockId, usize>,
    items: HashMap<ItemId, usize>,
    log: Vec<Change>,
}

impl BlockSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a sequence, logging every block as inserted.
    pub fn from_blocks(blocks: impl IntoIterator<Item = Block>) -> Self {
        let mut seq = Self::new();
        for block in blocks {
            seq.insert(seq.len(), block);
        }
        seq
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Block> {
        self.blocks.iter()
    }

    /// Current position of a block.
    pub fn position(&self, id: BlockId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.position(id).map(|i| &self.blocks[i])
    }

    pub fn contains(&self, id: BlockId) -> bool {
        self.index.contains_key(&id)
    }

    /// Number of blocks carrying `item` anywhere in the document.
    pub fn item_occurrences(&self, item: ItemId) -> usize {
        self.items.get(&item).copied().unwrap_or(0)
    }

    /// The maximal range of consecutive list blocks containing `index`,
    /// or `None` when the block there is not a list block.
    pub fn run_bounds(&self, index: usize) -> Option<Range<usize>> {
        if !self.blocks.get(index)?.is_list() {
            return None;
        }
        let mut start = index;
        while start > 0 && self.blocks[start - 1].is_list() {
            start -= 1;
        }
        let mut end = index + 1;
        while end < self.blocks.len() && self.blocks[end].is_list() {
            end += 1;
        }
        Some(start..end)
    }

    pub fn insert(&mut self, at: usize, block: Block) {
        debug_assert!(
            !self.index.contains_key(&block.id),
            "block {} inserted twice",
            block.id
        );
        let id = block.id;
        self.count_item(block.list.as_ref(), 1);
        self.blocks.insert(at, block);
        self.reindex_from(at);
        self.log.push(Change::Insert { block: id });
    }

    pub fn remove(&mut self, at: usize) -> Block {
        let prev = at.checked_sub(1).map(|i| self.blocks[i].id);
        let next = self.blocks.get(at + 1).map(|b| b.id);
        let block = self.blocks.remove(at);
        self.index.remove(&block.id);
        self.count_item(block.list.as_ref(), -1);
        self.reindex_from(at);
        self.log.push(Change::Remove {
            block: block.id,
            prev,
            next,
        });
        block
    }

    /// Move the block at `from` so that it ends up at index `to`.
    pub fn move_block(&mut self, from: usize, to: usize) {
        if from == to {
            return;
        }
        let block = self.remove(from);
        self.insert(to, block);
    }

    /// Replace the list attributes of a block. Returns whether anything
    /// changed; unchanged writes are not logged.
    pub fn set_list(&mut self, at: usize, list: Option<ListAttributes>) -> bool {
        if self.blocks[at].list == list {
            return false;
        }
        self.count_item(list.as_ref(), 1);
        let old = std::mem::replace(&mut self.blocks[at].list, list);
        self.count_item(old.as_ref(), -1);
        self.log.push(Change::Attributes {
            block: self.blocks[at].id,
            old,
        });
        true
    }

    pub fn set_text(&mut self, at: usize, text: impl Into<String>) {
        let block = &mut self.blocks[at];
        block.text = text.into();
        let len = block.text_len();
        block.markers.retain(|m| m.offset <= len);
        self.log_content(at);
    }

    pub fn insert_text(&mut self, at: usize, offset: usize, text: &str) {
        self.blocks[at].insert_text(offset, text);
        self.log_content(at);
    }

    pub fn set_kind(&mut self, at: usize, kind: BlockKind) {
        self.blocks[at].kind = kind;
        self.log_content(at);
    }

    pub fn set_markers(&mut self, at: usize, markers: Vec<MarkerBoundary>) {
        let block = &mut self.blocks[at];
        block.markers.clear();
        for marker in markers {
            block.add_marker(marker);
        }
        self.log_content(at);
    }

    /// Split the block at `at` at character `offset`; the tail becomes a new
    /// block `id` right after it, in the same item.
    pub fn split(&mut self, at: usize, offset: usize, id: BlockId) {
        let tail = self.blocks[at].split_off(offset, id);
        self.log_content(at);
        self.insert(at + 1, tail);
    }

    /// Append the block at `at` to its predecessor and remove it.
    pub fn merge_with_previous(&mut self, at: usize) {
        let block = self.remove(at);
        self.blocks[at - 1].append(block);
        self.log_content(at - 1);
    }

    /// Changes logged since the last call.
    pub fn take_changes(&mut self) -> Vec<Change> {
        std::mem::take(&mut self.log)
    }

    pub fn changes(&self) -> &[Change] {
        &self.log
    }

    fn log_content(&mut self, at: usize) {
        self.log.push(Change::Content {
            block: self.blocks[at].id,
        });
    }

    fn reindex_from(&mut self, from: usize) {
        for (i, block) in self.blocks.iter().enumerate().skip(from) {
            self.index.insert(block.id, i);
        }
    }

    fn count_item(&mut self, list: Option<&ListAttributes>, delta: isize) {
        let Some(list) = list else { return };
        let count = self.items.entry(list.item_id).or_insert(0);
        *count = count.saturating_add_signed(delta);
        if *count == 0 {
            self.items.remove(&list.item_id);
        }
    }
}

impl Index<usize> for BlockSequence {
    type Output = Block;

    fn index(&self, index: usize) -> &Block {
        &self.blocks[index]
    }
}

impl<'a> IntoIterator for &'a BlockSequence {
    type Item = &'a Block;
    type IntoIter = std::slice::Iter<'a, Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}
