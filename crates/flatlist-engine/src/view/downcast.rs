//! # Downcast Converter
//!
//! Keeps a [`ViewTree`] in step with the block sequence. The sequence must
//! satisfy the list invariants (run the postfixer first); a violation is a
//! programming error and panics.
//!
//! ## Structure rules
//!
//! - A list block of indent `d` hangs below `d + 1` list/item pairs. Its
//!   item at level `k` belongs to the nearest earlier block of indent `k`.
//! - Adjacent blocks share the list at level `k` when they share all items
//!   above it and their kinds at `k` agree. Style never splits a list.
//! - Blocks of an item come first, nested lists after them.
//! - A lone paragraph in an item is rendered inline.
//!
//! ## Incremental update
//!
//! For a batch of [`Change`]s the converter:
//!
//! 1. Collects candidate blocks: each changed block, its neighbours in the
//!    sequence and its neighbours in the view as it was before the batch.
//! 2. Deletes the nodes of removed blocks and detaches those of moved ones.
//! 3. Checks the candidates. A block is *clean* when its node hangs below
//!    the right lists and items, right after the nearest earlier block that
//!    still has a node, and shares exactly the right containers with it.
//! 4. Grows every unclean candidate forward into a range until it meets a
//!    clean block, detaches the range and inserts its blocks again one by
//!    one between the clean neighbours, splitting or merging their
//!    containers where the new blocks demand it.
//! 5. Updates content, inline flags and list styles in place.
//!
//! Block and item nodes are reused by id, so a text edit touches one node
//! and inserting an item creates only that item.

use std::collections::{BTreeSet, HashMap};
use std::ops::Range;

use crate::invariants;
use crate::models::{Block, BlockId, BlockKind, BlockSequence, Change, ItemId, ListKind};
use crate::view::{BlockView, ViewId, ViewKind, ViewNode, ViewTree};

/// What one conversion did to the view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewPatch {
    pub created: Vec<ViewId>,
    pub removed: Vec<ViewId>,
    /// Surviving nodes that were attached somewhere else (or re-attached)
    pub moved: Vec<ViewId>,
    /// Surviving nodes whose content, style or inline flag changed
    pub updated: Vec<ViewId>,
    /// Sequence ranges whose nodes were detached and inserted again
    pub reconverted: Vec<Range<usize>>,
}

impl ViewPatch {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty()
            && self.removed.is_empty()
            && self.moved.is_empty()
            && self.updated.is_empty()
    }
}

/// Build the view of a whole sequence.
pub fn build(seq: &BlockSequence) -> ViewTree {
    let mut view = ViewTree::new();
    let changes: Vec<Change> = seq.iter().map(|b| Change::Insert { block: b.id }).collect();
    apply(&mut view, seq, &changes);
    view
}

/// Bring `view` up to date with `seq` after `changes`.
///
/// # Panics
///
/// If a block near a change breaks the list invariants.
pub fn apply(view: &mut ViewTree, seq: &BlockSequence, changes: &[Change]) -> ViewPatch {
    Downcast {
        view,
        seq,
        spare_items: HashMap::new(),
        touched: BTreeSet::new(),
        created: BTreeSet::new(),
        removed: BTreeSet::new(),
        moved: BTreeSet::new(),
        updated: BTreeSet::new(),
    }
    .run(changes)
}

/// One level of a block's ancestry: the kind of the list and the item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Level {
    kind: ListKind,
    item: ItemId,
}

/// (list, item) node pairs from the root down to a block.
type ViewChain = Vec<(ViewId, ViewId)>;

/// Ancestry of the block at `index`, outermost level first.
fn level_chain(seq: &BlockSequence, index: usize) -> Vec<Level> {
    let Some(list) = &seq[index].list else {
        return Vec::new();
    };
    let mut levels = vec![Level {
        kind: list.kind,
        item: list.item_id,
    }];
    let mut need = list.indent;
    let mut j = index;
    while need > 0 && j > 0 {
        j -= 1;
        let Some(earlier) = &seq[j].list else {
            break;
        };
        if earlier.indent < need {
            levels.push(Level {
                kind: earlier.kind,
                item: earlier.item_id,
            });
            need = earlier.indent;
        }
    }
    levels.reverse();
    levels
}

/// Ancestry of `block` derived from the ancestry of the block before it.
fn extend_chain(prev: &[Level], block: &Block) -> Option<Vec<Level>> {
    let Some(list) = &block.list else {
        return Some(Vec::new());
    };
    let mut levels = prev.get(..list.indent)?.to_vec();
    levels.push(Level {
        kind: list.kind,
        item: list.item_id,
    });
    Some(levels)
}

/// How many leading lists and items two adjacent blocks share.
fn sharing(a: &[Level], b: &[Level]) -> (usize, usize) {
    let mut lists = 0;
    let mut items = 0;
    for (x, y) in a.iter().zip(b) {
        if x.kind != y.kind {
            break;
        }
        lists += 1;
        if x.item != y.item {
            break;
        }
        items += 1;
    }
    (lists, items)
}

fn view_sharing(a: &ViewChain, b: &ViewChain) -> (usize, usize) {
    let mut lists = 0;
    let mut items = 0;
    for ((list_a, item_a), (list_b, item_b)) in a.iter().zip(b) {
        if list_a != list_b {
            break;
        }
        lists += 1;
        if item_a != item_b {
            break;
        }
        items += 1;
    }
    (lists, items)
}

struct Downcast<'a> {
    view: &'a mut ViewTree,
    seq: &'a BlockSequence,
    /// Emptied item nodes waiting to be reused
    spare_items: HashMap<ItemId, ViewId>,
    /// Items and lists whose inline flags or style need a refresh
    touched: BTreeSet<ViewId>,
    created: BTreeSet<ViewId>,
    removed: BTreeSet<ViewId>,
    moved: BTreeSet<ViewId>,
    updated: BTreeSet<ViewId>,
}

impl Downcast<'_> {
    fn run(mut self, changes: &[Change]) -> ViewPatch {
        let candidates = self.candidates(changes);
        self.drop_removed(changes);
        invariants::assert_valid(self.seq, candidates.iter().copied());

        let ranges = self.unclean_ranges(&candidates);
        for range in &ranges {
            self.rebuild(range.clone());
        }

        self.sync_content(changes);
        self.touch_lists(&candidates);
        self.refresh_touched();
        self.discard_spares();
        self.finish(ranges)
    }

    fn candidates(&self, changes: &[Change]) -> BTreeSet<usize> {
        let mut ids = Vec::new();
        for change in changes {
            let block = change.block();
            ids.push(block);
            if let Change::Remove { prev, next, .. } = change {
                ids.extend([*prev, *next].into_iter().flatten());
            }
            if let Some(node) = self.attached_node(block) {
                ids.extend(self.view.prev_block(node).and_then(|n| self.view.block_of(n)));
                ids.extend(self.view.next_block(node).and_then(|n| self.view.block_of(n)));
            }
        }

        let mut indices = BTreeSet::new();
        for id in ids {
            if let Some(i) = self.seq.position(id) {
                indices.extend(i.checked_sub(1));
                indices.insert(i);
                if i + 1 < self.seq.len() {
                    indices.insert(i + 1);
                }
            }
        }
        indices
    }

    fn drop_removed(&mut self, changes: &[Change]) {
        for change in changes {
            let Change::Remove { block, .. } = change else {
                continue;
            };
            let Some(node) = self.view.block_node(*block) else {
                continue;
            };
            self.detach_and_prune(node);
            if !self.seq.contains(*block) {
                self.view.delete(node);
                self.removed.insert(node);
            }
        }
    }

    fn unclean_ranges(&self, candidates: &BTreeSet<usize>) -> Vec<Range<usize>> {
        let mut ranges: Vec<Range<usize>> = Vec::new();
        for &i in candidates {
            if ranges.last().is_some_and(|r| i < r.end) || self.is_clean(i) {
                continue;
            }
            let mut end = i + 1;
            while end < self.seq.len() && !self.is_clean(end) {
                end += 1;
            }
            ranges.push(i..end);
        }
        ranges
    }

    fn is_clean(&self, i: usize) -> bool {
        let seq = self.seq;
        let Some(node) = self.attached_node(seq[i].id) else {
            return false;
        };

        // Blocks without a node are new; they go in between later
        let mut prev = None;
        let mut gap = false;
        for j in (0..i).rev() {
            if let Some(prev_node) = self.attached_node(seq[j].id) {
                prev = Some((j, prev_node));
                break;
            }
            gap = true;
        }
        if self.view.prev_block(node) != prev.map(|(_, n)| n) {
            return false;
        }

        let Some(view_chain) = self.view_chain(node) else {
            return false;
        };
        let levels = level_chain(seq, i);
        if !self.keys_match(&view_chain, &levels) {
            return false;
        }

        match prev {
            Some((j, prev_node)) if !gap => match self.view_chain(prev_node) {
                Some(prev_chain) => {
                    sharing(&level_chain(seq, j), &levels) == view_sharing(&prev_chain, &view_chain)
                }
                None => false,
            },
            _ => true,
        }
    }

    fn keys_match(&self, view_chain: &ViewChain, levels: &[Level]) -> bool {
        view_chain.len() == levels.len()
            && view_chain.iter().zip(levels).all(|((list, item), level)| {
                let list_kind = match self.view.node(*list).map(|n| &n.kind) {
                    Some(ViewKind::List { kind, .. }) => Some(*kind),
                    _ => None,
                };
                let item_id = match self.view.node(*item).map(|n| &n.kind) {
                    Some(ViewKind::Item { item_id }) => Some(*item_id),
                    _ => None,
                };
                list_kind == Some(level.kind) && item_id == Some(level.item)
            })
    }

    fn attached_node(&self, block: BlockId) -> Option<ViewId> {
        self.view
            .block_node(block)
            .filter(|node| self.view.parent(*node).is_some())
    }

    /// The (list, item) pairs above a block node, or `None` when the node
    /// does not hang below the root through proper list/item pairs.
    fn view_chain(&self, node: ViewId) -> Option<ViewChain> {
        let mut chain = Vec::new();
        let mut current = self.view.parent(node)?;
        loop {
            match self.view.node(current).map(|n| &n.kind) {
                Some(ViewKind::Root) => break,
                Some(ViewKind::Item { .. }) => {
                    let list = self.view.parent(current)?;
                    if !matches!(self.view.node(list).map(|n| &n.kind), Some(ViewKind::List { .. })) {
                        return None;
                    }
                    chain.push((list, current));
                    current = self.view.parent(list)?;
                }
                _ => return None,
            }
        }
        chain.reverse();
        Some(chain)
    }

    fn rebuild(&mut self, range: Range<usize>) {
        let seq = self.seq;
        invariants::assert_valid(seq, range.clone());
        log::trace!("downcast: reconverting blocks {range:?}");

        for block in &seq.blocks()[range.clone()] {
            if let Some(node) = self.view.block_node(block.id) {
                self.detach_and_prune(node);
            }
        }

        let next = seq.get(range.end).and_then(|b| self.attached_node(b.id));
        let mut prev_levels = match range.start.checked_sub(1) {
            Some(j) => level_chain(seq, j),
            None => Vec::new(),
        };
        for i in range.clone() {
            let levels = extend_chain(&prev_levels, &seq[i]).unwrap_or_else(|| level_chain(seq, i));
            let next = if i + 1 == range.end { next } else { None };
            self.insert_block(i, &prev_levels, &levels, next);
            prev_levels = levels;
        }
    }

    /// Attach block `i` after its predecessor (already in place) and, for the
    /// last block of a range, before the clean block `next`.
    fn insert_block(&mut self, i: usize, prev_levels: &[Level], levels: &[Level], next: Option<ViewId>) {
        let seq = self.seq;
        let block = &seq[i];
        let prev = i.checked_sub(1).and_then(|j| self.attached_node(seq[j].id));
        let next_levels = match next {
            Some(_) => level_chain(seq, i + 1),
            None => Vec::new(),
        };
        let (prev_lists, prev_items) = match prev {
            Some(_) => sharing(prev_levels, levels),
            None => (0, 0),
        };
        let (next_lists, next_items) = match next {
            Some(_) => sharing(levels, &next_levels),
            None => (0, 0),
        };

        let node = self.take_block_node(block);
        let mut parent = self.view.root();

        for k in 0..levels.len().max(1) {
            // Leaving the predecessor's list at this level: whatever follows
            // the predecessor in that list must end up after this block
            if k == prev_lists
                && k == prev_items
                && let Some(prev) = prev
            {
                self.split_after(prev, k);
            }
            let Some(level) = levels.get(k) else {
                break;
            };

            let vp = prev.and_then(|p| self.view_chain(p)).unwrap_or_default();
            let vn = next.and_then(|n| self.view_chain(n)).unwrap_or_default();

            let list = if k < prev_lists {
                vp[k].0
            } else if k < next_lists {
                vn[k].0
            } else {
                let style = block.list.as_ref().map(|l| l.style.clone()).unwrap_or_default();
                let list = self.view.create(ViewKind::List {
                    kind: level.kind,
                    style,
                });
                self.created.insert(list);
                let at = self.position_in(parent, prev, next);
                self.view.insert_child(parent, at, list);
                list
            };
            if k < prev_lists && k < next_lists && vp[k].0 != vn[k].0 {
                self.merge_into(vp[k].0, vn[k].0);
            }

            let item = if k < prev_items {
                vp[k].1
            } else if k < next_items {
                vn[k].1
            } else {
                let item = self.take_item(level.item);
                let at = self.position_in(list, prev, next);
                self.view.insert_child(list, at, item);
                item
            };
            if k < prev_items && k < next_items && vp[k].1 != vn[k].1 {
                self.merge_into(vp[k].1, vn[k].1);
            }

            self.touched.insert(list);
            self.touched.insert(item);
            parent = item;
        }

        let at = self.position_in(parent, prev, next);
        self.view.insert_child(parent, at, node);
        if parent == self.view.root() {
            self.set_inline(node, false);
        } else {
            self.touched.insert(parent);
        }
    }

    /// Index for a new child of `parent`: after the branch holding `prev`,
    /// else before the branch holding `next`, else first.
    fn position_in(&self, parent: ViewId, prev: Option<ViewId>, next: Option<ViewId>) -> usize {
        if let Some(child) = prev.and_then(|p| self.child_toward(parent, p)) {
            return self.view.index_in_parent(child).map_or(0, |i| i + 1);
        }
        if let Some(child) = next.and_then(|n| self.child_toward(parent, n)) {
            return self.view.index_in_parent(child).unwrap_or(0);
        }
        0
    }

    /// The child of `ancestor` on the path down to `node`.
    fn child_toward(&self, ancestor: ViewId, node: ViewId) -> Option<ViewId> {
        let mut current = node;
        loop {
            let parent = self.view.parent(current)?;
            if parent == ancestor {
                return Some(current);
            }
            current = parent;
        }
    }

    /// Move everything after `prev`'s item in `prev`'s list at `level` into
    /// a new list of the same kind and style placed right after it.
    fn split_after(&mut self, prev: ViewId, level: usize) {
        let chain = self.view_chain(prev);
        let Some(&(list, item)) = chain.as_ref().and_then(|c| c.get(level)) else {
            return;
        };
        let Some(at) = self.view.index_in_parent(item) else {
            return;
        };
        let trailing = self.view.children(list).get(at + 1..).unwrap_or_default().to_vec();
        if trailing.is_empty() {
            return;
        }
        let (Some(kind), Some(grand)) = (
            self.view.node(list).map(|n| n.kind.clone()),
            self.view.parent(list),
        ) else {
            return;
        };

        let tail = self.view.create(kind);
        self.created.insert(tail);
        let index = self.view.index_in_parent(list).map_or(0, |i| i + 1);
        self.view.insert_child(grand, index, tail);
        for (offset, child) in trailing.into_iter().enumerate() {
            self.view.detach(child);
            self.view.insert_child(tail, offset, child);
            self.moved.insert(child);
        }
        self.touched.insert(list);
        self.touched.insert(tail);
    }

    /// Append the children of `from` to `into` and delete `from`.
    fn merge_into(&mut self, into: ViewId, from: ViewId) {
        for child in self.view.children(from).to_vec() {
            self.view.detach(child);
            let at = self.view.children(into).len();
            self.view.insert_child(into, at, child);
            self.moved.insert(child);
        }
        self.view.delete(from);
        self.removed.insert(from);
        self.touched.insert(into);
    }

    /// Detach a node and every ancestor it leaves empty. Emptied items are
    /// kept for reuse, emptied lists are deleted.
    fn detach_and_prune(&mut self, node: ViewId) {
        let Some(mut parent) = self.view.parent(node) else {
            return;
        };
        self.view.detach(node);
        let root = self.view.root();
        while parent != root && self.view.children(parent).is_empty() {
            let up = self.view.parent(parent);
            self.view.detach(parent);
            let spare = match self.view.node(parent).map(|n| &n.kind) {
                Some(ViewKind::Item { item_id }) => Some(*item_id),
                _ => None,
            };
            match spare {
                Some(item_id) if !self.spare_items.contains_key(&item_id) => {
                    self.spare_items.insert(item_id, parent);
                }
                _ => {
                    self.view.delete(parent);
                    self.removed.insert(parent);
                }
            }
            let Some(up) = up else {
                return;
            };
            parent = up;
        }
        self.touched.insert(parent);
    }

    fn take_block_node(&mut self, block: &Block) -> ViewId {
        match self.view.block_node(block.id) {
            Some(node) => {
                self.moved.insert(node);
                self.sync_block(node, block);
                node
            }
            None => {
                let node = self.view.create(ViewKind::Block(BlockView {
                    block_id: block.id,
                    kind: block.kind.clone(),
                    text: block.text.clone(),
                    markers: block.markers.clone(),
                    inline: false,
                }));
                self.created.insert(node);
                node
            }
        }
    }

    fn take_item(&mut self, item_id: ItemId) -> ViewId {
        match self.spare_items.remove(&item_id) {
            Some(node) => {
                self.moved.insert(node);
                node
            }
            None => {
                let node = self.view.create(ViewKind::Item { item_id });
                self.created.insert(node);
                node
            }
        }
    }

    fn sync_block(&mut self, node: ViewId, block: &Block) {
        let Some(ViewKind::Block(view)) = self.view.kind_mut(node) else {
            return;
        };
        let mut changed = false;
        if view.kind != block.kind {
            view.kind = block.kind.clone();
            changed = true;
        }
        if view.text != block.text {
            view.text = block.text.clone();
            changed = true;
        }
        if view.markers != block.markers {
            view.markers = block.markers.clone();
            changed = true;
        }
        if changed {
            self.updated.insert(node);
        }
    }

    fn sync_content(&mut self, changes: &[Change]) {
        let seq = self.seq;
        for change in changes {
            let Change::Content { block } = change else {
                continue;
            };
            let (Some(block), Some(node)) = (seq.block(*block), self.attached_node(*block)) else {
                continue;
            };
            self.sync_block(node, block);
            if let Some(parent) = self.view.parent(node) {
                self.touched.insert(parent);
            }
        }
    }

    /// Mark the lists above each candidate; an attribute edit may have
    /// changed their style without changing structure.
    fn touch_lists(&mut self, candidates: &BTreeSet<usize>) {
        for &i in candidates {
            let Some(node) = self.attached_node(self.seq[i].id) else {
                continue;
            };
            for (list, _) in self.view_chain(node).unwrap_or_default() {
                self.touched.insert(list);
            }
        }
    }

    fn refresh_touched(&mut self) {
        for id in std::mem::take(&mut self.touched) {
            if !self.view.is_attached(id) {
                continue;
            }
            let kind = self.view.node(id).map(|n| &n.kind);
            let is_item = matches!(kind, Some(ViewKind::Item { .. }));
            let is_list = matches!(kind, Some(ViewKind::List { .. }));
            if is_item {
                self.refresh_inline(id);
            } else if is_list {
                self.refresh_style(id);
            }
        }
    }

    /// Collapse the paragraph of a single-paragraph item. An empty one stays
    /// wrapped when nested lists follow, so it is not mistaken for a list
    /// without an item around it.
    fn refresh_inline(&mut self, item: ViewId) {
        let children = self.view.children(item).to_vec();
        let blocks: Vec<ViewId> = children
            .iter()
            .copied()
            .filter(|c| self.view.block_of(*c).is_some())
            .collect();
        let has_lists = blocks.len() < children.len();
        let collapse = match blocks.as_slice() {
            [only] => self
                .view
                .node(*only)
                .and_then(ViewNode::as_block)
                .is_some_and(|b| {
                    b.kind == BlockKind::Paragraph
                        && (!b.text.is_empty() || !b.markers.is_empty() || !has_lists)
                }),
            _ => false,
        };
        for block in blocks {
            self.set_inline(block, collapse);
        }
    }

    fn set_inline(&mut self, node: ViewId, inline: bool) {
        if let Some(ViewKind::Block(block)) = self.view.kind_mut(node)
            && block.inline != inline
        {
            block.inline = inline;
            self.updated.insert(node);
        }
    }

    /// A list shows the style of its first item.
    fn refresh_style(&mut self, list: ViewId) {
        let style = self
            .view
            .children(list)
            .first()
            .and_then(|item| self.view.first_block(*item))
            .and_then(|node| self.view.block_of(node))
            .and_then(|id| self.seq.block(id))
            .and_then(|block| block.list.as_ref())
            .map(|l| l.style.clone());
        let Some(style) = style else {
            return;
        };
        if let Some(ViewKind::List { style: current, .. }) = self.view.kind_mut(list)
            && *current != style
        {
            *current = style;
            self.updated.insert(list);
        }
    }

    fn discard_spares(&mut self) {
        for (_, node) in std::mem::take(&mut self.spare_items) {
            self.view.delete(node);
            self.removed.insert(node);
        }
    }

    fn finish(self, reconverted: Vec<Range<usize>>) -> ViewPatch {
        let transient: BTreeSet<ViewId> = self.created.intersection(&self.removed).copied().collect();
        let keep = |set: &BTreeSet<ViewId>, without: &[&BTreeSet<ViewId>]| -> Vec<ViewId> {
            set.iter()
                .filter(|id| !without.iter().any(|w| w.contains(*id)))
                .copied()
                .collect()
        };
        let patch = ViewPatch {
            created: keep(&self.created, &[&transient]),
            removed: keep(&self.removed, &[&transient]),
            moved: keep(&self.moved, &[&self.created, &self.removed]),
            updated: keep(&self.updated, &[&self.created, &self.removed]),
            reconverted,
        };
        log::debug!(
            "downcast: {} range(s), {} created, {} removed, {} moved, {} updated",
            patch.reconverted.len(),
            patch.created.len(),
            patch.removed.len(),
            patch.moved.len(),
            patch.updated.len()
        );
        patch
    }
}
