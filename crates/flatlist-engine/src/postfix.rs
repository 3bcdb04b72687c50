//! # Postfixer
//!
//! Restores the list invariants after a batch of edits, before any view is
//! derived from the sequence.
//!
//! Only runs next to a change are visited. For every such run three passes
//! are made, in this order:
//!
//! 1. **Indent**: an indent may exceed the previous list block's indent by
//!    at most one, and the run head sits at 0. Larger jumps are clamped.
//! 2. **Item ids**: an item's blocks are contiguous and agree on indent and
//!    kind. A block that interrupts its item, or that reuses an id already
//!    seen in this batch or owned by a run outside it, starts a fresh item.
//!    The earlier occurrence keeps the original id.
//! 3. **Style**: every item takes the style of the first item of its
//!    container.
//!
//! The passes only rewrite list attributes, so positions never shift and
//! run boundaries stay put. Every rewrite goes through
//! [`BlockSequence::set_list`] and is therefore logged like any other edit.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::ops::Range;

use crate::models::{BlockId, BlockSequence, Change, IdGenerator, ItemId, ListKind, ListStyle};

/// Outcome of one postfix run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostfixReport {
    /// Blocks whose list attributes were rewritten, in document order
    pub changed: Vec<BlockId>,
    /// Runs that were visited, as index ranges
    pub runs: Vec<Range<usize>>,
}

impl PostfixReport {
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }
}

/// Repair the runs touched by `changes`.
///
/// Idempotent: a second call with the same changes finds nothing to do.
pub fn postfix(
    seq: &mut BlockSequence,
    changes: &[Change],
    ids: &mut IdGenerator,
) -> PostfixReport {
    let runs = affected_runs(seq, changes);
    let mut seen = items_owned_elsewhere(seq, &runs);
    let mut changed = BTreeSet::new();

    for run in &runs {
        fix_indents(seq, run.clone(), &mut changed);
        fix_items(seq, run.clone(), &mut seen, ids, &mut changed);
        fix_styles(seq, run.clone(), &mut changed);
    }

    if !changed.is_empty() {
        log::debug!(
            "postfix rewrote {} block(s) across {} run(s)",
            changed.len(),
            runs.len()
        );
    }

    PostfixReport {
        changed: changed.into_iter().map(|i| seq[i].id).collect(),
        runs,
    }
}

/// Heads of the runs containing a changed block or one of its neighbours.
fn affected_runs(seq: &BlockSequence, changes: &[Change]) -> Vec<Range<usize>> {
    let mut touched = BTreeSet::new();
    for change in changes {
        match change {
            Change::Remove { prev, next, .. } => {
                touched.extend([prev, next].into_iter().flatten().filter_map(|id| seq.position(*id)));
            }
            other => touched.extend(seq.position(other.block())),
        }
    }

    let mut runs: BTreeMap<usize, usize> = BTreeMap::new();
    let mut last: Option<Range<usize>> = None;
    for i in touched {
        for j in [i.checked_sub(1), Some(i), Some(i + 1)].into_iter().flatten() {
            if last.as_ref().is_some_and(|run| run.contains(&j)) {
                continue;
            }
            if let Some(run) = seq.run_bounds(j) {
                runs.entry(run.start).or_insert(run.end);
                last = Some(run);
            }
        }
    }
    runs.into_iter().map(|(start, end)| start..end).collect()
}

/// Item ids that also occur outside the runs being fixed. Those runs are
/// left alone, so their claim on the id wins.
fn items_owned_elsewhere(seq: &BlockSequence, runs: &[Range<usize>]) -> HashSet<ItemId> {
    let mut local: HashMap<ItemId, usize> = HashMap::new();
    for run in runs {
        for block in &seq.blocks()[run.clone()] {
            if let Some(list) = &block.list {
                *local.entry(list.item_id).or_default() += 1;
            }
        }
    }
    local
        .into_iter()
        .filter(|(item, count)| seq.item_occurrences(*item) > *count)
        .map(|(item, _)| item)
        .collect()
}

fn fix_indents(seq: &mut BlockSequence, run: Range<usize>, changed: &mut BTreeSet<usize>) {
    let mut prev: Option<usize> = None;
    for i in run {
        let Some(mut list) = seq[i].list.clone() else {
            continue;
        };
        let max = prev.map_or(0, |p| p + 1);
        if list.indent > max {
            log::debug!(
                "block {}: indent {} clamped to {}",
                seq[i].id,
                list.indent,
                max
            );
            list.indent = max;
            seq.set_list(i, Some(list));
            changed.insert(i);
        }
        prev = Some(list_indent(seq, i));
    }
}

struct OpenItem {
    original: ItemId,
    assigned: ItemId,
    indent: usize,
    kind: ListKind,
}

fn fix_items(
    seq: &mut BlockSequence,
    run: Range<usize>,
    seen: &mut HashSet<ItemId>,
    ids: &mut IdGenerator,
    changed: &mut BTreeSet<usize>,
) {
    let mut open: Option<OpenItem> = None;
    for i in run {
        let Some(mut list) = seq[i].list.clone() else {
            continue;
        };

        let continued = open
            .as_ref()
            .filter(|o| o.original == list.item_id && o.indent == list.indent && o.kind == list.kind)
            .map(|o| o.assigned);

        let assigned = match continued {
            Some(assigned) => assigned,
            None => {
                let assigned = if seen.contains(&list.item_id) {
                    fresh_item(seq, ids, seen)
                } else {
                    list.item_id
                };
                seen.insert(assigned);
                open = Some(OpenItem {
                    original: list.item_id,
                    assigned,
                    indent: list.indent,
                    kind: list.kind,
                });
                assigned
            }
        };

        if assigned != list.item_id {
            log::debug!(
                "block {}: item {} reused, now {}",
                seq[i].id,
                list.item_id,
                assigned
            );
            list.item_id = assigned;
            seq.set_list(i, Some(list));
            changed.insert(i);
        }
    }
}

fn fresh_item(seq: &BlockSequence, ids: &mut IdGenerator, seen: &HashSet<ItemId>) -> ItemId {
    loop {
        let id = ids.item_id();
        if !seen.contains(&id) && seq.item_occurrences(id) == 0 {
            return id;
        }
    }
}

fn fix_styles(seq: &mut BlockSequence, run: Range<usize>, changed: &mut BTreeSet<usize>) {
    // Open containers from the outermost level inwards
    let mut containers: Vec<(ListKind, ListStyle)> = Vec::new();
    for i in run {
        let Some(mut list) = seq[i].list.clone() else {
            continue;
        };
        containers.truncate(list.indent + 1);
        let same_container = containers
            .get(list.indent)
            .is_some_and(|(kind, _)| *kind == list.kind);
        if !same_container {
            containers.truncate(list.indent);
            containers.push((list.kind, list.style.clone()));
        }
        let Some((_, style)) = containers.last() else {
            continue;
        };
        if list.style != *style {
            list.style = style.clone();
            seq.set_list(i, Some(list));
            changed.insert(i);
        }
    }
}

fn list_indent(seq: &BlockSequence, i: usize) -> usize {
    seq[i].list.as_ref().map_or(0, |l| l.indent)
}
