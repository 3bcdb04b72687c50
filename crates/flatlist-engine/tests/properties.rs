mod common;

use common::{blocks_from, commands_from};
use flatlist_engine::models::{BlockSequence, IdGenerator, ItemId};
use flatlist_engine::position::{ModelPosition, to_sequence_position, to_tree_position};
use flatlist_engine::view::ViewTree;
use flatlist_engine::view::downcast::build;
use flatlist_engine::view::render::to_markup;
use flatlist_engine::{Document, invariants, postfix, upcast_str};

type Raw = Vec<(u8, u8, u8, u8)>;

fn postfixed(raw: &Raw) -> BlockSequence {
    let mut seq = BlockSequence::from_blocks(blocks_from(raw));
    let changes = seq.take_changes();
    postfix(&mut seq, &changes, &mut IdGenerator::sequential(1 << 20));
    seq.take_changes();
    seq
}

/// What survives a round trip: everything except the item ids
/// themselves, which are replaced by "same item as the block before".
fn shape(seq: &BlockSequence) -> Vec<String> {
    let mut prev: Option<ItemId> = None;
    seq.iter()
        .map(|b| {
            let list = match &b.list {
                Some(l) => {
                    let continues = prev == Some(l.item_id);
                    prev = Some(l.item_id);
                    format!("{}:{:?}:{}", l.indent, l.kind, if continues { "+" } else { "new" })
                }
                None => {
                    prev = None;
                    "-".to_string()
                }
            };
            format!("{list} {:?} {:?}", b.kind, b.text)
        })
        .collect()
}

/// Every sequence position maps into the view and back unchanged.
fn positions_round_trip_in(seq: &BlockSequence, view: &ViewTree) -> bool {
    let mut positions = vec![ModelPosition::Before(seq.len())];
    for (block, b) in seq.iter().enumerate() {
        positions.push(ModelPosition::Before(block));
        positions.extend((0..=b.text_len()).map(|offset| ModelPosition::Inside { block, offset }));
    }
    positions.into_iter().all(|pos| {
        to_tree_position(seq, view, pos).and_then(|tree| to_sequence_position(seq, view, &tree)) == Ok(pos)
    })
}

quickcheck::quickcheck! {
    fn postfix_establishes_invariants(raw: Raw) -> bool {
        invariants::check(&postfixed(&raw)).is_ok()
    }

    fn postfix_is_idempotent(raw: Raw) -> bool {
        let mut seq = BlockSequence::from_blocks(blocks_from(&raw));
        let changes = seq.take_changes();
        let mut ids = IdGenerator::sequential(1 << 20);
        postfix(&mut seq, &changes, &mut ids);
        seq.take_changes();

        let again = postfix(&mut seq, &changes, &mut ids);
        again.is_empty() && seq.changes().is_empty()
    }

    fn postfix_leaves_valid_runs_alone(raw: Raw) -> bool {
        let seq = postfixed(&raw);
        let mut copy = BlockSequence::from_blocks(seq.iter().cloned());
        let changes = copy.take_changes();
        postfix(&mut copy, &changes, &mut IdGenerator::sequential(1 << 30)).is_empty()
    }

    fn markup_round_trip_preserves_shape(raw: Raw) -> bool {
        let seq = postfixed(&raw);
        let markup = flatlist_markup::write(&to_markup(&build(&seq)));
        let again = BlockSequence::from_blocks(upcast_str(&markup, &mut IdGenerator::sequential(1 << 20)));
        shape(&again) == shape(&seq)
    }

    fn pretty_markup_round_trip_preserves_shape(raw: Raw) -> bool {
        let seq = postfixed(&raw);
        let markup = flatlist_markup::write_pretty(&to_markup(&build(&seq)), 2);
        let again = BlockSequence::from_blocks(upcast_str(&markup, &mut IdGenerator::sequential(1 << 20)));
        shape(&again) == shape(&seq)
    }

    fn incremental_view_matches_full_build(raw: Raw, batches: Vec<Raw>) -> bool {
        let mut doc = Document::from_blocks(blocks_from(&raw), IdGenerator::sequential(1 << 20));
        let mut next_id = 1 << 16;
        for batch in batches.iter().take(5) {
            let cmds = commands_from(batch, doc.blocks().len(), &mut next_id);
            // Rejected commands still leave a consistent document behind
            let _ = doc.apply(cmds);
            if doc.check().is_err() || doc.view().outline() != build(doc.blocks()).outline() {
                return false;
            }
        }
        true
    }

    fn positions_round_trip(raw: Raw) -> bool {
        let seq = postfixed(&raw);
        positions_round_trip_in(&seq, &build(&seq))
    }

    fn positions_round_trip_after_edits(raw: Raw, batch: Raw) -> bool {
        let mut doc = Document::from_blocks(blocks_from(&raw), IdGenerator::sequential(1 << 20));
        let mut next_id = 1 << 16;
        let cmds = commands_from(&batch, doc.blocks().len(), &mut next_id);
        let _ = doc.apply(cmds);
        positions_round_trip_in(doc.blocks(), doc.view())
    }
}
