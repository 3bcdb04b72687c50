mod common;

use common::{indents, item, item_ids, plain};
use flatlist_engine::models::{BlockId, BlockSequence, IdGenerator, ItemId};
use flatlist_engine::view::downcast::build;
use flatlist_engine::{Cmd, Document, invariants, postfix, upcast_str};
use pretty_assertions::assert_eq;

#[test]
fn deeper_block_reusing_an_item_id_gets_a_fresh_one() {
    let mut seq = BlockSequence::from_blocks([
        item(1, 0xa, 0, "A"),
        item(2, 0xb, 0, "B"),
        item(3, 0xb, 1, "C"),
    ]);
    let changes = seq.take_changes();

    let report = postfix(&mut seq, &changes, &mut IdGenerator::sequential(100));

    assert_eq!(report.changed, vec![BlockId(3)]);
    assert_eq!(
        item_ids(&seq),
        vec![Some(ItemId(0xa)), Some(ItemId(0xb)), Some(ItemId(100))]
    );
    assert_eq!(indents(&seq), vec![Some(0), Some(0), Some(1)]);
}

#[test]
fn indent_jumps_are_clamped() {
    let mut seq = BlockSequence::from_blocks([
        item(1, 1, 0, "A"),
        item(2, 2, 4, "B"),
        item(3, 3, 4, "C"),
    ]);
    let changes = seq.take_changes();

    postfix(&mut seq, &changes, &mut IdGenerator::sequential(100));

    assert_eq!(indents(&seq), vec![Some(0), Some(1), Some(1)]);
    assert_eq!(invariants::check(&seq), Ok(()));
}

#[test]
fn list_directly_inside_list_continues_the_outer_level() {
    let blocks = upcast_str("<ul><ul><li>X</li></ul></ul>", &mut IdGenerator::sequential(1));
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].text, "X");
    assert_eq!(blocks[0].list.as_ref().unwrap().indent, 1);

    // With nothing above it, the postfixer lifts it to the top level
    let doc = Document::from_blocks(blocks, IdGenerator::sequential(100));
    assert_eq!(indents(doc.blocks()), vec![Some(0)]);
}

#[test]
fn text_edit_keeps_container_and_item_nodes() {
    let mut doc = Document::from_markup(
        "<ul><li><p>A1</p><p>A2</p></li><li>B</li></ul>",
        IdGenerator::sequential(1),
    );
    let view = doc.view();
    let list = view.children(view.root())[0];
    let first_item = view.children(list)[0];
    let second_item = view.children(list)[1];
    let a1 = view.block_node(doc.blocks()[0].id).unwrap();
    let a2 = view.block_node(doc.blocks()[1].id).unwrap();

    let patch = doc
        .apply([Cmd::SetText {
            at: 0,
            text: "A1 edited".into(),
        }])
        .unwrap();

    let view = doc.view();
    assert_eq!(view.children(view.root()), &[list]);
    assert_eq!(view.children(list), &[first_item, second_item]);
    assert_eq!(view.children(first_item), &[a1, a2]);
    assert!(patch.view.created.is_empty());
    assert!(patch.view.removed.is_empty());
    assert!(patch.view.moved.is_empty());
    assert!(patch.view.reconverted.is_empty());
    assert_eq!(patch.view.updated, vec![a1]);
    assert_eq!(
        doc.to_markup_string(),
        "<ul><li><p>A1 edited</p><p>A2</p></li><li>B</li></ul>"
    );
}

#[test]
fn pasted_duplicate_item_ids_stay_separate_items() {
    let mut doc = Document::from_blocks(
        [item(1, 1, 0, "A"), item(2, 2, 0, "B")],
        IdGenerator::sequential(100),
    );

    doc.apply([Cmd::InsertBlock {
        at: 1,
        block: item(10, 0x5, 0, "X"),
    }])
    .unwrap();
    doc.apply([Cmd::InsertBlock {
        at: 3,
        block: item(11, 0x5, 0, "X again"),
    }])
    .unwrap();

    let ids = item_ids(doc.blocks());
    assert_eq!(ids[1], Some(ItemId(0x5)));
    assert_ne!(ids[3], Some(ItemId(0x5)));
    assert_eq!(doc.check(), Ok(()));

    let markup = doc.to_markup_string();
    assert_eq!(
        markup,
        "<ul><li>A</li><li>X</li><li>B</li><li>X again</li></ul>"
    );

    // Round trip: four sibling items, none merged
    let again = upcast_str(&markup, &mut IdGenerator::sequential(1000));
    let again = BlockSequence::from_blocks(again);
    let unique: std::collections::HashSet<_> = item_ids(&again).into_iter().collect();
    assert_eq!(unique.len(), 4);
    assert_eq!(indents(&again), vec![Some(0); 4]);
}

#[test]
fn duplicate_ids_in_one_paste_are_split_too() {
    let mut doc = Document::from_blocks([plain(1, "top")], IdGenerator::sequential(100));
    doc.apply([
        Cmd::InsertBlock {
            at: 1,
            block: item(10, 0x5, 0, "X"),
        },
        Cmd::InsertBlock {
            at: 2,
            block: plain(11, "between"),
        },
        Cmd::InsertBlock {
            at: 3,
            block: item(12, 0x5, 0, "X again"),
        },
    ])
    .unwrap();

    let ids = item_ids(doc.blocks());
    assert_eq!(ids[1], Some(ItemId(0x5)));
    assert_eq!(ids[3], Some(ItemId(100)));
    assert_eq!(build(doc.blocks()).outline(), doc.view().outline());
}
