//! Builders shared by the integration tests.
#![allow(dead_code)]

use flatlist_engine::models::{
    Block, BlockId, BlockKind, BlockSequence, ItemId, ListAttributes, ListKind,
};
use flatlist_engine::Cmd;

pub fn item(id: u128, item: u128, indent: usize, text: &str) -> Block {
    Block::paragraph(BlockId(id), text).with_list(ListAttributes::new(
        indent,
        ItemId(item),
        ListKind::Unordered,
    ))
}

pub fn plain(id: u128, text: &str) -> Block {
    Block::paragraph(BlockId(id), text)
}

/// Indents of a sequence, `None` for plain blocks.
pub fn indents(seq: &BlockSequence) -> Vec<Option<usize>> {
    seq.iter().map(|b| b.list.as_ref().map(|l| l.indent)).collect()
}

pub fn item_ids(seq: &BlockSequence) -> Vec<Option<ItemId>> {
    seq.iter().map(|b| b.list.as_ref().map(|l| l.item_id)).collect()
}

fn kind(raw: u8) -> ListKind {
    match raw % 3 {
        0 => ListKind::Unordered,
        1 => ListKind::Ordered,
        _ => ListKind::Todo,
    }
}

/// Block text, often empty and sometimes with edge whitespace, newlines
/// or characters that need escaping in markup.
fn text(raw: u8) -> String {
    match raw % 8 {
        0 | 4 => String::new(),
        1 => format!(" t{raw} "),
        2 => format!("t{raw}\n"),
        3 => format!("<{raw}> & \"q\""),
        5 => "  ".to_string(),
        6 => format!("\tt{raw}\nu "),
        _ => format!("t{raw}"),
    }
}

/// Blocks from arbitrary tuples. Item ids come from a small pool so
/// collisions and scattered items are common; indents may jump.
pub fn blocks_from(raw: &[(u8, u8, u8, u8)]) -> Vec<Block> {
    raw.iter()
        .take(24)
        .enumerate()
        .map(|(i, &(indent, item, list_kind, body))| {
            let id = BlockId(i as u128 + 1);
            let block_kind = if body % 7 == 6 {
                BlockKind::Heading { level: 2 }
            } else {
                BlockKind::Paragraph
            };
            let block = Block::new(id, block_kind, text(body));
            if item % 5 == 4 {
                block
            } else {
                block.with_list(ListAttributes::new(
                    (indent % 5) as usize,
                    ItemId(1000 + (item % 6) as u128),
                    kind(list_kind),
                ))
            }
        })
        .collect()
}

/// A batch of commands from arbitrary tuples. `len` is the sequence length
/// before the batch and `next_id` hands out ids for inserted blocks. Some
/// commands may turn out invalid once earlier ones have run.
pub fn commands_from(raw: &[(u8, u8, u8, u8)], mut len: usize, next_id: &mut u128) -> Vec<Cmd> {
    let mut cmds = Vec::new();
    for &(op, a, b, c) in raw.iter().take(6) {
        let at = |n: usize| if n == 0 { 0 } else { a as usize % n };
        let cmd = match op % 8 {
            0 => {
                *next_id += 1;
                let block = Block::paragraph(BlockId(*next_id), text(c));
                let block = if b % 4 == 3 {
                    block
                } else {
                    block.with_list(ListAttributes::new(
                        (b % 4) as usize,
                        ItemId(1000 + (c % 6) as u128),
                        kind(c),
                    ))
                };
                len += 1;
                Cmd::InsertBlock { at: at(len), block }
            }
            _ if len == 0 => continue,
            1 => {
                len -= 1;
                Cmd::RemoveBlock { at: at(len + 1) }
            }
            2 => Cmd::MoveBlock {
                from: at(len),
                to: b as usize % len,
            },
            3 => Cmd::SetList {
                at: at(len),
                list: (c % 7 != 0).then(|| {
                    ListAttributes::new((b % 4) as usize, ItemId(1000 + (c % 6) as u128), kind(c))
                }),
            },
            4 => {
                len += 1;
                Cmd::SplitBlock {
                    at: at(len - 1),
                    offset: 0,
                }
            }
            5 if len > 1 => {
                len -= 1;
                Cmd::MergeBlocks {
                    at: 1 + a as usize % len,
                }
            }
            6 => Cmd::SetText {
                at: at(len),
                text: text(b),
            },
            _ => Cmd::ToggleList {
                at: at(len),
                kind: kind(b),
            },
        };
        cmds.push(cmd);
    }
    cmds
}
