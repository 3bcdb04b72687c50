// Benchmark helper functions - Rust's dead code analysis doesn't understand
// that these are used by benchmark files in the same directory
// See: https://users.rust-lang.org/t/cargo-rustc-benches-awarnings/110111/2
#[allow(dead_code)]
pub fn generate_list_markup(items: usize) -> String {
    let base = "<h2>Section</h2><p>Paragraph with some content.</p><ul><li>Bullet point<ul><li>Nested item<ol><li>Deep one</li><li>Deep two</li></ol></li></ul></li><li><p>Two</p><p>paragraphs</p></li></ul>";
    base.repeat(items.div_ceil(5))
}

/// `count` list blocks whose indents jump around, for the postfixer.
#[allow(dead_code)]
pub fn generate_jagged_blocks(count: usize) -> Vec<flatlist_engine::models::Block> {
    use flatlist_engine::models::{Block, BlockId, ItemId, ListAttributes, ListKind};

    (0..count)
        .map(|i| {
            let indent = (i * 7) % 5;
            // Every tenth block reuses an earlier item id
            let item = if i % 10 == 9 { i - 5 } else { i };
            Block::paragraph(BlockId(i as u128 + 1), format!("block {i}")).with_list(
                ListAttributes::new(indent, ItemId(item as u128 + 1), ListKind::Unordered),
            )
        })
        .collect()
}
