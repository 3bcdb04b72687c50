use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand};
use flatlist_config::{Config, IdStrategy};
use flatlist_engine::models::{Block, BlockKind, BlockSequence, IdGenerator};
use flatlist_engine::{Document, MarkupLayout, invariants, io, postfix, upcast_str};

#[derive(Parser)]
#[command(name = "flatlist")]
#[command(about = "Normalize and inspect list documents kept as flat block sequences")]
struct Cli {
    /// Config file to use instead of ~/.config/flatlist/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Read markup, repair its lists and print it back out
    Normalize {
        file: PathBuf,
        /// Write everything on one line
        #[arg(long)]
        compact: bool,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the flat block sequence, one block per line
    Blocks { file: PathBuf },
    /// Print the nested view derived from the blocks
    Outline { file: PathBuf },
    /// Report list problems in the markup as written, before repair
    Check { file: PathBuf },
}

fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(2);
        }
    };

    init_logging(&config);

    match run(cli.command, &config) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(2);
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config_path = path.map_or_else(Config::config_path, Path::to_path_buf);
    let config = Config::load_from_path(&config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;
    Ok(config.unwrap_or_default())
}

fn init_logging(config: &Config) {
    let rust_log = std::env::var("RUST_LOG").ok();
    let _ = logger_builder(config, rust_log.as_deref()).try_init();
}

/// `RUST_LOG` replaces both the `warn` default and the config filter.
fn logger_builder(config: &Config, rust_log: Option<&str>) -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    match rust_log {
        Some(filters) => {
            builder.parse_filters(filters);
        }
        None => {
            builder.filter_level(log::LevelFilter::Warn);
            if let Some(filter) = &config.log_filter {
                builder.parse_filters(filter);
            }
        }
    }
    builder
}

fn id_generator(strategy: IdStrategy) -> IdGenerator {
    match strategy {
        IdStrategy::Random => IdGenerator::random(),
        IdStrategy::Sequential => IdGenerator::sequential(1),
    }
}

/// Run one command. `Ok(false)` means the command worked but found
/// problems worth a non-zero exit.
fn run(command: Command, config: &Config) -> anyhow::Result<bool> {
    match command {
        Command::Normalize {
            file,
            compact,
            output,
        } => {
            let doc = load(&file, config)?;
            let layout = if compact || !config.render.pretty {
                MarkupLayout::Compact
            } else {
                MarkupLayout::Pretty(config.render.indent_width)
            };
            match output {
                Some(output) => {
                    let output = config.resolve_document(&output);
                    io::save_document(&output, &doc, layout)
                        .with_context(|| format!("writing {}", output.display()))?;
                    log::info!("wrote {} blocks to {}", doc.blocks().len(), output.display());
                }
                None => println!("{}", render(&doc, layout)),
            }
            Ok(true)
        }
        Command::Blocks { file } => {
            let doc = load(&file, config)?;
            print!("{}", block_listing(doc.blocks()));
            Ok(true)
        }
        Command::Outline { file } => {
            let doc = load(&file, config)?;
            print!("{}", doc.view().outline());
            Ok(true)
        }
        Command::Check { file } => {
            let path = config.resolve_document(&file);
            let markup =
                io::read_file(&path).with_context(|| format!("reading {}", path.display()))?;
            let report = check_markup(&markup, id_generator(config.ids));
            print!("{report}");
            Ok(report.is_clean())
        }
    }
}

fn load(file: &Path, config: &Config) -> anyhow::Result<Document> {
    let path = config.resolve_document(file);
    let doc = io::load_document(&path, id_generator(config.ids))
        .with_context(|| format!("loading {}", path.display()))?;
    log::debug!("{}: {} blocks", path.display(), doc.blocks().len());
    Ok(doc)
}

fn render(doc: &Document, layout: MarkupLayout) -> String {
    match layout {
        MarkupLayout::Compact => doc.to_markup_string(),
        MarkupLayout::Pretty(width) => doc.to_markup_pretty(width),
    }
}

fn kind_label(kind: &BlockKind) -> String {
    match kind {
        BlockKind::Paragraph => "p".to_string(),
        BlockKind::Heading { level } => format!("h{level}"),
        BlockKind::Table { rows } => format!("table[{}]", rows.len()),
    }
}

fn block_line(index: usize, block: &Block) -> String {
    let list = match &block.list {
        Some(list) => format!("{:>2} {:>8} {:?}", list.indent, list.item_id, list.kind),
        None => format!("{:>2} {:>8} -", "-", "-"),
    };
    format!(
        "{index:>4} {:>8} {list} {} {:?}",
        block.id,
        kind_label(&block.kind),
        block.text
    )
}

fn block_listing(seq: &BlockSequence) -> String {
    let mut out = String::new();
    for (index, block) in seq.iter().enumerate() {
        let _ = writeln!(out, "{}", block_line(index, block));
    }
    out
}

struct CheckReport {
    blocks: usize,
    violation: Option<String>,
    repaired: usize,
}

impl CheckReport {
    fn is_clean(&self) -> bool {
        self.violation.is_none() && self.repaired == 0
    }
}

impl std::fmt::Display for CheckReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{} blocks", self.blocks)?;
        match &self.violation {
            Some(violation) => writeln!(f, "first problem: {violation}")?,
            None => writeln!(f, "lists are consistent")?,
        }
        if self.repaired > 0 {
            writeln!(f, "repair rewrites {} block(s)", self.repaired)?;
        }
        Ok(())
    }
}

/// Upcast without repairing, check the raw sequence, then count what the
/// postfixer would have to change.
fn check_markup(markup: &str, mut ids: IdGenerator) -> CheckReport {
    let mut seq = BlockSequence::from_blocks(upcast_str(markup, &mut ids));
    let violation = invariants::check(&seq).err().map(|v| v.to_string());
    let changes = seq.take_changes();
    let report = postfix(&mut seq, &changes, &mut ids);
    CheckReport {
        blocks: seq.len(),
        violation,
        repaired: report.changed.len(),
    }
}
