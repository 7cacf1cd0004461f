//! # Course Chunker CLI (`cchunk`)
//!
//! Builds the document index and runs the chunking pipeline over a
//! directory of converted course Markdown.
//!
//! ## Usage
//!
//! ```bash
//! cchunk --config ./config/cchunk.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `cchunk index` | Scan the source directory and save the document index |
//! | `cchunk structure` | Character, line and heading counts per document |
//! | `cchunk chunk` | Emit chunks with flat metadata as JSON |
//! | `cchunk dedup` | Report exact duplicate chunks |
//! | `cchunk map` | Emit the section → chunk map as JSON |
//! | `cchunk quality` | Chunk statistics, duplicate rate, section coverage |
//!
//! Logging goes to stderr and is controlled with `RUST_LOG`
//! (default `warn`).

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use course_chunker::commands;
use course_chunker::config::{self, Config};

const DEFAULT_CONFIG: &str = "./config/cchunk.toml";

/// Course Chunker: catalog, section and chunk course Markdown for retrieval.
#[derive(Parser)]
#[command(
    name = "cchunk",
    about = "Catalog, section and chunk course Markdown for retrieval indexing",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/cchunk.toml`. When that default file does not
    /// exist, built-in defaults are used.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the source directory and write the document index.
    ///
    /// Files that do not follow the `<hash>_<course>_<id>.md` convention
    /// are ignored.
    Index {
        /// Directory holding the converted Markdown files.
        #[arg(long)]
        source_dir: Option<PathBuf>,

        /// Directory with `content_map.json` for titles and descriptions.
        #[arg(long)]
        enrichment_root: Option<PathBuf>,

        /// Where to write the index (default: `corpus.index_path`).
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Print size and heading counts for every indexed document.
    Structure,

    /// Slice the corpus into chunks and emit them as JSON.
    Chunk {
        /// Only slice this document (e.g. `lec01`).
        #[arg(long = "doc")]
        doc_id: Option<String>,

        /// Drop exact duplicates before output.
        #[arg(long)]
        dedup: bool,

        /// Write to this file instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Report duplicate chunks across the corpus.
    Dedup {
        /// Detection strategy. Only `hash` is supported.
        #[arg(long, default_value = "hash")]
        method: String,
    },

    /// Emit the section → chunk map as JSON.
    Map {
        /// Write to this file instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Compute corpus quality metrics.
    Quality {
        /// Also write `quality_report.json` and `quality_report.md` here.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

/// An explicit `--config` must exist; the default path is optional.
fn resolve_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => config::load_config(path),
        None => {
            let default = Path::new(DEFAULT_CONFIG);
            if default.is_file() {
                config::load_config(default)
            } else {
                Config::from_env()
            }
        }
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let cfg = resolve_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Index {
            source_dir,
            enrichment_root,
            output,
        } => {
            commands::run_index(&cfg, source_dir, enrichment_root, output)?;
        }
        Commands::Structure => {
            commands::run_structure(&cfg)?;
        }
        Commands::Chunk {
            doc_id,
            dedup,
            output,
        } => {
            commands::run_chunk(&cfg, doc_id.as_deref(), dedup, output.as_deref())?;
        }
        Commands::Dedup { method } => {
            commands::run_dedup(&cfg, &method)?;
        }
        Commands::Map { output } => {
            commands::run_map(&cfg, output.as_deref())?;
        }
        Commands::Quality { output_dir } => {
            commands::run_quality(&cfg, output_dir.as_deref())?;
        }
    }

    Ok(())
}
