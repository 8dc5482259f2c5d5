//! CLI command definitions for the `libris` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod embed;
pub mod record;
pub mod search;
pub mod status;
pub mod sync;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use libris_types::batch::EmbeddingMode;

/// Catalog ingestion, embedding and semantic search for book summaries.
#[derive(Parser)]
#[command(name = "libris", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Also export spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    /// Data directory holding config.toml and libris.db.
    #[arg(long, global = true, env = "LIBRIS_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Pull new records from the upstream catalog.
    Sync,

    /// Compute embeddings for stored records.
    Embed {
        /// Which records to embed.
        #[arg(long, value_enum, default_value_t = ModeArg::Missing)]
        mode: ModeArg,

        /// Maximum provider calls in flight (defaults to config).
        #[arg(short, long)]
        concurrency: Option<usize>,

        /// Delete every stored embedding first, then embed all records.
        #[arg(long)]
        purge: bool,
    },

    /// Delete every stored embedding.
    Purge {
        /// Skip confirmation prompt.
        #[arg(long)]
        force: bool,
    },

    /// Rank records by similarity to free text.
    Search {
        /// Query text.
        text: String,

        /// Number of results (defaults to config).
        #[arg(short, long = "top")]
        k: Option<usize>,
    },

    /// Show one record.
    Show {
        /// Record id.
        id: i64,
    },

    /// List stored records.
    #[command(alias = "ls")]
    List {
        /// Maximum records to show.
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Show record and embedding counts.
    Status,

    /// Start the HTTP query API.
    Serve {
        /// Port to listen on.
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

/// Embedding mode as accepted on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Every record, appending new vectors to existing ones.
    All,
    /// Only records without any stored vector.
    Missing,
}

impl From<ModeArg> for EmbeddingMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::All => EmbeddingMode::All,
            ModeArg::Missing => EmbeddingMode::MissingOnly,
        }
    }
}
