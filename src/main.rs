//! # inner-search CLI (`isearch`)
//!
//! ## Usage
//!
//! ```bash
//! isearch --config ./config/isearch.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `isearch init` | Create the SQLite index schema |
//! | `isearch ingest` | Index the data root (incremental) |
//! | `isearch search "<query>"` | List the documents related to a query |
//! | `isearch ask "<question>"` | Answer a question from the documents |
//! | `isearch chat` | Interactive terminal UI |
//! | `isearch stats` | File and index statistics |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use inner_search::commands;
use inner_search::config;
use inner_search::ingest::IngestOptions;
use inner_search::logging;
use inner_search::models::Mode;
use inner_search::session::ReplyKind;

/// inner-search CLI: search and ask questions about internal company documents.
#[derive(Parser)]
#[command(
    name = "isearch",
    about = "inner-search — search and ask questions about internal company documents",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/isearch.toml`. A missing file means all defaults.
    #[arg(long, global = true, default_value = "./config/isearch.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the index database schema.
    ///
    /// Idempotent; running it multiple times is safe.
    Init,

    /// Load, chunk, embed and index every document under the data root.
    ///
    /// Unchanged documents are skipped and removed files are pruned.
    Ingest {
        /// Clear the index and re-embed everything.
        #[arg(long)]
        full: bool,

        /// Show document and chunk counts without embedding or writing.
        #[arg(long)]
        dry_run: bool,
    },

    /// Show where the documents related to a query are.
    Search {
        query: String,
    },

    /// Answer a question from the indexed documents.
    Ask {
        question: String,
    },

    /// Start the interactive terminal UI.
    ///
    /// Builds the index first when it is empty or when
    /// `ISEARCH_FORCE_REBUILD` is set.
    Chat {
        /// Initial mode: `search` or `qa`.
        #[arg(long, default_value = "search")]
        mode: Mode,
    },

    /// Print file and index statistics.
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    let console = !matches!(cli.command, Commands::Chat { .. });
    let _log_guard = logging::init(&cfg.logging, console)?;
    tracing::info!(config = %cli.config.display(), "isearch starting");

    let kind = match cli.command {
        Commands::Init => {
            commands::run_init(&cfg).await?;
            None
        }
        Commands::Ingest { full, dry_run } => {
            commands::run_ingest(&cfg, IngestOptions { full, dry_run }).await?;
            None
        }
        Commands::Search { query } => {
            Some(commands::run_query(&cfg, &query, Mode::Search).await?.kind)
        }
        Commands::Ask { question } => {
            Some(commands::run_query(&cfg, &question, Mode::Qa).await?.kind)
        }
        Commands::Chat { mode } => {
            commands::run_chat(&cfg, mode).await?;
            None
        }
        Commands::Stats => {
            commands::run_stats(&cfg).await?;
            None
        }
    };

    // A query that ended in an error reply still printed its message.
    if kind == Some(ReplyKind::Error) {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
