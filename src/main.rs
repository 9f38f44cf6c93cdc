//! # SmartDoc CLI (`smartdoc`)
//!
//! Extract text from PDF, DOCX, image and plain-text files, read it page by
//! page, search it, and serve the same features over HTTP.
//!
//! ## Usage
//!
//! ```bash
//! smartdoc --config ./config/smartdoc.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `smartdoc extract <files…>` | Batch extraction with per-file results |
//! | `smartdoc page <file>` | Print one normalized page |
//! | `smartdoc search <file> <term>` | Literal search with page numbers |
//! | `smartdoc stats <file>` | Characters, words and pages |
//! | `smartdoc serve` | Start the HTTP API |
//!
//! ## Examples
//!
//! ```bash
//! # Extract a batch, machine-readable
//! smartdoc extract report.pdf notes.docx scan.png --json
//!
//! # Render page 2 as headings, lists and paragraphs
//! smartdoc page report.pdf --page 2 --render
//!
//! # Case-sensitive search
//! smartdoc search report.pdf "Net Income" --case-sensitive
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use smartdoc::progress::ProgressMode;
use smartdoc::{commands, config, server};

/// SmartDoc: multi-format document extraction, pagination and search.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. A missing file means built-in defaults.
#[derive(Parser)]
#[command(name = "smartdoc", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/smartdoc.toml")]
    config: PathBuf,

    /// Progress output on stderr. Defaults to `human` on a TTY, `off` otherwise.
    #[arg(long, global = true, value_enum)]
    progress: Option<ProgressMode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract text from one or more files.
    ///
    /// Each file succeeds or fails on its own; the command only fails when
    /// the batch as a whole is rejected (for example, too many files).
    Extract {
        /// Files to extract.
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Print documents and failures as JSON.
        #[arg(long)]
        json: bool,

        /// Files extracted at once (overrides `[limits].concurrency`).
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Print one page of a document's normalized text.
    Page {
        file: PathBuf,

        /// 1-based page number.
        #[arg(long, default_value_t = 1)]
        page: usize,

        /// Render headings, lists and paragraphs instead of raw text.
        #[arg(long)]
        render: bool,
    },

    /// Search a document for a literal term.
    Search {
        file: PathBuf,
        term: String,

        /// Match case exactly.
        #[arg(long)]
        case_sensitive: bool,
    },

    /// Show character, word and page counts.
    Stats { file: PathBuf },

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("smartdoc=info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_or_default(&cli.config)?;
    let progress = cli.progress.unwrap_or_else(ProgressMode::default_for_tty);

    match cli.command {
        Commands::Extract {
            files,
            json,
            concurrency,
        } => {
            commands::run_extract(&cfg, &files, json, concurrency, progress).await?;
        }
        Commands::Page { file, page, render } => {
            commands::run_page(&cfg, &file, page, render).await?;
        }
        Commands::Search {
            file,
            term,
            case_sensitive,
        } => {
            commands::run_search(&cfg, &file, &term, case_sensitive).await?;
        }
        Commands::Stats { file } => {
            commands::run_stats(&cfg, &file).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
