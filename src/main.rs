//! # doc-harness CLI (`dh`)
//!
//! Ingest PDFs and images from a directory into a local vector index and ask
//! questions against it.
//!
//! ## Usage
//!
//! ```bash
//! dh --config ./config/dh.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `dh init` | Create the source directory and an empty index |
//! | `dh ingest` | Extract, chunk, embed and store every supported file |
//! | `dh ask "<question>"` | Answer a question from the indexed documents |
//! | `dh chunks` | List stored chunks |
//! | `dh serve` | Start the HTTP server |
//!
//! A missing config file means built-in defaults: documents in
//! `./data/docs`, index in `./data/index`, offline embeddings.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use doc_harness::app::{self, App};
use doc_harness::{config, inspect, logging, server};

/// doc-harness: local document question answering over PDFs and images.
#[derive(Parser)]
#[command(
    name = "dh",
    about = "doc-harness: ingest PDFs and images, then ask questions about them",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/dh.toml`. When the file does not exist the
    /// built-in defaults are used.
    #[arg(long, global = true, default_value = "./config/dh.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the source directory and an empty index.
    ///
    /// Idempotent; running it on an existing index only checks that the
    /// index matches the configured embedding provider.
    Init,

    /// Ingest every supported file in the source directory.
    ///
    /// Files are processed in name order. Unsupported files are ignored;
    /// files that yield no text or fail to embed are skipped and reported.
    Ingest {
        /// Read documents from this directory instead of `[paths].source_dir`.
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Answer a question from the indexed documents.
    Ask {
        /// The question.
        query: String,

        /// Number of chunks to retrieve (default: `[retrieval].top_k`).
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// List chunks stored in the index.
    Chunks {
        /// Maximum number of chunks to print.
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    logging::init_tracing();

    let cli = Cli::parse();
    let cfg = config::load_config_or_default(&cli.config)?;

    match cli.command {
        Commands::Init => {
            app::init(&cfg).await?;
            println!("Index initialized at {}", cfg.index.dir.display());
        }
        Commands::Ingest { dir } => {
            let source_dir = dir.unwrap_or_else(|| cfg.paths.source_dir.clone());
            let app = App::open(cfg).await?;
            let report = app.ingest_dir(&source_dir).await?;

            println!("ingest {}", source_dir.display());
            println!("  processed: {}", report.processed);
            println!("  skipped: {}", report.skipped);
            println!("  ignored: {}", report.ignored);
            println!("  chunks written: {}", report.chunks_written);
            for skipped in &report.skipped_files {
                println!("  skipped {}: {}", skipped.filename, skipped.reason);
            }
            println!("ok");
        }
        Commands::Ask { query, top_k } => {
            let app = App::open(cfg).await?;
            let answer = match top_k {
                Some(k) => app.answer_with_k(&query, k).await?,
                None => app.answer(&query).await?,
            };

            println!("{}", answer.text);
            if !answer.sources.is_empty() {
                println!();
                println!("sources:");
                for hit in &answer.sources {
                    println!(
                        "  {} (chunk {}, distance {:.4})",
                        hit.metadata.filename, hit.metadata.chunk, hit.distance
                    );
                }
            }
        }
        Commands::Chunks { limit } => {
            let app = App::open(cfg).await?;
            inspect::print_chunks(app.index.as_ref(), limit).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
