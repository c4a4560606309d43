use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pictovec::cli;
use pictovec::config::PictovecConfig;

#[derive(Parser)]
#[command(
    name = "pictovec",
    version,
    about = "Enrich a food pictogram catalog with an LLM and index it for semantic search"
)]
struct Cli {
    /// Path to the config file (defaults to ~/.pictovec/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Enrich catalog records with model-generated attributes
    Enrich {
        /// Catalog JSON to enrich
        input: PathBuf,
        /// Where enriched records accumulate; doubles as the resume checkpoint
        #[arg(short, long, default_value = "enriched.json")]
        output: PathBuf,
        /// Discard any previous output instead of resuming from it
        #[arg(long)]
        fresh: bool,
    },
    /// Embed an enriched catalog and upsert it into the vector store
    Index {
        /// Enriched catalog JSON to index
        input: PathBuf,
    },
    /// Search the indexed catalog
    Search {
        /// Free-text query
        query: String,
        /// Override the configured number of results
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        /// Embed the query as-is, skipping the domain-context rewrite
        #[arg(long)]
        raw: bool,
    },
    /// Show vector store statistics
    Stats,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => PictovecConfig::load_from(path)?,
        None => PictovecConfig::load()?,
    };

    // Log to stderr so stdout stays clean for command output.
    let filter =
        EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Enrich {
            input,
            output,
            fresh,
        } => cli::enrich::enrich(&config, &input, &output, fresh),
        Command::Index { input } => cli::index::index(&config, &input),
        Command::Search { query, top_k, raw } => cli::search::search(&config, &query, top_k, raw),
        Command::Stats => cli::stats::stats(&config),
    }
}
