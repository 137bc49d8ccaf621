//! Tilepyramid CLI - Command-line interface
//!
//! Lists, fetches and prefetches tiles of the layers configured in
//! `config.ini`, and manages their disk cache.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tilepyramid::logging::{default_log_dir, default_log_file, init_logging, LoggingGuard};

use commands::cache::CacheAction;
use commands::fetch::FetchArgs;
use commands::prefetch::PrefetchArgs;
use commands::tiles::TilesArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "tilepyramid")]
#[command(version = tilepyramid::VERSION)]
#[command(about = "Inspect, fetch and prefetch tiles of a multi-resolution tile pyramid", long_about = None)]
struct Cli {
    /// Config file (default: ~/.config/tilepyramid/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the tiles of a layer covering a region
    Tiles(TilesArgs),
    /// Fetch one tile into the cache
    Fetch(FetchArgs),
    /// Download every tile of a region into the cache
    Prefetch(PrefetchArgs),
    /// Cache management
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        e.exit();
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = commands::common::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Tiles(args) => commands::tiles::run(&config, args),
        Commands::Fetch(args) => {
            let _guard = logging()?;
            commands::fetch::run(&config, args)
        }
        Commands::Prefetch(args) => {
            let _guard = logging()?;
            commands::prefetch::run(&config, args)
        }
        Commands::Cache { action } => commands::cache::run(&config, action),
    }
}

/// Only commands that touch the network log; listing output stays clean.
fn logging() -> Result<LoggingGuard, CliError> {
    init_logging(&default_log_dir(), default_log_file()).map_err(CliError::LoggingInit)
}
