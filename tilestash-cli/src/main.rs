//! Tilestash CLI - Command-line interface
//!
//! This binary provides a command-line interface to the tilestash library:
//! bulk tile downloads and cache management.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod error;

use commands::cache::CacheAction;
use commands::prefetch::PrefetchArgs;

#[derive(Debug, Parser)]
#[command(name = "tilestash", version, about = "Offline cache for raster map tiles")]
struct Cli {
    /// Cache directory (defaults to the platform cache dir)
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Cache size limit in bytes (defaults to a fraction of free disk space)
    #[arg(long, global = true)]
    max_bytes: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Download every tile of a region across a zoom range
    Prefetch(PrefetchArgs),
    /// Manage the tile cache
    #[command(subcommand)]
    Cache(CacheAction),
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Prefetch(args) => {
            commands::prefetch::run(args, cli.cache_dir, cli.max_bytes).await
        }
        Command::Cache(action) => commands::cache::run(action, cli.cache_dir, cli.max_bytes),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("Error: {error}");
            ExitCode::FAILURE
        }
    }
}
