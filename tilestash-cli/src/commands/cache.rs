//! Cache management CLI commands.

use std::path::PathBuf;

use clap::Subcommand;
use tilestash::store::format_size;

use crate::commands::common::{open_store, resolve_cache_dir};
use crate::error::CliError;

/// Cache action subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Show cache statistics
    Stats,
    /// Remove every cached tile
    Clear,
    /// Change the cache size limit; persists across runs
    SetLimit {
        /// New limit in bytes
        #[arg(value_name = "BYTES")]
        max_bytes: u64,
    },
}

/// Run a cache subcommand.
pub fn run(
    action: CacheAction,
    cache_dir: Option<PathBuf>,
    max_bytes: Option<u64>,
) -> Result<(), CliError> {
    let dir = resolve_cache_dir(cache_dir.clone());
    let store = open_store(cache_dir, max_bytes)?;

    match action {
        CacheAction::Stats => {
            let stats = store.stats()?;
            println!("Tile cache: {}", dir.display());
            println!("  Tiles:  {}", stats.entries);
            println!(
                "  Size:   {} of {}",
                format_size(stats.total_bytes),
                format_size(stats.max_bytes)
            );
            println!(
                "  Hits:   {} / misses: {} ({:.1}% hit rate)",
                stats.hits,
                stats.misses,
                stats.hit_rate() * 100.0
            );
            Ok(())
        }
        CacheAction::Clear => {
            let before = store.stats()?;
            store.clear()?;
            println!(
                "Cleared {} tiles, freed {}",
                before.entries,
                format_size(before.total_bytes)
            );
            Ok(())
        }
        CacheAction::SetLimit { max_bytes } => {
            store.set_max_bytes(max_bytes)?;
            let stats = store.stats()?;
            println!(
                "Cache limit set to {} ({} in use)",
                format_size(stats.max_bytes),
                format_size(stats.total_bytes)
            );
            Ok(())
        }
    }
}
