//! Common types and utilities shared across CLI commands.

use std::path::PathBuf;
use std::sync::Arc;

use clap::ValueEnum;
use tilestash::provider::ProviderConfig;
use tilestash::store::{default_cache_dir, recommended_max_bytes, TileStore};

use crate::error::CliError;

/// Tile provider selection for CLI arguments.
#[derive(Debug, Clone, ValueEnum, PartialEq)]
pub enum ProviderType {
    /// OpenStreetMap standard tile layer
    Osm,
    /// Esri ArcGIS World Imagery (satellite)
    Arcgis,
}

impl ProviderType {
    /// Convert to a ProviderConfig.
    pub fn to_config(&self) -> ProviderConfig {
        match self {
            ProviderType::Osm => ProviderConfig::openstreetmap(),
            ProviderType::Arcgis => ProviderConfig::arcgis_world_imagery(),
        }
    }
}

/// Resolve the cache directory from an optional override.
pub fn resolve_cache_dir(dir: Option<PathBuf>) -> PathBuf {
    dir.unwrap_or_else(default_cache_dir)
}

/// Open the tile store.
///
/// An explicit `--max-bytes` overrides (and replaces) the store's persisted
/// budget; otherwise an existing store keeps its persisted budget and a new
/// one is sized from free disk space.
pub fn open_store(
    dir: Option<PathBuf>,
    max_bytes: Option<u64>,
) -> Result<Arc<TileStore>, CliError> {
    let dir = resolve_cache_dir(dir);
    match max_bytes {
        Some(limit) => {
            let store = TileStore::open(&dir, limit)?;
            store.set_max_bytes(limit)?;
            Ok(Arc::new(store))
        }
        None => {
            let store = TileStore::open(&dir, recommended_max_bytes(&dir))?;
            Ok(Arc::new(store))
        }
    }
}
