//! Tile provider configuration and URL resolution.
//!
//! A provider is a named tile source: a URL template with `{z}`/`{x}`/`{y}`
//! placeholders, an optional `{s}` subdomain rotation, and a native zoom
//! ceiling. Cache keys are derived from the provider id plus tile
//! coordinates so distinct providers never collide in the store.

mod template;

pub use template::{resolve_url, tile_key, Subdomains};

use serde::{Deserialize, Serialize};

use crate::coord::TileCoord;

/// Default zoom ceiling when a provider does not specify one.
pub const DEFAULT_MAX_ZOOM: u8 = 19;

/// Configuration for a tile provider.
///
/// Supplied by the caller, never computed here. The `id` participates in
/// every cache key, so renaming a provider orphans its cached tiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Stable identifier, part of the cache key namespace.
    pub id: String,
    /// URL template with `{z}`, `{x}`, `{y}` and optional `{s}` tokens.
    pub url_template: String,
    /// Subdomains rotated into `{s}`.
    pub subdomains: Subdomains,
    /// Native zoom ceiling of the source.
    pub max_zoom: u8,
}

impl ProviderConfig {
    /// Create a provider configuration.
    pub fn new(
        id: impl Into<String>,
        url_template: impl Into<String>,
        subdomains: impl Into<Subdomains>,
        max_zoom: u8,
    ) -> Self {
        Self {
            id: id.into(),
            url_template: url_template.into(),
            subdomains: subdomains.into(),
            max_zoom,
        }
    }

    /// The standard OpenStreetMap raster layer.
    pub fn openstreetmap() -> Self {
        Self::new(
            "osm",
            "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png",
            "abc",
            19,
        )
    }

    /// Esri World Imagery (no subdomain rotation).
    pub fn arcgis_world_imagery() -> Self {
        Self::new(
            "arcgis",
            "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}",
            Subdomains::default(),
            19,
        )
    }

    /// Whether the provider serves the given zoom level.
    pub fn supports_zoom(&self, zoom: u8) -> bool {
        zoom <= self.max_zoom
    }

    /// Cache key for a tile from this provider.
    pub fn tile_key(&self, tile: &TileCoord) -> String {
        tile_key(&self.id, tile)
    }

    /// Fully resolved URL for a tile from this provider.
    pub fn tile_url(&self, tile: &TileCoord) -> String {
        resolve_url(&self.url_template, tile, &self.subdomains)
    }
}
