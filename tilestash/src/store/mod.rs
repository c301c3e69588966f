//! Persistent on-disk tile cache.
//!
//! Tiles live in an embedded [`redb`] database: one table for blobs, one
//! for per-tile metadata, and one aggregate row tracking total bytes and
//! entry count. Every mutation updates blob, metadata, and aggregate in a
//! single write transaction, so the totals never drift from the contents.
//!
//! The store enforces a byte budget by evicting least-recently-used tiles
//! after writes, and tracks hit/miss counters for the lifetime of the
//! process.

mod config;
mod stats;
mod tile_store;
mod types;

pub use config::{
    default_cache_dir, format_size, recommended_max_bytes, AUTO_BUDGET_DIVISOR, AUTO_MAX_BYTES,
    DEFAULT_MAX_BYTES, MIN_MAX_BYTES,
};
pub use stats::StoreStats;
pub use tile_store::TileStore;
pub use types::{CachedTile, PutTile, StoreError, TileMetadata};
