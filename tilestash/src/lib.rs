//! Tilestash - Offline cache and bulk downloader for raster map tiles
//!
//! This library provides a persistent, size-bounded tile cache backed by an
//! embedded transactional database, plus a concurrent prefetch engine that
//! fills the cache for a bounding box across a range of zoom levels.

pub mod coord;
pub mod fetch;
pub mod prefetch;
pub mod provider;
pub mod store;
