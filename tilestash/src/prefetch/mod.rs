//! Bulk tile prefetching.
//!
//! Downloads every tile of a bounding box across a zoom range into the
//! [`TileStore`](crate::store::TileStore), with bounded concurrency,
//! retry with linear backoff, per-task progress reporting, and
//! cooperative cancellation.
//!
//! ```no_run
//! use std::sync::Arc;
//! use tilestash::coord::BoundingBox;
//! use tilestash::fetch::ReqwestFetcher;
//! use tilestash::prefetch::{prefetch_tiles, PrefetchOptions};
//! use tilestash::provider::ProviderConfig;
//! use tilestash::store::{TileStore, DEFAULT_MAX_BYTES};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(TileStore::open("/tmp/tiles", DEFAULT_MAX_BYTES)?);
//! let fetcher = Arc::new(ReqwestFetcher::new()?);
//! let bbox = BoundingBox::new(48.0, 47.0, 12.0, 11.0)?;
//!
//! let options = PrefetchOptions::new(ProviderConfig::openstreetmap(), bbox, 8, 12)
//!     .with_progress(|p| println!("{p}"));
//! let summary = prefetch_tiles(store, fetcher, options).await?;
//! println!("done: {summary}");
//! # Ok(())
//! # }
//! ```

mod config;
mod engine;
mod progress;

pub use config::{
    PrefetchConfig, DEFAULT_CONCURRENCY, DEFAULT_RETRY_BASE_DELAY_MS, DEFAULT_RETRY_LIMIT,
    MAX_CONCURRENCY, MAX_RETRY_BASE_DELAY_MS, MAX_RETRY_LIMIT, MIN_CONCURRENCY,
};
pub use engine::{prefetch_tiles, PrefetchError, PrefetchOptions};
pub use progress::{PrefetchProgress, ProgressCallback};
