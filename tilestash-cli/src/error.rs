//! CLI error type.

use thiserror::Error;
use tilestash::coord::CoordError;
use tilestash::fetch::FetchError;
use tilestash::prefetch::PrefetchError;
use tilestash::store::StoreError;

/// Errors surfaced to the user by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Coord(#[from] CoordError),

    #[error("cache error: {0}")]
    Store(#[from] StoreError),

    #[error("http client error: {0}")]
    Fetch(#[from] FetchError),

    #[error("{0}")]
    Prefetch(#[from] PrefetchError),
}
