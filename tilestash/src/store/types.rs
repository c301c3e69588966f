//! Core types for the tile store.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::coord::TileCoord;

/// Persisted metadata for one cached tile.
///
/// Exists if and only if the corresponding blob exists; both are written
/// and deleted in the same transaction. `created_at` is immutable and
/// survives overwrites; `last_access_at` refreshes on every successful read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileMetadata {
    /// Provider the tile was fetched from.
    pub provider: String,
    /// URL the tile was fetched from.
    pub url: String,
    /// Zoom level.
    pub zoom: u8,
    /// Column index.
    pub x: u32,
    /// Row index.
    pub y: u32,
    /// Size of the blob in bytes.
    pub size_bytes: u64,
    /// Creation time, UTC epoch milliseconds.
    pub created_at: i64,
    /// Last access time, UTC epoch milliseconds.
    pub last_access_at: i64,
}

/// A tile read back from the store: metadata plus raw image bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedTile {
    /// The tile's metadata record.
    pub metadata: TileMetadata,
    /// Raw image bytes.
    pub data: Vec<u8>,
}

/// Payload for a store insert or overwrite.
#[derive(Debug, Clone)]
pub struct PutTile {
    /// Provider id.
    pub provider: String,
    /// Source URL.
    pub url: String,
    /// Tile coordinates.
    pub tile: TileCoord,
    /// Raw image bytes.
    pub data: Bytes,
}

/// Errors that can occur during store operations.
///
/// Storage faults are never masked: a corrupted persistent store must not
/// be silently tolerated.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error during store operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to open or create the backing database.
    #[error("database error: {0}")]
    Database(#[from] redb::DatabaseError),

    /// Failed to begin a transaction.
    #[error("transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    /// Failed to open a table.
    #[error("table error: {0}")]
    Table(#[from] redb::TableError),

    /// Failed to read or write within a transaction.
    #[error("storage error: {0}")]
    Storage(#[from] redb::StorageError),

    /// Failed to commit a transaction.
    #[error("commit error: {0}")]
    Commit(#[from] redb::CommitError),

    /// Metadata record could not be encoded or decoded.
    #[error("metadata codec error: {0}")]
    Codec(#[from] bincode::Error),

    /// Blob and metadata disagree for a key.
    #[error("corrupt entry for key {0}: blob and metadata out of sync")]
    Corrupt(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_roundtrips_through_bincode() {
        let metadata = TileMetadata {
            provider: "osm".to_string(),
            url: "https://a.tile.openstreetmap.org/5/3/7.png".to_string(),
            zoom: 5,
            x: 3,
            y: 7,
            size_bytes: 1024,
            created_at: 1_700_000_000_000,
            last_access_at: 1_700_000_001_000,
        };

        let encoded = bincode::serialize(&metadata).unwrap();
        let decoded: TileMetadata = bincode::deserialize(&encoded).unwrap();
        assert_eq!(decoded, metadata);
    }

    #[test]
    fn test_store_error_display() {
        let err = StoreError::Corrupt("osm/5/3/7".to_string());
        assert!(err.to_string().contains("osm/5/3/7"));
        assert!(err.to_string().contains("out of sync"));
    }

    #[test]
    fn test_store_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: StoreError = io_err.into();
        assert!(matches!(err, StoreError::Io(_)));
    }
}
