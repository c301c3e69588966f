//! Persistent, transactional tile store with LRU eviction.
//!
//! Each tile is held as a blob plus a metadata record; a singleton aggregate
//! record tracks total bytes and entry count. Every mutation updates the
//! aggregate inside the same redb write transaction as the blob and metadata
//! change, so concurrent writers never observe a torn aggregate. The store
//! tolerates abrupt termination; no explicit close is required.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use redb::{Database, ReadableTable, TableDefinition};
use tracing::{debug, info};

use super::config::MIN_MAX_BYTES;
use super::stats::StoreStats;
use super::types::{CachedTile, PutTile, StoreError, TileMetadata};

/// Raw image bytes, keyed by tile key.
const BLOBS: TableDefinition<&str, &[u8]> = TableDefinition::new("tile_blobs");

/// Bincode-encoded [`TileMetadata`], keyed by tile key.
const META: TableDefinition<&str, &[u8]> = TableDefinition::new("tile_meta");

/// Singleton `(total_bytes, entry_count)` aggregate.
const AGGREGATE: TableDefinition<&str, (u64, u64)> = TableDefinition::new("aggregate");

const AGGREGATE_KEY: &str = "totals";

/// Persisted store settings, keyed by name.
const SETTINGS: TableDefinition<&str, u64> = TableDefinition::new("settings");

const MAX_BYTES_KEY: &str = "max_bytes";

/// Database filename inside the store directory.
const DB_FILENAME: &str = "tilestash.redb";

/// Disk-backed tile store.
///
/// Construct one explicitly with [`TileStore::open`] and share it via `Arc`;
/// the prefetch engine and any rendering collaborator use the same instance
/// through the same key scheme.
pub struct TileStore {
    db: Database,
    max_bytes: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl TileStore {
    /// Open (creating if necessary) a store in the given directory.
    ///
    /// `max_bytes` seeds the budget of a new store; an existing store keeps
    /// the budget it last persisted via [`TileStore::set_max_bytes`]. Either
    /// way the budget is clamped to a floor of [`MIN_MAX_BYTES`] to avoid
    /// eviction thrashing.
    pub fn open(dir: impl AsRef<Path>, max_bytes: u64) -> Result<Self, StoreError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let db = Database::create(dir.join(DB_FILENAME))?;

        // Make sure all tables exist and the aggregate is seeded, so reads
        // never observe a missing table.
        let txn = db.begin_write()?;
        let budget = {
            txn.open_table(BLOBS)?;
            txn.open_table(META)?;
            let mut aggregate = txn.open_table(AGGREGATE)?;
            if aggregate.get(AGGREGATE_KEY)?.is_none() {
                aggregate.insert(AGGREGATE_KEY, (0u64, 0u64))?;
            }

            let mut settings = txn.open_table(SETTINGS)?;
            let persisted = settings.get(MAX_BYTES_KEY)?.map(|guard| guard.value());
            match persisted {
                Some(value) => value.max(MIN_MAX_BYTES),
                None => {
                    let seeded = max_bytes.max(MIN_MAX_BYTES);
                    settings.insert(MAX_BYTES_KEY, seeded)?;
                    seeded
                }
            }
        };
        txn.commit()?;

        let store = Self {
            db,
            max_bytes: AtomicU64::new(budget),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        };

        let stats = store.stats()?;
        info!(
            path = %dir.display(),
            entries = stats.entries,
            total_bytes = stats.total_bytes,
            max_bytes = stats.max_bytes,
            "opened tile store"
        );

        Ok(store)
    }

    /// Look up a tile by key.
    ///
    /// On a hit the metadata's `last_access_at` is refreshed in the same
    /// transaction and the hit counter bumped; on a miss the miss counter is
    /// bumped and `Ok(None)` returned. A key with a blob but no metadata (or
    /// the reverse) is a corrupt store and surfaces as an error.
    pub fn get(&self, key: &str) -> Result<Option<CachedTile>, StoreError> {
        let txn = self.db.begin_write()?;
        let found = {
            let mut meta_table = txn.open_table(META)?;
            let blob_table = txn.open_table(BLOBS)?;

            let encoded_meta = meta_table.get(key)?.map(|guard| guard.value().to_vec());
            let blob = blob_table.get(key)?.map(|guard| guard.value().to_vec());

            match (encoded_meta, blob) {
                (Some(encoded), Some(data)) => {
                    let mut metadata: TileMetadata = bincode::deserialize(&encoded)?;
                    metadata.last_access_at = now_millis();
                    let reencoded = bincode::serialize(&metadata)?;
                    meta_table.insert(key, reencoded.as_slice())?;
                    Some(CachedTile { metadata, data })
                }
                (None, None) => None,
                _ => return Err(StoreError::Corrupt(key.to_string())),
            }
        };

        match found {
            Some(tile) => {
                txn.commit()?;
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(tile))
            }
            None => {
                // Nothing changed; dropping the transaction aborts it.
                drop(txn);
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    /// Insert or overwrite a tile.
    ///
    /// Blob, metadata and aggregate are committed in one transaction; on
    /// overwrite the original `created_at` is preserved and the aggregate
    /// adjusted by the byte-size delta. If the aggregate then exceeds the
    /// budget, eviction runs as a separate follow-up transaction before this
    /// call returns, so a `stats` read issued after a budget-exceeding `put`
    /// always observes `total_bytes <= max_bytes`.
    pub fn put(&self, key: &str, put: PutTile) -> Result<(), StoreError> {
        let now = now_millis();
        let size = put.data.len() as u64;

        let txn = self.db.begin_write()?;
        {
            let mut meta_table = txn.open_table(META)?;
            let mut blob_table = txn.open_table(BLOBS)?;
            let mut aggregate = txn.open_table(AGGREGATE)?;

            let previous: Option<TileMetadata> = meta_table
                .get(key)?
                .map(|guard| bincode::deserialize(guard.value()))
                .transpose()?;

            let metadata = TileMetadata {
                provider: put.provider,
                url: put.url,
                zoom: put.tile.zoom,
                x: put.tile.x,
                y: put.tile.y,
                size_bytes: size,
                created_at: previous.as_ref().map(|m| m.created_at).unwrap_or(now),
                last_access_at: now,
            };

            blob_table.insert(key, put.data.as_ref())?;
            meta_table.insert(key, bincode::serialize(&metadata)?.as_slice())?;

            let (mut total, mut count) = read_aggregate(&aggregate)?;
            match previous {
                Some(old) => total = total.saturating_sub(old.size_bytes) + size,
                None => {
                    total += size;
                    count += 1;
                }
            }
            aggregate.insert(AGGREGATE_KEY, (total, count))?;
        }
        txn.commit()?;

        self.evict_if_over_budget()?;
        Ok(())
    }

    /// Remove a tile. A no-op if the key is absent.
    pub fn remove(&self, key: &str) -> Result<(), StoreError> {
        let txn = self.db.begin_write()?;
        {
            let mut meta_table = txn.open_table(META)?;
            let mut blob_table = txn.open_table(BLOBS)?;
            let mut aggregate = txn.open_table(AGGREGATE)?;

            let removed_meta: Option<TileMetadata> = meta_table
                .remove(key)?
                .map(|guard| bincode::deserialize(guard.value()))
                .transpose()?;
            let removed_blob = blob_table.remove(key)?.is_some();

            match (&removed_meta, removed_blob) {
                (Some(old), true) => {
                    let (total, count) = read_aggregate(&aggregate)?;
                    aggregate.insert(
                        AGGREGATE_KEY,
                        (
                            total.saturating_sub(old.size_bytes),
                            count.saturating_sub(1),
                        ),
                    )?;
                }
                (None, false) => {}
                _ => return Err(StoreError::Corrupt(key.to_string())),
            }
        }
        txn.commit()?;
        Ok(())
    }

    /// Delete everything and reset the aggregate and hit/miss counters.
    ///
    /// Idempotent: clearing an empty store is a no-op.
    pub fn clear(&self) -> Result<(), StoreError> {
        let txn = self.db.begin_write()?;
        txn.delete_table(BLOBS)?;
        txn.delete_table(META)?;
        {
            txn.open_table(BLOBS)?;
            txn.open_table(META)?;
            let mut aggregate = txn.open_table(AGGREGATE)?;
            aggregate.insert(AGGREGATE_KEY, (0u64, 0u64))?;
        }
        txn.commit()?;

        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        info!("cleared tile store");
        Ok(())
    }

    /// Current store statistics; queryable at any time, including mid-run.
    pub fn stats(&self) -> Result<StoreStats, StoreError> {
        let (total_bytes, entries) = self.aggregate()?;
        Ok(StoreStats {
            total_bytes,
            entries,
            max_bytes: self.max_bytes.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        })
    }

    /// Configured byte budget.
    pub fn max_bytes(&self) -> u64 {
        self.max_bytes.load(Ordering::Relaxed)
    }

    /// Update the byte budget, clamped to a floor of [`MIN_MAX_BYTES`].
    ///
    /// The budget is persisted and survives reopening the store. Shrinking
    /// it does not evict immediately; eviction happens lazily on the next
    /// budget-exceeding `put`.
    pub fn set_max_bytes(&self, max_bytes: u64) -> Result<(), StoreError> {
        let clamped = max_bytes.max(MIN_MAX_BYTES);

        let txn = self.db.begin_write()?;
        {
            let mut settings = txn.open_table(SETTINGS)?;
            settings.insert(MAX_BYTES_KEY, clamped)?;
        }
        txn.commit()?;

        self.max_bytes.store(clamped, Ordering::Relaxed);
        debug!(max_bytes = clamped, "updated cache budget");
        Ok(())
    }

    /// Evict least-recently-accessed tiles until back under budget.
    ///
    /// Reads a full metadata snapshot, sorts ascending by `last_access_at`,
    /// and commits every deletion plus the aggregate update in one final
    /// transaction. A `put` racing with eviction observes either the pre- or
    /// post-eviction state, never a mix, because write transactions are
    /// serialized.
    fn evict_if_over_budget(&self) -> Result<(), StoreError> {
        let budget = self.max_bytes.load(Ordering::Relaxed);
        let (current, _) = self.aggregate()?;
        if current <= budget {
            return Ok(());
        }

        let txn = self.db.begin_write()?;
        let (entries_removed, bytes_freed, total_after) = {
            let mut meta_table = txn.open_table(META)?;
            let mut blob_table = txn.open_table(BLOBS)?;
            let mut aggregate = txn.open_table(AGGREGATE)?;

            let mut entries: Vec<(String, i64, u64)> = Vec::new();
            for item in meta_table.iter()? {
                let (key, value) = item?;
                let metadata: TileMetadata = bincode::deserialize(value.value())?;
                entries.push((
                    key.value().to_string(),
                    metadata.last_access_at,
                    metadata.size_bytes,
                ));
            }
            entries.sort_by_key(|(_, last_access_at, _)| *last_access_at);

            let (mut total, mut count) = read_aggregate(&aggregate)?;
            let mut entries_removed = 0u64;
            let mut bytes_freed = 0u64;

            for (key, _, size) in entries {
                if total <= budget {
                    break;
                }
                blob_table.remove(key.as_str())?;
                meta_table.remove(key.as_str())?;
                total = total.saturating_sub(size);
                count = count.saturating_sub(1);
                entries_removed += 1;
                bytes_freed += size;
            }

            aggregate.insert(AGGREGATE_KEY, (total, count))?;
            (entries_removed, bytes_freed, total)
        };
        txn.commit()?;

        info!(
            entries_removed,
            bytes_freed, total_bytes = total_after, "evicted least-recently-used tiles"
        );
        Ok(())
    }

    fn aggregate(&self) -> Result<(u64, u64), StoreError> {
        let txn = self.db.begin_read()?;
        let aggregate = txn.open_table(AGGREGATE)?;
        read_aggregate(&aggregate)
    }
}

/// Read the aggregate record from an open table, defaulting to zero.
fn read_aggregate(
    table: &impl ReadableTable<&'static str, (u64, u64)>,
) -> Result<(u64, u64), StoreError> {
    Ok(table
        .get(AGGREGATE_KEY)?
        .map(|guard| guard.value())
        .unwrap_or((0, 0)))
}

/// Current UTC time in epoch milliseconds.
fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
