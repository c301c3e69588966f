//! Store statistics.

use std::fmt;

use super::config::format_size;

/// A point-in-time snapshot of store size and lookup counters.
///
/// `total_bytes` and `entries` come from the persisted aggregate record;
/// `hits` and `misses` are process-lifetime counters, reset on `clear()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Total bytes of all cached blobs.
    pub total_bytes: u64,
    /// Number of cached tiles.
    pub entries: u64,
    /// Configured byte budget.
    pub max_bytes: u64,
    /// Successful lookups since process start (or last clear).
    pub hits: u64,
    /// Failed lookups since process start (or last clear).
    pub misses: u64,
}

impl StoreStats {
    /// Fraction of lookups that were hits, 0.0 when there were none.
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            return 0.0;
        }
        self.hits as f64 / lookups as f64
    }
}

impl fmt::Display for StoreStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} tiles, {} of {} used, hits: {} ({:.1}%), misses: {}",
            self.entries,
            format_size(self.total_bytes),
            format_size(self.max_bytes),
            self.hits,
            self.hit_rate() * 100.0,
            self.misses
        )
    }
}
