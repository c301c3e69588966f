//! Progress reporting for prefetch runs.

use std::fmt;

/// Aggregate progress of a prefetch run.
///
/// All counters are monotonically non-decreasing during a run; `total` is
/// fixed once enumeration completes. Every finished task accounts for
/// exactly one `completed` increment and exactly one of `downloaded`,
/// `skipped`, or `failed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrefetchProgress {
    /// Total number of tiles in the run.
    pub total: u64,
    /// Tasks finished so far, whatever the outcome.
    pub completed: u64,
    /// Tiles fetched from the network and stored.
    pub downloaded: u64,
    /// Tiles skipped: already cached, absent upstream, or unusable.
    pub skipped: u64,
    /// Tiles that exhausted retries on transport errors.
    pub failed: u64,
    /// Bytes added to the store by this run.
    pub bytes_downloaded: u64,
}

impl PrefetchProgress {
    /// A snapshot for a run over `total` tiles with nothing done yet.
    pub fn with_total(total: u64) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    /// Whether every task has finished.
    pub fn is_complete(&self) -> bool {
        self.completed == self.total
    }
}

impl fmt::Display for PrefetchProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} tiles ({} downloaded, {} skipped, {} failed, {} bytes)",
            self.completed,
            self.total,
            self.downloaded,
            self.skipped,
            self.failed,
            self.bytes_downloaded
        )
    }
}

/// Callback invoked with a fresh snapshot copy after every finished task.
pub type ProgressCallback = Box<dyn Fn(PrefetchProgress) + Send + Sync>;
