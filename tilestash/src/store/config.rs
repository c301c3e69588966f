//! Store configuration and byte-budget derivation.

use std::path::{Path, PathBuf};

use sysinfo::Disks;
use tracing::debug;

/// Floor for the configurable byte budget.
///
/// Budgets below this thrash: a handful of high-zoom tiles would already
/// trigger eviction.
pub const MIN_MAX_BYTES: u64 = 32 * 1024 * 1024;

/// Hard fallback budget when storage quota information is unavailable.
pub const DEFAULT_MAX_BYTES: u64 = 2 * 1024 * 1024 * 1024;

/// Ceiling for the automatically derived budget.
pub const AUTO_MAX_BYTES: u64 = 20 * 1024 * 1024 * 1024;

/// Denominator of the free-space fraction used for the automatic budget.
///
/// A tuning decision, not a correctness requirement.
pub const AUTO_BUDGET_DIVISOR: u64 = 10;

/// Default directory for the tile store database.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tilestash")
}

/// Recommends a byte budget for a store at the given path.
///
/// Takes a bounded fraction of the containing volume's available space,
/// clamped to `[MIN_MAX_BYTES, AUTO_MAX_BYTES]`. Falls back to
/// [`DEFAULT_MAX_BYTES`] when no volume can be matched to the path.
pub fn recommended_max_bytes(path: &Path) -> u64 {
    match available_space_for(path) {
        Some(available) => {
            let budget = (available / AUTO_BUDGET_DIVISOR).clamp(MIN_MAX_BYTES, AUTO_MAX_BYTES);
            debug!(
                path = %path.display(),
                available_bytes = available,
                budget_bytes = budget,
                "derived cache budget from free space"
            );
            budget
        }
        None => {
            debug!(
                path = %path.display(),
                fallback_bytes = DEFAULT_MAX_BYTES,
                "no volume information, using fallback cache budget"
            );
            DEFAULT_MAX_BYTES
        }
    }
}

/// Available space on the volume containing `path`, if determinable.
///
/// Matches the disk whose mount point is the longest prefix of the path,
/// so nested mounts resolve to the innermost volume.
fn available_space_for(path: &Path) -> Option<u64> {
    let resolved = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let disks = Disks::new_with_refreshed_list();

    disks
        .list()
        .iter()
        .filter(|disk| resolved.starts_with(disk.mount_point()))
        .max_by_key(|disk| disk.mount_point().as_os_str().len())
        .map(|disk| disk.available_space())
}

/// Formats a byte count for log and CLI output.
pub fn format_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * KIB;
    const GIB: u64 = 1024 * MIB;

    if bytes >= GIB {
        format!("{:.1} GiB", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{} B", bytes)
    }
}
