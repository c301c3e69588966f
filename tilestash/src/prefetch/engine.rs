//! Bulk tile download engine.
//!
//! Given a bounding box and an inclusive zoom range, enumerates every tile,
//! drives a bounded set of concurrent fetch-and-store workers, reports
//! aggregate progress after every task, and honors cooperative cancellation.
//!
//! Workers pull task indices from a shared atomic cursor, so dispatch needs
//! no queue or lock; only the progress snapshot is mutex-guarded, and each
//! task's counter update plus callback happens under that one lock.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::coord::{tile_range, BoundingBox, CoordError, TileCoord};
use crate::fetch::{FetchError, TileFetcher, TileResponse};
use crate::provider::ProviderConfig;
use crate::store::{PutTile, StoreError, TileStore};

use super::config::PrefetchConfig;
use super::progress::{PrefetchProgress, ProgressCallback};

/// Errors that abort a whole prefetch run.
///
/// Individual tile failures never abort a run; they are absorbed into the
/// progress counters. Only cancellation and storage faults surface here,
/// so callers can always tell "cancelled" from "completed".
#[derive(Debug, Error)]
pub enum PrefetchError {
    /// The run was cancelled via its [`CancellationToken`].
    #[error("prefetch run cancelled")]
    Cancelled,

    /// The tile store failed; never masked.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The bounding box or zoom could not be projected.
    #[error("invalid region: {0}")]
    Region(#[from] CoordError),

    /// `min_zoom` exceeds `max_zoom`.
    #[error("invalid zoom range: {min}..={max}")]
    ZoomRange { min: u8, max: u8 },
}

/// Options for one prefetch run.
pub struct PrefetchOptions {
    /// Tile source to download from.
    pub provider: ProviderConfig,
    /// Region to cover.
    pub bbox: BoundingBox,
    /// Lowest zoom level, inclusive.
    pub min_zoom: u8,
    /// Highest zoom level, inclusive; clamped to the provider's ceiling.
    pub max_zoom: u8,
    /// Concurrency and retry tuning.
    pub config: PrefetchConfig,
    /// Cancellation handle shared with the caller.
    pub cancellation: CancellationToken,
    /// Invoked with a fresh snapshot after every finished task.
    pub on_progress: Option<ProgressCallback>,
}

impl PrefetchOptions {
    /// Options with default tuning and a fresh cancellation token.
    pub fn new(provider: ProviderConfig, bbox: BoundingBox, min_zoom: u8, max_zoom: u8) -> Self {
        Self {
            provider,
            bbox,
            min_zoom,
            max_zoom,
            config: PrefetchConfig::default(),
            cancellation: CancellationToken::new(),
            on_progress: None,
        }
    }

    /// Replace the tuning configuration.
    pub fn with_config(mut self, config: PrefetchConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a caller-supplied cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Register a progress callback.
    pub fn with_progress(
        mut self,
        callback: impl Fn(PrefetchProgress) + Send + Sync + 'static,
    ) -> Self {
        self.on_progress = Some(Box::new(callback));
        self
    }
}

/// How a single finished task is counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskOutcome {
    /// Fetched from the network and stored.
    Downloaded(u64),
    /// Nothing to do: cached, absent upstream, or unusable response.
    Skipped,
    /// Transport errors exhausted the retry budget.
    Failed,
}

/// Shared state of a running prefetch.
struct RunState {
    tasks: Vec<TileCoord>,
    cursor: AtomicUsize,
    progress: Mutex<PrefetchProgress>,
    on_progress: Option<ProgressCallback>,
}

impl RunState {
    /// Apply a task outcome and fire the callback.
    ///
    /// The callback runs under the progress lock so no observer ever sees
    /// a snapshot with another task's update half-applied.
    fn record(&self, outcome: TaskOutcome) {
        let mut progress = self.progress.lock();
        match outcome {
            TaskOutcome::Downloaded(bytes) => {
                progress.downloaded += 1;
                progress.bytes_downloaded += bytes;
            }
            TaskOutcome::Skipped => progress.skipped += 1,
            TaskOutcome::Failed => progress.failed += 1,
        }
        progress.completed += 1;

        if let Some(callback) = &self.on_progress {
            callback(*progress);
        }
    }

    fn snapshot(&self) -> PrefetchProgress {
        *self.progress.lock()
    }
}

/// Prefetch every tile of a region across a zoom range into the store.
///
/// Resolves with the final progress snapshot once all workers drain the
/// task list. Rejects with [`PrefetchError::Cancelled`] when the token
/// fires, and with [`PrefetchError::Store`] on a storage fault; per-tile
/// fetch failures only move counters.
pub async fn prefetch_tiles(
    store: Arc<TileStore>,
    fetcher: Arc<dyn TileFetcher>,
    options: PrefetchOptions,
) -> Result<PrefetchProgress, PrefetchError> {
    let PrefetchOptions {
        provider,
        bbox,
        min_zoom,
        max_zoom,
        config,
        cancellation,
        on_progress,
    } = options;

    let config = config.clamped();
    let tasks = enumerate_tasks(&provider, &bbox, min_zoom, max_zoom)?;
    let total = tasks.len() as u64;

    let state = Arc::new(RunState {
        tasks,
        cursor: AtomicUsize::new(0),
        progress: Mutex::new(PrefetchProgress::with_total(total)),
        on_progress,
    });

    if total == 0 {
        let snapshot = state.snapshot();
        if let Some(callback) = &state.on_progress {
            callback(snapshot);
        }
        info!(provider = %provider.id, "prefetch region is empty, nothing to do");
        return Ok(snapshot);
    }

    let workers = config.concurrency.min(state.tasks.len());
    info!(
        provider = %provider.id,
        total,
        workers,
        min_zoom,
        max_zoom,
        "starting prefetch run"
    );

    let mut worker_set = JoinSet::new();
    for _ in 0..workers {
        let state = Arc::clone(&state);
        let store = Arc::clone(&store);
        let fetcher = Arc::clone(&fetcher);
        let provider = provider.clone();
        let config = config.clone();
        let token = cancellation.clone();

        worker_set
            .spawn(async move { run_worker(state, store, fetcher, provider, config, token).await });
    }

    let mut failure: Option<PrefetchError> = None;
    while let Some(joined) = worker_set.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(error)) => {
                // Stop the remaining workers; keep the most specific error
                // (a store fault outranks the cancellation it triggers).
                cancellation.cancel();
                let replace = match &failure {
                    None => true,
                    Some(PrefetchError::Cancelled) => {
                        !matches!(error, PrefetchError::Cancelled)
                    }
                    Some(_) => false,
                };
                if replace {
                    failure = Some(error);
                }
            }
            Err(join_error) => {
                if join_error.is_panic() {
                    std::panic::resume_unwind(join_error.into_panic());
                }
            }
        }
    }

    if let Some(error) = failure {
        let snapshot = state.snapshot();
        warn!(
            completed = snapshot.completed,
            total = snapshot.total,
            error = %error,
            "prefetch run aborted"
        );
        return Err(error);
    }

    let snapshot = state.snapshot();
    info!(
        downloaded = snapshot.downloaded,
        skipped = snapshot.skipped,
        failed = snapshot.failed,
        bytes_downloaded = snapshot.bytes_downloaded,
        "prefetch run complete"
    );
    Ok(snapshot)
}

/// Enumerate every tile of the region, ascending zoom then row then column.
fn enumerate_tasks(
    provider: &ProviderConfig,
    bbox: &BoundingBox,
    min_zoom: u8,
    max_zoom: u8,
) -> Result<Vec<TileCoord>, PrefetchError> {
    if min_zoom > max_zoom {
        return Err(PrefetchError::ZoomRange {
            min: min_zoom,
            max: max_zoom,
        });
    }

    let effective_max = max_zoom.min(provider.max_zoom);
    let mut tasks = Vec::new();
    for zoom in min_zoom..=max_zoom {
        if zoom > effective_max {
            debug!(zoom, ceiling = provider.max_zoom, "zoom above provider ceiling, skipping");
            continue;
        }
        tasks.extend(tile_range(bbox, zoom)?.iter());
    }
    Ok(tasks)
}

/// Worker loop: pull the next index from the shared cursor until drained.
async fn run_worker(
    state: Arc<RunState>,
    store: Arc<TileStore>,
    fetcher: Arc<dyn TileFetcher>,
    provider: ProviderConfig,
    config: PrefetchConfig,
    token: CancellationToken,
) -> Result<(), PrefetchError> {
    loop {
        if token.is_cancelled() {
            return Err(PrefetchError::Cancelled);
        }

        let index = state.cursor.fetch_add(1, Ordering::SeqCst);
        let Some(tile) = state.tasks.get(index).copied() else {
            return Ok(());
        };

        let outcome = run_task(&store, &fetcher, &provider, &config, &token, tile).await?;
        state.record(outcome);
    }
}

/// Process one tile: consult the cache, then fetch with retry.
async fn run_task(
    store: &TileStore,
    fetcher: &Arc<dyn TileFetcher>,
    provider: &ProviderConfig,
    config: &PrefetchConfig,
    token: &CancellationToken,
    tile: TileCoord,
) -> Result<TaskOutcome, PrefetchError> {
    let key = provider.tile_key(&tile);

    match store.get(&key)? {
        Some(cached) if is_plausible_image(&cached.data) => {
            debug!(%tile, "tile already cached");
            return Ok(TaskOutcome::Skipped);
        }
        Some(_) => {
            debug!(%tile, "cached tile is not a usable image, refetching");
            store.remove(&key)?;
        }
        None => {}
    }

    let url = provider.tile_url(&tile);
    fetch_with_retry(store, fetcher, provider, config, token, tile, &key, &url).await
}

/// Why a fetch attempt did not produce a stored tile this round.
enum Transient {
    /// Rate limit, timeout status, or server error.
    Http(u16),
    /// The request never produced a response.
    Transport(String),
}

/// Fetch one tile with linear-backoff retry on transient failures.
#[allow(clippy::too_many_arguments)]
async fn fetch_with_retry(
    store: &TileStore,
    fetcher: &Arc<dyn TileFetcher>,
    provider: &ProviderConfig,
    config: &PrefetchConfig,
    token: &CancellationToken,
    tile: TileCoord,
    key: &str,
    url: &str,
) -> Result<TaskOutcome, PrefetchError> {
    let mut attempt: u32 = 0;

    loop {
        if token.is_cancelled() {
            return Err(PrefetchError::Cancelled);
        }

        let transient = match fetcher.fetch(url).await {
            Ok(response) => match classify(&response) {
                Disposition::Usable => {
                    let bytes = response.body.len() as u64;
                    store.put(
                        key,
                        PutTile {
                            provider: provider.id.clone(),
                            url: url.to_string(),
                            tile,
                            data: response.body,
                        },
                    )?;
                    return Ok(TaskOutcome::Downloaded(bytes));
                }
                Disposition::Missing => {
                    debug!(%tile, status = response.status, "tile absent upstream");
                    return Ok(TaskOutcome::Skipped);
                }
                Disposition::Unusable => {
                    debug!(%tile, status = response.status, "response body is not imagery");
                    return Ok(TaskOutcome::Skipped);
                }
                Disposition::Transient => Transient::Http(response.status),
            },
            Err(FetchError::Transport(reason)) | Err(FetchError::ClientBuild(reason)) => {
                Transient::Transport(reason)
            }
        };

        if attempt >= config.retry_limit {
            // Exhausted: an HTTP-level transient downgrades to skipped, a
            // transport failure counts as failed.
            return Ok(match transient {
                Transient::Http(status) => {
                    debug!(%tile, status, attempts = attempt + 1, "retries exhausted, skipping");
                    TaskOutcome::Skipped
                }
                Transient::Transport(reason) => {
                    warn!(%tile, reason = %reason, attempts = attempt + 1, "retries exhausted, failed");
                    TaskOutcome::Failed
                }
            });
        }

        attempt += 1;
        tokio::select! {
            _ = token.cancelled() => return Err(PrefetchError::Cancelled),
            _ = tokio::time::sleep(config.backoff_delay(attempt)) => {}
        }
    }
}

/// Classification of a fetch response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
    /// 2xx with a plausibly-image body: store it.
    Usable,
    /// Tile does not exist upstream: skip, never retry.
    Missing,
    /// 2xx whose body is not imagery: skip, never retry.
    Unusable,
    /// Worth retrying with backoff.
    Transient,
}

fn classify(response: &TileResponse) -> Disposition {
    match response.status {
        204 | 404 | 410 => Disposition::Missing,
        408 | 429 => Disposition::Transient,
        500..=599 => Disposition::Transient,
        status if (200..300).contains(&status) => {
            if looks_like_image(response) {
                Disposition::Usable
            } else {
                Disposition::Unusable
            }
        }
        400..=499 => Disposition::Missing,
        // 1xx/3xx leftovers: not a definite absence, try again.
        _ => Disposition::Transient,
    }
}

/// Whether a response plausibly carries tile imagery.
///
/// Misconfigured tile servers return 200 with an HTML error page, so the
/// declared content type alone is not trusted; the body's magic bytes are
/// the gate. An absent content type is accepted if the body sniffs.
fn looks_like_image(response: &TileResponse) -> bool {
    if let Some(content_type) = &response.content_type {
        if !content_type.to_ascii_lowercase().starts_with("image/") {
            return false;
        }
    }
    is_plausible_image(&response.body)
}

/// Whether raw bytes sniff as a known raster format.
pub(crate) fn is_plausible_image(data: &[u8]) -> bool {
    !data.is_empty() && image::guess_format(data).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    /// PNG file signature; `image::guess_format` needs only the magic bytes.
    const PNG_MAGIC: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    fn response(status: u16, content_type: Option<&str>, body: &[u8]) -> TileResponse {
        TileResponse {
            status,
            content_type: content_type.map(|s| s.to_string()),
            body: Bytes::copy_from_slice(body),
        }
    }

    #[test]
    fn test_classify_success_with_image() {
        let r = response(200, Some("image/png"), PNG_MAGIC);
        assert_eq!(classify(&r), Disposition::Usable);
    }

    #[test]
    fn test_classify_success_without_content_type() {
        let r = response(200, None, PNG_MAGIC);
        assert_eq!(classify(&r), Disposition::Usable);
    }

    #[test]
    fn test_classify_error_page_with_200() {
        let r = response(200, Some("text/html"), b"<html>oops</html>");
        assert_eq!(classify(&r), Disposition::Unusable);
    }

    #[test]
    fn test_classify_image_content_type_with_garbage_body() {
        // Sniffing is the gate, not the header.
        let r = response(200, Some("image/png"), b"not really an image");
        assert_eq!(classify(&r), Disposition::Unusable);
    }

    #[test]
    fn test_classify_empty_body_is_unusable() {
        let r = response(200, Some("image/png"), b"");
        assert_eq!(classify(&r), Disposition::Unusable);
    }

    #[test]
    fn test_classify_permanently_missing() {
        for status in [204, 404, 410, 400, 401, 403] {
            let r = response(status, None, b"");
            assert_eq!(classify(&r), Disposition::Missing, "status {status}");
        }
    }

    #[test]
    fn test_classify_transient() {
        for status in [408, 429, 500, 502, 503] {
            let r = response(status, None, b"");
            assert_eq!(classify(&r), Disposition::Transient, "status {status}");
        }
    }

    #[test]
    fn test_is_plausible_image() {
        assert!(is_plausible_image(PNG_MAGIC));
        assert!(is_plausible_image(&[0xFF, 0xD8, 0xFF, 0xE0])); // JPEG
        assert!(!is_plausible_image(b""));
        assert!(!is_plausible_image(b"<html></html>"));
    }

    #[test]
    fn test_enumerate_tasks_orders_by_zoom() {
        let provider = ProviderConfig::openstreetmap();
        let bbox = BoundingBox::new(10.0, -10.0, 10.0, -10.0).unwrap();
        let tasks = enumerate_tasks(&provider, &bbox, 2, 3).unwrap();

        assert!(!tasks.is_empty());
        let mut last_zoom = 0;
        for tile in &tasks {
            assert!(tile.zoom >= last_zoom, "zooms must be ascending");
            last_zoom = tile.zoom;
        }
        assert!(tasks.iter().any(|t| t.zoom == 2));
        assert!(tasks.iter().any(|t| t.zoom == 3));
    }

    #[test]
    fn test_enumerate_tasks_rejects_inverted_range() {
        let provider = ProviderConfig::openstreetmap();
        let bbox = BoundingBox::new(10.0, -10.0, 10.0, -10.0).unwrap();
        let result = enumerate_tasks(&provider, &bbox, 5, 3);
        assert!(matches!(
            result,
            Err(PrefetchError::ZoomRange { min: 5, max: 3 })
        ));
    }

    #[test]
    fn test_enumerate_tasks_clamps_to_provider_ceiling() {
        let provider = ProviderConfig::new("t", "https://t/{z}/{x}/{y}", "", 3);
        let bbox = BoundingBox::new(1.0, -1.0, 1.0, -1.0).unwrap();
        let tasks = enumerate_tasks(&provider, &bbox, 2, 6).unwrap();
        assert!(tasks.iter().all(|t| t.zoom <= 3));
    }

    #[test]
    fn test_enumerate_tasks_empty_above_ceiling() {
        let provider = ProviderConfig::new("t", "https://t/{z}/{x}/{y}", "", 3);
        let bbox = BoundingBox::new(1.0, -1.0, 1.0, -1.0).unwrap();
        let tasks = enumerate_tasks(&provider, &bbox, 5, 6).unwrap();
        assert!(tasks.is_empty());
    }

    #[test]
    fn test_record_is_atomic_per_task() {
        let state = RunState {
            tasks: Vec::new(),
            cursor: AtomicUsize::new(0),
            progress: Mutex::new(PrefetchProgress::with_total(2)),
            on_progress: None,
        };

        state.record(TaskOutcome::Downloaded(100));
        state.record(TaskOutcome::Failed);

        let snapshot = state.snapshot();
        assert_eq!(snapshot.completed, 2);
        assert_eq!(snapshot.downloaded, 1);
        assert_eq!(snapshot.failed, 1);
        assert_eq!(snapshot.bytes_downloaded, 100);
    }

    #[test]
    fn test_record_invokes_callback_with_consistent_snapshot() {
        use std::sync::atomic::AtomicU64;

        let seen = Arc::new(AtomicU64::new(0));
        let seen_clone = Arc::clone(&seen);
        let state = RunState {
            tasks: Vec::new(),
            cursor: AtomicUsize::new(0),
            progress: Mutex::new(PrefetchProgress::with_total(1)),
            on_progress: Some(Box::new(move |snapshot| {
                // completed always equals the sum of the outcome counters.
                assert_eq!(
                    snapshot.completed,
                    snapshot.downloaded + snapshot.skipped + snapshot.failed
                );
                seen_clone.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            })),
        };

        state.record(TaskOutcome::Skipped);
        assert_eq!(seen.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
