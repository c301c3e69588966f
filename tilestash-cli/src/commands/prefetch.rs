//! Bulk download CLI command.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use tilestash::coord::BoundingBox;
use tilestash::fetch::ReqwestFetcher;
use tilestash::prefetch::{prefetch_tiles, PrefetchConfig, PrefetchError, PrefetchOptions};
use tilestash::store::format_size;

use crate::commands::common::{open_store, ProviderType};
use crate::error::CliError;

/// Arguments for the `prefetch` command.
#[derive(Debug, Args)]
pub struct PrefetchArgs {
    /// Northern latitude of the region, degrees
    #[arg(long, allow_hyphen_values = true)]
    pub north: f64,

    /// Southern latitude of the region, degrees
    #[arg(long, allow_hyphen_values = true)]
    pub south: f64,

    /// Eastern longitude of the region, degrees
    #[arg(long, allow_hyphen_values = true)]
    pub east: f64,

    /// Western longitude of the region, degrees
    #[arg(long, allow_hyphen_values = true)]
    pub west: f64,

    /// Lowest zoom level to download, inclusive
    #[arg(long, default_value_t = 0)]
    pub min_zoom: u8,

    /// Highest zoom level to download, inclusive
    #[arg(long)]
    pub max_zoom: u8,

    /// Tile provider
    #[arg(long, value_enum, default_value = "osm")]
    pub provider: ProviderType,

    /// Number of concurrent downloads
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Retries per tile on transient failures
    #[arg(long)]
    pub retries: Option<u32>,

    /// Base delay between retries, milliseconds
    #[arg(long)]
    pub retry_delay_ms: Option<u64>,
}

/// Run a prefetch over the given region and zoom range.
pub async fn run(
    args: PrefetchArgs,
    cache_dir: Option<PathBuf>,
    max_bytes: Option<u64>,
) -> Result<(), CliError> {
    let bbox = BoundingBox::new(args.north, args.south, args.east, args.west)?;
    let store = open_store(cache_dir, max_bytes)?;
    let fetcher = Arc::new(ReqwestFetcher::new()?);

    let defaults = PrefetchConfig::default();
    let config = PrefetchConfig {
        concurrency: args.concurrency.unwrap_or(defaults.concurrency),
        retry_limit: args.retries.unwrap_or(defaults.retry_limit),
        retry_base_delay_ms: args.retry_delay_ms.unwrap_or(defaults.retry_base_delay_ms),
    };

    let token = CancellationToken::new();
    let ctrlc_token = token.clone();
    if let Err(error) = ctrlc::set_handler(move || ctrlc_token.cancel()) {
        warn!(%error, "could not install Ctrl-C handler; cancellation disabled");
    }

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template(
            "{bar:40.cyan/blue} {pos}/{len} tiles ({percent}%) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let progress_bar = bar.clone();
    let options = PrefetchOptions::new(args.provider.to_config(), bbox, args.min_zoom, args.max_zoom)
        .with_config(config)
        .with_cancellation(token)
        .with_progress(move |p| {
            progress_bar.set_length(p.total);
            progress_bar.set_position(p.completed);
            progress_bar.set_message(format!(
                "{} down, {} skip, {} fail",
                p.downloaded, p.skipped, p.failed
            ));
        });

    match prefetch_tiles(store, fetcher, options).await {
        Ok(summary) => {
            bar.finish_and_clear();
            println!(
                "Prefetch complete: {} tiles ({} downloaded, {} skipped, {} failed), {} fetched",
                summary.total,
                summary.downloaded,
                summary.skipped,
                summary.failed,
                format_size(summary.bytes_downloaded)
            );
            Ok(())
        }
        Err(PrefetchError::Cancelled) => {
            bar.finish_and_clear();
            println!("Prefetch cancelled.");
            Ok(())
        }
        Err(error) => {
            bar.finish_and_clear();
            Err(error.into())
        }
    }
}
