//! # rangefetch
//!
//! `rangefetch` downloads a single HTTP resource in parallel byte ranges:
//! - A HEAD probe checks for `Accept-Ranges: bytes` and a known size
//! - The size is split into contiguous, inclusive ranges
//! - Each range is fetched concurrently into its own staging file
//! - Staging files are concatenated in range order into the output
//!
//! Every stage returns its failure to the caller and nothing retries. The
//! staging directory never outlives a [`run`], whether it succeeds or not.
//!
//! ## Example Usage
//!
//! ```no_run
//! use rangefetch::{ConsoleReporter, DownloadConfig};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), rangefetch::DownloadError> {
//! let config = DownloadConfig::new("https://example.com/big.iso", "big.iso");
//! let reporter = Arc::new(ConsoleReporter::new());
//! let summary = rangefetch::run(&config, reporter, CancellationToken::new()).await?;
//! println!("{} bytes in {:?}", summary.total_size, summary.elapsed);
//! # Ok(())
//! # }
//! ```

pub mod args;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod fetcher;
pub mod logging;
pub mod merger;
pub mod observer;
pub mod planner;
pub mod probe;
pub mod staging;
pub mod utils;

pub use args::Args;
pub use config::{DownloadConfig, Settings};
pub use coordinator::DownloadCoordinator;
pub use error::DownloadError;
pub use fetcher::{ArcRateLimiter, ChunkFetcher, ChunkResult};
pub use observer::{ConsoleObserver, ConsoleReporter, ProgressObserver, Reporter};
pub use planner::{ByteRange, DownloadPlan, plan_ranges};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// What a successful [`run`] produced.
#[derive(Debug, Clone)]
pub struct DownloadSummary {
    pub output_path: PathBuf,
    pub total_size: u64,
    pub ranges: usize,
    pub elapsed: Duration,
}

/// Probes, plans, downloads and merges one resource.
///
/// `cancel` stops the probe or the download stage early (the binary ties it
/// to Ctrl+C).
pub async fn run(
    config: &DownloadConfig,
    reporter: Arc<dyn Reporter>,
    cancel: CancellationToken,
) -> Result<DownloadSummary, DownloadError> {
    let started = Instant::now();
    config.validate()?;

    // No whole-request timeout: a large range can legitimately take longer
    // than any fixed value. The coordinator's deadline bounds the transfer.
    let client = reqwest::Client::builder()
        .user_agent(config.user_agent.as_str())
        .connect_timeout(CONNECT_TIMEOUT)
        .build()?;

    reporter.status(format!("Checking {}", config.url));
    let total_size = tokio::select! {
        _ = cancel.cancelled() => return Err(DownloadError::Cancelled),
        size = probe::probe_length(&client, &config.url) => size?,
    };
    reporter.status(format!("File size: {total_size} bytes"));

    let mut parallelism = config.parallelism;
    if parallelism as u64 > total_size {
        warn!(
            requested = parallelism,
            total_size, "More ranges requested than bytes available, reducing"
        );
        parallelism = total_size as usize;
    }

    let plan = DownloadPlan::new(config.url.clone(), total_size, parallelism)?;
    info!(
        url = %plan.url,
        total_size,
        ranges = plan.ranges.len(),
        "Planned download"
    );

    let mut fetcher = ChunkFetcher::new(client, &plan.url);
    if let Some(limit) = config.rate_limit {
        fetcher = fetcher.with_rate_limit(limit);
    }

    let coordinator = DownloadCoordinator::new(
        fetcher,
        config.staging_root(),
        config.timeout,
        reporter.clone(),
    )
    .with_cancel_token(cancel);

    let staging = coordinator.download(&plan).await?;
    merger::merge(&plan, staging, &config.output_path, reporter.as_ref()).await?;

    let summary = DownloadSummary {
        output_path: config.output_path.clone(),
        total_size,
        ranges: plan.ranges.len(),
        elapsed: started.elapsed(),
    };
    reporter.status(format!(
        "Saved {} ({} bytes, {} parts) in {:.2?}",
        summary.output_path.display(),
        summary.total_size,
        summary.ranges,
        summary.elapsed
    ));

    Ok(summary)
}
