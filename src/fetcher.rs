use crate::error::DownloadError;
use crate::observer::ProgressObserver;
use crate::planner::ByteRange;
use crate::staging::StagingUnit;
use governor::state::InMemoryState;
use governor::{RateLimiter, clock::DefaultClock, state::direct::NotKeyed};
use reqwest::StatusCode;
use reqwest::header::RANGE;
use std::num::NonZeroU32;
use std::sync::Arc;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;

pub type ArcRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Outcome of one successful range fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkResult {
    pub index: usize,
    pub bytes_written: u64,
}

/// Fetches single byte ranges of one resource. Cheap to clone; every clone
/// shares the HTTP client and the rate limiter.
#[derive(Clone)]
pub struct ChunkFetcher {
    client: reqwest::Client,
    url: Arc<str>,
    limiter: Option<ArcRateLimiter>,
    limiter_burst: u32,
}

impl ChunkFetcher {
    pub fn new(client: reqwest::Client, url: &str) -> Self {
        Self {
            client,
            url: Arc::from(url),
            limiter: None,
            limiter_burst: 0,
        }
    }

    /// Caps the combined throughput of every clone at `bytes_per_sec`.
    pub fn with_rate_limit(mut self, bytes_per_sec: NonZeroU32) -> Self {
        let quota = governor::Quota::per_second(bytes_per_sec);
        self.limiter = Some(Arc::new(RateLimiter::direct(quota)));
        self.limiter_burst = bytes_per_sec.get();
        self
    }

    /// Downloads `range` into `unit`. A single attempt; the caller decides what
    /// a failure means.
    pub async fn fetch(
        &self,
        range: ByteRange,
        unit: StagingUnit,
        observer: Arc<dyn ProgressObserver>,
    ) -> Result<ChunkResult, DownloadError> {
        let expected = range.len();
        debug!(index = range.index, range = %range.header_value(), "Requesting range");

        let mut response = self
            .client
            .get(&*self.url)
            .header(RANGE, range.header_value())
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::PARTIAL_CONTENT {
            observer.message(format!("Part {}: HTTP {}", range.index + 1, status));
            return Err(DownloadError::UnexpectedStatus {
                status: status.as_u16(),
                context: format!("range {} ({})", range.index, range.header_value()),
            });
        }

        let StagingUnit { path, file, .. } = unit;
        let mut writer = BufWriter::new(file);
        let mut received: u64 = 0;

        loop {
            let bytes = match response.chunk().await {
                Ok(Some(bytes)) => bytes,
                Ok(None) => break,
                Err(e) => {
                    return Err(DownloadError::IncompleteTransfer {
                        index: range.index,
                        expected,
                        received,
                        source: Some(e),
                    });
                }
            };

            received += bytes.len() as u64;
            if received > expected {
                return Err(DownloadError::IncompleteTransfer {
                    index: range.index,
                    expected,
                    received,
                    source: None,
                });
            }

            self.throttle(bytes.len()).await;

            writer
                .write_all(&bytes)
                .await
                .map_err(|e| DownloadError::staging(&path, e))?;
            observer.inc(bytes.len() as u64);
        }

        if received != expected {
            return Err(DownloadError::IncompleteTransfer {
                index: range.index,
                expected,
                received,
                source: None,
            });
        }

        // All bytes must be on disk before the merger reads the unit.
        writer
            .flush()
            .await
            .map_err(|e| DownloadError::staging(&path, e))?;

        observer.finish();
        debug!(index = range.index, bytes = received, "Range complete");

        Ok(ChunkResult {
            index: range.index,
            bytes_written: received,
        })
    }

    async fn throttle(&self, len: usize) {
        let Some(limiter) = &self.limiter else {
            return;
        };

        // Requests larger than the burst size would never be granted, so wait
        // for them one burst at a time.
        let mut remaining = len as u64;
        while remaining > 0 {
            let step = remaining.min(self.limiter_burst as u64) as u32;
            if let Some(n) = NonZeroU32::new(step) {
                let _ = limiter.until_n_ready(n).await;
            }
            remaining -= step as u64;
        }
    }
}
