//! Concurrent fan-out of range fetches.
//!
//! One task per planned range, a join barrier, a single-assignment slot for the
//! first failure, and one deadline for the whole batch. On any failure the
//! staging area is dropped (and so removed) before the error is returned.
use crate::error::DownloadError;
use crate::fetcher::{ChunkFetcher, ChunkResult};
use crate::observer::Reporter;
use crate::planner::DownloadPlan;
use crate::staging::StagingArea;
use futures_util::future::join_all;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Holds the first error reported by any fetch task. Later errors are dropped.
#[derive(Default)]
struct FirstFailure {
    slot: Mutex<Option<DownloadError>>,
}

impl FirstFailure {
    /// Returns `true` if `err` was the first one recorded.
    async fn record(&self, err: DownloadError) -> bool {
        let mut slot = self.slot.lock().await;
        if slot.is_some() {
            return false;
        }
        *slot = Some(err);
        true
    }

    async fn take(&self) -> Option<DownloadError> {
        self.slot.lock().await.take()
    }
}

pub struct DownloadCoordinator {
    fetcher: ChunkFetcher,
    staging_root: PathBuf,
    timeout: Duration,
    reporter: Arc<dyn Reporter>,
    cancel: CancellationToken,
}

impl DownloadCoordinator {
    pub fn new(
        fetcher: ChunkFetcher,
        staging_root: impl Into<PathBuf>,
        timeout: Duration,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            fetcher,
            staging_root: staging_root.into(),
            timeout,
            reporter,
            cancel: CancellationToken::new(),
        }
    }

    /// Ties the download to an outer token, e.g. one cancelled on Ctrl+C.
    pub fn with_cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Fetches every range of `plan` concurrently into a new staging area.
    ///
    /// Returns the staging area with every unit complete. On failure the area
    /// has already been removed and the first error observed is returned,
    /// after every task has stopped.
    pub async fn download(&self, plan: &DownloadPlan) -> Result<StagingArea, DownloadError> {
        let started = Instant::now();
        let staging = StagingArea::create(&self.staging_root, plan.parallelism()).await?;

        let mut units = Vec::with_capacity(plan.ranges.len());
        for range in &plan.ranges {
            units.push(staging.create_unit(range.index).await?);
        }

        let token = self.cancel.child_token();
        let failure = Arc::new(FirstFailure::default());
        let mut tasks = Vec::with_capacity(plan.ranges.len());

        for (range, unit) in plan.ranges.iter().copied().zip(units) {
            let fetcher = self.fetcher.clone();
            let observer = self.reporter.range_observer(&range);
            let token_ref = token.clone();
            let failure_ref = failure.clone();

            let task = tokio::spawn(async move {
                let result = tokio::select! {
                    biased;
                    _ = token_ref.cancelled() => Err(DownloadError::Cancelled),
                    r = fetcher.fetch(range, unit, observer.clone()) => r,
                };

                match result {
                    Ok(chunk) => Some(chunk),
                    // Stopped because a sibling failed or the deadline hit.
                    Err(DownloadError::Cancelled) => None,
                    Err(e) => {
                        observer.message(format!("Part {} failed", range.index + 1));
                        if failure_ref.record(e).await {
                            debug!(index = range.index, "First fetch failure recorded");
                        }
                        token_ref.cancel();
                        None
                    }
                }
            });

            tasks.push(task);
        }

        info!(
            url = %plan.url,
            ranges = plan.ranges.len(),
            "Dispatched range fetches"
        );

        let barrier = join_all(tasks);
        tokio::pin!(barrier);

        let results = tokio::select! {
            results = &mut barrier => results,
            _ = tokio::time::sleep(self.timeout) => {
                warn!(timeout = ?self.timeout, "Deadline exceeded, abandoning in-flight fetches");
                token.cancel();
                barrier.await;
                return Err(DownloadError::DeadlineExceeded(self.timeout));
            }
        };

        let mut completed: Vec<ChunkResult> = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok(Some(chunk)) => completed.push(chunk),
                Ok(None) => {}
                Err(join_err) => {
                    failure.record(DownloadError::TaskFailed(join_err)).await;
                }
            }
        }

        if let Some(err) = failure.take().await {
            return Err(err);
        }
        if completed.len() != plan.ranges.len() {
            // Nothing failed on its own, so the outer token stopped us.
            return Err(DownloadError::Cancelled);
        }

        let bytes: u64 = completed.iter().map(|c| c.bytes_written).sum();
        self.reporter.status(format!(
            "Fetched {} ranges ({} bytes) in {:.2?}",
            completed.len(),
            bytes,
            started.elapsed()
        ));

        Ok(staging)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_failure_wins() {
        let failure = FirstFailure::default();

        assert!(failure.record(DownloadError::UnknownSize).await);
        assert!(!failure.record(DownloadError::Cancelled).await);

        assert!(matches!(
            failure.take().await,
            Some(DownloadError::UnknownSize)
        ));
        assert!(failure.take().await.is_none());
    }

    #[tokio::test]
    async fn concurrent_records_keep_exactly_one() {
        let failure = Arc::new(FirstFailure::default());
        let mut tasks = Vec::new();
        for _ in 0..16 {
            let f = failure.clone();
            tasks.push(tokio::spawn(async move {
                f.record(DownloadError::UnknownSize).await
            }));
        }

        let wins = join_all(tasks)
            .await
            .into_iter()
            .filter(|r| *r.as_ref().unwrap())
            .count();
        assert_eq!(wins, 1);
    }
}
