//! Progress and status reporting.
//!
//! The download core never depends on these for control flow. A [`Reporter`]
//! receives human-readable status lines and hands out one
//! [`ProgressObserver`] per byte range.
use crate::planner::ByteRange;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::Arc;

/// Receives progress for a single byte range.
pub trait ProgressObserver: Send + Sync {
    fn inc(&self, delta: u64);
    fn message(&self, msg: String);
    fn finish(&self);
}

/// Sink for status lines and factory for per-range observers.
pub trait Reporter: Send + Sync {
    fn status(&self, line: String);
    fn range_observer(&self, range: &ByteRange) -> Arc<dyn ProgressObserver>;
}

/// A [`ProgressObserver`] backed by an indicatif progress bar.
pub struct ConsoleObserver {
    pub pb: ProgressBar,
}

impl ProgressObserver for ConsoleObserver {
    fn inc(&self, delta: u64) {
        self.pb.inc(delta);
    }

    fn message(&self, msg: String) {
        self.pb.set_message(msg);
    }

    fn finish(&self) {
        self.pb.finish_with_message("Done");
    }
}

/// Renders one bar per range under a shared [`MultiProgress`].
#[derive(Clone)]
pub struct ConsoleReporter {
    multi: MultiProgress,
    style: ProgressStyle,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self::with_target(ProgressDrawTarget::stderr())
    }

    /// A reporter that draws nothing. Used by `--quiet` and in tests.
    pub fn hidden() -> Self {
        Self::with_target(ProgressDrawTarget::hidden())
    }

    fn with_target(target: ProgressDrawTarget) -> Self {
        let style = ProgressStyle::with_template(
            "{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-");

        Self {
            multi: MultiProgress::with_draw_target(target),
            style,
        }
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for ConsoleReporter {
    fn status(&self, line: String) {
        // Goes through the multi-progress so active bars are not torn.
        let _ = self.multi.println(line);
    }

    fn range_observer(&self, range: &ByteRange) -> Arc<dyn ProgressObserver> {
        let pb = self.multi.add(ProgressBar::new(range.len()));
        pb.set_style(self.style.clone());
        pb.set_message(format!("Part {}", range.index + 1));
        Arc::new(ConsoleObserver { pb })
    }
}
