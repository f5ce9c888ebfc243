//! Error taxonomy for a download run.
//!
//! Every stage returns its failure to the caller; nothing in the crate retries.
//! The coordinator collapses concurrent fetch failures into the first one seen.
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DownloadError {
    /// Bad parallelism, timeout or URL. Detected locally, before any request.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The server did not advertise `Accept-Ranges: bytes`.
    #[error("server does not support byte ranges (Accept-Ranges: {})", .advertised.as_deref().unwrap_or("<missing>"))]
    UnsupportedRange { advertised: Option<String> },

    /// The server reported no usable, positive `Content-Length`.
    #[error("server did not report a usable Content-Length")]
    UnknownSize,

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} for {context}")]
    UnexpectedStatus { status: u16, context: String },

    #[error("incomplete transfer for range {index}: expected {expected} bytes, received {received}")]
    IncompleteTransfer {
        index: usize,
        expected: u64,
        received: u64,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("staging I/O error at {}: {source}", .path.display())]
    StagingIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("download did not finish within {0:?}")]
    DeadlineExceeded(Duration),

    #[error("download cancelled")]
    Cancelled,

    #[error("fetch task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),

    #[error("merge failed at {}: {source}", .path.display())]
    MergeIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl DownloadError {
    pub(crate) fn staging(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::StagingIo {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn merge(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::MergeIo {
            path: path.into(),
            source,
        }
    }
}
