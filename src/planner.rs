//! Byte-range planning.
//!
//! A plan splits a resource of known length into contiguous, inclusive byte
//! ranges. Planning is pure: no I/O, and the same inputs always give the same
//! ranges.
use crate::error::DownloadError;

/// A span of bytes within the remote resource.
///
/// The range is inclusive, meaning `start` and `end` are both part of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// Position of the range in the output, also its staging unit id.
    pub index: usize,
    /// The starting byte index (0-based).
    pub start: u64,
    /// The ending byte index.
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes covered by the range.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Ranges are never empty; kept for clippy's `len_without_is_empty`.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Value for the HTTP `Range` request header.
    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

/// Everything needed to fetch one resource in parallel.
///
/// Built once after the length probe succeeds and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadPlan {
    pub url: String,
    pub total_size: u64,
    pub ranges: Vec<ByteRange>,
}

impl DownloadPlan {
    pub fn new(
        url: impl Into<String>,
        total_size: u64,
        chunk_count: usize,
    ) -> Result<Self, DownloadError> {
        let ranges = plan_ranges(total_size, chunk_count)?;
        Ok(Self {
            url: url.into(),
            total_size,
            ranges,
        })
    }

    /// Number of ranges, which is also the number of concurrent fetches.
    pub fn parallelism(&self) -> usize {
        self.ranges.len()
    }
}

/// Divides `total_size` bytes into `chunk_count` contiguous ranges.
///
/// Every range but the last is `total_size / chunk_count` bytes long. The last
/// one absorbs the remainder and always ends at `total_size - 1`.
///
/// # Errors
///
/// Returns [`DownloadError::InvalidConfiguration`] when `chunk_count` is zero,
/// when `total_size` is zero, or when there are more chunks than bytes.
pub fn plan_ranges(
    total_size: u64,
    chunk_count: usize,
) -> Result<Vec<ByteRange>, DownloadError> {
    if chunk_count == 0 {
        return Err(DownloadError::InvalidConfiguration(
            "chunk count must be at least 1".into(),
        ));
    }
    if total_size == 0 {
        return Err(DownloadError::InvalidConfiguration(
            "cannot plan ranges for an empty resource".into(),
        ));
    }

    let count = chunk_count as u64;
    if count > total_size {
        return Err(DownloadError::InvalidConfiguration(format!(
            "{chunk_count} chunks requested for a {total_size}-byte resource"
        )));
    }

    let chunk_size = total_size / count;
    let ranges = (0..count)
        .map(|i| {
            let start = i * chunk_size;
            let end = if i == count - 1 {
                total_size - 1
            } else {
                start + chunk_size - 1
            };

            ByteRange {
                index: i as usize,
                start,
                end,
            }
        })
        .collect();

    Ok(ranges)
}
