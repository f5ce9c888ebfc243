//! Ordered reassembly of staged ranges into the output file.
use crate::error::DownloadError;
use crate::observer::Reporter;
use crate::planner::DownloadPlan;
use crate::staging::StagingArea;
use std::io;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::info;

/// Appends every staging unit to `output_path` in index order, then removes
/// the staging area.
///
/// Any failure aborts immediately with [`DownloadError::MergeIo`]. Whatever
/// was already written to `output_path` stays there; the staging area is
/// removed either way.
pub async fn merge(
    plan: &DownloadPlan,
    staging: StagingArea,
    output_path: &Path,
    reporter: &dyn Reporter,
) -> Result<u64, DownloadError> {
    reporter.status(format!("Merging {} parts...", plan.ranges.len()));

    if let Some(parent) = output_path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| DownloadError::merge(parent, e))?;
    }

    let output = File::create(output_path)
        .await
        .map_err(|e| DownloadError::merge(output_path, e))?;
    let mut writer = BufWriter::new(output);
    let mut written: u64 = 0;

    let mut ranges = plan.ranges.clone();
    ranges.sort_by_key(|r| r.index);

    for range in &ranges {
        let unit_path = staging.unit_path(range.index);
        // Each source is dropped, and so closed, at the end of its iteration.
        let mut source = File::open(&unit_path)
            .await
            .map_err(|e| DownloadError::merge(&unit_path, e))?;

        let copied = tokio::io::copy(&mut source, &mut writer)
            .await
            .map_err(|e| DownloadError::merge(&unit_path, e))?;

        if copied != range.len() {
            return Err(DownloadError::merge(
                &unit_path,
                io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("staged {copied} bytes for a {}-byte range", range.len()),
                ),
            ));
        }
        written += copied;
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::merge(output_path, e))?;

    let staging_path = staging.path().to_path_buf();
    staging
        .close()
        .map_err(|e| DownloadError::merge(staging_path, e))?;

    info!(output = %output_path.display(), bytes = written, "Merge complete");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::ConsoleReporter;
    use tempfile::tempdir;

    async fn stage(area: &StagingArea, index: usize, data: &[u8]) {
        let mut unit = area.create_unit(index).await.unwrap();
        unit.file.write_all(data).await.unwrap();
        unit.file.flush().await.unwrap();
    }

    #[tokio::test]
    async fn test_merges_in_index_order() {
        let root = tempdir().unwrap();
        let plan = DownloadPlan::new("http://example.com/f", 10, 3).unwrap();
        let area = StagingArea::create(root.path(), 3).await.unwrap();

        // Write units out of order; the merger must restore index order.
        stage(&area, 2, b"7890").await;
        stage(&area, 0, b"123").await;
        stage(&area, 1, b"456").await;
        let staging_dir = area.path().to_path_buf();

        let output = root.path().join("out").join("file.bin");
        let written = merge(&plan, area, &output, &ConsoleReporter::hidden())
            .await
            .unwrap();

        assert_eq!(written, 10);
        assert_eq!(tokio::fs::read(&output).await.unwrap(), b"1234567890");
        assert!(!staging_dir.exists());
    }

    #[tokio::test]
    async fn test_missing_unit_is_merge_error_and_cleans_up() {
        let root = tempdir().unwrap();
        let plan = DownloadPlan::new("http://example.com/f", 6, 2).unwrap();
        let area = StagingArea::create(root.path(), 2).await.unwrap();
        stage(&area, 0, b"abc").await;
        let staging_dir = area.path().to_path_buf();

        let output = root.path().join("file.bin");
        let err = merge(&plan, area, &output, &ConsoleReporter::hidden())
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::MergeIo { .. }));
        assert!(!staging_dir.exists());
        // Partial output is left in place.
        assert!(output.exists());
    }

    #[tokio::test]
    async fn test_short_unit_is_rejected() {
        let root = tempdir().unwrap();
        let plan = DownloadPlan::new("http://example.com/f", 6, 2).unwrap();
        let area = StagingArea::create(root.path(), 2).await.unwrap();
        stage(&area, 0, b"abc").await;
        stage(&area, 1, b"d").await;

        let output = root.path().join("file.bin");
        let err = merge(&plan, area, &output, &ConsoleReporter::hidden())
            .await
            .unwrap_err();

        match err {
            DownloadError::MergeIo { source, .. } => {
                assert_eq!(source.kind(), io::ErrorKind::UnexpectedEof)
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
