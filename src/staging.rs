//! Ephemeral storage for fetched ranges.
//!
//! Each download gets its own uniquely named directory under a staging root, so
//! concurrent runs sharing a root never see each other's units. The directory
//! is removed when the [`StagingArea`] is dropped, which covers every failure
//! path; [`StagingArea::close`] removes it explicitly and reports errors.
use crate::error::DownloadError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::fs::File;

const STAGING_PREFIX: &str = ".rangefetch-";

#[derive(Debug)]
pub struct StagingArea {
    dir: TempDir,
    parallelism: usize,
}

impl StagingArea {
    /// Creates a fresh staging directory inside `root`, creating `root` if needed.
    pub async fn create(root: &Path, parallelism: usize) -> Result<Self, DownloadError> {
        tokio::fs::create_dir_all(root)
            .await
            .map_err(|e| DownloadError::staging(root, e))?;

        let dir = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(root)
            .map_err(|e| DownloadError::staging(root, e))?;

        tracing::debug!(dir = %dir.path().display(), parallelism, "Created staging area");
        Ok(Self { dir, parallelism })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Deterministic location of the unit holding range `index`.
    pub fn unit_path(&self, index: usize) -> PathBuf {
        self.dir
            .path()
            .join(format!("part.{}.{}", self.parallelism, index))
    }

    /// Creates (truncating) the unit file for range `index`.
    pub async fn create_unit(&self, index: usize) -> Result<StagingUnit, DownloadError> {
        let path = self.unit_path(index);
        let file = File::create(&path)
            .await
            .map_err(|e| DownloadError::staging(&path, e))?;

        Ok(StagingUnit { index, path, file })
    }

    /// Removes the directory and everything in it.
    pub fn close(self) -> std::io::Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close()?;
        tracing::debug!(dir = %path.display(), "Removed staging area");
        Ok(())
    }
}

/// Writable handle to one range's staging file, owned by exactly one fetcher.
#[derive(Debug)]
pub struct StagingUnit {
    pub index: usize,
    pub path: PathBuf,
    pub file: File,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn test_units_are_named_by_parallelism_and_index() -> anyhow::Result<()> {
        let root = tempdir()?;
        let area = StagingArea::create(root.path(), 4).await?;

        assert!(area.path().starts_with(root.path()));
        assert_eq!(
            area.unit_path(2).file_name().unwrap().to_str().unwrap(),
            "part.4.2"
        );

        let mut unit = area.create_unit(2).await?;
        unit.file.write_all(b"abc").await?;
        unit.file.flush().await?;
        assert_eq!(tokio::fs::read(&unit.path).await?, b"abc");

        Ok(())
    }

    #[tokio::test]
    async fn test_close_removes_directory() -> anyhow::Result<()> {
        let root = tempdir()?;
        let area = StagingArea::create(root.path(), 2).await?;
        area.create_unit(0).await?;
        area.create_unit(1).await?;

        let dir = area.path().to_path_buf();
        area.close()?;

        assert!(!dir.exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_drop_removes_directory() -> anyhow::Result<()> {
        let root = tempdir()?;
        let area = StagingArea::create(root.path(), 1).await?;
        area.create_unit(0).await?;
        let dir = area.path().to_path_buf();

        drop(area);

        assert!(!dir.exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_two_areas_in_one_root_do_not_collide() -> anyhow::Result<()> {
        let root = tempdir()?;
        let a = StagingArea::create(root.path(), 2).await?;
        let b = StagingArea::create(root.path(), 2).await?;

        assert_ne!(a.unit_path(0), b.unit_path(0));
        Ok(())
    }

    #[tokio::test]
    async fn test_creates_missing_root() -> anyhow::Result<()> {
        let root = tempdir()?;
        let nested = root.path().join("a").join("b");
        let area = StagingArea::create(&nested, 1).await?;

        assert!(area.path().starts_with(&nested));
        Ok(())
    }
}
