//! Run configuration and the optional on-disk settings file.
//!
//! [`DownloadConfig`] is what the core consumes. [`Settings`] holds user
//! defaults loaded from `<config_dir>/rangefetch/config.toml`; command-line
//! flags take precedence over it.
use crate::error::DownloadError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_USER_AGENT: &str = concat!("rangefetch/", env!("CARGO_PKG_VERSION"));

/// Everything one download run needs. No field falls back to process state
/// such as the working directory.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    pub url: String,
    /// Requested number of concurrent range fetches.
    pub parallelism: usize,
    pub output_path: PathBuf,
    /// Deadline for the whole concurrent download stage.
    pub timeout: Duration,
    /// Where staging directories are created. Defaults to the output's parent.
    pub staging_dir: Option<PathBuf>,
    /// Aggregate bandwidth cap in bytes per second.
    pub rate_limit: Option<NonZeroU32>,
    pub user_agent: String,
}

impl DownloadConfig {
    pub fn new(url: impl Into<String>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            parallelism: default_parallelism(),
            output_path: output_path.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            staging_dir: None,
            rate_limit: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Rejects configurations that can never succeed.
    pub fn validate(&self) -> Result<(), DownloadError> {
        if self.parallelism == 0 {
            return Err(DownloadError::InvalidConfiguration(
                "parallelism must be at least 1".into(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(DownloadError::InvalidConfiguration(
                "timeout must be greater than zero".into(),
            ));
        }

        let url = Url::parse(&self.url).map_err(|e| {
            DownloadError::InvalidConfiguration(format!("invalid URL {:?}: {e}", self.url))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(DownloadError::InvalidConfiguration(format!(
                "unsupported URL scheme {:?}",
                url.scheme()
            )));
        }

        if self.output_path.as_os_str().is_empty() {
            return Err(DownloadError::InvalidConfiguration(
                "output path is empty".into(),
            ));
        }

        Ok(())
    }

    /// Staging root: the configured one, else the output file's directory.
    pub fn staging_root(&self) -> PathBuf {
        if let Some(dir) = &self.staging_dir {
            return dir.clone();
        }
        match self.output_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

/// Number of concurrency units the host offers, at least 1.
pub fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// User defaults read from the settings file. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub parallel: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub output_dir: Option<PathBuf>,
    pub staging_dir: Option<PathBuf>,
    pub rate_limit: Option<u32>,
    pub user_agent: Option<String>,
}

impl Settings {
    /// Default location of the settings file, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("rangefetch").join("config.toml"))
    }

    /// Loads the settings file from its default location.
    ///
    /// A missing file yields the defaults.
    pub fn load() -> Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No settings file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        let settings: Settings = toml::from_str(&content)
            .with_context(|| format!("Failed to parse settings file {}", path.display()))?;

        tracing::debug!(path = %path.display(), ?settings, "Loaded settings");
        Ok(settings)
    }
}
