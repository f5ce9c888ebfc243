//! Command-line definition for the `rangefetch` binary.
use crate::config::{
    DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT, DownloadConfig, Settings, default_parallelism,
};
use crate::utils;
use clap::Parser;
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::time::Duration;

/// A parallel, range-based file downloader.
///
/// Splits a file into byte ranges, fetches them concurrently and stitches
/// them back together in order.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// The URL of the file to download.
    #[arg(short, long)]
    pub url: String,

    /// Output file. Defaults to the URL's filename in the configured output
    /// directory, or "output.bin".
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Number of ranges to fetch concurrently. Defaults to the number of CPUs.
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
    pub parallel: Option<u32>,

    /// Seconds allowed for the whole download before it is abandoned.
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Directory in which temporary part files are staged.
    #[arg(long)]
    pub staging_dir: Option<PathBuf>,

    /// A rate limit in bytes per second (e.g., 1048576 for 1MB/s).
    #[arg(long)]
    pub rate_limit: Option<u32>,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Hide progress bars and status lines.
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Merges flags over `settings` into a run configuration. Flags win.
    pub fn into_config(self, settings: &Settings) -> DownloadConfig {
        let output_path = self.output.unwrap_or_else(|| {
            let dir = settings
                .output_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from("."));
            utils::default_output_path(&self.url, &dir)
        });

        let parallelism = self
            .parallel
            .map(|p| p as usize)
            .or(settings.parallel)
            .unwrap_or_else(default_parallelism);
        let timeout_secs = self
            .timeout
            .or(settings.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        DownloadConfig {
            url: self.url,
            parallelism,
            output_path,
            timeout: Duration::from_secs(timeout_secs),
            staging_dir: self.staging_dir.or_else(|| settings.staging_dir.clone()),
            rate_limit: self
                .rate_limit
                .or(settings.rate_limit)
                .and_then(NonZeroU32::new),
            user_agent: settings
                .user_agent
                .clone()
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_settings() {
        let args = Args::parse_from([
            "rangefetch",
            "-u",
            "https://example.com/file.iso",
            "-p",
            "3",
            "-t",
            "5",
            "-o",
            "out.iso",
        ]);
        let settings = Settings {
            parallel: Some(8),
            timeout_secs: Some(99),
            ..Settings::default()
        };

        let cfg = args.into_config(&settings);
        assert_eq!(cfg.parallelism, 3);
        assert_eq!(cfg.timeout, Duration::from_secs(5));
        assert_eq!(cfg.output_path, PathBuf::from("out.iso"));
    }

    #[test]
    fn test_settings_fill_gaps() {
        let args = Args::parse_from(["rangefetch", "--url", "https://example.com/a/b.tar"]);
        let settings = Settings {
            parallel: Some(6),
            output_dir: Some(PathBuf::from("dl")),
            rate_limit: Some(0),
            user_agent: Some("custom/1.0".into()),
            ..Settings::default()
        };

        let cfg = args.into_config(&settings);
        assert_eq!(cfg.parallelism, 6);
        assert_eq!(cfg.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(cfg.output_path, PathBuf::from("dl/b.tar"));
        // Zero means unlimited.
        assert_eq!(cfg.rate_limit, None);
        assert_eq!(cfg.user_agent, "custom/1.0");
    }

    #[test]
    fn test_zero_parallel_flag_rejected() {
        let parsed = Args::try_parse_from(["rangefetch", "-u", "https://e.com/f", "-p", "0"]);
        assert!(parsed.is_err());

        let negative = Args::try_parse_from(["rangefetch", "-u", "https://e.com/f", "-p", "-2"]);
        assert!(negative.is_err());
    }
}
