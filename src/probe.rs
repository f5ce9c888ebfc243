//! Metadata probe that gates every download.
use crate::error::DownloadError;
use reqwest::header::{ACCEPT_RANGES, CONTENT_LENGTH};
use std::time::Duration;
use tracing::debug;

const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Checks that `url` serves byte ranges and returns its total size.
///
/// Sends a HEAD request. `Content-Length` is read from the header itself since
/// a HEAD response has no body to size.
///
/// # Errors
///
/// * [`DownloadError::Transport`] if the request fails or times out.
/// * [`DownloadError::UnexpectedStatus`] for a non-success status.
/// * [`DownloadError::UnsupportedRange`] unless `Accept-Ranges` is `bytes`.
/// * [`DownloadError::UnknownSize`] if `Content-Length` is missing, garbled or zero.
pub async fn probe_length(client: &reqwest::Client, url: &str) -> Result<u64, DownloadError> {
    debug!(url, "Sending HEAD request");
    let response = client.head(url).timeout(PROBE_TIMEOUT).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(DownloadError::UnexpectedStatus {
            status: status.as_u16(),
            context: "metadata probe".into(),
        });
    }

    let headers = response.headers();
    let accept_ranges = headers
        .get(ACCEPT_RANGES)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).trim().to_string());
    debug!(accept_ranges = ?accept_ranges, "Probe response");

    match accept_ranges.as_deref() {
        Some(unit) if unit.eq_ignore_ascii_case("bytes") => {}
        _ => {
            return Err(DownloadError::UnsupportedRange {
                advertised: accept_ranges,
            });
        }
    }

    let content_length = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|&len| len > 0)
        .ok_or(DownloadError::UnknownSize)?;
    debug!(content_length, "Probe response");

    Ok(content_length)
}
