//! Output naming helpers.
use percent_encoding::percent_decode_str;
use sanitize_filename::sanitize;
use std::path::{Path, PathBuf};
use url::Url;

pub const FALLBACK_FILENAME: &str = "output.bin";

/// Extracts a clean filename from a URL.
///
/// 1. Parses the URL.
/// 2. Extracts the last segment of the path.
/// 3. URL-decodes it (converts %20 to space, etc.).
/// 4. Sanitizes it to remove characters invalid for the OS.
/// 5. Falls back to "output.bin" if no valid filename is found.
pub fn get_filename_from_url(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .map(|mut s| s.next_back().unwrap_or("").to_string())
        })
        .map(|s| percent_decode_str(&s).decode_utf8_lossy().to_string())
        .map(sanitize)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| FALLBACK_FILENAME.to_string())
}

/// Output path used when none is given: the URL's filename inside `dir`.
pub fn default_output_path(url: &str, dir: &Path) -> PathBuf {
    dir.join(get_filename_from_url(url))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filename_extraction() {
        // Simple case
        assert_eq!(
            get_filename_from_url("https://example.com/archive.zip"),
            "archive.zip"
        );

        // With query parameters (should ignore ?id=123)
        assert_eq!(
            get_filename_from_url("https://example.com/image.png?id=123&quality=high"),
            "image.png"
        );

        // With URL encoding (%20)
        assert_eq!(
            get_filename_from_url("https://example.com/my%20vacation%20photo.jpg"),
            "my vacation photo.jpg"
        );

        // Edge case: No filename (ends in slash)
        assert_eq!(get_filename_from_url("https://example.com/"), "output.bin");
        assert_eq!(get_filename_from_url("garbage"), "output.bin");
    }

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path("https://example.com/a/b.iso", Path::new("dl")),
            PathBuf::from("dl/b.iso")
        );
    }
}
