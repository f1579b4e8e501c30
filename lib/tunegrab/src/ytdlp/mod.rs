//! Adapters for the external yt-dlp executable: a one-shot "first result"
//! locator and the fetch/transcode executor. All subprocess stdout/stderr
//! interpretation lives here, behind the `MediaLocator` / `MediaFetcher`
//! traits.

pub mod fetch;
pub mod search;

pub use fetch::{FetchMode, YtDlpFetcher};
pub use search::YtDlpLocator;

/// Default executable name, resolved through PATH.
pub const DEFAULT_BINARY: &str = "yt-dlp";

/// Fixed transcode target for acquired audio.
pub const TARGET_FORMAT: &str = "mp3";

/// Returns the last non-empty line of a text stream; yt-dlp prints the
/// authoritative final path there.
pub(crate) fn last_non_empty_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).filter(|l| !l.is_empty()).last()
}
