use async_trait::async_trait;
use tokio::process::Command;
use tracing::{info, warn};

use super::{last_non_empty_line, DEFAULT_BINARY};
use crate::traits::{LocateOutcome, MediaLocator};

/// Locator client backed by yt-dlp's `ytsearchN:` pseudo-URL: one search
/// request for the top result, printing only the canonical page URL, with
/// download suppressed.
#[derive(Debug, Clone)]
pub struct YtDlpLocator {
    binary: String,
}

impl YtDlpLocator {
    pub fn new() -> Self {
        Self {
            binary: DEFAULT_BINARY.to_string(),
        }
    }

    /// Use a specific executable instead of resolving `yt-dlp` from PATH.
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for YtDlpLocator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaLocator for YtDlpLocator {
    async fn locate(&self, query: &str) -> LocateOutcome {
        info!("Searching for: \"{}\"", query);

        let output = Command::new(&self.binary)
            .arg("--skip-download")
            .arg("--no-warnings")
            .arg("--print")
            .arg("webpage_url")
            .arg(format!("ytsearch1:{query}"))
            .output()
            .await;

        let output = match output {
            Ok(output) => output,
            Err(e) => {
                // Transport-level failures collapse into a miss at this
                // layer; the detail survives only as diagnostic text.
                warn!("Locator process failed to run: {}", e);
                return LocateOutcome::Miss(format!("locator process error: {e}"));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = match stderr.trim() {
                "" => format!("search exited with {:?}", output.status.code()),
                s => s.to_string(),
            };
            warn!("No result for \"{}\": {}", query, detail);
            return LocateOutcome::Miss(detail);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        match last_non_empty_line(&stdout) {
            Some(url) => {
                info!("Found media URL: {}", url);
                LocateOutcome::Found(url.to_string())
            }
            None => LocateOutcome::Miss("search returned no results".to_string()),
        }
    }
}
