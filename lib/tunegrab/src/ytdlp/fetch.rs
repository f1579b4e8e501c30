use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{info, warn};

use super::{last_non_empty_line, DEFAULT_BINARY, TARGET_FORMAT};
use crate::models::{AcquisitionOutcome, FetchFailureKind};
use crate::traits::MediaFetcher;

/// Access-denial signature in the tool's diagnostics. A 403 here usually
/// means the provider is refusing automated requests from this address.
const BLOCKED_SIGNATURE: &str = "HTTP Error 403";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Skip the network path entirely and synthesize a placeholder file,
    /// exercising path construction and batching without network cost.
    Simulate,
    /// Invoke the external tool for download and transcode.
    Real,
}

/// Fetch executor backed by the yt-dlp executable.
#[derive(Debug, Clone)]
pub struct YtDlpFetcher {
    binary: String,
    mode: FetchMode,
}

impl YtDlpFetcher {
    pub fn new(mode: FetchMode) -> Self {
        Self {
            binary: DEFAULT_BINARY.to_string(),
            mode,
        }
    }

    pub fn with_binary(binary: impl Into<String>, mode: FetchMode) -> Self {
        Self {
            binary: binary.into(),
            mode,
        }
    }

    async fn simulate(&self, media_url: &str, target_dir: &Path, stem: &str) -> AcquisitionOutcome {
        let path = target_dir.join(format!("{stem}.{TARGET_FORMAT}"));
        let body = format!(
            "This is a simulated audio file for '{stem}'.\nOriginal media URL: {media_url}\n"
        );
        match tokio::fs::write(&path, body).await {
            Ok(()) => {
                info!("Simulated download: created placeholder at {:?}", path);
                AcquisitionOutcome::Succeeded { final_path: path }
            }
            Err(e) => AcquisitionOutcome::FetchFailed {
                kind: FetchFailureKind::Filesystem,
                message: format!("could not write placeholder {path:?}: {e}"),
            },
        }
    }

    async fn real(&self, media_url: &str, target_dir: &Path, stem: &str) -> AcquisitionOutcome {
        // The tool substitutes the real extension; the final resolved path
        // is printed after post-processing moves the file in place.
        let template = target_dir.join(format!("{stem}.%(ext)s"));
        info!("Fetching {} into {:?}", media_url, template);

        let output = Command::new(&self.binary)
            .arg("-x")
            .arg("--audio-format")
            .arg(TARGET_FORMAT)
            .arg("--audio-quality")
            .arg("0")
            .arg("-o")
            .arg(&template)
            .arg("--print")
            .arg("after_move:filepath")
            .arg("--no-simulate")
            .arg("--no-playlist")
            .arg("--no-warnings")
            .arg(media_url)
            .output()
            .await;

        let output = match output {
            Ok(output) => output,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!("{} not found in PATH", self.binary);
                return AcquisitionOutcome::FetchFailed {
                    kind: FetchFailureKind::ToolMissing,
                    message: format!("{} not found: {e}", self.binary),
                };
            }
            Err(e) => {
                return AcquisitionOutcome::FetchFailed {
                    kind: FetchFailureKind::ToolError,
                    message: format!("failed to run {}: {e}", self.binary),
                };
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if output.status.success() {
            return match last_non_empty_line(&stdout) {
                Some(reported) => {
                    let reported = PathBuf::from(reported);
                    if reported.exists() {
                        info!("Fetched and converted: {:?}", reported);
                        AcquisitionOutcome::Succeeded {
                            final_path: reported,
                        }
                    } else {
                        warn!("Tool reported {:?}, but it was not found", reported);
                        AcquisitionOutcome::PathMismatch {
                            reported: Some(reported),
                        }
                    }
                }
                None => {
                    warn!("Could not determine fetched file path from tool output");
                    AcquisitionOutcome::PathMismatch { reported: None }
                }
            };
        }

        // Non-zero exit. The tool is inconsistent about which stream carries
        // the diagnostic, so fall back through stderr, stdout, exit code.
        let message = match (stderr.trim(), stdout.trim()) {
            ("", "") => format!("{} exited with {:?}", self.binary, output.status.code()),
            ("", out) => out.to_string(),
            (err, _) => err.to_string(),
        };
        let kind = if message.contains(BLOCKED_SIGNATURE) || message.contains("403 Forbidden") {
            FetchFailureKind::Blocked
        } else {
            FetchFailureKind::ToolError
        };
        warn!("Fetch failed ({kind:?}): {message}");
        AcquisitionOutcome::FetchFailed { kind, message }
    }
}

#[async_trait]
impl MediaFetcher for YtDlpFetcher {
    async fn fetch(&self, media_url: &str, target_dir: &Path, stem: &str) -> AcquisitionOutcome {
        match self.mode {
            FetchMode::Simulate => self.simulate(media_url, target_dir, stem).await,
            FetchMode::Real => self.real(media_url, target_dir, stem).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn simulate_writes_marker_file() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = YtDlpFetcher::new(FetchMode::Simulate);
        let outcome = fetcher
            .fetch("https://example.test/watch?v=abc", dir.path(), "01 - Song")
            .await;

        let expected = dir.path().join("01 - Song.mp3");
        assert_eq!(
            outcome,
            AcquisitionOutcome::Succeeded {
                final_path: expected.clone()
            }
        );
        let body = std::fs::read_to_string(expected).unwrap();
        assert!(body.contains("01 - Song"));
        assert!(body.contains("https://example.test/watch?v=abc"));
    }

    #[tokio::test]
    async fn simulate_write_failure_is_filesystem_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = YtDlpFetcher::new(FetchMode::Simulate);
        // Target "directory" is actually a file, so the write must fail.
        let bogus = dir.path().join("not-a-dir");
        std::fs::write(&bogus, b"x").unwrap();
        let outcome = fetcher.fetch("url", &bogus, "Song").await;
        assert!(matches!(
            outcome,
            AcquisitionOutcome::FetchFailed {
                kind: FetchFailureKind::Filesystem,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn missing_tool_is_tool_missing() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = YtDlpFetcher::with_binary("/nonexistent/ytdlp-missing", FetchMode::Real);
        let outcome = fetcher.fetch("url", dir.path(), "Song").await;
        assert!(matches!(
            outcome,
            AcquisitionOutcome::FetchFailed {
                kind: FetchFailureKind::ToolMissing,
                ..
            }
        ));
    }

    #[cfg(unix)]
    mod with_stub_tool {
        use super::*;
        use std::io::Write;
        use std::os::unix::fs::PermissionsExt;
        use std::path::Path;
        use tempfile::tempdir;

        fn stub_tool(dir: &Path, script: &str) -> String {
            let path = dir.join("fake-ytdlp");
            let mut file = std::fs::File::create(&path).unwrap();
            writeln!(file, "#!/bin/sh").unwrap();
            writeln!(file, "{script}").unwrap();
            drop(file);
            let mut perms = std::fs::metadata(&path).unwrap().permissions();
            perms.set_mode(0o755);
            std::fs::set_permissions(&path, perms).unwrap();
            path.to_string_lossy().into_owned()
        }

        #[tokio::test]
        async fn success_with_existing_path_succeeds() {
            let dir = tempdir().unwrap();
            let produced = dir.path().join("out.mp3");
            std::fs::write(&produced, b"audio").unwrap();
            let tool = stub_tool(dir.path(), &format!("echo '{}'", produced.display()));

            let fetcher = YtDlpFetcher::with_binary(tool, FetchMode::Real);
            let outcome = fetcher.fetch("url", dir.path(), "out").await;
            assert_eq!(
                outcome,
                AcquisitionOutcome::Succeeded {
                    final_path: produced
                }
            );
        }

        #[tokio::test]
        async fn success_with_missing_path_is_mismatch() {
            let dir = tempdir().unwrap();
            let tool = stub_tool(dir.path(), "echo '/nonexistent/ghost.mp3'");
            let fetcher = YtDlpFetcher::with_binary(tool, FetchMode::Real);
            let outcome = fetcher.fetch("url", dir.path(), "out").await;
            assert_eq!(
                outcome,
                AcquisitionOutcome::PathMismatch {
                    reported: Some(PathBuf::from("/nonexistent/ghost.mp3"))
                }
            );
        }

        #[tokio::test]
        async fn forbidden_signature_classifies_as_blocked() {
            let dir = tempdir().unwrap();
            let tool = stub_tool(
                dir.path(),
                "echo 'ERROR: unable to download: HTTP Error 403: Forbidden' >&2; exit 1",
            );
            let fetcher = YtDlpFetcher::with_binary(tool, FetchMode::Real);
            let outcome = fetcher.fetch("url", dir.path(), "out").await;
            match outcome {
                AcquisitionOutcome::FetchFailed { kind, message } => {
                    assert_eq!(kind, FetchFailureKind::Blocked);
                    assert!(message.contains("403"));
                }
                other => panic!("expected fetch failure, got {other:?}"),
            }
        }

        #[tokio::test]
        async fn other_nonzero_exit_is_tool_error() {
            let dir = tempdir().unwrap();
            let tool = stub_tool(dir.path(), "echo 'ERROR: no formats' >&2; exit 2");
            let fetcher = YtDlpFetcher::with_binary(tool, FetchMode::Real);
            let outcome = fetcher.fetch("url", dir.path(), "out").await;
            assert!(matches!(
                outcome,
                AcquisitionOutcome::FetchFailed {
                    kind: FetchFailureKind::ToolError,
                    ..
                }
            ));
        }
    }
}
