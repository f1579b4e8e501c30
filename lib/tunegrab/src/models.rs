use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Normalized, immutable record of one track's identifying metadata.
/// Produced only by the metadata resolver and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackDescriptor {
    pub title: String,
    /// Display order preserved; the primary artist is first.
    pub artists: Vec<String>,
    pub album: String,
    pub track_number: Option<u32>,
    /// Opaque catalog identifier.
    pub source_id: String,
}

impl TrackDescriptor {
    pub fn primary_artist(&self) -> &str {
        self.artists
            .first()
            .map(String::as_str)
            .unwrap_or("Unknown Artist")
    }

    pub fn artist_names(&self) -> String {
        self.artists.join(", ")
    }

    /// Free-text query handed to the locator provider.
    pub fn search_query(&self) -> String {
        format!("{} {} audio", self.title, self.artist_names())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchFailureKind {
    /// Access-denial signature in the tool's diagnostics (HTTP 403 class).
    Blocked,
    /// Any other non-zero exit from the fetch tool.
    ToolError,
    /// The fetch tool executable is absent from the system.
    ToolMissing,
    /// Local directory or file creation failed.
    Filesystem,
}

/// Terminal outcome for one acquisition request. Never retried automatically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AcquisitionOutcome {
    Succeeded {
        final_path: PathBuf,
    },
    /// No candidate media reference was found. `detail` carries diagnostic
    /// text from the locator; it is informational only.
    LocatorMiss {
        detail: String,
    },
    FetchFailed {
        kind: FetchFailureKind,
        message: String,
    },
    /// The tool reported success but the declared path does not exist.
    PathMismatch {
        reported: Option<PathBuf>,
    },
}

impl AcquisitionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AcquisitionOutcome::Succeeded { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub descriptor: TrackDescriptor,
    pub outcome: AcquisitionOutcome,
}

/// Ordered outcome log for one batch invocation of the pipeline. Entry order
/// matches the catalog's pagination order exactly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub entries: Vec<ReportEntry>,
    pub succeeded: usize,
    pub failed: usize,
}

impl RunReport {
    pub fn push(&mut self, descriptor: TrackDescriptor, outcome: AcquisitionOutcome) {
        if outcome.is_success() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        self.entries.push(ReportEntry {
            descriptor,
            outcome,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
