use thiserror::Error;

pub type Result<T> = std::result::Result<T, GrabError>;

/// Batch-level failures. Per-item failures never surface here; they are
/// recorded as [`crate::models::AcquisitionOutcome`] values in the run report.
#[derive(Error, Debug)]
pub enum GrabError {
    #[error("catalog credentials are not configured")]
    NotConfigured,

    #[error("no catalog record found for '{0}'")]
    MetadataNotFound(String),

    #[error("unsupported reference: {0}")]
    UnsupportedReference(String),

    #[error("fetch tool unavailable: {0}")]
    ToolMissing(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Db(#[from] rusqlite::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
