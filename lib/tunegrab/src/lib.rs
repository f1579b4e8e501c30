pub mod error;
pub mod library;
pub mod models;
pub mod organize;
pub mod pipeline;
pub mod reference;
pub mod resolver;
pub mod sanitize;
pub mod spotify;
pub mod traits;
pub mod ytdlp;

pub use error::{GrabError, Result};
pub use models::{AcquisitionOutcome, FetchFailureKind, ReportEntry, RunReport, TrackDescriptor};
pub use pipeline::{Pipeline, PipelineConfig};
pub use traits::{CatalogApi, LocateOutcome, MediaFetcher, MediaLocator};
pub use ytdlp::{FetchMode, YtDlpFetcher, YtDlpLocator};
