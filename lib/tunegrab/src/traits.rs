use async_trait::async_trait;
use std::path::Path;

use crate::error::Result;
use crate::models::AcquisitionOutcome;
use crate::spotify::models::{RawAlbum, RawTrack, TrackPage};

/// Raw catalog provider surface. Implementations speak to the remote
/// catalog; normalization into descriptors lives in the resolver.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Fetch a single track record; `Ok(None)` when the catalog has no
    /// record for the id.
    async fn track(&self, id: &str) -> Result<Option<RawTrack>>;

    /// Fetch an album summary; `Ok(None)` when absent.
    async fn album(&self, id: &str) -> Result<Option<RawAlbum>>;

    /// Fetch one page of an album's track listing starting at `offset`.
    async fn album_tracks(&self, id: &str, offset: u32) -> Result<TrackPage>;
}

/// Result of a single locator query. Misses and transport failures are not
/// distinguished at this layer; the detail text is diagnostic only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocateOutcome {
    Found(String),
    Miss(String),
}

#[async_trait]
pub trait MediaLocator: Send + Sync {
    /// Issue exactly one search for the top result of `query`. No retries.
    async fn locate(&self, query: &str) -> LocateOutcome;
}

#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Fetch `media_url` into `target_dir` under `stem` (extension decided
    /// by the tool). Always returns a structured outcome, never an error.
    async fn fetch(&self, media_url: &str, target_dir: &Path, stem: &str) -> AcquisitionOutcome;
}
