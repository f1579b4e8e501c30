//! Top-level acquisition driver.
//!
//! Expands a reference into descriptors, then runs each one through
//! locate → fetch strictly sequentially. Item failures are isolated: the
//! batch always completes and the run report keeps catalog order. Only
//! batch-level conditions (missing credentials, unresolvable reference,
//! missing tool on the very first fetch) abort the run.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{GrabError, Result};
use crate::models::{AcquisitionOutcome, FetchFailureKind, RunReport, TrackDescriptor};
use crate::organize::{self, StemRegistry};
use crate::reference::{self, Reference};
use crate::resolver::{MetadataResolver, UNKNOWN_ALBUM, UNKNOWN_ARTIST};
use crate::sanitize::sanitize;
use crate::traits::{CatalogApi, LocateOutcome, MediaFetcher, MediaLocator};

/// Explicit configuration handed to the pipeline at construction. Nothing
/// in the core reads the environment.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root under which the `Music/<artist>/<album>` tree is built.
    pub output_root: PathBuf,
    /// When set, a `ToolError` fetch outcome is given one extra attempt.
    pub retry_tool_errors: bool,
}

impl PipelineConfig {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
            retry_tool_errors: false,
        }
    }
}

pub struct Pipeline {
    config: PipelineConfig,
    catalog: Option<Arc<dyn CatalogApi>>,
    locator: Arc<dyn MediaLocator>,
    fetcher: Arc<dyn MediaFetcher>,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        locator: Arc<dyn MediaLocator>,
        fetcher: Arc<dyn MediaFetcher>,
    ) -> Self {
        Self {
            config,
            catalog: None,
            locator,
            fetcher,
        }
    }

    /// Attach a catalog provider. Without one, catalog-backed references
    /// fail the whole batch with a credentials error.
    pub fn with_catalog(mut self, catalog: Arc<dyn CatalogApi>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Runs one batch for a user reference and returns the ordered report.
    pub async fn run(&self, raw_reference: &str) -> Result<RunReport> {
        let reference = reference::parse(raw_reference)?;

        let (descriptors, direct_url) = match &reference {
            Reference::CatalogTrack(id) => {
                let resolver = self.resolver()?;
                (vec![resolver.resolve_track(id).await?], None)
            }
            Reference::CatalogAlbum(id) => {
                let resolver = self.resolver()?;
                let resolved = resolver.resolve_album(id).await?;
                if resolved.gaps > 0 {
                    warn!(
                        "{} album entr{} could not be resolved and were skipped",
                        resolved.gaps,
                        if resolved.gaps == 1 { "y" } else { "ies" }
                    );
                }
                (resolved.descriptors, None)
            }
            Reference::Direct(url) => {
                (vec![direct_descriptor(url)], Some(url.clone()))
            }
        };

        let total = descriptors.len();
        info!("Processing {} track(s)", total);

        let mut report = RunReport::default();
        let mut stems = StemRegistry::new();
        let mut any_fetch_done = false;

        for (index, descriptor) in descriptors.into_iter().enumerate() {
            info!(
                "Processing track {}/{}: {} - {}",
                index + 1,
                total,
                descriptor.artist_names(),
                descriptor.title
            );

            let (outcome, fetch_attempted) = self
                .process_item(&descriptor, &mut stems, direct_url.as_deref())
                .await;

            // A missing tool on the first fetch of the run would fail every
            // remaining item identically; abort as a batch-level error.
            if fetch_attempted && !any_fetch_done {
                if let AcquisitionOutcome::FetchFailed {
                    kind: FetchFailureKind::ToolMissing,
                    message,
                } = &outcome
                {
                    return Err(GrabError::ToolMissing(message.clone()));
                }
            }
            any_fetch_done |= fetch_attempted;

            report.push(descriptor, outcome);
        }

        info!(
            "Batch complete: {} succeeded, {} failed of {}",
            report.succeeded,
            report.failed,
            report.len()
        );
        Ok(report)
    }

    fn resolver(&self) -> Result<MetadataResolver> {
        let catalog = self.catalog.as_ref().cloned().ok_or(GrabError::NotConfigured)?;
        Ok(MetadataResolver::new(catalog))
    }

    /// Runs one descriptor through directory setup, locate and fetch.
    /// Returns the outcome and whether a fetch was actually attempted.
    async fn process_item(
        &self,
        descriptor: &TrackDescriptor,
        stems: &mut StemRegistry,
        direct_url: Option<&str>,
    ) -> (AcquisitionOutcome, bool) {
        let dir = match direct_url {
            Some(_) => organize::music_dir(&self.config.output_root),
            None => organize::track_dir(
                &self.config.output_root,
                descriptor.primary_artist(),
                &descriptor.album,
            ),
        };
        let dir = match dir {
            Ok(dir) => dir,
            Err(e) => {
                return (
                    AcquisitionOutcome::FetchFailed {
                        kind: FetchFailureKind::Filesystem,
                        message: format!("could not create target directory: {e}"),
                    },
                    false,
                )
            }
        };
        let stem = stems.claim(&dir, descriptor);

        let media_url = match direct_url {
            Some(url) => url.to_string(),
            None => match self.locator.locate(&descriptor.search_query()).await {
                LocateOutcome::Found(url) => url,
                LocateOutcome::Miss(detail) => {
                    return (AcquisitionOutcome::LocatorMiss { detail }, false)
                }
            },
        };

        let mut outcome = self.fetcher.fetch(&media_url, &dir, &stem).await;
        if self.config.retry_tool_errors {
            if let AcquisitionOutcome::FetchFailed {
                kind: FetchFailureKind::ToolError,
                ..
            } = &outcome
            {
                info!("Retrying fetch once for '{}'", descriptor.title);
                outcome = self.fetcher.fetch(&media_url, &dir, &stem).await;
            }
        }
        (outcome, true)
    }
}

/// Synthesizes a descriptor for a direct media URL, which carries no
/// catalog metadata. Files land directly under `Music/`.
fn direct_descriptor(url: &str) -> TrackDescriptor {
    TrackDescriptor {
        title: sanitize(&reference::direct_stem(url)),
        artists: vec![UNKNOWN_ARTIST.to_string()],
        album: UNKNOWN_ALBUM.to_string(),
        track_number: None,
        source_id: url.to_string(),
    }
}
