//! Normalizes raw catalog payloads into ordered track descriptors.
//!
//! Album listings are walked through every page the provider offers, and
//! thin listing entries (no album context) are completed with one extra
//! per-track fetch before a descriptor is built.

use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{GrabError, Result};
use crate::models::TrackDescriptor;
use crate::spotify::models::{RawTrack, TrackRecord};
use crate::traits::CatalogApi;

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";

/// An album resolved to descriptors, with the count of listing entries that
/// could not be completed (missing id or vanished record). Gaps are logged,
/// not fatal.
#[derive(Debug)]
pub struct ResolvedAlbum {
    pub descriptors: Vec<TrackDescriptor>,
    pub gaps: usize,
}

pub struct MetadataResolver {
    catalog: Arc<dyn CatalogApi>,
}

impl MetadataResolver {
    pub fn new(catalog: Arc<dyn CatalogApi>) -> Self {
        Self { catalog }
    }

    pub async fn resolve_track(&self, id: &str) -> Result<TrackDescriptor> {
        let raw = self
            .catalog
            .track(id)
            .await?
            .ok_or_else(|| GrabError::MetadataNotFound(id.to_string()))?;
        Ok(normalize(raw))
    }

    /// Resolves every track of an album, in catalog order, across all pages.
    pub async fn resolve_album(&self, id: &str) -> Result<ResolvedAlbum> {
        let album = self
            .catalog
            .album(id)
            .await?
            .ok_or_else(|| GrabError::MetadataNotFound(id.to_string()))?;
        info!("Resolving album '{}' ({})", album.name, album.id);

        let mut items: Vec<RawTrack> = Vec::new();
        let mut offset = 0u32;
        loop {
            let page = self.catalog.album_tracks(id, offset).await?;
            let fetched = page.items.len() as u32;
            items.extend(page.items);
            // A naive single-page fetch silently truncates large albums;
            // keep going while the provider advertises a next page.
            if page.next.is_some() && fetched > 0 {
                offset += fetched;
            } else {
                break;
            }
        }
        info!("Album listing has {} entries", items.len());

        let mut descriptors = Vec::with_capacity(items.len());
        let mut gaps = 0usize;
        for raw in items {
            match raw.classify() {
                TrackRecord::Full(track) => descriptors.push(normalize(track)),
                TrackRecord::Thin(track) => {
                    let Some(track_id) = track.id.as_deref().filter(|s| !s.is_empty()) else {
                        warn!("Album entry '{}' has no catalog id, skipping", track.name);
                        gaps += 1;
                        continue;
                    };
                    match self.catalog.track(track_id).await? {
                        Some(full) => descriptors.push(normalize(full)),
                        None => {
                            warn!("No full record for album entry '{}', skipping", track.name);
                            gaps += 1;
                        }
                    }
                }
            }
        }

        Ok(ResolvedAlbum { descriptors, gaps })
    }
}

/// Applies the normalization rules: missing artist list becomes a single
/// synthetic "Unknown Artist", missing album name becomes "Unknown Album",
/// and a zero track number is treated as absent.
fn normalize(raw: RawTrack) -> TrackDescriptor {
    let artists: Vec<String> = raw
        .artists
        .into_iter()
        .map(|a| a.name)
        .filter(|name| !name.is_empty())
        .collect();
    let artists = if artists.is_empty() {
        vec![UNKNOWN_ARTIST.to_string()]
    } else {
        artists
    };

    let album = raw
        .album
        .map(|a| a.name)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| UNKNOWN_ALBUM.to_string());

    TrackDescriptor {
        title: raw.name,
        artists,
        album,
        track_number: raw.track_number.filter(|n| *n > 0),
        source_id: raw.id.unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spotify::models::{RawAlbum, RawAlbumSummary, RawArtist, TrackPage};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn thin(id: Option<&str>, name: &str, number: Option<u32>) -> RawTrack {
        RawTrack {
            id: id.map(String::from),
            name: name.into(),
            artists: vec![RawArtist { name: "A".into() }],
            album: None,
            track_number: number,
        }
    }

    fn full(id: &str, name: &str, number: Option<u32>) -> RawTrack {
        RawTrack {
            id: Some(id.into()),
            name: name.into(),
            artists: vec![RawArtist { name: "A".into() }],
            album: Some(RawAlbumSummary { name: "LP".into() }),
            track_number: number,
        }
    }

    struct FakeCatalog {
        album: Option<RawAlbum>,
        pages: Vec<TrackPage>,
        tracks: Vec<RawTrack>,
        track_calls: AtomicUsize,
    }

    impl FakeCatalog {
        fn track_lookup(&self, id: &str) -> Option<RawTrack> {
            self.tracks
                .iter()
                .find(|t| t.id.as_deref() == Some(id))
                .cloned()
        }
    }

    #[async_trait]
    impl CatalogApi for FakeCatalog {
        async fn track(&self, id: &str) -> Result<Option<RawTrack>> {
            self.track_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.track_lookup(id))
        }

        async fn album(&self, _id: &str) -> Result<Option<RawAlbum>> {
            Ok(self.album.clone())
        }

        async fn album_tracks(&self, _id: &str, offset: u32) -> Result<TrackPage> {
            let mut skipped = 0u32;
            for (i, page) in self.pages.iter().enumerate() {
                if skipped == offset {
                    let mut page = page.clone();
                    page.next = if i + 1 < self.pages.len() {
                        Some("next".into())
                    } else {
                        None
                    };
                    return Ok(page);
                }
                skipped += page.items.len() as u32;
            }
            Ok(TrackPage {
                items: vec![],
                next: None,
                total: 0,
            })
        }
    }

    fn fake_album() -> RawAlbum {
        RawAlbum {
            id: "alb".into(),
            name: "LP".into(),
            artists: vec![RawArtist { name: "A".into() }],
        }
    }

    fn page(items: Vec<RawTrack>) -> TrackPage {
        TrackPage {
            total: items.len() as u32,
            items,
            next: None,
        }
    }

    #[tokio::test]
    async fn album_resolution_walks_all_pages() {
        let catalog = Arc::new(FakeCatalog {
            album: Some(fake_album()),
            pages: vec![
                page(vec![
                    thin(Some("t1"), "One", Some(1)),
                    thin(Some("t2"), "Two", Some(2)),
                ]),
                page(vec![thin(Some("t3"), "Three", Some(3))]),
            ],
            tracks: vec![
                full("t1", "One", Some(1)),
                full("t2", "Two", Some(2)),
                full("t3", "Three", Some(3)),
            ],
            track_calls: AtomicUsize::new(0),
        });

        let resolver = MetadataResolver::new(catalog.clone());
        let resolved = resolver.resolve_album("alb").await.unwrap();

        assert_eq!(resolved.descriptors.len(), 3);
        assert_eq!(resolved.gaps, 0);
        // Catalog order preserved across the page boundary.
        let titles: Vec<&str> = resolved
            .descriptors
            .iter()
            .map(|d| d.title.as_str())
            .collect();
        assert_eq!(titles, vec!["One", "Two", "Three"]);
        // Thin entries each cost one completion fetch.
        assert_eq!(catalog.track_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn full_listing_entries_need_no_completion_fetch() {
        let catalog = Arc::new(FakeCatalog {
            album: Some(fake_album()),
            pages: vec![page(vec![full("t1", "One", Some(1))])],
            tracks: vec![],
            track_calls: AtomicUsize::new(0),
        });

        let resolver = MetadataResolver::new(catalog.clone());
        let resolved = resolver.resolve_album("alb").await.unwrap();
        assert_eq!(resolved.descriptors.len(), 1);
        assert_eq!(catalog.track_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn entries_without_ids_become_gaps() {
        let catalog = Arc::new(FakeCatalog {
            album: Some(fake_album()),
            pages: vec![page(vec![
                thin(None, "Ghost", None),
                thin(Some("t2"), "Two", Some(2)),
            ])],
            tracks: vec![full("t2", "Two", Some(2))],
            track_calls: AtomicUsize::new(0),
        });

        let resolver = MetadataResolver::new(catalog);
        let resolved = resolver.resolve_album("alb").await.unwrap();
        assert_eq!(resolved.descriptors.len(), 1);
        assert_eq!(resolved.gaps, 1);
        assert_eq!(resolved.descriptors[0].title, "Two");
    }

    #[tokio::test]
    async fn missing_album_is_metadata_not_found() {
        let catalog = Arc::new(FakeCatalog {
            album: None,
            pages: vec![],
            tracks: vec![],
            track_calls: AtomicUsize::new(0),
        });
        let resolver = MetadataResolver::new(catalog);
        assert!(matches!(
            resolver.resolve_album("nope").await,
            Err(GrabError::MetadataNotFound(_))
        ));
    }

    #[tokio::test]
    async fn missing_track_is_metadata_not_found() {
        let catalog = Arc::new(FakeCatalog {
            album: None,
            pages: vec![],
            tracks: vec![],
            track_calls: AtomicUsize::new(0),
        });
        let resolver = MetadataResolver::new(catalog);
        assert!(matches!(
            resolver.resolve_track("nope").await,
            Err(GrabError::MetadataNotFound(_))
        ));
    }

    #[test]
    fn normalization_fills_unknowns() {
        let raw = RawTrack {
            id: Some("t".into()),
            name: "Song".into(),
            artists: vec![],
            album: None,
            track_number: Some(0),
        };
        let descriptor = normalize(raw);
        assert_eq!(descriptor.artists, vec![UNKNOWN_ARTIST.to_string()]);
        assert_eq!(descriptor.album, UNKNOWN_ALBUM);
        assert_eq!(descriptor.track_number, None);
    }
}
