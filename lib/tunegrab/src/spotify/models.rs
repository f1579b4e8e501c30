use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct RawArtist {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawAlbumSummary {
    pub name: String,
}

/// Album record from `albums/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawAlbum {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<RawArtist>,
}

/// Track record as returned by the catalog. Entries from a paginated album
/// listing are "thin" (no album context, sometimes no id); `tracks/{id}`
/// responses are full.
#[derive(Debug, Clone, Deserialize)]
pub struct RawTrack {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<RawArtist>,
    #[serde(default)]
    pub album: Option<RawAlbumSummary>,
    #[serde(default)]
    pub track_number: Option<u32>,
}

/// Explicit completeness classification, resolved to `Full` before a
/// descriptor is ever constructed.
#[derive(Debug, Clone)]
pub enum TrackRecord {
    Full(RawTrack),
    Thin(RawTrack),
}

impl RawTrack {
    pub fn classify(self) -> TrackRecord {
        if self.album.is_some() {
            TrackRecord::Full(self)
        } else {
            TrackRecord::Thin(self)
        }
    }
}

/// One page of an album track listing. A populated `next` cursor means more
/// pages follow.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackPage {
    #[serde(default)]
    pub items: Vec<RawTrack>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub total: u32,
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_entry_without_album_is_thin() {
        let raw: RawTrack = serde_json::from_str(
            r#"{"id": "t1", "name": "Song", "artists": [{"name": "A"}], "track_number": 3}"#,
        )
        .unwrap();
        assert!(matches!(raw.classify(), TrackRecord::Thin(_)));
    }

    #[test]
    fn track_with_album_context_is_full() {
        let raw: RawTrack = serde_json::from_str(
            r#"{"id": "t1", "name": "Song", "artists": [], "album": {"name": "LP"}}"#,
        )
        .unwrap();
        assert!(matches!(raw.classify(), TrackRecord::Full(_)));
    }

    #[test]
    fn page_cursor_defaults_to_none() {
        let page: TrackPage = serde_json::from_str(r#"{"items": []}"#).unwrap();
        assert!(page.next.is_none());
        assert_eq!(page.total, 0);
    }
}
