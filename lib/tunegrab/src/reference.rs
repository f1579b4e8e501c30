//! User-supplied reference parsing.
//!
//! A reference is either a catalog (Spotify) track/album URL or URI, or a
//! direct locator-provider (YouTube) URL handed straight to the fetch step.

use regex::Regex;
use std::sync::OnceLock;

use crate::error::{GrabError, Result};
use crate::sanitize::sanitize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    CatalogTrack(String),
    CatalogAlbum(String),
    /// Already a fetchable media URL; no catalog or locator step needed.
    Direct(String),
}

impl Reference {
    pub fn is_catalog_backed(&self) -> bool {
        matches!(
            self,
            Reference::CatalogTrack(_) | Reference::CatalogAlbum(_)
        )
    }
}

fn catalog_url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"open\.spotify\.com/(?:intl-[a-z]+(?:-[A-Za-z]+)?/)?(track|album)/([A-Za-z0-9]+)")
            .expect("invalid catalog URL pattern")
    })
}

fn catalog_uri_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^spotify:(track|album):([A-Za-z0-9]+)$").expect("invalid catalog URI pattern")
    })
}

pub fn parse(input: &str) -> Result<Reference> {
    let input = input.trim();

    if input.contains("youtube.com/") || input.contains("youtu.be/") {
        return Ok(Reference::Direct(input.to_string()));
    }

    for re in [catalog_url_re(), catalog_uri_re()] {
        if let Some(captures) = re.captures(input) {
            let id = captures[2].to_string();
            return Ok(match &captures[1] {
                "track" => Reference::CatalogTrack(id),
                _ => Reference::CatalogAlbum(id),
            });
        }
    }

    Err(GrabError::UnsupportedReference(input.to_string()))
}

/// Best-effort short name for a direct media URL, used as the filename stem
/// when no catalog metadata exists: the `v=` query value or the last path
/// segment, falling back to the sanitized URL itself.
pub fn direct_stem(url: &str) -> String {
    if let Some(idx) = url.find("v=") {
        let id: String = url[idx + 2..]
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .collect();
        if !id.is_empty() {
            return id;
        }
    }
    let tail = url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(url)
        .split('?')
        .next()
        .unwrap_or(url);
    if tail.is_empty() {
        sanitize(url)
    } else {
        sanitize(tail)
    }
}
