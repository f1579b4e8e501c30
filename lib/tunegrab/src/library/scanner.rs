//! Walks the `Music/` tree and populates the index from audio tags,
//! falling back to path components when tags are missing.

use std::path::Path;

use lofty::file::{AudioFile, TaggedFileExt};
use lofty::prelude::Accessor;
use lofty::tag::Tag;
use serde::Serialize;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::error::Result;
use crate::library::db::{Library, NewTrack};
use crate::resolver::{UNKNOWN_ALBUM, UNKNOWN_ARTIST};

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub added: usize,
    pub existing: usize,
    pub errored: usize,
}

/// Scans `music_root` recursively for mp3 files and indexes each one.
/// Unreadable files are counted and skipped, never fatal.
pub fn scan(library: &Library, music_root: &Path) -> Result<ScanReport> {
    info!("Scanning music library at {:?}", music_root);
    let mut report = ScanReport::default();

    for entry in WalkDir::new(music_root).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let is_mp3 = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("mp3"))
            .unwrap_or(false);
        if !is_mp3 {
            continue;
        }

        let track = match read_track(path, music_root) {
            Some(track) => track,
            None => {
                report.errored += 1;
                continue;
            }
        };
        let (_, created) = library.add_track(&track)?;
        if created {
            report.added += 1;
        } else {
            report.existing += 1;
        }
    }

    info!(
        "Scan complete: {} added, {} already indexed, {} errored",
        report.added, report.existing, report.errored
    );
    Ok(report)
}

fn read_track(path: &Path, music_root: &Path) -> Option<NewTrack> {
    let filepath = path.to_str()?.to_string();

    // A file without parseable tags is still indexed via path fallbacks;
    // only a file that cannot be read at all is skipped.
    let (tag, duration_secs) = match lofty::read_from_path(path) {
        Ok(tagged) => {
            let duration = tagged.properties().duration().as_secs_f64();
            let tag: Option<Tag> = tagged.primary_tag().cloned();
            (tag, Some(duration))
        }
        Err(e) => {
            if matches!(e.kind(), lofty::error::ErrorKind::Io(_)) {
                warn!("Could not read {:?}: {}", path, e);
                return None;
            }
            warn!("No readable tags in {:?}: {}", path, e);
            (None, None)
        }
    };

    let title = tag
        .as_ref()
        .and_then(|t| t.title())
        .map(|v| v.into_owned())
        .filter(|s| !s.is_empty());
    let artist = tag
        .as_ref()
        .and_then(|t| t.artist())
        .map(|v| v.into_owned())
        .filter(|s| !s.is_empty());
    let album = tag
        .as_ref()
        .and_then(|t| t.album())
        .map(|v| v.into_owned())
        .filter(|s| !s.is_empty());
    let track_number = tag.as_ref().and_then(|t| t.track());

    // Layout is root/<artist>/<album>/<file>; a flat file under the root
    // gets the unknown placeholders instead.
    let relative: Vec<String> = path
        .strip_prefix(music_root)
        .ok()?
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    let nested = relative.len() > 2;

    let title = title.or_else(|| {
        path.file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
    });
    let artist = artist.or_else(|| {
        if nested {
            relative.first().cloned()
        } else {
            Some(UNKNOWN_ARTIST.to_string())
        }
    });
    let album = album.or_else(|| {
        if nested {
            relative.get(1).cloned()
        } else {
            Some(UNKNOWN_ALBUM.to_string())
        }
    });

    Some(NewTrack {
        filepath,
        title,
        artist,
        album,
        track_number,
        duration_secs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    // Untagged placeholder files exercise the path-component fallbacks;
    // real tag extraction is covered by lofty itself.

    #[test]
    fn scan_indexes_nested_files_with_path_fallbacks() {
        let root = tempdir().unwrap();
        let album_dir = root.path().join("The Artist").join("The Album");
        std::fs::create_dir_all(&album_dir).unwrap();
        std::fs::write(album_dir.join("01 - Song.mp3"), b"").unwrap();

        let lib = Library::open_in_memory().unwrap();
        let report = scan(&lib, root.path()).unwrap();
        assert_eq!(report.added, 1);
        assert_eq!(report.errored, 0);

        let rows = lib.list_tracks(crate::library::TrackOrder::Default).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title.as_deref(), Some("01 - Song"));
        assert_eq!(rows[0].artist.as_deref(), Some("The Artist"));
        assert_eq!(rows[0].album.as_deref(), Some("The Album"));
    }

    #[test]
    fn flat_files_get_unknown_placeholders() {
        let root = tempdir().unwrap();
        std::fs::write(root.path().join("loose.mp3"), b"").unwrap();

        let lib = Library::open_in_memory().unwrap();
        let report = scan(&lib, root.path()).unwrap();
        assert_eq!(report.added, 1);

        let rows = lib.list_tracks(crate::library::TrackOrder::Default).unwrap();
        assert_eq!(rows[0].title.as_deref(), Some("loose"));
        assert_eq!(rows[0].artist.as_deref(), Some(UNKNOWN_ARTIST));
        assert_eq!(rows[0].album.as_deref(), Some(UNKNOWN_ALBUM));
    }

    #[test]
    fn rescan_counts_existing_instead_of_duplicating() {
        let root = tempdir().unwrap();
        std::fs::write(root.path().join("one.mp3"), b"").unwrap();

        let lib = Library::open_in_memory().unwrap();
        let first = scan(&lib, root.path()).unwrap();
        assert_eq!((first.added, first.existing), (1, 0));

        let second = scan(&lib, root.path()).unwrap();
        assert_eq!((second.added, second.existing), (0, 1));
        assert_eq!(lib.track_count().unwrap(), 1);
    }

    #[test]
    fn non_mp3_files_are_ignored() {
        let root = tempdir().unwrap();
        std::fs::write(root.path().join("cover.jpg"), b"").unwrap();
        std::fs::write(root.path().join("notes.txt"), b"").unwrap();

        let lib = Library::open_in_memory().unwrap();
        let report = scan(&lib, root.path()).unwrap();
        assert_eq!(report, ScanReport::default());
    }
}
