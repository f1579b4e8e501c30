//! Target directory and filename construction for acquired tracks.
//!
//! Layout is `<root>/Music/<artist>/<album>/<stem>.<ext>`; the same
//! (artist, album) pair always maps to the same directory across runs.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::models::TrackDescriptor;
use crate::sanitize::sanitize;

pub const MUSIC_DIR_NAME: &str = "Music";

/// Builds `root/Music/<artist'>/<album'>` and creates it if absent.
/// Creation is idempotent; any other filesystem error propagates.
pub fn track_dir(root: &Path, artist: &str, album: &str) -> Result<PathBuf> {
    let dir = root
        .join(MUSIC_DIR_NAME)
        .join(sanitize(artist))
        .join(sanitize(album));
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Builds the bare `root/Music` directory, used for direct-URL acquisitions
/// that carry no artist/album context.
pub fn music_dir(root: &Path) -> Result<PathBuf> {
    let dir = root.join(MUSIC_DIR_NAME);
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Filename stem for a descriptor: `NN - Title` with a zero-padded track
/// number, or the sanitized title alone when no number is known.
pub fn filename_stem(descriptor: &TrackDescriptor) -> String {
    match descriptor.track_number {
        Some(n) => format!("{:02} - {}", n, sanitize(&descriptor.title)),
        None => sanitize(&descriptor.title),
    }
}

/// Tracks filename stems claimed within a single batch so that two distinct
/// items never silently target the same output path. A second item whose
/// source title and track number are identical keeps the stem (acceptable
/// duplicate); anything else gets a ` (2)`, ` (3)`, ... suffix.
#[derive(Debug, Default)]
pub struct StemRegistry {
    claimed: HashMap<(PathBuf, String), (String, Option<u32>)>,
}

impl StemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim(&mut self, dir: &Path, descriptor: &TrackDescriptor) -> String {
        let base = filename_stem(descriptor);
        let identity = (descriptor.title.clone(), descriptor.track_number);

        let mut stem = base.clone();
        let mut suffix = 2;
        loop {
            let key = (dir.to_path_buf(), stem.clone());
            match self.claimed.get(&key) {
                None => {
                    self.claimed.insert(key, identity);
                    return stem;
                }
                Some(existing) if *existing == identity => return stem,
                Some(_) => {
                    stem = format!("{base} ({suffix})");
                    suffix += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn descriptor(title: &str, number: Option<u32>) -> TrackDescriptor {
        TrackDescriptor {
            title: title.into(),
            artists: vec!["Artist".into()],
            album: "Album".into(),
            track_number: number,
            source_id: "id".into(),
        }
    }

    #[test]
    fn track_dir_is_deterministic_and_exists() {
        let root = tempdir().unwrap();
        let first = track_dir(root.path(), "AC/DC", "Back: In Black").unwrap();
        let second = track_dir(root.path(), "AC/DC", "Back: In Black").unwrap();
        assert_eq!(first, second);
        assert!(first.is_dir());
        assert_eq!(
            first,
            root.path().join("Music").join("AC-DC").join("Back - In Black")
        );
    }

    #[test]
    fn track_dir_creation_is_idempotent() {
        let root = tempdir().unwrap();
        track_dir(root.path(), "A", "B").unwrap();
        // Second call hits the already-existing directory.
        track_dir(root.path(), "A", "B").unwrap();
    }

    #[test]
    fn stem_includes_zero_padded_number() {
        assert_eq!(filename_stem(&descriptor("Song A", Some(1))), "01 - Song A");
        assert_eq!(filename_stem(&descriptor("Song B", Some(12))), "12 - Song B");
    }

    #[test]
    fn stem_without_number_is_title_only() {
        assert_eq!(filename_stem(&descriptor("Intro", None)), "Intro");
    }

    #[test]
    fn registry_suffixes_distinct_collisions() {
        let mut registry = StemRegistry::new();
        let dir = Path::new("/music/a/b");

        // Two distinct titles that sanitize to the same stem.
        let first = registry.claim(dir, &descriptor("Track?", None));
        let second = registry.claim(dir, &descriptor("Track", None));
        assert_eq!(first, "Track");
        assert_eq!(second, "Track (2)");

        let third = registry.claim(dir, &descriptor("Track??", None));
        assert_eq!(third, "Track (3)");
    }

    #[test]
    fn registry_keeps_stem_for_identical_duplicates() {
        let mut registry = StemRegistry::new();
        let dir = Path::new("/music/a/b");
        let first = registry.claim(dir, &descriptor("Song", Some(3)));
        let second = registry.claim(dir, &descriptor("Song", Some(3)));
        assert_eq!(first, second);
    }

    #[test]
    fn registry_scopes_claims_per_directory() {
        let mut registry = StemRegistry::new();
        let a = registry.claim(Path::new("/x"), &descriptor("Song", None));
        let b = registry.claim(Path::new("/y"), &descriptor("Other?", None));
        let c = registry.claim(Path::new("/y"), &descriptor("Song", None));
        assert_eq!(a, "Song");
        assert_eq!(b, "Other");
        assert_eq!(c, "Song");
    }
}
