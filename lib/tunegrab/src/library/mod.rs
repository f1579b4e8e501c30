//! Local library index: a SQLite catalog of acquired files plus the
//! scanner that rebuilds it from the on-disk `Music/` tree.

pub mod db;
pub mod scanner;

pub use db::{Library, NewTrack, Playlist, TrackOrder, TrackRow};
pub use scanner::{scan, ScanReport};

/// Index file name, created next to the `Music/` tree.
pub const DB_FILE_NAME: &str = "music_library.db";
