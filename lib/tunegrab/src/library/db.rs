use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use crate::error::Result;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS tracks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    filepath TEXT UNIQUE NOT NULL,
    title TEXT,
    artist TEXT,
    album TEXT,
    track_number INTEGER,
    duration REAL,
    date_added TEXT DEFAULT (STRFTIME('%Y-%m-%d %H:%M:%S', 'now'))
);

CREATE TABLE IF NOT EXISTS playlists (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT UNIQUE NOT NULL
);

CREATE TABLE IF NOT EXISTS playlist_tracks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    playlist_id INTEGER NOT NULL,
    track_id INTEGER NOT NULL,
    sequence INTEGER NOT NULL,
    FOREIGN KEY (playlist_id) REFERENCES playlists (id) ON DELETE CASCADE,
    FOREIGN KEY (track_id) REFERENCES tracks (id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_playlist_tracks_playlist_id ON playlist_tracks (playlist_id);
CREATE INDEX IF NOT EXISTS idx_playlist_tracks_track_id ON playlist_tracks (track_id);
CREATE INDEX IF NOT EXISTS idx_tracks_artist ON tracks (artist);
CREATE INDEX IF NOT EXISTS idx_tracks_album ON tracks (album);
CREATE INDEX IF NOT EXISTS idx_tracks_title ON tracks (title);
"#;

/// Sort orders for track listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackOrder {
    /// Artist, album, track number, title.
    Default,
    Title,
    NewestFirst,
    OldestFirst,
}

impl TrackOrder {
    fn clause(self) -> &'static str {
        match self {
            TrackOrder::Default => {
                "ORDER BY artist COLLATE NOCASE ASC, album COLLATE NOCASE ASC, \
                 track_number ASC, title COLLATE NOCASE ASC"
            }
            TrackOrder::Title => "ORDER BY title COLLATE NOCASE ASC",
            TrackOrder::NewestFirst => "ORDER BY date_added DESC",
            TrackOrder::OldestFirst => "ORDER BY date_added ASC",
        }
    }
}

/// A track as inserted into the index.
#[derive(Debug, Clone, Default)]
pub struct NewTrack {
    pub filepath: String,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub track_number: Option<u32>,
    pub duration_secs: Option<f64>,
}

/// A track as stored in the index.
#[derive(Debug, Clone)]
pub struct TrackRow {
    pub id: i64,
    pub filepath: String,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub track_number: Option<u32>,
    pub duration_secs: Option<f64>,
    pub date_added: String,
}

impl TrackRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            filepath: row.get("filepath")?,
            title: row.get("title")?,
            artist: row.get("artist")?,
            album: row.get("album")?,
            track_number: row.get("track_number")?,
            duration_secs: row.get("duration")?,
            date_added: row.get("date_added")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Playlist {
    pub id: i64,
    pub name: String,
}

/// Handle over the index database. All statements go through here; callers
/// never see the connection.
pub struct Library {
    conn: Connection,
}

impl Library {
    /// Opens (creating if needed) the index at `path` and ensures the schema.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Inserts a track, deduplicating on filepath. Returns the row id and
    /// whether the row was newly created.
    pub fn add_track(&self, track: &NewTrack) -> Result<(i64, bool)> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO tracks \
             (filepath, title, artist, album, track_number, duration) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                track.filepath,
                track.title,
                track.artist,
                track.album,
                track.track_number,
                track.duration_secs,
            ],
        )?;
        if inserted == 1 {
            Ok((self.conn.last_insert_rowid(), true))
        } else {
            debug!("Track already indexed: {}", track.filepath);
            let id = self.conn.query_row(
                "SELECT id FROM tracks WHERE filepath = ?1",
                params![track.filepath],
                |row| row.get(0),
            )?;
            Ok((id, false))
        }
    }

    pub fn track_by_id(&self, id: i64) -> Result<Option<TrackRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT * FROM tracks WHERE id = ?1",
                params![id],
                TrackRow::from_row,
            )
            .optional()?;
        Ok(row)
    }

    pub fn list_tracks(&self, order: TrackOrder) -> Result<Vec<TrackRow>> {
        let sql = format!("SELECT * FROM tracks {}", order.clause());
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], TrackRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn distinct_artists(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT artist FROM tracks WHERE artist IS NOT NULL \
             ORDER BY artist COLLATE NOCASE ASC",
        )?;
        let rows = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn distinct_albums(&self, artist: Option<&str>) -> Result<Vec<String>> {
        let rows = match artist {
            Some(artist) => {
                let mut stmt = self.conn.prepare(
                    "SELECT DISTINCT album FROM tracks \
                     WHERE artist = ?1 AND album IS NOT NULL \
                     ORDER BY album COLLATE NOCASE ASC",
                )?;
                let rows = stmt
                    .query_map(params![artist], |row| row.get(0))?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            }
            None => {
                let mut stmt = self.conn.prepare(
                    "SELECT DISTINCT album FROM tracks WHERE album IS NOT NULL \
                     ORDER BY album COLLATE NOCASE ASC",
                )?;
                let rows = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            }
        };
        Ok(rows)
    }

    pub fn tracks_for_album(&self, artist: &str, album: &str) -> Result<Vec<TrackRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT * FROM tracks WHERE artist = ?1 AND album = ?2 \
             ORDER BY track_number ASC, title COLLATE NOCASE ASC",
        )?;
        let rows = stmt
            .query_map(params![artist, album], TrackRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn track_count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM tracks", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Creates a playlist, or returns the existing one with that name.
    /// The bool reports whether it was newly created.
    pub fn create_playlist(&self, name: &str) -> Result<(i64, bool)> {
        let inserted = self
            .conn
            .execute("INSERT OR IGNORE INTO playlists (name) VALUES (?1)", params![name])?;
        if inserted == 1 {
            Ok((self.conn.last_insert_rowid(), true))
        } else {
            let id = self.conn.query_row(
                "SELECT id FROM playlists WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )?;
            Ok((id, false))
        }
    }

    pub fn playlists(&self) -> Result<Vec<Playlist>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM playlists ORDER BY name COLLATE NOCASE ASC")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Playlist {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn playlist_by_name(&self, name: &str) -> Result<Option<Playlist>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, name FROM playlists WHERE name = ?1",
                params![name],
                |row| {
                    Ok(Playlist {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// Appends a track at the end of a playlist, returning the new entry id.
    pub fn append_to_playlist(&self, playlist_id: i64, track_id: i64) -> Result<i64> {
        let next_sequence: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(sequence) + 1, 0) FROM playlist_tracks WHERE playlist_id = ?1",
            params![playlist_id],
            |row| row.get(0),
        )?;
        self.conn.execute(
            "INSERT INTO playlist_tracks (playlist_id, track_id, sequence) VALUES (?1, ?2, ?3)",
            params![playlist_id, track_id, next_sequence],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Tracks of a playlist in sequence order.
    pub fn playlist_tracks(&self, playlist_id: i64) -> Result<Vec<TrackRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT t.* FROM tracks t \
             JOIN playlist_tracks pt ON t.id = pt.track_id \
             WHERE pt.playlist_id = ?1 \
             ORDER BY pt.sequence ASC",
        )?;
        let rows = stmt
            .query_map(params![playlist_id], TrackRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Removes one playlist entry by its own id. Remaining sequence numbers
    /// keep their values, which preserves order.
    pub fn remove_playlist_entry(&self, entry_id: i64) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM playlist_tracks WHERE id = ?1", params![entry_id])?;
        Ok(removed > 0)
    }

    /// Deletes a playlist; its entries go with it via the cascade.
    pub fn delete_playlist(&self, playlist_id: i64) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM playlists WHERE id = ?1", params![playlist_id])?;
        Ok(removed > 0)
    }
}
