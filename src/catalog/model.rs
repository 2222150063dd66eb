//! Album/song catalog model
//!
//! The wire documents mirror the JSON the server publishes; the domain
//! types add the locally derived download state. A catalog is replaced
//! wholesale on every refresh and never mutated in place.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{Result, TuneSyncError};

/// Top-level catalog document as published on the server
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogDocument {
    pub albums: Vec<AlbumEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlbumEntry {
    pub name: String,
    pub songs: Vec<SongEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SongEntry {
    pub name: String,

    /// Server-relative path, also the local destination suffix
    pub path: String,
}

/// Decode the downloaded catalog document
pub fn decode_catalog(text: &str) -> Result<CatalogDocument> {
    serde_json::from_str(text)
        .map_err(|e| TuneSyncError::CatalogMalformed(format!("catalog document corrupted: {}", e)))
}

/// A song with its locally derived download state.
///
/// `downloaded` is a snapshot taken when the catalog was built, not a
/// live binding; recompute through the repository after a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Song {
    pub name: String,
    pub path: String,
    pub downloaded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Album {
    pub name: String,
    pub songs: Vec<Song>,
}

/// Immutable catalog snapshot, albums in server-declared order
#[derive(Debug, Clone)]
pub struct Catalog {
    pub albums: Vec<Album>,
    pub refreshed_at: DateTime<Utc>,
}

impl Catalog {
    /// Find a song by its server-relative path
    pub fn find_song(&self, path: &str) -> Option<&Song> {
        self.albums
            .iter()
            .flat_map(|album| album.songs.iter())
            .find(|song| song.path == path)
    }

    pub fn song_count(&self) -> usize {
        self.albums.iter().map(|album| album.songs.len()).sum()
    }
}
