/// Song domain type
use crate::types::SongId;
use serde::{Deserialize, Serialize};

/// A playable track from the remote catalog
///
/// Immutable once loaded. Field names match the remote documents
/// (`id`, `title`, `artist`, `url`, `artwork`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    /// Stable unique identifier
    pub id: SongId,

    /// Song title
    pub title: String,

    /// Artist name
    pub artist: String,

    /// Playable resource locator (URL or URI)
    pub url: String,

    /// Artwork locator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artwork: Option<String>,
}

impl Song {
    /// Create a song without artwork
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        artist: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            id: SongId::new(id),
            title: title.into(),
            artist: artist.into(),
            url: url.into(),
            artwork: None,
        }
    }

    /// Attach an artwork locator
    pub fn with_artwork(mut self, artwork: impl Into<String>) -> Self {
        self.artwork = Some(artwork.into());
        self
    }

    /// Case-insensitive match against title or artist
    ///
    /// An empty query matches every song.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.title.to_lowercase().contains(&query) || self.artist.to_lowercase().contains(&query)
    }
}
