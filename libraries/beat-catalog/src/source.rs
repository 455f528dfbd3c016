//! Remote catalog source abstraction.

use crate::error::Result;
use async_trait::async_trait;
use beat_core::{Song, UserId};
use futures_util::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Document store holding the song catalog and user profile flags.
///
/// Implementations wrap the remote document database. The cache only needs
/// a full fetch; there is no partial patch protocol.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch every song, in the order the store returns them.
    async fn fetch_all(&self) -> Result<Vec<Song>>;

    /// Subscribe to the "new user" flag of a profile.
    ///
    /// The stream yields the current value and then any later changes.
    fn subscribe_user_flag(&self, user_id: &UserId) -> BoxStream<'static, bool>;
}

/// On-disk layout read by [`JsonFileSource`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogDocument {
    /// Songs collection
    #[serde(default)]
    pub songs: Vec<Song>,

    /// User profiles keyed by user ID
    #[serde(default)]
    pub users: HashMap<String, UserDocument>,
}

/// A user profile document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserDocument {
    /// Whether onboarding is still pending
    #[serde(rename = "isNewUser", default, skip_serializing_if = "Option::is_none")]
    pub is_new_user: Option<bool>,
}

/// Catalog source backed by a JSON document on disk.
///
/// Every fetch re-reads the file, so edits show up on the next refresh.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    /// Create a source reading from `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing document
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_document(path: &Path) -> Result<CatalogDocument> {
        let bytes = tokio::fs::read(path).await?;
        let document = serde_json::from_slice(&bytes)?;
        Ok(document)
    }
}

#[async_trait]
impl CatalogSource for JsonFileSource {
    async fn fetch_all(&self) -> Result<Vec<Song>> {
        debug!(path = %self.path.display(), "Reading catalog document");
        let document = Self::read_document(&self.path).await?;
        debug!(songs = document.songs.len(), "Read catalog document");
        Ok(document.songs)
    }

    fn subscribe_user_flag(&self, user_id: &UserId) -> BoxStream<'static, bool> {
        let path = self.path.clone();
        let user_id = user_id.clone();

        // Missing profile, missing flag and unreadable store all count as new.
        stream::once(async move {
            match Self::read_document(&path).await {
                Ok(document) => document
                    .users
                    .get(user_id.as_str())
                    .and_then(|user| user.is_new_user)
                    .unwrap_or(true),
                Err(e) => {
                    warn!(user_id = %user_id, error = %e, "User flag lookup failed");
                    true
                }
            }
        })
        .boxed()
    }
}
