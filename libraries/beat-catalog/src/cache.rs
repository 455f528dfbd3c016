//! Song catalog cache
//!
//! Holds the last successfully fetched catalog and publishes every replace to
//! subscribers. Refreshes are serialized so a slow fetch can never overwrite
//! the result of a newer one.

use crate::error::Result;
use crate::source::CatalogSource;
use beat_core::{Song, SongId, UserId};
use futures_util::StreamExt;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

/// Status message published after a successful fetch of an empty catalog
pub const NO_SONGS_MESSAGE: &str = "No songs available";

/// Observable refresh status
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogStatus {
    /// A refresh is in progress
    pub loading: bool,

    /// Message describing the last refresh problem, if any
    pub error: Option<String>,
}

/// In-memory song catalog
///
/// The catalog is only ever replaced as a whole. Readers get either a
/// point-in-time copy ([`CatalogCache::current`]) or a live receiver
/// ([`CatalogCache::subscribe`]).
pub struct CatalogCache {
    source: Arc<dyn CatalogSource>,
    songs: watch::Sender<Arc<Vec<Song>>>,
    status: watch::Sender<CatalogStatus>,
    refresh_lock: Mutex<()>,
}

impl CatalogCache {
    /// Create an empty cache backed by `source`
    pub fn new(source: Arc<dyn CatalogSource>) -> Self {
        let (songs, _) = watch::channel(Arc::new(Vec::new()));
        let (status, _) = watch::channel(CatalogStatus::default());

        Self {
            source,
            songs,
            status,
            refresh_lock: Mutex::new(()),
        }
    }

    /// Fetch the full catalog and replace the cache
    ///
    /// On failure the previous catalog is kept, the status error is set and
    /// the error is returned to the caller.
    pub async fn refresh(&self) -> Result<()> {
        let _guard = self.refresh_lock.lock().await;

        self.status.send_modify(|status| status.loading = true);
        debug!("Refreshing catalog");

        match self.source.fetch_all().await {
            Ok(songs) => {
                let songs = dedupe_by_id(songs);
                let count = songs.len();

                self.songs.send_replace(Arc::new(songs));
                self.status.send_modify(|status| {
                    status.loading = false;
                    status.error = (count == 0).then(|| NO_SONGS_MESSAGE.to_string());
                });

                info!(songs = count, "Catalog refreshed");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Catalog refresh failed, keeping previous catalog");
                self.status.send_modify(|status| {
                    status.loading = false;
                    status.error = Some(format!("Failed to load songs: {}", e));
                });
                Err(e)
            }
        }
    }

    /// Point-in-time copy of the catalog
    pub fn current(&self) -> Vec<Song> {
        self.songs.borrow().as_ref().clone()
    }

    /// Live view of the catalog
    ///
    /// The receiver observes every replace without another fetch.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<Song>>> {
        self.songs.subscribe()
    }

    /// Live view of the refresh status
    pub fn status(&self) -> watch::Receiver<CatalogStatus> {
        self.status.subscribe()
    }

    /// Look up a song by ID
    pub fn get(&self, id: &SongId) -> Option<Song> {
        self.songs.borrow().iter().find(|song| &song.id == id).cloned()
    }

    /// Songs whose title or artist contain `query` (case-insensitive)
    pub fn search(&self, query: &str) -> Vec<Song> {
        self.songs
            .borrow()
            .iter()
            .filter(|song| song.matches(query))
            .cloned()
            .collect()
    }

    /// Number of songs in the catalog
    pub fn len(&self) -> usize {
        self.songs.borrow().len()
    }

    /// Check if the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.songs.borrow().is_empty()
    }

    /// Follow the "new user" flag of `user_id`
    ///
    /// Starts as `true` and tracks the source stream until it ends. Must be
    /// called from within a tokio runtime.
    pub fn track_new_user(&self, user_id: &UserId) -> watch::Receiver<bool> {
        let (tx, rx) = watch::channel(true);
        let mut flags = self.source.subscribe_user_flag(user_id);
        let user_id = user_id.clone();

        tokio::spawn(async move {
            while let Some(is_new) = flags.next().await {
                debug!(user_id = %user_id, is_new, "New-user flag updated");
                if tx.send(is_new).is_err() {
                    break;
                }
            }
        });

        rx
    }
}

/// Keep the first occurrence of every song ID, preserving order
fn dedupe_by_id(songs: Vec<Song>) -> Vec<Song> {
    let mut seen = HashSet::with_capacity(songs.len());
    let total = songs.len();

    let unique: Vec<Song> = songs
        .into_iter()
        .filter(|song| seen.insert(song.id.clone()))
        .collect();

    if unique.len() != total {
        warn!(
            dropped = total - unique.len(),
            "Catalog contained duplicate song IDs"
        );
    }

    unique
}
