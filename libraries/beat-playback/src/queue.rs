//! Play order over the catalog
//!
//! The queue never owns a separate track list: it keeps the catalog plus a
//! permutation of catalog indices, and answers next/previous relative to the
//! active song's position in that permutation.
//!
//! ```text
//! catalog: [A, B, C, D]
//! order:   [2, 1, 3, 0]      (shuffled, B pinned at position 1)
//! next(B) -> D, previous(B) -> C, next(A) -> C (wraps)
//! ```

use crate::shuffle::{shuffled_order, Pinned};
use beat_core::{Song, SongId};
use std::collections::HashMap;

/// Ordering over the catalog
#[derive(Debug, Clone, Default)]
pub struct Queue {
    /// Catalog in source order
    catalog: Vec<Song>,

    /// Play order as catalog indices
    order: Vec<usize>,

    /// Whether `order` is a shuffle
    shuffled: bool,
}

impl Queue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a queue in natural order over `songs`
    pub fn with_catalog(songs: Vec<Song>) -> Self {
        let order = (0..songs.len()).collect();
        Self {
            catalog: songs,
            order,
            shuffled: false,
        }
    }

    /// Replace the catalog after a refresh
    ///
    /// Keeps the shuffle flag. When the refresh holds the same songs, a
    /// shuffled order is carried over unchanged; otherwise a shuffled queue
    /// gets a fresh permutation with `current` (if still present) held at its
    /// old order position.
    pub fn replace_catalog(&mut self, songs: Vec<Song>, current: Option<&SongId>) {
        if self.shuffled {
            if let Some(order) = self.carry_order(&songs) {
                self.catalog = songs;
                self.order = order;
                return;
            }
        }

        let old_position = current.and_then(|id| self.position_of(id));

        self.catalog = songs;

        if self.shuffled {
            let pinned = current
                .and_then(|id| self.catalog_index(id))
                .map(|index| Pinned {
                    index,
                    position: old_position.unwrap_or(0),
                });
            self.order = shuffled_order(self.catalog.len(), pinned);
        } else {
            self.order = (0..self.catalog.len()).collect();
        }
    }

    /// Switch between shuffled and natural order
    ///
    /// Turning shuffle on draws a fresh permutation with `current` held at
    /// its present position; turning it off restores catalog order.
    pub fn set_shuffle(&mut self, enabled: bool, current: Option<&SongId>) {
        if enabled {
            let pinned = current.and_then(|id| {
                Some(Pinned {
                    index: self.catalog_index(id)?,
                    position: self.position_of(id)?,
                })
            });
            self.order = shuffled_order(self.catalog.len(), pinned);
        } else {
            self.order = (0..self.catalog.len()).collect();
        }
        self.shuffled = enabled;
    }

    /// Check if the order is shuffled
    pub fn is_shuffled(&self) -> bool {
        self.shuffled
    }

    /// Song after `current` in play order
    ///
    /// Wraps from the last song to the first. When `current` is `None` or
    /// no longer in the catalog, returns the first song of the order.
    /// Returns `None` only for an empty catalog.
    pub fn next(&self, current: Option<&SongId>) -> Option<Song> {
        self.step(current, |pos, len| (pos + 1) % len)
    }

    /// Song before `current` in play order
    ///
    /// Wraps from the first song to the last; same fallback as [`Queue::next`].
    pub fn previous(&self, current: Option<&SongId>) -> Option<Song> {
        self.step(current, |pos, len| (pos + len - 1) % len)
    }

    fn step(&self, current: Option<&SongId>, advance: impl Fn(usize, usize) -> usize) -> Option<Song> {
        let len = self.order.len();
        if len == 0 {
            return None;
        }

        let target = match current.and_then(|id| self.position_of(id)) {
            Some(pos) => advance(pos, len),
            None => 0,
        };

        self.song_at(target)
    }

    /// First song in play order
    pub fn first(&self) -> Option<Song> {
        self.song_at(0)
    }

    /// Position of `id` in play order
    pub fn position_of(&self, id: &SongId) -> Option<usize> {
        let index = self.catalog_index(id)?;
        self.order.iter().position(|&i| i == index)
    }

    /// Check if `id` is in the catalog
    pub fn contains(&self, id: &SongId) -> bool {
        self.catalog_index(id).is_some()
    }

    /// Songs in play order
    pub fn ordered(&self) -> Vec<&Song> {
        self.order.iter().map(|&i| &self.catalog[i]).collect()
    }

    /// Play order as catalog indices
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Catalog in source order
    pub fn catalog(&self) -> &[Song] {
        &self.catalog
    }

    /// Number of songs
    pub fn len(&self) -> usize {
        self.catalog.len()
    }

    /// Check if the queue is empty
    pub fn is_empty(&self) -> bool {
        self.catalog.is_empty()
    }

    /// Current play order re-indexed into `songs`, if `songs` holds exactly
    /// the same song ids
    fn carry_order(&self, songs: &[Song]) -> Option<Vec<usize>> {
        if songs.len() != self.catalog.len() {
            return None;
        }

        let index: HashMap<&SongId, usize> = songs
            .iter()
            .enumerate()
            .map(|(i, song)| (&song.id, i))
            .collect();
        if index.len() != songs.len() {
            return None;
        }

        self.order
            .iter()
            .map(|&i| index.get(&self.catalog[i].id).copied())
            .collect()
    }

    fn catalog_index(&self, id: &SongId) -> Option<usize> {
        self.catalog.iter().position(|song| &song.id == id)
    }

    fn song_at(&self, position: usize) -> Option<Song> {
        self.order
            .get(position)
            .and_then(|&i| self.catalog.get(i))
            .cloned()
    }
}
