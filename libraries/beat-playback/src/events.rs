//! Playback Events
//!
//! Discrete notifications for observers, alongside the snapshot stream.
//! Emitted at key points:
//! - State changes (loading/playing/paused/ended/idle)
//! - Track changes (on every new load)
//! - Shuffle/repeat/volume changes
//! - Position updates (from the synchronizer)
//! - Errors (load and device failures, empty queue)

use crate::types::TransportState;
use beat_core::SongId;
use serde::{Deserialize, Serialize};

/// Events emitted by the playback coordinator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlaybackEvent {
    /// Transport state changed
    StateChanged {
        /// The new state
        state: TransportState,
    },

    /// A new song started loading
    TrackChanged {
        /// ID of the new song
        song_id: SongId,
        /// ID of the song it replaced (if any)
        previous_song_id: Option<SongId>,
    },

    /// Song played to its natural end
    TrackFinished {
        /// ID of the finished song
        song_id: SongId,
    },

    /// Position sample accepted (every sync interval while playing)
    PositionUpdate {
        /// Current position
        position_ms: u64,
        /// Track duration
        duration_ms: u64,
    },

    /// Shuffle toggled
    ShuffleChanged {
        /// New shuffle state
        enabled: bool,
    },

    /// Repeat-one toggled
    RepeatChanged {
        /// New repeat-one state
        repeat_one: bool,
    },

    /// Volume changed
    VolumeChanged {
        /// New volume level (0-100)
        level: u8,
        /// Whether audio is muted
        is_muted: bool,
    },

    /// Catalog replaced under the queue
    QueueChanged {
        /// New catalog length
        length: usize,
    },

    /// Error occurred during playback
    Error {
        /// Error message
        message: String,
    },
}

impl PlaybackEvent {
    /// Check if this is an error event
    pub fn is_error(&self) -> bool {
        matches!(self, PlaybackEvent::Error { .. })
    }
}
