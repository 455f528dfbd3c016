//! Core types for playback management

use beat_core::Song;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Transport state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportState {
    /// No song loaded
    Idle,

    /// Device is preparing a resource
    Loading,

    /// Currently playing
    Playing,

    /// Paused mid-track
    Paused,

    /// Track reached its natural end
    Ended,
}

/// Observable projection of the playback state
///
/// Cloned out of the state machine on every transition; observers never see
/// the mutable original.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSnapshot {
    /// Transport state
    pub status: TransportState,

    /// Song loaded or loading (absent when idle)
    pub current_song: Option<Song>,

    /// True only in `Playing`
    pub is_playing: bool,

    /// True while the device prepares a resource
    pub is_loading: bool,

    /// Current position in milliseconds
    pub position_ms: u64,

    /// Track duration in milliseconds (0 = unknown)
    pub duration_ms: u64,

    /// Shuffle enabled
    pub shuffle: bool,

    /// Repeat-one enabled
    pub repeat_one: bool,

    /// User is dragging the position slider
    pub scrubbing: bool,

    /// Volume level (0-100)
    pub volume: u8,

    /// Mute state
    pub muted: bool,

    /// Last playback error, cleared by the next successful load
    pub error: Option<String>,
}

/// Configuration for playback
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Position sampling interval in milliseconds (default: 1000)
    pub sync_interval_ms: u64,

    /// Initial volume (0-100, default: 80)
    pub volume: u8,

    /// Initial shuffle state (default: off)
    pub shuffle: bool,

    /// Initial repeat-one state (default: off)
    pub repeat_one: bool,

    /// Buffered events per observer before it starts lagging (default: 64)
    pub event_capacity: usize,

    /// Pending commands before senders wait (default: 32)
    pub command_capacity: usize,
}

impl PlaybackConfig {
    /// Position sampling interval
    pub fn sync_interval(&self) -> Duration {
        Duration::from_millis(self.sync_interval_ms.max(1))
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            sync_interval_ms: 1000,
            volume: 80,
            shuffle: false,
            repeat_one: false,
            event_capacity: 64,
            command_capacity: 32,
        }
    }
}
