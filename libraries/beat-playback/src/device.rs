//! Playback device abstraction
//!
//! The device is the external decode + render engine. It is a single-owner
//! resource: only the coordinator task talks to it.

use crate::error::{LoadError, Result};
use async_trait::async_trait;
use beat_core::Song;
use tokio::sync::broadcast;

/// Platform audio engine
///
/// Implementors wrap the real player (ExoPlayer, AVPlayer, a desktop
/// decoder). Transport calls are expected to return quickly; `load` resolves
/// once the resource is ready to play.
#[async_trait]
pub trait PlaybackDevice: Send + Sync {
    /// Prepare the resource at `locator`
    ///
    /// Resolves when the device is ready to play. The future may be dropped
    /// if a newer load supersedes it.
    async fn load(&self, locator: &str) -> std::result::Result<(), LoadError>;

    /// Start or resume output
    async fn play(&self) -> Result<()>;

    /// Pause output
    async fn pause(&self) -> Result<()>;

    /// Jump to `position_ms`
    async fn seek(&self, position_ms: u64) -> Result<()>;

    /// Set linear output gain (0.0 = silent, 1.0 = unity)
    async fn set_volume(&self, gain: f32) -> Result<()>;

    /// Reported playback position in milliseconds
    async fn position_ms(&self) -> u64;

    /// Reported duration in milliseconds (0 until known)
    async fn duration_ms(&self) -> u64;

    /// Device notifications
    fn subscribe(&self) -> broadcast::Receiver<DeviceEvent>;
}

/// Notifications pushed by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceEvent {
    /// Current resource played to its natural end
    TrackEnded,
}

/// Commands the state machine asks the coordinator to issue
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    /// Load `song`; the result is reported back tagged with `session`
    Load { session: u64, song: Song },

    /// Start or resume output
    Play,

    /// Pause output
    Pause,

    /// Seek to a clamped position
    Seek(u64),

    /// Apply linear gain
    SetVolume(f32),
}
