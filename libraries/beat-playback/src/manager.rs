//! Playback manager - the transport state machine
//!
//! Owns the single mutable playback state. Every operation is synchronous:
//! it updates state, queues the device commands the transition needs and
//! queues events for observers. The coordinator drains both after each
//! message, so the manager never touches the device or a runtime.
//!
//! ```text
//!   Idle ──play_song──▶ Loading ──ready──▶ Playing ◀──toggle──▶ Paused
//!    ▲                    │ fail              │
//!    └────────────────────┘                 ended
//!    ▲                                        ▼
//!    └──── queue empty ◀── skip_to_next ◀── Ended ──repeat-one──▶ Loading
//! ```

use crate::{
    device::DeviceCommand,
    error::{LoadError, PlaybackError, Result},
    events::PlaybackEvent,
    queue::Queue,
    types::{PlaybackConfig, PlaybackSnapshot, TransportState},
    volume::Volume,
};
use beat_core::{Song, SongId};
use tracing::{debug, info, warn};

/// Central playback state machine
///
/// Orchestrates:
/// - Transport state (idle/loading/playing/paused/ended)
/// - Play order (natural or shuffled) via [`Queue`]
/// - Repeat-one override on natural track end
/// - Seek clamping and scrub handling
/// - Volume and mute
/// - Load sessions and sampling generations for discarding stale callbacks
pub struct PlaybackManager {
    // State
    state: TransportState,
    current_song: Option<Song>,
    position_ms: u64,
    duration_ms: u64,
    scrubbing: bool,
    last_error: Option<String>,

    // Queue
    queue: Queue,

    // Settings
    volume: Volume,
    shuffle: bool,
    repeat_one: bool,

    // Bumped on every play_song; load results carry it back
    load_session: u64,

    // Bumped whenever sampling must restart; samples carry it back
    sample_generation: u64,

    // Output for the coordinator
    pending_commands: Vec<DeviceCommand>,
    pending_events: Vec<PlaybackEvent>,
}

impl PlaybackManager {
    /// Create new playback manager
    ///
    /// The initial volume is queued as a device command so the first flush
    /// brings the device in line with the configuration.
    pub fn new(config: PlaybackConfig) -> Self {
        let mut queue = Queue::new();
        queue.set_shuffle(config.shuffle, None);
        let volume = Volume::new(config.volume);

        Self {
            state: TransportState::Idle,
            current_song: None,
            position_ms: 0,
            duration_ms: 0,
            scrubbing: false,
            last_error: None,
            queue,
            shuffle: config.shuffle,
            repeat_one: config.repeat_one,
            pending_commands: vec![DeviceCommand::SetVolume(volume.gain())],
            volume,
            load_session: 0,
            sample_generation: 0,
            pending_events: Vec::new(),
        }
    }

    // ===== Transport =====

    /// Load and play `song`
    ///
    /// Valid from any state. Opens a new load session, so a pending load for
    /// an earlier song is superseded and its result will be discarded.
    pub fn play_song(&mut self, song: Song) {
        let previous_song_id = self.current_song.as_ref().map(|s| s.id.clone());

        self.load_session += 1;
        self.position_ms = 0;
        self.duration_ms = 0;
        self.scrubbing = false;
        self.current_song = Some(song.clone());

        debug!(song_id = %song.id, session = self.load_session, "Loading song");

        self.transition(TransportState::Loading);
        self.emit(PlaybackEvent::TrackChanged {
            song_id: song.id.clone(),
            previous_song_id,
        });
        self.pending_commands.push(DeviceCommand::Load {
            session: self.load_session,
            song,
        });
    }

    /// Device finished preparing the resource for `session`
    ///
    /// Returns `false` if the result belongs to a superseded load.
    pub fn on_load_ready(&mut self, session: u64, duration_ms: u64) -> bool {
        if session != self.load_session || self.state != TransportState::Loading {
            debug!(session, current = self.load_session, "Discarding stale load result");
            return false;
        }

        self.duration_ms = duration_ms;
        self.last_error = None;
        self.transition(TransportState::Playing);
        self.pending_commands.push(DeviceCommand::Play);
        true
    }

    /// Device failed to prepare the resource for `session`
    ///
    /// Moves to `Idle`; there is no automatic retry. Returns `false` if the
    /// failure belongs to a superseded load.
    pub fn on_load_failed(&mut self, session: u64, error: &LoadError) -> bool {
        if session != self.load_session || self.state != TransportState::Loading {
            debug!(session, current = self.load_session, "Discarding stale load failure");
            return false;
        }

        warn!(error = %error, "Load failed");
        self.clear_current();
        self.transition(TransportState::Idle);
        self.record_error(error.to_string());
        true
    }

    /// Flip between playing and paused
    ///
    /// - `Idle`: loads the first song of the play order (no-op when empty)
    /// - `Ended`: replays the current song
    /// - `Loading`: no-op
    pub fn toggle_play_pause(&mut self) {
        match self.state {
            TransportState::Playing => self.pause(),
            TransportState::Paused => self.resume(),
            TransportState::Idle => match self.queue.first() {
                Some(song) => self.play_song(song),
                None => debug!("Nothing to play"),
            },
            TransportState::Ended => {
                if let Some(song) = self.current_song.clone() {
                    self.play_song(song);
                }
            }
            TransportState::Loading => debug!("Ignoring play/pause while loading"),
        }
    }

    /// Pause if playing
    pub fn pause(&mut self) {
        if self.state == TransportState::Playing {
            self.transition(TransportState::Paused);
            self.pending_commands.push(DeviceCommand::Pause);
        }
    }

    /// Resume if paused
    pub fn resume(&mut self) {
        if self.state == TransportState::Paused {
            self.transition(TransportState::Playing);
            self.pending_commands.push(DeviceCommand::Play);
        }
    }

    /// Seek within the current song
    ///
    /// Valid in `Playing` and `Paused`. The target is clamped to
    /// `[0, duration]` (lower bound only while duration is unknown). Returns
    /// the clamped position.
    pub fn seek_to(&mut self, position_ms: i64) -> Result<u64> {
        if !matches!(self.state, TransportState::Playing | TransportState::Paused) {
            return Err(PlaybackError::InvalidOperation(format!(
                "cannot seek while {:?}",
                self.state
            )));
        }

        let clamped = clamp_position(position_ms, self.duration_ms);
        self.position_ms = clamped;

        // A sample taken before the seek must not overwrite the new position
        self.sample_generation += 1;
        self.pending_commands.push(DeviceCommand::Seek(clamped));

        debug!(requested = position_ms, clamped, "Seek");
        Ok(clamped)
    }

    /// Skip to the next song in play order
    ///
    /// On an empty catalog moves to `Idle` and returns `QueueEmpty`.
    pub fn skip_to_next(&mut self) -> Result<()> {
        let current = self.current_id();
        let next = self.queue.next(current.as_ref());
        self.play_or_stop(next)
    }

    /// Skip to the previous song in play order
    ///
    /// On an empty catalog moves to `Idle` and returns `QueueEmpty`.
    pub fn skip_to_previous(&mut self) -> Result<()> {
        let current = self.current_id();
        let previous = self.queue.previous(current.as_ref());
        self.play_or_stop(previous)
    }

    fn play_or_stop(&mut self, song: Option<Song>) -> Result<()> {
        match song {
            Some(song) => {
                self.play_song(song);
                Ok(())
            }
            None => {
                self.stop();
                let error = PlaybackError::QueueEmpty;
                self.record_error(error.to_string());
                Err(error)
            }
        }
    }

    /// Device reported the natural end of the current song
    ///
    /// Repeat-one replays the same song; otherwise advances to the next one.
    /// Ignored outside `Playing` (a late event from a replaced song).
    pub fn on_track_ended(&mut self) {
        if self.state != TransportState::Playing {
            debug!(state = ?self.state, "Ignoring track end outside Playing");
            return;
        }

        let Some(song) = self.current_song.clone() else {
            return;
        };

        self.position_ms = self.duration_ms;
        self.transition(TransportState::Ended);
        self.emit(PlaybackEvent::TrackFinished {
            song_id: song.id.clone(),
        });

        if self.repeat_one {
            debug!(song_id = %song.id, "Repeat-one: replaying");
            self.play_song(song);
        } else if let Err(e) = self.skip_to_next() {
            info!(error = %e, "Playback finished");
        }
    }

    /// Stop playback and unload the current song
    pub fn stop(&mut self) {
        if self.state == TransportState::Playing {
            self.pending_commands.push(DeviceCommand::Pause);
        }

        // Invalidate any load still in flight
        self.load_session += 1;
        self.clear_current();
        self.transition(TransportState::Idle);
    }

    fn clear_current(&mut self) {
        self.current_song = None;
        self.position_ms = 0;
        self.duration_ms = 0;
        self.scrubbing = false;
    }

    // ===== Scrubbing & Position =====

    /// User started dragging the position slider
    ///
    /// Suspends position sampling until [`PlaybackManager::end_scrub`].
    pub fn begin_scrub(&mut self) {
        if !self.scrubbing {
            self.scrubbing = true;
            self.sample_generation += 1;
        }
    }

    /// User released the slider at `position_ms`
    ///
    /// Issues exactly one seek and re-enables sampling.
    pub fn end_scrub(&mut self, position_ms: i64) -> Result<u64> {
        if self.scrubbing {
            self.scrubbing = false;
            self.sample_generation += 1;
        }
        self.seek_to(position_ms)
    }

    /// Position sample from the synchronizer
    ///
    /// Returns `false` (and changes nothing) if the sample belongs to an
    /// older generation or sampling should be suspended.
    pub fn apply_position_sample(
        &mut self,
        generation: u64,
        position_ms: u64,
        duration_ms: u64,
    ) -> bool {
        if generation != self.sample_generation || !self.should_sample() {
            return false;
        }

        if duration_ms > 0 {
            self.duration_ms = duration_ms;
        }
        self.position_ms = if self.duration_ms > 0 {
            position_ms.min(self.duration_ms)
        } else {
            position_ms
        };

        self.emit(PlaybackEvent::PositionUpdate {
            position_ms: self.position_ms,
            duration_ms: self.duration_ms,
        });
        true
    }

    /// Whether the synchronizer should be running
    pub fn should_sample(&self) -> bool {
        self.state == TransportState::Playing && !self.scrubbing
    }

    /// Current sampling generation
    pub fn sample_generation(&self) -> u64 {
        self.sample_generation
    }

    /// Current load session
    pub fn load_session(&self) -> u64 {
        self.load_session
    }

    // ===== Shuffle & Repeat =====

    /// Flip shuffle
    pub fn toggle_shuffle(&mut self) {
        self.set_shuffle(!self.shuffle);
    }

    /// Set shuffle, re-ordering the queue around the current song
    pub fn set_shuffle(&mut self, enabled: bool) {
        if self.shuffle == enabled {
            return;
        }

        self.shuffle = enabled;
        let current = self.current_id();
        self.queue.set_shuffle(enabled, current.as_ref());
        self.emit(PlaybackEvent::ShuffleChanged { enabled });
    }

    /// Get shuffle state
    pub fn is_shuffle(&self) -> bool {
        self.shuffle
    }

    /// Flip repeat-one
    pub fn toggle_repeat_one(&mut self) {
        self.set_repeat_one(!self.repeat_one);
    }

    /// Set repeat-one (no queue change)
    pub fn set_repeat_one(&mut self, enabled: bool) {
        if self.repeat_one != enabled {
            self.repeat_one = enabled;
            self.emit(PlaybackEvent::RepeatChanged {
                repeat_one: enabled,
            });
        }
    }

    /// Get repeat-one state
    pub fn is_repeat_one(&self) -> bool {
        self.repeat_one
    }

    // ===== Volume =====

    /// Set volume (0-100)
    pub fn set_volume(&mut self, level: u8) {
        self.volume.set_level(level);
        self.volume_changed();
    }

    /// Get current volume level (0-100)
    pub fn get_volume(&self) -> u8 {
        self.volume.level()
    }

    /// Mute audio
    pub fn mute(&mut self) {
        self.volume.mute();
        self.volume_changed();
    }

    /// Unmute audio
    pub fn unmute(&mut self) {
        self.volume.unmute();
        self.volume_changed();
    }

    /// Toggle mute state
    pub fn toggle_mute(&mut self) {
        self.volume.toggle_mute();
        self.volume_changed();
    }

    /// Check if muted
    pub fn is_muted(&self) -> bool {
        self.volume.is_muted()
    }

    fn volume_changed(&mut self) {
        self.pending_commands
            .push(DeviceCommand::SetVolume(self.volume.gain()));
        self.emit(PlaybackEvent::VolumeChanged {
            level: self.volume.level(),
            is_muted: self.volume.is_muted(),
        });
    }

    // ===== Catalog =====

    /// Replace the catalog the queue orders
    ///
    /// The current song keeps playing even if it was removed upstream;
    /// next/previous then start from the first song of the new order.
    pub fn set_catalog(&mut self, songs: Vec<Song>) {
        let current = self.current_id();
        self.queue.replace_catalog(songs, current.as_ref());

        if let Some(id) = current.filter(|id| !self.queue.contains(id)) {
            info!(song_id = %id, "Current song no longer in catalog");
        }

        self.emit(PlaybackEvent::QueueChanged {
            length: self.queue.len(),
        });
    }

    /// Play order
    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    // ===== Errors =====

    /// A transport command failed on the device
    pub fn on_device_error(&mut self, error: &PlaybackError) {
        warn!(error = %error, "Device command failed");
        self.record_error(error.to_string());
    }

    fn record_error(&mut self, message: String) {
        self.last_error = Some(message.clone());
        self.emit(PlaybackEvent::Error { message });
    }

    // ===== State Queries =====

    /// Get transport state
    pub fn get_state(&self) -> TransportState {
        self.state
    }

    /// Get the loaded (or loading) song
    pub fn get_current_song(&self) -> Option<&Song> {
        self.current_song.as_ref()
    }

    /// Get current position in milliseconds
    pub fn get_position_ms(&self) -> u64 {
        self.position_ms
    }

    /// Get track duration in milliseconds (0 = unknown)
    pub fn get_duration_ms(&self) -> u64 {
        self.duration_ms
    }

    /// Check if the user is scrubbing
    pub fn is_scrubbing(&self) -> bool {
        self.scrubbing
    }

    /// Observable projection of the current state
    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            status: self.state,
            current_song: self.current_song.clone(),
            is_playing: self.state == TransportState::Playing,
            is_loading: self.state == TransportState::Loading,
            position_ms: self.position_ms,
            duration_ms: self.duration_ms,
            shuffle: self.shuffle,
            repeat_one: self.repeat_one,
            scrubbing: self.scrubbing,
            volume: self.volume.level(),
            muted: self.volume.is_muted(),
            error: self.last_error.clone(),
        }
    }

    // ===== Output =====

    /// Drain device commands queued since the last drain
    pub fn drain_commands(&mut self) -> Vec<DeviceCommand> {
        std::mem::take(&mut self.pending_commands)
    }

    /// Drain all pending events
    pub fn drain_events(&mut self) -> Vec<PlaybackEvent> {
        std::mem::take(&mut self.pending_events)
    }

    fn current_id(&self) -> Option<SongId> {
        self.current_song.as_ref().map(|s| s.id.clone())
    }

    /// Enter `state`, restarting sampling
    fn transition(&mut self, state: TransportState) {
        self.sample_generation += 1;
        if self.state != state {
            debug!(from = ?self.state, to = ?state, "Transport state changed");
            self.state = state;
            self.emit(PlaybackEvent::StateChanged { state });
        }
    }

    fn emit(&mut self, event: PlaybackEvent) {
        self.pending_events.push(event);
    }
}

impl Default for PlaybackManager {
    fn default() -> Self {
        Self::new(PlaybackConfig::default())
    }
}

/// Clamp a requested position to `[0, duration]`
///
/// Only the lower bound applies while the duration is unknown (0).
fn clamp_position(position_ms: i64, duration_ms: u64) -> u64 {
    let position = position_ms.max(0) as u64;
    if duration_ms > 0 {
        position.min(duration_ms)
    } else {
        position
    }
}
