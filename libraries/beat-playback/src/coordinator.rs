//! Playback coordinator
//!
//! A single tokio task owns the [`PlaybackManager`] and the device. Every
//! input (user commands, load completions, position samples, device events,
//! catalog replacements) arrives as a message on that task, so state
//! transitions are strictly serialized. After each message the coordinator:
//!
//! 1. executes the device commands the transition queued
//! 2. aborts a load the state machine no longer waits for
//! 3. starts or stops the position sampler
//! 4. publishes the new snapshot, then the events

use crate::{
    device::{DeviceCommand, DeviceEvent, PlaybackDevice},
    error::{LoadError, PlaybackError, Result},
    events::PlaybackEvent,
    manager::PlaybackManager,
    sync::{PositionSample, PositionSynchronizer},
    types::{PlaybackConfig, PlaybackSnapshot, TransportState},
};
use beat_core::Song;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// State-changing operations, applied in arrival order
#[derive(Debug)]
enum Operation {
    PlaySong(Song),
    TogglePlayPause,
    SkipToNext,
    SkipToPrevious,
    ToggleShuffle,
    SetShuffle(bool),
    ToggleRepeatOne,
    SetRepeatOne(bool),
    BeginScrub,
    SetVolume(u8),
    Mute,
    Unmute,
    ToggleMute,
}

enum Command {
    Apply {
        operation: Operation,
        reply: oneshot::Sender<Result<()>>,
    },
    Seek {
        position_ms: i64,
        end_scrub: bool,
        reply: oneshot::Sender<Result<u64>>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Messages produced by tasks the coordinator spawned
enum Internal {
    LoadFinished {
        session: u64,
        result: std::result::Result<u64, LoadError>,
    },
}

/// Handle to the playback coordinator
///
/// Cheap to clone. Every method resolves after the operation has been
/// applied and the resulting snapshot published.
#[derive(Clone)]
pub struct CoordinatorHandle {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<PlaybackSnapshot>,
    events: broadcast::Sender<PlaybackEvent>,
}

impl CoordinatorHandle {
    /// Load and play `song`
    pub async fn play_song(&self, song: Song) -> Result<()> {
        self.apply(Operation::PlaySong(song)).await
    }

    /// Flip between playing and paused (see [`PlaybackManager::toggle_play_pause`])
    pub async fn toggle_play_pause(&self) -> Result<()> {
        self.apply(Operation::TogglePlayPause).await
    }

    /// Seek within the current song, returning the clamped position
    pub async fn seek_to(&self, position_ms: i64) -> Result<u64> {
        self.seek(position_ms, false).await
    }

    /// Skip to the next song in play order
    pub async fn skip_to_next(&self) -> Result<()> {
        self.apply(Operation::SkipToNext).await
    }

    /// Skip to the previous song in play order
    pub async fn skip_to_previous(&self) -> Result<()> {
        self.apply(Operation::SkipToPrevious).await
    }

    /// Flip shuffle
    pub async fn toggle_shuffle(&self) -> Result<()> {
        self.apply(Operation::ToggleShuffle).await
    }

    /// Set shuffle
    pub async fn set_shuffle(&self, enabled: bool) -> Result<()> {
        self.apply(Operation::SetShuffle(enabled)).await
    }

    /// Flip repeat-one
    pub async fn toggle_repeat_one(&self) -> Result<()> {
        self.apply(Operation::ToggleRepeatOne).await
    }

    /// Set repeat-one
    pub async fn set_repeat_one(&self, enabled: bool) -> Result<()> {
        self.apply(Operation::SetRepeatOne(enabled)).await
    }

    /// Suspend position sampling while the user drags the slider
    pub async fn begin_scrub(&self) -> Result<()> {
        self.apply(Operation::BeginScrub).await
    }

    /// Commit the slider position with a single seek
    pub async fn end_scrub(&self, position_ms: i64) -> Result<u64> {
        self.seek(position_ms, true).await
    }

    /// Set volume (0-100)
    pub async fn set_volume(&self, level: u8) -> Result<()> {
        self.apply(Operation::SetVolume(level)).await
    }

    /// Mute audio
    pub async fn mute(&self) -> Result<()> {
        self.apply(Operation::Mute).await
    }

    /// Unmute audio
    pub async fn unmute(&self) -> Result<()> {
        self.apply(Operation::Unmute).await
    }

    /// Toggle mute state
    pub async fn toggle_mute(&self) -> Result<()> {
        self.apply(Operation::ToggleMute).await
    }

    /// Stop the coordinator, pausing the device if it was playing
    ///
    /// Resolves once the task has finished. Calling it on a stopped
    /// coordinator is a no-op.
    pub async fn shutdown(&self) {
        let (reply, done) = oneshot::channel();
        if self.commands.send(Command::Shutdown { reply }).await.is_ok() {
            let _ = done.await;
        }
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.state.borrow().clone()
    }

    /// Live snapshot stream
    pub fn state(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.state.clone()
    }

    /// Subscribe to discrete events
    pub fn events(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.events.subscribe()
    }

    async fn apply(&self, operation: Operation) -> Result<()> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Apply { operation, reply }).await?;
        response.await.map_err(|_| PlaybackError::CoordinatorClosed)?
    }

    async fn seek(&self, position_ms: i64, end_scrub: bool) -> Result<u64> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Seek {
            position_ms,
            end_scrub,
            reply,
        })
        .await?;
        response.await.map_err(|_| PlaybackError::CoordinatorClosed)?
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| PlaybackError::CoordinatorClosed)
    }
}

/// The coordinator task
pub struct Coordinator {
    manager: PlaybackManager,
    device: Arc<dyn PlaybackDevice>,
    sync: PositionSynchronizer,
    load_task: Option<JoinHandle<()>>,
    internal_tx: mpsc::UnboundedSender<Internal>,
    samples_tx: mpsc::UnboundedSender<PositionSample>,
    state: watch::Sender<PlaybackSnapshot>,
    events: broadcast::Sender<PlaybackEvent>,
}

impl Coordinator {
    /// Start the coordinator on the current tokio runtime
    ///
    /// `catalog` feeds the play order; every replacement published on it is
    /// applied without interrupting playback.
    pub fn spawn(
        config: PlaybackConfig,
        device: Arc<dyn PlaybackDevice>,
        catalog: watch::Receiver<Arc<Vec<Song>>>,
    ) -> CoordinatorHandle {
        let (command_tx, command_rx) = mpsc::channel(config.command_capacity.max(1));
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let (samples_tx, samples_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(config.event_capacity.max(1));

        let manager = PlaybackManager::new(config.clone());
        let (state, state_rx) = watch::channel(manager.snapshot());

        let handle = CoordinatorHandle {
            commands: command_tx,
            state: state_rx,
            events: events.clone(),
        };

        let device_events = device.subscribe();
        let coordinator = Self {
            manager,
            sync: PositionSynchronizer::new(config.sync_interval()),
            device,
            load_task: None,
            internal_tx,
            samples_tx,
            state,
            events,
        };

        tokio::spawn(coordinator.run(command_rx, internal_rx, samples_rx, catalog, device_events));

        handle
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut internal: mpsc::UnboundedReceiver<Internal>,
        mut samples: mpsc::UnboundedReceiver<PositionSample>,
        mut catalog: watch::Receiver<Arc<Vec<Song>>>,
        mut device_events: broadcast::Receiver<DeviceEvent>,
    ) {
        info!("Playback coordinator started");

        let songs = catalog.borrow_and_update().as_ref().clone();
        self.manager.set_catalog(songs);
        self.flush().await;

        let mut catalog_open = true;
        let mut device_open = true;
        let mut shutdown_reply = None;

        loop {
            tokio::select! {
                // Device events go first: a track end from the previous song
                // must be seen while the next load is still pending
                biased;

                event = device_events.recv(), if device_open => match event {
                    Ok(DeviceEvent::TrackEnded) => {
                        self.manager.on_track_ended();
                        self.flush().await;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Device events lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("Device event stream closed");
                        device_open = false;
                    }
                },

                command = commands.recv() => match command {
                    Some(Command::Apply { operation, reply }) => {
                        let result = self.apply(operation);
                        self.flush().await;
                        let _ = reply.send(result);
                    }
                    Some(Command::Seek { position_ms, end_scrub, reply }) => {
                        let result = if end_scrub {
                            self.manager.end_scrub(position_ms)
                        } else {
                            self.manager.seek_to(position_ms)
                        };
                        self.flush().await;
                        let _ = reply.send(result);
                    }
                    Some(Command::Shutdown { reply }) => {
                        shutdown_reply = Some(reply);
                        break;
                    }
                    None => break,
                },

                Some(Internal::LoadFinished { session, result }) = internal.recv() => {
                    match result {
                        Ok(duration_ms) => {
                            self.manager.on_load_ready(session, duration_ms);
                        }
                        Err(e) => {
                            self.manager.on_load_failed(session, &e);
                        }
                    }
                    self.flush().await;
                }

                Some(sample) = samples.recv() => {
                    if self.manager.apply_position_sample(
                        sample.generation,
                        sample.position_ms,
                        sample.duration_ms,
                    ) {
                        self.flush().await;
                    }
                }

                changed = catalog.changed(), if catalog_open => match changed {
                    Ok(()) => {
                        let songs = catalog.borrow_and_update().as_ref().clone();
                        self.manager.set_catalog(songs);
                        self.flush().await;
                    }
                    Err(_) => {
                        debug!("Catalog stream closed");
                        catalog_open = false;
                    }
                },
            }
        }

        drop(commands);
        self.stop().await;
        info!("Playback coordinator stopped");

        if let Some(reply) = shutdown_reply {
            let _ = reply.send(());
        }
    }

    fn apply(&mut self, operation: Operation) -> Result<()> {
        debug!(?operation, "Applying operation");

        match operation {
            Operation::PlaySong(song) => self.manager.play_song(song),
            Operation::TogglePlayPause => self.manager.toggle_play_pause(),
            Operation::SkipToNext => return self.manager.skip_to_next(),
            Operation::SkipToPrevious => return self.manager.skip_to_previous(),
            Operation::ToggleShuffle => self.manager.toggle_shuffle(),
            Operation::SetShuffle(enabled) => self.manager.set_shuffle(enabled),
            Operation::ToggleRepeatOne => self.manager.toggle_repeat_one(),
            Operation::SetRepeatOne(enabled) => self.manager.set_repeat_one(enabled),
            Operation::BeginScrub => self.manager.begin_scrub(),
            Operation::SetVolume(level) => self.manager.set_volume(level),
            Operation::Mute => self.manager.mute(),
            Operation::Unmute => self.manager.unmute(),
            Operation::ToggleMute => self.manager.toggle_mute(),
        }

        Ok(())
    }

    /// Carry out everything the last transition queued
    async fn flush(&mut self) {
        for command in self.manager.drain_commands() {
            if let Err(e) = self.execute(command).await {
                self.manager.on_device_error(&e);
            }
        }

        if self.manager.get_state() != TransportState::Loading {
            self.abort_load();
        }

        if self.manager.should_sample() {
            self.sync.ensure(
                self.manager.sample_generation(),
                Arc::clone(&self.device),
                self.samples_tx.clone(),
            );
        } else {
            self.sync.stop();
        }

        // Snapshot before events, so a subscriber reacting to an event reads
        // the state that produced it
        let snapshot = self.manager.snapshot();
        self.state.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });

        for event in self.manager.drain_events() {
            // No subscribers is fine
            let _ = self.events.send(event);
        }
    }

    async fn execute(&mut self, command: DeviceCommand) -> Result<()> {
        match command {
            DeviceCommand::Load { session, song } => {
                self.start_load(session, song);
                Ok(())
            }
            DeviceCommand::Play => self.device.play().await,
            DeviceCommand::Pause => self.device.pause().await,
            DeviceCommand::Seek(position_ms) => self.device.seek(position_ms).await,
            DeviceCommand::SetVolume(gain) => self.device.set_volume(gain).await,
        }
    }

    /// Spawn the load for `session`, superseding any load in flight
    fn start_load(&mut self, session: u64, song: Song) {
        self.abort_load();

        let device = Arc::clone(&self.device);
        let tx = self.internal_tx.clone();

        self.load_task = Some(tokio::spawn(async move {
            let result = match device.load(&song.url).await {
                Ok(()) => Ok(device.duration_ms().await),
                Err(e) => Err(e),
            };
            let _ = tx.send(Internal::LoadFinished { session, result });
        }));
    }

    fn abort_load(&mut self) {
        if let Some(task) = self.load_task.take() {
            task.abort();
        }
    }

    async fn stop(&mut self) {
        self.sync.stop();
        self.abort_load();

        if self.manager.get_state() == TransportState::Playing {
            if let Err(e) = self.device.pause().await {
                warn!(error = %e, "Failed to pause device on shutdown");
            }
        }
    }
}
