//! Shared helpers for playback integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use beat_core::Song;
use beat_playback::{
    CoordinatorHandle, LoadError, PlaybackDevice, PlaybackError, PlaybackSnapshot, DeviceEvent,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

/// Default duration the mock reports after a load
pub const TRACK_MS: u64 = 30_000;

/// Default time a load takes
pub const LOAD_DELAY: Duration = Duration::from_millis(150);

/// Call recorded by [`MockDevice`]
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    Load(String),
    Play,
    Pause,
    Seek(u64),
    SetVolume(f32),
}

struct MockState {
    calls: Vec<DeviceCall>,
    load_delay: Duration,
    failing_locators: HashSet<String>,
    fail_transport: bool,
    position_ms: u64,
    duration_ms: u64,
    position_reads: usize,
    end_during_load: bool,
}

/// Scriptable in-memory device
///
/// Loads take [`LOAD_DELAY`] of tokio time, so tests using a paused clock
/// control exactly when they finish.
pub struct MockDevice {
    state: Mutex<MockState>,
    events: broadcast::Sender<DeviceEvent>,
}

impl MockDevice {
    pub fn new() -> Arc<Self> {
        let (events, _) = broadcast::channel(16);
        Arc::new(Self {
            state: Mutex::new(MockState {
                calls: Vec::new(),
                load_delay: LOAD_DELAY,
                failing_locators: HashSet::new(),
                fail_transport: false,
                position_ms: 0,
                duration_ms: 0,
                position_reads: 0,
                end_during_load: false,
            }),
            events,
        })
    }

    pub fn calls(&self) -> Vec<DeviceCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, call: &DeviceCall) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    pub fn loads(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                DeviceCall::Load(locator) => Some(locator),
                _ => None,
            })
            .collect()
    }

    pub fn fail_loading(&self, locator: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_locators
            .insert(locator.to_string());
    }

    pub fn fail_transport(&self, fail: bool) {
        self.state.lock().unwrap().fail_transport = fail;
    }

    pub fn set_position(&self, position_ms: u64) {
        self.state.lock().unwrap().position_ms = position_ms;
    }

    pub fn position_reads(&self) -> usize {
        self.state.lock().unwrap().position_reads
    }

    /// Report a track end from the previous song just as the next load completes
    pub fn end_during_next_load(&self) {
        self.state.lock().unwrap().end_during_load = true;
    }

    pub fn end_track(&self) {
        let _ = self.events.send(DeviceEvent::TrackEnded);
    }

    fn record(&self, call: DeviceCall) -> beat_playback::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        if state.fail_transport {
            return Err(PlaybackError::Device("output unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl PlaybackDevice for MockDevice {
    async fn load(&self, locator: &str) -> Result<(), LoadError> {
        let delay = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(DeviceCall::Load(locator.to_string()));
            state.load_delay
        };

        tokio::time::sleep(delay).await;

        let mut state = self.state.lock().unwrap();
        if std::mem::take(&mut state.end_during_load) {
            let _ = self.events.send(DeviceEvent::TrackEnded);
        }
        if state.failing_locators.contains(locator) {
            return Err(LoadError::Unavailable {
                locator: locator.to_string(),
                reason: "not found".into(),
            });
        }
        state.position_ms = 0;
        state.duration_ms = TRACK_MS;
        Ok(())
    }

    async fn play(&self) -> beat_playback::Result<()> {
        self.record(DeviceCall::Play)
    }

    async fn pause(&self) -> beat_playback::Result<()> {
        self.record(DeviceCall::Pause)
    }

    async fn seek(&self, position_ms: u64) -> beat_playback::Result<()> {
        self.record(DeviceCall::Seek(position_ms))?;
        self.state.lock().unwrap().position_ms = position_ms;
        Ok(())
    }

    async fn set_volume(&self, gain: f32) -> beat_playback::Result<()> {
        self.record(DeviceCall::SetVolume(gain))
    }

    async fn position_ms(&self) -> u64 {
        let mut state = self.state.lock().unwrap();
        state.position_reads += 1;
        state.position_ms
    }

    async fn duration_ms(&self) -> u64 {
        self.state.lock().unwrap().duration_ms
    }

    fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.events.subscribe()
    }
}

pub fn song(id: &str) -> Song {
    Song::new(
        id,
        format!("Song {}", id),
        "Test Artist",
        format!("https://cdn.example.com/{}.mp3", id),
    )
}

pub fn catalog(ids: &[&str]) -> Vec<Song> {
    ids.iter().map(|id| song(id)).collect()
}

/// Wait (in tokio time) until the published snapshot satisfies `predicate`
pub async fn wait_for(
    handle: &CoordinatorHandle,
    predicate: impl FnMut(&PlaybackSnapshot) -> bool,
) -> PlaybackSnapshot {
    let mut state = handle.state();
    let snapshot = tokio::time::timeout(Duration::from_secs(60), state.wait_for(predicate))
        .await
        .expect("timed out waiting for snapshot")
        .expect("coordinator stopped")
        .clone();
    snapshot
}
