//! Simulated playback device
//!
//! Stands in for a platform audio engine: loads take a fixed latency, the
//! clock advances with tokio time while playing, and a timer reports the
//! natural end of each track. Every track has the same configured length.

use crate::config::DeviceSettings;
use async_trait::async_trait;
use beat_playback::{DeviceEvent, LoadError, PlaybackDevice, Result};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace};

/// Locator schemes the simulated device accepts
const SUPPORTED_SCHEMES: [&str; 3] = ["http://", "https://", "file://"];

#[derive(Default)]
struct Clock {
    loaded: Option<String>,
    duration_ms: u64,
    /// Position accumulated before the current play stretch
    offset_ms: u64,
    /// Start of the current play stretch, if playing
    playing_since: Option<Instant>,
    gain: f32,
    end_timer: Option<JoinHandle<()>>,
}

impl Clock {
    fn position_ms(&self) -> u64 {
        let running = self
            .playing_since
            .map_or(0, |since| since.elapsed().as_millis() as u64);
        (self.offset_ms + running).min(self.duration_ms)
    }

    fn cancel_end_timer(&mut self) {
        if let Some(timer) = self.end_timer.take() {
            timer.abort();
        }
    }
}

/// In-process device driven by tokio time
pub struct SimulatedDevice {
    settings: DeviceSettings,
    clock: Arc<Mutex<Clock>>,
    events: broadcast::Sender<DeviceEvent>,
}

impl SimulatedDevice {
    pub fn new(settings: DeviceSettings) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            settings,
            clock: Arc::new(Mutex::new(Clock::default())),
            events,
        }
    }

    /// Linear gain last applied
    pub fn gain(&self) -> f32 {
        lock(&self.clock).gain
    }

    /// Locator of the loaded resource
    pub fn loaded(&self) -> Option<String> {
        lock(&self.clock).loaded.clone()
    }

    /// Arm the end-of-track timer for the remaining play time
    fn schedule_end(&self, clock: &mut Clock) {
        clock.cancel_end_timer();

        let remaining = clock.duration_ms.saturating_sub(clock.position_ms());
        let shared = Arc::clone(&self.clock);
        let events = self.events.clone();

        clock.end_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(remaining)).await;

            {
                let mut clock = lock(&shared);
                clock.offset_ms = clock.duration_ms;
                clock.playing_since = None;
                clock.end_timer = None;
            }

            trace!("Simulated track ended");
            let _ = events.send(DeviceEvent::TrackEnded);
        }));
    }
}

fn lock(clock: &Mutex<Clock>) -> MutexGuard<'_, Clock> {
    // A panic while holding the lock leaves plain data behind; keep using it
    clock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl PlaybackDevice for SimulatedDevice {
    async fn load(&self, locator: &str) -> std::result::Result<(), LoadError> {
        {
            let mut clock = lock(&self.clock);
            clock.cancel_end_timer();
            clock.playing_since = None;
            clock.loaded = None;
        }

        tokio::time::sleep(Duration::from_millis(self.settings.load_latency_ms)).await;

        if !SUPPORTED_SCHEMES.iter().any(|scheme| locator.starts_with(scheme)) {
            return Err(LoadError::Unavailable {
                locator: locator.to_string(),
                reason: "unsupported locator scheme".to_string(),
            });
        }

        let mut clock = lock(&self.clock);
        clock.loaded = Some(locator.to_string());
        clock.duration_ms = self.settings.track_length_ms;
        clock.offset_ms = 0;

        debug!(locator, duration_ms = clock.duration_ms, "Simulated load complete");
        Ok(())
    }

    async fn play(&self) -> Result<()> {
        let mut clock = lock(&self.clock);
        if clock.loaded.is_some() && clock.playing_since.is_none() {
            clock.playing_since = Some(Instant::now());
            self.schedule_end(&mut clock);
        }
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        let mut clock = lock(&self.clock);
        if clock.playing_since.is_some() {
            clock.offset_ms = clock.position_ms();
            clock.playing_since = None;
            clock.cancel_end_timer();
        }
        Ok(())
    }

    async fn seek(&self, position_ms: u64) -> Result<()> {
        let mut clock = lock(&self.clock);
        clock.offset_ms = position_ms.min(clock.duration_ms);
        if clock.playing_since.is_some() {
            clock.playing_since = Some(Instant::now());
            self.schedule_end(&mut clock);
        }
        Ok(())
    }

    async fn set_volume(&self, gain: f32) -> Result<()> {
        lock(&self.clock).gain = gain;
        Ok(())
    }

    async fn position_ms(&self) -> u64 {
        lock(&self.clock).position_ms()
    }

    async fn duration_ms(&self) -> u64 {
        lock(&self.clock).duration_ms
    }

    fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.events.subscribe()
    }
}
