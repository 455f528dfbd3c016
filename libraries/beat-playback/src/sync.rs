//! Position synchronizer
//!
//! A periodic task that reads position and duration from the device and
//! sends them back to the coordinator. Each run is tagged with the sampling
//! generation it was started for; the state machine drops samples whose
//! generation is no longer current, so a sample already in flight when
//! playback pauses or a seek lands is never applied.

use crate::device::PlaybackDevice;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::trace;

/// One reading from the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionSample {
    /// Generation the sampler was started for
    pub generation: u64,

    /// Reported position
    pub position_ms: u64,

    /// Reported duration (0 = unknown)
    pub duration_ms: u64,
}

/// Owns the sampling task
///
/// At most one task runs at a time. Samples immediately on start, then once
/// per interval.
pub struct PositionSynchronizer {
    interval: Duration,
    running: Option<(u64, JoinHandle<()>)>,
}

impl PositionSynchronizer {
    /// Create a stopped synchronizer
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            running: None,
        }
    }

    /// Make sure a task for `generation` is running
    ///
    /// A task for an older generation is aborted and replaced.
    pub fn ensure(
        &mut self,
        generation: u64,
        device: Arc<dyn PlaybackDevice>,
        samples: mpsc::UnboundedSender<PositionSample>,
    ) {
        if self.generation() == Some(generation) {
            return;
        }

        self.stop();
        trace!(generation, "Starting position sampler");

        let period = self.interval;
        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                let sample = PositionSample {
                    generation,
                    position_ms: device.position_ms().await,
                    duration_ms: device.duration_ms().await,
                };

                if samples.send(sample).is_err() {
                    break;
                }
            }
        });

        self.running = Some((generation, task));
    }

    /// Stop sampling
    pub fn stop(&mut self) {
        if let Some((generation, task)) = self.running.take() {
            trace!(generation, "Stopping position sampler");
            task.abort();
        }
    }

    /// Generation of the running task, if any
    pub fn generation(&self) -> Option<u64> {
        self.running.as_ref().map(|(generation, _)| *generation)
    }

    /// Check if a task is running
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }
}

impl Drop for PositionSynchronizer {
    fn drop(&mut self) {
        self.stop();
    }
}
