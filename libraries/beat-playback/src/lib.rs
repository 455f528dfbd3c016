//! Beat Player - Playback Coordination
//!
//! Platform-agnostic playback coordination for Beat Player.
//!
//! This crate provides:
//! - Transport state machine (idle/loading/playing/paused/ended)
//! - Play order over the catalog (natural or shuffled, current song pinned)
//! - Repeat-one on natural track end
//! - Seek clamping and scrub handling
//! - Periodic position sampling while playing
//! - Volume control (logarithmic, 0-100%, mute/unmute)
//!
//! # Architecture
//!
//! The decode/render engine is not part of this crate. Platforms implement
//! [`PlaybackDevice`]; the [`Coordinator`] task is the only thing that talks
//! to it. All state lives in a synchronous [`PlaybackManager`], which makes
//! every transition testable without a runtime.
//!
//! ```text
//! CoordinatorHandle ──commands──▶ Coordinator ──▶ PlaybackDevice
//!        ▲                         │    ▲              │
//!        │ snapshots + events      │    └── loads, samples, track end
//!        └─────────────────────────┘
//! ```
//!
//! # Example: State Machine
//!
//! ```rust
//! use beat_core::Song;
//! use beat_playback::{PlaybackManager, TransportState};
//!
//! let mut manager = PlaybackManager::default();
//! manager.set_catalog(vec![
//!     Song::new("a", "First", "Artist", "https://cdn.example.com/a.mp3"),
//!     Song::new("b", "Second", "Artist", "https://cdn.example.com/b.mp3"),
//! ]);
//!
//! // Nothing loaded: play/pause starts the first song
//! manager.toggle_play_pause();
//! assert_eq!(manager.get_state(), TransportState::Loading);
//!
//! // The coordinator reports the device is ready
//! let session = manager.load_session();
//! manager.on_load_ready(session, 180_000);
//! assert_eq!(manager.get_state(), TransportState::Playing);
//! ```
//!
//! # Example: Coordinator
//!
//! ```rust,ignore
//! use beat_playback::{Coordinator, PlaybackConfig};
//!
//! let handle = Coordinator::spawn(PlaybackConfig::default(), device, cache.subscribe());
//!
//! handle.play_song(song).await?;
//! handle.seek_to(30_000).await?;
//!
//! let mut state = handle.state();
//! while state.changed().await.is_ok() {
//!     println!("{:?}", state.borrow().status);
//! }
//! ```

mod coordinator;
mod device;
mod error;
mod events;
mod manager;
mod queue;
pub mod shuffle;
mod sync;
pub mod types;
mod volume;

// Public exports
pub use coordinator::{Coordinator, CoordinatorHandle};
pub use device::{DeviceCommand, DeviceEvent, PlaybackDevice};
pub use error::{LoadError, PlaybackError, Result};
pub use events::PlaybackEvent;
pub use manager::PlaybackManager;
pub use queue::Queue;
pub use sync::{PositionSample, PositionSynchronizer};
pub use types::{PlaybackConfig, PlaybackSnapshot, TransportState};
pub use volume::Volume;
