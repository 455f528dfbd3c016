//! Beat Player Core
//!
//! Platform-agnostic domain types shared by the catalog cache, the playback
//! coordinator and the host applications.
//!
//! # Example
//!
//! ```rust
//! use beat_core::{format_time, Song};
//!
//! let song = Song::new("s1", "Intro", "The Band", "https://cdn.example.com/s1.mp3");
//! assert_eq!(song.id.as_str(), "s1");
//! assert_eq!(format_time(61_000), "01:01");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod time;
pub mod types;

pub use time::format_time;
pub use types::{Song, SongId, UserId};
