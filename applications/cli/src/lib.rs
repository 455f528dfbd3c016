//! Beat Player terminal host
//!
//! Wires the catalog cache and the playback coordinator to a simulated
//! device and a line-oriented command session.

pub mod commands;
pub mod config;
pub mod device;
pub mod error;

pub use commands::{Command, Outcome, Session};
pub use config::BeatConfig;
pub use device::SimulatedDevice;
pub use error::{CliError, Result};
