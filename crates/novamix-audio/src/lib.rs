//! Novamix Audio - Virtual sink management on top of the PipeWire command-line tools.
//!
//! This crate handles everything on the sound server side:
//! - Finding the headset's real output sink
//! - Spawning `pw-loopback` routes for the Game and Chat sinks
//! - Choosing between `pactl` and `pw-cli` for volume control, with a
//!   one-way runtime downgrade
//! - Tearing the routes down again

pub mod error;
pub mod listing;
pub mod orchestrator;
pub mod runner;
pub mod strategy;

pub use error::{AudioError, AudioResult};
pub use orchestrator::{AudioConfig, SinkOrchestrator, SinkRole};
pub use runner::{ProcessRunner, SystemRunner};
pub use strategy::{VolumeStrategy, VolumeTool};
