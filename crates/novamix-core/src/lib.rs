//! Novamix Core - Protocol and domain types shared by the USB, audio and daemon crates.
//!
//! This crate has no I/O. It contains:
//! - The fixed-size command/report codec spoken over the headset's vendor interface
//! - Feature identifiers and the session-scoped feature state
//! - The chat-mix balance sample and its game/chat split

pub mod error;
pub mod feature;
pub mod mixer;
pub mod protocol;

pub use error::{CoreError, CoreResult};
pub use feature::{FeatureId, FeatureState, Toggle};
pub use mixer::MixBalance;
pub use protocol::{Frame, MESSAGE_LEN, Message};
