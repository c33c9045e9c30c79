//! Novamix USB - Arctis Nova vendor interface integration.
//!
//! This crate owns the headset's vendor-specific control interface:
//! - Acquiring the device (driver detach, reset, configuration, interface claim)
//! - Sending fixed-size commands with bounded retry
//! - Reading reports from the input endpoint with a short timeout
//! - Tracking which on-device features we switched on so they can be switched off

pub mod device;
pub mod error;
pub mod features;
pub mod transport;

pub use device::{DeviceConfig, DeviceSession, SessionState};
pub use error::{UsbError, UsbResult};
pub use features::FeatureController;
pub use transport::{EndpointInfo, Transport};
