//! Fixed-size command/report codec for the headset control interface.
//!
//! Every message is exactly [`MESSAGE_LEN`] bytes:
//!
//! | Offset | Field   |
//! |--------|---------|
//! | 0      | command |
//! | 1      | feature |
//! | 2      | value   |
//! | 3..    | zero padding |

use std::fmt::Write as _;

use crate::error::{CoreError, CoreResult};
use crate::feature::FeatureId;

/// Total length of every message sent to or read from the device.
pub const MESSAGE_LEN: usize = 64;

/// Command byte for host-to-device requests.
pub const CMD_REQUEST: u8 = 0x06;
/// Command byte for device-to-host reports.
pub const CMD_REPORT: u8 = 0x45;

/// A serialized message.
pub type Frame = [u8; MESSAGE_LEN];

/// The three logical fields of a protocol message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Message {
    pub command: u8,
    pub feature: u8,
    pub value: u8,
}

impl Message {
    /// Create a message from byte-sized fields.
    #[must_use]
    pub const fn new(command: u8, feature: u8, value: u8) -> Self {
        Self { command, feature, value }
    }

    /// Create a host request for a feature.
    #[must_use]
    pub const fn request(feature: FeatureId, value: u8) -> Self {
        Self::new(CMD_REQUEST, feature.to_byte(), value)
    }

    /// The request asking the device to report its current balance position.
    #[must_use]
    pub const fn balance_query() -> Self {
        Self::request(FeatureId::Balance, 0)
    }

    /// Create a message from wider integers, rejecting any field above 255.
    ///
    /// # Errors
    /// Returns [`CoreError::Encoding`] naming the first field that does not fit.
    pub fn checked(command: u32, feature: u32, value: u32) -> CoreResult<Self> {
        Ok(Self::new(
            narrow("command", command)?,
            narrow("feature", feature)?,
            narrow("value", value)?,
        ))
    }

    /// Create a message from wider integers, keeping only the low byte of each field.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn masked(command: u32, feature: u32, value: u32) -> Self {
        Self::new((command & 0xff) as u8, (feature & 0xff) as u8, (value & 0xff) as u8)
    }

    /// Serialize into a zero-padded frame.
    #[must_use]
    pub fn encode(&self) -> Frame {
        let mut frame = [0u8; MESSAGE_LEN];
        frame[0] = self.command;
        frame[1] = self.feature;
        frame[2] = self.value;
        frame
    }

    /// Parse the logical fields from a buffer read off the device.
    ///
    /// Only the first three bytes are inspected; trailing bytes are ignored.
    ///
    /// # Errors
    /// Returns [`CoreError::ShortMessage`] if fewer than three bytes are supplied.
    pub fn decode(bytes: &[u8]) -> CoreResult<Self> {
        match bytes {
            [command, feature, value, ..] => Ok(Self::new(*command, *feature, *value)),
            _ => Err(CoreError::ShortMessage { len: bytes.len() }),
        }
    }

    /// Whether this is a device report carrying a balance sample.
    #[must_use]
    pub fn is_balance_report(&self) -> bool {
        self.command == CMD_REPORT && FeatureId::from_byte(self.feature) == FeatureId::Balance
    }

    /// Render the logical bytes as `06 64 00`.
    #[must_use]
    pub fn hex_prefix(&self) -> String {
        let mut out = String::with_capacity(8);
        for (i, byte) in [self.command, self.feature, self.value].iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            let _ = write!(out, "{byte:02x}");
        }
        out
    }
}

fn narrow(field: &'static str, value: u32) -> CoreResult<u8> {
    u8::try_from(value).map_err(|_| CoreError::Encoding { field, value })
}
