//! Audio orchestration error types.

use thiserror::Error;

/// Audio orchestration error type.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Failed to create virtual sink {name}: {source}")]
    SinkCreation {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("No working volume control tool (tried pactl and pw-cli)")]
    NoVolumeControl,

    #[error("Volume command failed: {0}")]
    VolumeCommand(String),
}

/// Result type for audio operations.
pub type AudioResult<T> = Result<T, AudioError>;
