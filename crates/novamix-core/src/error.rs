//! Error types for Novamix core.

use thiserror::Error;

/// Core error type for protocol encoding and decoding.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("Field {field} value {value} does not fit in one byte")]
    Encoding { field: &'static str, value: u32 },

    #[error("Short message: got {len} bytes, need at least 3")]
    ShortMessage { len: usize },
}

/// Result type alias for Novamix core operations.
pub type CoreResult<T> = std::result::Result<T, CoreError>;
