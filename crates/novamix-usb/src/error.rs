//! USB error types.

use thiserror::Error;

/// USB error type.
#[derive(Debug, Error)]
pub enum UsbError {
    #[error("Device {vendor_id:04x}:{product_id:04x} not found")]
    DeviceNotFound { vendor_id: u16, product_id: u16 },

    #[error("Permission denied - check udev rules")]
    PermissionDenied,

    #[error("Failed to claim interface {interface}: {reason}")]
    InterfaceClaim { interface: u8, reason: String },

    #[error("Device session already released")]
    Released,

    #[error("USB error: {0}")]
    Transfer(#[from] rusb::Error),
}

/// Result type for USB operations.
pub type UsbResult<T> = Result<T, UsbError>;
