//! Arctis Nova device acquisition and the command/report session.

use std::thread::sleep;
use std::time::Duration;

use novamix_core::{MESSAGE_LEN, Message};
use rusb::{Device, DeviceHandle, GlobalContext, TransferType};
use tracing::{debug, info, trace, warn};

use crate::error::{UsbError, UsbResult};
use crate::transport::{EndpointInfo, Transport};

/// SteelSeries USB Vendor ID
pub const STEELSERIES_VID: u16 = 0x1038;
/// Arctis Nova base station USB Product ID
pub const NOVA_PID: u16 = 0x2202;
/// Vendor-specific control interface
pub const CONTROL_INTERFACE: u8 = 5;
/// Input endpoint on the control interface carrying device reports
pub const INPUT_ENDPOINT: u8 = 0x86;
/// Interfaces whose kernel drivers must let go before we can talk to the device
pub const DETACH_INTERFACES: [u8; 3] = [3, 4, 5];

/// Class request, interface recipient, host-to-device
const REQUEST_TYPE_OUT: u8 = 0x21;
/// HID `SET_REPORT`
const REQUEST_SET_REPORT: u8 = 0x09;
/// Feature report, report id 0
const REPORT_VALUE: u16 = 0x0300;

/// Device identity and transfer timing.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    pub vendor_id: u16,
    pub product_id: u16,
    /// Interface to claim and address control transfers to
    pub interface: u8,
    /// IN endpoint address expected on `interface`
    pub input_endpoint: u8,
    /// Interfaces to detach kernel drivers from during acquisition
    pub detach_interfaces: Vec<u8>,
    /// Timeout for a single control transfer
    pub transfer_timeout: Duration,
    /// Control transfer attempts per command
    pub send_retries: u32,
    /// Pause between failed attempts
    pub retry_backoff: Duration,
    /// Pause after a device reset
    pub reset_settle: Duration,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            vendor_id: STEELSERIES_VID,
            product_id: NOVA_PID,
            interface: CONTROL_INTERFACE,
            input_endpoint: INPUT_ENDPOINT,
            detach_interfaces: DETACH_INTERFACES.to_vec(),
            transfer_timeout: Duration::from_millis(1000),
            send_retries: 3,
            retry_backoff: Duration::from_millis(100),
            reset_settle: Duration::from_millis(500),
        }
    }
}

/// Acquisition progress of a [`DeviceSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Handle opened, nothing done yet
    Unopened,
    /// Kernel drivers released (best-effort)
    Detached,
    /// Reset and configuration attempted (best-effort)
    Configured,
    /// Control interface claimed and input endpoint verified
    InterfaceClaimed,
    /// Ready for commands and reports
    Ready,
    /// Interface released and handle dropped
    Released,
}

/// Exclusive session on the headset's control interface.
///
/// Released exactly once: explicitly via [`DeviceSession::release`] or on drop.
#[derive(Debug)]
pub struct DeviceSession<T: Transport = DeviceHandle<GlobalContext>> {
    handle: Option<T>,
    config: DeviceConfig,
    endpoint_kind: TransferType,
    detached: Vec<u8>,
    claimed: bool,
    state: SessionState,
}

impl DeviceSession<DeviceHandle<GlobalContext>> {
    /// Find the headset and take control of its vendor interface.
    ///
    /// Driver detach, reset and configuration are best-effort. Only a missing
    /// device, a permission problem or a failed interface claim are fatal.
    ///
    /// # Errors
    /// Returns [`UsbError::DeviceNotFound`], [`UsbError::PermissionDenied`] or
    /// [`UsbError::InterfaceClaim`].
    pub fn open(config: DeviceConfig) -> UsbResult<Self> {
        let device = find_device(config.vendor_id, config.product_id)?;
        let handle = device.open().map_err(|e| match e {
            rusb::Error::Access => UsbError::PermissionDenied,
            other => UsbError::Transfer(other),
        })?;

        info!(
            vendor_id = %format!("{:04x}", config.vendor_id),
            product_id = %format!("{:04x}", config.product_id),
            bus = device.bus_number(),
            address = device.address(),
            "Arctis Nova found"
        );

        Self::acquire(handle, config)
    }
}

impl<T: Transport> DeviceSession<T> {
    /// Run the acquisition sequence on an opened handle.
    ///
    /// # Errors
    /// Returns [`UsbError::InterfaceClaim`] if the input endpoint is missing or
    /// the interface cannot be claimed.
    pub fn acquire(handle: T, config: DeviceConfig) -> UsbResult<Self> {
        let mut session = Self {
            handle: Some(handle),
            config,
            endpoint_kind: TransferType::Interrupt,
            detached: Vec::new(),
            claimed: false,
            state: SessionState::Unopened,
        };

        session.detach_kernel_drivers();
        session.reset_and_configure();
        // On error the session drops here, re-attaching anything we detached
        session.claim_interface()?;

        session.state = SessionState::Ready;
        info!(
            interface = session.config.interface,
            endpoint = %format!("{:02x}", session.config.input_endpoint),
            kind = ?session.endpoint_kind,
            "Device session ready"
        );
        Ok(session)
    }

    fn detach_kernel_drivers(&mut self) {
        let Some(handle) = self.handle.as_mut() else {
            return;
        };

        for &interface in &self.config.detach_interfaces {
            match handle.kernel_driver_active(interface) {
                Ok(true) => match handle.detach_kernel_driver(interface) {
                    Ok(()) => {
                        debug!(interface, "Kernel driver detached");
                        self.detached.push(interface);
                    }
                    Err(e) => warn!(interface, error = %e, "Failed to detach kernel driver"),
                },
                Ok(false) => trace!(interface, "No kernel driver bound"),
                Err(e) => warn!(interface, error = %e, "Failed to query kernel driver"),
            }
        }

        self.state = SessionState::Detached;
    }

    fn reset_and_configure(&mut self) {
        let Some(handle) = self.handle.as_mut() else {
            return;
        };

        debug!("Resetting device");
        match handle.reset() {
            Ok(()) => sleep(self.config.reset_settle),
            Err(e) => warn!(error = %e, "Device reset failed, continuing"),
        }

        if let Err(e) = handle.set_default_configuration() {
            warn!(error = %e, "Setting configuration failed, continuing");
        }

        self.state = SessionState::Configured;
    }

    fn claim_interface(&mut self) -> UsbResult<()> {
        let interface = self.config.interface;
        let endpoint = self.config.input_endpoint;
        let Some(handle) = self.handle.as_mut() else {
            return Err(UsbError::Released);
        };

        let endpoints = handle
            .endpoints()
            .map_err(|e| UsbError::InterfaceClaim { interface, reason: e.to_string() })?;
        let kind = find_input_endpoint(&endpoints, interface, endpoint).ok_or_else(|| {
            UsbError::InterfaceClaim {
                interface,
                reason: format!("endpoint {endpoint:02x} not found"),
            }
        })?;

        handle
            .claim_interface(interface)
            .map_err(|e| UsbError::InterfaceClaim { interface, reason: e.to_string() })?;

        self.claimed = true;
        self.endpoint_kind = kind;
        self.state = SessionState::InterfaceClaimed;
        debug!(interface, "Interface claimed");
        Ok(())
    }

    /// Wrap a transport whose interface is already claimed.
    #[must_use]
    pub fn from_transport(transport: T, config: DeviceConfig, endpoint_kind: TransferType) -> Self {
        Self {
            handle: Some(transport),
            config,
            endpoint_kind,
            detached: Vec::new(),
            claimed: true,
            state: SessionState::Ready,
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Send a command using the configured retry count.
    pub fn send(&self, message: Message) -> bool {
        self.send_with_retries(message, self.config.send_retries)
    }

    /// Send a command, making at most `retries` transfer attempts.
    ///
    /// Transfer errors are logged and retried, never returned.
    pub fn send_with_retries(&self, message: Message, retries: u32) -> bool {
        let Some(handle) = self.handle.as_ref() else {
            warn!(bytes = %message.hex_prefix(), "Dropping command, session released");
            return false;
        };

        let frame = message.encode();
        debug!(bytes = %message.hex_prefix(), "Sending command");

        for attempt in 1..=retries {
            match handle.write_control(
                REQUEST_TYPE_OUT,
                REQUEST_SET_REPORT,
                REPORT_VALUE,
                u16::from(self.config.interface),
                &frame,
                self.config.transfer_timeout,
            ) {
                Ok(sent) => {
                    trace!(sent, "Command sent");
                    return true;
                }
                Err(rusb::Error::Timeout) => warn!(attempt, "Command timed out"),
                Err(e) => warn!(attempt, error = %e, "Command transfer failed"),
            }

            if attempt < retries {
                sleep(self.config.retry_backoff);
            }
        }

        false
    }

    /// Read one report from the input endpoint.
    ///
    /// Returns `Ok(None)` when nothing arrived within `timeout`.
    ///
    /// # Errors
    /// Returns [`UsbError::Transfer`] on any other transfer failure, or
    /// [`UsbError::Released`] after release.
    pub fn receive(&self, timeout: Duration) -> UsbResult<Option<Vec<u8>>> {
        let handle = self.handle.as_ref().ok_or(UsbError::Released)?;
        let endpoint = self.config.input_endpoint;
        let mut buf = [0u8; MESSAGE_LEN];

        let read = match self.endpoint_kind {
            TransferType::Bulk => handle.read_bulk(endpoint, &mut buf, timeout),
            _ => handle.read_interrupt(endpoint, &mut buf, timeout),
        };

        match read {
            Ok(len) => Ok(Some(buf[..len].to_vec())),
            Err(rusb::Error::Timeout) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Release the interface, hand detached interfaces back to the kernel and
    /// close the handle. Safe to call any number of times.
    pub fn release(&mut self) {
        let Some(mut handle) = self.handle.take() else {
            return;
        };

        if self.claimed {
            if let Err(e) = handle.release_interface(self.config.interface) {
                debug!(interface = self.config.interface, error = %e, "Interface release failed");
            }
            self.claimed = false;
        }

        for interface in self.detached.drain(..) {
            if let Err(e) = handle.attach_kernel_driver(interface) {
                debug!(interface, error = %e, "Kernel driver re-attach failed");
            }
        }

        self.state = SessionState::Released;
        info!("Device session released");
    }
}

impl<T: Transport> Drop for DeviceSession<T> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Find the first attached device matching `vendor_id:product_id`.
fn find_device(vendor_id: u16, product_id: u16) -> UsbResult<Device<GlobalContext>> {
    let devices = rusb::devices()?;

    for device in devices.iter() {
        let Ok(desc) = device.device_descriptor() else {
            continue;
        };

        if desc.vendor_id() == vendor_id && desc.product_id() == product_id {
            return Ok(device);
        }
    }

    Err(UsbError::DeviceNotFound { vendor_id, product_id })
}

/// Transfer type of `endpoint` on alternate setting 0 of `interface`.
fn find_input_endpoint(
    endpoints: &[EndpointInfo],
    interface: u8,
    endpoint: u8,
) -> Option<TransferType> {
    endpoints
        .iter()
        .find(|ep| ep.interface == interface && ep.setting == 0 && ep.address == endpoint)
        .map(|ep| ep.kind)
}
