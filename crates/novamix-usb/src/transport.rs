//! The slice of a USB device handle the session needs.

use std::time::Duration;

use rusb::{DeviceHandle, TransferType, UsbContext};

/// One endpoint of the active configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointInfo {
    pub interface: u8,
    /// Alternate setting the endpoint belongs to
    pub setting: u8,
    pub address: u8,
    pub kind: TransferType,
}

/// Acquisition steps and transfers on the headset's handle.
///
/// Implemented for [`rusb::DeviceHandle`]; tests substitute a mock.
#[cfg_attr(test, mockall::automock)]
pub trait Transport {
    fn kernel_driver_active(&self, interface: u8) -> rusb::Result<bool>;

    fn detach_kernel_driver(&mut self, interface: u8) -> rusb::Result<()>;

    fn attach_kernel_driver(&mut self, interface: u8) -> rusb::Result<()>;

    fn reset(&mut self) -> rusb::Result<()>;

    /// Select the device's first configuration.
    fn set_default_configuration(&mut self) -> rusb::Result<()>;

    /// Every endpoint of the active configuration.
    fn endpoints(&self) -> rusb::Result<Vec<EndpointInfo>>;

    fn claim_interface(&mut self, interface: u8) -> rusb::Result<()>;

    fn release_interface(&mut self, interface: u8) -> rusb::Result<()>;

    /// Issue an OUT control transfer.
    fn write_control(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &[u8],
        timeout: Duration,
    ) -> rusb::Result<usize>;

    /// Read from an interrupt IN endpoint.
    fn read_interrupt(&self, endpoint: u8, buf: &mut [u8], timeout: Duration)
    -> rusb::Result<usize>;

    /// Read from a bulk IN endpoint.
    fn read_bulk(&self, endpoint: u8, buf: &mut [u8], timeout: Duration) -> rusb::Result<usize>;
}

impl<T: UsbContext> Transport for DeviceHandle<T> {
    fn kernel_driver_active(&self, interface: u8) -> rusb::Result<bool> {
        DeviceHandle::kernel_driver_active(self, interface)
    }

    fn detach_kernel_driver(&mut self, interface: u8) -> rusb::Result<()> {
        DeviceHandle::detach_kernel_driver(self, interface)
    }

    fn attach_kernel_driver(&mut self, interface: u8) -> rusb::Result<()> {
        DeviceHandle::attach_kernel_driver(self, interface)
    }

    fn reset(&mut self) -> rusb::Result<()> {
        DeviceHandle::reset(self)
    }

    fn set_default_configuration(&mut self) -> rusb::Result<()> {
        let desc = self.device().config_descriptor(0)?;
        self.set_active_configuration(desc.number())
    }

    fn endpoints(&self) -> rusb::Result<Vec<EndpointInfo>> {
        let config = self.device().active_config_descriptor()?;
        let mut endpoints = Vec::new();

        for iface in config.interfaces() {
            for desc in iface.descriptors() {
                endpoints.extend(desc.endpoint_descriptors().map(|ep| EndpointInfo {
                    interface: iface.number(),
                    setting: desc.setting_number(),
                    address: ep.address(),
                    kind: ep.transfer_type(),
                }));
            }
        }

        Ok(endpoints)
    }

    fn claim_interface(&mut self, interface: u8) -> rusb::Result<()> {
        DeviceHandle::claim_interface(self, interface)
    }

    fn release_interface(&mut self, interface: u8) -> rusb::Result<()> {
        DeviceHandle::release_interface(self, interface)
    }

    fn write_control(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &[u8],
        timeout: Duration,
    ) -> rusb::Result<usize> {
        DeviceHandle::write_control(self, request_type, request, value, index, buf, timeout)
    }

    fn read_interrupt(
        &self,
        endpoint: u8,
        buf: &mut [u8],
        timeout: Duration,
    ) -> rusb::Result<usize> {
        DeviceHandle::read_interrupt(self, endpoint, buf, timeout)
    }

    fn read_bulk(&self, endpoint: u8, buf: &mut [u8], timeout: Duration) -> rusb::Result<usize> {
        DeviceHandle::read_bulk(self, endpoint, buf, timeout)
    }
}
