//! On-device feature toggles layered over a [`DeviceSession`].

use std::time::Duration;

use novamix_core::{FeatureState, Message, Toggle};
use rusb::{DeviceHandle, GlobalContext};
use tracing::{debug, info, warn};

use crate::device::DeviceSession;
use crate::error::UsbResult;
use crate::transport::Transport;

/// Switches headset features and remembers which ones it switched on.
pub struct FeatureController<T: Transport = DeviceHandle<GlobalContext>> {
    session: DeviceSession<T>,
    state: FeatureState,
}

impl<T: Transport> FeatureController<T> {
    #[must_use]
    pub fn new(session: DeviceSession<T>) -> Self {
        Self { session, state: FeatureState::default() }
    }

    #[must_use]
    pub fn state(&self) -> FeatureState {
        self.state
    }

    #[must_use]
    pub fn session(&self) -> &DeviceSession<T> {
        &self.session
    }

    /// Switch a feature on or off.
    ///
    /// The recorded state only changes when the device accepted the transfer.
    pub fn set_feature(&mut self, toggle: Toggle, enabled: bool) -> bool {
        let acked = self.session.send(Message::request(toggle.feature(), u8::from(enabled)));
        if acked {
            self.state.set(toggle, enabled);
            info!(feature = toggle.name(), enabled, "Feature toggled");
        } else {
            warn!(feature = toggle.name(), enabled, "Device did not accept feature toggle");
        }
        acked
    }

    /// Ask the device to report the current balance position.
    ///
    /// The answer arrives later on the input endpoint.
    pub fn query_balance(&mut self) -> bool {
        self.session.send(Message::balance_query())
    }

    /// Read one report from the device.
    ///
    /// # Errors
    /// See [`DeviceSession::receive`].
    pub fn receive(&mut self, timeout: Duration) -> UsbResult<Option<Vec<u8>>> {
        self.session.receive(timeout)
    }

    /// Switch off every feature this session switched on. Failures are logged.
    pub fn disable_enabled(&mut self) {
        let enabled: Vec<Toggle> = self.state.enabled().collect();
        for toggle in enabled {
            debug!(feature = toggle.name(), "Disabling feature");
            self.set_feature(toggle, false);
        }
    }

    /// Release the underlying device session.
    pub fn release(&mut self) {
        self.session.release();
    }
}
