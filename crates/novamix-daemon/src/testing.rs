//! In-memory headset and sink fakes shared by the daemon's tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use novamix_audio::{AudioError, AudioResult};
use novamix_core::{FeatureState, Message, MixBalance, Toggle};
use novamix_usb::UsbResult;

use crate::monitor::{HeadsetControl, MixOutput};
use crate::signals::ShutdownFlag;

/// Ordered record of calls made on the fakes.
#[derive(Debug, Clone, Default)]
pub struct EventLog(Rc<RefCell<Vec<String>>>);

impl EventLog {
    pub fn push(&self, event: impl Into<String>) {
        self.0.borrow_mut().push(event.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    pub fn matching(&self, prefix: &str) -> Vec<String> {
        self.0.borrow().iter().filter(|e| e.starts_with(prefix)).cloned().collect()
    }
}

/// A balance report frame carrying `value`.
pub fn report(value: u8) -> Vec<u8> {
    Message::new(0x45, 0x64, value).encode().to_vec()
}

pub struct FakeHeadset {
    log: EventLog,
    reports: VecDeque<UsbResult<Option<Vec<u8>>>>,
    stop: Option<ShutdownFlag>,
    pub state: FeatureState,
    pub reject_features: bool,
}

impl FakeHeadset {
    pub fn new(log: &EventLog, reports: Vec<UsbResult<Option<Vec<u8>>>>) -> Self {
        Self {
            log: log.clone(),
            reports: reports.into(),
            stop: None,
            state: FeatureState::default(),
            reject_features: false,
        }
    }

    /// Raise `shutdown` once every queued report has been read.
    pub fn stop_when_drained(mut self, shutdown: &ShutdownFlag) -> Self {
        self.stop = Some(shutdown.clone());
        self
    }
}

impl HeadsetControl for FakeHeadset {
    fn set_feature(&mut self, toggle: Toggle, enabled: bool) -> bool {
        let verb = if enabled { "enable" } else { "disable" };
        self.log.push(format!("{verb} {}", toggle.name()));
        if self.reject_features {
            return false;
        }
        self.state.set(toggle, enabled);
        true
    }

    fn query_balance(&mut self) -> bool {
        self.log.push("query");
        true
    }

    fn receive(&mut self, _timeout: Duration) -> UsbResult<Option<Vec<u8>>> {
        match self.reports.pop_front() {
            Some(report) => report,
            None => {
                if let Some(stop) = &self.stop {
                    stop.request();
                }
                Ok(None)
            }
        }
    }

    fn disable_features(&mut self) {
        let enabled: Vec<Toggle> = self.state.enabled().collect();
        for toggle in enabled {
            self.set_feature(toggle, false);
        }
    }

    fn release(&mut self) {
        self.log.push("release");
    }
}

pub struct FakeOutput {
    log: EventLog,
    pub fail_start: bool,
    pub fail_volumes: bool,
    pub polls: usize,
}

impl FakeOutput {
    pub fn new(log: &EventLog) -> Self {
        Self { log: log.clone(), fail_start: false, fail_volumes: false, polls: 0 }
    }
}

impl MixOutput for FakeOutput {
    fn start(&mut self) -> AudioResult<()> {
        self.log.push("start");
        if self.fail_start {
            return Err(AudioError::NoVolumeControl);
        }
        Ok(())
    }

    fn set_volumes(&mut self, balance: MixBalance) -> bool {
        if self.fail_volumes {
            self.log.push("rejected volumes");
            return false;
        }
        self.log.push(format!("volumes {}/{}", balance.game_percent(), balance.chat_percent()));
        true
    }

    fn poll(&mut self) {
        self.polls += 1;
    }

    fn teardown(&mut self) {
        self.log.push("teardown");
    }
}
