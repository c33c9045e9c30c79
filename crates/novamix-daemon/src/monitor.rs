//! Chat-mix balance monitor: the daemon's main loop.
//!
//! Each tick issues a balance query at a fixed rate, performs one bounded
//! read from the headset and turns balance reports into sink volumes.

use std::thread::sleep;
use std::time::{Duration, Instant};

use novamix_audio::{AudioResult, ProcessRunner, SinkOrchestrator};
use novamix_core::{FeatureId, Message, MixBalance, Toggle};
use novamix_usb::{FeatureController, Transport, UsbResult};
use tracing::{debug, info, trace, warn};

use crate::config::MonitorConfig;
use crate::signals::ShutdownFlag;

/// Headset side of the daemon.
pub trait HeadsetControl {
    fn set_feature(&mut self, toggle: Toggle, enabled: bool) -> bool;
    fn query_balance(&mut self) -> bool;
    fn receive(&mut self, timeout: Duration) -> UsbResult<Option<Vec<u8>>>;
    /// Switch off whatever this session switched on.
    fn disable_features(&mut self);
    fn release(&mut self);
}

/// Sound server side of the daemon.
pub trait MixOutput {
    fn start(&mut self) -> AudioResult<()>;
    fn set_volumes(&mut self, balance: MixBalance) -> bool;
    /// Non-blocking housekeeping, called once per monitor tick.
    fn poll(&mut self);
    fn teardown(&mut self);
}

impl<T: Transport> HeadsetControl for FeatureController<T> {
    fn set_feature(&mut self, toggle: Toggle, enabled: bool) -> bool {
        FeatureController::set_feature(self, toggle, enabled)
    }

    fn query_balance(&mut self) -> bool {
        FeatureController::query_balance(self)
    }

    fn receive(&mut self, timeout: Duration) -> UsbResult<Option<Vec<u8>>> {
        FeatureController::receive(self, timeout)
    }

    fn disable_features(&mut self) {
        self.disable_enabled();
    }

    fn release(&mut self) {
        FeatureController::release(self);
    }
}

impl<R: ProcessRunner> MixOutput for SinkOrchestrator<R> {
    fn start(&mut self) -> AudioResult<()> {
        SinkOrchestrator::start(self).map(|_| ())
    }

    fn set_volumes(&mut self, balance: MixBalance) -> bool {
        SinkOrchestrator::set_volumes(self, balance)
    }

    fn poll(&mut self) {
        SinkOrchestrator::poll(self);
    }

    fn teardown(&mut self) {
        SinkOrchestrator::teardown(self);
    }
}

/// Polls the dial and keeps the sinks in step with it.
pub struct MixBalanceMonitor {
    config: MonitorConfig,
    last_query: Option<Instant>,
    last_applied: Option<MixBalance>,
}

impl MixBalanceMonitor {
    #[must_use]
    pub fn new(config: MonitorConfig) -> Self {
        Self { config, last_query: None, last_applied: None }
    }

    /// Run until `shutdown` is raised.
    pub fn run<D: HeadsetControl, S: MixOutput>(
        &mut self,
        device: &mut D,
        output: &mut S,
        shutdown: &ShutdownFlag,
    ) {
        info!("Monitoring chat-mix dial");
        while !shutdown.is_requested() {
            self.tick(device, output);
        }
        info!("Shutdown requested, leaving monitor loop");
    }

    /// One loop iteration.
    pub fn tick<D: HeadsetControl, S: MixOutput>(&mut self, device: &mut D, output: &mut S) {
        let now = Instant::now();
        if self.last_query.is_none_or(|last| now.duration_since(last) >= self.config.poll_interval)
        {
            if !device.query_balance() {
                debug!("Balance query not accepted");
            }
            self.last_query = Some(now);
        }

        output.poll();

        match device.receive(self.config.read_timeout) {
            Ok(Some(data)) => self.handle_report(&data, output),
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "USB error while reading");
                sleep(self.config.error_pause);
            }
        }
    }

    fn handle_report<S: MixOutput>(&mut self, data: &[u8], output: &mut S) {
        let message = match Message::decode(data) {
            Ok(message) => message,
            Err(e) => {
                trace!(error = %e, "Discarding report");
                return;
            }
        };

        if !message.is_balance_report() {
            trace!(
                command = message.command,
                feature = ?FeatureId::from_byte(message.feature),
                value = message.value,
                "Ignoring report"
            );
            return;
        }

        self.apply(MixBalance::from_raw(message.value), output);
    }

    /// Push a balance to the sinks unless it equals the last applied one.
    ///
    /// A split the output could not apply is not remembered, so the same
    /// position is retried on the next report.
    pub fn apply<S: MixOutput>(&mut self, balance: MixBalance, output: &mut S) -> bool {
        if self.last_applied == Some(balance) {
            return false;
        }

        info!(
            game = balance.game_percent(),
            chat = balance.chat_percent(),
            bar = %balance.bar(self.config.bar_width),
            "Chat-mix moved"
        );

        let applied = output.set_volumes(balance);
        if applied {
            self.last_applied = Some(balance);
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use novamix_usb::UsbError;

    use super::*;
    use crate::testing::{EventLog, FakeHeadset, FakeOutput, report};

    fn test_config() -> MonitorConfig {
        MonitorConfig { error_pause: Duration::ZERO, ..MonitorConfig::default() }
    }

    fn run_with(reports: Vec<UsbResult<Option<Vec<u8>>>>, config: MonitorConfig) -> EventLog {
        let log = EventLog::default();
        let shutdown = ShutdownFlag::default();
        let mut device = FakeHeadset::new(&log, reports).stop_when_drained(&shutdown);
        let mut output = FakeOutput::new(&log);

        MixBalanceMonitor::new(config).run(&mut device, &mut output, &shutdown);
        log
    }

    #[test]
    fn test_balance_sequence_applies_distinct_splits() {
        let reports = [50, 50, 70, 70, 0].into_iter().map(|v| Ok(Some(report(v)))).collect();
        let log = run_with(reports, test_config());

        assert_eq!(log.matching("volumes"), ["volumes 50/50", "volumes 70/30", "volumes 0/100"]);
    }

    #[test]
    fn test_identical_samples_set_volumes_once() {
        let reports = vec![Ok(Some(report(30))), Ok(Some(report(30)))];
        let log = run_with(reports, test_config());

        assert_eq!(log.matching("volumes"), ["volumes 30/70"]);
    }

    #[test]
    fn test_irrelevant_and_short_reports_are_discarded() {
        let reports = vec![
            Ok(Some(vec![0x45, 0x37, 0x20])),
            Ok(Some(vec![0x06, 0x64, 0x10])),
            Ok(Some(vec![0x45])),
            Ok(Some(Vec::new())),
            Ok(Some(report(80))),
        ];
        let log = run_with(reports, test_config());

        assert_eq!(log.matching("volumes"), ["volumes 80/20"]);
    }

    #[test]
    fn test_loop_survives_transfer_errors_and_timeouts() {
        let reports = vec![
            Err(UsbError::Released),
            Ok(None),
            Err(UsbError::PermissionDenied),
            Ok(Some(report(25))),
        ];
        let log = run_with(reports, test_config());

        assert_eq!(log.matching("volumes"), ["volumes 25/75"]);
    }

    #[test]
    fn test_query_rate_is_bounded_by_poll_interval() {
        let reports = (0..5).map(|_| Ok(None)).collect();
        let config = MonitorConfig { poll_interval: Duration::from_secs(3600), ..test_config() };
        let log = run_with(reports, config);

        assert_eq!(log.matching("query").len(), 1);
    }

    #[test]
    fn test_query_every_tick_when_interval_elapsed() {
        let reports = (0..5).map(|_| Ok(None)).collect();
        let config = MonitorConfig { poll_interval: Duration::ZERO, ..test_config() };
        let log = run_with(reports, config);

        // Five reads plus the one that finds the queue empty
        assert_eq!(log.matching("query").len(), 6);
    }

    #[test]
    fn test_output_is_polled_every_tick() {
        let log = EventLog::default();
        let shutdown = ShutdownFlag::default();
        let reports = vec![Ok(None), Ok(None), Ok(Some(report(50)))];
        let mut device = FakeHeadset::new(&log, reports).stop_when_drained(&shutdown);
        let mut output = FakeOutput::new(&log);

        MixBalanceMonitor::new(test_config()).run(&mut device, &mut output, &shutdown);

        // Three reads plus the one that finds the queue empty
        assert_eq!(output.polls, 4);
    }

    #[test]
    fn test_failed_apply_is_retried_on_same_sample() {
        let log = EventLog::default();
        let mut output = FakeOutput::new(&log);
        let mut monitor = MixBalanceMonitor::new(test_config());
        let balance = MixBalance::from_raw(60);

        output.fail_volumes = true;
        assert!(!monitor.apply(balance, &mut output));

        output.fail_volumes = false;
        assert!(monitor.apply(balance, &mut output));
        assert!(!monitor.apply(balance, &mut output));
        assert_eq!(log.matching("volumes"), ["volumes 60/40"]);
    }
}
