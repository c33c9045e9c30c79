//! Startup sequence and the single shutdown path.

use std::thread::sleep;

use anyhow::{Context, Result};
use novamix_core::Toggle;
use novamix_usb::UsbResult;
use tracing::{debug, info, warn};

use crate::config::MonitorConfig;
use crate::monitor::{HeadsetControl, MixBalanceMonitor, MixOutput};
use crate::signals::ShutdownFlag;

/// Owns the acquired headset and sinks for one daemon run.
///
/// Cleanup runs exactly once, from [`Lifecycle::shutdown`] or on drop,
/// whichever comes first.
pub struct Lifecycle<D: HeadsetControl, S: MixOutput> {
    config: MonitorConfig,
    shutdown: ShutdownFlag,
    device: D,
    output: S,
    done: bool,
}

impl<D: HeadsetControl, S: MixOutput> Lifecycle<D, S> {
    pub fn new(config: MonitorConfig, shutdown: ShutdownFlag, device: D, output: S) -> Self {
        Self { config, shutdown, device, output, done: false }
    }

    /// Enable the headset features, build the sinks and run the monitor
    /// until shutdown is requested.
    ///
    /// # Errors
    /// Returns an error if sink orchestration fails.
    pub fn serve(&mut self) -> Result<()> {
        for toggle in [Toggle::ChatMix, Toggle::SonarIcon] {
            if !self.device.set_feature(toggle, true) {
                warn!(feature = toggle.name(), "Continuing without feature");
            }
            sleep(self.config.startup_settle);
        }

        if !self.device.query_balance() {
            debug!("Initial balance query not accepted");
        }
        sleep(self.config.startup_settle);

        if self.shutdown.is_requested() {
            info!("Shutdown requested during startup");
            return Ok(());
        }

        self.output.start().context("Failed to set up virtual sinks")?;

        MixBalanceMonitor::new(self.config.clone()).run(
            &mut self.device,
            &mut self.output,
            &self.shutdown,
        );
        Ok(())
    }

    /// Stop the monitor and release everything acquired. Repeat calls only
    /// re-raise the flag.
    pub fn shutdown(&mut self) {
        self.shutdown.request();
        if self.done {
            return;
        }
        self.done = true;

        info!("Shutting down...");
        self.device.disable_features();
        self.output.teardown();
        self.device.release();
    }
}

impl<D: HeadsetControl, S: MixOutput> Drop for Lifecycle<D, S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Acquire the headset, then serve until shutdown.
///
/// `make_output` is only invoked once the headset has been acquired. Cleanup
/// runs on every path out of this function.
///
/// # Errors
/// Returns an error if the headset cannot be acquired or sink orchestration
/// fails.
pub fn run<D, S>(
    config: &MonitorConfig,
    shutdown: ShutdownFlag,
    acquire: impl FnOnce() -> UsbResult<D>,
    make_output: impl FnOnce() -> S,
) -> Result<()>
where
    D: HeadsetControl,
    S: MixOutput,
{
    let device = acquire().context("Failed to acquire headset")?;
    info!("Headset acquired");

    let mut lifecycle = Lifecycle::new(config.clone(), shutdown, device, make_output());
    let result = lifecycle.serve();
    lifecycle.shutdown();
    result
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::time::Duration;

    use assert_matches::assert_matches;
    use novamix_audio::AudioError;
    use novamix_usb::UsbError;

    use super::*;
    use crate::testing::{EventLog, FakeHeadset, FakeOutput, report};

    fn test_config() -> MonitorConfig {
        MonitorConfig {
            startup_settle: Duration::ZERO,
            error_pause: Duration::ZERO,
            ..MonitorConfig::default()
        }
    }

    #[test]
    fn test_missing_device_skips_orchestration() {
        let built_output = Cell::new(false);

        let err = run(
            &test_config(),
            ShutdownFlag::default(),
            || -> UsbResult<FakeHeadset> {
                Err(UsbError::DeviceNotFound { vendor_id: 0x1038, product_id: 0x2202 })
            },
            || {
                built_output.set(true);
                FakeOutput::new(&EventLog::default())
            },
        )
        .expect_err("Startup should fail");

        assert_matches!(err.downcast_ref::<UsbError>(), Some(UsbError::DeviceNotFound { .. }));
        assert!(!built_output.get());
    }

    #[test]
    fn test_full_run_order() {
        let log = EventLog::default();
        let shutdown = ShutdownFlag::default();
        let device = FakeHeadset::new(&log, vec![Ok(Some(report(40)))]).stop_when_drained(&shutdown);
        let config = MonitorConfig { poll_interval: Duration::from_secs(3600), ..test_config() };

        run(&config, shutdown, || Ok(device), || FakeOutput::new(&log))
            .expect("Run should succeed");

        assert_eq!(
            log.entries(),
            [
                "enable chat-mix",
                "enable sonar-icon",
                "query",
                "start",
                "query",
                "volumes 40/60",
                "disable chat-mix",
                "disable sonar-icon",
                "teardown",
                "release",
            ]
        );
    }

    #[test]
    fn test_orchestration_failure_still_cleans_up() {
        let log = EventLog::default();
        let device = FakeHeadset::new(&log, Vec::new());
        let mut output = FakeOutput::new(&log);
        output.fail_start = true;

        let err = run(&test_config(), ShutdownFlag::default(), || Ok(device), || output)
            .expect_err("Startup should fail");

        assert_matches!(err.downcast_ref::<AudioError>(), Some(AudioError::NoVolumeControl));
        assert_eq!(
            log.entries()[3..],
            ["start", "disable chat-mix", "disable sonar-icon", "teardown", "release"]
        );
    }

    #[test]
    fn test_only_acknowledged_features_are_disabled() {
        let log = EventLog::default();
        let mut device = FakeHeadset::new(&log, Vec::new());
        device.reject_features = true;
        let shutdown = ShutdownFlag::default();
        shutdown.request();

        let mut lifecycle =
            Lifecycle::new(test_config(), shutdown, device, FakeOutput::new(&log));
        lifecycle.serve().expect("Serve should succeed");
        lifecycle.shutdown();

        assert!(log.matching("disable").is_empty());
        assert!(log.matching("start").is_empty());
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let log = EventLog::default();
        let shutdown = ShutdownFlag::default();
        let mut lifecycle = Lifecycle::new(
            test_config(),
            shutdown.clone(),
            FakeHeadset::new(&log, Vec::new()),
            FakeOutput::new(&log),
        );

        lifecycle.shutdown();
        lifecycle.shutdown();
        drop(lifecycle);

        assert!(shutdown.is_requested());
        assert_eq!(log.entries(), ["teardown", "release"]);
    }
}
