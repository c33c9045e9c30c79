//! Daemon configuration.
//!
//! Everything is fixed at build time; only the log filter can be changed at
//! runtime, through `RUST_LOG`.

use std::time::Duration;

use novamix_audio::AudioConfig;
use novamix_usb::DeviceConfig;
use tracing::debug;

/// Daemon configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Headset identity and transfer timing
    pub device: DeviceConfig,
    /// Virtual sink naming and timing
    pub audio: AudioConfig,
    /// Poll loop timing
    pub monitor: MonitorConfig,
}

/// Poll loop settings.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Minimum spacing between balance queries
    pub poll_interval: Duration,
    /// Bound on each endpoint read; also the worst-case shutdown latency
    pub read_timeout: Duration,
    /// Pause after a failed endpoint read
    pub error_pause: Duration,
    /// Pause after each startup command
    pub startup_settle: Duration,
    /// Width of the balance bar in log output
    pub bar_width: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            read_timeout: Duration::from_millis(100),
            error_pause: Duration::from_millis(100),
            startup_settle: Duration::from_millis(200),
            bar_width: 40,
        }
    }
}

/// Build the configuration.
pub fn load_config() -> Config {
    let config = Config::default();
    debug!(?config, "Configuration loaded");
    config
}
