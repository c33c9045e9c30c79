//! Novamix Daemon - chat-mix dial support for the Arctis Nova 7.
//!
//! Switches on the headset's chat-mix passthrough, splits the headset output
//! into Game and Chat virtual sinks and keeps their volumes in step with the
//! dial until SIGINT or SIGTERM.

use std::process::ExitCode;

use anyhow::Result;
use novamix_audio::{SinkOrchestrator, SystemRunner};
use novamix_usb::{DeviceSession, FeatureController};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod config;
mod lifecycle;
mod monitor;
mod signals;
#[cfg(test)]
mod testing;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{e:#}"), "Novamix daemon failed");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("novamix=info".parse()?)
                .add_directive("novamix_daemon=debug".parse()?)
                .add_directive("novamix_usb=info".parse()?)
                .add_directive("novamix_audio=info".parse()?),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "Starting Novamix daemon");

    let config = config::load_config();
    let shutdown = signals::setup_signal_handlers()?;

    lifecycle::run(
        &config.monitor,
        shutdown,
        || DeviceSession::open(config.device.clone()).map(FeatureController::new),
        || SinkOrchestrator::new(SystemRunner, config.audio.clone()),
    )?;

    info!("Novamix daemon stopped");
    Ok(())
}
