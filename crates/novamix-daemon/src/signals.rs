//! Signal handling for graceful shutdown.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::flag;

/// Cooperative shutdown request shared between signal handlers and the main loop.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Set up signal handlers for graceful shutdown.
///
/// SIGTERM and SIGINT only raise the returned flag; the main loop notices it
/// between iterations and runs cleanup itself. A second signal while the flag
/// is already raised terminates the process immediately.
pub fn setup_signal_handlers() -> Result<ShutdownFlag> {
    let shutdown = ShutdownFlag::default();

    for signal in [SIGTERM, SIGINT] {
        // Registered first so it sees the flag before this delivery sets it
        flag::register_conditional_shutdown(signal, 1, Arc::clone(&shutdown.0))
            .with_context(|| format!("Failed to register forced exit for signal {signal}"))?;
        flag::register(signal, Arc::clone(&shutdown.0))
            .with_context(|| format!("Failed to register handler for signal {signal}"))?;
    }

    Ok(shutdown)
}
