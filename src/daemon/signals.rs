//! Signal handling: SIGTERM/SIGINT trigger graceful shutdown.
//!
//! Uses the `signal-hook` crate for safe signal registration. The
//! orchestrator's top-level loop polls `SignalHandler` each iteration rather
//! than blocking on signals, matching spec's `interrupt_processing()` model.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use signal_hook::consts::{SIGINT, SIGTERM};
use tracing::warn;

/// Thread-safe shutdown flag shared between the signal handler and the
/// orchestrator loop.
///
/// Uses `Ordering::Relaxed` since the loop polls every iteration and no
/// other atomic ordering is required.
#[derive(Clone)]
pub struct SignalHandler {
    shutdown_flag: Arc<AtomicBool>,
}

impl SignalHandler {
    /// Create a new handler and register SIGTERM/SIGINT hooks.
    ///
    /// Registration is best-effort: failures are logged but not fatal, since
    /// a process can always be killed with SIGKILL as a fallback.
    pub fn new() -> Self {
        let handler = Self {
            shutdown_flag: Arc::new(AtomicBool::new(false)),
        };
        handler.register_signals();
        handler
    }

    /// Check whether shutdown has been requested.
    #[must_use]
    pub fn should_shutdown(&self) -> bool {
        self.shutdown_flag.load(Ordering::Relaxed)
    }

    /// Programmatically request shutdown (used by tests and the orchestrator
    /// when a fatal, non-retryable error is encountered).
    pub fn request_shutdown(&self) {
        self.shutdown_flag.store(true, Ordering::Relaxed);
    }

    fn register_signals(&self) {
        if let Err(e) = signal_hook::flag::register(SIGTERM, Arc::clone(&self.shutdown_flag)) {
            warn!(error = %e, "failed to register SIGTERM handler");
        }
        if let Err(e) = signal_hook::flag::register(SIGINT, Arc::clone(&self.shutdown_flag)) {
            warn!(error = %e, "failed to register SIGINT handler");
        }
    }
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new()
    }
}
