//! `CancellationToken`: the shared cancellation signal a scan's Processor and
//! Transporter both watch, and `interrupt_processing()` broadcasts on.
//!
//! Mirrors a `threading.Condition`: a mutex-guarded boolean plus a condvar,
//! so every suspension point can be woken promptly rather than polling on a
//! tight loop.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

/// Cloneable handle to a single shared cancellation flag.
#[derive(Clone, Default)]
pub struct CancellationToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Broadcast cancellation to every waiter.
    pub fn cancel(&self) {
        let (lock, cvar) = &*self.inner;
        *lock.lock() = true;
        cvar.notify_all();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.inner.0.lock()
    }

    /// Wait up to `timeout` for cancellation. Returns `true` if cancellation
    /// was observed (either already set, or signaled within the timeout);
    /// `false` if the timeout elapsed first.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (lock, cvar) = &*self.inner;
        let mut guard = lock.lock();
        if *guard {
            return true;
        }
        cvar.wait_for(&mut guard, timeout);
        *guard
    }
}
