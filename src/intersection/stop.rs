//! Stop signal: one transition from running to stopped, never back.
//!
//! Lanes only ever call [`StopSignal::is_raised`], a non-blocking atomic
//! load at the end of each cycle. The controller additionally parks on the
//! condvar so an early stop (Ctrl-C) cuts its wait short.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Process-wide stop flag with a single running → stopped transition.
#[derive(Debug, Default)]
pub struct StopSignal {
    raised: AtomicBool,
    lock: Mutex<()>,
    cond: Condvar,
}

impl StopSignal {
    /// Create a signal in the running state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the signal.
    ///
    /// Returns `true` only for the call that performed the transition; any
    /// later call is a no-op returning `false`.
    pub fn raise(&self) -> bool {
        let transitioned = self
            .raised
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if transitioned {
            // Taking the lock orders this notify after any waiter's flag check.
            let _guard = self.lock.lock();
            self.cond.notify_all();
        }
        transitioned
    }

    /// Whether the signal has been raised. Never blocks.
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }

    /// Block until the signal is raised or `timeout` elapses.
    ///
    /// Returns whether the signal is raised on return.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.lock.lock();
        while !self.is_raised() {
            if self.cond.wait_until(&mut guard, deadline).timed_out() {
                return self.is_raised();
            }
        }
        true
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
