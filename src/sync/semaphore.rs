use std::sync::{Condvar, Mutex};
use std::time::Duration;

use crate::Result;

/// A counting semaphore built on `Mutex` + `Condvar`.
///
/// The standard library has no semaphore, and the rendezvous handshake is the textbook
/// use case for a pair of binary ones, so this is the minimal implementation: a permit
/// counter and a condition variable. Permits released before any waiter arrives are
/// retained, which is exactly the one-shot-signal behavior the barrier needs (the worker
/// may signal "paused" before the controller starts waiting).
pub struct Semaphore {
    permits: Mutex<usize>,
    available: Condvar,
}

impl Semaphore {
    /// Create a semaphore with the given number of initial permits.
    ///
    /// ## Arguments
    /// * 'permits' - The number of initially available permits (0 for a signal)
    #[must_use]
    pub fn new(permits: usize) -> Semaphore {
        Semaphore {
            permits: Mutex::new(permits),
            available: Condvar::new(),
        }
    }

    /// Release one permit, waking one waiter if any is blocked.
    pub fn release(&self) {
        // A poisoned lock here means a thread panicked mid-signal; waking nobody is the
        // only option left, and the waiter surfaces LockError on its own side.
        if let Ok(mut permits) = self.permits.lock() {
            *permits += 1;
            self.available.notify_one();
        }
    }

    /// Block until a permit is available, then take it.
    ///
    /// # Errors
    /// Returns [`crate::Error::LockError`] if the internal lock was poisoned.
    pub fn acquire(&self) -> Result<()> {
        let mut permits = self.permits.lock().map_err(|_| crate::Error::LockError)?;
        while *permits == 0 {
            permits = self
                .available
                .wait(permits)
                .map_err(|_| crate::Error::LockError)?;
        }
        *permits -= 1;
        Ok(())
    }

    /// Block until a permit is available or the timeout elapses.
    ///
    /// Returns `true` if a permit was taken, `false` on timeout.
    ///
    /// ## Arguments
    /// * 'timeout' - Maximum time to wait for a permit
    ///
    /// # Errors
    /// Returns [`crate::Error::LockError`] if the internal lock was poisoned.
    pub fn acquire_timeout(&self, timeout: Duration) -> Result<bool> {
        let deadline = std::time::Instant::now() + timeout;
        let mut permits = self.permits.lock().map_err(|_| crate::Error::LockError)?;
        while *permits == 0 {
            let now = std::time::Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            let (guard, result) = self
                .available
                .wait_timeout(permits, deadline - now)
                .map_err(|_| crate::Error::LockError)?;
            permits = guard;
            if result.timed_out() && *permits == 0 {
                return Ok(false);
            }
        }
        *permits -= 1;
        Ok(true)
    }

    /// Take a permit if one is immediately available.
    ///
    /// Returns `true` if a permit was taken.
    ///
    /// # Errors
    /// Returns [`crate::Error::LockError`] if the internal lock was poisoned.
    pub fn try_acquire(&self) -> Result<bool> {
        let mut permits = self.permits.lock().map_err(|_| crate::Error::LockError)?;
        if *permits == 0 {
            return Ok(false);
        }
        *permits -= 1;
        Ok(true)
    }
}
