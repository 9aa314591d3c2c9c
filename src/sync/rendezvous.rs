use std::sync::Arc;
use std::time::Duration;

use crate::sync::Semaphore;
use crate::{Error, Result};

/// The shared state of a two-party rendezvous: two binary semaphores, one per direction.
///
/// `worker_paused` carries "I have reached the pause point" from the worker to the
/// controller; `resume_worker` carries "inspection is done, continue" back. Create one
/// per session via [`RendezvousBarrier::create`], which hands out the two sides; the
/// barrier itself is never touched directly.
pub struct RendezvousBarrier {
    worker_paused: Semaphore,
    resume_worker: Semaphore,
}

impl RendezvousBarrier {
    /// Create a barrier and split it into its controller and worker sides.
    ///
    /// The worker side is typically moved into the worker routine (often via
    /// [`crate::harness::WorkerContext`]); the controller side stays with the test
    /// thread. Each side only exposes the operations its thread is allowed to perform.
    #[must_use]
    pub fn create() -> (ControllerSide, WorkerSide) {
        let barrier = Arc::new(RendezvousBarrier {
            worker_paused: Semaphore::new(0),
            resume_worker: Semaphore::new(0),
        });

        (
            ControllerSide {
                barrier: Arc::clone(&barrier),
            },
            WorkerSide { barrier },
        )
    }
}

/// The controller's half of a [`RendezvousBarrier`].
///
/// Owned by the thread driving the inspection. Blocks in [`ControllerSide::wait_until_paused`]
/// and releases the worker with [`ControllerSide::release_worker`] once inspection is done.
pub struct ControllerSide {
    barrier: Arc<RendezvousBarrier>,
}

impl ControllerSide {
    /// Block until the worker has signaled the pause point.
    ///
    /// The worker's [`WorkerSide::signal_paused`] happens-before this returns. The wait
    /// is unbounded; a cooperating worker is assumed. Use
    /// [`ControllerSide::wait_until_paused_timeout`] for a bounded variant.
    ///
    /// # Errors
    /// Returns [`Error::LockError`] if the barrier's internal lock was poisoned.
    pub fn wait_until_paused(&self) -> Result<()> {
        self.barrier.worker_paused.acquire()
    }

    /// Block until the worker has signaled the pause point, or fail after `timeout`.
    ///
    /// ## Arguments
    /// * 'timeout' - Maximum time to wait for the pause signal
    ///
    /// # Errors
    /// Returns [`Error::BarrierTimeout`] if the worker never signaled within the
    /// deadline, or [`Error::LockError`] if the barrier's internal lock was poisoned.
    pub fn wait_until_paused_timeout(&self, timeout: Duration) -> Result<()> {
        if self.barrier.worker_paused.acquire_timeout(timeout)? {
            Ok(())
        } else {
            Err(Error::BarrierTimeout { waited: timeout })
        }
    }

    /// Unblock the worker's [`WorkerSide::await_resume`].
    ///
    /// Call only after all inspection and mutation is finished; this release
    /// happens-before the worker's `await_resume` returns.
    pub fn release_worker(&self) {
        self.barrier.resume_worker.release();
    }
}

/// The worker's half of a [`RendezvousBarrier`].
///
/// Moved into the worker routine. The worker signals the pause point with
/// [`WorkerSide::signal_paused`], then parks in [`WorkerSide::await_resume`];
/// [`WorkerSide::pause`] does both.
pub struct WorkerSide {
    barrier: Arc<RendezvousBarrier>,
}

impl WorkerSide {
    /// Signal that the worker has reached the pause point.
    ///
    /// Wakes exactly one controller waiter and returns immediately; the worker is not
    /// blocked beyond releasing the signal.
    pub fn signal_paused(&self) {
        self.barrier.worker_paused.release();
    }

    /// Block until the controller calls [`ControllerSide::release_worker`].
    ///
    /// Callable only after [`WorkerSide::signal_paused`]; by the time this returns, the
    /// controller has finished all inspection and mutation.
    ///
    /// # Errors
    /// Returns [`Error::LockError`] if the barrier's internal lock was poisoned.
    pub fn await_resume(&self) -> Result<()> {
        self.barrier.resume_worker.acquire()
    }

    /// Signal the pause point and block until released - the standard safepoint call.
    ///
    /// # Errors
    /// Returns [`Error::LockError`] if the barrier's internal lock was poisoned.
    pub fn pause(&self) -> Result<()> {
        self.signal_paused();
        self.await_resume()
    }
}
