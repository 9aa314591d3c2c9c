use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::runtime::{ThreadToken, WorkerHost};
use crate::sync::WorkerSide;
use crate::{Error, Result};

/// Everything a worker routine receives: its runtime thread handle and its half of the
/// rendezvous barrier.
///
/// The routine reaches its pause point by calling [`WorkerContext::pause`] (or the two
/// barrier halves separately through [`WorkerContext::gate`]).
pub struct WorkerContext<T> {
    /// The worker-side runtime handle (for [`crate::runtime::ShadowRuntime`] this is a
    /// [`crate::runtime::ShadowThread`])
    pub thread: T,
    gate: WorkerSide,
}

impl<T> WorkerContext<T> {
    /// Signal the pause point and block until the controller releases the worker.
    ///
    /// # Errors
    /// Returns [`Error::LockError`] if the barrier's internal lock was poisoned.
    pub fn pause(&self) -> Result<()> {
        self.gate.pause()
    }

    /// The worker's half of the rendezvous barrier.
    #[must_use]
    pub fn gate(&self) -> &WorkerSide {
        &self.gate
    }
}

/// Owns one spawned worker thread: the OS thread handle, the runtime token, and the
/// diagnostic label.
///
/// One OS thread is created per spawn; threads are not pooled or reused. Joining
/// captures routine errors and panics and re-raises them as
/// [`Error::WorkerRoutine`], so a failing worker is never silently swallowed.
pub struct WorkerHandle {
    label: String,
    token: ThreadToken,
    join: Option<thread::JoinHandle<Result<()>>>,
    done: mpsc::Receiver<()>,
}

impl WorkerHandle {
    /// The runtime token of the worker thread.
    #[must_use]
    pub fn token(&self) -> ThreadToken {
        self.token
    }

    /// The diagnostic label of the worker thread.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Block until the worker thread has fully terminated.
    ///
    /// # Errors
    /// Returns [`Error::WorkerRoutine`] wrapping the routine's error or panic payload.
    pub fn join(mut self) -> Result<()> {
        self.join_inner()
    }

    /// Block until the worker thread terminates, or fail after `timeout`.
    ///
    /// ## Arguments
    /// * 'timeout' - Maximum time to wait for termination
    ///
    /// # Errors
    /// Returns [`Error::WorkerHang`] if the worker is still running at the deadline, or
    /// [`Error::WorkerRoutine`] wrapping a routine failure.
    pub fn join_timeout(mut self, timeout: Duration) -> Result<()> {
        match self.done.recv_timeout(timeout) {
            // Completion signal or sender dropped mid-panic: the thread is finishing,
            // the real join below is quick either way.
            Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => self.join_inner(),
            Err(mpsc::RecvTimeoutError::Timeout) => Err(Error::WorkerHang {
                label: self.label.clone(),
                waited: timeout,
            }),
        }
    }

    fn join_inner(&mut self) -> Result<()> {
        let Some(handle) = self.join.take() else {
            return Ok(());
        };

        match handle.join() {
            Ok(Ok(())) => Ok(()),
            Ok(Err(error)) => Err(Error::WorkerRoutine {
                label: self.label.clone(),
                message: error.to_string(),
            }),
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "worker panicked".to_string());
                Err(Error::WorkerRoutine {
                    label: self.label.clone(),
                    message,
                })
            }
        }
    }
}

/// Launch `routine` on a new worker thread attached to `host`.
///
/// The routine receives a [`WorkerContext`] holding its runtime thread handle and the
/// worker side of the barrier, and is expected to call [`WorkerContext::pause`] at its
/// designated pause point. Returns immediately; the caller blocks later in
/// [`WorkerHandle::join`].
///
/// ## Arguments
/// * 'host'    - The runtime to attach the new thread to
/// * 'label'   - Human-readable label (routine + operation) used for diagnostics
/// * 'gate'    - The worker side of the session's rendezvous barrier
/// * 'routine' - The worker routine
///
/// # Errors
/// Returns [`Error::Io`] if the OS thread could not be spawned.
pub fn spawn_worker<H, F>(
    host: &H,
    label: &str,
    gate: WorkerSide,
    routine: F,
) -> Result<WorkerHandle>
where
    H: WorkerHost,
    F: FnOnce(WorkerContext<H::Thread>) -> Result<()> + Send + 'static,
{
    let (token, thread) = host.attach_thread(label);
    let (done_tx, done_rx) = mpsc::channel();

    let context = WorkerContext { thread, gate };
    let join = thread::Builder::new()
        .name(label.to_string())
        .spawn(move || {
            let result = routine(context);
            // Best effort: the receiver may already be gone when nobody joins.
            let _ = done_tx.send(());
            result
        })?;

    log::debug!("spawned worker '{label}' as thread {token}");

    Ok(WorkerHandle {
        label: label.to_string(),
        token,
        join: Some(join),
        done: done_rx,
    })
}
