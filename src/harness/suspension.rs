use crate::runtime::{InspectionRuntime, ThreadToken};
use crate::Result;

/// Scoped thread suspension: suspend on acquire, resume on every exit path.
///
/// Once [`SuspendGuard::acquire`] has succeeded the target thread is frozen and a resume
/// is owed no matter what inspection does - including when it fails. Prefer the explicit
/// [`SuspendGuard::release`], which surfaces a resume failure to the caller; if the
/// guard is instead dropped (early return, propagated error), the resume is still
/// attempted and a failure is logged at error level, because a thread that cannot be
/// resumed stays frozen for good.
pub struct SuspendGuard<'a> {
    runtime: &'a dyn InspectionRuntime,
    thread: ThreadToken,
    active: bool,
}

impl<'a> SuspendGuard<'a> {
    /// Suspend `thread` and return a guard owing its resume.
    ///
    /// ## Arguments
    /// * 'runtime' - The runtime controlling the thread
    /// * 'thread'  - The thread to freeze
    ///
    /// # Errors
    /// Returns [`crate::Error::ThreadExited`], [`crate::Error::ThreadNotFound`] or
    /// [`crate::Error::SuspendRefused`] if the thread could not be suspended; no guard
    /// is created in that case and nothing needs resuming.
    pub fn acquire(runtime: &'a dyn InspectionRuntime, thread: ThreadToken) -> Result<Self> {
        runtime.suspend(thread)?;
        log::debug!("suspended thread {thread}");
        Ok(SuspendGuard {
            runtime,
            thread,
            active: true,
        })
    }

    /// The suspended thread's token.
    #[must_use]
    pub fn thread(&self) -> ThreadToken {
        self.thread
    }

    /// Resume the thread explicitly, surfacing any resume failure.
    ///
    /// # Errors
    /// Returns [`crate::Error::ResumeFailed`] if the runtime refused the resume. The
    /// guard is consumed either way; the drop path will not attempt a second resume.
    pub fn release(mut self) -> Result<()> {
        self.active = false;
        let result = self.runtime.resume(self.thread);
        match &result {
            Ok(()) => log::debug!("resumed thread {}", self.thread),
            Err(error) => log::error!(
                "failed to resume thread {}: {error} - target may remain frozen",
                self.thread
            ),
        }
        result
    }
}

impl Drop for SuspendGuard<'_> {
    fn drop(&mut self) {
        if !self.active {
            return;
        }
        if let Err(error) = self.runtime.resume(self.thread) {
            // No way to recover without runtime cooperation; make sure it is seen.
            log::error!(
                "failed to resume thread {} on guard drop: {error} - target may remain frozen",
                self.thread
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{ShadowRuntime, SlotKind, WorkerHost};
    use crate::Error;

    #[test]
    fn guard_resumes_on_drop() {
        let runtime = ShadowRuntime::new();
        let routine = runtime.register_routine("target", Vec::new());
        let (token, worker) = runtime.attach_thread("w");
        worker.push_frame(&routine, Vec::new(), 0).unwrap();

        {
            let _guard = SuspendGuard::acquire(&runtime, token).unwrap();
            assert!(runtime.stack_trace(token).is_ok());
        }

        // Resumed by the drop: inspection is rejected again.
        assert!(matches!(
            runtime.stack_trace(token),
            Err(Error::ThreadNotSuspended(_))
        ));
    }

    #[test]
    fn explicit_release_resumes_once() {
        let runtime = ShadowRuntime::new();
        let (token, _worker) = runtime.attach_thread("w");

        let guard = SuspendGuard::acquire(&runtime, token).unwrap();
        guard.release().unwrap();

        // A second resume must fail: the drop path did not double-release.
        assert!(matches!(
            runtime.resume(token),
            Err(Error::ResumeFailed { .. })
        ));
    }

    #[test]
    fn acquire_fails_on_exited_thread() {
        let runtime = ShadowRuntime::new();
        let (token, worker) = runtime.attach_thread("w");
        drop(worker);

        assert!(matches!(
            SuspendGuard::acquire(&runtime, token),
            Err(Error::ThreadExited(_))
        ));
    }

    #[test]
    fn nested_guards() {
        let runtime = ShadowRuntime::new();
        let (token, _worker) = runtime.attach_thread("w");

        let outer = SuspendGuard::acquire(&runtime, token).unwrap();
        let inner = SuspendGuard::acquire(&runtime, token).unwrap();
        inner.release().unwrap();

        // Still suspended by the outer guard.
        assert!(matches!(
            runtime.get_local(token, 0, 0, SlotKind::Int),
            Err(Error::InvalidFrame { .. })
        ));
        outer.release().unwrap();
    }
}
