//! The inspection harness: worker lifecycle, scoped suspension, frame location and the
//! session driver.
//!
//! This module wires the primitives into the full pause/suspend/inspect/resume cycle.
//! The moving parts, leaf first:
//!
//! - [`spawn_worker`] / [`WorkerHandle`] - launch the target routine on its own thread
//!   and join it with failures wrapped, never swallowed
//! - [`SuspendGuard`] - scoped runtime suspension; resume happens on every exit path
//! - [`find_frame`] / [`find_variable_in_scope`] - locate the frame executing the target
//!   routine and resolve variables from static debug metadata
//! - [`SlotAccessor`] + [`SlotOperation`] - typed get/set against located slots,
//!   one operation implementation per slot kind, built by [`slot_operation`]
//! - [`PauseSession`] / [`run_with_pause`] - the driver tying it all together
//!
//! # Session Life Cycle
//!
//! Each session moves through the states of [`HarnessState`]:
//!
//! ```text
//! Created -> WorkerRunning -> WorkerPaused -> ThreadSuspended
//!        -> Inspecting -> ThreadResumed -> WorkerReleased -> Joined
//! ```
//!
//! `Joined` is terminal. An error during inspection still transitions through
//! `ThreadResumed -> WorkerReleased -> Joined`: the worker is never left frozen or
//! parked, and the error surfaces only after the cycle has unwound.
//!
//! # Failure Policy
//!
//! Recoverable failures (the invalid-slot family, see
//! [`crate::Error::is_invalid_slot`]) are caught per operation and converted into
//! [`OperationReport`]s so the rest of the batch still executes - a deliberate bad-slot
//! operation failing cleanly is a pass. Everything else is fatal to the session and is
//! returned once the worker has been resumed, released and joined.

mod accessor;
mod locator;
mod operation;
mod runner;
mod suspension;

pub use accessor::SlotAccessor;
pub use locator::{find_frame, find_variable_in_scope, FrameSnapshot, SlotDescriptor};
pub use operation::{
    slot_operation, Access, IntAccess, LongAccess, ObjectAccess, OperationReport, SlotOperation,
};
pub use runner::{spawn_worker, WorkerContext, WorkerHandle};
pub use suspension::SuspendGuard;

use std::time::Duration;

use strum::Display;

use crate::report::IdentityMap;
use crate::runtime::{InspectionRuntime, RoutineId, WorkerHost};
use crate::sync::RendezvousBarrier;
use crate::{Error, Result};

/// The observable state of one inspection session.
///
/// Drives nothing by itself - it is a diagnostic trail. The invariant that matters:
/// once a worker is running, every path ends in `WorkerReleased` and (unless the worker
/// hangs past a configured join deadline) `Joined`.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum HarnessState {
    /// Session constructed, worker not yet started
    Created,
    /// Worker thread spawned, pause signal not yet observed
    WorkerRunning,
    /// Worker has signaled the pause point and is parked at the barrier
    WorkerPaused,
    /// The runtime has frozen the worker's visible execution state
    ThreadSuspended,
    /// Operations are executing against the located frame
    Inspecting,
    /// The runtime suspension has been reversed
    ThreadResumed,
    /// The worker has been released from the barrier
    WorkerReleased,
    /// The worker thread has fully terminated
    Joined,
}

/// Bounded-wait configuration for a session.
///
/// The default is faithful to the classic harness: both waits are unbounded and a hung
/// worker hangs the session. Setting the timeouts surfaces
/// [`Error::BarrierTimeout`] / [`Error::WorkerHang`] instead, both clearly
/// distinguishable from inspection errors.
#[derive(Debug, Clone, Copy, Default)]
pub struct PauseConfig {
    /// Maximum wait for the worker to reach the pause point; `None` waits forever
    pub pause_timeout: Option<Duration>,
    /// Maximum wait for the worker to terminate after release; `None` waits forever
    pub join_timeout: Option<Duration>,
}

/// One pause/suspend/inspect/resume cycle against a target routine.
///
/// The session owns the coordination state for a single worker: it creates the
/// rendezvous barrier, spawns the worker, waits for the pause signal, suspends the
/// thread behind a [`SuspendGuard`], locates the target frame, applies a batch of
/// [`SlotOperation`]s, then resumes, releases and joins. The current [`HarnessState`] is
/// readable afterwards, including after a failed run.
///
/// # Examples
///
/// ```rust
/// use framescope::prelude::*;
///
/// let runtime = ShadowRuntime::new();
/// let target = runtime.register_routine("target", Vec::new());
///
/// let operations = vec![slot_operation(
///     SlotKind::Int,
///     SlotDescriptor::new(0, SlotKind::Int),
///     Access::Get,
/// )];
///
/// let mut session = PauseSession::new(&runtime, target.clone());
/// let frame_routine = target.clone();
/// let reports = session.run(
///     "target-GetInt",
///     move |cx| {
///         cx.thread.push_frame(&frame_routine, vec![SlotValue::Int(42)], 0)?;
///         cx.pause()?;
///         cx.thread.pop_frame()
///     },
///     &operations,
/// )?;
///
/// assert_eq!(reports[0].outcome, "read 42");
/// assert_eq!(session.state(), HarnessState::Joined);
/// # Ok::<(), framescope::Error>(())
/// ```
pub struct PauseSession<'a, R>
where
    R: InspectionRuntime + WorkerHost,
{
    runtime: &'a R,
    target: RoutineId,
    config: PauseConfig,
    state: HarnessState,
}

impl<'a, R> PauseSession<'a, R>
where
    R: InspectionRuntime + WorkerHost,
{
    /// Create a session targeting `routine` with unbounded waits.
    #[must_use]
    pub fn new(runtime: &'a R, target: RoutineId) -> PauseSession<'a, R> {
        PauseSession::with_config(runtime, target, PauseConfig::default())
    }

    /// Create a session with explicit wait configuration.
    #[must_use]
    pub fn with_config(
        runtime: &'a R,
        target: RoutineId,
        config: PauseConfig,
    ) -> PauseSession<'a, R> {
        PauseSession {
            runtime,
            target,
            config,
            state: HarnessState::Created,
        }
    }

    /// The session's current state; remains readable after [`PauseSession::run`].
    #[must_use]
    pub fn state(&self) -> HarnessState {
        self.state
    }

    fn transition(&mut self, next: HarnessState) {
        log::debug!("session '{}': {} -> {next}", self.target, self.state);
        self.state = next;
    }

    /// Execute one full cycle: spawn `routine`, wait for its pause, suspend, apply
    /// `operations` against the located target frame, resume, release, join.
    ///
    /// Returns one [`OperationReport`] per operation. Recoverable invalid-slot failures
    /// become reports and the batch continues; any other error aborts the batch but is
    /// only returned after the worker has been resumed, released and joined.
    ///
    /// ## Arguments
    /// * 'label'      - Diagnostic label for the worker thread (routine + operation)
    /// * 'routine'    - The worker routine; must call [`WorkerContext::pause`] once
    /// * 'operations' - The batch of slot operations to apply while suspended
    ///
    /// # Errors
    /// [`Error::BarrierTimeout`] / [`Error::WorkerHang`] for bounded-wait expiry,
    /// [`Error::FrameNotFound`] if the target routine is not on the stack,
    /// suspension/resume failures, and [`Error::WorkerRoutine`] wrapping worker
    /// failures or panics.
    pub fn run<F>(
        &mut self,
        label: &str,
        routine: F,
        operations: &[Box<dyn SlotOperation>],
    ) -> Result<Vec<OperationReport>>
    where
        F: FnOnce(WorkerContext<R::Thread>) -> Result<()> + Send + 'static,
    {
        let (controller, worker_gate) = RendezvousBarrier::create();
        let handle = spawn_worker(self.runtime, label, worker_gate, routine)?;
        let token = handle.token();
        self.transition(HarnessState::WorkerRunning);

        let paused = match self.config.pause_timeout {
            Some(timeout) => controller.wait_until_paused_timeout(timeout),
            None => controller.wait_until_paused(),
        };
        if let Err(error) = paused {
            // The worker never checked in. Release it anyway so a late pauser can get
            // out, give it a short grace to be collected, then surface the timeout.
            controller.release_worker();
            let _ = handle.join_timeout(Duration::from_millis(100));
            return Err(error);
        }
        self.transition(HarnessState::WorkerPaused);

        let runtime: &dyn InspectionRuntime = self.runtime;
        let mut reports = Vec::with_capacity(operations.len());
        let mut identities = IdentityMap::new();
        let mut fatal: Option<Error> = None;

        match SuspendGuard::acquire(runtime, token) {
            Ok(guard) => {
                self.transition(HarnessState::ThreadSuspended);
                match find_frame(runtime, token, &self.target) {
                    Ok(frame) => {
                        self.transition(HarnessState::Inspecting);
                        let accessor = SlotAccessor::new(runtime, token);
                        for operation in operations {
                            match operation.apply(&accessor, &frame) {
                                Ok(result) => reports.push(OperationReport::success(
                                    operation.name(),
                                    result.as_ref(),
                                    &mut identities,
                                )),
                                Err(error) if error.is_invalid_slot() => {
                                    log::warn!(
                                        "operation '{}' failed: {error}",
                                        operation.name()
                                    );
                                    reports.push(OperationReport::failure(
                                        operation.name(),
                                        &error,
                                    ));
                                }
                                Err(error) => {
                                    fatal = Some(error);
                                    break;
                                }
                            }
                        }
                    }
                    Err(error) => fatal = Some(error),
                }
                // Resume is owed unconditionally once suspend succeeded.
                if let Err(error) = guard.release() {
                    fatal.get_or_insert(error);
                }
                self.transition(HarnessState::ThreadResumed);
            }
            Err(error) => fatal = Some(error),
        }

        controller.release_worker();
        self.transition(HarnessState::WorkerReleased);

        let joined = match self.config.join_timeout {
            Some(timeout) => handle.join_timeout(timeout),
            None => handle.join(),
        };
        if !matches!(joined, Err(Error::WorkerHang { .. })) {
            // The thread terminated, successfully or not.
            self.transition(HarnessState::Joined);
        }

        if let Some(error) = fatal {
            return Err(error);
        }
        joined?;
        Ok(reports)
    }
}

/// Run one inspection cycle with default (unbounded-wait) configuration.
///
/// Convenience wrapper over [`PauseSession`]; see its documentation for the full
/// semantics and an example.
///
/// ## Arguments
/// * 'runtime'    - The runtime hosting the worker
/// * 'target'     - The routine whose frame the operations run against
/// * 'label'      - Diagnostic label for the worker thread
/// * 'routine'    - The worker routine; must call [`WorkerContext::pause`] once
/// * 'operations' - The batch of slot operations to apply while suspended
///
/// # Errors
/// Same failure modes as [`PauseSession::run`].
pub fn run_with_pause<R, F>(
    runtime: &R,
    target: &RoutineId,
    label: &str,
    routine: F,
    operations: &[Box<dyn SlotOperation>],
) -> Result<Vec<OperationReport>>
where
    R: InspectionRuntime + WorkerHost,
    F: FnOnce(WorkerContext<R::Thread>) -> Result<()> + Send + 'static,
{
    PauseSession::new(runtime, target.clone()).run(label, routine, operations)
}
