use std::time::Duration;

use thiserror::Error;

use crate::runtime::{RoutineId, SlotKind, ThreadToken};

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// This enum covers every failure mode of the pause/suspend/inspect/resume cycle. The
/// variants split into three families:
///
/// # Error Categories
///
/// ## Coordination Errors
/// - [`Error::BarrierTimeout`] - The worker never signaled the pause point
/// - [`Error::WorkerHang`] - The worker did not terminate within the join deadline
/// - [`Error::WorkerRoutine`] - The worker routine itself failed or panicked
///
/// ## Suspension Errors
/// - [`Error::SuspendRefused`] - The runtime refused to suspend the thread
/// - [`Error::ThreadExited`] - The target thread terminated before suspension
/// - [`Error::ResumeFailed`] - The runtime refused to resume a suspended thread
/// - [`Error::ThreadNotFound`] - No thread is registered under the given token
/// - [`Error::ThreadNotSuspended`] - Inspection was attempted on a running thread
///
/// ## Inspection Errors
/// - [`Error::FrameNotFound`] - No stack frame executes the target routine
/// - [`Error::VariableNotFound`] - No live variable matches name and location
/// - [`Error::UnknownRoutine`] - The routine has no registered variable table
/// - [`Error::InvalidFrame`] - Frame depth beyond the thread's stack
/// - [`Error::SlotOutOfRange`] - Slot index negative or beyond the frame's slot count
/// - [`Error::SlotTypeMismatch`] - Slot access with the wrong declared kind
///
/// The last three form the *recoverable* family (see [`Error::is_invalid_slot`]): they are
/// the controlled failures that deliberately-adversarial "bad slot" operations trigger and
/// assert on. Everything else is fatal to the session it occurred in.
#[derive(Error, Debug)]
pub enum Error {
    /// The worker thread never reached the pause point within the configured deadline.
    ///
    /// Only produced when a bounded wait was requested via
    /// [`crate::harness::PauseConfig::pause_timeout`]; the default wait is unbounded.
    #[error("Worker never signaled the pause point within {waited:?}")]
    BarrierTimeout {
        /// How long the controller waited before giving up
        waited: Duration,
    },

    /// The worker thread did not terminate within the configured join deadline.
    ///
    /// Distinct from [`Error::BarrierTimeout`]: the worker paused and was released, but
    /// never finished its routine. Only produced when
    /// [`crate::harness::PauseConfig::join_timeout`] is set.
    #[error("Worker '{label}' still running after {waited:?}")]
    WorkerHang {
        /// Diagnostic label of the worker thread
        label: String,
        /// How long the controller waited for termination
        waited: Duration,
    },

    /// The runtime refused to suspend the target thread.
    #[error("Runtime refused to suspend thread {thread}: {reason}")]
    SuspendRefused {
        /// Token of the thread that could not be suspended
        thread: ThreadToken,
        /// Runtime-supplied reason for the refusal
        reason: String,
    },

    /// The target thread already terminated.
    ///
    /// Raised when suspension (or any other per-thread request) names a thread whose
    /// routine has already returned.
    #[error("Thread {0} has already exited")]
    ThreadExited(ThreadToken),

    /// The runtime refused to resume a suspended thread.
    ///
    /// This is the one error that can leave a target thread permanently frozen, which is
    /// why the suspension guard logs it loudly on every exit path.
    #[error("Runtime refused to resume thread {thread}: {reason}")]
    ResumeFailed {
        /// Token of the thread that could not be resumed
        thread: ThreadToken,
        /// Runtime-supplied reason for the refusal
        reason: String,
    },

    /// No thread is registered under the given token.
    #[error("No thread registered for token {0}")]
    ThreadNotFound(ThreadToken),

    /// A stack or slot access was attempted while the target thread was not suspended.
    ///
    /// Frame contents are only well-defined while the thread is frozen; the runtime
    /// rejects anything else.
    #[error("Thread {0} is not suspended")]
    ThreadNotSuspended(ThreadToken),

    /// No frame on the suspended thread's stack executes the target routine.
    ///
    /// This is a harness invariant violation - the routine is on the stack by
    /// construction of the test - and therefore fatal, never a soft negative.
    #[error("No stack frame found executing routine '{routine}'")]
    FrameNotFound {
        /// The routine that was searched for
        routine: RoutineId,
    },

    /// No variable in the routine's table is live at the location under the given name.
    #[error("No live variable '{name}' in routine '{routine}' at location {location}")]
    VariableNotFound {
        /// The routine whose variable table was scanned
        routine: RoutineId,
        /// The declared variable name that was searched for
        name: String,
        /// The program location the live range had to cover
        location: u64,
    },

    /// The routine has no variable table registered with the runtime.
    #[error("Routine '{0}' has no registered variable table")]
    UnknownRoutine(RoutineId),

    /// The requested frame depth is beyond the thread's current stack.
    #[error("Frame depth {depth} out of range, thread has {frame_count} frames")]
    InvalidFrame {
        /// The requested depth (0 = innermost)
        depth: usize,
        /// Number of frames actually on the stack
        frame_count: usize,
    },

    /// The slot index is negative or beyond the frame's declared slot count.
    ///
    /// This is the primary documented edge case of the whole system: bad indices must
    /// fail predictably, without corrupting adjacent slots or crashing the process.
    #[error("Slot index {index} out of range, frame declares {slot_count} slots")]
    SlotOutOfRange {
        /// The requested slot index (may be negative - that is test data, not a bug)
        index: i32,
        /// Number of slots the frame declares
        slot_count: usize,
    },

    /// The slot exists but holds a different kind than the access declared.
    #[error("Slot {index} is declared {actual}, access requested {expected}")]
    SlotTypeMismatch {
        /// The requested slot index
        index: i32,
        /// The kind the access declared
        expected: SlotKind,
        /// The kind the slot actually holds
        actual: SlotKind,
    },

    /// The worker routine failed or panicked.
    ///
    /// Raised from [`crate::harness::WorkerHandle::join`], wrapping whatever the routine
    /// returned or panicked with so worker failures are never silently swallowed.
    #[error("Worker '{label}' failed: {message}")]
    WorkerRoutine {
        /// Diagnostic label of the worker thread
        label: String,
        /// The routine's error message or panic payload
        message: String,
    },

    /// Failed to lock an internal synchronization primitive (poisoned lock).
    #[error("Failed to lock target")]
    LockError,

    /// Thread spawn or other I/O error.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns `true` for the recoverable invalid-slot family.
    ///
    /// These are the controlled failures produced by bad indices, bad depths and kind
    /// mismatches. The batch driver catches them per-operation and reports them instead
    /// of aborting, so the remaining operations in the batch still execute.
    #[must_use]
    pub fn is_invalid_slot(&self) -> bool {
        matches!(
            self,
            Error::InvalidFrame { .. }
                | Error::SlotOutOfRange { .. }
                | Error::SlotTypeMismatch { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_slot_family() {
        assert!(Error::SlotOutOfRange {
            index: -1,
            slot_count: 3
        }
        .is_invalid_slot());
        assert!(Error::SlotTypeMismatch {
            index: 0,
            expected: SlotKind::Object,
            actual: SlotKind::Int
        }
        .is_invalid_slot());
        assert!(Error::InvalidFrame {
            depth: 9,
            frame_count: 1
        }
        .is_invalid_slot());

        assert!(!Error::ThreadNotSuspended(ThreadToken::new(1)).is_invalid_slot());
        assert!(!Error::FrameNotFound {
            routine: RoutineId::new("target")
        }
        .is_invalid_slot());
    }

    #[test]
    fn display_messages() {
        let err = Error::SlotOutOfRange {
            index: 102,
            slot_count: 2,
        };
        assert_eq!(
            err.to_string(),
            "Slot index 102 out of range, frame declares 2 slots"
        );

        let err = Error::BarrierTimeout {
            waited: Duration::from_millis(250),
        };
        assert!(err.to_string().contains("pause point"));
    }
}
