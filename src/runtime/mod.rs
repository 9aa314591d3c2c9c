//! The runtime seam: inspection traits, identities and the shadow reference runtime.
//!
//! The harness never talks to a thread's stack directly - everything goes through the
//! [`InspectionRuntime`] trait, which is the Rust rendering of the debugger-agent
//! surface (suspend/resume, stack traces, typed local-variable access, variable tables).
//! Any runtime that can freeze a thread and expose its frames can sit behind it; this
//! crate ships [`ShadowRuntime`], an in-process implementation backed by explicit shadow
//! stacks, so the harness is fully exercisable without a host VM.
//!
//! # Key Types
//!
//! - [`InspectionRuntime`] - controller-side trait: suspend, resume, stack walk, slot access
//! - [`WorkerHost`] - attaches a new worker thread to a runtime
//! - [`ShadowRuntime`] / [`ShadowThread`] - the reference implementation
//! - [`ThreadToken`] / [`RoutineId`] - identities for threads and routines
//! - [`FrameInfo`] / [`VariableTableEntry`] - stack-walk and debug-metadata records
//! - [`SlotKind`] / [`SlotValue`] / [`ObjectRef`] - the typed value model
//!
//! # Depth Convention
//!
//! Stack walks are innermost-first: depth 0 is the frame closest to the suspension
//! point, matching the convention of debugger stack-trace interfaces.

mod shadow;
mod value;

pub use shadow::{ShadowRuntime, ShadowThread};
pub use value::{ObjectRef, SlotKind, SlotValue};

use std::fmt;
use std::sync::Arc;

use crate::Result;

/// An opaque identity for a thread registered with a runtime.
///
/// Tokens are issued by the runtime when a worker is attached and stay valid for
/// diagnostics after the thread exits (per-thread requests against an exited thread fail
/// with [`crate::Error::ThreadExited`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThreadToken(u64);

impl ThreadToken {
    /// Creates a token from a raw value.
    #[must_use]
    pub fn new(value: u64) -> Self {
        ThreadToken(value)
    }

    /// Returns the raw token value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ThreadToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The identity of a routine (the unit a stack frame executes).
///
/// Cheap to clone and hashable; used both as the frame-match key during stack walks and
/// as the lookup key for registered variable tables.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoutineId(Arc<str>);

impl RoutineId {
    /// Creates a routine identity from its name.
    #[must_use]
    pub fn new(name: &str) -> Self {
        RoutineId(Arc::from(name))
    }

    /// Returns the routine name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoutineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoutineId {
    fn from(name: &str) -> Self {
        RoutineId::new(name)
    }
}

/// One frame of a suspended thread's stack, as reported by a stack walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameInfo {
    /// The routine this frame executes
    pub routine: RoutineId,
    /// Distance from the suspension point (0 = innermost)
    pub depth: usize,
    /// The frame's current program location
    pub location: u64,
}

/// One entry of a routine's compile-time local-variable table.
///
/// A variable is visible at location `loc` when
/// `start_location <= loc < start_location + length`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableTableEntry {
    /// The declared variable name
    pub name: String,
    /// The slot index the variable occupies
    pub slot: i32,
    /// The declared slot kind
    pub kind: SlotKind,
    /// First program location at which the variable is live
    pub start_location: u64,
    /// Length of the live range
    pub length: u64,
}

impl VariableTableEntry {
    /// `true` if the variable's live range covers `location`.
    #[must_use]
    pub fn covers(&self, location: u64) -> bool {
        location >= self.start_location && location < self.start_location + self.length
    }
}

/// Controller-side access to a runtime that can freeze threads and expose their frames.
///
/// All methods take `&self`; implementations are expected to be internally synchronized
/// and shareable across the controller's call sites. The trait is object-safe so the
/// inspection machinery ([`crate::harness`]) can work against `&dyn InspectionRuntime`.
///
/// # Contract
///
/// - [`InspectionRuntime::suspend`] freezes the thread's visible execution state; reads
///   after a successful suspend are consistent and writes take effect atomically from
///   the worker's perspective. Suspending an exited thread fails.
/// - [`InspectionRuntime::resume`] reverses one suspension. Callers must pair every
///   successful suspend with a resume on every exit path - use
///   [`crate::harness::SuspendGuard`] rather than calling these directly.
/// - Stack and slot accessors require the thread to be suspended and fail with
///   [`crate::Error::ThreadNotSuspended`] otherwise.
/// - Slot accessors validate index and kind, failing with
///   [`crate::Error::SlotOutOfRange`] / [`crate::Error::SlotTypeMismatch`] instead of
///   returning garbage; a failed access never alters any other slot.
pub trait InspectionRuntime {
    /// Freeze the given thread's visible execution state.
    ///
    /// Suspensions nest: each successful call must be matched by one
    /// [`InspectionRuntime::resume`].
    ///
    /// # Errors
    /// [`crate::Error::ThreadExited`] if the thread already terminated,
    /// [`crate::Error::ThreadNotFound`] for an unknown token,
    /// [`crate::Error::SuspendRefused`] if the runtime declines.
    fn suspend(&self, thread: ThreadToken) -> Result<()>;

    /// Reverse one suspension of the given thread.
    ///
    /// # Errors
    /// [`crate::Error::ResumeFailed`] if the thread is not suspended or the runtime
    /// declines, [`crate::Error::ThreadNotFound`] for an unknown token.
    fn resume(&self, thread: ThreadToken) -> Result<()>;

    /// Walk the suspended thread's stack, innermost frame first.
    ///
    /// The returned trace is a one-shot snapshot reflecting state at call time.
    ///
    /// # Errors
    /// [`crate::Error::ThreadNotSuspended`] if the thread is running.
    fn stack_trace(&self, thread: ThreadToken) -> Result<Vec<FrameInfo>>;

    /// Read a local-variable slot of the frame at `depth`.
    ///
    /// ## Arguments
    /// * 'thread' - The suspended target thread
    /// * 'depth'  - Frame depth, 0 = innermost
    /// * 'slot'   - Slot index; negative and out-of-range values are rejected
    /// * 'kind'   - The kind the caller expects the slot to hold
    ///
    /// # Errors
    /// [`crate::Error::InvalidFrame`], [`crate::Error::SlotOutOfRange`],
    /// [`crate::Error::SlotTypeMismatch`] or [`crate::Error::ThreadNotSuspended`].
    fn get_local(
        &self,
        thread: ThreadToken,
        depth: usize,
        slot: i32,
        kind: SlotKind,
    ) -> Result<SlotValue>;

    /// Write a local-variable slot of the frame at `depth`.
    ///
    /// The write becomes visible to the worker once it resumes. Validation is identical
    /// to [`InspectionRuntime::get_local`], with the expected kind taken from `value`.
    ///
    /// # Errors
    /// [`crate::Error::InvalidFrame`], [`crate::Error::SlotOutOfRange`],
    /// [`crate::Error::SlotTypeMismatch`] or [`crate::Error::ThreadNotSuspended`].
    fn set_local(
        &self,
        thread: ThreadToken,
        depth: usize,
        slot: i32,
        value: SlotValue,
    ) -> Result<()>;

    /// The compile-time local-variable table of a routine.
    ///
    /// Depends only on static debug metadata; stable across calls.
    ///
    /// # Errors
    /// [`crate::Error::UnknownRoutine`] if no table is registered for the routine.
    fn variable_table(&self, routine: &RoutineId) -> Result<Vec<VariableTableEntry>>;
}

/// A runtime that can attach new worker threads.
///
/// Separated from [`InspectionRuntime`] because attaching is the one operation that
/// yields a *worker-side* value: the handle the routine uses to maintain its own frames.
/// The handle type is runtime-specific (for [`ShadowRuntime`] it is [`ShadowThread`]).
pub trait WorkerHost {
    /// The worker-side thread handle moved into the routine.
    type Thread: Send + 'static;

    /// Register a new thread, returning its token and the worker-side handle.
    ///
    /// ## Arguments
    /// * 'label' - Human-readable thread label used for diagnostics
    fn attach_thread(&self, label: &str) -> (ThreadToken, Self::Thread);
}
