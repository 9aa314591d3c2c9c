//! # framescope Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and
//! functions across the library, allowing test authors a single glob import:
//!
//! ```rust,no_run
//! use framescope::prelude::*;
//!
//! let runtime = ShadowRuntime::new();
//! let target = runtime.register_routine("target", Vec::new());
//! ```

pub use crate::harness::{
    find_frame, find_variable_in_scope, run_with_pause, slot_operation, spawn_worker, Access,
    FrameSnapshot, HarnessState, OperationReport, PauseConfig, PauseSession, SlotAccessor,
    SlotDescriptor, SlotOperation, SuspendGuard, WorkerContext, WorkerHandle,
};
pub use crate::report::IdentityMap;
pub use crate::runtime::{
    FrameInfo, InspectionRuntime, ObjectRef, RoutineId, ShadowRuntime, ShadowThread, SlotKind,
    SlotValue, ThreadToken, VariableTableEntry, WorkerHost,
};
pub use crate::sync::{ControllerSide, RendezvousBarrier, Semaphore, WorkerSide};
pub use crate::{Error, Result};
