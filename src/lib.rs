// Copyright 2025 The framescope authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
#![allow(dead_code)]

//! # framescope
//!
//! A thread suspension and stack-frame inspection harness: pause a running worker
//! thread at a known program point, freeze it at the runtime level, read and mutate its
//! local-variable slots from a controller thread, and resume it - with the guarantee
//! that the worker never observes inconsistent state and the controller never proceeds
//! before the worker has actually reached the pause point.
//!
//! This is the coordination core of a debugger-agent test harness, generalized into a
//! library: test authors supply a worker routine and a batch of typed slot operations,
//! and the harness drives the full cycle, reporting each operation's outcome
//! individually so that deliberately-invalid accesses (bad indices, wrong kinds) fail
//! cleanly without aborting the batch.
//!
//! ## Architecture
//!
//! - [`sync`] - the two-party rendezvous barrier (two binary semaphores) carrying the
//!   pause/resume handshake with its happens-before guarantees
//! - [`runtime`] - the [`runtime::InspectionRuntime`] trait (suspend/resume, stack
//!   walks, typed slot access, variable tables) plus [`runtime::ShadowRuntime`], an
//!   in-process reference implementation backed by explicit shadow stacks
//! - [`harness`] - worker spawning and joining, scoped suspension, frame location, slot
//!   operations, and the [`harness::PauseSession`] driver
//! - [`report`] - per-session object-identity labeling for readable outcome reports
//! - [`Error`] and [`Result`] - comprehensive error handling
//!
//! ## Quick Start
//!
//! ```rust
//! use framescope::prelude::*;
//!
//! let runtime = ShadowRuntime::new();
//! let target = runtime.register_routine("target", Vec::new());
//!
//! // Read the int in slot 0 of the target frame while the worker is paused.
//! let operations = vec![slot_operation(
//!     SlotKind::Int,
//!     SlotDescriptor::new(0, SlotKind::Int),
//!     Access::Get,
//! )];
//!
//! let frame_routine = target.clone();
//! let reports = run_with_pause(
//!     &runtime,
//!     &target,
//!     "target-GetInt",
//!     move |cx| {
//!         cx.thread.push_frame(&frame_routine, vec![SlotValue::Int(42)], 0)?;
//!         cx.pause()?; // safepoint: inspection happens here
//!         cx.thread.pop_frame()
//!     },
//!     &operations,
//! )?;
//!
//! assert_eq!(reports[0].outcome, "read 42");
//! # Ok::<(), framescope::Error>(())
//! ```
//!
//! ## Concurrency Model
//!
//! Exactly two threads participate per session: the controller and one worker. The
//! rendezvous barrier is the only inter-thread channel; the worker's stack is the one
//! shared mutable resource and is only ever touched by the controller while the thread
//! is suspended, enforced by [`harness::SuspendGuard`]'s acquire/release discipline.
//! Waits are unbounded by default (a cooperating worker is assumed);
//! [`harness::PauseConfig`] opts into bounded waits that surface
//! [`Error::BarrierTimeout`] and [`Error::WorkerHang`].

pub(crate) mod error;

/// Commonly used types, re-exported for glob import.
///
/// ```rust,no_run
/// use framescope::prelude::*;
///
/// let runtime = ShadowRuntime::new();
/// let target = runtime.register_routine("target", Vec::new());
/// ```
pub mod prelude;

/// Two-party synchronization primitives for pause coordination.
///
/// The [`sync::RendezvousBarrier`] and the [`sync::Semaphore`] it is built from. See
/// the module documentation for the ordering guarantees.
pub mod sync;

/// The runtime seam: inspection traits, identities, values and the shadow runtime.
///
/// - [`runtime::InspectionRuntime`] - controller-side suspend/resume/stack/slot access
/// - [`runtime::WorkerHost`] - attaching worker threads
/// - [`runtime::ShadowRuntime`] - the in-process reference implementation
/// - [`runtime::SlotValue`] / [`runtime::ObjectRef`] - the typed value model
pub mod runtime;

/// The inspection harness: worker lifecycle, scoped suspension, frame location, slot
/// operations and the [`harness::PauseSession`] driver.
pub mod harness;

/// Diagnostic rendering: the per-session [`report::IdentityMap`] and value formatting.
pub mod report;

pub use error::Error;

/// Convenience alias for a [`core::result::Result`] with this crate's [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
