//! Two-party synchronization primitives for pause coordination.
//!
//! This module contains the low-level signaling machinery the harness is built on:
//!
//! - [`Semaphore`] - a counting semaphore on `Mutex` + `Condvar`, used here exclusively
//!   in its binary form as a one-shot signal
//! - [`RendezvousBarrier`] - the two-phase rendezvous between a worker thread and the
//!   controller, split into a [`ControllerSide`] and a [`WorkerSide`] so each thread can
//!   only ever touch its own half of the handshake
//!
//! # Ordering Guarantees
//!
//! The barrier preserves two happens-before edges, and they are the foundation of the
//! whole harness:
//!
//! 1. The worker's `signal_paused` happens-before the controller's `wait_until_paused`
//!    returns - the controller never inspects a thread that has not reached its pause
//!    point.
//! 2. The controller's `release_worker` happens-before the worker's `await_resume`
//!    returns - the worker never runs past the pause point while inspection is still in
//!    progress.
//!
//! Each signal corresponds to exactly one paired wait; there are no spurious wakeups
//! observable through this API.

mod rendezvous;
mod semaphore;

pub use rendezvous::{ControllerSide, RendezvousBarrier, WorkerSide};
pub use semaphore::Semaphore;
