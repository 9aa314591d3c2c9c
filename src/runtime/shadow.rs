//! In-process reference runtime backed by explicit shadow stacks.
//!
//! [`ShadowRuntime`] implements the full [`InspectionRuntime`] surface without a host
//! VM: each attached worker thread maintains an explicit stack of [`ShadowThread`]
//! frames with typed slots, and every worker-side frame access is a safepoint. While a
//! thread is suspended its safepoints block, so the controller observes a consistent
//! frozen stack and the worker observes controller writes atomically - it is parked
//! either at the rendezvous barrier or at its next safepoint until resumed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

use dashmap::DashMap;

use crate::runtime::{
    FrameInfo, InspectionRuntime, RoutineId, SlotKind, SlotValue, ThreadToken,
    VariableTableEntry, WorkerHost,
};
use crate::{Error, Result};

/// One frame of a shadow stack: routine identity, current location, typed slots.
struct ShadowFrame {
    routine: RoutineId,
    location: u64,
    slots: Vec<SlotValue>,
}

/// The lock-protected per-thread state.
struct ThreadState {
    /// Outermost frame first, innermost last
    frames: Vec<ShadowFrame>,
    /// Nesting count of active suspensions
    suspend_count: u32,
    /// Cleared when the worker-side handle is dropped
    alive: bool,
}

/// Shared record for one attached thread.
struct ThreadRecord {
    state: Mutex<ThreadState>,
    unfrozen: Condvar,
}

impl ThreadRecord {
    fn lock(&self) -> Result<MutexGuard<'_, ThreadState>> {
        self.state.lock().map_err(|_| Error::LockError)
    }

    /// Lock the state, blocking while the thread is suspended.
    ///
    /// This is the freeze point: every worker-side access funnels through here, so a
    /// suspended thread cannot observe or modify its own frames until resumed.
    fn safepoint(&self) -> Result<MutexGuard<'_, ThreadState>> {
        let mut state = self.lock()?;
        while state.suspend_count > 0 {
            state = self.unfrozen.wait(state).map_err(|_| Error::LockError)?;
        }
        Ok(state)
    }
}

/// Resolve a mutable slot reference, validating depth, index and bounds.
///
/// Shared by the controller-side get and set paths so both reject exactly the same
/// inputs, and a rejected access provably touches nothing.
fn resolve_slot<'a>(
    state: &'a mut ThreadState,
    depth: usize,
    slot: i32,
) -> Result<&'a mut SlotValue> {
    let frame_count = state.frames.len();
    if depth >= frame_count {
        return Err(Error::InvalidFrame { depth, frame_count });
    }

    let frame = &mut state.frames[frame_count - 1 - depth];
    let slot_count = frame.slots.len();
    match usize::try_from(slot) {
        Ok(index) if index < slot_count => Ok(&mut frame.slots[index]),
        _ => Err(Error::SlotOutOfRange {
            index: slot,
            slot_count,
        }),
    }
}

/// An in-process runtime keeping a shadow stack per attached thread.
///
/// Workers are attached via [`WorkerHost::attach_thread`] and maintain their frames
/// through the returned [`ShadowThread`]; the controller inspects them through the
/// [`InspectionRuntime`] impl. Routine variable tables are registered up front with
/// [`ShadowRuntime::register_routine`] and served to the frame locator.
///
/// Thread records are kept after exit so late diagnostics (and the
/// [`crate::Error::ThreadExited`] failure mode) stay addressable; at harness scale the
/// registry never grows past a handful of entries per test.
///
/// # Examples
///
/// ```rust
/// use framescope::runtime::{ShadowRuntime, SlotValue, WorkerHost};
///
/// let runtime = ShadowRuntime::new();
/// let routine = runtime.register_routine("target", Vec::new());
/// let (_token, thread) = runtime.attach_thread("demo");
///
/// thread.push_frame(&routine, vec![SlotValue::Int(42)], 0)?;
/// assert_eq!(thread.load(0)?, SlotValue::Int(42));
/// thread.pop_frame()?;
/// # Ok::<(), framescope::Error>(())
/// ```
pub struct ShadowRuntime {
    threads: DashMap<ThreadToken, Arc<ThreadRecord>>,
    tables: DashMap<RoutineId, Vec<VariableTableEntry>>,
    next_token: AtomicU64,
}

impl ShadowRuntime {
    /// Create an empty runtime with no attached threads or registered routines.
    #[must_use]
    pub fn new() -> ShadowRuntime {
        ShadowRuntime {
            threads: DashMap::new(),
            tables: DashMap::new(),
            next_token: AtomicU64::new(1),
        }
    }

    /// Register a routine and its compile-time variable table.
    ///
    /// ## Arguments
    /// * 'name'  - The routine name
    /// * 'table' - The routine's local-variable table entries
    pub fn register_routine(&self, name: &str, table: Vec<VariableTableEntry>) -> RoutineId {
        let routine = RoutineId::new(name);
        self.tables.insert(routine.clone(), table);
        routine
    }

    fn record(&self, thread: ThreadToken) -> Result<Arc<ThreadRecord>> {
        self.threads
            .get(&thread)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(Error::ThreadNotFound(thread))
    }
}

impl Default for ShadowRuntime {
    fn default() -> Self {
        ShadowRuntime::new()
    }
}

impl WorkerHost for ShadowRuntime {
    type Thread = ShadowThread;

    fn attach_thread(&self, _label: &str) -> (ThreadToken, ShadowThread) {
        let token = ThreadToken::new(self.next_token.fetch_add(1, Ordering::Relaxed));
        let record = Arc::new(ThreadRecord {
            state: Mutex::new(ThreadState {
                frames: Vec::new(),
                suspend_count: 0,
                alive: true,
            }),
            unfrozen: Condvar::new(),
        });

        self.threads.insert(token, Arc::clone(&record));
        (token, ShadowThread { token, record })
    }
}

impl InspectionRuntime for ShadowRuntime {
    fn suspend(&self, thread: ThreadToken) -> Result<()> {
        let record = self.record(thread)?;
        let mut state = record.lock()?;
        if !state.alive {
            return Err(Error::ThreadExited(thread));
        }
        state.suspend_count += 1;
        Ok(())
    }

    fn resume(&self, thread: ThreadToken) -> Result<()> {
        let record = self.record(thread)?;
        let mut state = record.lock()?;
        if state.suspend_count == 0 {
            return Err(Error::ResumeFailed {
                thread,
                reason: "thread is not suspended".to_string(),
            });
        }
        state.suspend_count -= 1;
        if state.suspend_count == 0 {
            record.unfrozen.notify_all();
        }
        Ok(())
    }

    fn stack_trace(&self, thread: ThreadToken) -> Result<Vec<FrameInfo>> {
        let record = self.record(thread)?;
        let state = record.lock()?;
        if state.suspend_count == 0 {
            return Err(Error::ThreadNotSuspended(thread));
        }

        Ok(state
            .frames
            .iter()
            .rev()
            .enumerate()
            .map(|(depth, frame)| FrameInfo {
                routine: frame.routine.clone(),
                depth,
                location: frame.location,
            })
            .collect())
    }

    fn get_local(
        &self,
        thread: ThreadToken,
        depth: usize,
        slot: i32,
        kind: SlotKind,
    ) -> Result<SlotValue> {
        let record = self.record(thread)?;
        let mut state = record.lock()?;
        if state.suspend_count == 0 {
            return Err(Error::ThreadNotSuspended(thread));
        }

        let value = resolve_slot(&mut state, depth, slot)?;
        if value.kind() != kind {
            return Err(Error::SlotTypeMismatch {
                index: slot,
                expected: kind,
                actual: value.kind(),
            });
        }
        Ok(value.clone())
    }

    fn set_local(
        &self,
        thread: ThreadToken,
        depth: usize,
        slot: i32,
        value: SlotValue,
    ) -> Result<()> {
        let record = self.record(thread)?;
        let mut state = record.lock()?;
        if state.suspend_count == 0 {
            return Err(Error::ThreadNotSuspended(thread));
        }

        let current = resolve_slot(&mut state, depth, slot)?;
        if current.kind() != value.kind() {
            return Err(Error::SlotTypeMismatch {
                index: slot,
                expected: value.kind(),
                actual: current.kind(),
            });
        }
        *current = value;
        Ok(())
    }

    fn variable_table(&self, routine: &RoutineId) -> Result<Vec<VariableTableEntry>> {
        self.tables
            .get(routine)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Error::UnknownRoutine(routine.clone()))
    }
}

/// The worker-side handle to a thread's shadow stack.
///
/// Moved into the worker routine. Every method is a safepoint: it blocks while the
/// thread is suspended, which is what makes controller-side reads consistent and
/// controller-side writes atomic from the worker's perspective.
///
/// Dropping the handle marks the thread as exited; subsequent suspension requests fail
/// with [`crate::Error::ThreadExited`].
pub struct ShadowThread {
    token: ThreadToken,
    record: Arc<ThreadRecord>,
}

impl ShadowThread {
    /// The token the controller addresses this thread by.
    #[must_use]
    pub fn token(&self) -> ThreadToken {
        self.token
    }

    /// Push a new innermost frame executing `routine`.
    ///
    /// ## Arguments
    /// * 'routine'  - The routine the frame executes
    /// * 'slots'    - Initial slot values; each slot's kind is fixed from here on
    /// * 'location' - The frame's initial program location
    ///
    /// # Errors
    /// Returns [`Error::LockError`] if the thread state lock was poisoned.
    pub fn push_frame(
        &self,
        routine: &RoutineId,
        slots: Vec<SlotValue>,
        location: u64,
    ) -> Result<()> {
        let mut state = self.record.safepoint()?;
        state.frames.push(ShadowFrame {
            routine: routine.clone(),
            location,
            slots,
        });
        Ok(())
    }

    /// Pop the innermost frame.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFrame`] if the stack is empty.
    pub fn pop_frame(&self) -> Result<()> {
        let mut state = self.record.safepoint()?;
        if state.frames.pop().is_none() {
            return Err(Error::InvalidFrame {
                depth: 0,
                frame_count: 0,
            });
        }
        Ok(())
    }

    /// Read a slot of the innermost frame.
    ///
    /// ## Arguments
    /// * 'slot' - Slot index within the innermost frame
    ///
    /// # Errors
    /// Returns [`Error::InvalidFrame`] on an empty stack or
    /// [`Error::SlotOutOfRange`] for a bad index.
    pub fn load(&self, slot: usize) -> Result<SlotValue> {
        let mut state = self.record.safepoint()?;
        let value = resolve_slot(&mut state, 0, i32::try_from(slot).unwrap_or(i32::MAX))?;
        Ok(value.clone())
    }

    /// Write a slot of the innermost frame.
    ///
    /// The slot's declared kind is fixed at [`ShadowThread::push_frame`]; writing a
    /// value of a different kind fails.
    ///
    /// ## Arguments
    /// * 'slot'  - Slot index within the innermost frame
    /// * 'value' - The value to store
    ///
    /// # Errors
    /// Returns [`Error::InvalidFrame`], [`Error::SlotOutOfRange`] or
    /// [`Error::SlotTypeMismatch`].
    pub fn store(&self, slot: usize, value: SlotValue) -> Result<()> {
        let mut state = self.record.safepoint()?;
        let current = resolve_slot(&mut state, 0, i32::try_from(slot).unwrap_or(i32::MAX))?;
        if current.kind() != value.kind() {
            return Err(Error::SlotTypeMismatch {
                index: i32::try_from(slot).unwrap_or(i32::MAX),
                expected: value.kind(),
                actual: current.kind(),
            });
        }
        *current = value;
        Ok(())
    }

    /// Advance the innermost frame's program location.
    ///
    /// ## Arguments
    /// * 'location' - The new program location
    ///
    /// # Errors
    /// Returns [`Error::InvalidFrame`] if the stack is empty.
    pub fn advance_to(&self, location: u64) -> Result<()> {
        let mut state = self.record.safepoint()?;
        match state.frames.last_mut() {
            Some(frame) => {
                frame.location = location;
                Ok(())
            }
            None => Err(Error::InvalidFrame {
                depth: 0,
                frame_count: 0,
            }),
        }
    }
}

impl Drop for ShadowThread {
    fn drop(&mut self) {
        if let Ok(mut state) = self.record.state.lock() {
            state.alive = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::thread;
    use std::time::Duration;

    fn runtime_with_thread() -> (ShadowRuntime, ThreadToken, ShadowThread, RoutineId) {
        let runtime = ShadowRuntime::new();
        let routine = runtime.register_routine("target", Vec::new());
        let (token, worker) = runtime.attach_thread("test-worker");
        (runtime, token, worker, routine)
    }

    #[test]
    fn push_load_store_pop() {
        let (_runtime, _token, worker, routine) = runtime_with_thread();

        worker
            .push_frame(&routine, vec![SlotValue::Int(42), SlotValue::Long(7)], 0)
            .unwrap();
        assert_eq!(worker.load(0).unwrap(), SlotValue::Int(42));

        worker.store(0, SlotValue::Int(43)).unwrap();
        assert_eq!(worker.load(0).unwrap(), SlotValue::Int(43));

        worker.pop_frame().unwrap();
        assert!(matches!(
            worker.load(0),
            Err(Error::InvalidFrame { frame_count: 0, .. })
        ));
    }

    #[test]
    fn worker_store_kind_is_fixed() {
        let (_runtime, _token, worker, routine) = runtime_with_thread();
        worker
            .push_frame(&routine, vec![SlotValue::Int(1)], 0)
            .unwrap();

        let err = worker.store(0, SlotValue::Long(1)).unwrap_err();
        assert!(matches!(err, Error::SlotTypeMismatch { .. }));
    }

    #[test]
    fn inspection_requires_suspension() {
        let (runtime, token, worker, routine) = runtime_with_thread();
        worker
            .push_frame(&routine, vec![SlotValue::Int(1)], 0)
            .unwrap();

        assert!(matches!(
            runtime.stack_trace(token),
            Err(Error::ThreadNotSuspended(_))
        ));
        assert!(matches!(
            runtime.get_local(token, 0, 0, SlotKind::Int),
            Err(Error::ThreadNotSuspended(_))
        ));
    }

    #[test]
    fn stack_trace_is_innermost_first() {
        let (runtime, token, worker, routine) = runtime_with_thread();
        let inner = runtime.register_routine("inner", Vec::new());

        worker.push_frame(&routine, Vec::new(), 100).unwrap();
        worker.push_frame(&inner, Vec::new(), 200).unwrap();

        runtime.suspend(token).unwrap();
        let trace = runtime.stack_trace(token).unwrap();
        runtime.resume(token).unwrap();

        assert_eq!(trace.len(), 2);
        assert_eq!(trace[0].routine, inner);
        assert_eq!(trace[0].depth, 0);
        assert_eq!(trace[0].location, 200);
        assert_eq!(trace[1].routine, routine);
        assert_eq!(trace[1].depth, 1);
    }

    #[test]
    fn slot_validation() {
        let (runtime, token, worker, routine) = runtime_with_thread();
        worker
            .push_frame(&routine, vec![SlotValue::Int(42), SlotValue::Int(7)], 0)
            .unwrap();

        runtime.suspend(token).unwrap();

        assert!(matches!(
            runtime.get_local(token, 0, -1, SlotKind::Int),
            Err(Error::SlotOutOfRange { index: -1, .. })
        ));
        assert!(matches!(
            runtime.get_local(token, 0, 102, SlotKind::Int),
            Err(Error::SlotOutOfRange {
                index: 102,
                slot_count: 2
            })
        ));
        assert!(matches!(
            runtime.get_local(token, 0, 0, SlotKind::Object),
            Err(Error::SlotTypeMismatch { .. })
        ));
        assert!(matches!(
            runtime.get_local(token, 5, 0, SlotKind::Int),
            Err(Error::InvalidFrame {
                depth: 5,
                frame_count: 1
            })
        ));

        // Failed accesses altered nothing.
        assert_eq!(
            runtime.get_local(token, 0, 0, SlotKind::Int).unwrap(),
            SlotValue::Int(42)
        );
        assert_eq!(
            runtime.get_local(token, 0, 1, SlotKind::Int).unwrap(),
            SlotValue::Int(7)
        );

        runtime.resume(token).unwrap();
    }

    #[test]
    fn suspension_freezes_safepoints() {
        let (runtime, token, worker, routine) = runtime_with_thread();
        worker
            .push_frame(&routine, vec![SlotValue::Int(0)], 0)
            .unwrap();

        runtime.suspend(token).unwrap();

        let stored = Arc::new(AtomicBool::new(false));
        let stored_flag = Arc::clone(&stored);
        let handle = thread::spawn(move || {
            worker.store(0, SlotValue::Int(1)).unwrap();
            stored_flag.store(true, Ordering::SeqCst);
            worker
        });

        // The store is a safepoint; it must not complete while suspended.
        thread::sleep(Duration::from_millis(50));
        assert!(!stored.load(Ordering::SeqCst));
        assert_eq!(
            runtime.get_local(token, 0, 0, SlotKind::Int).unwrap(),
            SlotValue::Int(0)
        );

        runtime.resume(token).unwrap();
        let worker = handle.join().unwrap();
        assert!(stored.load(Ordering::SeqCst));
        assert_eq!(worker.load(0).unwrap(), SlotValue::Int(1));
    }

    #[test]
    fn suspend_after_exit_fails() {
        let (runtime, token, worker, _routine) = runtime_with_thread();
        drop(worker);

        assert!(matches!(
            runtime.suspend(token),
            Err(Error::ThreadExited(_))
        ));
    }

    #[test]
    fn resume_without_suspend_fails() {
        let (runtime, token, _worker, _routine) = runtime_with_thread();
        assert!(matches!(
            runtime.resume(token),
            Err(Error::ResumeFailed { .. })
        ));
    }

    #[test]
    fn unknown_thread_and_routine() {
        let runtime = ShadowRuntime::new();
        assert!(matches!(
            runtime.suspend(ThreadToken::new(99)),
            Err(Error::ThreadNotFound(_))
        ));
        assert!(matches!(
            runtime.variable_table(&RoutineId::new("missing")),
            Err(Error::UnknownRoutine(_))
        ));
    }
}
