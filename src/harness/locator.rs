use crate::runtime::{InspectionRuntime, RoutineId, SlotKind, ThreadToken};
use crate::{Error, Result};

/// The result of locating a frame on a suspended thread's stack.
///
/// Holds the matched routine's identity, the frame's distance from the suspension point,
/// and its current program location. Exactly one frame is expected to match by
/// construction of a harness run; a miss is fatal, not a soft negative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSnapshot {
    routine: RoutineId,
    depth: usize,
    location: u64,
}

impl FrameSnapshot {
    /// The routine the located frame executes.
    #[must_use]
    pub fn routine(&self) -> &RoutineId {
        &self.routine
    }

    /// Distance from the suspension point (0 = innermost).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The frame's current program location.
    #[must_use]
    pub fn location(&self) -> u64 {
        self.location
    }
}

/// Identifies a local variable's storage location for a slot operation.
///
/// The `depth` is relative to the frame a session locates (see
/// [`crate::harness::PauseSession`]); the slot index is a raw, *unvalidated* integer -
/// deliberately out-of-range or negative indices are legitimate test data for the
/// bad-slot scenarios, and validation happens at access time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotDescriptor {
    /// Frame depth relative to the located frame
    pub depth: usize,
    /// Slot index; not validated until the access executes
    pub slot: i32,
    /// The kind the access declares for the slot
    pub kind: SlotKind,
}

impl SlotDescriptor {
    /// Describe a slot in the located frame itself (relative depth 0).
    #[must_use]
    pub fn new(slot: i32, kind: SlotKind) -> SlotDescriptor {
        SlotDescriptor {
            depth: 0,
            slot,
            kind,
        }
    }

    /// The same slot, `depth` frames further up from the located frame.
    #[must_use]
    pub fn at_depth(mut self, depth: usize) -> SlotDescriptor {
        self.depth = depth;
        self
    }
}

/// Walk the suspended thread's stack and locate the frame executing `routine`.
///
/// The walk is innermost-first and the first match wins. Given a fixed stack the result
/// is deterministic.
///
/// ## Arguments
/// * 'runtime' - The runtime to walk the stack through
/// * 'thread'  - The suspended target thread
/// * 'routine' - The routine identity to match frames against
///
/// # Errors
/// Returns [`Error::FrameNotFound`] if no frame matches - fatal to the session, since
/// the routine is known to be on the stack by construction - or
/// [`Error::ThreadNotSuspended`] if the thread is running.
pub fn find_frame(
    runtime: &dyn InspectionRuntime,
    thread: ThreadToken,
    routine: &RoutineId,
) -> Result<FrameSnapshot> {
    let trace = runtime.stack_trace(thread)?;
    trace
        .into_iter()
        .find(|frame| frame.routine == *routine)
        .map(|frame| FrameSnapshot {
            routine: frame.routine,
            depth: frame.depth,
            location: frame.location,
        })
        .ok_or_else(|| Error::FrameNotFound {
            routine: routine.clone(),
        })
}

/// Scan `routine`'s variable table for a variable live at `location` under `name`.
///
/// Returns a descriptor for the located frame (relative depth 0); adjust with
/// [`SlotDescriptor::at_depth`] if the variable belongs to a frame further up. The scan
/// depends only on static debug metadata and is stable across runs.
///
/// ## Arguments
/// * 'runtime'  - The runtime serving the variable table
/// * 'routine'  - The routine whose table is scanned
/// * 'location' - The program location the variable's live range must cover
/// * 'name'     - The declared variable name to match
///
/// # Errors
/// Returns [`Error::VariableNotFound`] if no entry matches, or
/// [`Error::UnknownRoutine`] if the routine has no table.
pub fn find_variable_in_scope(
    runtime: &dyn InspectionRuntime,
    routine: &RoutineId,
    location: u64,
    name: &str,
) -> Result<SlotDescriptor> {
    let table = runtime.variable_table(routine)?;
    table
        .iter()
        .find(|entry| entry.name == name && entry.covers(location))
        .map(|entry| SlotDescriptor::new(entry.slot, entry.kind))
        .ok_or_else(|| Error::VariableNotFound {
            routine: routine.clone(),
            name: name.to_string(),
            location,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{ShadowRuntime, VariableTableEntry, WorkerHost};

    fn entry(name: &str, slot: i32, kind: SlotKind, start: u64, length: u64) -> VariableTableEntry {
        VariableTableEntry {
            name: name.to_string(),
            slot,
            kind,
            start_location: start,
            length,
        }
    }

    #[test]
    fn finds_innermost_match() {
        let runtime = ShadowRuntime::new();
        let outer = runtime.register_routine("outer", Vec::new());
        let target = runtime.register_routine("target", Vec::new());
        let (token, worker) = runtime.attach_thread("w");

        // target appears twice; the innermost occurrence must win.
        worker.push_frame(&target, Vec::new(), 5).unwrap();
        worker.push_frame(&outer, Vec::new(), 10).unwrap();
        worker.push_frame(&target, Vec::new(), 20).unwrap();

        runtime.suspend(token).unwrap();
        let snapshot = find_frame(&runtime, token, &target).unwrap();
        runtime.resume(token).unwrap();

        assert_eq!(snapshot.routine(), &target);
        assert_eq!(snapshot.depth(), 0);
        assert_eq!(snapshot.location(), 20);
    }

    #[test]
    fn missing_frame_is_fatal() {
        let runtime = ShadowRuntime::new();
        let present = runtime.register_routine("present", Vec::new());
        let absent = RoutineId::new("absent");
        let (token, worker) = runtime.attach_thread("w");
        worker.push_frame(&present, Vec::new(), 0).unwrap();

        runtime.suspend(token).unwrap();
        let err = find_frame(&runtime, token, &absent).unwrap_err();
        runtime.resume(token).unwrap();

        assert!(matches!(err, Error::FrameNotFound { .. }));
    }

    #[test]
    fn variable_live_range() {
        let runtime = ShadowRuntime::new();
        let routine = runtime.register_routine(
            "target",
            vec![
                entry("x", 0, SlotKind::Int, 0, 10),
                entry("obj", 1, SlotKind::Object, 5, 10),
            ],
        );

        let descriptor = find_variable_in_scope(&runtime, &routine, 7, "obj").unwrap();
        assert_eq!(descriptor, SlotDescriptor::new(1, SlotKind::Object));

        // Same name, location outside the live range.
        let err = find_variable_in_scope(&runtime, &routine, 2, "obj").unwrap_err();
        assert!(matches!(err, Error::VariableNotFound { .. }));

        // Unknown name.
        let err = find_variable_in_scope(&runtime, &routine, 7, "missing").unwrap_err();
        assert!(matches!(err, Error::VariableNotFound { .. }));
    }

    #[test]
    fn descriptor_depth_builder() {
        let descriptor = SlotDescriptor::new(3, SlotKind::Long).at_depth(2);
        assert_eq!(descriptor.depth, 2);
        assert_eq!(descriptor.slot, 3);
    }
}
