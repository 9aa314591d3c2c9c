use crate::harness::{FrameSnapshot, SlotDescriptor};
use crate::runtime::{InspectionRuntime, SlotValue, ThreadToken};
use crate::{Error, Result};

/// Typed get/set access to the slots of a suspended thread's frames.
///
/// A thin, validating layer over the runtime's raw local-variable interface: the
/// descriptor's declared kind is checked against the written value before the runtime is
/// touched, the descriptor's relative depth is composed with the located frame's depth,
/// and every failure comes back as a typed error the batch driver can classify. A failed
/// access never alters any slot.
pub struct SlotAccessor<'a> {
    runtime: &'a dyn InspectionRuntime,
    thread: ThreadToken,
}

impl<'a> SlotAccessor<'a> {
    /// Create an accessor for one suspended thread.
    ///
    /// ## Arguments
    /// * 'runtime' - The runtime mediating slot access
    /// * 'thread'  - The suspended target thread
    #[must_use]
    pub fn new(runtime: &'a dyn InspectionRuntime, thread: ThreadToken) -> SlotAccessor<'a> {
        SlotAccessor { runtime, thread }
    }

    /// The thread this accessor operates on.
    #[must_use]
    pub fn thread(&self) -> ThreadToken {
        self.thread
    }

    /// Read the slot the descriptor names, relative to the located frame.
    ///
    /// ## Arguments
    /// * 'frame'      - The located frame the descriptor is relative to
    /// * 'descriptor' - The slot to read
    ///
    /// # Errors
    /// Returns the recoverable invalid-slot family ([`Error::InvalidFrame`],
    /// [`Error::SlotOutOfRange`], [`Error::SlotTypeMismatch`]) for bad descriptors, or
    /// [`Error::ThreadNotSuspended`] if the suspension lapsed.
    pub fn get(&self, frame: &FrameSnapshot, descriptor: &SlotDescriptor) -> Result<SlotValue> {
        self.runtime.get_local(
            self.thread,
            frame.depth() + descriptor.depth,
            descriptor.slot,
            descriptor.kind,
        )
    }

    /// Write the slot the descriptor names, relative to the located frame.
    ///
    /// The value's kind must match the descriptor's declared kind; this is rejected
    /// before the runtime is consulted so a mis-built operation cannot reach the stack.
    /// The write becomes visible to the worker once it resumes.
    ///
    /// ## Arguments
    /// * 'frame'      - The located frame the descriptor is relative to
    /// * 'descriptor' - The slot to write
    /// * 'value'      - The value to store
    ///
    /// # Errors
    /// Same failure modes as [`SlotAccessor::get`].
    pub fn set(
        &self,
        frame: &FrameSnapshot,
        descriptor: &SlotDescriptor,
        value: SlotValue,
    ) -> Result<()> {
        if value.kind() != descriptor.kind {
            return Err(Error::SlotTypeMismatch {
                index: descriptor.slot,
                expected: descriptor.kind,
                actual: value.kind(),
            });
        }
        self.runtime.set_local(
            self.thread,
            frame.depth() + descriptor.depth,
            descriptor.slot,
            value,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::find_frame;
    use crate::runtime::{ObjectRef, ShadowRuntime, SlotKind, WorkerHost};

    fn suspended_frame() -> (ShadowRuntime, ThreadToken, FrameSnapshot) {
        let runtime = ShadowRuntime::new();
        let routine = runtime.register_routine("target", Vec::new());
        let (token, worker) = runtime.attach_thread("w");
        worker
            .push_frame(
                &routine,
                vec![SlotValue::Int(42), SlotValue::Object(ObjectRef::new(0_u8))],
                0,
            )
            .unwrap();
        // Keep the worker handle alive for the duration of the test.
        std::mem::forget(worker);

        runtime.suspend(token).unwrap();
        let frame = find_frame(&runtime, token, &routine).unwrap();
        (runtime, token, frame)
    }

    #[test]
    fn get_and_set_round_trip() {
        let (runtime, token, frame) = suspended_frame();
        let accessor = SlotAccessor::new(&runtime, token);

        let descriptor = SlotDescriptor::new(0, SlotKind::Int);
        assert_eq!(
            accessor.get(&frame, &descriptor).unwrap(),
            SlotValue::Int(42)
        );

        accessor.set(&frame, &descriptor, SlotValue::Int(7)).unwrap();
        assert_eq!(
            accessor.get(&frame, &descriptor).unwrap(),
            SlotValue::Int(7)
        );
    }

    #[test]
    fn set_rejects_kind_mismatch_before_runtime() {
        let (runtime, token, frame) = suspended_frame();
        let accessor = SlotAccessor::new(&runtime, token);

        // Descriptor says Object, value is Int: rejected up front.
        let descriptor = SlotDescriptor::new(1, SlotKind::Object);
        let err = accessor
            .set(&frame, &descriptor, SlotValue::Int(1))
            .unwrap_err();
        assert!(matches!(err, Error::SlotTypeMismatch { .. }));

        // The object slot is untouched.
        assert!(accessor
            .get(&frame, &SlotDescriptor::new(1, SlotKind::Object))
            .is_ok());
    }

    #[test]
    fn bad_indices_fail_typed() {
        let (runtime, token, frame) = suspended_frame();
        let accessor = SlotAccessor::new(&runtime, token);

        let err = accessor
            .get(&frame, &SlotDescriptor::new(-3, SlotKind::Int))
            .unwrap_err();
        assert!(matches!(err, Error::SlotOutOfRange { index: -3, .. }));

        let err = accessor
            .get(&frame, &SlotDescriptor::new(0, SlotKind::Int).at_depth(4))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidFrame { .. }));
    }
}
