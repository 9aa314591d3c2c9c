use crate::harness::{FrameSnapshot, SlotAccessor, SlotDescriptor};
use crate::report::IdentityMap;
use crate::runtime::{SlotKind, SlotValue};
use crate::{Error, Result};

/// Whether a slot operation reads or writes.
#[derive(Debug, Clone, PartialEq)]
pub enum Access {
    /// Read the slot's current value
    Get,
    /// Write the given value into the slot
    Set(SlotValue),
}

/// One inspect-time action against a located frame's slot.
///
/// Implementations exist per slot kind ([`IntAccess`], [`LongAccess`], [`ObjectAccess`])
/// and are normally built through the [`slot_operation`] factory; a batch of boxed
/// operations is what [`crate::harness::PauseSession::run`] applies once the target
/// frame has been located.
pub trait SlotOperation: Send + Sync {
    /// Human-readable operation name, used in reports and diagnostics.
    fn name(&self) -> &str;

    /// Execute the operation against the located frame.
    ///
    /// Returns the value read for a get, `None` for an acknowledged write.
    ///
    /// # Errors
    /// Propagates the accessor's typed failures; the recoverable invalid-slot family is
    /// caught and reported by the session driver, everything else aborts the session.
    fn apply(
        &self,
        accessor: &SlotAccessor<'_>,
        frame: &FrameSnapshot,
    ) -> Result<Option<SlotValue>>;
}

macro_rules! kind_access {
    ($type_name:ident, $kind:ident, $doc:literal) => {
        #[doc = $doc]
        pub struct $type_name {
            name: String,
            descriptor: SlotDescriptor,
            access: Access,
        }

        impl $type_name {
            /// Build the operation from a descriptor and an access mode.
            ///
            /// The descriptor's kind is forced to the implementation's kind, so the
            /// operation type alone determines how the slot is interpreted.
            #[must_use]
            pub fn new(mut descriptor: SlotDescriptor, access: Access) -> $type_name {
                descriptor.kind = SlotKind::$kind;
                let name = match &access {
                    Access::Get => {
                        format!("Get{} slot {}", SlotKind::$kind, descriptor.slot)
                    }
                    Access::Set(_) => {
                        format!("Set{} slot {}", SlotKind::$kind, descriptor.slot)
                    }
                };
                $type_name {
                    name,
                    descriptor,
                    access,
                }
            }
        }

        impl SlotOperation for $type_name {
            fn name(&self) -> &str {
                &self.name
            }

            fn apply(
                &self,
                accessor: &SlotAccessor<'_>,
                frame: &FrameSnapshot,
            ) -> Result<Option<SlotValue>> {
                match &self.access {
                    Access::Get => accessor.get(frame, &self.descriptor).map(Some),
                    Access::Set(value) => accessor
                        .set(frame, &self.descriptor, value.clone())
                        .map(|()| None),
                }
            }
        }
    };
}

kind_access!(IntAccess, Int, "A get/set operation against a 32-bit integer slot.");
kind_access!(LongAccess, Long, "A get/set operation against a 64-bit integer slot.");
kind_access!(
    ObjectAccess,
    Object,
    "A get/set operation against an object-reference slot."
);

/// Build the slot operation for a `(kind, access)` combination.
///
/// This is the factory replacing per-combination ad-hoc closures: the full operation
/// matrix is `{Get, Set} x {Int, Long, Object}`, dispatched through [`SlotOperation`]
/// with one implementation per kind.
///
/// ## Arguments
/// * 'kind'       - The slot kind the operation declares
/// * 'descriptor' - The slot to operate on (its kind field is overridden by 'kind')
/// * 'access'     - Read or write
#[must_use]
pub fn slot_operation(
    kind: SlotKind,
    descriptor: SlotDescriptor,
    access: Access,
) -> Box<dyn SlotOperation> {
    match kind {
        SlotKind::Int => Box::new(IntAccess::new(descriptor, access)),
        SlotKind::Long => Box::new(LongAccess::new(descriptor, access)),
        SlotKind::Object => Box::new(ObjectAccess::new(descriptor, access)),
    }
}

/// The reported outcome of one slot operation within a batch.
///
/// Every operation reports individually so a batch runs to completion even when some
/// operations fail by design: a recoverable invalid-slot failure is converted into a
/// report with [`OperationReport::recovered`] set instead of aborting the session -
/// which is precisely what makes a deliberate bad-slot case a *pass*.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationReport {
    /// The operation's name
    pub operation: String,
    /// Human-readable outcome: the value read, a write acknowledgement, or the failure
    pub outcome: String,
    /// `true` if this report records a recoverable failure rather than a success
    pub recovered: bool,
}

impl OperationReport {
    /// Report a successful operation.
    ///
    /// ## Arguments
    /// * 'operation'  - The operation name
    /// * 'result'     - The value read, or `None` for a write
    /// * 'identities' - The session's identity map, used when rendering object values
    #[must_use]
    pub fn success(
        operation: &str,
        result: Option<&SlotValue>,
        identities: &mut IdentityMap,
    ) -> OperationReport {
        let outcome = match result {
            Some(value) => format!("read {}", identities.describe(value)),
            None => "write acknowledged".to_string(),
        };
        OperationReport {
            operation: operation.to_string(),
            outcome,
            recovered: false,
        }
    }

    /// Report a recoverable failure.
    ///
    /// ## Arguments
    /// * 'operation' - The operation name
    /// * 'error'     - The invalid-slot error that was caught
    #[must_use]
    pub fn failure(operation: &str, error: &Error) -> OperationReport {
        OperationReport {
            operation: operation.to_string(),
            outcome: format!("failed: {error}"),
            recovered: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_fixes_descriptor_kind() {
        // Descriptor claims Object, but the factory was asked for an Int operation.
        let op = slot_operation(
            SlotKind::Int,
            SlotDescriptor::new(0, SlotKind::Object),
            Access::Get,
        );
        assert_eq!(op.name(), "GetInt slot 0");
    }

    #[test]
    fn operation_names() {
        let get = slot_operation(
            SlotKind::Object,
            SlotDescriptor::new(2, SlotKind::Object),
            Access::Get,
        );
        assert_eq!(get.name(), "GetObject slot 2");

        let set = slot_operation(
            SlotKind::Long,
            SlotDescriptor::new(1, SlotKind::Long),
            Access::Set(SlotValue::Long(5)),
        );
        assert_eq!(set.name(), "SetLong slot 1");
    }

    #[test]
    fn report_rendering() {
        let mut identities = IdentityMap::new();

        let report = OperationReport::success("GetInt slot 0", Some(&SlotValue::Int(42)), &mut identities);
        assert_eq!(report.outcome, "read 42");
        assert!(!report.recovered);

        let report = OperationReport::success("SetInt slot 0", None, &mut identities);
        assert_eq!(report.outcome, "write acknowledged");

        let error = Error::SlotOutOfRange {
            index: 102,
            slot_count: 2,
        };
        let report = OperationReport::failure("SetObject slot 102", &error);
        assert!(report.recovered);
        assert!(report.outcome.starts_with("failed: "));
    }
}
