use std::any::Any;
use std::fmt;
use std::sync::Arc;

use strum::Display;

/// The declared kind of a local-variable slot.
///
/// Mirrors the three slot widths the harness distinguishes: 32-bit integers, 64-bit
/// integers and object references. Every slot access declares the kind it expects, and a
/// mismatch against the slot's actual kind fails with
/// [`crate::Error::SlotTypeMismatch`] rather than producing a wrongly-typed read.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
    /// A 32-bit signed integer slot
    Int,
    /// A 64-bit signed integer slot
    Long,
    /// An object reference slot
    Object,
}

/// A typed value held in (or written to) a local-variable slot.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotValue {
    /// A 32-bit signed integer
    Int(i32),
    /// A 64-bit signed integer
    Long(i64),
    /// A shared object reference, compared by identity
    Object(ObjectRef),
}

impl SlotValue {
    /// The kind of slot this value occupies.
    #[must_use]
    pub fn kind(&self) -> SlotKind {
        match self {
            SlotValue::Int(_) => SlotKind::Int,
            SlotValue::Long(_) => SlotKind::Long,
            SlotValue::Object(_) => SlotKind::Object,
        }
    }

    /// The contained integer, if this is an [`SlotValue::Int`].
    #[must_use]
    pub fn as_int(&self) -> Option<i32> {
        match self {
            SlotValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// The contained long, if this is a [`SlotValue::Long`].
    #[must_use]
    pub fn as_long(&self) -> Option<i64> {
        match self {
            SlotValue::Long(value) => Some(*value),
            _ => None,
        }
    }

    /// The contained object reference, if this is an [`SlotValue::Object`].
    #[must_use]
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            SlotValue::Object(object) => Some(object),
            _ => None,
        }
    }
}

/// A shared, identity-comparable object reference.
///
/// Object slots hold references, not values: two `ObjectRef`s are equal exactly when
/// they point at the same allocation, regardless of the payload's own `PartialEq`. The
/// payload can be any `Any + Send + Sync` type and is recovered with
/// [`ObjectRef::downcast_ref`].
///
/// # Examples
///
/// ```rust
/// use framescope::runtime::ObjectRef;
///
/// let a = ObjectRef::new(String::from("payload"));
/// let b = a.clone();
/// let c = ObjectRef::new(String::from("payload"));
///
/// assert_eq!(a, b); // same allocation
/// assert_ne!(a, c); // equal payloads, different identity
/// assert_eq!(a.downcast_ref::<String>().unwrap(), "payload");
/// ```
#[derive(Clone)]
pub struct ObjectRef(Arc<dyn Any + Send + Sync>);

impl ObjectRef {
    /// Wrap a value into a new, uniquely-identified object reference.
    #[must_use]
    pub fn new<T: Any + Send + Sync>(value: T) -> ObjectRef {
        ObjectRef(Arc::new(value))
    }

    /// Borrow the payload as `T`, if that is its concrete type.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.as_ref().downcast_ref::<T>()
    }

    /// `true` if both references point at the same allocation.
    #[must_use]
    pub fn same_identity(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// The allocation address, used as a stable identity key for diagnostics.
    #[must_use]
    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.0).cast::<()>() as usize
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.same_identity(other)
    }
}

impl Eq for ObjectRef {}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectRef(0x{:x})", self.identity())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_of_values() {
        assert_eq!(SlotValue::Int(1).kind(), SlotKind::Int);
        assert_eq!(SlotValue::Long(1).kind(), SlotKind::Long);
        assert_eq!(SlotValue::Object(ObjectRef::new(1_u8)).kind(), SlotKind::Object);
    }

    #[test]
    fn accessors() {
        assert_eq!(SlotValue::Int(42).as_int(), Some(42));
        assert_eq!(SlotValue::Int(42).as_long(), None);
        assert_eq!(SlotValue::Long(7).as_long(), Some(7));
        assert!(SlotValue::Object(ObjectRef::new("x")).as_object().is_some());
    }

    #[test]
    fn object_identity() {
        let a = ObjectRef::new(vec![1, 2, 3]);
        let b = a.clone();
        let c = ObjectRef::new(vec![1, 2, 3]);

        assert!(a.same_identity(&b));
        assert!(!a.same_identity(&c));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.identity(), b.identity());
    }

    #[test]
    fn object_downcast() {
        let object = ObjectRef::new(String::from("NEW_FOR_SET"));
        assert_eq!(object.downcast_ref::<String>().unwrap(), "NEW_FOR_SET");
        assert!(object.downcast_ref::<i32>().is_none());
    }

    #[test]
    fn kind_display() {
        assert_eq!(SlotKind::Int.to_string(), "Int");
        assert_eq!(SlotKind::Object.to_string(), "Object");
    }
}
