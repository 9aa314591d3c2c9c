//! Diagnostic rendering of slot values and operation outcomes.
//!
//! Object slots hold identity-compared references, so printing them meaningfully needs a
//! map from allocation identity to a small stable label. [`IdentityMap`] is that map,
//! made explicit: one instance is created per session and passed into every rendering
//! call, so labels are stable within a session and there is no process-wide mutable
//! state to leak between test cases.

use std::collections::HashMap;

use crate::runtime::{ObjectRef, SlotValue};

/// An explicit object-identity-to-label map, scoped to one session.
///
/// The first object rendered becomes `obj#1`, the second `obj#2`, and so on; rendering
/// the same reference again yields the same label. Lifecycle is tied to the session that
/// created it - discard the map when the session ends.
///
/// # Examples
///
/// ```rust
/// use framescope::report::IdentityMap;
/// use framescope::runtime::{ObjectRef, SlotValue};
///
/// let mut identities = IdentityMap::new();
/// let a = SlotValue::Object(ObjectRef::new("a"));
/// let b = SlotValue::Object(ObjectRef::new("b"));
///
/// assert_eq!(identities.describe(&a), "obj#1");
/// assert_eq!(identities.describe(&b), "obj#2");
/// assert_eq!(identities.describe(&a), "obj#1");
/// ```
#[derive(Debug, Default)]
pub struct IdentityMap {
    ids: HashMap<usize, usize>,
}

impl IdentityMap {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> IdentityMap {
        IdentityMap::default()
    }

    /// The stable small id for an object reference, assigning the next one if unseen.
    pub fn id_for(&mut self, object: &ObjectRef) -> usize {
        let next = self.ids.len() + 1;
        *self.ids.entry(object.identity()).or_insert(next)
    }

    /// Render a slot value for a report.
    ///
    /// Primitives render as their literal value (`42`, `7L`); objects render as their
    /// stable identity label (`obj#1`).
    pub fn describe(&mut self, value: &SlotValue) -> String {
        match value {
            SlotValue::Int(v) => v.to_string(),
            SlotValue::Long(v) => format!("{v}L"),
            SlotValue::Object(object) => format!("obj#{}", self.id_for(object)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_render_literally() {
        let mut identities = IdentityMap::new();
        assert_eq!(identities.describe(&SlotValue::Int(-7)), "-7");
        assert_eq!(identities.describe(&SlotValue::Long(42)), "42L");
    }

    #[test]
    fn object_labels_are_stable_per_identity() {
        let mut identities = IdentityMap::new();
        let a = ObjectRef::new(1_u32);
        let b = ObjectRef::new(1_u32);

        assert_eq!(identities.id_for(&a), 1);
        assert_eq!(identities.id_for(&b), 2);
        assert_eq!(identities.id_for(&a), 1);
        assert_eq!(identities.id_for(&a.clone()), 1);
    }

    #[test]
    fn separate_maps_are_independent() {
        let object = ObjectRef::new("shared");
        let mut first = IdentityMap::new();
        let mut second = IdentityMap::new();

        first.id_for(&ObjectRef::new(0_u8));
        assert_eq!(first.id_for(&object), 2);
        assert_eq!(second.id_for(&object), 1);
    }
}
