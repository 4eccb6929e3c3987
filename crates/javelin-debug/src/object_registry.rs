//! Cache of remote objects surfaced to the external client.
//!
//! Every non-primitive value the inspector renders is inserted here, keyed
//! by its 64-bit remote identity. Identity is only stable within one
//! session, so the registry is cleared on every (re-)attach. Entries are
//! lazily invalidated: when the target reports the object as collected the
//! entry is marked and subsequent lookups fail with a cache miss instead of
//! surfacing raw protocol errors.

use std::collections::HashMap;

use javelin_jdwp::ObjectId;

use crate::error::{DebugError, Result};

#[derive(Debug, Clone)]
pub struct CachedObject {
    pub tag: u8,
    pub runtime_type: String,
    invalid: bool,
}

#[derive(Debug, Default)]
pub struct ObjectRegistry {
    entries: HashMap<ObjectId, CachedObject>,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, object_id: ObjectId, tag: u8, runtime_type: &str) {
        self.entries.insert(
            object_id,
            CachedObject {
                tag,
                runtime_type: runtime_type.to_string(),
                invalid: false,
            },
        );
    }

    /// Looks an object up. Unknown ids and ids whose target object has been
    /// collected both report "not in cache".
    pub fn get(&self, object_id: ObjectId) -> Result<&CachedObject> {
        match self.entries.get(&object_id) {
            Some(entry) if !entry.invalid => Ok(entry),
            _ => Err(DebugError::ObjectNotCached(object_id)),
        }
    }

    pub fn contains(&self, object_id: ObjectId) -> bool {
        self.entries
            .get(&object_id)
            .map(|entry| !entry.invalid)
            .unwrap_or(false)
    }

    /// Marks an entry whose remote object the target reported as collected.
    pub fn mark_invalid(&mut self, object_id: ObjectId) {
        if let Some(entry) = self.entries.get_mut(&object_id) {
            entry.invalid = true;
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_objects_report_not_cached() {
        let registry = ObjectRegistry::new();
        assert!(matches!(
            registry.get(42),
            Err(DebugError::ObjectNotCached(42))
        ));
    }

    #[test]
    fn inserted_objects_are_found_until_invalidated() {
        let mut registry = ObjectRegistry::new();
        registry.insert(7, b'L', "java.util.ArrayList");
        assert_eq!(registry.get(7).unwrap().runtime_type, "java.util.ArrayList");

        registry.mark_invalid(7);
        assert!(matches!(
            registry.get(7),
            Err(DebugError::ObjectNotCached(7))
        ));
        assert!(!registry.contains(7));
    }

    #[test]
    fn clear_empties_the_registry() {
        let mut registry = ObjectRegistry::new();
        registry.insert(1, b'L', "demo.A");
        registry.insert(2, b'[', "int[]");
        registry.clear();
        assert!(registry.is_empty());
    }

    #[test]
    fn reinserting_revalidates_an_entry() {
        let mut registry = ObjectRegistry::new();
        registry.insert(9, b'L', "demo.A");
        registry.mark_invalid(9);
        registry.insert(9, b'L', "demo.A");
        assert!(registry.contains(9));
    }
}
