//! Watch expressions bound to breakpoints.
//!
//! The by-id map is the primary store; the by-breakpoint buckets are a
//! derived index. Both are updated inside one critical section so they can
//! never disagree, and a bucket is removed the moment it empties.

use std::collections::HashMap;

use parking_lot::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Watcher {
    pub id: String,
    pub label: String,
    pub breakpoint_id: i32,
    pub expression: String,
}

#[derive(Default)]
struct Indexes {
    by_id: HashMap<String, Watcher>,
    by_breakpoint: HashMap<i32, Vec<String>>,
}

#[derive(Default)]
pub struct WatcherRegistry {
    inner: Mutex<Indexes>,
}

impl WatcherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, label: &str, breakpoint_id: i32, expression: &str) -> Watcher {
        let watcher = Watcher {
            id: format!("w-{}", Uuid::new_v4().simple()),
            label: label.to_string(),
            breakpoint_id,
            expression: expression.to_string(),
        };

        let mut inner = self.inner.lock();
        inner
            .by_breakpoint
            .entry(breakpoint_id)
            .or_default()
            .push(watcher.id.clone());
        inner.by_id.insert(watcher.id.clone(), watcher.clone());
        watcher
    }

    pub fn get(&self, id: &str) -> Option<Watcher> {
        self.inner.lock().by_id.get(id).cloned()
    }

    /// Watchers for one breakpoint, in creation order.
    pub fn for_breakpoint(&self, breakpoint_id: i32) -> Vec<Watcher> {
        let inner = self.inner.lock();
        inner
            .by_breakpoint
            .get(&breakpoint_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| inner.by_id.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every watcher, ordered by breakpoint id then creation order.
    pub fn all(&self) -> Vec<Watcher> {
        let inner = self.inner.lock();
        let mut breakpoints: Vec<_> = inner.by_breakpoint.iter().collect();
        breakpoints.sort_by_key(|(id, _)| **id);
        breakpoints
            .into_iter()
            .flat_map(|(_, ids)| ids.iter())
            .filter_map(|id| inner.by_id.get(id).cloned())
            .collect()
    }

    pub fn delete(&self, id: &str) -> bool {
        let mut inner = self.inner.lock();
        let Some(watcher) = inner.by_id.remove(id) else {
            return false;
        };
        if let Some(bucket) = inner.by_breakpoint.get_mut(&watcher.breakpoint_id) {
            bucket.retain(|other| other != id);
            if bucket.is_empty() {
                inner.by_breakpoint.remove(&watcher.breakpoint_id);
            }
        }
        true
    }

    pub fn delete_for_breakpoint(&self, breakpoint_id: i32) -> usize {
        let mut inner = self.inner.lock();
        let Some(ids) = inner.by_breakpoint.remove(&breakpoint_id) else {
            return 0;
        };
        let mut removed = 0;
        for id in ids {
            if inner.by_id.remove(&id).is_some() {
                removed += 1;
            }
        }
        removed
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.by_id.clear();
        inner.by_breakpoint.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().by_id.is_empty()
    }

    /// The invariant checked after every mutation in tests: the id sets of
    /// both indexes are identical.
    #[cfg(test)]
    fn indexes_agree(&self) -> bool {
        use std::collections::HashSet;

        let inner = self.inner.lock();
        let primary: HashSet<_> = inner.by_id.keys().cloned().collect();
        let derived: HashSet<_> = inner
            .by_breakpoint
            .values()
            .flat_map(|ids| ids.iter().cloned())
            .collect();
        let no_empty_buckets = inner.by_breakpoint.values().all(|ids| !ids.is_empty());
        primary == derived && no_empty_buckets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_get_round_trip() {
        let registry = WatcherRegistry::new();
        let watcher = registry.create("req size", 4, "request.size()");
        assert!(watcher.id.starts_with("w-"));
        assert_eq!(registry.get(&watcher.id), Some(watcher.clone()));
        assert!(registry.indexes_agree());
    }

    #[test]
    fn ids_are_unique_across_creations() {
        let registry = WatcherRegistry::new();
        let a = registry.create("a", 1, "x");
        let b = registry.create("b", 1, "x");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn for_breakpoint_preserves_creation_order() {
        let registry = WatcherRegistry::new();
        let first = registry.create("first", 9, "a");
        let second = registry.create("second", 9, "b");
        registry.create("other", 10, "c");

        let found = registry.for_breakpoint(9);
        assert_eq!(found, vec![first, second]);
        assert!(registry.indexes_agree());
    }

    #[test]
    fn create_then_delete_returns_registry_to_prior_state() {
        let registry = WatcherRegistry::new();
        let watcher = registry.create("w", 2, "expr");
        assert!(registry.delete(&watcher.id));
        assert!(registry.is_empty());
        assert!(registry.for_breakpoint(2).is_empty());
        assert!(registry.indexes_agree());

        assert!(!registry.delete(&watcher.id));
    }

    #[test]
    fn delete_for_breakpoint_reports_count_and_drops_bucket() {
        let registry = WatcherRegistry::new();
        registry.create("a", 5, "x");
        registry.create("b", 5, "y");
        let kept = registry.create("c", 6, "z");

        assert_eq!(registry.delete_for_breakpoint(5), 2);
        assert_eq!(registry.delete_for_breakpoint(5), 0);
        assert_eq!(registry.all(), vec![kept]);
        assert!(registry.indexes_agree());
    }

    #[test]
    fn clear_removes_everything() {
        let registry = WatcherRegistry::new();
        registry.create("a", 1, "x");
        registry.create("b", 2, "y");
        registry.clear();
        assert!(registry.is_empty());
        assert!(registry.indexes_agree());
    }
}
