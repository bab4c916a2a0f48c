//! # SubscriberSet: ordered handler lists keyed by event name
//!
//! [`SubscriberSet`] is the registry the bus consults for every dispatch. It
//! maps an event name to the handlers registered for it, in registration
//! order, without duplicates.
//!
//! ## Rules
//! - **Insertion order = dispatch order** for each name.
//! - **Identity by pointer**: the same `Arc` registered twice under one name is
//!   kept once; two distinct instances of one type are two handlers.
//! - **Snapshots**: dispatch works on a cloned list, so mutations made while an
//!   event is in flight only affect later events.
//!
//! ```text
//! "time-tick"       ─► [clock-log, expiry, storage]
//! "bundle-received" ─► [expiry]
//! ```
//!
//! The set itself is not synchronized; the bus keeps it behind a mutex.

use std::collections::HashMap;
use std::sync::Arc;

use super::Subscribe;

/// Event name → ordered, de-duplicated handler list.
#[derive(Default)]
pub struct SubscriberSet {
    by_name: HashMap<Arc<str>, Vec<Arc<dyn Subscribe>>>,
}

impl SubscriberSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `sub` to the handlers of `name`.
    ///
    /// Returns `false` if that exact handler is already registered there.
    pub fn insert(&mut self, name: Arc<str>, sub: Arc<dyn Subscribe>) -> bool {
        let list = self.by_name.entry(name).or_default();
        if list.iter().any(|s| same(s, &sub)) {
            return false;
        }
        list.push(sub);
        true
    }

    /// Removes `sub` from the handlers of `name`.
    ///
    /// Returns `false` if it was not registered there.
    pub fn remove(&mut self, name: &str, sub: &Arc<dyn Subscribe>) -> bool {
        let Some(list) = self.by_name.get_mut(name) else {
            return false;
        };
        let before = list.len();
        list.retain(|s| !same(s, sub));
        let removed = list.len() != before;
        if list.is_empty() {
            self.by_name.remove(name);
        }
        removed
    }

    /// Clones the current handler list for `name` (empty if none).
    #[must_use]
    pub fn snapshot(&self, name: &str) -> Vec<Arc<dyn Subscribe>> {
        self.by_name.get(name).cloned().unwrap_or_default()
    }

    /// Number of handlers registered for `name`.
    #[must_use]
    pub fn count(&self, name: &str) -> usize {
        self.by_name.get(name).map_or(0, Vec::len)
    }

    /// Sorted list of names that have at least one handler.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.by_name.keys().map(|n| n.to_string()).collect();
        names.sort_unstable();
        names
    }

    /// True if no handler is registered under any name.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

fn same(a: &Arc<dyn Subscribe>, b: &Arc<dyn Subscribe>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SubscriberError;
    use crate::events::Event;
    use async_trait::async_trait;

    struct Named(&'static str);

    #[async_trait]
    impl Subscribe for Named {
        async fn on_event(&self, _event: &Event) -> Result<(), SubscriberError> {
            Ok(())
        }
        fn name(&self) -> &'static str {
            self.0
        }
    }

    fn sub(name: &'static str) -> Arc<dyn Subscribe> {
        Arc::new(Named(name))
    }

    #[test]
    fn keeps_registration_order() {
        let mut set = SubscriberSet::new();
        let (a, b, c) = (sub("a"), sub("b"), sub("c"));
        set.insert("tick".into(), b.clone());
        set.insert("tick".into(), a.clone());
        set.insert("tick".into(), c.clone());

        let order: Vec<_> = set.snapshot("tick").iter().map(|s| s.name()).collect();
        assert_eq!(order, vec!["b", "a", "c"]);
    }

    #[test]
    fn duplicate_insert_is_noop() {
        let mut set = SubscriberSet::new();
        let a = sub("a");
        assert!(set.insert("tick".into(), a.clone()));
        assert!(!set.insert("tick".into(), a.clone()));
        assert_eq!(set.count("tick"), 1);

        // Same handler under another name is a separate registration.
        assert!(set.insert("other".into(), a));
        assert_eq!(set.names(), vec!["other".to_string(), "tick".to_string()]);
    }

    #[test]
    fn distinct_instances_are_distinct_handlers() {
        let mut set = SubscriberSet::new();
        assert!(set.insert("tick".into(), sub("a")));
        assert!(set.insert("tick".into(), sub("a")));
        assert_eq!(set.count("tick"), 2);
    }

    #[test]
    fn remove_absent_is_noop() {
        let mut set = SubscriberSet::new();
        let a = sub("a");
        assert!(!set.remove("tick", &a));

        set.insert("tick".into(), a.clone());
        assert!(set.remove("tick", &a));
        assert!(!set.remove("tick", &a));
        assert!(set.is_empty());
    }

    #[test]
    fn snapshot_is_detached_from_later_mutations() {
        let mut set = SubscriberSet::new();
        let a = sub("a");
        set.insert("tick".into(), a.clone());
        let snap = set.snapshot("tick");
        set.remove("tick", &a);
        assert_eq!(snap.len(), 1);
        assert!(set.snapshot("tick").is_empty());
    }
}
