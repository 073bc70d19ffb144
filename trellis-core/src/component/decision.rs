//! Update Decision Views
//!
//! When a definition supplies its own should-update function, the adapter
//! hands it these two views instead of recomputing the default diff
//! itself. Each view exposes a derived `changed()` boolean, computed
//! lazily on first call and memoized, so a decision function that never
//! asks pays nothing.

use std::cell::Cell;

use crate::props::PropsView;
use crate::state::{state_changed, StateSnapshot};
use crate::transport::Value;

/// The pending props, diffable against the props currently committed.
pub struct PropsDiff<'a> {
    next: &'a PropsView,
    current: &'a PropsView,
    changed: Cell<Option<bool>>,
}

impl<'a> PropsDiff<'a> {
    pub(crate) fn new(next: &'a PropsView, current: &'a PropsView) -> Self {
        Self {
            next,
            current,
            changed: Cell::new(None),
        }
    }

    /// The incoming props snapshot.
    pub fn next(&self) -> &PropsView {
        self.next
    }

    /// Look up an incoming prop by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.next.get(key)
    }

    /// Whether the incoming props differ from the committed ones.
    /// Computed once, shallow.
    pub fn changed(&self) -> bool {
        if let Some(cached) = self.changed.get() {
            return cached;
        }
        let changed = self.next.changed_from(self.current);
        self.changed.set(Some(changed));
        changed
    }
}

/// The pending state, diffable against the state currently committed.
pub struct StateDiff<'a> {
    next: Option<&'a StateSnapshot>,
    current: Option<&'a StateSnapshot>,
    changed: Cell<Option<bool>>,
}

impl<'a> StateDiff<'a> {
    pub(crate) fn new(current: Option<&'a StateSnapshot>, next: Option<&'a StateSnapshot>) -> Self {
        Self {
            next,
            current,
            changed: Cell::new(None),
        }
    }

    /// The incoming state snapshot, if the host supplied one.
    pub fn next(&self) -> Option<&StateSnapshot> {
        self.next
    }

    /// Look up an incoming state entry by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.next.and_then(|s| s.get(key))
    }

    /// Whether the incoming state differs from the committed one, by the
    /// reserved-stamp rule. Computed once.
    pub fn changed(&self) -> bool {
        if let Some(cached) = self.changed.get() {
            return cached;
        }
        let changed = state_changed(self.current, self.next);
        self.changed.set(Some(changed));
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StateStore;
    use indexmap::indexmap;

    #[test]
    fn props_diff_memoizes_changed() {
        let current = PropsView::new(indexmap! { "n".to_string() => Value::Int(1) });
        let next = PropsView::new(indexmap! { "n".to_string() => Value::Int(2) });

        let diff = PropsDiff::new(&next, &current);
        assert!(diff.changed());
        // Cached; same answer without recomputation.
        assert!(diff.changed());
        assert_eq!(diff.get("n"), Some(&Value::Int(2)));
    }

    #[test]
    fn props_diff_unchanged_for_identical_views() {
        let current = PropsView::new(indexmap! { "n".to_string() => Value::Int(1) });
        let next = current.clone();
        let diff = PropsDiff::new(&next, &current);
        assert!(!diff.changed());
    }

    #[test]
    fn state_diff_follows_stamp_rule() {
        let mut store = StateStore::new();
        store.set_many([("a".to_string(), Value::Int(1))]);
        let before = store.snapshot();
        store.set_many([("a".to_string(), Value::Int(2))]);
        let after = store.snapshot();

        let before_copy = before.clone();
        let same = StateDiff::new(Some(&before), Some(&before_copy));
        assert!(!same.changed());

        let moved = StateDiff::new(Some(&before), Some(&after));
        assert!(moved.changed());
        assert_eq!(moved.get("a"), Some(&Value::Int(2)));
    }

    #[test]
    fn state_diff_absent_sides() {
        let empty = StateDiff::new(None, None);
        assert!(!empty.changed());

        let mut store = StateStore::new();
        store.set_many([("a".to_string(), Value::Int(1))]);
        let snap = store.snapshot();
        let one_side = StateDiff::new(None, Some(&snap));
        assert!(one_side.changed());
    }
}
