//! Props View
//!
//! A [`PropsView`] is a read-only snapshot of the host-supplied input for
//! one render pass. Each committed view keeps a back-reference to the view
//! it replaced, one level deep, so update hooks can diff the incoming
//! props against the outgoing ones without either side being mutable.
//!
//! Diffing is shallow: two views differ when their key sets differ
//! (order-independent) or when any shared key maps to a different value.
//! Structural equality inside a value is the value's own concern.

use indexmap::IndexMap;

use crate::transport::Value;

/// An immutable, diffable snapshot of component input.
#[derive(Debug, Clone, PartialEq)]
pub struct PropsView {
    values: IndexMap<String, Value>,
    prev: Option<Box<PropsView>>,
}

impl PropsView {
    /// Build a view with no predecessor (first mount, or a detached view
    /// handed to a hook).
    pub fn new(values: IndexMap<String, Value>) -> Self {
        Self { values, prev: None }
    }

    /// Build an empty view.
    pub fn empty() -> Self {
        Self::new(IndexMap::new())
    }

    /// Build the view for the next render pass, chained to the view it
    /// replaces. The predecessor's own back-reference is truncated so the
    /// chain never grows past one generation.
    pub fn advance(values: IndexMap<String, Value>, mut prev: PropsView) -> Self {
        prev.prev = None;
        Self {
            values,
            prev: Some(Box::new(prev)),
        }
    }

    /// Look up a prop by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Iterate over the prop keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Number of props in this snapshot.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when the snapshot carries no props.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The view this one replaced, if any.
    pub fn prev(&self) -> Option<&PropsView> {
        self.prev.as_deref()
    }

    /// Shallow diff against another view.
    ///
    /// Changed means: the key sets differ (ignoring order), or some shared
    /// key's value is not equal. Neither view is mutated.
    pub fn changed_from(&self, other: &PropsView) -> bool {
        if self.values.len() != other.values.len() {
            return true;
        }
        // Equal lengths, so checking every key of one side covers set
        // difference in both directions.
        for (key, value) in &self.values {
            match other.values.get(key) {
                Some(theirs) if theirs == value => {}
                _ => return true,
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::indexmap;

    fn view(values: IndexMap<String, Value>) -> PropsView {
        PropsView::new(values)
    }

    #[test]
    fn identical_views_are_unchanged() {
        let a = view(indexmap! {
            "title".to_string() => Value::Str("home".into()),
            "count".to_string() => Value::Int(2),
        });
        let b = view(indexmap! {
            "count".to_string() => Value::Int(2),
            "title".to_string() => Value::Str("home".into()),
        });

        // Key order is irrelevant.
        assert!(!a.changed_from(&b));
        assert!(!b.changed_from(&a));
    }

    #[test]
    fn value_change_is_detected() {
        let a = view(indexmap! { "count".to_string() => Value::Int(2) });
        let b = view(indexmap! { "count".to_string() => Value::Int(3) });
        assert!(a.changed_from(&b));
    }

    #[test]
    fn added_or_removed_key_is_detected() {
        let a = view(indexmap! { "count".to_string() => Value::Int(2) });
        let b = view(indexmap! {
            "count".to_string() => Value::Int(2),
            "label".to_string() => Value::Str("x".into()),
        });
        assert!(a.changed_from(&b));
        assert!(b.changed_from(&a));
    }

    #[test]
    fn same_size_different_keys_is_detected() {
        let a = view(indexmap! { "left".to_string() => Value::Int(1) });
        let b = view(indexmap! { "right".to_string() => Value::Int(1) });
        assert!(a.changed_from(&b));
    }

    #[test]
    fn advance_chains_one_generation_only() {
        let first = view(indexmap! { "n".to_string() => Value::Int(1) });
        let second = PropsView::advance(indexmap! { "n".to_string() => Value::Int(2) }, first);
        let third = PropsView::advance(indexmap! { "n".to_string() => Value::Int(3) }, second);

        let prev = third.prev().expect("second generation kept");
        assert_eq!(prev.get("n"), Some(&Value::Int(2)));
        // The first generation was truncated when the third was committed.
        assert!(prev.prev().is_none());
    }
}
