//! State Store
//!
//! Per-instance mapping from state key to value. Every mutation through
//! [`StateStore::set_many`] also stamps the reserved timestamp key, so
//! deciding whether two state snapshots differ collapses to a single
//! timestamp comparison instead of a deep value comparison.
//!
//! The trade is a mutation-discipline invariant: change detection trusts
//! that every mutation path goes through `set_many`. Snapshots missing the
//! stamp are treated as changed (fail open) rather than compared deeply.

use std::time::{SystemTime, UNIX_EPOCH};

use indexmap::IndexMap;

use crate::transport::Value;

/// Reserved state key holding the last-mutated-at stamp.
///
/// The key exists purely for change detection and is carried alongside
/// ordinary state entries.
pub const UPDATED_AT_KEY: &str = "__updated_at__";

/// A point-in-time copy of a component's state.
pub type StateSnapshot = IndexMap<String, Value>;

/// Microseconds since the Unix epoch.
fn clock_micros() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as i64)
        .unwrap_or(0)
}

/// Component-local state, scoped to one mounted instance.
#[derive(Debug, Default)]
pub struct StateStore {
    values: IndexMap<String, Value>,
    /// Last stamp written, kept so stamps stay strictly increasing even
    /// when two mutations land within one clock instant.
    last_stamp: i64,
    initialized: bool,
}

impl StateStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a state entry by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// A copy of the current state, including the reserved stamp.
    pub fn snapshot(&self) -> StateSnapshot {
        self.values.clone()
    }

    /// True when the store holds no entries at all.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The last stamp written by `set_many`, or 0 if never stamped.
    pub fn last_stamp(&self) -> i64 {
        self.last_stamp
    }

    /// Merge the given entries into the store and stamp the reserved
    /// timestamp key. The stamp is strictly greater than any stamp this
    /// store has written before.
    pub fn set_many<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        for (key, value) in entries {
            self.values.insert(key, value);
        }
        let stamp = clock_micros().max(self.last_stamp + 1);
        self.last_stamp = stamp;
        self.values
            .insert(UPDATED_AT_KEY.to_string(), Value::Int(stamp));
    }

    /// Seed the store from a definition-level default, exactly once.
    ///
    /// Seeding is not a mutation: it does not stamp the reserved key, so a
    /// component whose state never changes after mount compares as
    /// undecidable (and therefore changed) rather than falsely unchanged.
    /// Returns false if the store was already initialized.
    pub fn initialize(&mut self, defaults: &StateSnapshot) -> bool {
        if self.initialized {
            return false;
        }
        self.initialized = true;
        for (key, value) in defaults {
            self.values.insert(key.clone(), value.clone());
        }
        true
    }

    /// Release the store at unmount.
    pub fn remove(&mut self) {
        self.values.clear();
        self.initialized = false;
    }
}

/// Decide whether two state snapshots differ, by stamp.
///
/// Both sides are normalized to absent when missing or empty. Exactly one
/// absent side means changed; two absent sides mean unchanged. When both
/// are present the reserved stamps are compared; a missing stamp on either
/// side is undecidable and reported as changed.
pub fn state_changed(current: Option<&StateSnapshot>, next: Option<&StateSnapshot>) -> bool {
    let current = current.filter(|s| !s.is_empty());
    let next = next.filter(|s| !s.is_empty());

    match (current, next) {
        (None, None) => false,
        (None, Some(_)) | (Some(_), None) => true,
        (Some(current), Some(next)) => {
            match (current.get(UPDATED_AT_KEY), next.get(UPDATED_AT_KEY)) {
                (Some(a), Some(b)) => a != b,
                _ => true,
            }
        }
    }
}
