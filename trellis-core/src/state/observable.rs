//! Observable Value
//!
//! An [`Observable`] wraps a value and notifies the owning component
//! instance when the value is replaced, letting a component watch a value
//! without giving it an explicit named state entry.
//!
//! # How observables work
//!
//! 1. A component creates an observable bound to a slot name.
//!
//! 2. Reading it during a render pass (through `RenderScope::read`) records
//!    it as read; at did-mount/did-update the adapter attaches it to the
//!    instance via a [`StateHandle`].
//!
//! 3. A later `set` pushes a one-key state mutation naming the slot through
//!    the attached store, stamping the state timestamp and making the
//!    instance a should-update candidate on the host's next pass.
//!
//! 4. Observables not re-read in the following render pass are detached at
//!    commit; setting a detached observable notifies no one.
//!
//! The handle holds only weak references: an observable notifies its
//! instance, it never keeps the instance alive. By default every `set`
//! notifies, even when the new value equals the old one; equality-based
//! suppression is opt-in via [`NotifyPolicy::SkipEqual`].

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};

use crate::state::store::StateStore;
use crate::transport::Value;

/// Counter for generating unique observable IDs.
static OBSERVABLE_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a new unique observable ID.
fn next_observable_id() -> u64 {
    OBSERVABLE_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Whether `set` should notify when the new value equals the old one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotifyPolicy {
    /// Notify on every `set`. The default: a reference-identical value may
    /// still be logically different to the watcher.
    #[default]
    Always,
    /// Suppress notification when the new value compares equal.
    SkipEqual,
}

/// Weak back-reference from an observable to its owning instance.
///
/// Upgrading fails once the instance is gone, which makes a stale
/// subscription a silent no-op rather than a dangling notification.
#[derive(Clone)]
pub struct StateHandle {
    store: Weak<RwLock<StateStore>>,
    rendering: Weak<AtomicBool>,
}

impl StateHandle {
    pub(crate) fn new(store: Weak<RwLock<StateStore>>, rendering: Weak<AtomicBool>) -> Self {
        Self { store, rendering }
    }

    /// True while the owning instance has a render pass in progress.
    fn rendering_now(&self) -> bool {
        self.rendering
            .upgrade()
            .map(|flag| flag.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    /// Push a one-key state mutation into the owning store, if it is
    /// still alive.
    fn push(&self, slot: &str, value: &Value) {
        if let Some(store) = self.store.upgrade() {
            store
                .write()
                .expect("state store lock poisoned")
                .set_many([(slot.to_string(), value.clone())]);
        }
    }
}

/// A mutation-tracked value bound to a state slot.
pub struct Observable {
    /// Unique identifier, used to diff read sets across render passes.
    id: u64,

    /// The state key a default notification writes to.
    slot: String,

    /// The current value.
    value: Arc<RwLock<Value>>,

    /// Replaces the default notification when present.
    on_change: Option<Arc<dyn Fn(&Value) + Send + Sync>>,

    policy: NotifyPolicy,

    /// The live subscription, None while detached.
    link: Arc<RwLock<Option<StateHandle>>>,
}

impl Observable {
    /// Create a detached observable for the given slot.
    pub fn new(slot: impl Into<String>, value: Value) -> Self {
        Self {
            id: next_observable_id(),
            slot: slot.into(),
            value: Arc::new(RwLock::new(value)),
            on_change: None,
            policy: NotifyPolicy::default(),
            link: Arc::new(RwLock::new(None)),
        }
    }

    /// Replace the default notification with a custom callback.
    pub fn with_on_change<F>(mut self, on_change: F) -> Self
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.on_change = Some(Arc::new(on_change));
        self
    }

    /// Configure equality-based notification suppression.
    pub fn with_policy(mut self, policy: NotifyPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The observable's unique ID.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The state slot this observable reports into.
    pub fn slot(&self) -> &str {
        &self.slot
    }

    /// Clone out the current value.
    pub fn get(&self) -> Value {
        self.value
            .read()
            .expect("observable value lock poisoned")
            .clone()
    }

    /// Replace the value and notify the owning instance.
    ///
    /// Under [`NotifyPolicy::SkipEqual`] an equal replacement is silent.
    /// A notification that would land mid-render is dropped, and a
    /// detached observable notifies no one; the value itself is always
    /// replaced.
    pub fn set(&self, value: Value) {
        let changed = {
            let mut guard = self.value.write().expect("observable value lock poisoned");
            let changed = *guard != value;
            *guard = value.clone();
            changed
        };

        if self.policy == NotifyPolicy::SkipEqual && !changed {
            return;
        }
        self.notify(&value);
    }

    /// Bind this observable to an instance. Called by the adapter when the
    /// observable was read during the render pass being committed.
    pub(crate) fn attach(&self, handle: StateHandle) {
        *self.link.write().expect("observable link lock poisoned") = Some(handle);
    }

    /// Drop the subscription. Called by the adapter for observables that
    /// were not re-read, and at unmount.
    pub(crate) fn detach(&self) {
        *self.link.write().expect("observable link lock poisoned") = None;
    }

    /// True while a subscription is live.
    pub fn is_attached(&self) -> bool {
        self.link
            .read()
            .expect("observable link lock poisoned")
            .is_some()
    }

    fn notify(&self, value: &Value) {
        let handle = self
            .link
            .read()
            .expect("observable link lock poisoned")
            .clone();
        let Some(handle) = handle else { return };

        if handle.rendering_now() {
            tracing::debug!(slot = %self.slot, "observable notification during render dropped");
            return;
        }

        match &self.on_change {
            Some(on_change) => on_change(value),
            None => handle.push(&self.slot, value),
        }
    }
}

impl Clone for Observable {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            slot: self.slot.clone(),
            value: Arc::clone(&self.value),
            on_change: self.on_change.clone(),
            policy: self.policy,
            link: Arc::clone(&self.link),
        }
    }
}

impl std::fmt::Debug for Observable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observable")
            .field("id", &self.id)
            .field("slot", &self.slot)
            .field("attached", &self.is_attached())
            .finish()
    }
}
