//! State Context
//!
//! The state context attributes in-progress state mutations to the
//! component instance whose hook is currently executing. Rather than an
//! ambient thread-local, every hook handler receives an explicit
//! [`StateContext`] argument; mutations route through it and land in that
//! instance's store.
//!
//! The context never holds a lock across user code. Reads clone values
//! out; writes take a short write lock per operation, so user code is free
//! to mutate state again from inside a handler.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use crate::component::HostNode;
use crate::props::PropsView;
use crate::state::observable::StateHandle;
use crate::state::store::{StateSnapshot, StateStore};
use crate::transport::Value;

/// Handle attributing state mutations to one component instance.
#[derive(Clone)]
pub struct StateContext {
    component: String,
    node: HostNode,
    store: Arc<RwLock<StateStore>>,
    rendering: Arc<AtomicBool>,
    props: PropsView,
}

impl StateContext {
    /// Build a context scoped to one instance's store and render flag.
    pub(crate) fn new(
        component: String,
        node: HostNode,
        store: Arc<RwLock<StateStore>>,
        rendering: Arc<AtomicBool>,
        props: PropsView,
    ) -> Self {
        Self {
            component,
            node,
            store,
            rendering,
            props,
        }
    }

    /// Name of the component definition this context belongs to.
    pub fn component(&self) -> &str {
        &self.component
    }

    /// The host node the instance is bound to.
    pub fn node(&self) -> HostNode {
        self.node
    }

    /// The props snapshot current at the time the hook was entered.
    pub fn props(&self) -> &PropsView {
        &self.props
    }

    /// Read a state entry, cloning it out of the store.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.store
            .read()
            .expect("state store lock poisoned")
            .get(key)
            .cloned()
    }

    /// A copy of the instance's current state.
    pub fn snapshot(&self) -> StateSnapshot {
        self.store
            .read()
            .expect("state store lock poisoned")
            .snapshot()
    }

    /// Mutate a single state entry.
    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.set_many([(key.into(), value)]);
    }

    /// Merge entries into the instance's state, stamping the reserved
    /// timestamp. A mutation arriving while the instance is mid-render is
    /// dropped rather than re-entering the render pass.
    pub fn set_many<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        if self.rendering.load(Ordering::SeqCst) {
            tracing::debug!(
                component = %self.component,
                node = self.node.raw(),
                "state mutation during render dropped"
            );
            return;
        }
        self.store
            .write()
            .expect("state store lock poisoned")
            .set_many(entries);
    }

    /// A weak handle suitable for an Observable subscription. The handle
    /// notifies the store but does not keep it alive.
    pub fn handle(&self) -> StateHandle {
        StateHandle::new(Arc::downgrade(&self.store), Arc::downgrade(&self.rendering))
    }
}

impl std::fmt::Debug for StateContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateContext")
            .field("component", &self.component)
            .field("node", &self.node)
            .field("rendering", &self.rendering.load(Ordering::SeqCst))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::store::UPDATED_AT_KEY;

    fn context(store: Arc<RwLock<StateStore>>, rendering: Arc<AtomicBool>) -> StateContext {
        StateContext::new(
            "probe".to_string(),
            HostNode::from_raw(1),
            store,
            rendering,
            PropsView::empty(),
        )
    }

    #[test]
    fn mutations_land_in_the_store() {
        let store = Arc::new(RwLock::new(StateStore::new()));
        let ctx = context(store.clone(), Arc::new(AtomicBool::new(false)));

        ctx.set("count", Value::Int(3));

        let guard = store.read().unwrap();
        assert_eq!(guard.get("count"), Some(&Value::Int(3)));
        assert!(guard.get(UPDATED_AT_KEY).is_some());
    }

    #[test]
    fn mutation_during_render_is_dropped() {
        let store = Arc::new(RwLock::new(StateStore::new()));
        let rendering = Arc::new(AtomicBool::new(true));
        let ctx = context(store.clone(), rendering.clone());

        ctx.set("count", Value::Int(3));
        assert!(store.read().unwrap().is_empty());

        rendering.store(false, Ordering::SeqCst);
        ctx.set("count", Value::Int(3));
        assert_eq!(ctx.get("count"), Some(Value::Int(3)));
    }
}
