//! Callback Registry
//!
//! Per-definition ordered lists of lifecycle hook handlers. A hook is
//! declared with [`CallbackRegistry::define`], handlers append with
//! [`CallbackRegistry::register`], and [`CallbackRegistry::run`] invokes
//! every handler in registration order. Hooks are fire-and-forget: they
//! return no values, and a failing handler never prevents the handlers
//! registered after it from running — failures are collected and handed
//! back to the adapter for reporting.

use indexmap::IndexMap;
use smallvec::SmallVec;
use std::sync::Arc;

use crate::error::HookError;
use crate::props::PropsView;
use crate::state::{StateContext, StateSnapshot};

/// Standard hook run before the first render.
pub const BEFORE_MOUNT: &str = "before_mount";
/// Standard hook run after the first render.
pub const AFTER_MOUNT: &str = "after_mount";
/// Standard hook run when the host announces pending new props.
pub const BEFORE_RECEIVE_PROPS: &str = "before_receive_props";
/// Standard hook run just before new props/state are applied.
pub const BEFORE_UPDATE: &str = "before_update";
/// Standard hook run just after new props/state are applied.
pub const AFTER_UPDATE: &str = "after_update";
/// Standard hook run while the host tears the instance down.
pub const BEFORE_UNMOUNT: &str = "before_unmount";

/// Read-only views handed to hook handlers alongside the state context.
///
/// Which fields are populated depends on the hook: `before_receive_props`
/// and `before_update` see the incoming snapshot, `after_update` sees the
/// outgoing one, and the mount/unmount hooks see nothing.
#[derive(Debug, Clone, Default)]
pub struct HookArgs {
    /// Pending props, visible to the pre-update hooks.
    pub next_props: Option<PropsView>,
    /// Pending state, visible to `before_update`.
    pub next_state: Option<StateSnapshot>,
    /// The props that were just replaced, visible to `after_update`.
    pub prev_props: Option<PropsView>,
    /// The state that was just replaced, visible to `after_update`.
    pub prev_state: Option<StateSnapshot>,
}

impl HookArgs {
    /// Arguments for hooks that receive nothing.
    pub fn none() -> Self {
        Self::default()
    }

    /// Arguments carrying the incoming props/state.
    pub fn next(props: Option<PropsView>, state: Option<StateSnapshot>) -> Self {
        Self {
            next_props: props,
            next_state: state,
            ..Self::default()
        }
    }

    /// Arguments carrying the outgoing props/state.
    pub fn prev(props: Option<PropsView>, state: Option<StateSnapshot>) -> Self {
        Self {
            prev_props: props,
            prev_state: state,
            ..Self::default()
        }
    }
}

/// A registered hook handler.
pub type Handler = Arc<dyn Fn(&StateContext, &HookArgs) -> Result<(), HookError> + Send + Sync>;

/// Ordered registry of named lifecycle hooks.
#[derive(Clone, Default)]
pub struct CallbackRegistry {
    hooks: IndexMap<String, SmallVec<[Handler; 2]>>,
}

impl CallbackRegistry {
    /// Create a registry with no hooks defined.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the six standard lifecycle hooks defined.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        for hook in [
            BEFORE_MOUNT,
            AFTER_MOUNT,
            BEFORE_RECEIVE_PROPS,
            BEFORE_UPDATE,
            AFTER_UPDATE,
            BEFORE_UNMOUNT,
        ] {
            registry.define(hook);
        }
        registry
    }

    /// Declare that a hook exists and is invokable. Idempotent; an
    /// existing hook keeps its handlers.
    pub fn define(&mut self, hook: impl Into<String>) {
        self.hooks.entry(hook.into()).or_default();
    }

    /// True when the hook has been defined.
    pub fn is_defined(&self, hook: &str) -> bool {
        self.hooks.contains_key(hook)
    }

    /// Append a handler to a defined hook. Registration order is
    /// execution order.
    pub fn register<F>(&mut self, hook: &str, handler: F) -> Result<(), HookError>
    where
        F: Fn(&StateContext, &HookArgs) -> Result<(), HookError> + Send + Sync + 'static,
    {
        match self.hooks.get_mut(hook) {
            Some(handlers) => {
                handlers.push(Arc::new(handler));
                Ok(())
            }
            None => Err(HookError::UnknownHook(hook.to_string())),
        }
    }

    /// Number of handlers registered for a hook.
    pub fn handler_count(&self, hook: &str) -> usize {
        self.hooks.get(hook).map(SmallVec::len).unwrap_or(0)
    }

    /// Invoke every handler registered for a hook, in order, under the
    /// given state context. Failures do not short-circuit: every handler
    /// runs, and the failures are returned for the caller to report.
    /// Running an undefined hook runs nothing.
    pub fn run(&self, hook: &str, ctx: &StateContext, args: &HookArgs) -> Vec<HookError> {
        let Some(handlers) = self.hooks.get(hook) else {
            return Vec::new();
        };

        let mut failures = Vec::new();
        for handler in handlers {
            if let Err(error) = handler(ctx, args) {
                failures.push(error);
            }
        }
        failures
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (hook, handlers) in &self.hooks {
            map.entry(hook, &handlers.len());
        }
        map.finish()
    }
}
