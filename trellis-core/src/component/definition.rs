//! Component Definitions
//!
//! A [`ComponentDef`] is the immutable description of a component type:
//! its name, lifecycle hook handlers, initial state, render function, and
//! optional update-decision and exception hooks. Definitions are built by
//! explicit composition through [`ComponentDefBuilder`] — each capability
//! is a named builder step, not a runtime-injected mixin.
//!
//! [`ComponentRegistry`] is the surface exposed to the page/controller
//! collaborator: definitions register under their names, and
//! `render_component` dispatches a name plus an input mapping into a
//! mounted instance and returns host-renderable output.

use std::sync::{Arc, RwLock};

use indexmap::IndexMap;

use crate::callbacks::{CallbackRegistry, HookArgs};
use crate::component::adapter::{ComponentInstance, HostNode, RenderScope};
use crate::component::decision::{PropsDiff, StateDiff};
use crate::error::{HookError, RegistryError, ReportedError};
use crate::state::{StateContext, StateSnapshot};
use crate::transport::{to_transport_value, Value};

/// The user-defined render function.
pub type RenderFn = Arc<dyn Fn(&mut RenderScope) -> Result<Value, HookError> + Send + Sync>;

/// A custom should-update decision function.
pub type DecisionFn =
    Arc<dyn for<'a> Fn(&PropsDiff<'a>, &StateDiff<'a>) -> Result<bool, HookError> + Send + Sync>;

/// A custom observer for contained failures.
pub type ExceptionFn = Arc<dyn Fn(&ReportedError) + Send + Sync>;

/// Immutable description of a component type.
pub struct ComponentDef {
    name: String,
    callbacks: CallbackRegistry,
    initial_state: Option<StateSnapshot>,
    render: RenderFn,
    needs_update: Option<DecisionFn>,
    on_exception: Option<ExceptionFn>,
}

impl ComponentDef {
    /// Start building a definition with the standard lifecycle hooks
    /// defined and no handlers registered.
    pub fn builder(name: impl Into<String>) -> ComponentDefBuilder {
        ComponentDefBuilder {
            name: name.into(),
            callbacks: CallbackRegistry::standard(),
            initial_state: None,
            render: None,
            needs_update: None,
            on_exception: None,
        }
    }

    /// The component type's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The definition's hook registry.
    pub fn callbacks(&self) -> &CallbackRegistry {
        &self.callbacks
    }

    /// The definition-level state default, if any.
    pub fn initial_state(&self) -> Option<&StateSnapshot> {
        self.initial_state.as_ref()
    }

    pub(crate) fn render_fn(&self) -> &RenderFn {
        &self.render
    }

    pub(crate) fn decision_fn(&self) -> Option<&DecisionFn> {
        self.needs_update.as_ref()
    }

    pub(crate) fn exception_fn(&self) -> Option<&ExceptionFn> {
        self.on_exception.as_ref()
    }
}

impl std::fmt::Debug for ComponentDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentDef")
            .field("name", &self.name)
            .field("callbacks", &self.callbacks)
            .field("has_initial_state", &self.initial_state.is_some())
            .field("has_needs_update", &self.needs_update.is_some())
            .finish()
    }
}

/// Assembles a [`ComponentDef`] from named capabilities.
pub struct ComponentDefBuilder {
    name: String,
    callbacks: CallbackRegistry,
    initial_state: Option<StateSnapshot>,
    render: Option<RenderFn>,
    needs_update: Option<DecisionFn>,
    on_exception: Option<ExceptionFn>,
}

impl ComponentDefBuilder {
    /// Seed every instance's state store from this snapshot at mount.
    pub fn initial_state(mut self, state: StateSnapshot) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Declare a non-standard hook so handlers can register for it.
    pub fn define_hook(mut self, hook: impl Into<String>) -> Self {
        self.callbacks.define(hook);
        self
    }

    /// Register a handler for a hook. The hook is defined on first use
    /// here; direct [`CallbackRegistry`] users must define hooks before
    /// registering.
    pub fn on<F>(mut self, hook: &str, handler: F) -> Self
    where
        F: Fn(&StateContext, &HookArgs) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.callbacks.define(hook);
        // Cannot fail: the hook was just defined.
        let _ = self.callbacks.register(hook, handler);
        self
    }

    /// Supply the render function.
    pub fn render<F>(mut self, render: F) -> Self
    where
        F: Fn(&mut RenderScope) -> Result<Value, HookError> + Send + Sync + 'static,
    {
        self.render = Some(Arc::new(render));
        self
    }

    /// Supply a custom should-update decision function.
    pub fn needs_update<F>(mut self, decide: F) -> Self
    where
        F: for<'a> Fn(&PropsDiff<'a>, &StateDiff<'a>) -> Result<bool, HookError>
            + Send
            + Sync
            + 'static,
    {
        self.needs_update = Some(Arc::new(decide));
        self
    }

    /// Observe every contained failure, in addition to the default sink.
    pub fn on_exception<F>(mut self, observer: F) -> Self
    where
        F: Fn(&ReportedError) + Send + Sync + 'static,
    {
        self.on_exception = Some(Arc::new(observer));
        self
    }

    /// Finish the definition. A definition built without a render
    /// function renders to a contained `no render defined` failure and
    /// empty output.
    pub fn build(self) -> ComponentDef {
        ComponentDef {
            name: self.name,
            callbacks: self.callbacks,
            initial_state: self.initial_state,
            render: self
                .render
                .unwrap_or_else(|| Arc::new(|_| Err(HookError::NoRenderDefined))),
            needs_update: self.needs_update,
            on_exception: self.on_exception,
        }
    }
}

/// Named-component dispatch surface.
#[derive(Default)]
pub struct ComponentRegistry {
    defs: RwLock<IndexMap<String, Arc<ComponentDef>>>,
}

impl ComponentRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition under its name.
    pub fn register(&self, def: ComponentDef) -> Result<(), RegistryError> {
        let mut defs = self.defs.write().expect("component registry lock poisoned");
        if defs.contains_key(def.name()) {
            return Err(RegistryError::DuplicateComponent(def.name().to_string()));
        }
        defs.insert(def.name().to_string(), Arc::new(def));
        Ok(())
    }

    /// Look up a definition by name.
    pub fn get(&self, name: &str) -> Option<Arc<ComponentDef>> {
        self.defs
            .read()
            .expect("component registry lock poisoned")
            .get(name)
            .cloned()
    }

    /// Registered component names, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.defs
            .read()
            .expect("component registry lock poisoned")
            .keys()
            .cloned()
            .collect()
    }

    /// Dispatch a named component: instantiate it against a fresh host
    /// node, drive the mount sequence (will-mount, render, did-mount),
    /// and return the rendered tree in the host's native representation.
    ///
    /// User-code failures during the sequence are contained by the
    /// instance as usual and yield empty output rather than an error here.
    pub fn render_component(
        &self,
        name: &str,
        props: IndexMap<String, Value>,
    ) -> Result<serde_json::Value, RegistryError> {
        let def = self
            .get(name)
            .ok_or_else(|| RegistryError::UnknownComponent(name.to_string()))?;

        let mut instance = ComponentInstance::new(def, HostNode::next());
        instance.component_will_mount(props);
        let tree = instance.render();
        instance.component_did_mount();
        Ok(to_transport_value(&tree))
    }
}

impl std::fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("names", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::indexmap;

    #[test]
    fn builder_assembles_capabilities() {
        let def = ComponentDef::builder("badge")
            .initial_state(indexmap! { "count".to_string() => Value::Int(0) })
            .on(crate::callbacks::BEFORE_MOUNT, |_, _| Ok(()))
            .render(|_| Ok(Value::Str("badge".into())))
            .build();

        assert_eq!(def.name(), "badge");
        assert!(def.initial_state().is_some());
        assert_eq!(
            def.callbacks().handler_count(crate::callbacks::BEFORE_MOUNT),
            1
        );
    }

    #[test]
    fn registry_rejects_duplicates_and_unknowns() {
        let registry = ComponentRegistry::new();
        registry
            .register(ComponentDef::builder("page").render(|_| Ok(Value::Null)).build())
            .unwrap();

        let duplicate =
            registry.register(ComponentDef::builder("page").render(|_| Ok(Value::Null)).build());
        assert!(matches!(
            duplicate,
            Err(RegistryError::DuplicateComponent(name)) if name == "page"
        ));

        let missing = registry.render_component("absent", IndexMap::new());
        assert!(matches!(
            missing,
            Err(RegistryError::UnknownComponent(name)) if name == "absent"
        ));
    }

    #[test]
    fn render_component_drives_the_mount_sequence() {
        let registry = ComponentRegistry::new();
        registry
            .register(
                ComponentDef::builder("greeting")
                    .render(|scope| {
                        let who = scope
                            .props()
                            .get("who")
                            .and_then(Value::as_str)
                            .unwrap_or("world")
                            .to_string();
                        Ok(Value::Map(indexmap! {
                            "tag".to_string() => Value::Str("p".into()),
                            "text".to_string() => Value::Str(format!("hello {who}")),
                        }))
                    })
                    .build(),
            )
            .unwrap();

        let output = registry
            .render_component(
                "greeting",
                indexmap! { "who".to_string() => Value::Str("trellis".into()) },
            )
            .unwrap();

        assert_eq!(
            output,
            serde_json::json!({ "tag": "p", "text": "hello trellis" })
        );
    }

    #[test]
    fn missing_render_yields_empty_output() {
        let registry = ComponentRegistry::new();
        registry
            .register(ComponentDef::builder("bare").build())
            .unwrap();

        let output = registry.render_component("bare", IndexMap::new()).unwrap();
        assert_eq!(output, serde_json::Value::Null);
    }
}
