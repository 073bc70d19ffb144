//! Lifecycle Adapter
//!
//! [`ComponentInstance`] sits between the host rendering engine and a
//! component definition. The host drives a fixed, synchronous call
//! sequence — will-mount, render, did-mount, then update and unmount
//! rounds — and the adapter translates each call into ordered user-hook
//! invocations over the instance's own state model.
//!
//! # Contract with the host
//!
//! Two properties hold at every entry point:
//!
//! - No user-code failure crosses back into the host. Failures are routed
//!   to the instance's error sink exactly once and the call returns
//!   normally; a failed render returns empty output.
//!
//! - `should_component_update` never answers a false "no". When the
//!   answer is undecidable (missing state stamps, a failing decision
//!   function, an out-of-phase call) it degrades to "changed". A wrong
//!   "yes" costs a render; a wrong "no" is silently stale UI.
//!
//! # Phase machine
//!
//! Host discipline is not trusted blindly. The instance tracks an explicit
//! [`Phase`] and a call arriving outside its valid phase is logged and
//! ignored, which keeps the adapter testable without a real host driving
//! it.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use indexmap::IndexMap;

use crate::callbacks::{
    HookArgs, AFTER_MOUNT, AFTER_UPDATE, BEFORE_MOUNT, BEFORE_RECEIVE_PROPS, BEFORE_UNMOUNT,
    BEFORE_UPDATE,
};
use crate::component::decision::{PropsDiff, StateDiff};
use crate::component::definition::ComponentDef;
use crate::error::{ErrorSink, HookError, ReportedError};
use crate::props::PropsView;
use crate::state::{state_changed, Observable, StateContext, StateSnapshot, StateStore};
use crate::transport::Value;

/// Counter for minting host node handles on behalf of the dispatch layer.
static NODE_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Opaque identity of a host-side native node.
///
/// The node itself is owned by the host; the adapter only carries its
/// identity for attribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostNode(u64);

impl HostNode {
    /// Mint a fresh handle. Used when this side acts as the host, e.g.
    /// registry dispatch.
    pub fn next() -> Self {
        Self(NODE_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Wrap an identity supplied by the host.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw identity value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Where an instance sits in the host's mount/update/unmount protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Constructed, not yet mounted.
    Unmounted,
    /// Between will-mount and did-mount.
    Mounting,
    /// Live; updates and renders are valid.
    Mounted,
    /// Between will-update and did-update.
    Updating,
    /// Inside will-unmount.
    Unmounting,
    /// Torn down; no further calls are valid.
    Dead,
}

/// Clears the render-in-progress flag on every exit path.
struct RenderGuard(Arc<AtomicBool>);

impl RenderGuard {
    fn engage(flag: Arc<AtomicBool>) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for RenderGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Scope handed to the render function for one render pass.
///
/// Reads of state and props go through here, observable reads are
/// recorded for subscription commit, and resource-wait tokens accumulate
/// for the host to inspect afterward. State mutation during the pass is
/// dropped by the render flag, never re-entering render.
pub struct RenderScope {
    ctx: StateContext,
    reads: Vec<Observable>,
    waiting_on: Vec<String>,
}

impl RenderScope {
    fn new(ctx: StateContext) -> Self {
        Self {
            ctx,
            reads: Vec::new(),
            waiting_on: Vec::new(),
        }
    }

    /// The props committed for this render pass.
    pub fn props(&self) -> &PropsView {
        self.ctx.props()
    }

    /// Read a state entry.
    pub fn state(&self, key: &str) -> Option<Value> {
        self.ctx.get(key)
    }

    /// The state context, for handlers that share helpers with hooks.
    pub fn context(&self) -> &StateContext {
        &self.ctx
    }

    /// Read an observable, recording it so the subscription survives the
    /// next commit. An observable not read through the scope this pass
    /// loses its subscription at that commit.
    pub fn read(&mut self, observable: &Observable) -> Value {
        self.reads.push(observable.clone());
        observable.get()
    }

    /// Record that the rendered tree is still waiting on an external
    /// resource. Reported to the host, not a suspension.
    pub fn wait_on(&mut self, token: impl Into<String>) {
        let token = token.into();
        if !self.waiting_on.contains(&token) {
            self.waiting_on.push(token);
        }
    }

    fn into_parts(self) -> (Vec<Observable>, Vec<String>) {
        (self.reads, self.waiting_on)
    }
}

/// One host-managed mounted component.
pub struct ComponentInstance {
    def: Arc<ComponentDef>,
    node: HostNode,
    phase: Phase,
    store: Arc<RwLock<StateStore>>,
    rendering: Arc<AtomicBool>,
    props: PropsView,
    /// Observables with live subscriptions, from the last commit.
    watched: Vec<Observable>,
    /// Observables read during the render pass awaiting commit.
    pending_reads: Vec<Observable>,
    /// Resource-wait tokens produced by the last successful render.
    waiting_on: Vec<String>,
    errors: ErrorSink,
}

impl ComponentInstance {
    /// Construct an instance for the given definition and host node.
    /// The host must call `component_will_mount` before anything else.
    pub fn new(def: Arc<ComponentDef>, node: HostNode) -> Self {
        Self {
            def,
            node,
            phase: Phase::Unmounted,
            store: Arc::new(RwLock::new(StateStore::new())),
            rendering: Arc::new(AtomicBool::new(false)),
            props: PropsView::empty(),
            watched: Vec::new(),
            pending_reads: Vec::new(),
            waiting_on: Vec::new(),
            errors: ErrorSink::new(),
        }
    }

    /// The definition this instance was built from.
    pub fn def(&self) -> &Arc<ComponentDef> {
        &self.def
    }

    /// The host node this instance is bound to.
    pub fn node(&self) -> HostNode {
        self.node
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The props committed for the current render pass.
    pub fn props(&self) -> &PropsView {
        &self.props
    }

    /// A copy of the instance's current state.
    pub fn state_snapshot(&self) -> StateSnapshot {
        self.store
            .read()
            .expect("state store lock poisoned")
            .snapshot()
    }

    /// Resource-wait tokens reported by the last render.
    pub fn waiting_on_resources(&self) -> &[String] {
        &self.waiting_on
    }

    /// Handle to the instance's contained-failure record.
    pub fn errors(&self) -> ErrorSink {
        self.errors.clone()
    }

    /// A state context attributing mutations to this instance. Handed to
    /// hooks automatically; exposed for host glue that mutates state
    /// between lifecycle calls.
    pub fn state_context(&self) -> StateContext {
        StateContext::new(
            self.def.name().to_string(),
            self.node,
            Arc::clone(&self.store),
            Arc::clone(&self.rendering),
            self.props.clone(),
        )
    }

    /// Create an observable bound to one of this instance's state slots.
    /// It starts detached; reading it through the render scope and
    /// committing at did-mount/did-update makes the subscription live.
    pub fn watch(&self, slot: impl Into<String>, value: Value) -> Observable {
        Observable::new(slot, value)
    }

    // ------------------------------------------------------------------
    // Host-driven lifecycle hooks
    // ------------------------------------------------------------------

    /// Host hook: the instance is about to mount.
    ///
    /// Builds the initial props view, seeds state from the definition
    /// default, and runs `before_mount` handlers.
    pub fn component_will_mount(&mut self, props: IndexMap<String, Value>) {
        if !self.transition(Phase::Unmounted, Phase::Mounting, "component_will_mount") {
            return;
        }
        self.props = PropsView::new(props);
        if let Some(defaults) = self.def.initial_state() {
            self.store
                .write()
                .expect("state store lock poisoned")
                .initialize(defaults);
        }
        self.run_hook(BEFORE_MOUNT, &HookArgs::none());
    }

    /// Host hook: the first render committed.
    ///
    /// Runs `after_mount` handlers and turns the render pass's observable
    /// reads into live subscriptions.
    pub fn component_did_mount(&mut self) {
        if !self.transition(Phase::Mounting, Phase::Mounted, "component_did_mount") {
            return;
        }
        self.run_hook(AFTER_MOUNT, &HookArgs::none());
        self.commit_subscriptions();
    }

    /// Host hook: new props are pending. Runs `before_receive_props`
    /// handlers with a read-only view of the incoming props.
    pub fn component_will_receive_props(&mut self, next_props: IndexMap<String, Value>) {
        if self.phase != Phase::Mounted {
            self.out_of_phase("component_will_receive_props");
            return;
        }
        self.run_hook(
            BEFORE_RECEIVE_PROPS,
            &HookArgs::next(Some(PropsView::new(next_props)), None),
        );
    }

    /// Host hook: should this instance re-render for the pending
    /// props/state?
    ///
    /// With a custom decision function the answer is whatever it returns,
    /// with props/state diff views servicing its `changed()` queries on
    /// demand. Without one, the answer is props-changed OR state-changed.
    /// Undecidable situations answer `true`.
    pub fn should_component_update(
        &self,
        next_props: &IndexMap<String, Value>,
        next_state: Option<&StateSnapshot>,
    ) -> bool {
        if self.phase != Phase::Mounted {
            self.out_of_phase("should_component_update");
            return true;
        }

        let next_view = PropsView::new(next_props.clone());
        let current_state = self.state_snapshot();

        match self.def.decision_fn() {
            Some(decide) => {
                let props_diff = PropsDiff::new(&next_view, &self.props);
                let state_diff = StateDiff::new(Some(&current_state), next_state);
                match decide(&props_diff, &state_diff) {
                    Ok(update) => update,
                    Err(error) => {
                        self.report("needs_update", error);
                        true
                    }
                }
            }
            None => {
                next_view.changed_from(&self.props)
                    || state_changed(Some(&current_state), next_state)
            }
        }
    }

    /// Host hook: the pending props/state are about to apply.
    ///
    /// Runs `before_update` handlers with read-only next views, then
    /// commits the incoming props as the new view, chained to the one it
    /// replaces.
    pub fn component_will_update(
        &mut self,
        next_props: IndexMap<String, Value>,
        next_state: Option<StateSnapshot>,
    ) {
        if !self.transition(Phase::Mounted, Phase::Updating, "component_will_update") {
            return;
        }
        self.run_hook(
            BEFORE_UPDATE,
            &HookArgs::next(Some(PropsView::new(next_props.clone())), next_state),
        );
        let prev = std::mem::replace(&mut self.props, PropsView::empty());
        self.props = PropsView::advance(next_props, prev);
    }

    /// Host hook: the update applied. Runs `after_update` handlers with
    /// read-only previous views and re-commits observable subscriptions
    /// from the just-completed render.
    pub fn component_did_update(
        &mut self,
        prev_props: IndexMap<String, Value>,
        prev_state: Option<StateSnapshot>,
    ) {
        if !self.transition(Phase::Updating, Phase::Mounted, "component_did_update") {
            return;
        }
        self.run_hook(
            AFTER_UPDATE,
            &HookArgs::prev(Some(PropsView::new(prev_props)), prev_state),
        );
        self.commit_subscriptions();
    }

    /// Host hook: the host is tearing this instance down. Runs
    /// `before_unmount` handlers, then releases the store and every
    /// observable subscription. No further calls are valid.
    pub fn component_will_unmount(&mut self) {
        if !self.transition(Phase::Mounted, Phase::Unmounting, "component_will_unmount") {
            return;
        }
        self.run_hook(BEFORE_UNMOUNT, &HookArgs::none());
        for observable in self.watched.drain(..) {
            observable.detach();
        }
        self.pending_reads.clear();
        self.store
            .write()
            .expect("state store lock poisoned")
            .remove();
        self.phase = Phase::Dead;
    }

    /// Host hook: produce output.
    ///
    /// Runs the definition's render function under the render flag,
    /// recording observable reads and resource waits. A failing render is
    /// reported and returns empty output; the flag clears on every exit
    /// path.
    pub fn render(&mut self) -> Value {
        if matches!(self.phase, Phase::Unmounted | Phase::Dead) {
            self.out_of_phase("render");
            return Value::Null;
        }

        let _guard = RenderGuard::engage(Arc::clone(&self.rendering));
        let mut scope = RenderScope::new(self.state_context());
        let output = (self.def.render_fn())(&mut scope);
        let (reads, waiting_on) = scope.into_parts();
        self.pending_reads = reads;

        match output {
            Ok(tree) => {
                self.waiting_on = waiting_on;
                tree
            }
            Err(error) => {
                // No tree was produced, so nothing is waiting on anything.
                self.waiting_on = Vec::new();
                self.report("render", error);
                Value::Null
            }
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn transition(&mut self, from: Phase, to: Phase, call: &str) -> bool {
        if self.phase != from {
            self.out_of_phase(call);
            return false;
        }
        self.phase = to;
        true
    }

    fn out_of_phase(&self, call: &str) {
        tracing::warn!(
            component = %self.def.name(),
            node = self.node.raw(),
            phase = ?self.phase,
            call,
            "lifecycle call out of order, ignoring"
        );
    }

    fn run_hook(&self, hook: &str, args: &HookArgs) {
        let ctx = self.state_context();
        for error in self.def.callbacks().run(hook, &ctx, args) {
            self.report(hook, error);
        }
    }

    fn report(&self, origin: &str, error: HookError) {
        let report = ReportedError {
            component: self.def.name().to_string(),
            node: self.node,
            origin: origin.to_string(),
            error,
        };
        if let Some(observer) = self.def.exception_fn() {
            observer(&report);
        }
        self.errors.report(report);
    }

    /// Turn the reads recorded by the last render pass into the live
    /// subscription set: newly read observables attach, previously
    /// watched observables that were not re-read detach.
    fn commit_subscriptions(&mut self) {
        let reads = std::mem::take(&mut self.pending_reads);

        let mut fresh: Vec<Observable> = Vec::with_capacity(reads.len());
        for observable in reads {
            if fresh.iter().all(|seen| seen.id() != observable.id()) {
                fresh.push(observable);
            }
        }

        for old in &self.watched {
            if fresh.iter().all(|new| new.id() != old.id()) {
                old.detach();
            }
        }

        let handle = self.state_context().handle();
        for observable in &fresh {
            observable.attach(handle.clone());
        }
        self.watched = fresh;
    }
}

impl std::fmt::Debug for ComponentInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentInstance")
            .field("component", &self.def.name())
            .field("node", &self.node)
            .field("phase", &self.phase)
            .field("watched", &self.watched.len())
            .field("waiting_on", &self.waiting_on)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callbacks::BEFORE_MOUNT;
    use indexmap::indexmap;

    fn counter_def() -> Arc<ComponentDef> {
        Arc::new(
            ComponentDef::builder("counter")
                .initial_state(indexmap! { "count".to_string() => Value::Int(0) })
                .render(|scope| {
                    let count = scope.state("count").unwrap_or(Value::Null);
                    Ok(Value::Map(indexmap! {
                        "tag".to_string() => Value::Str("span".into()),
                        "count".to_string() => count,
                    }))
                })
                .build(),
        )
    }

    fn mounted(def: Arc<ComponentDef>, props: IndexMap<String, Value>) -> ComponentInstance {
        let mut instance = ComponentInstance::new(def, HostNode::next());
        instance.component_will_mount(props);
        instance.render();
        instance.component_did_mount();
        instance
    }

    #[test]
    fn mount_sequence_seeds_state_and_reaches_mounted() {
        let instance = mounted(counter_def(), IndexMap::new());
        assert_eq!(instance.phase(), Phase::Mounted);
        assert_eq!(
            instance.state_snapshot().get("count"),
            Some(&Value::Int(0))
        );
        assert!(instance.errors().is_empty());
    }

    #[test]
    fn should_update_is_false_for_identical_props_and_state() {
        let props = indexmap! { "label".to_string() => Value::Str("a".into()) };
        let instance = mounted(counter_def(), props.clone());

        // Stamp the state once so the snapshot is decidable; seeded-only
        // state has no stamp and fails open.
        instance.state_context().set("count", Value::Int(0));
        let state = instance.state_snapshot();
        assert!(!instance.should_component_update(&props, Some(&state)));
    }

    #[test]
    fn should_update_is_true_when_props_change() {
        let props = indexmap! { "label".to_string() => Value::Str("a".into()) };
        let instance = mounted(counter_def(), props);

        let next = indexmap! { "label".to_string() => Value::Str("b".into()) };
        let state = instance.state_snapshot();
        assert!(instance.should_component_update(&next, Some(&state)));
    }

    #[test]
    fn should_update_is_true_after_a_state_mutation() {
        let props = IndexMap::new();
        let instance = mounted(counter_def(), props.clone());
        let before = instance.state_snapshot();

        instance.state_context().set("count", Value::Int(1));

        // The host still holds the pre-mutation snapshot as "next".
        assert!(instance.should_component_update(&props, Some(&before)));
    }

    #[test]
    fn custom_decision_fn_answers_and_fails_open() {
        let def = Arc::new(
            ComponentDef::builder("picky")
                .render(|_| Ok(Value::Null))
                .needs_update(|props, _state| Ok(props.changed()))
                .build(),
        );
        let props = indexmap! { "n".to_string() => Value::Int(1) };
        let instance = mounted(def, props.clone());

        assert!(!instance.should_component_update(&props, None));
        let moved = indexmap! { "n".to_string() => Value::Int(2) };
        assert!(instance.should_component_update(&moved, None));

        let failing = Arc::new(
            ComponentDef::builder("broken")
                .render(|_| Ok(Value::Null))
                .needs_update(|_, _| Err(HookError::failed("cannot decide")))
                .build(),
        );
        let instance = mounted(failing, props.clone());
        assert!(instance.should_component_update(&props, None));
        assert_eq!(instance.errors().len(), 1);
        assert_eq!(instance.errors().reported()[0].origin, "needs_update");
    }

    #[test]
    fn failing_render_reports_and_returns_empty_output() {
        let def = Arc::new(
            ComponentDef::builder("faulty")
                .render(|_| Err(HookError::failed("render exploded")))
                .build(),
        );
        let mut instance = ComponentInstance::new(def, HostNode::next());
        instance.component_will_mount(IndexMap::new());

        let tree = instance.render();
        assert!(tree.is_null());
        assert_eq!(instance.errors().len(), 1);
        assert_eq!(instance.errors().reported()[0].origin, "render");

        // The sequence continues normally.
        instance.component_did_mount();
        assert_eq!(instance.phase(), Phase::Mounted);
    }

    #[test]
    fn failing_before_mount_still_reaches_did_mount() {
        let def = Arc::new(
            ComponentDef::builder("fragile")
                .on(BEFORE_MOUNT, |_, _| Err(HookError::failed("bad hook")))
                .render(|_| Ok(Value::Str("ok".into())))
                .build(),
        );
        let mut instance = ComponentInstance::new(def, HostNode::next());
        instance.component_will_mount(IndexMap::new());
        let tree = instance.render();
        instance.component_did_mount();

        assert_eq!(instance.phase(), Phase::Mounted);
        assert_eq!(tree, Value::Str("ok".into()));
        // Reported exactly once.
        assert_eq!(instance.errors().len(), 1);
    }

    #[test]
    fn out_of_order_calls_are_ignored() {
        let mut instance = ComponentInstance::new(counter_def(), HostNode::next());

        // did-mount before will-mount: no-op.
        instance.component_did_mount();
        assert_eq!(instance.phase(), Phase::Unmounted);

        // Render before mount: empty output.
        assert!(instance.render().is_null());

        // should-update before mount: fail open.
        assert!(instance.should_component_update(&IndexMap::new(), None));
    }

    #[test]
    fn update_round_commits_chained_props() {
        let first = indexmap! { "n".to_string() => Value::Int(1) };
        let mut instance = mounted(counter_def(), first.clone());

        let next = indexmap! { "n".to_string() => Value::Int(2) };
        instance.component_will_update(next.clone(), None);
        instance.render();
        instance.component_did_update(first, None);

        assert_eq!(instance.phase(), Phase::Mounted);
        assert_eq!(instance.props().get("n"), Some(&Value::Int(2)));
        let prev = instance.props().prev().expect("previous view kept");
        assert_eq!(prev.get("n"), Some(&Value::Int(1)));
    }

    #[test]
    fn render_records_resource_waits() {
        let def = Arc::new(
            ComponentDef::builder("lazy")
                .render(|scope| {
                    scope.wait_on("user-profile");
                    scope.wait_on("user-profile");
                    scope.wait_on("avatar");
                    Ok(Value::Str("pending".into()))
                })
                .build(),
        );
        let instance = mounted(def, IndexMap::new());
        assert_eq!(instance.waiting_on_resources(), ["user-profile", "avatar"]);
    }

    #[test]
    fn unmount_releases_state() {
        let mut instance = mounted(counter_def(), IndexMap::new());
        instance.component_will_unmount();

        assert_eq!(instance.phase(), Phase::Dead);
        assert!(instance.state_snapshot().is_empty());

        // Dead instances ignore everything.
        assert!(instance.render().is_null());
        instance.component_will_mount(IndexMap::new());
        assert_eq!(instance.phase(), Phase::Dead);
    }

    #[test]
    fn exception_observer_sees_reports() {
        use std::sync::atomic::AtomicUsize;

        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = seen.clone();
        let def = Arc::new(
            ComponentDef::builder("observed")
                .render(|_| Err(HookError::failed("nope")))
                .on_exception(move |report| {
                    assert_eq!(report.component, "observed");
                    seen_clone.fetch_add(1, Ordering::SeqCst);
                })
                .build(),
        );

        let mut instance = ComponentInstance::new(def, HostNode::next());
        instance.component_will_mount(IndexMap::new());
        instance.render();

        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(instance.errors().len(), 1);
    }
}
