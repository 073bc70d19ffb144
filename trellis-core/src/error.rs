//! Error Taxonomy and Reporting
//!
//! User code (hook handlers, render functions, update-decision functions)
//! fails by returning a [`HookError`]. The lifecycle adapter catches every
//! such failure at its own boundary, forwards it to the instance's
//! [`ErrorSink`] exactly once, and returns normally to the host. No failure
//! ever crosses the host boundary.
//!
//! The component dispatch surface has its own error type,
//! [`RegistryError`], because an unknown component name is a caller bug,
//! not a contained user-code failure.

use std::sync::{Arc, RwLock};

use thiserror::Error;

use crate::component::HostNode;

/// A failure raised by user code inside a lifecycle hook, a render
/// function, or an update-decision function.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HookError {
    /// A user-reported failure, carrying the user's message.
    #[error("{0}")]
    Failed(String),

    /// A component definition without a render function was asked to render.
    #[error("no render defined")]
    NoRenderDefined,

    /// A handler was registered for a hook that was never defined.
    #[error("unknown hook `{0}`")]
    UnknownHook(String),
}

impl HookError {
    /// Convenience constructor for user failures.
    pub fn failed(message: impl Into<String>) -> Self {
        HookError::Failed(message.into())
    }
}

/// Errors from the named-component dispatch surface.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No component is registered under the requested name.
    #[error("unknown component `{0}`")]
    UnknownComponent(String),

    /// A component with this name is already registered.
    #[error("component `{0}` is already registered")]
    DuplicateComponent(String),
}

/// A contained user-code failure, annotated with where it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportedError {
    /// Name of the component definition.
    pub component: String,
    /// The host node the failing instance is bound to.
    pub node: HostNode,
    /// The lifecycle entry point that contained the failure
    /// (a hook name, `"render"`, or `"needs_update"`).
    pub origin: String,
    /// The failure itself.
    pub error: HookError,
}

/// Per-instance record of contained failures.
///
/// Cloning the sink shares the underlying record, so a test can keep a
/// handle while the instance reports into it.
#[derive(Debug, Clone, Default)]
pub struct ErrorSink {
    reports: Arc<RwLock<Vec<ReportedError>>>,
}

impl ErrorSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a contained failure and log it.
    pub fn report(&self, report: ReportedError) {
        tracing::error!(
            component = %report.component,
            node = report.node.raw(),
            origin = %report.origin,
            error = %report.error,
            "contained user-code failure"
        );
        self.reports
            .write()
            .expect("error sink lock poisoned")
            .push(report);
    }

    /// Snapshot of every failure reported so far.
    pub fn reported(&self) -> Vec<ReportedError> {
        self.reports
            .read()
            .expect("error sink lock poisoned")
            .clone()
    }

    /// Number of failures reported so far.
    pub fn len(&self) -> usize {
        self.reports
            .read()
            .expect("error sink lock poisoned")
            .len()
    }

    /// True when nothing has been reported.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_records_reports_in_order() {
        let sink = ErrorSink::new();
        assert!(sink.is_empty());

        sink.report(ReportedError {
            component: "counter".into(),
            node: HostNode::from_raw(1),
            origin: "before_mount".into(),
            error: HookError::failed("boom"),
        });
        sink.report(ReportedError {
            component: "counter".into(),
            node: HostNode::from_raw(1),
            origin: "render".into(),
            error: HookError::NoRenderDefined,
        });

        let reports = sink.reported();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].origin, "before_mount");
        assert_eq!(reports[1].error, HookError::NoRenderDefined);
    }

    #[test]
    fn cloned_sink_shares_reports() {
        let sink = ErrorSink::new();
        let clone = sink.clone();

        clone.report(ReportedError {
            component: "list".into(),
            node: HostNode::from_raw(7),
            origin: "after_update".into(),
            error: HookError::failed("late"),
        });

        assert_eq!(sink.len(), 1);
    }
}
