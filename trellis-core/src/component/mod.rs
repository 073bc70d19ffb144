//! Component Model
//!
//! This module implements the lifecycle layer between the host rendering
//! engine and user-defined components.
//!
//! # Concepts
//!
//! ## Definitions
//!
//! A [`ComponentDef`] describes a component type: render function, hook
//! handlers, initial state, and optional update-decision and exception
//! hooks, assembled explicitly through a builder.
//!
//! ## Instances
//!
//! A [`ComponentInstance`] is one host-managed mounted node. The host
//! drives it through the fixed lifecycle call sequence; the instance
//! translates each call into ordered hook invocations, maintains the
//! state store and props view, contains user failures, and answers the
//! host's should-update question without false negatives.
//!
//! ## Dispatch
//!
//! A [`ComponentRegistry`] maps names to definitions and turns a name
//! plus an input mapping into host-renderable output.

mod adapter;
mod decision;
mod definition;

pub use adapter::{ComponentInstance, HostNode, Phase, RenderScope};
pub use decision::{PropsDiff, StateDiff};
pub use definition::{
    ComponentDef, ComponentDefBuilder, ComponentRegistry, DecisionFn, ExceptionFn, RenderFn,
};
