//! Trellis Core
//!
//! This crate provides the component lifecycle runtime for the Trellis UI
//! framework. It implements:
//!
//! - The lifecycle adapter between a host rendering engine and
//!   user-defined components
//! - Component-local state with O(1) change detection
//! - Mutation-tracked observable values with per-render subscriptions
//! - Diffable props snapshots
//! - Transport-safe value serialization for the host boundary
//!
//! The host owns rendering and tree diffing; this crate answers the
//! host's lifecycle calls. The central correctness property is the
//! should-update answer: a false "no" means silently stale UI, so every
//! undecidable case degrades to "yes".
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `component`: lifecycle adapter, component definitions, and dispatch
//! - `state`: state store, mutation context, and observables
//! - `props`: immutable props snapshots and shallow diffing
//! - `callbacks`: named lifecycle hooks with ordered handlers
//! - `transport`: the value model and host-boundary serialization
//! - `error`: failure containment and reporting
//!
//! # Example
//!
//! ```rust,ignore
//! use trellis_core::component::{ComponentDef, ComponentRegistry};
//! use trellis_core::transport::Value;
//! use indexmap::indexmap;
//!
//! let registry = ComponentRegistry::new();
//! registry.register(
//!     ComponentDef::builder("greeting")
//!         .render(|scope| {
//!             let who = scope.props().get("who").cloned().unwrap_or(Value::Null);
//!             Ok(Value::Map(indexmap! { "text".to_string() => who }))
//!         })
//!         .build(),
//! )?;
//!
//! let output = registry.render_component(
//!     "greeting",
//!     indexmap! { "who".to_string() => Value::Str("world".into()) },
//! )?;
//! ```

pub mod callbacks;
pub mod component;
pub mod error;
pub mod props;
pub mod state;
pub mod transport;
