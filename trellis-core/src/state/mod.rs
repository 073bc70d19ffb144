//! Component State
//!
//! This module implements the component-local state model: the store that
//! holds named state entries, the context that attributes mutations to the
//! instance whose hook is running, and the observable wrapper that tracks
//! render-time reads.
//!
//! # Concepts
//!
//! ## Store
//!
//! Each mounted instance owns one [`StateStore`]. Every mutation stamps a
//! reserved timestamp key, so two state snapshots can be compared in O(1)
//! by comparing stamps instead of deep-comparing payloads.
//!
//! ## Context
//!
//! Hooks do not mutate state ambiently. Each handler receives a
//! [`StateContext`] naming the instance it runs for, and mutations route
//! through it explicitly.
//!
//! ## Observable
//!
//! An [`Observable`] lets a component watch a value without naming it in
//! state up front. Reads during a render pass are recorded; committed
//! reads become subscriptions; subscriptions not renewed by the next pass
//! are dropped.

mod context;
mod observable;
mod store;

pub use context::StateContext;
pub use observable::{NotifyPolicy, Observable, StateHandle};
pub use store::{state_changed, StateSnapshot, StateStore, UPDATED_AT_KEY};
