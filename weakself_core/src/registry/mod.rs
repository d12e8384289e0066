// Copyright 2026 the Weakself Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Object-lifetime graph.
//!
//! The registry holds two kinds of node:
//!
//! - **Controllers** ([`ControllerId`]): the simulated view controllers. Each
//!   carries a strong count (references from the external owner plus incoming
//!   strong capture edges), a set of weak observers, and the fields that
//!   retain actions.
//! - **Action nodes** ([`ActionId`]): the registry's view of a closure. An
//!   action holds at most one capture edge to a controller, and is itself
//!   held by up to three holders: the scope that created it, the scheduler,
//!   and a controller field.
//!
//! Both are stored in struct-of-arrays layout behind generational handles, so
//! a handle or [`WeakRef`] to a destroyed object resolves to absent instead of
//! aliasing whatever reuses the slot.
//!
//! # Edges
//!
//! ```text
//!   external owner ──► Controller ──field──► Action ──strong──► Controller
//!                                              └───weak────► (observer only)
//! ```
//!
//! A strong edge from an action back to the controller that stores it closes
//! a reference cycle. [`LifetimeRegistry::collect`] destroys such cycles once
//! they become unreachable, but records them as [`Fate::Swept`] so the leak
//! remains visible.

mod collect;
mod fields;
mod id;
mod store;

pub use collect::CollectReport;
pub use fields::Fields;
pub use id::{ActionId, ControllerId, INVALID, WeakRef};
pub use store::{Fate, LifetimeRegistry};
