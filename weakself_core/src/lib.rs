// Copyright 2026 the Weakself Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Object-lifetime simulation for closure capture scenarios.
//!
//! `weakself_core` reproduces, without any UI toolkit, the question every
//! closure handed to a UI API raises: does it keep its view controller alive
//! after the controller is dismissed? It is `no_std` compatible (with
//! `alloc`) and models controllers and closures as nodes in a reference
//! graph with generational handles.
//!
//! # Architecture
//!
//! Data flows one way, from a scenario recipe to an outcome:
//!
//! ```text
//!   Scenario::recipe() ──► ActionSpec ──► ActionScheduler::schedule()
//!                                                │
//!                 ┌──────────────────────────────┘
//!                 ▼
//!   LifetimeRegistry (edges, holders) ◄── ActionScheduler::advance()
//!                 │                              │
//!                 ▼                              ▼
//!   LifetimeRegistry::collect() ──► Fate    EffectSink::record()
//!                 │
//!                 ▼
//!   ScenarioRunner ──► ScenarioReport { outcome, fate, ... }
//! ```
//!
//! **[`registry`]**: Struct-of-arrays store of controllers and action nodes
//! with strong counts, weak observers, and a two-phase collection
//! (reference-count release, then a cycle sweep).
//!
//! **[`capture`]**: [`CaptureKind`](capture::CaptureKind),
//! [`Trigger`](capture::Trigger), and [`Drive`](capture::Drive): how a closure
//! references its controller and when it runs.
//!
//! **[`action`]**: Action declarations and the simulated scheduler that runs
//! them on an explicit step clock.
//!
//! **[`scenario`]**: The fifteen named scenarios as data.
//!
//! **[`runner`]**: Plays a scenario end to end and reports the outcome.
//!
//! **[`effect`]**: The [`EffectSink`](effect::EffectSink) seam standing in
//! for the UI.
//!
//! **[`step`]**: Simulated clock types.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and lifecycle event
//! types, with zero-overhead [`Tracer`](trace::Tracer) wrapper.
//!
//! # Example
//!
//! ```
//! use weakself_core::runner::run_scenario;
//! use weakself_core::scenario::Outcome;
//!
//! let report = run_scenario("leakyTimer").unwrap();
//! assert_eq!(report.outcome, Outcome::Leaked);
//! assert_eq!(report.executed("timer"), Some(8));
//! ```
//!
//! # Crate features
//!
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates capture-edge
//!   events.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod action;
pub mod capture;
pub mod effect;
pub mod error;
pub mod registry;
pub mod runner;
pub mod scenario;
pub mod step;
pub mod trace;
