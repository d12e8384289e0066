// Copyright 2026 the Weakself Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the lifetime simulation.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! scheduler and the scenario runner call as objects are created, captured,
//! executed, and destroyed. All method bodies default to no-ops, so
//! implementing only the events you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing (zero overhead). When
//! **on**, each method performs a single `Option` branch before dispatching.
//!
//! # Crate features
//!
//! - `trace`: enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`): gates [`EdgeEvent`] and the
//!   corresponding `TraceSink` methods.

use crate::capture::{CaptureKind, Drive, Trigger};
use crate::registry::{ActionId, CollectReport, ControllerId, Fate};
use crate::scenario::{Outcome, Scenario};
use crate::step::Step;

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a controller is registered with the navigation stack as its
/// owner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ControllerRegisteredEvent {
    /// Simulated time.
    pub at: Step,
    /// The new controller.
    pub controller: ControllerId,
    /// Its label.
    pub label: &'static str,
}

/// Emitted when the external owner lets go of a controller (dismissal).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OwnerReleasedEvent {
    /// Simulated time.
    pub at: Step,
    /// The dismissed controller.
    pub controller: ControllerId,
    /// `false` if the owner had already been released (a no-op).
    pub changed: bool,
    /// Strong count right after the release.
    pub strong_count: u32,
}

/// Emitted when an action is declared and handed to the scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActionScheduledEvent {
    /// Simulated time.
    pub at: Step,
    /// Registry node of the action.
    pub action: ActionId,
    /// Action label.
    pub label: &'static str,
    /// How it references its controller.
    pub capture: CaptureKind,
    /// When it runs.
    pub trigger: Trigger,
    /// Who runs it.
    pub drive: Drive,
    /// Whether a controller field keeps it alive.
    pub retained: bool,
}

/// Emitted every time an action runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActionExecutedEvent {
    /// Simulated time.
    pub at: Step,
    /// Registry node of the action.
    pub action: ActionId,
    /// Action label.
    pub label: &'static str,
    /// Execution count including this run.
    pub count: u32,
    /// Whether the effect reached its target. `false` for a weak capture
    /// whose controller is gone.
    pub effective: bool,
}

/// Emitted when an action is cancelled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActionCancelledEvent {
    /// Simulated time.
    pub at: Step,
    /// Registry node of the action.
    pub action: ActionId,
    /// Action label.
    pub label: &'static str,
}

/// Emitted when the scheduler lets go of a finished action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActionDisposedEvent {
    /// Simulated time.
    pub at: Step,
    /// Registry node of the action.
    pub action: ActionId,
    /// Action label.
    pub label: &'static str,
    /// `true` if the node was freed; `false` if a field still retains it.
    pub freed: bool,
}

/// Summary of one [`collect`](crate::registry::LifetimeRegistry::collect).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CollectEvent {
    /// Simulated time.
    pub at: Step,
    /// Controllers destroyed by their count reaching zero.
    pub released: u32,
    /// Controllers reclaimed by the cycle sweep.
    pub swept: u32,
    /// Action nodes freed.
    pub freed_actions: u32,
}

impl CollectEvent {
    /// Summarizes a [`CollectReport`].
    #[must_use]
    pub fn new(at: Step, report: &CollectReport) -> Self {
        Self {
            at,
            released: count(report.released.len()),
            swept: count(report.swept.len()),
            freed_actions: count(report.freed_actions.len()),
        }
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "a collection never destroys more than u32::MAX objects"
)]
fn count(n: usize) -> u32 {
    n as u32
}

/// Emitted for each controller a collection destroys.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ControllerDestroyedEvent {
    /// Simulated time.
    pub at: Step,
    /// The destroyed controller.
    pub controller: ControllerId,
    /// Its label.
    pub label: &'static str,
    /// How it went: [`Fate::Released`] or [`Fate::Swept`].
    pub fate: Fate,
}

/// Per-scenario summary emitted by the runner when a scenario finishes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScenarioSummary {
    /// Simulated time at the end of the settle window.
    pub at: Step,
    /// Which scenario ran.
    pub scenario: Scenario,
    /// Final outcome.
    pub outcome: Outcome,
    /// Final fate of the controller.
    pub fate: Fate,
    /// Whether the controller survived the collection right after dismissal.
    pub alive_at_dismissal: bool,
    /// Effects that reached a target.
    pub effects: u32,
}

/// Whether a capture edge counts toward the target's lifetime.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// Counted in the strong count.
    Strong,
    /// Observer only.
    Weak,
}

/// A capture edge being added or removed.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EdgeEvent {
    /// Simulated time.
    pub at: Step,
    /// The capturing action.
    pub action: ActionId,
    /// The captured controller.
    pub controller: ControllerId,
    /// Edge strength.
    pub kind: EdgeKind,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the simulation.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when a controller is registered.
    fn on_controller_registered(&mut self, e: &ControllerRegisteredEvent) {
        _ = e;
    }

    /// Called when the external owner releases a controller.
    fn on_owner_released(&mut self, e: &OwnerReleasedEvent) {
        _ = e;
    }

    /// Called when an action is scheduled.
    fn on_action_scheduled(&mut self, e: &ActionScheduledEvent) {
        _ = e;
    }

    /// Called each time an action runs.
    fn on_action_executed(&mut self, e: &ActionExecutedEvent) {
        _ = e;
    }

    /// Called when an action is cancelled.
    fn on_action_cancelled(&mut self, e: &ActionCancelledEvent) {
        _ = e;
    }

    /// Called when the scheduler disposes of a finished action.
    fn on_action_disposed(&mut self, e: &ActionDisposedEvent) {
        _ = e;
    }

    /// Called after every collection.
    fn on_collect(&mut self, e: &CollectEvent) {
        _ = e;
    }

    /// Called for each destroyed controller.
    fn on_controller_destroyed(&mut self, e: &ControllerDestroyedEvent) {
        _ = e;
    }

    /// Called with the per-scenario summary.
    fn on_scenario_summary(&mut self, s: &ScenarioSummary) {
        _ = s;
    }

    /// Called when a capture edge is added (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    fn on_edge_added(&mut self, e: &EdgeEvent) {
        _ = e;
    }

    /// Called when a capture edge is removed (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    fn on_edge_removed(&mut self, e: &EdgeEvent) {
        _ = e;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

macro_rules! dispatch {
    ($self:ident, $method:ident, $e:ident) => {{
        #[cfg(feature = "trace")]
        if let Some(s) = &mut $self.sink {
            s.$method($e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = $e;
        }
    }};
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`ControllerRegisteredEvent`].
    #[inline]
    pub fn controller_registered(&mut self, e: &ControllerRegisteredEvent) {
        dispatch!(self, on_controller_registered, e);
    }

    /// Emits an [`OwnerReleasedEvent`].
    #[inline]
    pub fn owner_released(&mut self, e: &OwnerReleasedEvent) {
        dispatch!(self, on_owner_released, e);
    }

    /// Emits an [`ActionScheduledEvent`].
    #[inline]
    pub fn action_scheduled(&mut self, e: &ActionScheduledEvent) {
        dispatch!(self, on_action_scheduled, e);
    }

    /// Emits an [`ActionExecutedEvent`].
    #[inline]
    pub fn action_executed(&mut self, e: &ActionExecutedEvent) {
        dispatch!(self, on_action_executed, e);
    }

    /// Emits an [`ActionCancelledEvent`].
    #[inline]
    pub fn action_cancelled(&mut self, e: &ActionCancelledEvent) {
        dispatch!(self, on_action_cancelled, e);
    }

    /// Emits an [`ActionDisposedEvent`].
    #[inline]
    pub fn action_disposed(&mut self, e: &ActionDisposedEvent) {
        dispatch!(self, on_action_disposed, e);
    }

    /// Emits a [`CollectEvent`].
    #[inline]
    pub fn collect(&mut self, e: &CollectEvent) {
        dispatch!(self, on_collect, e);
    }

    /// Emits a [`ControllerDestroyedEvent`].
    #[inline]
    pub fn controller_destroyed(&mut self, e: &ControllerDestroyedEvent) {
        dispatch!(self, on_controller_destroyed, e);
    }

    /// Emits a [`ScenarioSummary`].
    #[inline]
    pub fn scenario_summary(&mut self, s: &ScenarioSummary) {
        dispatch!(self, on_scenario_summary, s);
    }

    /// Emits an added edge (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn edge_added(&mut self, e: &EdgeEvent) {
        if let Some(s) = &mut self.sink {
            s.on_edge_added(e);
        }
    }

    /// Emits a removed edge (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn edge_removed(&mut self, e: &EdgeEvent) {
        if let Some(s) = &mut self.sink {
            s.on_edge_removed(e);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_executed() -> ActionExecutedEvent {
        ActionExecutedEvent {
            at: Step(3),
            action: ActionId::from_parts(0, 0),
            label: "timer",
            count: 3,
            effective: true,
        }
    }

    #[test]
    fn collect_event_counts_report() {
        let report = CollectReport {
            released: alloc::vec![ControllerId::from_parts(0, 0)],
            swept: alloc::vec![ControllerId::from_parts(1, 0), ControllerId::from_parts(2, 0)],
            freed_actions: alloc::vec::Vec::new(),
        };
        let e = CollectEvent::new(Step(4), &report);
        assert_eq!(e.released, 1);
        assert_eq!(e.swept, 2);
        assert_eq!(e.freed_actions, 0);
        assert_eq!(e.at, Step(4));
    }

    #[test]
    fn noop_sink_compiles() {
        let mut sink = NoopSink;
        sink.on_action_executed(&sample_executed());
        sink.on_scenario_summary(&ScenarioSummary {
            at: Step(8),
            scenario: Scenario::LeakyTimer,
            outcome: Outcome::Leaked,
            fate: Fate::Alive,
            alive_at_dismissal: true,
            effects: 8,
        });
    }

    #[test]
    fn tracer_none_does_nothing() {
        let mut tracer = Tracer::none();
        tracer.action_executed(&sample_executed());
        tracer.collect(&CollectEvent {
            at: Step(0),
            released: 0,
            swept: 0,
            freed_actions: 0,
        });
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_sink() {
        use alloc::vec::Vec;

        struct RecordingSink {
            counts: Vec<u32>,
        }
        impl TraceSink for RecordingSink {
            fn on_action_executed(&mut self, e: &ActionExecutedEvent) {
                self.counts.push(e.count);
            }
        }

        let mut sink = RecordingSink { counts: Vec::new() };
        let mut tracer = Tracer::new(&mut sink);
        tracer.action_executed(&sample_executed());
        // Access sink after tracer is dropped.
        drop(tracer);
        assert_eq!(sink.counts, &[3]);
    }
}
