// Copyright 2026 the Weakself Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as little-endian records. Each record is a one-byte tag followed
//! by fixed-size fields; labels are stored as a `u16` length plus UTF-8
//! bytes. [`decode`] reads the records back as an iterator of
//! [`RecordedEvent`], with labels as owned strings.

use weakself_core::capture::{CaptureKind, Drive, Trigger};
use weakself_core::registry::{ActionId, ControllerId, Fate};
use weakself_core::scenario::{Outcome, Scenario};
use weakself_core::step::{Step, Steps};
use weakself_core::trace::{
    ActionCancelledEvent, ActionDisposedEvent, ActionExecutedEvent, ActionScheduledEvent,
    CollectEvent, ControllerDestroyedEvent, ControllerRegisteredEvent, EdgeEvent, EdgeKind,
    OwnerReleasedEvent, ScenarioSummary, TraceSink,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_CONTROLLER_REGISTERED: u8 = 1;
const TAG_OWNER_RELEASED: u8 = 2;
const TAG_ACTION_SCHEDULED: u8 = 3;
const TAG_ACTION_EXECUTED: u8 = 4;
const TAG_ACTION_CANCELLED: u8 = 5;
const TAG_ACTION_DISPOSED: u8 = 6;
const TAG_COLLECT: u8 = 7;
const TAG_CONTROLLER_DESTROYED: u8 = 8;
const TAG_SCENARIO_SUMMARY: u8 = 9;
const TAG_EDGE_ADDED: u8 = 10;
const TAG_EDGE_REMOVED: u8 = 11;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_step(&mut self, at: Step) {
        self.write_u64(at.index());
    }

    /// Labels longer than `u16::MAX` bytes are cut at the last character
    /// boundary that fits.
    fn write_label(&mut self, label: &str) {
        let mut end = label.len().min(usize::from(u16::MAX));
        while !label.is_char_boundary(end) {
            end -= 1;
        }
        let bytes = &label.as_bytes()[..end];
        let len = u16::try_from(bytes.len()).unwrap_or(u16::MAX);
        self.buf.extend_from_slice(&len.to_le_bytes());
        self.buf.extend_from_slice(bytes);
    }

    fn write_controller(&mut self, id: ControllerId) {
        self.write_u32(id.index());
        self.write_u32(id.generation());
    }

    fn write_action(&mut self, id: ActionId) {
        self.write_u32(id.index());
        self.write_u32(id.generation());
    }

    fn write_capture(&mut self, c: CaptureKind) {
        self.write_u8(match c {
            CaptureKind::StrongDirect => 0,
            CaptureKind::Weak => 1,
            CaptureKind::FieldOnly => 2,
            CaptureKind::None => 3,
        });
    }

    fn write_trigger(&mut self, t: Trigger) {
        let (kind, span) = match t {
            Trigger::Immediate => (0, Steps::ZERO),
            Trigger::DeferredOnce { delay } => (1, delay),
            Trigger::DeferredRepeating { interval } => (2, interval),
        };
        self.write_u8(kind);
        self.write_u64(span.count());
    }

    fn write_drive(&mut self, d: Drive) {
        self.write_u8(match d {
            Drive::Queued => 0,
            Drive::Manual => 1,
        });
    }

    fn write_fate(&mut self, f: Fate) {
        self.write_u8(match f {
            Fate::Alive => 0,
            Fate::Released => 1,
            Fate::Swept => 2,
        });
    }

    fn write_scenario(&mut self, s: Scenario) {
        let idx = Scenario::ALL.iter().position(|&x| x == s).unwrap_or(0);
        self.write_u8(u8::try_from(idx).unwrap_or(u8::MAX));
    }

    fn write_edge(&mut self, tag: u8, e: &EdgeEvent) {
        self.write_u8(tag);
        self.write_step(e.at);
        self.write_action(e.action);
        self.write_controller(e.controller);
        self.write_u8(match e.kind {
            EdgeKind::Strong => 0,
            EdgeKind::Weak => 1,
        });
    }
}

impl TraceSink for RecorderSink {
    fn on_controller_registered(&mut self, e: &ControllerRegisteredEvent) {
        self.write_u8(TAG_CONTROLLER_REGISTERED);
        self.write_step(e.at);
        self.write_controller(e.controller);
        self.write_label(e.label);
    }

    fn on_owner_released(&mut self, e: &OwnerReleasedEvent) {
        self.write_u8(TAG_OWNER_RELEASED);
        self.write_step(e.at);
        self.write_controller(e.controller);
        self.write_bool(e.changed);
        self.write_u32(e.strong_count);
    }

    fn on_action_scheduled(&mut self, e: &ActionScheduledEvent) {
        self.write_u8(TAG_ACTION_SCHEDULED);
        self.write_step(e.at);
        self.write_action(e.action);
        self.write_capture(e.capture);
        self.write_trigger(e.trigger);
        self.write_drive(e.drive);
        self.write_bool(e.retained);
        self.write_label(e.label);
    }

    fn on_action_executed(&mut self, e: &ActionExecutedEvent) {
        self.write_u8(TAG_ACTION_EXECUTED);
        self.write_step(e.at);
        self.write_action(e.action);
        self.write_u32(e.count);
        self.write_bool(e.effective);
        self.write_label(e.label);
    }

    fn on_action_cancelled(&mut self, e: &ActionCancelledEvent) {
        self.write_u8(TAG_ACTION_CANCELLED);
        self.write_step(e.at);
        self.write_action(e.action);
        self.write_label(e.label);
    }

    fn on_action_disposed(&mut self, e: &ActionDisposedEvent) {
        self.write_u8(TAG_ACTION_DISPOSED);
        self.write_step(e.at);
        self.write_action(e.action);
        self.write_bool(e.freed);
        self.write_label(e.label);
    }

    fn on_collect(&mut self, e: &CollectEvent) {
        self.write_u8(TAG_COLLECT);
        self.write_step(e.at);
        self.write_u32(e.released);
        self.write_u32(e.swept);
        self.write_u32(e.freed_actions);
    }

    fn on_controller_destroyed(&mut self, e: &ControllerDestroyedEvent) {
        self.write_u8(TAG_CONTROLLER_DESTROYED);
        self.write_step(e.at);
        self.write_controller(e.controller);
        self.write_fate(e.fate);
        self.write_label(e.label);
    }

    fn on_scenario_summary(&mut self, s: &ScenarioSummary) {
        self.write_u8(TAG_SCENARIO_SUMMARY);
        self.write_step(s.at);
        self.write_scenario(s.scenario);
        self.write_bool(s.outcome == Outcome::Leaked);
        self.write_fate(s.fate);
        self.write_bool(s.alive_at_dismissal);
        self.write_u32(s.effects);
    }

    fn on_edge_added(&mut self, e: &EdgeEvent) {
        self.write_edge(TAG_EDGE_ADDED, e);
    }

    fn on_edge_removed(&mut self, e: &EdgeEvent) {
        self.write_edge(TAG_EDGE_REMOVED, e);
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordedEvent {
    /// A [`ControllerRegisteredEvent`].
    ControllerRegistered {
        /// Simulated time.
        at: Step,
        /// The new controller.
        controller: ControllerId,
        /// Its label.
        label: String,
    },
    /// An [`OwnerReleasedEvent`].
    OwnerReleased(OwnerReleasedEvent),
    /// An [`ActionScheduledEvent`].
    ActionScheduled {
        /// Simulated time.
        at: Step,
        /// Registry node.
        action: ActionId,
        /// Action label.
        label: String,
        /// Capture kind.
        capture: CaptureKind,
        /// Trigger.
        trigger: Trigger,
        /// Drive mode.
        drive: Drive,
        /// Stored in a field.
        retained: bool,
    },
    /// An [`ActionExecutedEvent`].
    ActionExecuted {
        /// Simulated time.
        at: Step,
        /// Registry node.
        action: ActionId,
        /// Action label.
        label: String,
        /// Execution count including this run.
        count: u32,
        /// Whether the effect reached its target.
        effective: bool,
    },
    /// An [`ActionCancelledEvent`].
    ActionCancelled {
        /// Simulated time.
        at: Step,
        /// Registry node.
        action: ActionId,
        /// Action label.
        label: String,
    },
    /// An [`ActionDisposedEvent`].
    ActionDisposed {
        /// Simulated time.
        at: Step,
        /// Registry node.
        action: ActionId,
        /// Action label.
        label: String,
        /// Whether the node was freed.
        freed: bool,
    },
    /// A [`CollectEvent`].
    Collect(CollectEvent),
    /// A [`ControllerDestroyedEvent`].
    ControllerDestroyed {
        /// Simulated time.
        at: Step,
        /// The destroyed controller.
        controller: ControllerId,
        /// Its label.
        label: String,
        /// How it went.
        fate: Fate,
    },
    /// A [`ScenarioSummary`].
    ScenarioSummary(ScenarioSummary),
    /// A capture edge was added.
    EdgeAdded(EdgeEvent),
    /// A capture edge was removed.
    EdgeRemoved(EdgeEvent),
}

impl RecordedEvent {
    /// Simulated time of the event.
    #[must_use]
    pub fn at(&self) -> Step {
        match self {
            Self::ControllerRegistered { at, .. }
            | Self::ActionScheduled { at, .. }
            | Self::ActionExecuted { at, .. }
            | Self::ActionCancelled { at, .. }
            | Self::ActionDisposed { at, .. }
            | Self::ControllerDestroyed { at, .. } => *at,
            Self::OwnerReleased(e) => e.at,
            Self::Collect(e) => e.at,
            Self::ScenarioSummary(s) => s.at,
            Self::EdgeAdded(e) | Self::EdgeRemoved(e) => e.at,
        }
    }
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
///
/// Stops at the first unknown tag or truncated record.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> DecodeIter<'a> {
    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(n)?;
        let bytes = self.data.get(self.pos..end)?;
        self.pos = end;
        Some(bytes)
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.take(1).map(|b| b[0])
    }

    fn read_bool(&mut self) -> Option<bool> {
        self.read_u8().map(|v| v != 0)
    }

    fn read_u32(&mut self) -> Option<u32> {
        Some(u32::from_le_bytes(self.take(4)?.try_into().ok()?))
    }

    fn read_u64(&mut self) -> Option<u64> {
        Some(u64::from_le_bytes(self.take(8)?.try_into().ok()?))
    }

    fn read_step(&mut self) -> Option<Step> {
        self.read_u64().map(Step)
    }

    fn read_label(&mut self) -> Option<String> {
        let len = u16::from_le_bytes(self.take(2)?.try_into().ok()?);
        let bytes = self.take(usize::from(len))?;
        Some(String::from_utf8_lossy(bytes).into_owned())
    }

    fn read_controller(&mut self) -> Option<ControllerId> {
        Some(ControllerId::from_parts(self.read_u32()?, self.read_u32()?))
    }

    fn read_action(&mut self) -> Option<ActionId> {
        Some(ActionId::from_parts(self.read_u32()?, self.read_u32()?))
    }

    fn read_capture(&mut self) -> Option<CaptureKind> {
        Some(match self.read_u8()? {
            0 => CaptureKind::StrongDirect,
            1 => CaptureKind::Weak,
            2 => CaptureKind::FieldOnly,
            _ => CaptureKind::None,
        })
    }

    fn read_trigger(&mut self) -> Option<Trigger> {
        let kind = self.read_u8()?;
        let span = Steps(self.read_u64()?);
        Some(match kind {
            0 => Trigger::Immediate,
            1 => Trigger::DeferredOnce { delay: span },
            _ => Trigger::DeferredRepeating { interval: span },
        })
    }

    fn read_drive(&mut self) -> Option<Drive> {
        Some(match self.read_u8()? {
            0 => Drive::Queued,
            _ => Drive::Manual,
        })
    }

    fn read_fate(&mut self) -> Option<Fate> {
        Some(match self.read_u8()? {
            0 => Fate::Alive,
            1 => Fate::Released,
            _ => Fate::Swept,
        })
    }

    fn read_scenario(&mut self) -> Option<Scenario> {
        Scenario::ALL.get(usize::from(self.read_u8()?)).copied()
    }

    fn read_edge(&mut self) -> Option<EdgeEvent> {
        Some(EdgeEvent {
            at: self.read_step()?,
            action: self.read_action()?,
            controller: self.read_controller()?,
            kind: match self.read_u8()? {
                0 => EdgeKind::Strong,
                _ => EdgeKind::Weak,
            },
        })
    }

    fn decode_controller_registered(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::ControllerRegistered {
            at: self.read_step()?,
            controller: self.read_controller()?,
            label: self.read_label()?,
        })
    }

    fn decode_owner_released(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::OwnerReleased(OwnerReleasedEvent {
            at: self.read_step()?,
            controller: self.read_controller()?,
            changed: self.read_bool()?,
            strong_count: self.read_u32()?,
        }))
    }

    fn decode_action_scheduled(&mut self) -> Option<RecordedEvent> {
        let at = self.read_step()?;
        let action = self.read_action()?;
        let capture = self.read_capture()?;
        let trigger = self.read_trigger()?;
        let drive = self.read_drive()?;
        let retained = self.read_bool()?;
        let label = self.read_label()?;
        Some(RecordedEvent::ActionScheduled {
            at,
            action,
            label,
            capture,
            trigger,
            drive,
            retained,
        })
    }

    fn decode_action_executed(&mut self) -> Option<RecordedEvent> {
        let at = self.read_step()?;
        let action = self.read_action()?;
        let count = self.read_u32()?;
        let effective = self.read_bool()?;
        let label = self.read_label()?;
        Some(RecordedEvent::ActionExecuted {
            at,
            action,
            label,
            count,
            effective,
        })
    }

    fn decode_action_cancelled(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::ActionCancelled {
            at: self.read_step()?,
            action: self.read_action()?,
            label: self.read_label()?,
        })
    }

    fn decode_action_disposed(&mut self) -> Option<RecordedEvent> {
        let at = self.read_step()?;
        let action = self.read_action()?;
        let freed = self.read_bool()?;
        let label = self.read_label()?;
        Some(RecordedEvent::ActionDisposed {
            at,
            action,
            label,
            freed,
        })
    }

    fn decode_collect(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Collect(CollectEvent {
            at: self.read_step()?,
            released: self.read_u32()?,
            swept: self.read_u32()?,
            freed_actions: self.read_u32()?,
        }))
    }

    fn decode_controller_destroyed(&mut self) -> Option<RecordedEvent> {
        let at = self.read_step()?;
        let controller = self.read_controller()?;
        let fate = self.read_fate()?;
        let label = self.read_label()?;
        Some(RecordedEvent::ControllerDestroyed {
            at,
            controller,
            label,
            fate,
        })
    }

    fn decode_scenario_summary(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::ScenarioSummary(ScenarioSummary {
            at: self.read_step()?,
            scenario: self.read_scenario()?,
            outcome: if self.read_bool()? {
                Outcome::Leaked
            } else {
                Outcome::Collected
            },
            fate: self.read_fate()?,
            alive_at_dismissal: self.read_bool()?,
            effects: self.read_u32()?,
        }))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        match tag {
            TAG_CONTROLLER_REGISTERED => self.decode_controller_registered(),
            TAG_OWNER_RELEASED => self.decode_owner_released(),
            TAG_ACTION_SCHEDULED => self.decode_action_scheduled(),
            TAG_ACTION_EXECUTED => self.decode_action_executed(),
            TAG_ACTION_CANCELLED => self.decode_action_cancelled(),
            TAG_ACTION_DISPOSED => self.decode_action_disposed(),
            TAG_COLLECT => self.decode_collect(),
            TAG_CONTROLLER_DESTROYED => self.decode_controller_destroyed(),
            TAG_SCENARIO_SUMMARY => self.decode_scenario_summary(),
            TAG_EDGE_ADDED => self.read_edge().map(RecordedEvent::EdgeAdded),
            TAG_EDGE_REMOVED => self.read_edge().map(RecordedEvent::EdgeRemoved),
            _ => None, // unknown tag → stop iteration
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
