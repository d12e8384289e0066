// Copyright 2026 the Weakself Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scheduled actions and the simulated scheduler that runs them.
//!
//! An [`ActionSpec`] declares a closure: its label, how it captures the
//! controller, when it runs, whether a controller field stores it, and who
//! drives it. [`ActionScheduler::schedule`] turns the declaration into a
//! registry node with the matching capture edge and holders, and tracks the
//! resulting [`ScheduledAction`].
//!
//! The scheduler owns the simulated clock. [`advance`](ActionScheduler::advance)
//! moves one step and runs every queued action that is due, in the order the
//! actions were scheduled.
//!
//! # Disposal
//!
//! | trigger             | after it runs                                           |
//! |---------------------|---------------------------------------------------------|
//! | `Immediate`         | discarded before `schedule` returns                     |
//! | `DeferredOnce`      | scheduler lets go; freed with its edge unless retained  |
//! | `DeferredRepeating` | rescheduled; only [`cancel`](ActionScheduler::cancel) stops it |

use alloc::vec::Vec;

use crate::capture::{CaptureKind, Drive, Trigger};
use crate::effect::{Effect, EffectSink};
use crate::error::ConfigError;
use crate::registry::{ActionId, ControllerId, LifetimeRegistry, WeakRef};
use crate::step::{Step, Steps};
use crate::trace::{
    ActionCancelledEvent, ActionDisposedEvent, ActionExecutedEvent, ActionScheduledEvent, Tracer,
};

/// Declaration of a closure handed to some API.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActionSpec {
    /// Label used in traces and execution counts.
    pub label: &'static str,
    /// How the closure references its controller.
    pub capture: CaptureKind,
    /// When it runs.
    pub trigger: Trigger,
    /// Whether a controller field keeps the closure alive.
    pub retained: bool,
    /// Whether the scheduler or an explicit call runs it.
    pub drive: Drive,
}

impl ActionSpec {
    /// A non-escaping closure that runs inside `schedule`.
    #[must_use]
    pub const fn immediate(label: &'static str, capture: CaptureKind) -> Self {
        Self {
            label,
            capture,
            trigger: Trigger::Immediate,
            retained: false,
            drive: Drive::Manual,
        }
    }

    /// An escaping closure handed to the scheduler and not stored.
    #[must_use]
    pub const fn deferred(label: &'static str, capture: CaptureKind, trigger: Trigger) -> Self {
        Self {
            label,
            capture,
            trigger,
            retained: false,
            drive: Drive::Queued,
        }
    }

    /// Also stores the closure in a controller field.
    #[must_use]
    pub const fn retained(mut self) -> Self {
        self.retained = true;
        self
    }

    /// Keeps the closure away from the scheduler; only `execute` runs it.
    #[must_use]
    pub const fn manual(mut self) -> Self {
        self.drive = Drive::Manual;
        self
    }

    /// Replaces the capture kind.
    #[must_use]
    pub const fn capturing(mut self, capture: CaptureKind) -> Self {
        self.capture = capture;
        self
    }

    /// Checks the declaration for combinations that cannot exist.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.trigger {
            Trigger::Immediate if self.retained || self.drive.is_queued() => {
                Err(ConfigError::NonEscapingStored { label: self.label })
            }
            Trigger::DeferredRepeating { interval } if interval.is_zero() => {
                Err(ConfigError::ZeroInterval { label: self.label })
            }
            _ => Ok(()),
        }
    }
}

/// Where a scheduled action stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionState {
    /// Waiting to run (or, for repeating actions, to run again).
    Pending,
    /// Ran to completion.
    Finished,
    /// Stopped by [`ActionScheduler::cancel`].
    Cancelled,
    /// Its node was freed before it could run: nothing held it, or the
    /// controller storing it was destroyed.
    Discarded,
}

/// What the closure's effect lands on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Target {
    Strong(ControllerId),
    Weak(WeakRef),
    /// A captured sub-object, alive for as long as the closure is.
    SubObject,
    Detached,
}

/// A handle to an action tracked by an [`ActionScheduler`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ActionKey(usize);

impl ActionKey {
    /// Returns the position of the action in schedule order.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// The scheduler's record of one declared action.
#[derive(Clone, Debug)]
pub struct ScheduledAction {
    spec: ActionSpec,
    node: ActionId,
    target: Target,
    executed: u32,
    state: ActionState,
    next_due: Option<Step>,
}

impl ScheduledAction {
    /// The declaration this action was scheduled from.
    #[must_use]
    pub fn spec(&self) -> &ActionSpec {
        &self.spec
    }

    /// Label of the action.
    #[must_use]
    pub fn label(&self) -> &'static str {
        self.spec.label
    }

    /// The action's node in the lifetime registry.
    #[must_use]
    pub fn node(&self) -> ActionId {
        self.node
    }

    /// How many times the action has run.
    #[must_use]
    pub fn executed(&self) -> u32 {
        self.executed
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ActionState {
        self.state
    }

    /// When the scheduler will next run it, if it is queued.
    #[must_use]
    pub fn next_due(&self) -> Option<Step> {
        self.next_due
    }
}

/// Runs scheduled actions against a simulated step clock.
#[derive(Clone, Debug, Default)]
pub struct ActionScheduler {
    now: Step,
    actions: Vec<ScheduledAction>,
}

impl ActionScheduler {
    /// Creates an empty scheduler at [`Step::ZERO`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current simulated time.
    #[must_use]
    pub fn now(&self) -> Step {
        self.now
    }

    /// Declares an action on `owner` and wires it into the registry.
    ///
    /// Immediate actions run before this returns and are discarded right
    /// after, so they never leave an edge behind.
    pub fn schedule(
        &mut self,
        registry: &mut LifetimeRegistry,
        owner: ControllerId,
        spec: &ActionSpec,
        effects: &mut dyn EffectSink,
        tracer: &mut Tracer<'_>,
    ) -> Result<ActionKey, ConfigError> {
        spec.validate()?;

        let node = registry.create_action(spec.label);
        let target = match spec.capture {
            CaptureKind::StrongDirect if registry.add_strong_edge(node, owner) => {
                Target::Strong(owner)
            }
            CaptureKind::Weak => registry
                .add_weak_edge(node, owner)
                .map_or(Target::Detached, Target::Weak),
            CaptureKind::FieldOnly => Target::SubObject,
            CaptureKind::StrongDirect | CaptureKind::None => Target::Detached,
        };
        #[cfg(feature = "trace-rich")]
        trace_edge(tracer, self.now, node, target, true);

        if spec.retained {
            registry.retain_in_field(owner, node);
        }
        let next_due = (spec.drive.is_queued() && spec.trigger.is_escaping())
            .then(|| self.now + spec.trigger.first_delay());
        if next_due.is_some() {
            registry.pin(node);
        }

        let key = ActionKey(self.actions.len());
        self.actions.push(ScheduledAction {
            spec: *spec,
            node,
            target,
            executed: 0,
            state: ActionState::Pending,
            next_due,
        });
        tracer.action_scheduled(&ActionScheduledEvent {
            at: self.now,
            action: node,
            label: spec.label,
            capture: spec.capture,
            trigger: spec.trigger,
            drive: spec.drive,
            retained: spec.retained,
        });

        if spec.trigger == Trigger::Immediate {
            self.execute(registry, key, effects, tracer);
        }

        // The declaring scope returns.
        if registry.release_scope(node) {
            let action = &mut self.actions[key.0];
            if action.state == ActionState::Pending {
                action.state = ActionState::Discarded;
                action.next_due = None;
            }
            #[cfg(feature = "trace-rich")]
            trace_edge(tracer, self.now, node, target, false);
            tracer.action_disposed(&ActionDisposedEvent {
                at: self.now,
                action: node,
                label: spec.label,
                freed: true,
            });
        }
        Ok(key)
    }

    /// Runs an action now, outside the clock: a button tap, a started
    /// animator, or the scheduler firing it.
    ///
    /// Returns `false` (a no-op) if the action is finished, cancelled, or
    /// discarded. A weak capture whose controller is gone still runs but
    /// records no effect.
    pub fn execute(
        &mut self,
        registry: &mut LifetimeRegistry,
        key: ActionKey,
        effects: &mut dyn EffectSink,
        tracer: &mut Tracer<'_>,
    ) -> bool {
        let now = self.now;
        let Some(action) = self.actions.get_mut(key.0) else {
            return false;
        };
        if action.state != ActionState::Pending {
            return false;
        }
        if !registry.action_is_alive(action.node) {
            action.state = ActionState::Discarded;
            action.next_due = None;
            return false;
        }

        action.executed += 1;
        let reached = match action.target {
            Target::Strong(c) => registry.is_alive(c).then_some(Some(c)),
            Target::Weak(weak) => registry.upgrade(weak).map(Some),
            Target::SubObject | Target::Detached => Some(None),
        };
        if let Some(controller) = reached {
            effects.record(Effect {
                at: now,
                action: action.spec.label,
                controller,
            });
        }
        tracer.action_executed(&ActionExecutedEvent {
            at: now,
            action: action.node,
            label: action.spec.label,
            count: action.executed,
            effective: reached.is_some(),
        });

        let trigger = action.spec.trigger;
        match trigger {
            Trigger::Immediate => {
                action.state = ActionState::Finished;
            }
            Trigger::DeferredOnce { .. } => {
                action.state = ActionState::Finished;
                action.next_due = None;
                self.dispose(registry, key, tracer);
            }
            Trigger::DeferredRepeating { interval } => {
                if let Some(due) = &mut action.next_due {
                    *due = now + interval;
                }
            }
        }
        true
    }

    /// Stops an action and drops its capture edge. Idempotent.
    ///
    /// Returns `false` if the action was not pending.
    pub fn cancel(
        &mut self,
        registry: &mut LifetimeRegistry,
        key: ActionKey,
        tracer: &mut Tracer<'_>,
    ) -> bool {
        let now = self.now;
        let Some(action) = self.actions.get_mut(key.0) else {
            return false;
        };
        if action.state != ActionState::Pending {
            return false;
        }
        action.state = ActionState::Cancelled;
        action.next_due = None;
        if registry.remove_edge(action.node) {
            #[cfg(feature = "trace-rich")]
            trace_edge(tracer, now, action.node, action.target, false);
        }
        registry.unpin(action.node);
        tracer.action_cancelled(&ActionCancelledEvent {
            at: now,
            action: action.node,
            label: action.spec.label,
        });
        true
    }

    /// Moves the clock one step and runs every queued action that is due.
    ///
    /// Returns how many actions ran.
    pub fn advance(
        &mut self,
        registry: &mut LifetimeRegistry,
        effects: &mut dyn EffectSink,
        tracer: &mut Tracer<'_>,
    ) -> usize {
        self.now = self.now.next();
        let mut ran = 0;
        for i in 0..self.actions.len() {
            let action = &self.actions[i];
            let due = action.state == ActionState::Pending
                && action.next_due.is_some_and(|due| due <= self.now);
            if due && self.execute(registry, ActionKey(i), effects, tracer) {
                ran += 1;
            }
        }
        ran
    }

    /// Advances the clock `steps` times. Returns how many actions ran.
    pub fn run_for(
        &mut self,
        steps: Steps,
        registry: &mut LifetimeRegistry,
        effects: &mut dyn EffectSink,
        tracer: &mut Tracer<'_>,
    ) -> usize {
        (0..steps.count())
            .map(|_| self.advance(registry, effects, tracer))
            .sum()
    }

    /// Returns the action behind a key.
    #[must_use]
    pub fn get(&self, key: ActionKey) -> Option<&ScheduledAction> {
        self.actions.get(key.0)
    }

    /// Finds the first action scheduled with the given label.
    #[must_use]
    pub fn find(&self, label: &str) -> Option<ActionKey> {
        self.actions
            .iter()
            .position(|a| a.spec.label == label)
            .map(ActionKey)
    }

    /// Iterates over every action in schedule order.
    pub fn iter(&self) -> impl Iterator<Item = (ActionKey, &ScheduledAction)> + '_ {
        self.actions
            .iter()
            .enumerate()
            .map(|(i, a)| (ActionKey(i), a))
    }

    /// Returns how many queued actions are still waiting to run.
    #[must_use]
    pub fn queued_len(&self) -> usize {
        self.actions
            .iter()
            .filter(|a| a.state == ActionState::Pending && a.next_due.is_some())
            .count()
    }

    /// Returns `(label, times executed)` for every action, in schedule
    /// order.
    #[must_use]
    pub fn execution_counts(&self) -> Vec<(&'static str, u32)> {
        self.actions
            .iter()
            .map(|a| (a.spec.label, a.executed))
            .collect()
    }

    /// Lets go of a one-shot action after it ran.
    ///
    /// The capture edge is dropped even when a field still stores the
    /// action: a fired one-shot no longer references its controller.
    fn dispose(&mut self, registry: &mut LifetimeRegistry, key: ActionKey, tracer: &mut Tracer<'_>) {
        let Some(action) = self.actions.get(key.0) else {
            return;
        };
        let dropped = registry.remove_edge(action.node);
        let freed = registry.unpin(action.node);
        #[cfg(feature = "trace-rich")]
        if dropped {
            trace_edge(tracer, self.now, action.node, action.target, false);
        }
        #[cfg(not(feature = "trace-rich"))]
        let _ = dropped;
        tracer.action_disposed(&ActionDisposedEvent {
            at: self.now,
            action: action.node,
            label: action.spec.label,
            freed,
        });
    }
}

#[cfg(feature = "trace-rich")]
fn trace_edge(tracer: &mut Tracer<'_>, at: Step, action: ActionId, target: Target, added: bool) {
    use crate::trace::{EdgeEvent, EdgeKind};

    let (controller, kind) = match target {
        Target::Strong(c) => (c, EdgeKind::Strong),
        Target::Weak(weak) => (weak.target_unchecked(), EdgeKind::Weak),
        Target::SubObject | Target::Detached => return,
    };
    let e = EdgeEvent {
        at,
        action,
        controller,
        kind,
    };
    if added {
        tracer.edge_added(&e);
    } else {
        tracer.edge_removed(&e);
    }
}
