// Copyright 2026 the Weakself Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Opaque side effects of executed actions.
//!
//! The simulation never touches a view. When an action runs, the scheduler
//! hands an [`Effect`] to an [`EffectSink`]: "this closure would have changed
//! the UI now". Whatever actually renders (or, in tests, counts) those effects
//! implements the trait.

use alloc::vec::Vec;

use crate::registry::ControllerId;
use crate::step::Step;

/// One executed action that reached its target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Effect {
    /// When the action ran.
    pub at: Step,
    /// Label of the action that ran.
    pub action: &'static str,
    /// The controller the closure acted on, if it reached one. `None` for
    /// closures that only touched a captured sub-object or nothing at all.
    pub controller: Option<ControllerId>,
}

/// Receives the effects of executed actions.
///
/// Implementations stand in for the UI: a test double can count effects, a
/// renderer could apply them.
pub trait EffectSink {
    /// Records a single effect.
    fn record(&mut self, effect: Effect);
}

/// An [`EffectSink`] that keeps every effect in order.
#[derive(Clone, Debug, Default)]
pub struct EffectLog {
    effects: Vec<Effect>,
}

impl EffectLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of recorded effects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.effects.len()
    }

    /// Returns `true` if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Returns the recorded effects in order.
    #[must_use]
    pub fn as_slice(&self) -> &[Effect] {
        &self.effects
    }

    /// Returns how many effects the action with the given label produced.
    #[must_use]
    pub fn count_for(&self, action: &str) -> usize {
        self.effects.iter().filter(|e| e.action == action).count()
    }
}

impl EffectSink for EffectLog {
    fn record(&mut self, effect: Effect) {
        self.effects.push(effect);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_keeps_order_and_counts_per_action() {
        let mut log = EffectLog::new();
        assert!(log.is_empty());
        for (at, action) in [(1, "timer"), (2, "timer"), (2, "completion")] {
            log.record(Effect {
                at: Step(at),
                action,
                controller: None,
            });
        }
        assert_eq!(log.len(), 3);
        assert_eq!(log.count_for("timer"), 2);
        assert_eq!(log.count_for("completion"), 1);
        assert_eq!(log.count_for("printer"), 0);
        assert_eq!(log.as_slice()[2].at, Step(2));
    }
}
