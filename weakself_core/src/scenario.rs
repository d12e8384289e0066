// Copyright 2026 the Weakself Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The catalogue of capture scenarios.
//!
//! Each [`Scenario`] is a fixed recipe: a list of actions to schedule on a
//! freshly presented controller, and the explicit executions (button taps,
//! started animators) that happen before the controller is dismissed. The
//! recipes are data, so the runner has no per-scenario code paths.

use alloc::string::ToString;
use core::fmt;
use core::str::FromStr;

use crate::action::ActionSpec;
use crate::capture::{CaptureKind, Trigger};
use crate::error::ConfigError;
use crate::step::Steps;

/// Whether the controller outlived its dismissal for good.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// Still alive after teardown and the settle window, or reclaimed only
    /// by the cycle sweep.
    Leaked,
    /// Destroyed by its strong count reaching zero.
    Collected,
}

impl Outcome {
    /// Returns `"leaked"` or `"collected"`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Leaked => "leaked",
            Self::Collected => "collected",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of a scenario recipe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecipeOp {
    /// Declare and schedule an action on the controller.
    Schedule(ActionSpec),
    /// Run a previously scheduled action by label, outside the scheduler.
    Execute(&'static str),
}

/// A named capture scenario.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Scenario {
    /// A method reference stored in a button's closure property.
    LeakyButton,
    /// The button closure captures `self` weakly.
    NonLeakyButton,
    /// `forEach` and `filter` closures capturing `self`.
    HigherOrderFunctions,
    /// `UIView.animate` with a non-escaping animation block.
    UiViewAnimate,
    /// An animator capturing `self`, stored in a property and never started.
    LeakyViewPropertyAnimator,
    /// An animator capturing only the view, stored in a property.
    NonLeakyViewPropertyAnimator1,
    /// An animator capturing `self`, started right away and not stored.
    NonLeakyViewPropertyAnimator2,
    /// A work item capturing `self`, queued and stored in a property. It
    /// holds the controller until it fires, then lets go.
    LeakyDispatchQueue,
    /// Three dispatch closures capturing `self`, queued and not stored.
    NonLeakyDispatchQueue,
    /// A repeating run-loop timer capturing `self`.
    LeakyTimer,
    /// An async call that stores its completion, capturing `self`, in a
    /// property. The request finishes but never calls the completion.
    LeakyAsyncCall,
    /// A slow async call whose completion captures `self`.
    DelayedAllocAsyncCall,
    /// A semaphore wait with a timeout, capturing `self`.
    DelayedAllocSemaphore,
    /// A closure capturing `self`, stored and never called.
    SavedClosure,
    /// A closure capturing `self`, called once and dropped.
    UnsavedClosure,
}

const PRINTER: ActionSpec =
    ActionSpec::deferred("printer", CaptureKind::StrongDirect, Trigger::EVERY_STEP)
        .retained()
        .manual();

const ANIMATIONS: ActionSpec =
    ActionSpec::deferred("animations", CaptureKind::StrongDirect, Trigger::ONCE);
const COMPLETION: ActionSpec =
    ActionSpec::deferred("completion", CaptureKind::StrongDirect, Trigger::ONCE);

const fn once_after(label: &'static str, delay: u64) -> ActionSpec {
    ActionSpec::deferred(
        label,
        CaptureKind::StrongDirect,
        Trigger::DeferredOnce {
            delay: Steps(delay),
        },
    )
}

const LEAKY_BUTTON: &[RecipeOp] = &[RecipeOp::Schedule(PRINTER), RecipeOp::Execute("printer")];

const NON_LEAKY_BUTTON: &[RecipeOp] = &[
    RecipeOp::Schedule(PRINTER.capturing(CaptureKind::Weak)),
    RecipeOp::Execute("printer"),
];

const HIGHER_ORDER_FUNCTIONS: &[RecipeOp] = &[
    RecipeOp::Schedule(ActionSpec::immediate("forEach", CaptureKind::StrongDirect)),
    RecipeOp::Schedule(ActionSpec::immediate("filter", CaptureKind::StrongDirect)),
];

const UI_VIEW_ANIMATE: &[RecipeOp] = &[RecipeOp::Schedule(ActionSpec::immediate(
    "animations",
    CaptureKind::StrongDirect,
))];

const LEAKY_ANIMATOR: &[RecipeOp] = &[
    RecipeOp::Schedule(ANIMATIONS.retained().manual()),
    RecipeOp::Schedule(COMPLETION.retained().manual()),
];

const NON_LEAKY_ANIMATOR_1: &[RecipeOp] = &[
    RecipeOp::Schedule(
        ANIMATIONS
            .capturing(CaptureKind::FieldOnly)
            .retained()
            .manual(),
    ),
    RecipeOp::Schedule(
        COMPLETION
            .capturing(CaptureKind::FieldOnly)
            .retained()
            .manual(),
    ),
];

const NON_LEAKY_ANIMATOR_2: &[RecipeOp] = &[
    RecipeOp::Schedule(ANIMATIONS),
    RecipeOp::Schedule(COMPLETION),
    RecipeOp::Execute("animations"),
    RecipeOp::Execute("completion"),
];

const LEAKY_DISPATCH_QUEUE: &[RecipeOp] =
    &[RecipeOp::Schedule(once_after("workItem", 1).retained())];

const NON_LEAKY_DISPATCH_QUEUE: &[RecipeOp] = &[
    RecipeOp::Schedule(once_after("asyncAfter", 1)),
    RecipeOp::Schedule(once_after("mainAsync", 1)),
    RecipeOp::Schedule(once_after("globalAsync", 1)),
];

const LEAKY_TIMER: &[RecipeOp] = &[RecipeOp::Schedule(ActionSpec::deferred(
    "timer",
    CaptureKind::StrongDirect,
    Trigger::DeferredRepeating {
        interval: Steps(1),
    },
))];

const LEAKY_ASYNC_CALL: &[RecipeOp] = &[
    RecipeOp::Schedule(once_after("dataTask", 2)),
    RecipeOp::Schedule(COMPLETION.retained().manual()),
];

const DELAYED_ALLOC_ASYNC_CALL: &[RecipeOp] =
    &[RecipeOp::Schedule(once_after("downloadTask", 3))];

const DELAYED_ALLOC_SEMAPHORE: &[RecipeOp] =
    &[RecipeOp::Schedule(once_after("semaphoreWait", 5))];

const SAVED_CLOSURE: &[RecipeOp] = &[RecipeOp::Schedule(
    ActionSpec::deferred("closure", CaptureKind::StrongDirect, Trigger::ONCE)
        .retained()
        .manual(),
)];

const UNSAVED_CLOSURE: &[RecipeOp] = &[RecipeOp::Schedule(ActionSpec::immediate(
    "closure",
    CaptureKind::StrongDirect,
))];

impl Scenario {
    /// Every scenario, in menu order.
    pub const ALL: [Self; 15] = [
        Self::LeakyButton,
        Self::NonLeakyButton,
        Self::HigherOrderFunctions,
        Self::UiViewAnimate,
        Self::LeakyViewPropertyAnimator,
        Self::NonLeakyViewPropertyAnimator1,
        Self::NonLeakyViewPropertyAnimator2,
        Self::LeakyDispatchQueue,
        Self::NonLeakyDispatchQueue,
        Self::LeakyTimer,
        Self::LeakyAsyncCall,
        Self::DelayedAllocAsyncCall,
        Self::DelayedAllocSemaphore,
        Self::SavedClosure,
        Self::UnsavedClosure,
    ];

    /// Returns the lowerCamelCase scenario name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LeakyButton => "leakyButton",
            Self::NonLeakyButton => "nonLeakyButton",
            Self::HigherOrderFunctions => "higherOrderFunctions",
            Self::UiViewAnimate => "uiViewAnimate",
            Self::LeakyViewPropertyAnimator => "leakyViewPropertyAnimator",
            Self::NonLeakyViewPropertyAnimator1 => "nonLeakyViewPropertyAnimator1",
            Self::NonLeakyViewPropertyAnimator2 => "nonLeakyViewPropertyAnimator2",
            Self::LeakyDispatchQueue => "leakyDispatchQueue",
            Self::NonLeakyDispatchQueue => "nonLeakyDispatchQueue",
            Self::LeakyTimer => "leakyTimer",
            Self::LeakyAsyncCall => "leakyAsyncCall",
            Self::DelayedAllocAsyncCall => "delayedAllocAsyncCall",
            Self::DelayedAllocSemaphore => "delayedAllocSemaphore",
            Self::SavedClosure => "savedClosure",
            Self::UnsavedClosure => "unsavedClosure",
        }
    }

    /// The outcome this scenario is documented to produce.
    #[must_use]
    pub const fn expected(self) -> Outcome {
        match self {
            Self::LeakyButton
            | Self::LeakyViewPropertyAnimator
            | Self::LeakyTimer
            | Self::LeakyAsyncCall
            | Self::SavedClosure => Outcome::Leaked,
            Self::NonLeakyButton
            | Self::HigherOrderFunctions
            | Self::UiViewAnimate
            | Self::NonLeakyViewPropertyAnimator1
            | Self::NonLeakyViewPropertyAnimator2
            | Self::LeakyDispatchQueue
            | Self::NonLeakyDispatchQueue
            | Self::DelayedAllocAsyncCall
            | Self::DelayedAllocSemaphore
            | Self::UnsavedClosure => Outcome::Collected,
        }
    }

    /// Whether the recipe was reconstructed from the scenario's name alone.
    ///
    /// These five have no body to follow; treat their recipes as
    /// placeholders that demonstrate the named pattern.
    #[must_use]
    pub const fn is_inferred(self) -> bool {
        matches!(
            self,
            Self::LeakyAsyncCall
                | Self::DelayedAllocAsyncCall
                | Self::DelayedAllocSemaphore
                | Self::SavedClosure
                | Self::UnsavedClosure
        )
    }

    /// Returns the actions and explicit executions of this scenario, in
    /// order.
    #[must_use]
    pub const fn recipe(self) -> &'static [RecipeOp] {
        match self {
            Self::LeakyButton => LEAKY_BUTTON,
            Self::NonLeakyButton => NON_LEAKY_BUTTON,
            Self::HigherOrderFunctions => HIGHER_ORDER_FUNCTIONS,
            Self::UiViewAnimate => UI_VIEW_ANIMATE,
            Self::LeakyViewPropertyAnimator => LEAKY_ANIMATOR,
            Self::NonLeakyViewPropertyAnimator1 => NON_LEAKY_ANIMATOR_1,
            Self::NonLeakyViewPropertyAnimator2 => NON_LEAKY_ANIMATOR_2,
            Self::LeakyDispatchQueue => LEAKY_DISPATCH_QUEUE,
            Self::NonLeakyDispatchQueue => NON_LEAKY_DISPATCH_QUEUE,
            Self::LeakyTimer => LEAKY_TIMER,
            Self::LeakyAsyncCall => LEAKY_ASYNC_CALL,
            Self::DelayedAllocAsyncCall => DELAYED_ALLOC_ASYNC_CALL,
            Self::DelayedAllocSemaphore => DELAYED_ALLOC_SEMAPHORE,
            Self::SavedClosure => SAVED_CLOSURE,
            Self::UnsavedClosure => UNSAVED_CLOSURE,
        }
    }

    /// Returns the longest one-shot delay in the recipe, so callers can
    /// size a settle window that lets every one-shot fire.
    #[must_use]
    pub fn longest_delay(self) -> Steps {
        self.recipe()
            .iter()
            .filter_map(|op| match op {
                RecipeOp::Schedule(spec) if spec.drive.is_queued() => {
                    Some(spec.trigger.first_delay())
                }
                _ => None,
            })
            .max()
            .unwrap_or(Steps::ZERO)
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scenario {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|scenario| scenario.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownScenario(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;

    #[test]
    fn names_parse_back() {
        for scenario in Scenario::ALL {
            assert_eq!(scenario.as_str().parse::<Scenario>(), Ok(scenario));
        }
    }

    #[test]
    fn names_are_unique() {
        let mut names: Vec<_> = Scenario::ALL.iter().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Scenario::ALL.len());
    }

    #[test]
    fn unknown_name_is_config_error() {
        assert_eq!(
            "LeakyButton".parse::<Scenario>(),
            Err(ConfigError::UnknownScenario("LeakyButton".into())),
            "names are case-sensitive"
        );
    }

    #[test]
    fn every_recipe_is_valid() {
        for scenario in Scenario::ALL {
            assert!(!scenario.recipe().is_empty(), "{scenario} has no actions");
            for op in scenario.recipe() {
                match op {
                    RecipeOp::Schedule(spec) => {
                        assert_eq!(spec.validate(), Ok(()), "{scenario}: {}", spec.label);
                    }
                    RecipeOp::Execute(label) => assert!(
                        scenario.recipe().iter().any(
                            |o| matches!(o, RecipeOp::Schedule(s) if s.label == *label)
                        ),
                        "{scenario} executes unknown action {label}"
                    ),
                }
            }
        }
    }

    #[test]
    fn five_scenarios_leak() {
        let leaky: Vec<_> = Scenario::ALL
            .into_iter()
            .filter(|s| s.expected() == Outcome::Leaked)
            .collect();
        assert_eq!(
            leaky,
            [
                Scenario::LeakyButton,
                Scenario::LeakyViewPropertyAnimator,
                Scenario::LeakyTimer,
                Scenario::LeakyAsyncCall,
                Scenario::SavedClosure,
            ]
        );
        assert_eq!(
            Scenario::LeakyDispatchQueue.expected(),
            Outcome::Collected,
            "the stored work item lets go once it fires"
        );
    }

    #[test]
    fn longest_delay_covers_queued_actions_only() {
        assert_eq!(Scenario::DelayedAllocSemaphore.longest_delay(), Steps(5));
        assert_eq!(Scenario::LeakyTimer.longest_delay(), Steps(1));
        assert_eq!(Scenario::SavedClosure.longest_delay(), Steps::ZERO);
        assert_eq!(Scenario::UnsavedClosure.longest_delay(), Steps::ZERO);
    }

    #[test]
    fn inferred_scenarios_are_the_last_five() {
        let inferred: Vec<_> = Scenario::ALL
            .into_iter()
            .filter(|s| s.is_inferred())
            .collect();
        assert_eq!(inferred, Scenario::ALL[10..]);
    }
}
