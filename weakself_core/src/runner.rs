// Copyright 2026 the Weakself Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scenario runner.
//!
//! [`ScenarioRunner::run`] plays one scenario end to end on a fresh
//! simulation:
//!
//! 1. Present: register the controller, owned by the navigation stack.
//! 2. Set up: schedule the recipe's actions and perform its explicit
//!    executions. With image generation on, queue the "apply filters"
//!    completion first, as the controller does when it appears.
//! 3. Dismiss: release the external owner and collect. Whether the controller
//!    survived this collection is reported as `alive_at_dismissal`.
//! 4. Settle: drive the clock for the settle window, then collect again.
//! 5. Report the controller's final [`Fate`] and [`Outcome`].

use alloc::vec::Vec;

use crate::action::{ActionScheduler, ActionSpec};
use crate::capture::{CaptureKind, Trigger};
use crate::effect::EffectLog;
use crate::error::ConfigError;
use crate::registry::{Fate, LifetimeRegistry};
use crate::scenario::{Outcome, RecipeOp, Scenario};
use crate::step::{Step, Steps};
use crate::trace::{
    CollectEvent, ControllerDestroyedEvent, ControllerRegisteredEvent, OwnerReleasedEvent,
    ScenarioSummary, Tracer,
};

/// Label of the controller every scenario presents.
pub const CONTROLLER_LABEL: &str = "PresentedController";

/// Label of the image-generation completion.
pub const IMAGE_ACTION_LABEL: &str = "applyFilters";

/// Configuration for the [`ScenarioRunner`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Steps to drive the clock after dismissal. The runner always drives at
    /// least long enough for every queued one-shot to fire.
    pub settle_steps: Steps,
    /// Queue the image-generation completion before the recipe.
    pub image_generation: bool,
    /// Delay before the image-generation completion fires.
    pub image_delay: Steps,
}

impl RunnerConfig {
    /// Eight settle steps, no image generation.
    #[must_use]
    pub const fn standard() -> Self {
        Self {
            settle_steps: Steps(8),
            image_generation: false,
            image_delay: Steps(2),
        }
    }

    /// The standard configuration with image generation on.
    #[must_use]
    pub const fn with_image_generation() -> Self {
        Self {
            image_generation: true,
            ..Self::standard()
        }
    }

    /// Replaces the settle window.
    #[must_use]
    pub const fn settle(mut self, steps: Steps) -> Self {
        self.settle_steps = steps;
        self
    }

    /// The window actually driven for `scenario`.
    #[must_use]
    pub fn effective_settle(&self, scenario: Scenario) -> Steps {
        let mut settle = self.settle_steps.max(scenario.longest_delay());
        if self.image_generation {
            settle = settle.max(self.image_delay);
        }
        settle
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self::standard()
    }
}

/// The result of running one scenario.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScenarioReport {
    /// Which scenario ran.
    pub scenario: Scenario,
    /// Leaked or collected, after teardown and the settle window.
    pub outcome: Outcome,
    /// Whether pending work still held the controller when it was dismissed.
    pub alive_at_dismissal: bool,
    /// Final fate of the controller.
    pub fate: Fate,
    /// `(label, times executed)` per action, in schedule order.
    pub execution_counts: Vec<(&'static str, u32)>,
    /// Effects that reached their target.
    pub effects: u32,
}

impl ScenarioReport {
    /// Returns how often the action with the given label ran.
    #[must_use]
    pub fn executed(&self, label: &str) -> Option<u32> {
        self.execution_counts
            .iter()
            .find(|(l, _)| *l == label)
            .map(|&(_, n)| n)
    }

    /// Whether the outcome is the one the scenario documents.
    #[must_use]
    pub fn matches_expectation(&self) -> bool {
        self.outcome == self.scenario.expected()
    }
}

/// Plays scenarios on fresh, isolated simulations.
#[derive(Clone, Copy, Debug, Default)]
pub struct ScenarioRunner {
    config: RunnerConfig,
}

impl ScenarioRunner {
    /// Creates a runner with the given configuration.
    #[must_use]
    pub const fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Parses a scenario name and runs it.
    pub fn run_named(
        &self,
        name: &str,
        tracer: &mut Tracer<'_>,
    ) -> Result<ScenarioReport, ConfigError> {
        self.run(name.parse()?, tracer)
    }

    /// Runs one scenario.
    pub fn run(
        &self,
        scenario: Scenario,
        tracer: &mut Tracer<'_>,
    ) -> Result<ScenarioReport, ConfigError> {
        let mut registry = LifetimeRegistry::new();
        let mut scheduler = ActionScheduler::new();
        let mut effects = EffectLog::new();

        let vc = registry.register(CONTROLLER_LABEL);
        tracer.controller_registered(&ControllerRegisteredEvent {
            at: scheduler.now(),
            controller: vc,
            label: CONTROLLER_LABEL,
        });

        if self.config.image_generation {
            let images = ActionSpec::deferred(
                IMAGE_ACTION_LABEL,
                CaptureKind::StrongDirect,
                Trigger::DeferredOnce {
                    delay: self.config.image_delay,
                },
            );
            scheduler.schedule(&mut registry, vc, &images, &mut effects, tracer)?;
        }

        for op in scenario.recipe() {
            match *op {
                RecipeOp::Schedule(spec) => {
                    scheduler.schedule(&mut registry, vc, &spec, &mut effects, tracer)?;
                }
                RecipeOp::Execute(label) => {
                    let key = scheduler
                        .find(label)
                        .ok_or(ConfigError::UnknownAction { label })?;
                    scheduler.execute(&mut registry, key, &mut effects, tracer);
                }
            }
        }

        let changed = registry.release_external_owner(vc);
        tracer.owner_released(&OwnerReleasedEvent {
            at: scheduler.now(),
            controller: vc,
            changed,
            strong_count: registry.strong_count(vc).unwrap_or(0),
        });
        collect(&mut registry, scheduler.now(), tracer);
        let alive_at_dismissal = registry.is_alive(vc);

        scheduler.run_for(
            self.config.effective_settle(scenario),
            &mut registry,
            &mut effects,
            tracer,
        );
        collect(&mut registry, scheduler.now(), tracer);

        let fate = registry.fate(vc).unwrap_or(Fate::Alive);
        let outcome = match fate {
            Fate::Released => Outcome::Collected,
            Fate::Alive | Fate::Swept => Outcome::Leaked,
        };
        let report = ScenarioReport {
            scenario,
            outcome,
            alive_at_dismissal,
            fate,
            execution_counts: scheduler.execution_counts(),
            effects: u32::try_from(effects.len()).unwrap_or(u32::MAX),
        };
        tracer.scenario_summary(&ScenarioSummary {
            at: scheduler.now(),
            scenario,
            outcome,
            fate,
            alive_at_dismissal,
            effects: report.effects,
        });
        Ok(report)
    }
}

/// Runs a scenario by name with [`RunnerConfig::standard`] and no tracing.
pub fn run_scenario(name: &str) -> Result<ScenarioReport, ConfigError> {
    ScenarioRunner::default().run_named(name, &mut Tracer::none())
}

/// Collects and traces the result. Every run presents a single controller,
/// so everything destroyed carries its label.
fn collect(registry: &mut LifetimeRegistry, at: Step, tracer: &mut Tracer<'_>) {
    let report = registry.collect();
    for (controller, fate) in report.destroyed() {
        tracer.controller_destroyed(&ControllerDestroyedEvent {
            at,
            controller,
            label: CONTROLLER_LABEL,
            fate,
        });
    }
    tracer.collect(&CollectEvent::new(at, &report));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(scenario: Scenario) -> ScenarioReport {
        ScenarioRunner::default()
            .run(scenario, &mut Tracer::none())
            .unwrap()
    }

    #[test]
    fn every_scenario_matches_its_documented_outcome() {
        for scenario in Scenario::ALL {
            let report = run(scenario);
            assert_eq!(
                report.outcome,
                scenario.expected(),
                "{scenario}: fate {:?}",
                report.fate
            );
            assert!(report.matches_expectation(), "{scenario}");
        }
    }

    #[test]
    fn leaky_button_is_only_reclaimed_by_the_sweep() {
        let report = run_scenario("leakyButton").unwrap();
        assert_eq!(report.outcome, Outcome::Leaked);
        assert_eq!(report.fate, Fate::Swept);
        assert!(!report.alive_at_dismissal);
        assert_eq!(report.executed("printer"), Some(1));
    }

    #[test]
    fn non_leaky_button_is_released() {
        let report = run_scenario("nonLeakyButton").unwrap();
        assert_eq!(report.outcome, Outcome::Collected);
        assert_eq!(report.fate, Fate::Released);
        assert_eq!(report.effects, 1);
    }

    #[test]
    fn immediate_scenarios_run_once_and_release_at_dismissal() {
        for scenario in [
            Scenario::HigherOrderFunctions,
            Scenario::UiViewAnimate,
            Scenario::UnsavedClosure,
        ] {
            let report = run(scenario);
            assert!(!report.alive_at_dismissal, "{scenario}");
            assert_eq!(report.fate, Fate::Released, "{scenario}");
            assert!(
                report.execution_counts.iter().all(|&(_, n)| n == 1),
                "{scenario}: {:?}",
                report.execution_counts
            );
        }
    }

    #[test]
    fn non_leaky_dispatch_queue_fires_each_action_once() {
        let report = run_scenario("nonLeakyDispatchQueue").unwrap();
        assert_eq!(report.outcome, Outcome::Collected);
        assert!(report.alive_at_dismissal, "queued work holds the controller");
        assert_eq!(
            report.execution_counts,
            [("asyncAfter", 1), ("mainAsync", 1), ("globalAsync", 1)]
        );
    }

    #[test]
    fn leaky_dispatch_queue_is_held_until_it_fires() {
        let report = run_scenario("leakyDispatchQueue").unwrap();
        assert!(report.alive_at_dismissal, "the queued work item holds it");
        assert_eq!(report.executed("workItem"), Some(1));
        assert_eq!(report.fate, Fate::Released);
        assert_eq!(report.outcome, Outcome::Collected);
    }

    #[test]
    fn leaky_async_call_keeps_its_stored_completion() {
        let report = run(Scenario::LeakyAsyncCall);
        assert!(report.alive_at_dismissal);
        assert_eq!(report.executed("dataTask"), Some(1));
        assert_eq!(report.executed("completion"), Some(0));
        assert_eq!(report.fate, Fate::Swept);
        assert_eq!(report.outcome, Outcome::Leaked);
    }

    #[test]
    fn leaky_timer_fires_for_the_whole_window() {
        let report = run(Scenario::LeakyTimer);
        assert_eq!(report.fate, Fate::Alive);
        assert_eq!(report.executed("timer"), Some(8));
    }

    #[test]
    fn animators_that_never_start_never_run() {
        for scenario in [
            Scenario::LeakyViewPropertyAnimator,
            Scenario::NonLeakyViewPropertyAnimator1,
        ] {
            let report = run(scenario);
            assert_eq!(report.executed("animations"), Some(0), "{scenario}");
            assert_eq!(report.executed("completion"), Some(0), "{scenario}");
        }
    }

    #[test]
    fn started_animator_is_gone_at_dismissal() {
        let report = run(Scenario::NonLeakyViewPropertyAnimator2);
        assert!(!report.alive_at_dismissal);
        assert_eq!(report.executed("animations"), Some(1));
        assert_eq!(report.executed("completion"), Some(1));
    }

    #[test]
    fn delayed_allocation_outlives_dismissal() {
        for scenario in [Scenario::DelayedAllocAsyncCall, Scenario::DelayedAllocSemaphore] {
            let report = run(scenario);
            assert!(report.alive_at_dismissal, "{scenario}");
            assert_eq!(report.outcome, Outcome::Collected, "{scenario}");
        }
    }

    #[test]
    fn short_settle_window_still_lets_one_shots_fire() {
        let runner = ScenarioRunner::new(RunnerConfig::standard().settle(Steps::ZERO));
        let report = runner
            .run(Scenario::DelayedAllocSemaphore, &mut Tracer::none())
            .unwrap();
        assert_eq!(report.outcome, Outcome::Collected);
        assert_eq!(
            runner.config().effective_settle(Scenario::DelayedAllocSemaphore),
            Steps(5)
        );
    }

    #[test]
    fn image_generation_never_changes_the_outcome() {
        let runner = ScenarioRunner::new(RunnerConfig::with_image_generation());
        for scenario in Scenario::ALL {
            let report = runner.run(scenario, &mut Tracer::none()).unwrap();
            assert_eq!(report.outcome, scenario.expected(), "{scenario}");
            assert_eq!(report.executed(IMAGE_ACTION_LABEL), Some(1), "{scenario}");
            assert!(
                report.alive_at_dismissal,
                "{scenario}: the pending completion holds the controller"
            );
        }
    }

    #[test]
    fn unknown_name_is_rejected() {
        assert_eq!(
            run_scenario("leakyToaster"),
            Err(ConfigError::UnknownScenario("leakyToaster".into()))
        );
    }

    #[test]
    fn runs_are_isolated() {
        let first = run(Scenario::LeakyTimer);
        let second = run(Scenario::LeakyTimer);
        assert_eq!(first, second);
    }

    #[cfg(feature = "trace")]
    #[test]
    fn runner_traces_the_lifecycle() {
        use crate::trace::TraceSink;

        #[derive(Default)]
        struct Lifecycle {
            registered: u32,
            released: u32,
            collects: u32,
            destroyed: Vec<Fate>,
            summaries: Vec<Outcome>,
        }
        impl TraceSink for Lifecycle {
            fn on_controller_registered(&mut self, _: &ControllerRegisteredEvent) {
                self.registered += 1;
            }
            fn on_owner_released(&mut self, e: &OwnerReleasedEvent) {
                assert!(e.changed, "first release changes the count");
                self.released += 1;
            }
            fn on_collect(&mut self, _: &CollectEvent) {
                self.collects += 1;
            }
            fn on_controller_destroyed(&mut self, e: &ControllerDestroyedEvent) {
                self.destroyed.push(e.fate);
            }
            fn on_scenario_summary(&mut self, s: &ScenarioSummary) {
                self.summaries.push(s.outcome);
            }
        }

        let mut sink = Lifecycle::default();
        ScenarioRunner::default()
            .run(Scenario::LeakyButton, &mut Tracer::new(&mut sink))
            .unwrap();
        assert_eq!(sink.registered, 1);
        assert_eq!(sink.released, 1);
        assert_eq!(sink.collects, 2);
        assert_eq!(sink.destroyed, [Fate::Swept]);
        assert_eq!(sink.summaries, [Outcome::Leaked]);
    }
}
