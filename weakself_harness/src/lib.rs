// Copyright 2026 the Weakself Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scenario suite runner and leak grading for demo harnesses.

#![no_std]

extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;

use weakself_core::error::ConfigError;
use weakself_core::registry::Fate;
use weakself_core::runner::{RunnerConfig, ScenarioReport, ScenarioRunner};
use weakself_core::scenario::{Outcome, Scenario};
use weakself_core::step::Steps;
use weakself_core::trace::Tracer;

/// Runtime toggles that perturb a suite run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SuiteToggles {
    /// A deferred image-filter job strongly captures every controller.
    pub image_generation: bool,
    /// Shorten the settle window to a single step.
    pub short_settle: bool,
}

impl SuiteToggles {
    /// Builds the runner configuration these toggles describe.
    #[must_use]
    pub const fn config(self) -> RunnerConfig {
        let mut config = RunnerConfig::standard();
        config.image_generation = self.image_generation;
        if self.short_settle {
            config.settle_steps = Steps::ONE;
        }
        config
    }
}

/// Letter grade for how well a suite run matches the expected outcomes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LeakGrade {
    /// Every scenario matched.
    A,
    /// Only inferred scenarios disagreed.
    B,
    /// At most two documented scenarios disagreed.
    C,
    /// Worse.
    D,
}

impl LeakGrade {
    /// Returns a short label for summary lines.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
        }
    }
}

/// Aggregated report returned by [`SuiteTracker::observe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SuiteReport {
    /// Current grade.
    pub grade: LeakGrade,
    /// Scenarios observed.
    pub total: u32,
    /// Scenarios whose controller leaked.
    pub leaked: u32,
    /// Leaks that only a cycle sweep would have reclaimed.
    pub swept: u32,
    /// Documented scenarios whose outcome disagreed with expectations.
    pub mismatched: u32,
    /// Inferred scenarios whose outcome disagreed with expectations.
    pub mismatched_inferred: u32,
}

/// Accumulates scenario reports into a grade and a one-character-per-run
/// strip.
#[derive(Debug, Default)]
pub struct SuiteTracker {
    marks: Vec<u8>,
    total: u32,
    leaked: u32,
    swept: u32,
    mismatched: u32,
    mismatched_inferred: u32,
}

impl SuiteTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            marks: Vec::new(),
            total: 0,
            leaked: 0,
            swept: 0,
            mismatched: 0,
            mismatched_inferred: 0,
        }
    }

    /// Observes one scenario report and returns an updated summary.
    pub fn observe(&mut self, report: &ScenarioReport) -> SuiteReport {
        self.total = self.total.saturating_add(1);
        if report.outcome == Outcome::Leaked {
            self.leaked = self.leaked.saturating_add(1);
        }
        if report.fate == Fate::Swept {
            self.swept = self.swept.saturating_add(1);
        }

        let matches = report.matches_expectation();
        if !matches {
            if report.scenario.is_inferred() {
                self.mismatched_inferred = self.mismatched_inferred.saturating_add(1);
            } else {
                self.mismatched = self.mismatched.saturating_add(1);
            }
        }
        self.marks.push(mark_for(report, matches));
        self.report()
    }

    /// Returns the summary so far.
    #[must_use]
    pub fn report(&self) -> SuiteReport {
        SuiteReport {
            grade: grade_for(self.mismatched, self.mismatched_inferred),
            total: self.total,
            leaked: self.leaked,
            swept: self.swept,
            mismatched: self.mismatched,
            mismatched_inferred: self.mismatched_inferred,
        }
    }

    /// Returns an ASCII strip with one character per observed run, oldest
    /// first.
    ///
    /// `.` collected, `L` leaked while alive, `~` leaked and swept, `!` any
    /// outcome that disagreed with its expectation.
    #[must_use]
    pub fn strip(&self) -> String {
        self.marks.iter().map(|&m| char::from(m)).collect()
    }
}

fn mark_for(report: &ScenarioReport, matches: bool) -> u8 {
    if !matches {
        return b'!';
    }
    match report.fate {
        Fate::Released => b'.',
        Fate::Swept => b'~',
        Fate::Alive => b'L',
    }
}

fn grade_for(mismatched: u32, mismatched_inferred: u32) -> LeakGrade {
    match (mismatched, mismatched_inferred) {
        (0, 0) => LeakGrade::A,
        (0, _) => LeakGrade::B,
        (1..=2, _) => LeakGrade::C,
        _ => LeakGrade::D,
    }
}

/// Runs every scenario in menu order and returns the individual reports
/// alongside the tracker that graded them.
pub fn run_suite(
    config: RunnerConfig,
    tracer: &mut Tracer<'_>,
) -> Result<(Vec<ScenarioReport>, SuiteTracker), ConfigError> {
    let runner = ScenarioRunner::new(config);
    let mut tracker = SuiteTracker::new();
    let mut reports = Vec::with_capacity(Scenario::ALL.len());
    for scenario in Scenario::ALL {
        let report = runner.run(scenario, tracer)?;
        tracker.observe(&report);
        reports.push(report);
    }
    Ok((reports, tracker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_suite_grades_a() {
        let (reports, tracker) = run_suite(RunnerConfig::standard(), &mut Tracer::none()).unwrap();
        assert_eq!(reports.len(), 15);

        let summary = tracker.report();
        assert_eq!(summary.grade, LeakGrade::A);
        assert_eq!(summary.total, 15);
        assert_eq!(summary.leaked, 5);
        assert_eq!(summary.mismatched, 0);
        assert_eq!(summary.mismatched_inferred, 0);
    }

    #[test]
    fn strip_follows_menu_order() {
        let (_, tracker) = run_suite(RunnerConfig::standard(), &mut Tracer::none()).unwrap();
        let strip = tracker.strip();
        assert_eq!(strip.len(), 15);
        // leakyButton is a cycle, nonLeakyButton is released.
        assert!(strip.starts_with("~."), "strip: {strip}");
        assert!(!strip.contains('!'), "strip: {strip}");
    }

    #[test]
    fn short_settle_does_not_misreport_delayed_work() {
        let toggles = SuiteToggles {
            short_settle: true,
            ..SuiteToggles::default()
        };
        let (_, tracker) = run_suite(toggles.config(), &mut Tracer::none()).unwrap();
        assert_eq!(tracker.report().grade, LeakGrade::A);
    }

    #[test]
    fn image_generation_keeps_results_stable() {
        let toggles = SuiteToggles {
            image_generation: true,
            ..SuiteToggles::default()
        };
        let (reports, tracker) = run_suite(toggles.config(), &mut Tracer::none()).unwrap();
        assert_eq!(tracker.report().grade, LeakGrade::A);
        assert!(reports.iter().all(|r| r.executed("applyFilters") == Some(1)));
    }

    #[test]
    fn grades_degrade_with_documented_mismatches() {
        assert_eq!(grade_for(0, 0), LeakGrade::A);
        assert_eq!(grade_for(0, 3), LeakGrade::B);
        assert_eq!(grade_for(2, 0), LeakGrade::C);
        assert_eq!(grade_for(3, 1), LeakGrade::D);
    }
}
