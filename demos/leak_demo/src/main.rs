// Copyright 2026 the Weakself Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Command-line front end for the weakself scenarios.
//!
//! ```text
//! leak_demo <scenario>|--all [--settle N | --short-settle] [--images] [--trace PATH]
//! ```
//!
//! Every lifecycle event is printed through a
//! [`PrettyPrintSink`](weakself_debug::pretty::PrettyPrintSink) and recorded
//! by a [`RecorderSink`](weakself_debug::recorder::RecorderSink). With
//! `--trace`, the recording is exported as Chrome trace JSON.

use std::fs::File;
use std::io::BufWriter;
use std::process::ExitCode;

use weakself_core::runner::{RunnerConfig, ScenarioReport, ScenarioRunner};
use weakself_core::scenario::Scenario;
use weakself_core::step::Steps;
use weakself_core::trace::{
    ActionCancelledEvent, ActionDisposedEvent, ActionExecutedEvent, ActionScheduledEvent,
    CollectEvent, ControllerDestroyedEvent, ControllerRegisteredEvent, EdgeEvent,
    OwnerReleasedEvent, ScenarioSummary, TraceSink, Tracer,
};

use weakself_debug::pretty::PrettyPrintSink;
use weakself_debug::recorder::RecorderSink;
use weakself_harness::{SuiteToggles, run_suite};

const USAGE: &str =
    "usage: leak_demo <scenario>|--all [--settle N | --short-settle] [--images] [--trace PATH]";

#[derive(Debug)]
enum Target {
    One(Scenario),
    All,
}

#[derive(Debug)]
struct Args {
    target: Target,
    config: RunnerConfig,
    trace: Option<String>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut target = None;
    let mut toggles = SuiteToggles::default();
    let mut settle = None;
    let mut trace = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--all" => target = Some(Target::All),
            "--images" => toggles.image_generation = true,
            "--short-settle" => toggles.short_settle = true,
            "--settle" => {
                let n = args.next().ok_or("--settle needs a step count")?;
                let n = n
                    .parse::<u64>()
                    .map_err(|e| format!("bad --settle value `{n}`: {e}"))?;
                settle = Some(Steps(n));
            }
            "--trace" => trace = Some(args.next().ok_or("--trace needs a path")?),
            name => {
                let scenario = name.parse::<Scenario>().map_err(|e| e.to_string())?;
                target = Some(Target::One(scenario));
            }
        }
    }

    if toggles.short_settle && settle.is_some() {
        return Err("--settle and --short-settle are exclusive".into());
    }
    let mut config = toggles.config();
    if let Some(steps) = settle {
        config = config.settle(steps);
    }
    Ok(Args {
        target: target.ok_or("no scenario given")?,
        config,
        trace,
    })
}

fn main() -> ExitCode {
    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("{msg}\n{USAGE}");
            eprintln!(
                "scenarios: {}",
                Scenario::ALL.map(Scenario::as_str).join(", ")
            );
            return ExitCode::from(2);
        }
    };

    // -- sinks -------------------------------------------------------------
    let mut pretty = PrettyPrintSink::new(Box::new(std::io::stdout()));
    let mut recorder = RecorderSink::new();
    let mut tee = Tee {
        pretty: &mut pretty,
        recorder: &mut recorder,
    };
    let mut tracer = Tracer::new(&mut tee);

    // -- run ---------------------------------------------------------------
    let all_matched = match args.target {
        Target::One(scenario) => {
            let report = ScenarioRunner::new(args.config)
                .run(scenario, &mut tracer)
                .expect("built-in recipes are valid");
            print_report(&report);
            report.matches_expectation()
        }
        Target::All => {
            let (reports, tracker) =
                run_suite(args.config, &mut tracer).expect("built-in recipes are valid");
            println!();
            for report in &reports {
                print_report(report);
            }
            let summary = tracker.report();
            println!(
                "suite: grade {} leaked={}/{} swept={} mismatched={} (+{} inferred) [{}]",
                summary.grade.as_str(),
                summary.leaked,
                summary.total,
                summary.swept,
                summary.mismatched,
                summary.mismatched_inferred,
                tracker.strip(),
            );
            summary.mismatched == 0 && summary.mismatched_inferred == 0
        }
    };

    // -- export Chrome trace -----------------------------------------------
    if let Some(path) = args.trace {
        let file = File::create(&path).expect("failed to create trace file");
        let mut writer = BufWriter::new(file);
        weakself_debug::chrome::export(recorder.as_bytes(), &mut writer)
            .expect("failed to write Chrome trace");
        println!("Wrote {path}");
    }

    if all_matched {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_report(report: &ScenarioReport) {
    let expected = report.scenario.expected();
    let verdict = if report.matches_expectation() {
        "as expected"
    } else {
        "UNEXPECTED"
    };
    let inferred = if report.scenario.is_inferred() {
        " (inferred)"
    } else {
        ""
    };
    println!(
        "{}{inferred}: {} (expected {expected}, {verdict}) fate={} alive_at_dismissal={}",
        report.scenario,
        report.outcome,
        report.fate.as_str(),
        report.alive_at_dismissal,
    );
    for (label, count) in &report.execution_counts {
        println!("  {label}: executed {count}x");
    }
}

/// Forwards every event to both sinks.
struct Tee<'a> {
    pretty: &'a mut PrettyPrintSink,
    recorder: &'a mut RecorderSink,
}

impl std::fmt::Debug for Tee<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tee").finish_non_exhaustive()
    }
}

impl TraceSink for Tee<'_> {
    fn on_controller_registered(&mut self, e: &ControllerRegisteredEvent) {
        self.pretty.on_controller_registered(e);
        self.recorder.on_controller_registered(e);
    }

    fn on_owner_released(&mut self, e: &OwnerReleasedEvent) {
        self.pretty.on_owner_released(e);
        self.recorder.on_owner_released(e);
    }

    fn on_action_scheduled(&mut self, e: &ActionScheduledEvent) {
        self.pretty.on_action_scheduled(e);
        self.recorder.on_action_scheduled(e);
    }

    fn on_action_executed(&mut self, e: &ActionExecutedEvent) {
        self.pretty.on_action_executed(e);
        self.recorder.on_action_executed(e);
    }

    fn on_action_cancelled(&mut self, e: &ActionCancelledEvent) {
        self.pretty.on_action_cancelled(e);
        self.recorder.on_action_cancelled(e);
    }

    fn on_action_disposed(&mut self, e: &ActionDisposedEvent) {
        self.pretty.on_action_disposed(e);
        self.recorder.on_action_disposed(e);
    }

    fn on_collect(&mut self, e: &CollectEvent) {
        self.pretty.on_collect(e);
        self.recorder.on_collect(e);
    }

    fn on_controller_destroyed(&mut self, e: &ControllerDestroyedEvent) {
        self.pretty.on_controller_destroyed(e);
        self.recorder.on_controller_destroyed(e);
    }

    fn on_scenario_summary(&mut self, s: &ScenarioSummary) {
        self.pretty.on_scenario_summary(s);
        self.recorder.on_scenario_summary(s);
    }

    fn on_edge_added(&mut self, e: &EdgeEvent) {
        self.pretty.on_edge_added(e);
        self.recorder.on_edge_added(e);
    }

    fn on_edge_removed(&mut self, e: &EdgeEvent) {
        self.pretty.on_edge_removed(e);
        self.recorder.on_edge_removed(e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, String> {
        parse_args(args.iter().map(|s| (*s).to_owned()))
    }

    #[test]
    fn parses_a_scenario_with_flags() {
        let args = parse(&["leakyTimer", "--settle", "3", "--images", "--trace", "t.json"]).unwrap();
        assert!(matches!(args.target, Target::One(Scenario::LeakyTimer)));
        assert_eq!(args.config.settle_steps, Steps(3));
        assert!(args.config.image_generation);
        assert_eq!(args.trace.as_deref(), Some("t.json"));
    }

    #[test]
    fn parses_all() {
        let args = parse(&["--all"]).unwrap();
        assert!(matches!(args.target, Target::All));
        assert_eq!(args.config, RunnerConfig::standard());
    }

    #[test]
    fn short_settle_goes_through_the_suite_toggles() {
        let args = parse(&["--all", "--short-settle", "--images"]).unwrap();
        let toggles = SuiteToggles {
            image_generation: true,
            short_settle: true,
        };
        assert_eq!(args.config, toggles.config());
        assert_eq!(args.config.settle_steps, Steps::ONE);
        assert!(parse(&["--all", "--short-settle", "--settle", "4"]).is_err());
    }

    #[test]
    fn rejects_unknown_names_and_missing_values() {
        assert!(parse(&["LeakyButton"]).is_err());
        assert!(parse(&["--settle"]).is_err());
        assert!(parse(&["--settle", "x"]).is_err());
        assert!(parse(&[]).is_err());
    }
}
