// Copyright 2026 the Weakself Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Every line
//! starts with the simulated step (`t3`).

use std::io::Write;

use weakself_core::trace::{
    ActionCancelledEvent, ActionDisposedEvent, ActionExecutedEvent, ActionScheduledEvent,
    CollectEvent, ControllerDestroyedEvent, ControllerRegisteredEvent, EdgeEvent, EdgeKind,
    OwnerReleasedEvent, ScenarioSummary, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink and returns the destination.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn edge_arrow(kind: EdgeKind) -> &'static str {
    match kind {
        EdgeKind::Strong => "==strong==>",
        EdgeKind::Weak => "--weak-->",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_controller_registered(&mut self, e: &ControllerRegisteredEvent) {
        let _ = writeln!(
            self.writer,
            "[register] {} {} {:?}",
            e.at, e.label, e.controller,
        );
    }

    fn on_owner_released(&mut self, e: &OwnerReleasedEvent) {
        let note = if e.changed { "" } else { " (already released)" };
        let _ = writeln!(
            self.writer,
            "[dismiss] {} {:?} strong={}{note}",
            e.at, e.controller, e.strong_count,
        );
    }

    fn on_action_scheduled(&mut self, e: &ActionScheduledEvent) {
        let retained = if e.retained { " retained" } else { "" };
        let _ = writeln!(
            self.writer,
            "[schedule] {} {} capture={} trigger={} drive={}{retained}",
            e.at,
            e.label,
            e.capture,
            e.trigger,
            e.drive.as_str(),
        );
    }

    fn on_action_executed(&mut self, e: &ActionExecutedEvent) {
        let effect = if e.effective { "effect" } else { "no target" };
        let _ = writeln!(
            self.writer,
            "[execute] {} {} #{} {effect}",
            e.at, e.label, e.count,
        );
    }

    fn on_action_cancelled(&mut self, e: &ActionCancelledEvent) {
        let _ = writeln!(self.writer, "[cancel] {} {}", e.at, e.label);
    }

    fn on_action_disposed(&mut self, e: &ActionDisposedEvent) {
        let what = if e.freed { "freed" } else { "kept by field" };
        let _ = writeln!(self.writer, "[dispose] {} {} {what}", e.at, e.label);
    }

    fn on_collect(&mut self, e: &CollectEvent) {
        let _ = writeln!(
            self.writer,
            "[collect] {} released={} swept={} freed_actions={}",
            e.at, e.released, e.swept, e.freed_actions,
        );
    }

    fn on_controller_destroyed(&mut self, e: &ControllerDestroyedEvent) {
        let _ = writeln!(
            self.writer,
            "[destroy] {} {} {:?} {}",
            e.at,
            e.label,
            e.controller,
            e.fate.as_str(),
        );
    }

    fn on_scenario_summary(&mut self, s: &ScenarioSummary) {
        let outcome = s.outcome.as_str().to_uppercase();
        let dismissal = if s.alive_at_dismissal { "yes" } else { "no" };
        let _ = writeln!(
            self.writer,
            "[summary] {} {} {outcome} fate={} alive_at_dismissal={dismissal} effects={}",
            s.at,
            s.scenario,
            s.fate.as_str(),
            s.effects,
        );
    }

    fn on_edge_added(&mut self, e: &EdgeEvent) {
        let _ = writeln!(
            self.writer,
            "[edge+] {} {:?} {} {:?}",
            e.at,
            e.action,
            edge_arrow(e.kind),
            e.controller,
        );
    }

    fn on_edge_removed(&mut self, e: &EdgeEvent) {
        let _ = writeln!(
            self.writer,
            "[edge-] {} {:?} {} {:?}",
            e.at,
            e.action,
            edge_arrow(e.kind),
            e.controller,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weakself_core::registry::ControllerId;
    use weakself_core::runner::ScenarioRunner;
    use weakself_core::scenario::Scenario;
    use weakself_core::step::Step;
    use weakself_core::trace::Tracer;

    #[test]
    fn pretty_print_registration() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_controller_registered(&ControllerRegisteredEvent {
            at: Step(0),
            controller: ControllerId::from_parts(0, 0),
            label: "PresentedController",
        });
        let output = String::from_utf8(sink.writer).unwrap();
        assert!(output.contains("[register]"), "got: {output}");
        assert!(output.contains("t0 PresentedController"), "got: {output}");
    }

    #[test]
    fn pretty_print_whole_scenario() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        ScenarioRunner::default()
            .run(Scenario::LeakyButton, &mut Tracer::new(&mut sink))
            .unwrap();
        let output = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<_> = output.lines().collect();
        assert!(lines[0].starts_with("[register]"), "got: {output}");
        assert!(
            output.contains("[edge+] t0 ActionId(0@gen0) ==strong==>"),
            "got: {output}"
        );
        assert!(output.contains("[destroy] t0 PresentedController"), "got: {output}");
        assert!(
            lines.last().unwrap().contains("leakyButton LEAKED fate=swept"),
            "got: {output}"
        );
    }
}
