// Copyright 2026 the Weakself Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][spec] JSON to the given writer.
//!
//! Each simulated step is drawn as one millisecond. Controller lifetimes are
//! duration spans on thread 0, closure events are instants on thread 1, and
//! collections are instants on thread 2.
//!
//! A recording may hold several runs back to back, each ending with its
//! scenario summary. Every run gets its own process (`pid` = run index, named
//! after the scenario) and starts one step after the previous run ended, so
//! timestamps never go backwards. A controller still alive at the summary has
//! its span closed there with fate `alive`.
//!
//! [spec]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use weakself_core::registry::ControllerId;
use weakself_core::step::Step;
use weakself_core::trace::{EdgeEvent, EdgeKind};

use crate::recorder::{RecordedEvent, decode};

const TID_CONTROLLERS: u32 = 0;
const TID_ACTIONS: u32 = 1;
const TID_COLLECTOR: u32 = 2;

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();
    // Step at which the current run starts on the exported timeline.
    let mut base: u64 = 0;
    let mut run: u32 = 0;
    let mut open: Vec<(ControllerId, String)> = Vec::new();

    for recorded in decode(bytes) {
        let ts = step_to_us(base, recorded.at());
        let pid = run;
        match recorded {
            RecordedEvent::ControllerRegistered {
                controller, label, ..
            } => {
                events.push(json!({
                    "ph": "B",
                    "name": label,
                    "cat": "Controller",
                    "ts": ts,
                    "pid": pid,
                    "tid": TID_CONTROLLERS,
                    "args": {
                        "controller": format!("{controller:?}"),
                    }
                }));
                open.push((controller, label));
            }
            RecordedEvent::OwnerReleased(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Dismiss",
                    "cat": "Controller",
                    "ts": ts,
                    "pid": pid,
                    "tid": TID_CONTROLLERS,
                    "s": "t",
                    "args": {
                        "changed": e.changed,
                        "strong_count": e.strong_count,
                    }
                }));
            }
            RecordedEvent::ControllerDestroyed {
                controller,
                label,
                fate,
                ..
            } => {
                open.retain(|(id, _)| *id != controller);
                events.push(json!({
                    "ph": "E",
                    "name": label,
                    "cat": "Controller",
                    "ts": ts,
                    "pid": pid,
                    "tid": TID_CONTROLLERS,
                    "args": {
                        "controller": format!("{controller:?}"),
                        "fate": fate.as_str(),
                    }
                }));
            }
            RecordedEvent::ActionScheduled {
                action,
                label,
                capture,
                trigger,
                drive,
                retained,
                ..
            } => {
                events.push(json!({
                    "ph": "i",
                    "name": format!("schedule {label}"),
                    "cat": "Action",
                    "ts": ts,
                    "pid": pid,
                    "tid": TID_ACTIONS,
                    "s": "t",
                    "args": {
                        "action": format!("{action:?}"),
                        "capture": capture.as_str(),
                        "trigger": trigger.to_string(),
                        "drive": drive.as_str(),
                        "retained": retained,
                    }
                }));
            }
            RecordedEvent::ActionExecuted {
                action,
                label,
                count,
                effective,
                ..
            } => {
                events.push(json!({
                    "ph": "i",
                    "name": format!("execute {label}"),
                    "cat": "Action",
                    "ts": ts,
                    "pid": pid,
                    "tid": TID_ACTIONS,
                    "s": "t",
                    "args": {
                        "action": format!("{action:?}"),
                        "count": count,
                        "effective": effective,
                    }
                }));
            }
            RecordedEvent::ActionCancelled { action, label, .. } => {
                events.push(json!({
                    "ph": "i",
                    "name": format!("cancel {label}"),
                    "cat": "Action",
                    "ts": ts,
                    "pid": pid,
                    "tid": TID_ACTIONS,
                    "s": "t",
                    "args": {
                        "action": format!("{action:?}"),
                    }
                }));
            }
            RecordedEvent::ActionDisposed {
                action,
                label,
                freed,
                ..
            } => {
                events.push(json!({
                    "ph": "i",
                    "name": format!("dispose {label}"),
                    "cat": "Action",
                    "ts": ts,
                    "pid": pid,
                    "tid": TID_ACTIONS,
                    "s": "t",
                    "args": {
                        "action": format!("{action:?}"),
                        "freed": freed,
                    }
                }));
            }
            RecordedEvent::Collect(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Collect",
                    "cat": "Collector",
                    "ts": ts,
                    "pid": pid,
                    "tid": TID_COLLECTOR,
                    "s": "t",
                    "args": {
                        "released": e.released,
                        "swept": e.swept,
                        "freed_actions": e.freed_actions,
                    }
                }));
            }
            RecordedEvent::ScenarioSummary(s) => {
                events.push(json!({
                    "ph": "M",
                    "name": "process_name",
                    "ts": ts,
                    "pid": pid,
                    "args": {
                        "name": s.scenario.as_str(),
                    }
                }));
                for (controller, label) in open.drain(..) {
                    events.push(json!({
                        "ph": "E",
                        "name": label,
                        "cat": "Controller",
                        "ts": ts,
                        "pid": pid,
                        "tid": TID_CONTROLLERS,
                        "args": {
                            "controller": format!("{controller:?}"),
                            "fate": "alive",
                        }
                    }));
                }
                events.push(json!({
                    "ph": "i",
                    "name": "ScenarioSummary",
                    "cat": "Summary",
                    "ts": ts,
                    "pid": pid,
                    "tid": TID_CONTROLLERS,
                    "s": "g",
                    "args": {
                        "scenario": s.scenario.as_str(),
                        "outcome": s.outcome.as_str(),
                        "fate": s.fate.as_str(),
                        "alive_at_dismissal": s.alive_at_dismissal,
                        "effects": s.effects,
                    }
                }));
                base = base.saturating_add(s.at.index()).saturating_add(1);
                run = run.saturating_add(1);
            }
            RecordedEvent::EdgeAdded(e) => events.push(edge("EdgeAdded", &e, ts, pid)),
            RecordedEvent::EdgeRemoved(e) => events.push(edge("EdgeRemoved", &e, ts, pid)),
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn edge(name: &str, e: &EdgeEvent, ts: u64, pid: u32) -> Value {
    json!({
        "ph": "i",
        "name": name,
        "cat": "Rich",
        "ts": ts,
        "pid": pid,
        "tid": TID_ACTIONS,
        "s": "t",
        "args": {
            "action": format!("{:?}", e.action),
            "controller": format!("{:?}", e.controller),
            "kind": match e.kind {
                EdgeKind::Strong => "strong",
                EdgeKind::Weak => "weak",
            },
        }
    })
}

fn step_to_us(base: u64, at: Step) -> u64 {
    base.saturating_add(at.index()).saturating_mul(1000)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::RecorderSink;
    use std::collections::BTreeMap;
    use weakself_core::runner::ScenarioRunner;
    use weakself_core::scenario::Scenario;
    use weakself_core::trace::{ControllerRegisteredEvent, TraceSink, Tracer};

    fn export_runs(scenarios: &[Scenario]) -> Vec<Value> {
        let mut rec = RecorderSink::new();
        let runner = ScenarioRunner::default();
        for &scenario in scenarios {
            runner.run(scenario, &mut Tracer::new(&mut rec)).unwrap();
        }
        let mut out = Vec::new();
        export(rec.as_bytes(), &mut out).unwrap();
        serde_json::from_slice(&out).unwrap()
    }

    #[test]
    fn registration_opens_a_span() {
        let mut rec = RecorderSink::new();
        rec.on_controller_registered(&ControllerRegisteredEvent {
            at: Step(3),
            controller: ControllerId::from_parts(0, 0),
            label: "PresentedController",
        });
        let mut out = Vec::new();
        export(rec.as_bytes(), &mut out).unwrap();
        let parsed: Vec<Value> = serde_json::from_slice(&out).unwrap();

        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0]["ph"], "B");
        assert_eq!(parsed[0]["name"], "PresentedController");
        assert_eq!(parsed[0]["ts"], 3000);
    }

    #[test]
    fn collected_controller_span_is_closed() {
        let parsed = export_runs(&[Scenario::NonLeakyButton]);
        let begins = parsed.iter().filter(|e| e["ph"] == "B").count();
        let ends: Vec<_> = parsed.iter().filter(|e| e["ph"] == "E").collect();
        assert_eq!(begins, 1);
        assert_eq!(ends.len(), 1);
        assert_eq!(ends[0]["args"]["fate"], "released");
        assert_eq!(ends[0]["ts"], 0);
    }

    #[test]
    fn leaked_controller_span_closes_at_the_summary() {
        let parsed = export_runs(&[Scenario::LeakyTimer]);
        let ends: Vec<_> = parsed.iter().filter(|e| e["ph"] == "E").collect();
        assert_eq!(ends.len(), 1);
        assert_eq!(ends[0]["args"]["fate"], "alive");
        assert_eq!(ends[0]["ts"], 8000);

        let summary = parsed.last().unwrap();
        assert_eq!(summary["name"], "ScenarioSummary");
        assert_eq!(summary["s"], "g");
        assert_eq!(summary["args"]["scenario"], "leakyTimer");
        assert_eq!(summary["args"]["outcome"], "leaked");
        assert_eq!(summary["ts"], 8000);
    }

    #[test]
    fn whole_suite_gets_one_process_per_run() {
        let parsed = export_runs(&Scenario::ALL);

        let ts: Vec<u64> = parsed.iter().map(|e| e["ts"].as_u64().unwrap()).collect();
        assert!(ts.windows(2).all(|w| w[0] <= w[1]), "timestamps go backwards");

        let mut spans: BTreeMap<u64, (u32, u32)> = BTreeMap::new();
        for e in &parsed {
            let pid = e["pid"].as_u64().unwrap();
            let entry = spans.entry(pid).or_default();
            if e["ph"] == "B" {
                entry.0 += 1;
            } else if e["ph"] == "E" {
                entry.1 += 1;
            }
        }
        assert_eq!(spans.len(), Scenario::ALL.len());
        assert!(spans.values().all(|&pair| pair == (1, 1)), "{spans:?}");

        let names: Vec<_> = parsed
            .iter()
            .filter(|e| e["ph"] == "M")
            .map(|e| e["args"]["name"].as_str().unwrap())
            .collect();
        let expected: Vec<_> = Scenario::ALL.iter().map(|s| s.as_str()).collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn second_run_starts_after_the_first() {
        let parsed = export_runs(&[Scenario::LeakyTimer, Scenario::UiViewAnimate]);
        let second = parsed
            .iter()
            .find(|e| e["ph"] == "B" && e["pid"] == 1)
            .unwrap();
        assert_eq!(second["ts"], 9000);
    }

    #[test]
    fn edges_land_on_the_action_thread() {
        let parsed = export_runs(&[Scenario::LeakyButton]);
        let edge = parsed
            .iter()
            .find(|e| e["name"] == "EdgeAdded")
            .unwrap();
        assert_eq!(edge["cat"], "Rich");
        assert_eq!(edge["tid"], TID_ACTIONS);
        assert_eq!(edge["args"]["kind"], "strong");
    }

    #[test]
    fn export_empty_recording() {
        let mut out = Vec::new();
        export(&[], &mut out).unwrap();
        let parsed: Vec<Value> = serde_json::from_slice(&out).unwrap();
        assert!(parsed.is_empty());
    }
}
