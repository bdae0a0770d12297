// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][spec] JSON to the given writer.
//!
//! Each view gets its own process row; transitions are grouped by node.
//!
//! [spec]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use trellis_core::time::HostTime;

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();

    for recorded in decode(bytes) {
        match recorded {
            RecordedEvent::Tick(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Tick",
                    "cat": "Frame",
                    "ts": us(e.now),
                    "pid": 0,
                    "tid": 0,
                    "s": "g",
                    "args": {
                        "frame_index": e.frame_index,
                        "origin": format!("{:?}", e.origin),
                    }
                }));
            }
            RecordedEvent::PhaseBegin(e) => {
                events.push(json!({
                    "ph": "B",
                    "name": format!("{:?}", e.phase),
                    "cat": "Frame",
                    "ts": us(e.timestamp),
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "frame_index": e.frame_index,
                    }
                }));
            }
            RecordedEvent::PhaseEnd(e) => {
                events.push(json!({
                    "ph": "E",
                    "name": format!("{:?}", e.phase),
                    "cat": "Frame",
                    "ts": us(e.timestamp),
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "frame_index": e.frame_index,
                    }
                }));
            }
            RecordedEvent::Reconcile(s) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Reconcile",
                    "cat": "Tree",
                    "ts": us(s.at),
                    "pid": s.view.0,
                    "tid": 0,
                    "s": "p",
                    "args": {
                        "entered": s.entered,
                        "updated": s.updated,
                        "exited": s.exited,
                        "attribute_changes": s.attribute_changes,
                    }
                }));
            }
            RecordedEvent::Transition(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": format!("{:?} {}", e.kind, e.attr),
                    "cat": "Transition",
                    "ts": us(e.at),
                    "pid": 0,
                    "tid": e.node.index(),
                    "s": "t",
                    "args": {
                        "phase": format!("{:?}", e.phase),
                        "generation": e.node.generation(),
                    }
                }));
            }
            RecordedEvent::Removal(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Remove",
                    "cat": "Tree",
                    "ts": us(e.at),
                    "pid": 0,
                    "tid": e.node.index(),
                    "s": "t",
                    "args": {
                        "handle": e.handle.map(|h| h.0),
                    }
                }));
            }
            RecordedEvent::AdapterMiss(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "AdapterMiss",
                    "cat": "Physics",
                    "ts": us(e.at),
                    "pid": 0,
                    "tid": e.node.index(),
                    "s": "t",
                    "args": {
                        "sim_id": e.sim_id.as_str(),
                    }
                }));
            }
            RecordedEvent::Interaction(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": format!("{:?}", e.state),
                    "cat": "Interaction",
                    "ts": 0,
                    "pid": e.view.0,
                    "tid": 0,
                    "s": "p",
                    "args": {
                        "handle": e.handle.0,
                        "attributes": e.attributes,
                    }
                }));
            }
            RecordedEvent::Commit(s) => {
                events.push(json!({
                    "ph": "C",
                    "name": "Commit",
                    "cat": "Surface",
                    "ts": 0,
                    "pid": s.view.0,
                    "args": {
                        "created": s.report.created,
                        "attributes_set": s.report.attributes_set,
                        "appended": s.report.appended,
                        "removed": s.report.removed,
                    }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn us(t: HostTime) -> f64 {
    t.nanos() as f64 / 1000.0
}
