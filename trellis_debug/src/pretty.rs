// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Timestamps
//! are printed in milliseconds.

use std::io::Write;

use trellis_core::time::HostTime;
use trellis_core::trace::{
    AdapterMissEvent, CommitSummary, InteractionEvent, PhaseBeginEvent, PhaseEndEvent, PhaseKind,
    ReconcileSummary, RemovalEvent, TickEvent, TraceSink, TransitionEvent, TransitionEventKind,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    transitions: bool,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("transitions", &self.transitions)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self::with_writer(writer)
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self {
            writer,
            transitions: true,
        }
    }

    /// Returns a sink that skips per-attribute transition lines.
    #[must_use]
    pub fn without_transitions(mut self) -> Self {
        self.transitions = false;
        self
    }

    /// Consumes the sink and returns its writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn ms(t: HostTime) -> f64 {
    t.as_millis_f64()
}

fn phase_name(phase: PhaseKind) -> &'static str {
    match phase {
        PhaseKind::Reconcile => "reconcile",
        PhaseKind::Advance => "advance",
        PhaseKind::Physics => "physics",
        PhaseKind::Commit => "commit",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_tick(&mut self, e: &TickEvent) {
        let _ = writeln!(
            self.writer,
            "[tick] frame={} now={:.1}ms origin={:?}",
            e.frame_index,
            ms(e.now),
            e.origin,
        );
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:begin] frame={} {} at {:.1}ms",
            e.frame_index,
            phase_name(e.phase),
            ms(e.timestamp),
        );
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:end] frame={} {} at {:.1}ms",
            e.frame_index,
            phase_name(e.phase),
            ms(e.timestamp),
        );
    }

    fn on_reconcile(&mut self, s: &ReconcileSummary) {
        let _ = writeln!(
            self.writer,
            "[reconcile] view={} enter={} update={} exit={} attrs={} at {:.1}ms",
            s.view.0,
            s.entered,
            s.updated,
            s.exited,
            s.attribute_changes,
            ms(s.at),
        );
    }

    fn on_transition(&mut self, e: &TransitionEvent) {
        if !self.transitions {
            return;
        }
        let kind = match e.kind {
            TransitionEventKind::Started => "start",
            TransitionEventKind::Superseded => "supersede",
            TransitionEventKind::Completed => "done",
        };
        let _ = writeln!(
            self.writer,
            "[transition:{kind}] {:?}.{} {:?} at {:.1}ms",
            e.node,
            e.attr,
            e.phase,
            ms(e.at),
        );
    }

    fn on_removal(&mut self, e: &RemovalEvent) {
        let handle = e.handle.map_or(-1, |h| i128::from(h.0));
        let _ = writeln!(
            self.writer,
            "[remove] {:?} handle={handle} at {:.1}ms",
            e.node,
            ms(e.at),
        );
    }

    fn on_adapter_miss(&mut self, e: &AdapterMissEvent) {
        let _ = writeln!(
            self.writer,
            "[physics:miss] {:?} sim={} at {:.1}ms",
            e.node,
            e.sim_id.as_str(),
            ms(e.at),
        );
    }

    fn on_interaction(&mut self, e: &InteractionEvent) {
        let _ = writeln!(
            self.writer,
            "[interaction] view={} handle={} state={:?} attrs={}",
            e.view.0, e.handle.0, e.state, e.attributes,
        );
    }

    fn on_commit(&mut self, s: &CommitSummary) {
        let r = &s.report;
        let _ = writeln!(
            self.writer,
            "[commit] frame={} view={} create={} set={} append={} remove={} freed={}",
            s.frame_index,
            s.view.0,
            r.created,
            r.attributes_set,
            r.appended,
            r.removed,
            s.freed,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::interaction::ViewId;
    use trellis_core::node::{CommitReport, NodeId};
    use trellis_core::tick::TickOrigin;
    use trellis_core::transition::Phase;

    #[test]
    fn pretty_print_tick() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_tick(&TickEvent {
            frame_index: 1,
            now: HostTime::from_millis(16),
            origin: TickOrigin::AnimationFrame,
        });
        let output = String::from_utf8(sink.writer).unwrap();
        assert!(output.contains("[tick]"), "got: {output}");
        assert!(output.contains("frame=1"), "got: {output}");
        assert!(output.contains("now=16.0ms"), "got: {output}");
    }

    #[test]
    fn transition_lines_can_be_skipped() {
        let event = TransitionEvent {
            node: NodeId::from_raw(2, 0),
            attr: "opacity".into(),
            kind: TransitionEventKind::Started,
            phase: Phase::Enter,
            at: HostTime::ZERO,
        };
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_transition(&event);
        let output = String::from_utf8(sink.into_inner()).unwrap();
        assert!(output.contains("[transition:start]"), "got: {output}");
        assert!(output.contains(".opacity Enter"), "got: {output}");

        let mut quiet = PrettyPrintSink::with_writer(Vec::<u8>::new()).without_transitions();
        quiet.on_transition(&event);
        quiet.on_commit(&CommitSummary {
            frame_index: 4,
            view: ViewId(0),
            report: CommitReport {
                created: 1,
                ..CommitReport::default()
            },
            freed: 0,
        });
        let output = String::from_utf8(quiet.into_inner()).unwrap();
        assert_eq!(output.lines().count(), 1, "got: {output}");
        assert!(output.starts_with("[commit] frame=4"), "got: {output}");
    }
}
