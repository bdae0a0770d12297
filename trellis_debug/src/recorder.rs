// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as little-endian records. Names are stored length-prefixed.
//! [`decode`] reads them back as an iterator of [`RecordedEvent`].

use std::borrow::Cow;

use trellis_core::interaction::{ViewId, VisualState};
use trellis_core::key::SimId;
use trellis_core::node::{CommitReport, NodeId};
use trellis_core::surface::SurfaceHandle;
use trellis_core::tick::TickOrigin;
use trellis_core::time::HostTime;
use trellis_core::trace::{
    AdapterMissEvent, CommitSummary, InteractionEvent, PhaseBeginEvent, PhaseEndEvent, PhaseKind,
    ReconcileSummary, RemovalEvent, TickEvent, TraceSink, TransitionEvent, TransitionEventKind,
};
use trellis_core::transition::Phase;

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_TICK: u8 = 1;
const TAG_PHASE_BEGIN: u8 = 2;
const TAG_PHASE_END: u8 = 3;
const TAG_RECONCILE: u8 = 4;
const TAG_TRANSITION: u8 = 5;
const TAG_REMOVAL: u8 = 6;
const TAG_ADAPTER_MISS: u8 = 7;
const TAG_INTERACTION: u8 = 8;
const TAG_COMMIT: u8 = 9;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_count(&mut self, v: usize) {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "counts capped at u32::MAX for recording"
        )]
        self.write_u32(v.min(u32::MAX as usize) as u32);
    }

    fn write_str(&mut self, s: &str) {
        self.write_count(s.len());
        self.buf.extend_from_slice(s.as_bytes());
    }

    fn write_node(&mut self, id: NodeId) {
        self.write_u32(id.index());
        self.write_u32(id.generation());
    }

    fn write_option_u64(&mut self, v: Option<u64>) {
        match v {
            Some(val) => {
                self.write_u8(1);
                self.write_u64(val);
            }
            None => {
                self.write_u8(0);
                self.write_u64(0);
            }
        }
    }

    fn write_phase_kind(&mut self, p: PhaseKind) {
        self.write_u8(match p {
            PhaseKind::Reconcile => 0,
            PhaseKind::Advance => 1,
            PhaseKind::Physics => 2,
            PhaseKind::Commit => 3,
        });
    }

    fn write_phase(&mut self, p: Phase) {
        self.write_u8(match p {
            Phase::Enter => 0,
            Phase::Update => 1,
            Phase::Exit => 2,
        });
    }

    fn write_state(&mut self, s: VisualState) {
        self.write_u8(match s {
            VisualState::Neutral => 0,
            VisualState::Primary => 1,
            VisualState::Selected => 2,
            VisualState::Dimmed => 3,
        });
    }
}

impl TraceSink for RecorderSink {
    fn on_tick(&mut self, e: &TickEvent) {
        self.write_u8(TAG_TICK);
        self.write_u64(e.frame_index);
        self.write_u64(e.now.nanos());
        self.write_u8(match e.origin {
            TickOrigin::AnimationFrame => 0,
            TickOrigin::Physics => 1,
            TickOrigin::Manual => 2,
        });
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.write_u8(TAG_PHASE_BEGIN);
        self.write_u64(e.frame_index);
        self.write_phase_kind(e.phase);
        self.write_u64(e.timestamp.nanos());
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.write_u8(TAG_PHASE_END);
        self.write_u64(e.frame_index);
        self.write_phase_kind(e.phase);
        self.write_u64(e.timestamp.nanos());
    }

    fn on_reconcile(&mut self, s: &ReconcileSummary) {
        self.write_u8(TAG_RECONCILE);
        self.write_u32(s.view.0);
        self.write_u64(s.at.nanos());
        self.write_count(s.entered);
        self.write_count(s.updated);
        self.write_count(s.exited);
        self.write_count(s.attribute_changes);
    }

    fn on_transition(&mut self, e: &TransitionEvent) {
        self.write_u8(TAG_TRANSITION);
        self.write_node(e.node);
        self.write_str(&e.attr);
        self.write_u8(match e.kind {
            TransitionEventKind::Started => 0,
            TransitionEventKind::Superseded => 1,
            TransitionEventKind::Completed => 2,
        });
        self.write_phase(e.phase);
        self.write_u64(e.at.nanos());
    }

    fn on_removal(&mut self, e: &RemovalEvent) {
        self.write_u8(TAG_REMOVAL);
        self.write_node(e.node);
        self.write_option_u64(e.handle.map(|h| h.0));
        self.write_u64(e.at.nanos());
    }

    fn on_adapter_miss(&mut self, e: &AdapterMissEvent) {
        self.write_u8(TAG_ADAPTER_MISS);
        self.write_node(e.node);
        self.write_str(e.sim_id.as_str());
        self.write_u64(e.at.nanos());
    }

    fn on_interaction(&mut self, e: &InteractionEvent) {
        self.write_u8(TAG_INTERACTION);
        self.write_u32(e.view.0);
        self.write_u64(e.handle.0);
        self.write_state(e.state);
        self.write_count(e.attributes);
    }

    fn on_commit(&mut self, s: &CommitSummary) {
        self.write_u8(TAG_COMMIT);
        self.write_u64(s.frame_index);
        self.write_u32(s.view.0);
        self.write_count(s.report.created);
        self.write_count(s.report.attributes_set);
        self.write_count(s.report.appended);
        self.write_count(s.report.removed);
        self.write_count(s.freed);
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// A [`TickEvent`].
    Tick(TickEvent),
    /// A [`PhaseBeginEvent`].
    PhaseBegin(PhaseBeginEvent),
    /// A [`PhaseEndEvent`].
    PhaseEnd(PhaseEndEvent),
    /// A [`ReconcileSummary`].
    Reconcile(ReconcileSummary),
    /// A [`TransitionEvent`].
    Transition(TransitionEvent),
    /// A [`RemovalEvent`].
    Removal(RemovalEvent),
    /// An [`AdapterMissEvent`].
    AdapterMiss(AdapterMissEvent),
    /// An [`InteractionEvent`].
    Interaction(InteractionEvent),
    /// A [`CommitSummary`].
    Commit(CommitSummary),
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
///
/// Stops at the first unknown tag or truncated record.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn take(&mut self, n: usize) -> Option<&[u8]> {
        let end = self.pos.checked_add(n)?;
        let bytes = self.data.get(self.pos..end)?;
        self.pos = end;
        Some(bytes)
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.take(1).map(|b| b[0])
    }

    fn read_u32(&mut self) -> Option<u32> {
        Some(u32::from_le_bytes(self.take(4)?.try_into().ok()?))
    }

    fn read_u64(&mut self) -> Option<u64> {
        Some(u64::from_le_bytes(self.take(8)?.try_into().ok()?))
    }

    fn read_count(&mut self) -> Option<usize> {
        self.read_u32().map(|v| v as usize)
    }

    fn read_string(&mut self) -> Option<String> {
        let len = self.read_count()?;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).ok()
    }

    fn read_time(&mut self) -> Option<HostTime> {
        self.read_u64().map(HostTime)
    }

    fn read_node(&mut self) -> Option<NodeId> {
        let index = self.read_u32()?;
        let generation = self.read_u32()?;
        Some(NodeId::from_raw(index, generation))
    }

    fn read_option_u64(&mut self) -> Option<Option<u64>> {
        let present = self.read_u8()?;
        let val = self.read_u64()?;
        Some(if present != 0 { Some(val) } else { None })
    }

    fn read_phase_kind(&mut self) -> Option<PhaseKind> {
        Some(match self.read_u8()? {
            0 => PhaseKind::Reconcile,
            1 => PhaseKind::Advance,
            2 => PhaseKind::Physics,
            _ => PhaseKind::Commit,
        })
    }

    fn read_phase(&mut self) -> Option<Phase> {
        Some(match self.read_u8()? {
            0 => Phase::Enter,
            1 => Phase::Update,
            _ => Phase::Exit,
        })
    }

    fn read_state(&mut self) -> Option<VisualState> {
        Some(match self.read_u8()? {
            0 => VisualState::Neutral,
            1 => VisualState::Primary,
            2 => VisualState::Selected,
            _ => VisualState::Dimmed,
        })
    }

    fn decode_tick(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Tick(TickEvent {
            frame_index: self.read_u64()?,
            now: self.read_time()?,
            origin: match self.read_u8()? {
                0 => TickOrigin::AnimationFrame,
                1 => TickOrigin::Physics,
                _ => TickOrigin::Manual,
            },
        }))
    }

    fn decode_phase_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseBegin(PhaseBeginEvent {
            frame_index: self.read_u64()?,
            phase: self.read_phase_kind()?,
            timestamp: self.read_time()?,
        }))
    }

    fn decode_phase_end(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseEnd(PhaseEndEvent {
            frame_index: self.read_u64()?,
            phase: self.read_phase_kind()?,
            timestamp: self.read_time()?,
        }))
    }

    fn decode_reconcile(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Reconcile(ReconcileSummary {
            view: ViewId(self.read_u32()?),
            at: self.read_time()?,
            entered: self.read_count()?,
            updated: self.read_count()?,
            exited: self.read_count()?,
            attribute_changes: self.read_count()?,
        }))
    }

    fn decode_transition(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Transition(TransitionEvent {
            node: self.read_node()?,
            attr: Cow::Owned(self.read_string()?),
            kind: match self.read_u8()? {
                0 => TransitionEventKind::Started,
                1 => TransitionEventKind::Superseded,
                _ => TransitionEventKind::Completed,
            },
            phase: self.read_phase()?,
            at: self.read_time()?,
        }))
    }

    fn decode_removal(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Removal(RemovalEvent {
            node: self.read_node()?,
            handle: self.read_option_u64()?.map(SurfaceHandle),
            at: self.read_time()?,
        }))
    }

    fn decode_adapter_miss(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::AdapterMiss(AdapterMissEvent {
            node: self.read_node()?,
            sim_id: SimId::new(self.read_string()?),
            at: self.read_time()?,
        }))
    }

    fn decode_interaction(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Interaction(InteractionEvent {
            view: ViewId(self.read_u32()?),
            handle: SurfaceHandle(self.read_u64()?),
            state: self.read_state()?,
            attributes: self.read_count()?,
        }))
    }

    fn decode_commit(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Commit(CommitSummary {
            frame_index: self.read_u64()?,
            view: ViewId(self.read_u32()?),
            report: CommitReport {
                created: self.read_count()?,
                attributes_set: self.read_count()?,
                appended: self.read_count()?,
                removed: self.read_count()?,
            },
            freed: self.read_count()?,
        }))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        match tag {
            TAG_TICK => self.decode_tick(),
            TAG_PHASE_BEGIN => self.decode_phase_begin(),
            TAG_PHASE_END => self.decode_phase_end(),
            TAG_RECONCILE => self.decode_reconcile(),
            TAG_TRANSITION => self.decode_transition(),
            TAG_REMOVAL => self.decode_removal(),
            TAG_ADAPTER_MISS => self.decode_adapter_miss(),
            TAG_INTERACTION => self.decode_interaction(),
            TAG_COMMIT => self.decode_commit(),
            _ => None, // unknown tag → stop iteration
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::engine::{Engine, EngineConfig};
    use trellis_core::surface::MemorySurface;
    use trellis_core::tick::FrameTick;
    use trellis_core::trace::Tracer;
    use trellis_core::transition::Timing;
    use trellis_core::tree::{Attr, Elem, Phases, Repeat};
    use trellis_core::value::Value;

    fn dots(keys: &[&'static str]) -> trellis_core::tree::Tree {
        let phases = Phases::new()
            .exit_to("r", 0.0)
            .unwrap()
            .exit(Timing::millis(100));
        let dots = Repeat::new(keys.to_vec(), |k| *k, |_, _| {
            Elem::new("circle").attr(Attr::fixed("r", 4.0)).into()
        })
        .unwrap()
        .with_phases(phases);
        Elem::new("svg").child(dots).into()
    }

    #[test]
    fn records_an_engine_session() {
        let mut surface = MemorySurface::new();
        let mut engine = Engine::new(EngineConfig::animation_frame(), surface.root());
        let mut rec = RecorderSink::new();
        {
            let mut tracer = Tracer::new(&mut rec);
            let at = HostTime::from_millis;
            engine.render(&dots(&["a", "b"]), at(0), &mut tracer);
            engine.commit(&mut surface, &mut tracer);
            engine.render(&dots(&["a"]), at(10), &mut tracer);
            engine.frame(&FrameTick::manual(at(200), 1), &mut surface, &mut tracer);
        }

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        let reconciles: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                RecordedEvent::Reconcile(s) => Some((s.entered, s.exited)),
                _ => None,
            })
            .collect();
        assert_eq!(reconciles, [(3, 0), (0, 1)]);

        let exit = events.iter().find_map(|e| match e {
            RecordedEvent::Transition(t) if t.kind == TransitionEventKind::Completed => Some(t),
            _ => None,
        });
        let exit = exit.expect("exit transition completes");
        assert_eq!(exit.attr, "r");
        assert_eq!(exit.phase, Phase::Exit);
        assert_eq!(exit.at, HostTime::from_millis(200));

        let removal = events.iter().find_map(|e| match e {
            RecordedEvent::Removal(r) => Some(r),
            _ => None,
        });
        assert_eq!(removal.map(|r| r.node), Some(exit.node));

        match events.last() {
            Some(RecordedEvent::Commit(s)) => {
                assert_eq!(s.frame_index, 1);
                assert_eq!(s.report.removed, 1);
                assert_eq!(s.freed, 1);
            }
            other => panic!("expected Commit, got {other:?}"),
        }
        let phases = events
            .iter()
            .filter(|e| matches!(e, RecordedEvent::PhaseBegin(_)))
            .count();
        let ends = events
            .iter()
            .filter(|e| matches!(e, RecordedEvent::PhaseEnd(_)))
            .count();
        assert_eq!(phases, ends);
        assert_eq!(surface.number(surface.children(surface.root())[0], "r"), None);
        assert_eq!(
            surface.attr(surface.children(surface.children(surface.root())[0])[0], "r"),
            Some(&Value::Number(4.0))
        );
    }

    #[test]
    fn names_survive_recording() {
        let mut rec = RecorderSink::new();
        rec.on_adapter_miss(&AdapterMissEvent {
            node: NodeId::from_raw(3, 1),
            sim_id: SimId::from("hub"),
            at: HostTime(5_000),
        });
        rec.on_removal(&RemovalEvent {
            node: NodeId::from_raw(4, 0),
            handle: None,
            at: HostTime(6_000),
        });

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(events.len(), 2);
        match &events[0] {
            RecordedEvent::AdapterMiss(e) => {
                assert_eq!(e.node, NodeId::from_raw(3, 1));
                assert_eq!(e.sim_id.as_str(), "hub");
                assert_eq!(e.at, HostTime(5_000));
            }
            other => panic!("expected AdapterMiss, got {other:?}"),
        }
        match &events[1] {
            RecordedEvent::Removal(e) => assert_eq!(e.handle, None),
            other => panic!("expected Removal, got {other:?}"),
        }
    }

    #[test]
    fn truncated_record_stops_decoding() {
        let mut rec = RecorderSink::new();
        rec.on_interaction(&InteractionEvent {
            view: ViewId(1),
            handle: SurfaceHandle(9),
            state: VisualState::Selected,
            attributes: 2,
        });
        rec.on_interaction(&InteractionEvent {
            view: ViewId(1),
            handle: SurfaceHandle(10),
            state: VisualState::Dimmed,
            attributes: 2,
        });
        let bytes = rec.into_bytes();
        let events: Vec<_> = decode(&bytes[..bytes.len() - 1]).collect();
        assert_eq!(events.len(), 1);
        match &events[0] {
            RecordedEvent::Interaction(e) => assert_eq!(e.state, VisualState::Selected),
            other => panic!("expected Interaction, got {other:?}"),
        }
    }

    #[test]
    fn empty_buffer_decodes_to_nothing() {
        let events: Vec<_> = decode(&[]).collect();
        assert!(events.is_empty());
    }
}
