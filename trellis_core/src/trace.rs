// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the engine.
//!
//! This module provides a [`TraceSink`] trait with one method per event the
//! engine emits while reconciling, advancing transitions and committing. All
//! method bodies default to no-ops, so implementing only the events you care
//! about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing. When **on**, each
//! method performs a single `Option` branch before dispatching.
//!
//! # Crate features
//!
//! - `trace` enables the `Tracer` method bodies (one branch per call).

use crate::interaction::{ViewId, VisualState};
use crate::key::SimId;
use crate::node::{CommitReport, NodeId};
use crate::surface::SurfaceHandle;
use crate::tick::{FrameTick, TickOrigin};
use crate::time::HostTime;
use crate::transition::Phase;
use crate::tree::AttrName;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which phase of a frame is being measured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    /// Diffing a new tree against the retained nodes.
    Reconcile,
    /// Sampling in-flight transitions.
    Advance,
    /// Applying positions from a physics adapter.
    Physics,
    /// Flushing pending work to the surface.
    Commit,
}

/// What happened to a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransitionEventKind {
    /// A transition started on an idle attribute.
    Started,
    /// A transition replaced an in-flight one.
    Superseded,
    /// A transition reached its target.
    Completed,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when the engine receives a tick.
#[derive(Clone, Copy, Debug)]
pub struct TickEvent {
    /// Monotonic frame counter.
    pub frame_index: u64,
    /// Host time of the tick.
    pub now: HostTime,
    /// What produced the tick.
    pub origin: TickOrigin,
}

impl From<&FrameTick> for TickEvent {
    fn from(tick: &FrameTick) -> Self {
        Self {
            frame_index: tick.frame_index,
            now: tick.now,
            origin: tick.origin,
        }
    }
}

/// Marks the beginning of a phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseBeginEvent {
    /// Frame counter, or 0 outside a frame.
    pub frame_index: u64,
    /// Which phase is starting.
    pub phase: PhaseKind,
    /// Host time the phase runs at.
    pub timestamp: HostTime,
}

/// Marks the end of a phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseEndEvent {
    /// Frame counter, or 0 outside a frame.
    pub frame_index: u64,
    /// Which phase is ending.
    pub phase: PhaseKind,
    /// Host time the phase ran at.
    pub timestamp: HostTime,
}

/// Counts produced by one reconcile pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// View being reconciled.
    pub view: ViewId,
    /// Host time of the pass.
    pub at: HostTime,
    /// Nodes created.
    pub entered: usize,
    /// Nodes matched.
    pub updated: usize,
    /// Nodes that began exiting.
    pub exited: usize,
    /// Attribute values written or animated.
    pub attribute_changes: usize,
}

/// A transition started, was superseded or completed.
#[derive(Clone, Debug)]
pub struct TransitionEvent {
    /// The animated node.
    pub node: NodeId,
    /// The animated attribute.
    pub attr: AttrName,
    /// What happened.
    pub kind: TransitionEventKind,
    /// The phase that started the transition.
    pub phase: Phase,
    /// Host time of the event.
    pub at: HostTime,
}

/// An exiting node finished its exit and is queued for removal.
#[derive(Clone, Copy, Debug)]
pub struct RemovalEvent {
    /// The exiting node.
    pub node: NodeId,
    /// Its surface node, if it was committed.
    pub handle: Option<SurfaceHandle>,
    /// Host time of the event.
    pub at: HostTime,
}

/// A position binding whose simulation node the adapter did not report.
#[derive(Clone, Debug)]
pub struct AdapterMissEvent {
    /// The bound node.
    pub node: NodeId,
    /// The missing simulation node.
    pub sim_id: SimId,
    /// Host time of the event.
    pub at: HostTime,
}

/// A coordinated element changed visual state.
#[derive(Clone, Copy, Debug)]
pub struct InteractionEvent {
    /// The view showing the element.
    pub view: ViewId,
    /// The element's surface node.
    pub handle: SurfaceHandle,
    /// The new state.
    pub state: VisualState,
    /// Attribute values the state wrote or animated.
    pub attributes: usize,
}

/// Surface operations issued by one commit.
#[derive(Clone, Copy, Debug)]
pub struct CommitSummary {
    /// Frame counter, or 0 outside a frame.
    pub frame_index: u64,
    /// View being committed.
    pub view: ViewId,
    /// Operation counts.
    pub report: CommitReport,
    /// Nodes freed, descendants of removed nodes included.
    pub freed: usize,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the engine.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when a tick is received.
    fn on_tick(&mut self, e: &TickEvent) {
        _ = e;
    }

    /// Called at the beginning of a phase.
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        _ = e;
    }

    /// Called at the end of a phase.
    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        _ = e;
    }

    /// Called after a reconcile pass.
    fn on_reconcile(&mut self, s: &ReconcileSummary) {
        _ = s;
    }

    /// Called when a transition starts, is superseded or completes.
    fn on_transition(&mut self, e: &TransitionEvent) {
        _ = e;
    }

    /// Called when an exiting node is queued for removal.
    fn on_removal(&mut self, e: &RemovalEvent) {
        _ = e;
    }

    /// Called when an adapter did not report a bound simulation node.
    fn on_adapter_miss(&mut self, e: &AdapterMissEvent) {
        _ = e;
    }

    /// Called when a coordinated element changes state.
    fn on_interaction(&mut self, e: &InteractionEvent) {
        _ = e;
    }

    /// Called after a commit.
    fn on_commit(&mut self, s: &CommitSummary) {
        _ = s;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

macro_rules! emit {
    ($self:ident, $method:ident, $e:ident) => {{
        #[cfg(feature = "trace")]
        if let Some(s) = &mut $self.sink {
            s.$method($e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = $e;
        }
    }};
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`TickEvent`].
    #[inline]
    pub fn tick(&mut self, e: &TickEvent) {
        emit!(self, on_tick, e);
    }

    /// Emits a [`PhaseBeginEvent`].
    #[inline]
    pub fn phase_begin(&mut self, e: &PhaseBeginEvent) {
        emit!(self, on_phase_begin, e);
    }

    /// Emits a [`PhaseEndEvent`].
    #[inline]
    pub fn phase_end(&mut self, e: &PhaseEndEvent) {
        emit!(self, on_phase_end, e);
    }

    /// Emits a [`ReconcileSummary`].
    #[inline]
    pub fn reconcile(&mut self, s: &ReconcileSummary) {
        emit!(self, on_reconcile, s);
    }

    /// Emits a [`TransitionEvent`].
    #[inline]
    pub fn transition(&mut self, e: &TransitionEvent) {
        emit!(self, on_transition, e);
    }

    /// Emits a [`RemovalEvent`].
    #[inline]
    pub fn removal(&mut self, e: &RemovalEvent) {
        emit!(self, on_removal, e);
    }

    /// Emits an [`AdapterMissEvent`].
    #[inline]
    pub fn adapter_miss(&mut self, e: &AdapterMissEvent) {
        emit!(self, on_adapter_miss, e);
    }

    /// Emits an [`InteractionEvent`].
    #[inline]
    pub fn interaction(&mut self, e: &InteractionEvent) {
        emit!(self, on_interaction, e);
    }

    /// Emits a [`CommitSummary`].
    #[inline]
    pub fn commit(&mut self, s: &CommitSummary) {
        emit!(self, on_commit, s);
    }

    /// Whether events reach a sink.
    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        #[cfg(feature = "trace")]
        {
            self.sink.is_some()
        }
        #[cfg(not(feature = "trace"))]
        {
            false
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tick() -> TickEvent {
        TickEvent {
            frame_index: 42,
            now: HostTime::from_millis(16),
            origin: TickOrigin::AnimationFrame,
        }
    }

    #[test]
    fn tick_event_from_frame_tick() {
        let tick = FrameTick::manual(HostTime(100), 7);
        let evt = TickEvent::from(&tick);
        assert_eq!(evt.frame_index, 7);
        assert_eq!(evt.now, HostTime(100));
        assert_eq!(evt.origin, TickOrigin::Manual);
    }

    #[test]
    fn noop_sink_compiles() {
        let mut sink = NoopSink;
        sink.on_tick(&sample_tick());
        sink.on_reconcile(&ReconcileSummary::default());
        sink.on_commit(&CommitSummary {
            frame_index: 0,
            view: ViewId(0),
            report: CommitReport::default(),
            freed: 0,
        });
    }

    #[test]
    fn tracer_none_does_nothing() {
        let mut tracer = Tracer::none();
        tracer.tick(&sample_tick());
        tracer.reconcile(&ReconcileSummary::default());
        assert!(!tracer.is_enabled());
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_sink() {
        use alloc::vec::Vec;

        struct RecordingSink {
            ticks: Vec<u64>,
        }
        impl TraceSink for RecordingSink {
            fn on_tick(&mut self, e: &TickEvent) {
                self.ticks.push(e.frame_index);
            }
        }

        let mut sink = RecordingSink { ticks: Vec::new() };
        let mut tracer = Tracer::new(&mut sink);
        assert!(tracer.is_enabled());
        tracer.tick(&sample_tick());
        drop(tracer);
        assert_eq!(sink.ticks, &[42]);
    }
}
