// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The engine: one view's retained nodes, transitions and wiring.
//!
//! An [`Engine`] owns a [`NodeStore`] and a [`Scheduler`] exclusively.
//! Everything that changes attribute values (new trees, transition samples,
//! physics positions, interaction states) flows through it.
//!
//! # Frame loop
//!
//! ```rust,ignore
//! // Whenever the data changes:
//! engine.render(&tree, now, &mut tracer);
//! engine.commit(&mut surface, &mut tracer);
//!
//! // On every tick while something moves:
//! while engine.is_animating() {
//!     ticker.request_tick();
//!     let Some(tick) = ticker.next_tick() else { break };
//!     engine.frame(&tick, &mut surface, &mut tracer);
//! }
//! ```
//!
//! Physics-driven views call [`step_physics`](Engine::step_physics) on each
//! adapter step instead of [`frame`](Engine::frame).

use alloc::collections::BTreeSet;
use alloc::vec::Vec;

use crate::interaction::{InteractionBus, Registration, StateChange, StateStyle, ViewId};
use crate::node::{CommitReport, Lifecycle, NodeId, NodeStore};
use crate::physics::{PhysicsAdapter, PositionMap};
use crate::reconcile::{PositionPolicy, ReconcileReport, Reconciler};
use crate::scheduler::{Scheduler, Started};
use crate::surface::{Surface, SurfaceHandle};
use crate::tick::{FixedRateTicker, FrameTick};
use crate::time::{Duration, HostTime};
use crate::trace::{
    AdapterMissEvent, CommitSummary, InteractionEvent, PhaseBeginEvent, PhaseEndEvent, PhaseKind,
    ReconcileSummary, RemovalEvent, TickEvent, Tracer, TransitionEvent, TransitionEventKind,
};
use crate::transition::Phase;
use crate::tree::Tree;
use crate::value::Value;

/// Engine configuration.
///
/// Use the preset constructors ([`animation_frame`](Self::animation_frame),
/// [`physics_driven`](Self::physics_driven)) or build one directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// The view this engine renders, for the interaction bus and traces.
    pub view: ViewId,
    /// Who owns position-bound attributes.
    pub position_policy: PositionPolicy,
    /// Interval of the engine's animation-frame ticker.
    pub frame_interval: Duration,
}

impl EngineConfig {
    /// A view driven by a 60 Hz animation-frame loop.
    #[must_use]
    pub const fn animation_frame() -> Self {
        Self {
            view: ViewId(0),
            position_policy: PositionPolicy::Declared,
            frame_interval: Duration(16_666_667),
        }
    }

    /// A view whose bound positions come from a physics adapter.
    #[must_use]
    pub const fn physics_driven() -> Self {
        Self {
            position_policy: PositionPolicy::Physics,
            ..Self::animation_frame()
        }
    }

    /// Returns a copy rendering the given view.
    #[must_use]
    pub const fn with_view(mut self, view: ViewId) -> Self {
        self.view = view;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::animation_frame()
    }
}

/// Counts produced by [`Engine::tick`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Attribute values sampled.
    pub sampled: usize,
    /// Transitions that reached their target.
    pub completed: usize,
    /// Exiting nodes queued for removal.
    pub removals: usize,
}

/// Counts produced by [`Engine::apply_positions`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PhysicsReport {
    /// Bindings whose attributes changed.
    pub updated: usize,
    /// Bindings whose simulation node had no position.
    pub missed: usize,
}

/// Everything one frame did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Positions applied, for physics-driven frames.
    pub physics: PhysicsReport,
    /// Transition progress.
    pub tick: TickReport,
    /// Surface operations.
    pub commit: CommitReport,
}

/// Reconciles trees into one surface and animates the result.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    store: NodeStore,
    scheduler: Scheduler,
    now: HostTime,
    frame_index: u64,
}

impl Engine {
    /// Creates an engine rendering into the surface node `root`.
    #[must_use]
    pub fn new(config: EngineConfig, root: SurfaceHandle) -> Self {
        Self {
            config,
            store: NodeStore::new(root),
            scheduler: Scheduler::new(),
            now: HostTime::ZERO,
            frame_index: 0,
        }
    }

    /// The engine's configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The retained nodes.
    #[must_use]
    pub fn store(&self) -> &NodeStore {
        &self.store
    }

    /// The in-flight transitions.
    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// A ticker pacing this engine's animation frames from `start`.
    #[must_use]
    pub fn ticker(&self, start: HostTime) -> FixedRateTicker {
        FixedRateTicker::new(start, self.config.frame_interval)
    }

    /// Whether transitions or removals are pending.
    #[must_use]
    pub fn is_animating(&self) -> bool {
        !self.scheduler.is_idle() || !self.store.pending_removals().is_empty()
    }

    /// Reconciles `tree` against the retained nodes.
    ///
    /// Surface changes are buffered until the next [`commit`](Self::commit).
    pub fn render(
        &mut self,
        tree: &Tree,
        now: HostTime,
        tracer: &mut Tracer<'_>,
    ) -> ReconcileReport {
        self.now = now;
        self.phase_begin(tracer, PhaseKind::Reconcile);
        let root = self.store.root();
        let mut reconciler = Reconciler {
            store: &mut self.store,
            scheduler: &mut self.scheduler,
            tracer,
            now,
            policy: self.config.position_policy,
            report: ReconcileReport::default(),
        };
        reconciler.reconcile(root, core::slice::from_ref(tree));
        let report = reconciler.report;
        self.phase_end(tracer, PhaseKind::Reconcile);
        tracer.reconcile(&ReconcileSummary {
            view: self.config.view,
            at: now,
            entered: report.entered,
            updated: report.updated,
            exited: report.exited,
            attribute_changes: report.attribute_changes,
        });
        report
    }

    /// Advances every transition to the tick's time.
    ///
    /// Exiting nodes whose last exit transition completed are queued for
    /// removal on the next commit.
    pub fn tick(&mut self, tick: &FrameTick, tracer: &mut Tracer<'_>) -> TickReport {
        tracer.tick(&TickEvent::from(tick));
        self.advance(tick, tracer)
    }

    fn advance(&mut self, tick: &FrameTick, tracer: &mut Tracer<'_>) -> TickReport {
        self.now = tick.now;
        self.frame_index = tick.frame_index;
        self.phase_begin(tracer, PhaseKind::Advance);
        let mut report = TickReport::default();
        for sample in self.scheduler.advance(tick.now) {
            if !self.store.is_alive(sample.node) {
                continue;
            }
            self.store.write_attr(sample.node, &sample.attr, sample.value);
            report.sampled += 1;
            if !sample.completed {
                continue;
            }
            report.completed += 1;
            tracer.transition(&TransitionEvent {
                node: sample.node,
                attr: sample.attr,
                kind: TransitionEventKind::Completed,
                phase: sample.phase,
                at: tick.now,
            });
            if sample.phase == Phase::Exit
                && self.store.lifecycle(sample.node) == Lifecycle::Exiting
                && !self.scheduler.has_exit_in_flight(sample.node)
            {
                self.store.schedule_removal(sample.node);
                report.removals += 1;
                tracer.removal(&RemovalEvent {
                    node: sample.node,
                    handle: self.store.handle(sample.node),
                    at: tick.now,
                });
            }
        }
        self.phase_end(tracer, PhaseKind::Advance);
        report
    }

    /// Writes all buffered changes to `surface`.
    ///
    /// Creations come first, then attribute writes, then order fixes, then
    /// removals.
    pub fn commit(&mut self, surface: &mut dyn Surface, tracer: &mut Tracer<'_>) -> CommitReport {
        self.phase_begin(tracer, PhaseKind::Commit);
        for &id in self.store.pending_removals() {
            debug_assert!(
                !self.scheduler.has_exit_in_flight(id),
                "removing {id:?} while its exit transitions are in flight"
            );
        }
        let mut freed = Vec::new();
        let report = self.store.commit_into(surface, &mut freed);
        for &id in &freed {
            self.scheduler.cancel_node(id);
        }
        self.phase_end(tracer, PhaseKind::Commit);
        tracer.commit(&CommitSummary {
            frame_index: self.frame_index,
            view: self.config.view,
            report,
            freed: freed.len(),
        });
        report
    }

    /// Runs [`tick`](Self::tick) then [`commit`](Self::commit).
    pub fn frame(
        &mut self,
        tick: &FrameTick,
        surface: &mut dyn Surface,
        tracer: &mut Tracer<'_>,
    ) -> FrameReport {
        let tick = self.tick(tick, tracer);
        let commit = self.commit(surface, tracer);
        FrameReport {
            physics: PhysicsReport::default(),
            tick,
            commit,
        }
    }

    /// Invokes every handler for `event` on the node mirroring `handle`.
    ///
    /// Returns the number of handlers invoked.
    pub fn dispatch(&self, handle: SurfaceHandle, event: &str) -> usize {
        let Some(id) = self.store.node_for_handle(handle) else {
            return 0;
        };
        let mut fired = 0;
        for behavior in self.store.behaviors(id).iter().filter(|b| b.event() == event) {
            behavior.fire();
            fired += 1;
        }
        fired
    }

    /// Writes positions into the attributes of every live bound node.
    ///
    /// Positions replace in-flight transitions of the bound attributes.
    /// Bindings whose simulation node is missing keep their last values.
    pub fn apply_positions(
        &mut self,
        positions: &PositionMap,
        tracer: &mut Tracer<'_>,
    ) -> PhysicsReport {
        let mut report = PhysicsReport::default();
        let nodes: Vec<NodeId> = self.store.live_nodes().collect();
        for id in nodes {
            for binding in self.store.bindings(id).to_vec() {
                let Some(p) = positions.get(&binding.sim_id) else {
                    report.missed += 1;
                    tracer.adapter_miss(&AdapterMissEvent {
                        node: id,
                        sim_id: binding.sim_id.clone(),
                        at: self.now,
                    });
                    continue;
                };
                self.scheduler.cancel(id, &binding.x);
                self.scheduler.cancel(id, &binding.y);
                let x = self.store.write_attr(id, &binding.x, Value::Number(p.x));
                let y = self.store.write_attr(id, &binding.y, Value::Number(p.y));
                if x || y {
                    report.updated += 1;
                }
            }
        }
        report
    }

    /// Runs one adapter-driven frame: reads the adapter's positions, feeds
    /// them into bound attributes, advances transitions and commits.
    pub fn step_physics<A: PhysicsAdapter + ?Sized>(
        &mut self,
        adapter: &A,
        tick: &FrameTick,
        surface: &mut dyn Surface,
        tracer: &mut Tracer<'_>,
    ) -> FrameReport {
        tracer.tick(&TickEvent::from(tick));
        self.now = tick.now;
        self.frame_index = tick.frame_index;
        self.phase_begin(tracer, PhaseKind::Physics);
        let positions = adapter.capture_positions(&adapter.nodes());
        let physics = self.apply_positions(&positions, tracer);
        self.phase_end(tracer, PhaseKind::Physics);
        let tick = self.advance(tick, tracer);
        let commit = self.commit(surface, tracer);
        FrameReport {
            physics,
            tick,
            commit,
        }
    }

    /// Registers the coordinated behaviors of committed live nodes on `bus`
    /// and unregisters this view's nodes that no longer have one.
    ///
    /// A node's brush position is read from its first position binding.
    /// Returns the number of registered nodes.
    pub fn sync_interactions(&self, bus: &mut InteractionBus) -> usize {
        let view = self.config.view;
        let mut registered = BTreeSet::new();
        for id in self.store.live_nodes() {
            let Some(handle) = self.store.handle(id) else {
                continue;
            };
            let Some(c) = self
                .store
                .behaviors(id)
                .iter()
                .find_map(|b| b.coordination())
            else {
                continue;
            };
            let position = self
                .store
                .bindings(id)
                .first()
                .map(|b| self.store.attrs(id).point(&b.x, &b.y));
            bus.register(
                handle,
                Registration {
                    view,
                    semantic_id: c.semantic_id.clone(),
                    group: c.group.clone(),
                    position,
                    respond: c.respond().cloned(),
                },
            );
            registered.insert(handle);
        }
        let stale: Vec<SurfaceHandle> = bus
            .handles_of(view)
            .filter(|h| !registered.contains(h))
            .collect();
        for handle in stale {
            bus.unregister(view, handle);
        }
        registered.len()
    }

    /// Turns state changes for this view into attribute writes, animated if
    /// `style` has a timing.
    ///
    /// Changes for other views and for nodes no longer live are skipped.
    /// Returns the number of attribute values written or set in motion.
    pub fn apply_states(
        &mut self,
        changes: &[StateChange],
        style: &StateStyle,
        now: HostTime,
        tracer: &mut Tracer<'_>,
    ) -> usize {
        self.now = now;
        let mut total = 0;
        for change in changes.iter().filter(|c| c.view == self.config.view) {
            let Some(id) = self.store.node_for_handle(change.handle) else {
                continue;
            };
            if self.store.lifecycle(id) != Lifecycle::Live {
                continue;
            }
            let values = style.values(change.state);
            for (name, value) in values {
                let current = self.store.attr(id, name).cloned();
                match (style.timing(), current) {
                    (Some(timing), Some(current)) if current.interpolates_with(value) => {
                        let started = self.scheduler.start(
                            id,
                            name.clone(),
                            current,
                            value.clone(),
                            now,
                            timing,
                            Phase::Update,
                        );
                        tracer.transition(&TransitionEvent {
                            node: id,
                            attr: name.clone(),
                            kind: match started {
                                Started::Fresh => TransitionEventKind::Started,
                                Started::Superseded(_) => TransitionEventKind::Superseded,
                            },
                            phase: Phase::Update,
                            at: now,
                        });
                    }
                    _ => {
                        self.scheduler.cancel(id, name);
                        self.store.write_attr(id, name, value.clone());
                    }
                }
            }
            total += values.len();
            tracer.interaction(&InteractionEvent {
                view: change.view,
                handle: change.handle,
                state: change.state,
                attributes: values.len(),
            });
        }
        total
    }

    fn phase_begin(&self, tracer: &mut Tracer<'_>, phase: PhaseKind) {
        tracer.phase_begin(&PhaseBeginEvent {
            frame_index: self.frame_index,
            phase,
            timestamp: self.now,
        });
    }

    fn phase_end(&self, tracer: &mut Tracer<'_>, phase: PhaseKind) {
        tracer.phase_end(&PhaseEndEvent {
            frame_index: self.frame_index,
            phase,
            timestamp: self.now,
        });
    }
}

#[cfg(test)]
mod tests {
    use alloc::format;
    use alloc::rc::Rc;
    use alloc::string::String;
    use core::cell::Cell;

    use kurbo::{Point, Rect};

    use super::*;
    use crate::interaction::{Trigger, VisualState};
    use crate::key::SimId;
    use crate::physics::NodeState;
    use crate::surface::{MemorySurface, SurfaceOp};
    use crate::tick::TickSource;
    use crate::transition::Timing;
    use crate::tree::{Attr, Behavior, DerivedAttr, Elem, Phases, PositionBinding, Repeat};

    fn at(millis: u64) -> HostTime {
        HostTime::from_millis(millis)
    }

    fn setup() -> (Engine, MemorySurface) {
        let surface = MemorySurface::new();
        let engine = Engine::new(EngineConfig::animation_frame(), surface.root());
        (engine, surface)
    }

    fn render(
        engine: &mut Engine,
        surface: &mut MemorySurface,
        tree: &Tree,
        now: HostTime,
    ) -> ReconcileReport {
        let report = engine.render(tree, now, &mut Tracer::none());
        engine.commit(surface, &mut Tracer::none());
        report
    }

    fn frame(engine: &mut Engine, surface: &mut MemorySurface, now: HostTime) -> FrameReport {
        engine.frame(&FrameTick::manual(now, 0), surface, &mut Tracer::none())
    }

    /// A repetition of circles labelled with their key.
    fn circles(keys: &[&'static str], phases: Phases) -> Tree {
        Repeat::new(keys.to_vec(), |k| *k, |k, scope| {
            let label = *k;
            Elem::new("circle")
                .attr(scope.thunked("label", move || Value::from(label)))
                .attr(Attr::fixed("opacity", 1.0))
                .into()
        })
        .unwrap()
        .with_phases(phases)
        .into()
    }

    fn svg(content: Tree) -> Tree {
        Elem::new("svg").child(content).into()
    }

    fn svg_handle(surface: &MemorySurface) -> SurfaceHandle {
        surface.children(surface.root())[0]
    }

    fn labels(surface: &MemorySurface) -> Vec<String> {
        surface
            .children(svg_handle(surface))
            .iter()
            .map(|&h| match surface.attr(h, "label") {
                Some(Value::Text(s)) => s.clone(),
                other => format!("{other:?}"),
            })
            .collect()
    }

    fn handle_of(surface: &MemorySurface, label: &str) -> SurfaceHandle {
        surface
            .children(svg_handle(surface))
            .iter()
            .copied()
            .find(|&h| surface.attr(h, "label") == Some(&Value::from(label)))
            .unwrap()
    }

    fn close(a: f64, b: f64) -> bool {
        let d = a - b;
        d < 1e-9 && d > -1e-9
    }

    #[test]
    fn rendering_the_same_tree_twice_is_a_noop() {
        let (mut engine, mut surface) = setup();
        let tree = svg(circles(&["a", "b", "c"], Phases::new()));
        let first = render(&mut engine, &mut surface, &tree, at(0));
        assert_eq!(first.entered, 4);
        surface.take_ops();

        let second = render(&mut engine, &mut surface, &tree, at(10));
        assert!(second.is_noop(), "{second:?}");
        assert_eq!(second.updated, 4);
        assert!(surface.ops().is_empty());
    }

    #[test]
    fn reorder_keeps_nodes() {
        let (mut engine, mut surface) = setup();
        render(&mut engine, &mut surface, &svg(circles(&["a", "b", "c"], Phases::new())), at(0));
        let before: Vec<_> = ["a", "b", "c"].iter().map(|l| handle_of(&surface, l)).collect();

        let reordered = svg(circles(&["c", "a", "b"], Phases::new()));
        let report = render(&mut engine, &mut surface, &reordered, at(1));
        assert_eq!((report.entered, report.exited), (0, 0));
        assert_eq!(report.reordered_parents, 1);
        assert_eq!(labels(&surface), ["c", "a", "b"]);
        let after: Vec<_> = ["a", "b", "c"].iter().map(|l| handle_of(&surface, l)).collect();
        assert_eq!(before, after);
    }

    /// One row item whose template is a rect followed by nested circles.
    fn rows(inner: &[&'static str]) -> Tree {
        let inner = inner.to_vec();
        svg(Repeat::new(vec!["row"], |k| *k, move |_, _| {
            let dots = Repeat::new(inner.clone(), |k| *k, |k, scope| {
                let label = *k;
                Elem::new("circle")
                    .attr(scope.thunked("label", move || Value::from(label)))
                    .into()
            })
            .unwrap();
            Tree::concat([Elem::new("rect").into(), dots.into()])
        })
        .unwrap()
        .into())
    }

    #[test]
    fn nested_repeat_items_survive_removal_and_reorder() {
        let (mut engine, mut surface) = setup();
        render(&mut engine, &mut surface, &rows(&["p", "q", "r"]), at(0));
        let rect = surface.children(svg_handle(&surface))[0];
        let [p, q, r] = ["p", "q", "r"].map(|l| handle_of(&surface, l));

        let report = render(&mut engine, &mut surface, &rows(&["r", "p"]), at(1));
        assert_eq!((report.entered, report.exited), (0, 1));
        assert!(!surface.contains(q), "q was dropped");
        assert_eq!(surface.children(svg_handle(&surface)), [rect, r, p]);
        assert_eq!(surface.attr(r, "label"), Some(&Value::from("r")));
        assert_eq!(surface.attr(p, "label"), Some(&Value::from("p")));
    }

    #[test]
    fn every_permutation_is_enter_and_exit_free() {
        let perms: [[&'static str; 3]; 6] = [
            ["a", "b", "c"],
            ["a", "c", "b"],
            ["b", "a", "c"],
            ["b", "c", "a"],
            ["c", "a", "b"],
            ["c", "b", "a"],
        ];
        let (mut engine, mut surface) = setup();
        render(&mut engine, &mut surface, &svg(circles(&perms[0], Phases::new())), at(0));
        for (i, perm) in perms.iter().enumerate() {
            let tree = svg(circles(perm, Phases::new()));
            let report = render(&mut engine, &mut surface, &tree, at(i as u64));
            assert_eq!((report.entered, report.exited), (0, 0), "{perm:?}");
            assert_eq!(labels(&surface), perm);
        }
    }

    #[test]
    fn entering_item_fades_in() {
        let phases = || {
            Phases::new()
                .enter_from("opacity", 0.0)
                .unwrap()
                .enter(Timing::millis(400))
        };
        let (mut engine, mut surface) = setup();
        render(&mut engine, &mut surface, &svg(circles(&["a", "b", "c"], phases())), at(0));
        frame(&mut engine, &mut surface, at(400));
        assert!(!engine.is_animating());

        let report = render(
            &mut engine,
            &mut surface,
            &svg(circles(&["a", "b", "c", "d"], phases())),
            at(1000),
        );
        assert_eq!(report.entered, 1);
        let d = handle_of(&surface, "d");
        assert_eq!(surface.number(d, "opacity"), Some(0.0));

        frame(&mut engine, &mut surface, at(1200));
        assert!(close(surface.number(d, "opacity").unwrap(), 0.5));
        assert_eq!(surface.number(handle_of(&surface, "a"), "opacity"), Some(1.0));

        frame(&mut engine, &mut surface, at(1400));
        assert_eq!(surface.number(d, "opacity"), Some(1.0));
        assert!(!engine.is_animating());
    }

    #[test]
    fn stagger_delays_later_items() {
        let phases = Phases::new()
            .enter_from("opacity", 0.0)
            .unwrap()
            .enter(Timing::millis(100))
            .stagger(Duration::from_millis(100));
        let (mut engine, mut surface) = setup();
        render(&mut engine, &mut surface, &svg(circles(&["a", "b"], phases)), at(0));
        frame(&mut engine, &mut surface, at(100));
        assert_eq!(surface.number(handle_of(&surface, "a"), "opacity"), Some(1.0));
        assert_eq!(surface.number(handle_of(&surface, "b"), "opacity"), Some(0.0));
    }

    #[test]
    fn combination_is_associative_on_the_surface() {
        let a = || -> Tree { Elem::new("rect").attr(Attr::fixed("w", 1.0)).into() };
        let b = || circles(&["x", "y"], Phases::new());
        let c = || -> Tree { Elem::new("text").attr(Attr::fixed("label", "t")).into() };

        let run = |tree: Tree| {
            let (mut engine, mut surface) = setup();
            render(&mut engine, &mut surface, &svg(tree), at(0));
            surface.take_ops()
        };
        let left = run(a().combine(b()).combine(c()));
        let right = run(a().combine(b().combine(c())));
        assert_eq!(left, right);
        assert_eq!(run(Tree::empty().combine(a())), run(a()));
    }

    #[test]
    fn exit_waits_for_its_transition_and_keeps_position() {
        let phases = || {
            Phases::new()
                .exit_to("opacity", 0.0)
                .unwrap()
                .exit(Timing::millis(100))
        };
        let (mut engine, mut surface) = setup();
        render(&mut engine, &mut surface, &svg(circles(&["a", "b", "c"], phases())), at(0));
        let b = handle_of(&surface, "b");

        let tree = svg(circles(&["a", "c"], phases()));
        let report = render(&mut engine, &mut surface, &tree, at(1000));
        assert_eq!(report.exited, 1);
        assert_eq!(labels(&surface), ["a", "b", "c"]);

        frame(&mut engine, &mut surface, at(1050));
        assert!(close(surface.number(b, "opacity").unwrap(), 0.5));
        assert!(surface.contains(b));

        surface.take_ops();
        let report = frame(&mut engine, &mut surface, at(1100));
        assert_eq!(report.tick.removals, 1);
        assert_eq!(
            surface.ops(),
            [
                SurfaceOp::SetAttribute {
                    node: b,
                    name: "opacity".into(),
                    value: Value::Number(0.0),
                },
                SurfaceOp::Remove { node: b },
            ]
        );
        assert_eq!(labels(&surface), ["a", "c"]);
        assert!(!engine.is_animating());
    }

    #[test]
    fn removal_without_exit_timing_follows_updates() {
        let tree = |keys: &[&'static str], title: &'static str| {
            svg(Tree::concat([
                Elem::new("title").attr(Attr::fixed("text", title)).into(),
                circles(keys, Phases::new()),
            ]))
        };
        let (mut engine, mut surface) = setup();
        render(&mut engine, &mut surface, &tree(&["a", "b"], "two"), at(0));
        let b = handle_of(&surface, "b");
        surface.take_ops();

        render(&mut engine, &mut surface, &tree(&["a"], "one"), at(1));
        assert!(matches!(
            surface.ops(),
            [SurfaceOp::SetAttribute { .. }, SurfaceOp::Remove { node }] if *node == b
        ));
    }

    #[test]
    fn returning_key_enters_a_fresh_node_while_the_old_one_exits() {
        let phases = || {
            Phases::new()
                .exit_to("opacity", 0.0)
                .unwrap()
                .exit(Timing::millis(100))
        };
        let (mut engine, mut surface) = setup();
        render(&mut engine, &mut surface, &svg(circles(&["a"], phases())), at(0));
        render(&mut engine, &mut surface, &svg(circles(&[], phases())), at(10));
        let report = render(&mut engine, &mut surface, &svg(circles(&["a"], phases())), at(20));
        assert_eq!(report.entered, 1);
        assert_eq!(labels(&surface), ["a", "a"]);

        frame(&mut engine, &mut surface, at(200));
        assert_eq!(labels(&surface), ["a"]);
        assert_eq!(surface.number(handle_of(&surface, "a"), "opacity"), Some(1.0));
    }

    fn positioned(items: &[(&'static str, f64)], phases: Phases) -> Tree {
        let items: Vec<(&'static str, f64)> = items.to_vec();
        let tree = Repeat::new(items, |it| it.0, |it, scope| {
            let (label, x) = *it;
            Elem::new("line")
                .attr(scope.thunked("label", move || Value::from(label)))
                .attr(scope.thunked("x", move || Value::Number(x)))
                .derive(DerivedAttr::new("d", |a| {
                    Value::Path(format!("M0,0L{}", a.number("x")))
                }))
                .into()
        })
        .unwrap()
        .with_phases(phases);
        svg(tree.into())
    }

    #[test]
    fn interruption_restarts_from_current_value() {
        let phases = || Phases::new().update(Timing::millis(1000));
        let (mut engine, mut surface) = setup();
        render(&mut engine, &mut surface, &positioned(&[("a", 0.0)], phases()), at(0));
        let a = handle_of(&surface, "a");

        render(&mut engine, &mut surface, &positioned(&[("a", 10.0)], phases()), at(0));
        frame(&mut engine, &mut surface, at(500));
        assert!(close(surface.number(a, "x").unwrap(), 5.0));
        assert_eq!(surface.attr(a, "d"), Some(&Value::Path("M0,0L5".into())));

        render(&mut engine, &mut surface, &positioned(&[("a", 20.0)], phases()), at(500));
        frame(&mut engine, &mut surface, at(1000));
        assert!(close(surface.number(a, "x").unwrap(), 12.5));

        frame(&mut engine, &mut surface, at(1500));
        assert_eq!(surface.number(a, "x"), Some(20.0));
        assert_eq!(surface.attr(a, "d"), Some(&Value::Path("M0,0L20".into())));
    }

    #[test]
    fn stopping_ticks_leaves_last_values() {
        let phases = || Phases::new().update(Timing::millis(1000));
        let (mut engine, mut surface) = setup();
        render(&mut engine, &mut surface, &positioned(&[("a", 0.0)], phases()), at(0));
        render(&mut engine, &mut surface, &positioned(&[("a", 10.0)], phases()), at(0));
        frame(&mut engine, &mut surface, at(250));
        let a = handle_of(&surface, "a");
        assert!(close(surface.number(a, "x").unwrap(), 2.5));
        assert!(engine.is_animating());
        // No further ticks: nothing resets.
        engine.commit(&mut surface, &mut Tracer::none());
        assert!(close(surface.number(a, "x").unwrap(), 2.5));
    }

    #[test]
    fn dispatch_invokes_captured_handlers() {
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        let tree = svg(
            Elem::new("rect")
                .on(Behavior::on("click", move || h.set(h.get() + 1)))
                .into(),
        );
        let (mut engine, mut surface) = setup();
        render(&mut engine, &mut surface, &tree, at(0));
        let rect = surface.children(svg_handle(&surface))[0];
        assert_eq!(engine.dispatch(rect, "click"), 1);
        assert_eq!(engine.dispatch(rect, "hover"), 0);
        assert_eq!(engine.dispatch(SurfaceHandle(999), "click"), 0);
        assert_eq!(hits.get(), 1);
    }

    /// Nodes bound to simulation ids, with hover coordination.
    fn graph(ids: &[&'static str]) -> Tree {
        svg(Tree::repeat(ids.to_vec(), |id| *id, |id, scope| {
            let label = *id;
            Elem::new("circle")
                .attr(scope.thunked("label", move || Value::from(label)))
                .attr(Attr::fixed("cx", 0.0))
                .attr(Attr::fixed("cy", 0.0))
                .attr(Attr::fixed("opacity", 1.0))
                .bind_position(PositionBinding::new(label, "cx", "cy"))
                .on(Behavior::on("hover", || {}).coordinated(label, "graph"))
                .into()
        })
        .unwrap())
    }

    struct Fixed(PositionMap);

    impl PhysicsAdapter for Fixed {
        type Rule = ();

        fn nodes(&self) -> Vec<NodeState> {
            self.0.iter().map(|(id, p)| NodeState::at(id.clone(), *p)).collect()
        }

        fn interpolate_positions(&mut self, _: &PositionMap, _: &PositionMap, _: f64) {}

        fn update_positions(&mut self, positions: &PositionMap) {
            self.0.clone_from(positions);
        }

        fn apply_rules_in_place(&mut self, _: &[()]) {}

        fn reinitialize_forces(&mut self) {}

        fn reheat(&mut self) {}
    }

    #[test]
    fn physics_positions_flow_through_attributes() {
        let mut surface = MemorySurface::new();
        let mut engine = Engine::new(EngineConfig::physics_driven(), surface.root());
        render(&mut engine, &mut surface, &graph(&["a", "b"]), at(0));

        let adapter = Fixed([(SimId::from("a"), Point::new(3.0, 4.0))].into_iter().collect());
        let report = engine.step_physics(
            &adapter,
            &FrameTick::manual(at(16), 1),
            &mut surface,
            &mut Tracer::none(),
        );
        assert_eq!(report.physics, PhysicsReport { updated: 1, missed: 1 });
        let a = handle_of(&surface, "a");
        let b = handle_of(&surface, "b");
        assert_eq!(surface.number(a, "cx"), Some(3.0));
        assert_eq!(surface.number(a, "cy"), Some(4.0));
        assert_eq!(surface.number(b, "cx"), Some(0.0));

        // Re-rendering does not pull bound attributes back.
        let again = render(&mut engine, &mut surface, &graph(&["a", "b"]), at(20));
        assert!(again.is_noop(), "{again:?}");
        assert_eq!(surface.number(a, "cx"), Some(3.0));
    }

    #[test]
    fn brush_in_one_view_selects_in_both() {
        let mut bus = InteractionBus::new();
        let mut views = Vec::new();
        for view in [ViewId(0), ViewId(1)] {
            let mut surface = MemorySurface::new();
            let config = EngineConfig::physics_driven().with_view(view);
            let mut engine = Engine::new(config, surface.root());
            render(&mut engine, &mut surface, &graph(&["a", "b"]), at(0));
            let offset = f64::from(view.0) * 100.0;
            let adapter = Fixed(
                [
                    (SimId::from("a"), Point::new(offset + 10.0, 10.0)),
                    (SimId::from("b"), Point::new(offset + 50.0, 50.0)),
                ]
                .into_iter()
                .collect(),
            );
            let tick = FrameTick::manual(at(16), 1);
            engine.step_physics(&adapter, &tick, &mut surface, &mut Tracer::none());
            assert_eq!(engine.sync_interactions(&mut bus), 2);
            views.push((engine, surface));
        }

        let changes = bus.broadcast(
            &"graph".into(),
            &Trigger::Brush {
                view: ViewId(0),
                region: Rect::new(0.0, 0.0, 20.0, 20.0),
            },
        );
        assert_eq!(changes.len(), 4);
        let style = StateStyle::new()
            .with(VisualState::Selected, "opacity", 1.0)
            .with(VisualState::Dimmed, "opacity", 0.2);
        for (engine, surface) in &mut views {
            assert_eq!(engine.apply_states(&changes, &style, at(20), &mut Tracer::none()), 2);
            engine.commit(surface, &mut Tracer::none());
            assert_eq!(surface.number(handle_of(surface, "a"), "opacity"), Some(1.0));
            assert_eq!(surface.number(handle_of(surface, "b"), "opacity"), Some(0.2));
        }

        // Tearing a view down unregisters its nodes.
        let (mut engine, mut surface) = views.remove(1);
        render(&mut engine, &mut surface, &graph(&[]), at(30));
        assert_eq!(engine.sync_interactions(&mut bus), 0);
        assert_eq!(bus.len(), 2);
    }

    #[test]
    fn config_presets() {
        let frame = EngineConfig::animation_frame();
        assert_eq!(frame.position_policy, PositionPolicy::Declared);
        assert_eq!(EngineConfig::default(), frame);
        let physics = EngineConfig::physics_driven().with_view(ViewId(3));
        assert_eq!(physics.position_policy, PositionPolicy::Physics);
        assert_eq!(physics.view, ViewId(3));

        let (engine, _) = setup();
        let mut ticker = engine.ticker(at(0));
        ticker.request_tick();
        ticker.next_tick();
        assert_eq!(ticker.next_time(), HostTime(16_666_667));
    }
}
