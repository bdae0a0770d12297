// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Physics adapter contract.
//!
//! A [`PhysicsAdapter`] is an external force or layout computation. The
//! engine treats it as an opaque source of positions: on each adapter-driven
//! step, [`Engine::step_physics`](crate::engine::Engine::step_physics) reads
//! the adapter's positions and feeds them into bound attributes through the
//! ordinary attribute path. How positions are computed (Barnes-Hut, exact
//! pairwise forces, anything else) is the adapter's business.
//!
//! Elements opt in with a [`PositionBinding`](crate::tree::PositionBinding)
//! naming the simulation node and the two attributes its position feeds.
//!
//! [`LayoutTransition`] animates a switch between two layout modes on top of
//! the contract.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use kurbo::{Point, Vec2};

use crate::key::SimId;
use crate::time::HostTime;
use crate::transition::{Phase, Status, Timing, TransitionState};
use crate::value::Value;

/// Positions by simulation node.
pub type PositionMap = BTreeMap<SimId, Point>;

/// The state of one simulation node.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeState {
    /// Identity inside the adapter.
    pub id: SimId,
    /// Current position.
    pub position: Point,
    /// Current velocity.
    pub velocity: Vec2,
    /// Whether the node is pinned in place.
    pub fixed: bool,
}

impl NodeState {
    /// A free node at rest.
    #[must_use]
    pub fn at(id: impl Into<SimId>, position: Point) -> Self {
        Self {
            id: id.into(),
            position,
            velocity: Vec2::ZERO,
            fixed: false,
        }
    }
}

/// An external force or layout computation.
pub trait PhysicsAdapter {
    /// Adapter-specific force rules.
    type Rule;

    /// The current state of every simulation node.
    fn nodes(&self) -> Vec<NodeState>;

    /// The positions of `nodes`.
    fn capture_positions(&self, nodes: &[NodeState]) -> PositionMap {
        nodes.iter().map(|n| (n.id.clone(), n.position)).collect()
    }

    /// Places every node between its position in `from` and in `to`.
    fn interpolate_positions(&mut self, from: &PositionMap, to: &PositionMap, t: f64);

    /// Moves nodes to the given positions.
    fn update_positions(&mut self, positions: &PositionMap);

    /// Replaces the force rules without resetting the simulation.
    fn apply_rules_in_place(&mut self, rules: &[Self::Rule]);

    /// Rebuilds forces after the node set or the rules changed.
    fn reinitialize_forces(&mut self);

    /// Restarts a cooled-down simulation.
    fn reheat(&mut self);
}

/// Linearly interpolates every node present in both maps.
///
/// Nodes missing from `to` keep their `from` position; nodes only in `to`
/// are placed at their target.
#[must_use]
pub fn lerp_positions(from: &PositionMap, to: &PositionMap, t: f64) -> PositionMap {
    let mut out = from.clone();
    for (id, target) in to {
        let p = match from.get(id) {
            Some(start) => start.lerp(*target, t),
            None => *target,
        };
        out.insert(id.clone(), p);
    }
    out
}

/// An animated switch of an adapter between two layout modes.
///
/// Captures the adapter's current positions, then moves every node towards
/// the target positions on each [`advance`](Self::advance). On completion
/// the adapter is handed the targets, its forces are rebuilt and the
/// simulation is reheated, so the new layout mode takes over from where the
/// animation ended.
#[derive(Debug)]
pub struct LayoutTransition {
    from: PositionMap,
    to: PositionMap,
    progress: TransitionState,
    done: bool,
}

impl LayoutTransition {
    /// Starts moving the adapter's nodes to `to` at `now`.
    #[must_use]
    pub fn begin<A: PhysicsAdapter + ?Sized>(
        adapter: &A,
        to: PositionMap,
        now: HostTime,
        timing: Timing,
    ) -> Self {
        let from = adapter.capture_positions(&adapter.nodes());
        Self {
            from,
            to,
            progress: TransitionState::new(
                Value::Number(0.0),
                Value::Number(1.0),
                now,
                timing,
                Phase::Update,
            ),
            done: false,
        }
    }

    /// Positions captured when the transition began.
    #[must_use]
    pub fn from(&self) -> &PositionMap {
        &self.from
    }

    /// Target positions.
    #[must_use]
    pub fn to(&self) -> &PositionMap {
        &self.to
    }

    /// Whether the transition finished and handed over to the adapter.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Moves the adapter's nodes to their positions at `now`.
    pub fn advance<A: PhysicsAdapter + ?Sized>(
        &mut self,
        adapter: &mut A,
        now: HostTime,
    ) -> Status {
        if self.done {
            return Status::Complete;
        }
        let eased = self.progress.sample(now).as_number().unwrap_or(1.0);
        match self.progress.status() {
            Status::Scheduled => {}
            Status::Running => adapter.interpolate_positions(&self.from, &self.to, eased),
            Status::Complete => {
                adapter.update_positions(&self.to);
                adapter.reinitialize_forces();
                adapter.reheat();
                self.done = true;
            }
        }
        self.progress.status()
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        positions: PositionMap,
        calls: Vec<&'static str>,
        rules: Vec<u32>,
    }

    impl PhysicsAdapter for Recorder {
        type Rule = u32;

        fn nodes(&self) -> Vec<NodeState> {
            self.positions
                .iter()
                .map(|(id, p)| NodeState::at(id.clone(), *p))
                .collect()
        }

        fn interpolate_positions(&mut self, from: &PositionMap, to: &PositionMap, t: f64) {
            self.calls.push("interpolate");
            self.positions = lerp_positions(from, to, t);
        }

        fn update_positions(&mut self, positions: &PositionMap) {
            self.calls.push("update");
            self.positions.extend(positions.iter().map(|(k, v)| (k.clone(), *v)));
        }

        fn apply_rules_in_place(&mut self, rules: &[u32]) {
            self.rules = rules.to_vec();
        }

        fn reinitialize_forces(&mut self) {
            self.calls.push("reinitialize");
        }

        fn reheat(&mut self) {
            self.calls.push("reheat");
        }
    }

    fn map(entries: &[(&str, f64, f64)]) -> PositionMap {
        entries
            .iter()
            .map(|&(id, x, y)| (SimId::from(id), Point::new(x, y)))
            .collect()
    }

    #[test]
    fn capture_defaults_to_node_positions() {
        let mut a = Recorder::default();
        a.update_positions(&map(&[("a", 1.0, 2.0)]));
        assert_eq!(a.capture_positions(&a.nodes()), map(&[("a", 1.0, 2.0)]));
        a.apply_rules_in_place(&[3]);
        assert_eq!(a.rules, vec![3]);
    }

    #[test]
    fn lerp_keeps_unmatched_nodes() {
        let from = map(&[("a", 0.0, 0.0), ("b", 5.0, 5.0)]);
        let to = map(&[("a", 10.0, 20.0), ("c", 1.0, 1.0)]);
        let mid = lerp_positions(&from, &to, 0.5);
        assert_eq!(mid, map(&[("a", 5.0, 10.0), ("b", 5.0, 5.0), ("c", 1.0, 1.0)]));
    }

    #[test]
    fn layout_transition_hands_over_on_completion() {
        let mut a = Recorder::default();
        a.update_positions(&map(&[("a", 0.0, 0.0)]));
        a.calls.clear();

        let target = map(&[("a", 100.0, 0.0)]);
        let mut t =
            LayoutTransition::begin(&a, target.clone(), HostTime::ZERO, Timing::millis(100));
        assert_eq!(t.advance(&mut a, HostTime::from_millis(50)), Status::Running);
        assert_eq!(a.positions, map(&[("a", 50.0, 0.0)]));

        assert_eq!(t.advance(&mut a, HostTime::from_millis(100)), Status::Complete);
        assert!(t.is_done());
        assert_eq!(a.positions, target);
        assert_eq!(a.calls, ["interpolate", "update", "reinitialize", "reheat"]);

        // Finished transitions leave the adapter alone.
        t.advance(&mut a, HostTime::from_millis(200));
        assert_eq!(a.calls.len(), 4);
    }
}
