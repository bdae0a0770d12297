// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The tick engine.
//!
//! The [`Scheduler`] owns every in-flight [`TransitionState`] in an arena
//! keyed by `(node, attribute)`, so at most one transition drives any
//! attribute. It has no hidden suspension points: the host calls
//! [`advance`](Scheduler::advance) with the current time and applies the
//! returned samples.
//!
//! # Interruption
//!
//! Starting a transition on an attribute that already has one supersedes it.
//! The new transition starts from the superseded one's value at the current
//! time, never from its original start or target.
//!
//! # Usage
//!
//! ```rust,ignore
//! scheduler.start(node, "opacity".into(), current, target, now, timing, Phase::Update);
//! for sample in scheduler.advance(now) {
//!     store.write_attr(sample.node, &sample.attr, sample.value);
//! }
//! ```

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::node::NodeId;
use crate::time::HostTime;
use crate::transition::{Phase, Status, Timing, TransitionState};
use crate::tree::AttrName;
use crate::value::Value;

/// One value produced by [`Scheduler::advance`].
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    /// The animated node.
    pub node: NodeId,
    /// The animated attribute.
    pub attr: AttrName,
    /// The value at the sampled time.
    pub value: Value,
    /// The phase that started the transition.
    pub phase: Phase,
    /// Whether the transition reached its target and was retired.
    pub completed: bool,
}

/// What [`Scheduler::start`] did.
#[derive(Clone, Debug, PartialEq)]
pub enum Started {
    /// No transition was in flight for the attribute.
    Fresh,
    /// A transition was in flight and was replaced. Holds the value the new
    /// transition starts from.
    Superseded(Value),
}

/// Arena of in-flight transitions, keyed by node and attribute.
#[derive(Debug, Default)]
pub struct Scheduler {
    transitions: BTreeMap<(NodeId, AttrName), TransitionState>,
}

impl Scheduler {
    /// Creates an idle scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts moving `attr` of `node` from `from` to `target`.
    ///
    /// If a transition is already in flight for the attribute, it is
    /// superseded and the new one starts from its value at `now` instead of
    /// `from`.
    pub fn start(
        &mut self,
        node: NodeId,
        attr: AttrName,
        from: Value,
        target: Value,
        now: HostTime,
        timing: Timing,
        phase: Phase,
    ) -> Started {
        let key = (node, attr);
        let (start, started) = match self.transitions.get(&key) {
            Some(current) => {
                let value = current.value_at(now);
                (value.clone(), Started::Superseded(value))
            }
            None => (from, Started::Fresh),
        };
        self.transitions
            .insert(key, TransitionState::new(start, target, now, timing, phase));
        started
    }

    /// The in-flight transition of one attribute.
    #[must_use]
    pub fn get(&self, node: NodeId, attr: &AttrName) -> Option<&TransitionState> {
        self.transitions.get(&(node, attr.clone()))
    }

    /// The target of the in-flight transition of one attribute.
    #[must_use]
    pub fn target(&self, node: NodeId, attr: &AttrName) -> Option<&Value> {
        self.get(node, attr).map(TransitionState::target_value)
    }

    /// Drops the transition of one attribute, leaving its last applied value.
    pub fn cancel(&mut self, node: NodeId, attr: &AttrName) -> Option<TransitionState> {
        self.transitions.remove(&(node, attr.clone()))
    }

    /// Drops every transition of `node`.
    pub fn cancel_node(&mut self, node: NodeId) -> usize {
        let before = self.transitions.len();
        self.transitions.retain(|(n, _), _| *n != node);
        before - self.transitions.len()
    }

    /// Samples every transition at `now` and retires completed ones.
    ///
    /// Transitions still waiting for their delay produce no sample.
    pub fn advance(&mut self, now: HostTime) -> Vec<Sample> {
        let mut samples = Vec::new();
        self.transitions.retain(|(node, attr), state| {
            let value = state.sample(now);
            match state.status() {
                Status::Scheduled => true,
                status => {
                    let completed = status == Status::Complete;
                    samples.push(Sample {
                        node: *node,
                        attr: attr.clone(),
                        value,
                        phase: state.phase(),
                        completed,
                    });
                    !completed
                }
            }
        });
        samples
    }

    /// Whether `node` has exit transitions still in flight.
    #[must_use]
    pub fn has_exit_in_flight(&self, node: NodeId) -> bool {
        self.transitions
            .iter()
            .any(|((n, _), s)| *n == node && s.phase() == Phase::Exit)
    }

    /// Number of in-flight transitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    /// Whether nothing is in flight.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.transitions.is_empty()
    }
}
