// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Keyed enter/update/exit diff.
//!
//! The reconciler walks a new [`Tree`] against the retained nodes one sibling
//! group at a time:
//!
//! 1. **Flatten** the group's trees into entries: fragments are spliced,
//!    [`Tree::Empty`] is dropped and each [`Repeat`] is expanded by applying
//!    its template to every item. Each entry gets a [`SlotKey`]: plain
//!    elements are positional by kind, repeat items are keyed.
//! 2. **Match** entries to the live children by slot. A match whose kind
//!    changed is treated as an exit followed by an enter.
//! 3. **Enter** unmatched entries, **update** matched ones and **exit** live
//!    children nobody matched.
//! 4. **Order** the children like the new tree, keeping each exiting child
//!    right after the sibling that preceded it before.
//!
//! Exiting nodes are never matched again and their subtrees are frozen: a
//! key that comes back while its old node is still leaving enters a fresh
//! node. Attributes dropped from an element keep their last value.

use alloc::borrow::Cow;
use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::vec::Vec;

use crate::key::Key;
use crate::node::{Lifecycle, NodeId, NodeStore, SlotKey};
use crate::scheduler::{Scheduler, Started};
use crate::time::HostTime;
use crate::trace::{TransitionEvent, TransitionEventKind, Tracer};
use crate::transition::{Phase, Timing};
use crate::tree::{AttrName, AttrValue, Elem, NodeKind, Phases, Tree};
use crate::value::Value;

/// Who owns attributes fed by a [`PositionBinding`](crate::tree::PositionBinding).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PositionPolicy {
    /// The tree does: bound attributes update like any other.
    #[default]
    Declared,
    /// A physics adapter does: after a node entered, the tree no longer
    /// writes its bound attributes.
    Physics,
}

/// Counts produced by one reconcile pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ReconcileReport {
    /// Nodes created.
    pub entered: usize,
    /// Live nodes matched by the new tree.
    pub updated: usize,
    /// Nodes that began exiting.
    pub exited: usize,
    /// Attribute values written or set in motion.
    pub attribute_changes: usize,
    /// Parents whose child order changed.
    pub reordered_parents: usize,
}

impl ReconcileReport {
    /// Whether the pass changed nothing.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.entered == 0
            && self.exited == 0
            && self.attribute_changes == 0
            && self.reordered_parents == 0
    }
}

/// One flattened sibling.
struct Entry {
    slot: SlotKey,
    kind: Cow<'static, str>,
    elem: Rc<Elem>,
    phases: Option<Rc<Phases>>,
}

/// Expands a sibling group into entries with slot keys.
fn flatten(children: &[Tree]) -> Vec<Entry> {
    let mut out = Vec::new();
    let mut ordinals = BTreeMap::new();
    let mut groups = 0_u32;
    for child in children {
        flatten_into(child, &mut ordinals, &mut groups, &mut out);
    }
    out
}

fn flatten_into(
    tree: &Tree,
    ordinals: &mut BTreeMap<Cow<'static, str>, u32>,
    groups: &mut u32,
    out: &mut Vec<Entry>,
) {
    match tree {
        Tree::Empty => {}
        Tree::Elem(elem) => match elem.kind() {
            NodeKind::Fragment => {
                for child in elem.child_trees() {
                    flatten_into(child, ordinals, groups, out);
                }
            }
            NodeKind::Node(kind) => {
                let ordinal = ordinals.entry(kind.clone()).or_insert(0);
                out.push(Entry {
                    slot: SlotKey::Positional {
                        kind: kind.clone(),
                        ordinal: *ordinal,
                    },
                    kind: kind.clone(),
                    elem: elem.clone(),
                    phases: None,
                });
                *ordinal += 1;
            }
        },
        Tree::Repeat(repeat) => {
            let group = *groups;
            *groups += 1;
            let phases = repeat.shared_phases();
            repeat.with_view(|view| {
                for item in view.items() {
                    let key = view.key(item);
                    let mut parts = Vec::new();
                    collect_parts(
                        &view.template(item),
                        &mut Vec::new(),
                        &mut PartCounter::default(),
                        &mut parts,
                    );
                    for part in parts {
                        out.push(Entry {
                            slot: SlotKey::Keyed {
                                group,
                                key: key.clone(),
                                nested: part.nested,
                                part: part.ordinal,
                            },
                            kind: part.kind,
                            elem: part.elem,
                            phases: Some(phases.clone()),
                        });
                    }
                }
            });
        }
    }
}

/// One surface element of a repeat item.
struct Part {
    nested: Vec<(u32, Key)>,
    ordinal: u32,
    kind: Cow<'static, str>,
    elem: Rc<Elem>,
}

/// Counters for the plain elements and nested groups of one item.
#[derive(Default)]
struct PartCounter {
    parts: u32,
    groups: u32,
}

/// The surface elements of one repeat item, in order.
///
/// Nested repetitions are expanded in place. Each nested item opens a new
/// scope, so its elements are numbered relative to that item and carry its
/// key in their path.
fn collect_parts(
    tree: &Tree,
    path: &mut Vec<(u32, Key)>,
    scope: &mut PartCounter,
    out: &mut Vec<Part>,
) {
    match tree {
        Tree::Empty => {}
        Tree::Elem(elem) => match elem.kind() {
            NodeKind::Fragment => {
                for child in elem.child_trees() {
                    collect_parts(child, path, scope, out);
                }
            }
            NodeKind::Node(kind) => {
                out.push(Part {
                    nested: path.clone(),
                    ordinal: scope.parts,
                    kind: kind.clone(),
                    elem: elem.clone(),
                });
                scope.parts += 1;
            }
        },
        Tree::Repeat(repeat) => {
            let group = scope.groups;
            scope.groups += 1;
            repeat.with_view(|view| {
                for item in view.items() {
                    path.push((group, view.key(item).clone()));
                    collect_parts(&view.template(item), path, &mut PartCounter::default(), out);
                    path.pop();
                }
            });
        }
    }
}

/// One reconcile pass over a store.
pub(crate) struct Reconciler<'r, 't> {
    pub(crate) store: &'r mut NodeStore,
    pub(crate) scheduler: &'r mut Scheduler,
    pub(crate) tracer: &'r mut Tracer<'t>,
    pub(crate) now: HostTime,
    pub(crate) policy: PositionPolicy,
    pub(crate) report: ReconcileReport,
}

impl Reconciler<'_, '_> {
    /// Reconciles the children of `parent` against `children`.
    pub(crate) fn reconcile(&mut self, parent: NodeId, children: &[Tree]) {
        let entries = flatten(children);
        let old: Vec<NodeId> = self.store.children(parent).collect();
        let mut live: BTreeMap<SlotKey, NodeId> = old
            .iter()
            .filter(|&&id| self.store.lifecycle(id) == Lifecycle::Live)
            .map(|&id| (self.store.slot(id).clone(), id))
            .collect();

        let mut order = Vec::with_capacity(entries.len());
        // Per repeat group: the last entering key and how many entered.
        let mut entering: BTreeMap<u32, (Option<Key>, u64)> = BTreeMap::new();
        for entry in &entries {
            match live.remove(&entry.slot) {
                Some(id) if self.store.kind(id) == entry.kind => {
                    self.update(id, entry);
                    order.push(id);
                    continue;
                }
                // Same key, different kind.
                Some(stale) => self.exit(stale),
                None => {}
            }
            let nth = match &entry.slot {
                SlotKey::Keyed { group, key, .. } => {
                    let (last, count) = entering.entry(*group).or_insert((None, 0));
                    if last.as_ref() != Some(key) {
                        *last = Some(key.clone());
                        *count += 1;
                    }
                    count.saturating_sub(1)
                }
                _ => 0,
            };
            order.push(self.enter(parent, entry, nth));
        }
        for id in live.into_values() {
            self.exit(id);
        }

        // Exiting children follow their previous sibling.
        let mut prev: Option<NodeId> = None;
        for &id in &old {
            if self.store.lifecycle(id) == Lifecycle::Exiting {
                let at = prev
                    .and_then(|p| order.iter().position(|&o| o == p))
                    .map_or(0, |i| i + 1);
                order.insert(at, id);
            }
            prev = Some(id);
        }
        if self.store.set_child_order(parent, &order) {
            self.report.reordered_parents += 1;
        }
    }

    fn enter(&mut self, parent: NodeId, entry: &Entry, nth: u64) -> NodeId {
        let elem = &*entry.elem;
        let id = self
            .store
            .create_node(parent, entry.kind.clone(), entry.slot.clone());
        self.store.set_declarations(
            id,
            elem.behaviors(),
            elem.derived(),
            elem.bindings(),
            entry.phases.clone(),
        );
        let phases = entry.phases.as_deref();
        for attr in elem.attrs() {
            let name = attr.name();
            match attr.value() {
                AttrValue::Animated(a) => {
                    self.store.write_attr(id, name, a.start().clone());
                    self.animate(
                        id,
                        name,
                        a.start().clone(),
                        a.target().clone(),
                        a.timing(),
                        Phase::Enter,
                    );
                }
                _ => {
                    let target = attr.resolve();
                    let staged = phases.and_then(|p| {
                        let initial = p.initial(name)?;
                        let timing = p.staggered_enter(nth)?;
                        initial
                            .interpolates_with(&target)
                            .then(|| (initial.clone(), timing))
                    });
                    match staged {
                        Some((initial, timing)) => {
                            self.store.write_attr(id, name, initial.clone());
                            self.animate(id, name, initial, target, timing, Phase::Enter);
                        }
                        None => {
                            self.store.write_attr(id, name, target);
                        }
                    }
                }
            }
            self.report.attribute_changes += 1;
        }
        self.report.entered += 1;
        self.reconcile(id, elem.child_trees());
        id
    }

    fn update(&mut self, id: NodeId, entry: &Entry) {
        let elem = &*entry.elem;
        self.store.set_declarations(
            id,
            elem.behaviors(),
            elem.derived(),
            elem.bindings(),
            entry.phases.clone(),
        );
        let update_timing = entry.phases.as_deref().and_then(Phases::update_timing);
        for attr in elem.attrs() {
            let name = attr.name();
            if self.policy == PositionPolicy::Physics
                && elem.bindings().iter().any(|b| &b.x == name || &b.y == name)
            {
                continue;
            }
            let target = attr.resolve();
            let in_flight = self.scheduler.target(id, name).cloned();
            if in_flight.as_ref() == Some(&target) {
                continue;
            }
            let current = self.store.attr(id, name).cloned();
            if in_flight.is_none() && current.as_ref() == Some(&target) {
                continue;
            }
            let timing = match attr.value() {
                AttrValue::Animated(a) => Some(a.timing()),
                _ => update_timing,
            };
            match (timing, current) {
                (Some(timing), Some(current)) if current.interpolates_with(&target) => {
                    self.animate(id, name, current, target, timing, Phase::Update);
                }
                (Some(timing), None) if matches!(attr.value(), AttrValue::Animated(_)) => {
                    let start = match attr.value() {
                        AttrValue::Animated(a) => a.start().clone(),
                        _ => target.clone(),
                    };
                    self.store.write_attr(id, name, start.clone());
                    self.animate(id, name, start, target, timing, Phase::Update);
                }
                _ => {
                    self.scheduler.cancel(id, name);
                    self.store.write_attr(id, name, target);
                }
            }
            self.report.attribute_changes += 1;
        }
        self.report.updated += 1;
        self.reconcile(id, elem.child_trees());
    }

    fn exit(&mut self, id: NodeId) {
        self.store.begin_exit(id);
        self.report.exited += 1;
        let Some(phases) = self.store.phases[id.idx as usize].clone() else {
            self.store.schedule_removal(id);
            return;
        };
        let Some(timing) = phases.exit_timing() else {
            self.store.schedule_removal(id);
            return;
        };
        let moves: Vec<(AttrName, Value, Value)> = phases
            .exit_values()
            .filter_map(|(name, target)| {
                let current = self.store.attr(id, name)?;
                current
                    .interpolates_with(target)
                    .then(|| (name.clone(), current.clone(), target.clone()))
            })
            .collect();
        if moves.is_empty() {
            self.store.schedule_removal(id);
            return;
        }
        for (name, current, target) in moves {
            self.animate(id, &name, current, target, timing, Phase::Exit);
            self.report.attribute_changes += 1;
        }
    }

    fn animate(
        &mut self,
        id: NodeId,
        name: &AttrName,
        from: Value,
        target: Value,
        timing: Timing,
        phase: Phase,
    ) {
        let kind = match self
            .scheduler
            .start(id, name.clone(), from, target, self.now, timing, phase)
        {
            Started::Fresh => TransitionEventKind::Started,
            Started::Superseded(_) => TransitionEventKind::Superseded,
        };
        self.tracer.transition(&TransitionEvent {
            node: id,
            attr: name.clone(),
            kind,
            phase,
            at: self.now,
        });
    }
}
