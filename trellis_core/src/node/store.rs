// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays node storage with allocation, topology and attribute
//! management.

use alloc::borrow::Cow;
use alloc::collections::{BTreeMap, BTreeSet};
use alloc::rc::Rc;
use alloc::vec::Vec;

use understory_dirty::{CycleHandling, DirtyTracker};

use super::id::{INVALID, NodeId};
use super::traverse::Children;
use crate::dirty;
use crate::key::Key;
use crate::surface::SurfaceHandle;
use crate::tree::{AttrName, AttrReader, Behavior, DerivedAttr, Phases, PositionBinding};
use crate::value::Value;

/// A node's place among its siblings.
///
/// Plain elements are matched by kind and position among siblings of the
/// same kind. Repeat items are matched by the ordinal of their repeat group
/// in the sibling list and their key. Repeats nested directly inside an
/// item's template add one `(group, key)` step each to `nested`, so their
/// items keep their identity under removal and reorder.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SlotKey {
    /// The root of the store.
    Root,
    /// The `ordinal`-th element of `kind` among its non-repeated siblings.
    Positional {
        /// Element kind.
        kind: Cow<'static, str>,
        /// Position among siblings of the same kind.
        ordinal: u32,
    },
    /// Part `part` of the item keyed `key` in repeat group `group`.
    Keyed {
        /// Ordinal of the repeat group among its siblings.
        group: u32,
        /// The item's key.
        key: Key,
        /// Group ordinals and keys of nested repeat items, outermost first.
        nested: Vec<(u32, Key)>,
        /// Position of the element among the plain elements of the
        /// innermost item.
        part: u32,
    },
}

/// Whether a node is still part of the scene.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    /// Matched by the latest tree.
    #[default]
    Live,
    /// Missing from the latest tree; removed once its exit transitions
    /// complete. Never matched again.
    Exiting,
}

/// Struct-of-arrays storage for all retained nodes.
///
/// Nodes are addressed by [`NodeId`] handles. Removed nodes are recycled via a
/// free list, and generation counters catch stale handles. Slot 0 always holds
/// the root, which mirrors the surface node the engine renders into.
#[derive(Debug)]
pub struct NodeStore {
    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) first_child: Vec<u32>,
    pub(crate) next_sibling: Vec<u32>,
    pub(crate) prev_sibling: Vec<u32>,

    // -- Identity --
    pub(crate) kind: Vec<Cow<'static, str>>,
    pub(crate) slot: Vec<SlotKey>,
    pub(crate) handle: Vec<Option<SurfaceHandle>>,
    pub(crate) lifecycle: Vec<Lifecycle>,

    // -- Values --
    pub(crate) attrs: Vec<BTreeMap<AttrName, Value>>,
    pub(crate) unwritten: Vec<BTreeSet<AttrName>>,

    // -- Declarations from the latest matching tree --
    pub(crate) behaviors: Vec<Vec<Behavior>>,
    pub(crate) derived: Vec<Vec<DerivedAttr>>,
    pub(crate) bindings: Vec<Vec<PositionBinding>>,
    pub(crate) phases: Vec<Option<Rc<Phases>>>,

    // -- Surface mirror --
    pub(crate) mounted: Vec<Vec<u32>>,
    pub(crate) by_handle: BTreeMap<SurfaceHandle, u32>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) alive: Vec<bool>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,

    // -- Dirty tracking --
    pub(crate) dirty: DirtyTracker<u32>,

    // -- Lifecycle tracking --
    pub(crate) pending_created: Vec<NodeId>,
    pub(crate) pending_removal: Vec<NodeId>,
}

impl NodeStore {
    /// Creates a store whose root mirrors the surface node `root`.
    #[must_use]
    pub fn new(root: SurfaceHandle) -> Self {
        let mut store = Self {
            parent: Vec::new(),
            first_child: Vec::new(),
            next_sibling: Vec::new(),
            prev_sibling: Vec::new(),
            kind: Vec::new(),
            slot: Vec::new(),
            handle: Vec::new(),
            lifecycle: Vec::new(),
            attrs: Vec::new(),
            unwritten: Vec::new(),
            behaviors: Vec::new(),
            derived: Vec::new(),
            bindings: Vec::new(),
            phases: Vec::new(),
            mounted: Vec::new(),
            by_handle: BTreeMap::new(),
            generation: Vec::new(),
            alive: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            pending_created: Vec::new(),
            pending_removal: Vec::new(),
        };
        let idx = store.allocate(Cow::Borrowed("#root"), SlotKey::Root);
        store.handle[idx as usize] = Some(root);
        store.by_handle.insert(root, idx);
        store
    }

    /// The root node.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.id_at(0)
    }

    // -- Allocation API --

    /// Creates a node as the last child of `parent`.
    ///
    /// The surface node is created on the next [`commit`](Self::commit).
    ///
    /// # Panics
    ///
    /// Panics if `parent` is stale.
    pub fn create_node(
        &mut self,
        parent: NodeId,
        kind: Cow<'static, str>,
        slot: SlotKey,
    ) -> NodeId {
        self.validate(parent);
        let idx = self.allocate(kind, slot);
        self.link_last(parent.idx, idx);
        self.dirty.mark(parent.idx, dirty::ORDER);
        let id = self.id_at(idx);
        self.pending_created.push(id);
        id
    }

    fn allocate(&mut self, kind: Cow<'static, str>, slot: SlotKey) -> u32 {
        if let Some(idx) = self.free_list.pop() {
            let i = idx as usize;
            self.generation[i] += 1;
            self.alive[i] = true;
            self.parent[i] = INVALID;
            self.first_child[i] = INVALID;
            self.next_sibling[i] = INVALID;
            self.prev_sibling[i] = INVALID;
            self.kind[i] = kind;
            self.slot[i] = slot;
            self.handle[i] = None;
            self.lifecycle[i] = Lifecycle::Live;
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.parent.push(INVALID);
            self.first_child.push(INVALID);
            self.next_sibling.push(INVALID);
            self.prev_sibling.push(INVALID);
            self.kind.push(kind);
            self.slot.push(slot);
            self.handle.push(None);
            self.lifecycle.push(Lifecycle::Live);
            self.attrs.push(BTreeMap::new());
            self.unwritten.push(BTreeSet::new());
            self.behaviors.push(Vec::new());
            self.derived.push(Vec::new());
            self.bindings.push(Vec::new());
            self.phases.push(None);
            self.mounted.push(Vec::new());
            self.generation.push(0);
            self.alive.push(true);
            idx
        }
    }

    /// Frees `idx` and its whole subtree, appending the freed handles to
    /// `freed` (descendants first).
    pub(crate) fn free_subtree(&mut self, idx: u32, freed: &mut Vec<NodeId>) {
        let mut child = self.first_child[idx as usize];
        while child != INVALID {
            let next = self.next_sibling[child as usize];
            self.free_subtree(child, freed);
            child = next;
        }
        freed.push(self.id_at(idx));

        let p = self.parent[idx as usize];
        if p != INVALID {
            self.unlink(idx);
            self.mounted[p as usize].retain(|c| *c != idx);
        }
        let i = idx as usize;
        if let Some(h) = self.handle[i].take() {
            self.by_handle.remove(&h);
        }
        self.attrs[i].clear();
        self.unwritten[i].clear();
        self.behaviors[i].clear();
        self.derived[i].clear();
        self.bindings[i].clear();
        self.phases[i] = None;
        self.mounted[i].clear();
        self.dirty.remove_key(idx);

        // Bump generation so old handles immediately fail validation.
        self.generation[i] += 1;
        self.alive[i] = false;
        self.free_list.push(idx);
    }

    /// Returns whether the given handle refers to a stored node.
    #[must_use]
    pub fn is_alive(&self, id: NodeId) -> bool {
        id.idx < self.len
            && self.alive[id.idx as usize]
            && self.generation[id.idx as usize] == id.generation
    }

    /// Number of stored nodes, the root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.alive.iter().filter(|a| **a).count()
    }

    /// Whether only the root is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    // -- Topology API --

    /// Returns the parent of a node, if any.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.validate(id);
        let p = self.parent[id.idx as usize];
        (p != INVALID).then(|| self.id_at(p))
    }

    /// Returns an iterator over the direct children of a node.
    #[must_use]
    pub fn children(&self, id: NodeId) -> Children<'_> {
        self.validate(id);
        Children::new(self, self.first_child[id.idx as usize])
    }

    /// Re-links the children of `parent` in the given order.
    ///
    /// `order` must hold exactly the current children. Marks the parent's
    /// order dirty and returns `true` if the order changed.
    ///
    /// # Panics
    ///
    /// Panics if a handle is stale or `order` is not a permutation of the
    /// current children.
    pub fn set_child_order(&mut self, parent: NodeId, order: &[NodeId]) -> bool {
        self.validate(parent);
        let current: Vec<u32> = self.children(parent).map(|c| c.idx).collect();
        assert_eq!(current.len(), order.len(), "child order is not a permutation");
        if current.iter().zip(order).all(|(a, b)| *a == b.idx) {
            return false;
        }
        for &c in &current {
            self.unlink(c);
        }
        for &child in order {
            self.validate(child);
            assert!(
                current.contains(&child.idx),
                "{child:?} is not a child of {parent:?}"
            );
            self.link_last(parent.idx, child.idx);
        }
        self.dirty.mark(parent.idx, dirty::ORDER);
        true
    }

    // -- Node queries --

    /// The kind the node was created with.
    #[must_use]
    pub fn kind(&self, id: NodeId) -> &str {
        self.validate(id);
        &self.kind[id.idx as usize]
    }

    /// The node's slot among its siblings.
    #[must_use]
    pub fn slot(&self, id: NodeId) -> &SlotKey {
        self.validate(id);
        &self.slot[id.idx as usize]
    }

    /// The surface node, once committed.
    #[must_use]
    pub fn handle(&self, id: NodeId) -> Option<SurfaceHandle> {
        self.validate(id);
        self.handle[id.idx as usize]
    }

    /// The node mirroring a surface handle.
    #[must_use]
    pub fn node_for_handle(&self, handle: SurfaceHandle) -> Option<NodeId> {
        self.by_handle.get(&handle).map(|&idx| self.id_at(idx))
    }

    /// The node's lifecycle.
    #[must_use]
    pub fn lifecycle(&self, id: NodeId) -> Lifecycle {
        self.validate(id);
        self.lifecycle[id.idx as usize]
    }

    /// The current value of one attribute.
    #[must_use]
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&Value> {
        self.validate(id);
        self.attrs[id.idx as usize].get(name)
    }

    /// Read access to all current attribute values.
    #[must_use]
    pub fn attrs(&self, id: NodeId) -> AttrReader<'_> {
        self.validate(id);
        AttrReader::new(&self.attrs[id.idx as usize])
    }

    /// Behaviors from the latest matching tree.
    #[must_use]
    pub fn behaviors(&self, id: NodeId) -> &[Behavior] {
        self.validate(id);
        &self.behaviors[id.idx as usize]
    }

    /// Position bindings from the latest matching tree.
    #[must_use]
    pub fn bindings(&self, id: NodeId) -> &[PositionBinding] {
        self.validate(id);
        &self.bindings[id.idx as usize]
    }

    /// Phases of the repeat group the node belongs to, if any.
    #[must_use]
    pub fn phases(&self, id: NodeId) -> Option<&Phases> {
        self.validate(id);
        self.phases[id.idx as usize].as_deref()
    }

    /// All live, non-root nodes in storage order.
    pub fn live_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        (1..self.len)
            .filter(|&idx| {
                self.alive[idx as usize] && self.lifecycle[idx as usize] == Lifecycle::Live
            })
            .map(|idx| self.id_at(idx))
    }

    // -- Mutation API (auto-marks dirty) --

    /// Sets one attribute value. Returns `false` if the value was unchanged.
    ///
    /// Marks the ATTRIBUTES channel dirty when the value changes.
    pub fn write_attr(&mut self, id: NodeId, name: &AttrName, value: Value) -> bool {
        self.validate(id);
        let i = id.idx as usize;
        if self.attrs[i].get(name) == Some(&value) {
            return false;
        }
        self.attrs[i].insert(name.clone(), value);
        self.unwritten[i].insert(name.clone());
        self.dirty.mark(id.idx, dirty::ATTRIBUTES);
        true
    }

    /// Replaces the declarations taken from the latest matching tree.
    pub(crate) fn set_declarations(
        &mut self,
        id: NodeId,
        behaviors: &[Behavior],
        derived: &[DerivedAttr],
        bindings: &[PositionBinding],
        phases: Option<Rc<Phases>>,
    ) {
        self.validate(id);
        let i = id.idx as usize;
        self.behaviors[i] = behaviors.to_vec();
        self.bindings[i] = bindings.to_vec();
        self.phases[i] = phases;
        self.derived[i] = derived.to_vec();
        if !derived.is_empty() {
            self.dirty.mark(id.idx, dirty::ATTRIBUTES);
        }
    }

    /// Marks a node as exiting.
    pub(crate) fn begin_exit(&mut self, id: NodeId) {
        self.validate(id);
        self.lifecycle[id.idx as usize] = Lifecycle::Exiting;
    }

    /// Queues an exiting node for removal on the next commit.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the node is not exiting.
    pub(crate) fn schedule_removal(&mut self, id: NodeId) {
        self.validate(id);
        assert_eq!(
            self.lifecycle[id.idx as usize],
            Lifecycle::Exiting,
            "only exiting nodes are removed"
        );
        if !self.pending_removal.contains(&id) {
            self.pending_removal.push(id);
        }
    }

    /// Nodes queued for removal on the next commit.
    #[must_use]
    pub fn pending_removals(&self) -> &[NodeId] {
        &self.pending_removal
    }

    // -- Internal helpers --

    pub(crate) fn id_at(&self, idx: u32) -> NodeId {
        NodeId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Panics if the handle is stale.
    pub(crate) fn validate(&self, id: NodeId) {
        assert!(
            self.is_alive(id),
            "stale NodeId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }

    fn link_last(&mut self, p: u32, c: u32) {
        self.parent[c as usize] = p;
        self.prev_sibling[c as usize] = INVALID;
        self.next_sibling[c as usize] = INVALID;

        if self.first_child[p as usize] == INVALID {
            self.first_child[p as usize] = c;
        } else {
            // Walk to last child.
            let mut last = self.first_child[p as usize];
            while self.next_sibling[last as usize] != INVALID {
                last = self.next_sibling[last as usize];
            }
            self.next_sibling[last as usize] = c;
            self.prev_sibling[c as usize] = last;
        }
    }

    /// Removes `idx` from its parent's child list without touching dirty state.
    fn unlink(&mut self, idx: u32) {
        let p = self.parent[idx as usize];
        let prev = self.prev_sibling[idx as usize];
        let next = self.next_sibling[idx as usize];

        if prev != INVALID {
            self.next_sibling[prev as usize] = next;
        } else {
            self.first_child[p as usize] = next;
        }
        if next != INVALID {
            self.prev_sibling[next as usize] = prev;
        }

        self.parent[idx as usize] = INVALID;
        self.prev_sibling[idx as usize] = INVALID;
        self.next_sibling[idx as usize] = INVALID;
    }
}
