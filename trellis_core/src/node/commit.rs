// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Flushing pending work to the surface.
//!
//! Commit runs four steps, always in this order:
//!
//! 1. **Create** surface nodes for nodes created since the last commit.
//! 2. **Attributes**: drain [`ATTRIBUTES`](crate::dirty::ATTRIBUTES),
//!    recompute derived attributes from the current values, then write every
//!    unwritten value.
//! 3. **Order**: drain [`ORDER`](crate::dirty::ORDER) and, per parent, keep
//!    the longest prefix that already matches the surface and re-append the
//!    remaining children in order. Appending an attached node moves it, so
//!    this never creates duplicates.
//! 4. **Remove** nodes whose exit completed, after every write of the pass.

use alloc::vec::Vec;

use super::id::NodeId;
use super::store::NodeStore;
use crate::dirty;
use crate::surface::Surface;
use crate::tree::AttrReader;

/// Surface operations issued by one commit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CommitReport {
    /// `create_node` calls.
    pub created: usize,
    /// `set_attribute` calls.
    pub attributes_set: usize,
    /// `append_child` calls.
    pub appended: usize,
    /// `remove_node` calls.
    pub removed: usize,
}

impl CommitReport {
    /// Whether the commit issued no operations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl NodeStore {
    /// Writes all pending work to `surface`.
    pub fn commit(&mut self, surface: &mut dyn Surface) -> CommitReport {
        self.commit_into(surface, &mut Vec::new())
    }

    /// Like [`commit`](Self::commit), also collecting every freed node
    /// (removed nodes and their descendants) into `freed`.
    pub(crate) fn commit_into(
        &mut self,
        surface: &mut dyn Surface,
        freed: &mut Vec<NodeId>,
    ) -> CommitReport {
        let mut report = CommitReport::default();

        // Create.
        for id in core::mem::take(&mut self.pending_created) {
            if !self.is_alive(id) {
                continue;
            }
            let handle = surface.create_node(&self.kind[id.idx as usize]);
            self.handle[id.idx as usize] = Some(handle);
            self.by_handle.insert(handle, id.idx);
            report.created += 1;
        }

        // Attributes.
        let dirty_attrs: Vec<u32> = self
            .dirty
            .drain(dirty::ATTRIBUTES)
            .deterministic()
            .run()
            .collect();
        for idx in dirty_attrs {
            let i = idx as usize;
            if !self.alive[i] {
                continue;
            }
            self.recompute_derived(i);
            let Some(handle) = self.handle[i] else {
                continue;
            };
            for name in core::mem::take(&mut self.unwritten[i]) {
                if let Some(value) = self.attrs[i].get(&name) {
                    surface.set_attribute(handle, &name, value);
                    report.attributes_set += 1;
                }
            }
        }

        // Order.
        let dirty_order: Vec<u32> = self
            .dirty
            .drain(dirty::ORDER)
            .deterministic()
            .run()
            .collect();
        for idx in dirty_order {
            let i = idx as usize;
            if !self.alive[i] {
                continue;
            }
            let Some(parent_handle) = self.handle[i] else {
                continue;
            };
            let desired: Vec<u32> = self.children(self.id_at(idx)).map(|c| c.idx).collect();
            let keep = desired
                .iter()
                .zip(&self.mounted[i])
                .take_while(|(a, b)| a == b)
                .count();
            for &child in &desired[keep..] {
                if let Some(child_handle) = self.handle[child as usize] {
                    surface.append_child(parent_handle, child_handle);
                    report.appended += 1;
                }
            }
            self.mounted[i] = desired;
        }

        // Remove.
        for id in core::mem::take(&mut self.pending_removal) {
            if !self.is_alive(id) {
                // Already freed with an ancestor.
                continue;
            }
            if let Some(handle) = self.handle[id.idx as usize] {
                surface.remove_node(handle);
                report.removed += 1;
            }
            self.free_subtree(id.idx, freed);
        }

        report
    }

    /// Recomputes the derived attributes of slot `i`, marking changed ones
    /// unwritten.
    fn recompute_derived(&mut self, i: usize) {
        if self.derived[i].is_empty() {
            return;
        }
        let derived = self.derived[i].clone();
        for d in &derived {
            let value = d.compute(&AttrReader::new(&self.attrs[i]));
            if self.attrs[i].get(d.name()) != Some(&value) {
                self.attrs[i].insert(d.name().clone(), value);
                self.unwritten[i].insert(d.name().clone());
            }
        }
    }
}
