// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Retained node data model.
//!
//! A *retained node* is the engine's record of one surface node. Each node
//! has:
//!
//! - An identity ([`NodeId`]), a generational handle that becomes stale when
//!   the node is removed, so handles held past removal are caught.
//! - A [`SlotKey`] naming its place among its siblings. The reconciler
//!   matches new tree entries to existing nodes by slot.
//! - Topology: parent, first-child and sibling links forming an ordered
//!   tree that mirrors the surface.
//! - Current attribute values and the set of values not yet written to the
//!   surface.
//! - The declarations of the latest tree that matched it: behaviors,
//!   derived attributes, position bindings and phases.
//! - A [`Lifecycle`]: live, or exiting until its exit transitions complete.
//!
//! Nodes are stored in struct-of-arrays layout with index-based handles.
//!
//! # Dirty tracking
//!
//! Mutations mark the channels in [`dirty`](crate::dirty);
//! [`commit`](NodeStore::commit) drains them and writes the minimal set of
//! surface operations.

mod commit;
mod id;
mod store;
mod traverse;

pub use commit::CommitReport;
pub use id::{INVALID, NodeId};
pub use store::{Lifecycle, NodeStore, SlotKey};
pub use traverse::Children;
