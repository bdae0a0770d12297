// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channel constants.
//!
//! The retained [`NodeStore`](crate::node::NodeStore) tracks pending surface
//! work per node with [`understory_dirty`]. Both channels are local: marking
//! a node never marks its descendants.
//!
//! - [`ATTRIBUTES`] is marked whenever one of the node's attribute values
//!   changes. [`commit`](crate::node::NodeStore::commit) recomputes the node's
//!   derived attributes and writes every pending value.
//! - [`ORDER`] is marked on a parent whose child list changed. Commit
//!   compares the new order with the order last written to the surface and
//!   re-appends the children that moved.
//!
//! Creation and removal are tracked as lists rather than channels, because
//! removed slots may already be reused by the time commit runs.

use understory_dirty::Channel;

/// Attribute values changed; derived attributes need recomputation.
pub const ATTRIBUTES: Channel = Channel::new(0);

/// Child order changed.
pub const ORDER: Channel = Channel::new(1);
