// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rendering surface contract.
//!
//! The engine never draws. It drives a retained tree owned by the host (a
//! DOM, a scene graph, a canvas display list) through the four operations
//! of [`Surface`]. Hosts own the handles; the engine treats them as opaque.
//!
//! # Frame loop
//!
//! ```rust,ignore
//! fn on_frame(tick: FrameTick) {
//!     // Describe: build the scene from current data.
//!     engine.render(&view(&data), tick.now, &mut tracer);
//!
//!     // Animate: advance in-flight transitions.
//!     engine.tick(&tick, &mut tracer);
//!
//!     // Commit: flush creations, attribute writes, moves and removals.
//!     engine.commit(&mut surface, &mut tracer);
//! }
//! ```
//!
//! [`MemorySurface`] implements the contract in memory and records every
//! operation, which makes it the test double for everything above it.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::value::Value;

/// An opaque reference to a node on the rendering surface.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SurfaceHandle(pub u64);

impl fmt::Debug for SurfaceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SurfaceHandle({})", self.0)
    }
}

/// A retained rendering tree driven by the engine.
pub trait Surface {
    /// Creates a detached node of the given kind.
    fn create_node(&mut self, kind: &str) -> SurfaceHandle;

    /// Sets one attribute of a node.
    fn set_attribute(&mut self, node: SurfaceHandle, name: &str, value: &Value);

    /// Removes a node together with its subtree.
    fn remove_node(&mut self, node: SurfaceHandle);

    /// Appends `child` as the last child of `parent`, detaching it from its
    /// current parent first.
    fn append_child(&mut self, parent: SurfaceHandle, child: SurfaceHandle);
}

/// One operation received by a [`MemorySurface`].
#[derive(Clone, Debug, PartialEq)]
pub enum SurfaceOp {
    /// [`Surface::create_node`].
    Create {
        /// The new node.
        node: SurfaceHandle,
        /// Its kind.
        kind: String,
    },
    /// [`Surface::set_attribute`].
    SetAttribute {
        /// The node.
        node: SurfaceHandle,
        /// Attribute name.
        name: String,
        /// New value.
        value: Value,
    },
    /// [`Surface::remove_node`].
    Remove {
        /// The removed subtree's root.
        node: SurfaceHandle,
    },
    /// [`Surface::append_child`].
    Append {
        /// The new parent.
        parent: SurfaceHandle,
        /// The appended child.
        child: SurfaceHandle,
    },
}

#[derive(Clone, Debug)]
struct MemoryNode {
    kind: String,
    attrs: BTreeMap<String, Value>,
    parent: Option<SurfaceHandle>,
    children: Vec<SurfaceHandle>,
}

/// An in-memory [`Surface`] that records every operation.
///
/// Starts with a single root node, returned by [`root`](Self::root).
///
/// # Panics
///
/// Every operation panics when given a handle the surface does not know,
/// which catches writes to removed nodes.
#[derive(Clone, Debug)]
pub struct MemorySurface {
    nodes: BTreeMap<SurfaceHandle, MemoryNode>,
    next: u64,
    ops: Vec<SurfaceOp>,
}

impl Default for MemorySurface {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySurface {
    /// A surface holding only its root node.
    #[must_use]
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(SurfaceHandle(0), MemoryNode::new("root"));
        Self {
            nodes,
            next: 1,
            ops: Vec::new(),
        }
    }

    /// The root node.
    #[must_use]
    pub fn root(&self) -> SurfaceHandle {
        SurfaceHandle(0)
    }

    /// Whether `node` exists.
    #[must_use]
    pub fn contains(&self, node: SurfaceHandle) -> bool {
        self.nodes.contains_key(&node)
    }

    /// Number of nodes, including the root.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether only the root exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// The kind of `node`.
    #[must_use]
    pub fn kind(&self, node: SurfaceHandle) -> &str {
        &self.node(node).kind
    }

    /// The current value of one attribute of `node`.
    #[must_use]
    pub fn attr(&self, node: SurfaceHandle, name: &str) -> Option<&Value> {
        self.node(node).attrs.get(name)
    }

    /// The current number attribute `name` of `node`.
    #[must_use]
    pub fn number(&self, node: SurfaceHandle, name: &str) -> Option<f64> {
        self.attr(node, name).and_then(Value::as_number)
    }

    /// The children of `node`, in order.
    #[must_use]
    pub fn children(&self, node: SurfaceHandle) -> &[SurfaceHandle] {
        &self.node(node).children
    }

    /// The parent of `node`, if attached.
    #[must_use]
    pub fn parent(&self, node: SurfaceHandle) -> Option<SurfaceHandle> {
        self.node(node).parent
    }

    /// Every operation received so far.
    #[must_use]
    pub fn ops(&self) -> &[SurfaceOp] {
        &self.ops
    }

    /// Returns and clears the operation log.
    pub fn take_ops(&mut self) -> Vec<SurfaceOp> {
        core::mem::take(&mut self.ops)
    }

    fn node(&self, node: SurfaceHandle) -> &MemoryNode {
        match self.nodes.get(&node) {
            Some(n) => n,
            None => panic!("unknown {node:?}"),
        }
    }

    fn node_mut(&mut self, node: SurfaceHandle) -> &mut MemoryNode {
        match self.nodes.get_mut(&node) {
            Some(n) => n,
            None => panic!("unknown {node:?}"),
        }
    }

    fn detach(&mut self, node: SurfaceHandle) {
        if let Some(parent) = self.node_mut(node).parent.take() {
            self.node_mut(parent).children.retain(|c| *c != node);
        }
    }
}

impl MemoryNode {
    fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            attrs: BTreeMap::new(),
            parent: None,
            children: Vec::new(),
        }
    }
}

impl Surface for MemorySurface {
    fn create_node(&mut self, kind: &str) -> SurfaceHandle {
        let node = SurfaceHandle(self.next);
        self.next += 1;
        self.nodes.insert(node, MemoryNode::new(kind));
        self.ops.push(SurfaceOp::Create {
            node,
            kind: kind.into(),
        });
        node
    }

    fn set_attribute(&mut self, node: SurfaceHandle, name: &str, value: &Value) {
        self.node_mut(node).attrs.insert(name.into(), value.clone());
        self.ops.push(SurfaceOp::SetAttribute {
            node,
            name: name.into(),
            value: value.clone(),
        });
    }

    fn remove_node(&mut self, node: SurfaceHandle) {
        self.detach(node);
        let mut stack = alloc::vec![node];
        while let Some(n) = stack.pop() {
            if let Some(removed) = self.nodes.remove(&n) {
                stack.extend(removed.children);
            }
        }
        self.ops.push(SurfaceOp::Remove { node });
    }

    fn append_child(&mut self, parent: SurfaceHandle, child: SurfaceHandle) {
        let _ = self.node(parent);
        self.detach(child);
        self.node_mut(child).parent = Some(parent);
        self.node_mut(parent).children.push(child);
        self.ops.push(SurfaceOp::Append { parent, child });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_moves_attached_child() {
        let mut s = MemorySurface::new();
        let root = s.root();
        let a = s.create_node("g");
        let b = s.create_node("g");
        s.append_child(root, a);
        s.append_child(root, b);
        s.append_child(root, a);
        assert_eq!(s.children(root), [b, a]);
        s.append_child(b, a);
        assert_eq!(s.children(root), [b]);
        assert_eq!(s.parent(a), Some(b));
    }

    #[test]
    fn remove_takes_subtree() {
        let mut s = MemorySurface::new();
        let root = s.root();
        let g = s.create_node("g");
        let c = s.create_node("circle");
        s.append_child(root, g);
        s.append_child(g, c);
        s.remove_node(g);
        assert!(!s.contains(c));
        assert!(s.children(root).is_empty());
        assert!(s.is_empty());
    }

    #[test]
    #[should_panic(expected = "unknown SurfaceHandle")]
    fn writes_to_removed_nodes_panic() {
        let mut s = MemorySurface::new();
        let c = s.create_node("circle");
        s.remove_node(c);
        s.set_attribute(c, "r", &Value::Number(1.0));
    }
}
