// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Immutable scene descriptions.
//!
//! A [`Tree`] is one of three cases:
//!
//! - [`Tree::Empty`] renders nothing.
//! - [`Tree::Elem`] is a concrete element: a kind tag, attributes, child
//!   trees, behaviors, derived attributes and position bindings.
//! - [`Tree::Repeat`] renders one sub-tree per data item, with the item type
//!   hidden (see [`repeat`](self::Repeat)).
//!
//! Trees combine as siblings with [`Tree::combine`]. Combination is
//! associative and [`Tree::Empty`] is its identity. It is represented by a
//! *fragment*, an element that never reaches the surface and whose children
//! are spliced into the enclosing sibling list.
//!
//! Several interpreters walk the same tree through the [`Interpret`] trait;
//! [`describe::Outline`] is one, the reconciler another.

mod attr;
mod behavior;
pub mod describe;
mod repeat;

use alloc::borrow::Cow;
use alloc::rc::Rc;
use alloc::vec::Vec;

pub use attr::{
    Animation, Attr, AttrName, AttrReader, AttrValue, DerivedAttr, PositionBinding, Thunk,
};
pub use behavior::{Behavior, Coordination};
pub use repeat::{ItemRef, ItemScope, Phases, Repeat, RepeatSpec, RepeatView};

use crate::error::Result;
use crate::key::Key;

/// An element's kind.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeKind {
    /// A surface node of the named kind, such as `"circle"` or `"g"`.
    Node(Cow<'static, str>),
    /// A sibling group that never reaches the surface.
    Fragment,
}

/// A concrete element.
#[derive(Clone, Debug)]
pub struct Elem {
    kind: NodeKind,
    attrs: Vec<Attr>,
    children: Vec<Tree>,
    behaviors: Vec<Behavior>,
    derived: Vec<DerivedAttr>,
    bindings: Vec<PositionBinding>,
}

impl Elem {
    /// An element of the given kind with no attributes or children.
    #[must_use]
    pub fn new(kind: impl Into<Cow<'static, str>>) -> Self {
        Self::with_kind(NodeKind::Node(kind.into()))
    }

    fn fragment(children: Vec<Tree>) -> Self {
        let mut elem = Self::with_kind(NodeKind::Fragment);
        elem.children = children;
        elem
    }

    fn with_kind(kind: NodeKind) -> Self {
        Self {
            kind,
            attrs: Vec::new(),
            children: Vec::new(),
            behaviors: Vec::new(),
            derived: Vec::new(),
            bindings: Vec::new(),
        }
    }

    /// Adds an attribute. A later attribute with the same name wins.
    #[must_use]
    pub fn attr(mut self, attr: Attr) -> Self {
        self.attrs.push(attr);
        self
    }

    /// Appends a child tree.
    #[must_use]
    pub fn child(mut self, child: impl Into<Tree>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Appends several child trees.
    #[must_use]
    pub fn children(mut self, children: impl IntoIterator<Item = Tree>) -> Self {
        self.children.extend(children);
        self
    }

    /// Attaches a behavior.
    #[must_use]
    pub fn on(mut self, behavior: Behavior) -> Self {
        self.behaviors.push(behavior);
        self
    }

    /// Adds an attribute recomputed from the element's other attributes.
    #[must_use]
    pub fn derive(mut self, derived: DerivedAttr) -> Self {
        self.derived.push(derived);
        self
    }

    /// Feeds a physics node's position into two attributes.
    #[must_use]
    pub fn bind_position(mut self, binding: PositionBinding) -> Self {
        self.bindings.push(binding);
        self
    }

    /// The element's kind.
    #[must_use]
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Whether this element only groups siblings.
    #[must_use]
    pub fn is_fragment(&self) -> bool {
        self.kind == NodeKind::Fragment
    }

    /// Attributes, in declaration order.
    #[must_use]
    pub fn attrs(&self) -> &[Attr] {
        &self.attrs
    }

    /// Child trees, in order.
    #[must_use]
    pub fn child_trees(&self) -> &[Tree] {
        &self.children
    }

    /// Behaviors.
    #[must_use]
    pub fn behaviors(&self) -> &[Behavior] {
        &self.behaviors
    }

    /// Derived attributes.
    #[must_use]
    pub fn derived(&self) -> &[DerivedAttr] {
        &self.derived
    }

    /// Position bindings.
    #[must_use]
    pub fn bindings(&self) -> &[PositionBinding] {
        &self.bindings
    }
}

/// A declarative scene description.
#[derive(Clone, Debug, Default)]
pub enum Tree {
    /// Renders nothing.
    #[default]
    Empty,
    /// A concrete element.
    Elem(Rc<Elem>),
    /// One sub-tree per hidden data item.
    Repeat(Repeat),
}

impl From<Elem> for Tree {
    fn from(elem: Elem) -> Self {
        Self::Elem(Rc::new(elem))
    }
}

impl From<Repeat> for Tree {
    fn from(repeat: Repeat) -> Self {
        Self::Repeat(repeat)
    }
}

impl Tree {
    /// The empty tree.
    #[must_use]
    pub const fn empty() -> Self {
        Self::Empty
    }

    /// A repetition over `items`; see [`Repeat::new`].
    ///
    /// # Errors
    ///
    /// Fails with [`TreeError::DuplicateKey`](crate::TreeError::DuplicateKey)
    /// when two items share a key.
    pub fn repeat<T: 'static, K: Into<Key>>(
        items: impl IntoIterator<Item = T>,
        key: impl Fn(&T) -> K,
        template: impl Fn(&T, &ItemScope<'_>) -> Tree + 'static,
    ) -> Result<Self> {
        Repeat::new(items, key, template).map(Self::Repeat)
    }

    /// Places `other` after `self` as siblings.
    #[must_use]
    pub fn combine(self, other: Self) -> Self {
        match (self, other) {
            (Self::Empty, t) | (t, Self::Empty) => t,
            (a, b) => {
                let mut siblings = Vec::new();
                a.push_siblings(&mut siblings);
                b.push_siblings(&mut siblings);
                Elem::fragment(siblings).into()
            }
        }
    }

    /// Combines a sequence of trees, left to right.
    #[must_use]
    pub fn concat(trees: impl IntoIterator<Item = Self>) -> Self {
        let mut siblings = Vec::new();
        for tree in trees {
            match tree {
                Self::Empty => {}
                t => t.push_siblings(&mut siblings),
            }
        }
        match siblings.len() {
            0 => Self::Empty,
            1 => siblings.pop().unwrap_or_default(),
            _ => Elem::fragment(siblings).into(),
        }
    }

    fn push_siblings(self, out: &mut Vec<Self>) {
        match self {
            Self::Elem(e) if e.is_fragment() => out.extend(e.children.iter().cloned()),
            t => out.push(t),
        }
    }

    /// Runs `handler` on the hidden items if this tree is a repetition.
    pub fn with_repeat<R>(&self, handler: impl for<'a> FnOnce(RepeatView<'a>) -> R) -> Option<R> {
        match self {
            Self::Repeat(r) => Some(r.with_view(handler)),
            _ => None,
        }
    }

    /// Dispatches to the interpreter method for this tree's case.
    pub fn interpret<I: Interpret + ?Sized>(&self, interpreter: &mut I) -> I::Output {
        match self {
            Self::Empty => interpreter.empty(),
            Self::Elem(e) => interpreter.elem(e),
            Self::Repeat(r) => interpreter.repeat(r),
        }
    }
}

/// An interpretation of trees, one method per case.
pub trait Interpret {
    /// What interpreting a tree produces.
    type Output;

    /// Interprets [`Tree::Empty`].
    fn empty(&mut self) -> Self::Output;

    /// Interprets an element, including fragments.
    fn elem(&mut self, elem: &Elem) -> Self::Output;

    /// Interprets a repetition.
    fn repeat(&mut self, repeat: &Repeat) -> Self::Output;
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    fn leaf(kind: &'static str) -> Tree {
        Elem::new(kind).into()
    }

    fn sibling_kinds(tree: &Tree) -> Vec<NodeKind> {
        match tree {
            Tree::Elem(e) if e.is_fragment() => {
                e.child_trees().iter().flat_map(sibling_kinds).collect()
            }
            Tree::Elem(e) => vec![e.kind().clone()],
            _ => Vec::new(),
        }
    }

    #[test]
    fn empty_is_identity() {
        let t = Tree::empty().combine(leaf("a")).combine(Tree::Empty);
        assert!(matches!(&t, Tree::Elem(e) if !e.is_fragment()));
    }

    #[test]
    fn combine_flattens_fragments() {
        let left = leaf("a").combine(leaf("b")).combine(leaf("c"));
        let right = leaf("a").combine(leaf("b").combine(leaf("c")));
        for t in [&left, &right] {
            let Tree::Elem(e) = t else {
                panic!("expected a fragment");
            };
            assert_eq!(e.child_trees().len(), 3, "no nested fragments");
        }
        assert_eq!(sibling_kinds(&left), sibling_kinds(&right));
    }

    #[test]
    fn concat_matches_combine() {
        let folded = Tree::concat([leaf("a"), Tree::Empty, leaf("b")]);
        assert_eq!(sibling_kinds(&folded), sibling_kinds(&leaf("a").combine(leaf("b"))));
        assert!(matches!(Tree::concat([Tree::Empty]), Tree::Empty));
    }

    #[test]
    fn with_repeat_only_sees_repeats() {
        let r = Tree::repeat(vec![1_u64, 2], |n| *n, |_, _| Tree::Empty).unwrap();
        assert_eq!(r.with_repeat(|view| view.len()), Some(2));
        assert_eq!(leaf("a").with_repeat(|view| view.len()), None);
    }
}
