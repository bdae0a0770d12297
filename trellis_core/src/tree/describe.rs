// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Textual outlines of trees.
//!
//! [`Outline`] renders a tree as an indented listing, one line per element,
//! for logs, snapshots and accessibility descriptions:
//!
//! ```text
//! svg
//!   repeat 2 items
//!     [a] circle r=1 fill=#node
//!     [b] circle r=2 fill=#node
//! ```

use alloc::string::String;
use core::fmt::Write;

use super::{AttrValue, Elem, Interpret, NodeKind, Repeat, Tree};
use crate::value::Value;

/// Builds an indented text outline of a tree.
#[derive(Debug, Default)]
pub struct Outline {
    out: String,
    depth: usize,
}

impl Outline {
    /// Returns the outline of `tree`.
    #[must_use]
    pub fn of(tree: &Tree) -> String {
        let mut outline = Self::default();
        tree.interpret(&mut outline);
        outline.out
    }

    fn line_start(&mut self) {
        for _ in 0..self.depth {
            self.out.push_str("  ");
        }
    }

    fn write_elem_line(&mut self, elem: &Elem) {
        if let NodeKind::Node(kind) = elem.kind() {
            self.out.push_str(kind);
        }
        for attr in elem.attrs() {
            let _ = write!(self.out, " {}=", attr.name());
            match attr.value() {
                AttrValue::Animated(a) => {
                    write_value(&mut self.out, a.start());
                    self.out.push_str("->");
                    write_value(&mut self.out, a.target());
                }
                _ => write_value(&mut self.out, &attr.resolve()),
            }
        }
        for derived in elem.derived() {
            let _ = write!(self.out, " {}=<derived>", derived.name());
        }
        for behavior in elem.behaviors() {
            let _ = write!(self.out, " on:{}", behavior.event());
        }
        self.out.push('\n');
    }
}

fn write_value(out: &mut String, value: &Value) {
    let _ = match value {
        Value::Number(n) => write!(out, "{n}"),
        Value::Point(p) => write!(out, "({},{})", p.x, p.y),
        Value::Color(c) => write!(out, "rgba({},{},{},{})", c.r, c.g, c.b, c.a),
        Value::Text(s) => write!(out, "#{s}"),
        Value::Path(s) => write!(out, "path[{}]", s.len()),
    };
}

impl Interpret for Outline {
    type Output = ();

    fn empty(&mut self) {}

    fn elem(&mut self, elem: &Elem) {
        if elem.is_fragment() {
            for child in elem.child_trees() {
                child.interpret(self);
            }
            return;
        }
        self.line_start();
        self.write_elem_line(elem);
        self.depth += 1;
        for child in elem.child_trees() {
            child.interpret(self);
        }
        self.depth -= 1;
    }

    fn repeat(&mut self, repeat: &Repeat) {
        self.line_start();
        let _ = writeln!(self.out, "repeat {} items", repeat.len());
        self.depth += 1;
        repeat.with_view(|view| {
            for item in view.items() {
                let key = view.key(item);
                match view.template(item) {
                    Tree::Elem(e) if !e.is_fragment() => {
                        self.line_start();
                        let _ = write!(self.out, "[{key}] ");
                        self.write_elem_line(&e);
                        self.depth += 1;
                        for child in e.child_trees() {
                            child.interpret(self);
                        }
                        self.depth -= 1;
                    }
                    other => {
                        self.line_start();
                        let _ = writeln!(self.out, "[{key}]");
                        self.depth += 1;
                        other.interpret(self);
                        self.depth -= 1;
                    }
                }
            }
        });
        self.depth -= 1;
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;
    use crate::tree::{Attr, Behavior};

    #[test]
    fn outlines_nested_repeat() {
        let items = Tree::repeat(
            vec![("a", 1.0), ("b", 2.0)],
            |(k, _)| *k,
            |(_, r), _| {
                Elem::new("circle")
                    .attr(Attr::fixed("r", *r))
                    .attr(Attr::fixed("fill", "node"))
                    .into()
            },
        )
        .unwrap();
        let tree: Tree = Elem::new("svg").child(items).into();
        assert_eq!(
            Outline::of(&tree),
            "svg\n  repeat 2 items\n    [a] circle r=1 fill=#node\n    [b] circle r=2 fill=#node\n"
        );
    }

    #[test]
    fn fragments_are_transparent() {
        let tree = Tree::from(Elem::new("a").on(Behavior::on("click", || {})))
            .combine(Elem::new("b").into());
        assert_eq!(Outline::of(&tree), "a on:click\nb\n");
    }
}
