// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Attribute constructors.

use alloc::borrow::Cow;
use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use core::fmt;

use kurbo::Point;

use crate::error::{Result, check_animatable};
use crate::key::SimId;
use crate::transition::Timing;
use crate::value::Value;

/// The name of an attribute on a surface node.
pub type AttrName = Cow<'static, str>;

/// An attribute value computed from a repeat item.
///
/// Thunks are only created by [`ItemScope::thunked`](super::ItemScope::thunked),
/// so every thunk lives inside a repeat template and captures the item it was
/// built for. The closure runs once, when the template builds the tree; the
/// reconciler only reads the result.
#[derive(Clone, Debug)]
pub struct Thunk(Value);

impl Thunk {
    pub(crate) fn new(f: impl FnOnce() -> Value) -> Self {
        Self(f())
    }

    /// The value computed when the tree was built.
    #[must_use]
    pub fn eval(&self) -> Value {
        self.0.clone()
    }
}

/// An animated attribute: `start` moves to `target` with the given timing.
#[derive(Clone, Debug)]
pub struct Animation {
    start: Value,
    target: Value,
    timing: Timing,
}

impl Animation {
    /// The value the attribute starts from when its node enters.
    #[must_use]
    pub fn start(&self) -> &Value {
        &self.start
    }

    /// The value the attribute settles on.
    #[must_use]
    pub fn target(&self) -> &Value {
        &self.target
    }

    /// Duration, delay and easing.
    #[must_use]
    pub fn timing(&self) -> Timing {
        self.timing
    }
}

/// How an attribute obtains its value.
#[derive(Clone, Debug)]
pub enum AttrValue {
    /// A fixed value.
    Static(Value),
    /// A value computed from the repeat item the attribute was built for.
    Thunked(Thunk),
    /// A value that animates towards a target.
    Animated(Animation),
}

/// A named attribute of an element.
#[derive(Clone, Debug)]
pub struct Attr {
    name: AttrName,
    value: AttrValue,
}

impl Attr {
    /// A static attribute.
    #[must_use]
    pub fn fixed(name: impl Into<AttrName>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: AttrValue::Static(value.into()),
        }
    }

    /// An attribute that animates from `start` to `target`.
    ///
    /// When the owning node enters, the attribute is written as `start` and
    /// transitions to `target`. When the node is updated, it transitions from
    /// its current value instead.
    ///
    /// # Errors
    ///
    /// Fails with [`TreeError::NotInterpolable`](crate::TreeError::NotInterpolable)
    /// for text and path values and with
    /// [`TreeError::KindMismatch`](crate::TreeError::KindMismatch) when
    /// `start` and `target` have different kinds. Geometry that should move
    /// smoothly is animated through its numeric inputs and rebuilt with a
    /// [`DerivedAttr`].
    pub fn animated(
        name: impl Into<AttrName>,
        start: impl Into<Value>,
        target: impl Into<Value>,
        timing: Timing,
    ) -> Result<Self> {
        let name = name.into();
        let (start, target) = (start.into(), target.into());
        check_animatable(&name, &start, &target)?;
        Ok(Self {
            name,
            value: AttrValue::Animated(Animation {
                start,
                target,
                timing,
            }),
        })
    }

    pub(crate) fn thunked(name: AttrName, thunk: Thunk) -> Self {
        Self {
            name,
            value: AttrValue::Thunked(thunk),
        }
    }

    /// The attribute's name.
    #[must_use]
    pub fn name(&self) -> &AttrName {
        &self.name
    }

    /// How the attribute obtains its value.
    #[must_use]
    pub fn value(&self) -> &AttrValue {
        &self.value
    }

    /// The value the attribute settles on once any animation finishes.
    #[must_use]
    pub fn resolve(&self) -> Value {
        match &self.value {
            AttrValue::Static(v) => v.clone(),
            AttrValue::Thunked(t) => t.eval(),
            AttrValue::Animated(a) => a.target.clone(),
        }
    }
}

/// Read access to a node's current attribute values.
#[derive(Clone, Copy, Debug)]
pub struct AttrReader<'a> {
    attrs: &'a BTreeMap<AttrName, Value>,
}

impl<'a> AttrReader<'a> {
    pub(crate) fn new(attrs: &'a BTreeMap<AttrName, Value>) -> Self {
        Self { attrs }
    }

    /// The current value of `name`, if the node has it.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&'a Value> {
        self.attrs.get(name)
    }

    /// The current value of `name` as a number, or `0.0`.
    #[must_use]
    pub fn number(&self, name: &str) -> f64 {
        self.get(name).and_then(Value::as_number).unwrap_or(0.0)
    }

    /// The current values of `x` and `y` as a point.
    #[must_use]
    pub fn point(&self, x: &str, y: &str) -> Point {
        Point::new(self.number(x), self.number(y))
    }
}

/// An attribute recomputed from the node's other attributes.
///
/// The computation runs whenever any attribute of the node changes, including
/// on every tick of an in-flight transition. A connector whose path string
/// depends on animated endpoints is the typical use:
///
/// ```rust
/// use trellis_core::tree::{Attr, DerivedAttr, Elem};
/// use trellis_core::transition::Timing;
/// use trellis_core::value::Value;
///
/// let link = Elem::new("path")
///     .attr(Attr::animated("x2", 0.0, 40.0, Timing::millis(300)).unwrap())
///     .attr(Attr::fixed("y2", 10.0))
///     .derive(DerivedAttr::new("d", |a| {
///         Value::Path(format!("M0,0L{},{}", a.number("x2"), a.number("y2")))
///     }));
/// # let _ = link;
/// ```
#[derive(Clone)]
pub struct DerivedAttr {
    name: AttrName,
    compute: Rc<dyn Fn(&AttrReader<'_>) -> Value>,
}

impl DerivedAttr {
    /// Creates a derived attribute named `name`.
    #[must_use]
    pub fn new(
        name: impl Into<AttrName>,
        compute: impl Fn(&AttrReader<'_>) -> Value + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            compute: Rc::new(compute),
        }
    }

    /// The derived attribute's name.
    #[must_use]
    pub fn name(&self) -> &AttrName {
        &self.name
    }

    /// Computes the value from the node's current attributes.
    #[must_use]
    pub fn compute(&self, attrs: &AttrReader<'_>) -> Value {
        (self.compute)(attrs)
    }
}

impl fmt::Debug for DerivedAttr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedAttr")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Feeds a physics node's position into two attributes of an element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PositionBinding {
    /// The node inside the physics adapter.
    pub sim_id: SimId,
    /// Attribute receiving the x coordinate.
    pub x: AttrName,
    /// Attribute receiving the y coordinate.
    pub y: AttrName,
}

impl PositionBinding {
    /// Binds `sim_id` to the attributes `x` and `y`.
    #[must_use]
    pub fn new(sim_id: impl Into<SimId>, x: impl Into<AttrName>, y: impl Into<AttrName>) -> Self {
        Self {
            sim_id: sim_id.into(),
            x: x.into(),
            y: y.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;

    use super::*;
    use crate::error::TreeError;
    use crate::value::{Color, ValueKind};

    #[test]
    fn animated_rejects_paths() {
        let err = Attr::animated(
            "d",
            Value::Path("M0,0".into()),
            Value::Path("M1,1".into()),
            Timing::millis(10),
        )
        .unwrap_err();
        assert_eq!(
            err,
            TreeError::NotInterpolable {
                attr: "d".into(),
                kind: ValueKind::Path
            }
        );
    }

    #[test]
    fn animated_rejects_kind_mismatch() {
        let err = Attr::animated("fill", 1.0, Color::BLACK, Timing::millis(10)).unwrap_err();
        assert!(matches!(err, TreeError::KindMismatch { .. }));
    }

    #[test]
    fn resolve_yields_target() {
        let a = Attr::animated("r", 0.0, 5.0, Timing::millis(10)).unwrap();
        assert_eq!(a.resolve(), Value::Number(5.0));
        assert_eq!(Attr::fixed("class", "node").resolve(), Value::Text(String::from("node")));
    }

    #[test]
    fn derived_reads_current_numbers() {
        let mut attrs = BTreeMap::new();
        attrs.insert(AttrName::from("x"), Value::Number(3.0));
        let sum = DerivedAttr::new("sum", |a| Value::Number(a.number("x") + a.number("missing")));
        assert_eq!(sum.compute(&AttrReader::new(&attrs)), Value::Number(3.0));
    }
}
