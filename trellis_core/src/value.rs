// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Attribute values and component-wise interpolation.
//!
//! Numbers, points and colors interpolate linearly per component. Text and
//! path descriptions are opaque strings and never interpolate: animating them
//! is rejected when the animation is constructed (see
//! [`Attr::animated`](crate::tree::Attr::animated)). Geometry that has to move
//! smoothly is animated through its numeric inputs and rebuilt with a
//! [`DerivedAttr`](crate::tree::DerivedAttr).

use alloc::string::String;
use core::fmt;

use kurbo::Point;

/// An RGBA color with channels in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    /// Red channel.
    pub r: f64,
    /// Green channel.
    pub g: f64,
    /// Blue channel.
    pub b: f64,
    /// Alpha channel.
    pub a: f64,
}

impl Color {
    /// Opaque black.
    pub const BLACK: Self = Self::rgb(0.0, 0.0, 0.0);

    /// Opaque white.
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);

    /// Creates an opaque color.
    #[must_use]
    pub const fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Creates a color with an alpha channel.
    #[must_use]
    pub const fn rgba(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    fn lerp(self, to: Self, t: f64) -> Self {
        Self {
            r: lerp(self.r, to.r, t),
            g: lerp(self.g, to.g, t),
            b: lerp(self.b, to.b, t),
            a: lerp(self.a, to.a, t),
        }
    }
}

/// The value of one attribute on a rendering-surface node.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// A scalar.
    Number(f64),
    /// A 2D point.
    Point(Point),
    /// An RGBA color.
    Color(Color),
    /// Free-form text (class names, labels, font families).
    Text(String),
    /// An encoded geometry description such as an SVG path string.
    Path(String),
}

/// The variant of a [`Value`], without its payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// [`Value::Number`].
    Number,
    /// [`Value::Point`].
    Point,
    /// [`Value::Color`].
    Color,
    /// [`Value::Text`].
    Text,
    /// [`Value::Path`].
    Path,
}

impl ValueKind {
    /// Whether values of this kind can be interpolated.
    #[must_use]
    pub const fn is_interpolable(self) -> bool {
        matches!(self, Self::Number | Self::Point | Self::Color)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Number => "number",
            Self::Point => "point",
            Self::Color => "color",
            Self::Text => "text",
            Self::Path => "path",
        })
    }
}

impl Value {
    /// Returns the variant of this value.
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Number(_) => ValueKind::Number,
            Self::Point(_) => ValueKind::Point,
            Self::Color(_) => ValueKind::Color,
            Self::Text(_) => ValueKind::Text,
            Self::Path(_) => ValueKind::Path,
        }
    }

    /// Returns the scalar, if this is a number.
    #[must_use]
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the point, if this is a point.
    #[must_use]
    pub const fn as_point(&self) -> Option<Point> {
        match self {
            Self::Point(p) => Some(*p),
            _ => None,
        }
    }

    /// Returns whether `self` and `to` can be interpolated into each other.
    #[must_use]
    pub fn interpolates_with(&self, to: &Self) -> bool {
        self.kind() == to.kind() && self.kind().is_interpolable()
    }

    /// Interpolates component-wise between `self` (at `t = 0`) and `to` (at
    /// `t = 1`).
    ///
    /// Returns `None` when the pair is not interpolable. `t` outside `[0, 1]`
    /// extrapolates, which overshooting easings rely on.
    #[must_use]
    pub fn interpolate(&self, to: &Self, t: f64) -> Option<Self> {
        match (self, to) {
            (Self::Number(a), Self::Number(b)) => Some(Self::Number(lerp(*a, *b, t))),
            (Self::Point(a), Self::Point(b)) => Some(Self::Point(a.lerp(*b, t))),
            (Self::Color(a), Self::Color(b)) => Some(Self::Color(a.lerp(*b, t))),
            _ => None,
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<Point> for Value {
    fn from(p: Point) -> Self {
        Self::Point(p)
    }
}

impl From<Color> for Value {
    fn from(c: Color) -> Self {
        Self::Color(c)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_interpolate_linearly() {
        let v = Value::Number(0.0).interpolate(&Value::Number(10.0), 0.5);
        assert_eq!(v, Some(Value::Number(5.0)));
    }

    #[test]
    fn points_and_colors_interpolate_per_component() {
        let p = Value::Point(Point::new(0.0, 10.0))
            .interpolate(&Value::Point(Point::new(10.0, 30.0)), 0.25);
        assert_eq!(p, Some(Value::Point(Point::new(2.5, 15.0))));

        let c = Value::Color(Color::BLACK).interpolate(&Value::Color(Color::WHITE), 0.5);
        assert_eq!(c, Some(Value::Color(Color::rgb(0.5, 0.5, 0.5))));
    }

    #[test]
    fn paths_and_mismatched_kinds_do_not_interpolate() {
        let a = Value::Path("M0,0L1,1".into());
        let b = Value::Path("M0,0L2,2".into());
        assert_eq!(a.interpolate(&b, 0.5), None);
        assert!(!a.interpolates_with(&b));
        assert_eq!(Value::Number(1.0).interpolate(&Value::from("x"), 0.5), None);
    }
}
