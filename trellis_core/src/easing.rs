// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Easing curves mapping linear progress to eased progress.

use core::f64::consts::PI;
#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

/// An easing curve.
///
/// Every curve maps `0.0 → 0.0` and `1.0 → 1.0`. [`BackOut`](Self::BackOut)
/// overshoots in between.
#[derive(Clone, Copy, Debug, Default)]
pub enum Easing {
    /// Constant speed.
    #[default]
    Linear,
    /// Quadratic acceleration from zero velocity.
    QuadIn,
    /// Quadratic deceleration to zero velocity.
    QuadOut,
    /// Quadratic acceleration then deceleration.
    QuadInOut,
    /// Cubic acceleration from zero velocity.
    CubicIn,
    /// Cubic deceleration to zero velocity.
    CubicOut,
    /// Cubic acceleration then deceleration.
    CubicInOut,
    /// Sinusoidal acceleration then deceleration.
    SinInOut,
    /// Overshoots the target slightly, then settles.
    BackOut,
    /// A caller-provided curve.
    Custom(fn(f64) -> f64),
}

impl Easing {
    /// Applies the curve to `t`, which is clamped to `[0, 1]` first.
    #[must_use]
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::QuadIn => t * t,
            Self::QuadOut => t * (2.0 - t),
            Self::QuadInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    let u = -2.0 * t + 2.0;
                    1.0 - u * u / 2.0
                }
            }
            Self::CubicIn => t * t * t,
            Self::CubicOut => {
                let u = 1.0 - t;
                1.0 - u * u * u
            }
            Self::CubicInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    let u = -2.0 * t + 2.0;
                    1.0 - u * u * u / 2.0
                }
            }
            Self::SinInOut => (1.0 - (PI * t).sin_cos().1) / 2.0,
            Self::BackOut => {
                const C1: f64 = 1.701_58;
                const C3: f64 = C1 + 1.0;
                let u = t - 1.0;
                1.0 + C3 * u * u * u + C1 * u * u
            }
            Self::Custom(f) => f(t),
        }
    }
}
