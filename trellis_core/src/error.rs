// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors raised while constructing trees.
//!
//! Reconciliation, ticking and physics steps never fail: runtime problems such
//! as a physics adapter omitting a position degrade to "no update this tick"
//! and are reported through [`trace`](crate::trace) events and report
//! counters instead.

use thiserror::Error;

use crate::key::Key;
use crate::tree::AttrName;
use crate::value::ValueKind;

/// Convenience alias for tree-construction results.
pub type Result<T, E = TreeError> = core::result::Result<T, E>;

/// A tree or attribute could not be constructed.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TreeError {
    /// Two items of one repeat group produced the same key.
    #[error("duplicate key `{key}` in repeat group (items {first} and {second})")]
    DuplicateKey {
        /// The offending key.
        key: Key,
        /// Index of the first item with this key.
        first: usize,
        /// Index of the second item with this key.
        second: usize,
    },
    /// An animation was requested for a value kind that cannot interpolate.
    #[error("attribute `{attr}` cannot be animated: {kind} values do not interpolate")]
    NotInterpolable {
        /// The attribute being animated.
        attr: AttrName,
        /// The non-interpolable kind.
        kind: ValueKind,
    },
    /// Start and target of an animation have different kinds.
    #[error("attribute `{attr}` cannot animate from a {start} to a {target}")]
    KindMismatch {
        /// The attribute being animated.
        attr: AttrName,
        /// Kind of the start value.
        start: ValueKind,
        /// Kind of the target value.
        target: ValueKind,
    },
}

/// Checks that `start → target` is an animatable pair for `attr`.
pub(crate) fn check_animatable(
    attr: &AttrName,
    start: &crate::value::Value,
    target: &crate::value::Value,
) -> Result<()> {
    for kind in [start.kind(), target.kind()] {
        if !kind.is_interpolable() {
            return Err(TreeError::NotInterpolable {
                attr: attr.clone(),
                kind,
            });
        }
    }
    if start.kind() != target.kind() {
        return Err(TreeError::KindMismatch {
            attr: attr.clone(),
            start: start.kind(),
            target: target.kind(),
        });
    }
    Ok(())
}
