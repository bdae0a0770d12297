// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Opaque string identities.
//!
//! Three element identities coexist and must not be confused:
//!
//! - [`Key`] identifies an item inside one repeat group. It is local to a
//!   sibling list and only drives keyed diffing.
//! - [`SemanticId`] names the logical data item behind an element across
//!   views, for coordinated highlighting.
//! - [`SimId`] names a node inside a physics adapter.
//!
//! [`GroupId`] names a coordination group on the
//! [`InteractionBus`](crate::interaction::InteractionBus).
//!
//! All of them compare structurally as strings. Numbers convert through their
//! decimal form, so no numeric ordering is implied.

use alloc::string::{String, ToString};
use core::fmt;

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $name(String);

        impl $name {
            /// Creates an identity from anything string-like.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identity as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({:?})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.into())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id.to_string())
            }
        }

        impl From<usize> for $name {
            fn from(id: usize) -> Self {
                Self(id.to_string())
            }
        }
    };
}

opaque_id! {
    /// Reconciliation key of an item within one repeat group.
    Key
}

opaque_id! {
    /// Cross-view identity of a logical data item.
    SemanticId
}

opaque_id! {
    /// Identity of a node inside a physics adapter.
    SimId
}

opaque_id! {
    /// Name of a coordinated-interaction group.
    GroupId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_keys_compare_as_strings() {
        assert!(Key::from(10_u64) < Key::from(9_u64), "no numeric ordering");
        assert_eq!(Key::from(7_usize), Key::from("7"));
    }
}
