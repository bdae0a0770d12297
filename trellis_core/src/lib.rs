// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Declarative scene trees, keyed reconciliation and attribute transitions.
//!
//! `trellis_core` turns immutable descriptions of a visualization into
//! incremental updates of a retained rendering surface. It is `no_std`
//! compatible (with `alloc`) and keeps its retained nodes in array-based
//! struct-of-arrays storage with generational handles.
//!
//! # Architecture
//!
//! ```text
//!   data ──► Tree (Elem / Repeat / combine)
//!              │
//!              ▼
//!   Engine::render() ──► keyed enter / update / exit ──► NodeStore
//!                                   │                        ▲
//!                                   ▼                        │
//!                               Scheduler ◄── Engine::tick() ┘
//!                                                            │
//!   Engine::commit() ──► Surface (create / set / append / remove)
//!
//!   PhysicsAdapter ──► Engine::step_physics() ──► bound attributes
//!   InteractionBus ──► Engine::apply_states()  ──► styled attributes
//! ```
//!
//! **[`tree`]**: The declarative description. Elements carry attributes,
//! behaviors, derived attributes and position bindings. Repetitions hide
//! their item type behind a uniform interface, so heterogeneous collections
//! combine into one tree.
//!
//! **[`node`]**: The retained node store, with multi-channel dirty tracking
//! via `understory_dirty` and a commit step that writes buffered changes to
//! a [`Surface`](surface::Surface) in a fixed order.
//!
//! **[`reconcile`]**: Matches a new tree against retained nodes by slot:
//! position and kind for plain elements, key for repeated items.
//!
//! **[`transition`]** and **[`scheduler`]**: Per-attribute transitions with
//! timing, easing and interruption, advanced by [`tick`] sources.
//!
//! **[`physics`]**: The contract for external force or layout computations
//! that own node positions.
//!
//! **[`interaction`]**: A bus that coordinates hover and selection states
//! across views sharing a group.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! instrumentation, with a zero-overhead [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod dirty;
pub mod easing;
pub mod engine;
pub mod error;
pub mod interaction;
pub mod key;
pub mod node;
pub mod physics;
pub mod reconcile;
pub mod scheduler;
pub mod surface;
pub mod tick;
pub mod time;
pub mod trace;
pub mod transition;
pub mod tree;
pub mod value;

pub use engine::{Engine, EngineConfig};
pub use error::{Result, TreeError};
pub use tree::{Attr, Elem, Repeat, Tree};
pub use value::Value;
