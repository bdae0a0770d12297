// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Coordinated interaction across views.
//!
//! Elements showing the same logical data item in different views register
//! under a shared [`SemanticId`] and [`GroupId`] on an [`InteractionBus`].
//! Broadcasting a [`Trigger`] to a group resolves it once, then asks every
//! registration of the group for its [`VisualState`] and reports the ones
//! that changed.
//!
//! The bus is an explicit object owned by the host; there is no global
//! registry. Engines register their coordinated elements with
//! [`Engine::sync_interactions`](crate::engine::Engine::sync_interactions)
//! and turn state changes into attribute writes with
//! [`Engine::apply_states`](crate::engine::Engine::apply_states).
//!
//! # Brushing
//!
//! A [`Trigger::Brush`] is resolved in two passes: first the semantic ids of
//! the source view's registrations whose position lies inside the region are
//! collected, then the collected set is resolved like a selection across the
//! whole group. An empty set resolves as [`Resolved::Clear`].

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::fmt;

use kurbo::{Point, Rect};

use crate::key::{GroupId, SemanticId};
use crate::surface::SurfaceHandle;
use crate::transition::Timing;
use crate::tree::AttrName;
use crate::value::Value;

/// Identifies one view (one engine and its surface).
///
/// Hosts assign view ids; the bus treats them as opaque.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ViewId(pub u32);

impl fmt::Debug for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ViewId({})", self.0)
    }
}

/// How an element presents relative to the group's current trigger.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VisualState {
    /// No trigger is active.
    #[default]
    Neutral,
    /// The element is the hovered item.
    Primary,
    /// The element is part of the selection.
    Selected,
    /// Another item is hovered or selected.
    Dimmed,
}

/// A user action broadcast to a group.
#[derive(Clone, Debug, PartialEq)]
pub enum Trigger {
    /// One item is hovered.
    Hover(SemanticId),
    /// A region of one view is brushed.
    Brush {
        /// The view the brush was drawn in.
        view: ViewId,
        /// The brushed region in that view's coordinates.
        region: Rect,
    },
    /// An explicit set of items is selected.
    Select(BTreeSet<SemanticId>),
    /// Any active trigger ends.
    Clear,
}

/// A trigger after brush collection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolved {
    /// One item is hovered.
    Hover(SemanticId),
    /// A non-empty set of items is selected.
    Selection(BTreeSet<SemanticId>),
    /// Nothing is active.
    Clear,
}

impl Resolved {
    /// Resolves a selection, treating an empty set as [`Resolved::Clear`].
    #[must_use]
    pub fn selection(ids: BTreeSet<SemanticId>) -> Self {
        if ids.is_empty() {
            Self::Clear
        } else {
            Self::Selection(ids)
        }
    }
}

/// A custom response of one element to a resolved trigger.
pub type Respond = Rc<dyn Fn(&Resolved, &SemanticId) -> VisualState>;

/// The response of elements without a custom one.
///
/// Hovering makes the hovered item [`Primary`](VisualState::Primary) and
/// dims the rest. Selecting marks the selection
/// [`Selected`](VisualState::Selected) and dims the rest. Clearing makes
/// everything [`Neutral`](VisualState::Neutral).
#[must_use]
pub fn default_response(resolved: &Resolved, id: &SemanticId) -> VisualState {
    match resolved {
        Resolved::Hover(hovered) if hovered == id => VisualState::Primary,
        Resolved::Hover(_) => VisualState::Dimmed,
        Resolved::Selection(ids) if ids.contains(id) => VisualState::Selected,
        Resolved::Selection(_) => VisualState::Dimmed,
        Resolved::Clear => VisualState::Neutral,
    }
}

/// One coordinated element.
#[derive(Clone)]
pub struct Registration {
    /// The view showing the element.
    pub view: ViewId,
    /// The logical data item the element shows.
    pub semantic_id: SemanticId,
    /// The group the element responds to.
    pub group: GroupId,
    /// The element's position in its view, used by brushing.
    pub position: Option<Point>,
    /// Custom response, or [`default_response`] if `None`.
    pub respond: Option<Respond>,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("view", &self.view)
            .field("semantic_id", &self.semantic_id)
            .field("group", &self.group)
            .field("position", &self.position)
            .field("custom_respond", &self.respond.is_some())
            .finish()
    }
}

/// A visual state change produced by [`InteractionBus::broadcast`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateChange {
    /// The view showing the element.
    pub view: ViewId,
    /// The element's surface node.
    pub handle: SurfaceHandle,
    /// The element's logical data item.
    pub semantic_id: SemanticId,
    /// The new state.
    pub state: VisualState,
}

#[derive(Debug)]
struct Entry {
    registration: Registration,
    state: VisualState,
}

/// Registry of coordinated elements across views.
#[derive(Debug, Default)]
pub struct InteractionBus {
    entries: BTreeMap<(ViewId, SurfaceHandle), Entry>,
}

impl InteractionBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an element, replacing an earlier registration of the same
    /// surface node. A replaced registration keeps its current state.
    pub fn register(&mut self, handle: SurfaceHandle, registration: Registration) {
        let key = (registration.view, handle);
        let state = self.entries.get(&key).map_or(VisualState::Neutral, |e| e.state);
        self.entries.insert(key, Entry { registration, state });
    }

    /// Removes an element. Returns whether it was registered.
    pub fn unregister(&mut self, view: ViewId, handle: SurfaceHandle) -> bool {
        self.entries.remove(&(view, handle)).is_some()
    }

    /// Updates the position of a registered element.
    pub fn set_position(&mut self, view: ViewId, handle: SurfaceHandle, position: Option<Point>) {
        if let Some(entry) = self.entries.get_mut(&(view, handle)) {
            entry.registration.position = position;
        }
    }

    /// Removes every registration of a view.
    pub fn clear_view(&mut self, view: ViewId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(v, _), _| *v != view);
        before - self.entries.len()
    }

    /// The current state of an element.
    #[must_use]
    pub fn state(&self, view: ViewId, handle: SurfaceHandle) -> Option<VisualState> {
        self.entries.get(&(view, handle)).map(|e| e.state)
    }

    /// The registration of an element.
    #[must_use]
    pub fn registration(&self, view: ViewId, handle: SurfaceHandle) -> Option<&Registration> {
        self.entries.get(&(view, handle)).map(|e| &e.registration)
    }

    /// Surface nodes registered by a view.
    pub fn handles_of(&self, view: ViewId) -> impl Iterator<Item = SurfaceHandle> + '_ {
        self.entries
            .keys()
            .filter(move |(v, _)| *v == view)
            .map(|(_, h)| *h)
    }

    /// Number of registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolves a trigger against `group`, without changing any state.
    #[must_use]
    pub fn resolve(&self, group: &GroupId, trigger: &Trigger) -> Resolved {
        match trigger {
            Trigger::Hover(id) => Resolved::Hover(id.clone()),
            Trigger::Select(ids) => Resolved::selection(ids.clone()),
            Trigger::Clear => Resolved::Clear,
            Trigger::Brush { view, region } => Resolved::selection(
                self.entries
                    .iter()
                    .filter(|((v, _), e)| v == view && &e.registration.group == group)
                    .filter(|(_, e)| {
                        e.registration
                            .position
                            .is_some_and(|p| region.contains(p))
                    })
                    .map(|(_, e)| e.registration.semantic_id.clone())
                    .collect(),
            ),
        }
    }

    /// Broadcasts a trigger to every element of `group` and returns the
    /// elements whose state changed, in view and handle order.
    pub fn broadcast(&mut self, group: &GroupId, trigger: &Trigger) -> Vec<StateChange> {
        let resolved = self.resolve(group, trigger);
        let mut changes = Vec::new();
        for ((view, handle), entry) in &mut self.entries {
            let r = &entry.registration;
            if &r.group != group {
                continue;
            }
            let state = match &r.respond {
                Some(respond) => respond(&resolved, &r.semantic_id),
                None => default_response(&resolved, &r.semantic_id),
            };
            if state != entry.state {
                entry.state = state;
                changes.push(StateChange {
                    view: *view,
                    handle: *handle,
                    semantic_id: r.semantic_id.clone(),
                    state,
                });
            }
        }
        changes
    }
}

/// Attribute values applied per [`VisualState`].
///
/// States without an entry leave attributes untouched. With a timing, the
/// values are animated from the current ones.
#[derive(Clone, Debug, Default)]
pub struct StateStyle {
    values: BTreeMap<VisualState, Vec<(AttrName, Value)>>,
    timing: Option<Timing>,
}

impl StateStyle {
    /// Creates an empty style.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an attribute value for one state.
    #[must_use]
    pub fn with(
        mut self,
        state: VisualState,
        name: impl Into<AttrName>,
        value: impl Into<Value>,
    ) -> Self {
        self.values
            .entry(state)
            .or_default()
            .push((name.into(), value.into()));
        self
    }

    /// Animates state changes with the given timing.
    #[must_use]
    pub fn animated(mut self, timing: Timing) -> Self {
        self.timing = Some(timing);
        self
    }

    /// The values for one state.
    #[must_use]
    pub fn values(&self, state: VisualState) -> &[(AttrName, Value)] {
        self.values.get(&state).map_or(&[][..], Vec::as_slice)
    }

    /// The timing of state changes, if animated.
    #[must_use]
    pub fn timing(&self) -> Option<Timing> {
        self.timing
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    const LEFT: ViewId = ViewId(0);
    const RIGHT: ViewId = ViewId(1);

    fn reg(view: ViewId, id: &str, x: f64) -> Registration {
        Registration {
            view,
            semantic_id: id.into(),
            group: "graph".into(),
            position: Some(Point::new(x, 0.0)),
            respond: None,
        }
    }

    fn bus() -> InteractionBus {
        let mut bus = InteractionBus::new();
        bus.register(SurfaceHandle(1), reg(LEFT, "a", 10.0));
        bus.register(SurfaceHandle(2), reg(LEFT, "b", 50.0));
        bus.register(SurfaceHandle(1), reg(RIGHT, "a", 500.0));
        bus.register(SurfaceHandle(2), reg(RIGHT, "b", 600.0));
        bus
    }

    #[test]
    fn hover_highlights_across_views() {
        let mut bus = bus();
        let changes = bus.broadcast(&"graph".into(), &Trigger::Hover("a".into()));
        assert_eq!(changes.len(), 4);
        assert_eq!(bus.state(LEFT, SurfaceHandle(1)), Some(VisualState::Primary));
        assert_eq!(bus.state(RIGHT, SurfaceHandle(1)), Some(VisualState::Primary));
        assert_eq!(bus.state(RIGHT, SurfaceHandle(2)), Some(VisualState::Dimmed));
    }

    #[test]
    fn selection_marks_members_and_only_reports_changes() {
        let mut bus = bus();
        let group = GroupId::from("graph");
        let select = Trigger::Select(["b".into()].into_iter().collect());
        let changes = bus.broadcast(&group, &select);
        let selected: Vec<_> = changes
            .iter()
            .filter(|c| c.state == VisualState::Selected)
            .map(|c| (c.view, c.handle))
            .collect();
        assert_eq!(
            selected,
            vec![(LEFT, SurfaceHandle(2)), (RIGHT, SurfaceHandle(2))]
        );
        assert!(bus.broadcast(&group, &select).is_empty());
    }

    #[test]
    fn brush_collects_in_source_view_then_selects_everywhere() {
        let mut bus = bus();
        let brush = Trigger::Brush {
            view: LEFT,
            region: Rect::new(0.0, -1.0, 20.0, 1.0),
        };
        let group = GroupId::from("graph");
        assert_eq!(
            bus.resolve(&group, &brush),
            Resolved::Selection(["a".into()].into_iter().collect())
        );
        bus.broadcast(&group, &brush);
        // The right view's "a" lies outside the region but is selected.
        assert_eq!(bus.state(RIGHT, SurfaceHandle(1)), Some(VisualState::Selected));
        assert_eq!(bus.state(RIGHT, SurfaceHandle(2)), Some(VisualState::Dimmed));
    }

    #[test]
    fn empty_brush_or_selection_clears() {
        let mut bus = bus();
        let group = GroupId::from("graph");
        bus.broadcast(&group, &Trigger::Hover("a".into()));
        let empty = Trigger::Brush {
            view: LEFT,
            region: Rect::new(1000.0, 1000.0, 1001.0, 1001.0),
        };
        assert_eq!(bus.resolve(&group, &empty), Resolved::Clear);
        bus.broadcast(&group, &empty);
        assert_eq!(bus.state(LEFT, SurfaceHandle(1)), Some(VisualState::Neutral));
        assert_eq!(
            bus.resolve(&group, &Trigger::Select(BTreeSet::new())),
            Resolved::Clear
        );
    }

    #[test]
    fn custom_response_and_other_groups() {
        let mut bus = bus();
        let mut custom = reg(LEFT, "c", 0.0);
        custom.respond = Some(Rc::new(|_, _| VisualState::Selected));
        bus.register(SurfaceHandle(3), custom);
        let mut other = reg(LEFT, "a", 0.0);
        other.group = "table".into();
        bus.register(SurfaceHandle(4), other);

        bus.broadcast(&"graph".into(), &Trigger::Hover("a".into()));
        assert_eq!(bus.state(LEFT, SurfaceHandle(3)), Some(VisualState::Selected));
        assert_eq!(bus.state(LEFT, SurfaceHandle(4)), Some(VisualState::Neutral));
    }

    #[test]
    fn clear_view_tears_down_registrations() {
        let mut bus = bus();
        assert_eq!(bus.clear_view(LEFT), 2);
        assert_eq!(bus.handles_of(LEFT).count(), 0);
        assert_eq!(bus.handles_of(RIGHT).count(), 2);
        assert!(bus.unregister(RIGHT, SurfaceHandle(1)));
        assert!(!bus.unregister(RIGHT, SurfaceHandle(1)));
    }

    #[test]
    fn style_lookup() {
        let style = StateStyle::new()
            .with(VisualState::Dimmed, "opacity", 0.2)
            .animated(Timing::millis(150));
        assert_eq!(
            style.values(VisualState::Dimmed),
            &[(AttrName::from("opacity"), Value::Number(0.2))]
        );
        assert!(style.values(VisualState::Primary).is_empty());
        assert!(style.timing().is_some());
    }
}
