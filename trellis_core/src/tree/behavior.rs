// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Event handlers attached to elements.

use alloc::borrow::Cow;
use alloc::rc::Rc;
use core::fmt;

use crate::interaction::{Resolved, Respond, VisualState};
use crate::key::{GroupId, SemanticId};

/// An event handler, optionally taking part in coordinated interaction.
///
/// Handlers take no arguments: whatever datum they need is captured when the
/// behavior is built, usually inside a repeat template.
#[derive(Clone)]
pub struct Behavior {
    event: Cow<'static, str>,
    handler: Rc<dyn Fn()>,
    coordination: Option<Coordination>,
}

/// Cross-view identity of a coordinated element.
#[derive(Clone)]
pub struct Coordination {
    /// The logical data item the element shows.
    pub semantic_id: SemanticId,
    /// The group whose triggers the element responds to.
    pub group: GroupId,
    respond: Option<Respond>,
}

impl Coordination {
    /// The element's custom response, if any.
    #[must_use]
    pub fn respond(&self) -> Option<&Respond> {
        self.respond.as_ref()
    }
}

impl fmt::Debug for Coordination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coordination")
            .field("semantic_id", &self.semantic_id)
            .field("group", &self.group)
            .field("custom_respond", &self.respond.is_some())
            .finish()
    }
}

impl Behavior {
    /// Runs `handler` whenever `event` is dispatched to the element.
    #[must_use]
    pub fn on(event: impl Into<Cow<'static, str>>, handler: impl Fn() + 'static) -> Self {
        Self {
            event: event.into(),
            handler: Rc::new(handler),
            coordination: None,
        }
    }

    /// Registers the element under `semantic_id` in `group` for coordinated
    /// highlighting.
    #[must_use]
    pub fn coordinated(
        mut self,
        semantic_id: impl Into<SemanticId>,
        group: impl Into<GroupId>,
    ) -> Self {
        let respond = self.coordination.take().and_then(|c| c.respond);
        self.coordination = Some(Coordination {
            semantic_id: semantic_id.into(),
            group: group.into(),
            respond,
        });
        self
    }

    /// Replaces the default response to group triggers.
    ///
    /// Has no effect unless the behavior is also
    /// [`coordinated`](Self::coordinated).
    #[must_use]
    pub fn respond_with(
        mut self,
        respond: impl Fn(&Resolved, &SemanticId) -> VisualState + 'static,
    ) -> Self {
        let respond: Respond = Rc::new(respond);
        match &mut self.coordination {
            Some(c) => c.respond = Some(respond),
            None => {
                self.coordination = Some(Coordination {
                    semantic_id: SemanticId::default(),
                    group: GroupId::default(),
                    respond: Some(respond),
                });
            }
        }
        self
    }

    /// The event this behavior handles.
    #[must_use]
    pub fn event(&self) -> &str {
        &self.event
    }

    /// Coordination data, if the element takes part in a group.
    #[must_use]
    pub fn coordination(&self) -> Option<&Coordination> {
        self.coordination
            .as_ref()
            .filter(|c| !c.group.as_str().is_empty())
    }

    /// Invokes the handler.
    pub fn fire(&self) {
        (self.handler)();
    }
}

impl fmt::Debug for Behavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Behavior")
            .field("event", &self.event)
            .field("coordination", &self.coordination())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use core::cell::Cell;

    use super::*;

    #[test]
    fn fire_runs_captured_handler() {
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        let b = Behavior::on("click", move || h.set(h.get() + 1));
        b.fire();
        b.fire();
        assert_eq!(hits.get(), 2);
        assert_eq!(b.event(), "click");
        assert!(b.coordination().is_none());
    }

    #[test]
    fn respond_with_survives_either_order() {
        let a = Behavior::on("hover", || {})
            .respond_with(|_, _| VisualState::Primary)
            .coordinated("n1", "graph");
        let b = Behavior::on("hover", || {})
            .coordinated("n1", "graph")
            .respond_with(|_, _| VisualState::Primary);
        for behavior in [a, b] {
            let c = behavior.coordination().unwrap();
            assert_eq!(c.group, GroupId::from("graph"));
            assert!(c.respond().is_some());
        }
    }

    #[test]
    fn respond_without_group_is_not_coordinated() {
        let b = Behavior::on("hover", || {}).respond_with(|_, _| VisualState::Primary);
        assert!(b.coordination().is_none());
    }
}
