// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Type-erased repetition.
//!
//! A [`RepeatSpec<T>`] renders one sub-tree per item of type `T`. Erasing it
//! into a [`Repeat`] hides `T`, so trees built from different item types
//! combine into one [`Tree`].
//!
//! The only way back in is [`Repeat::with_view`], which hands a
//! [`RepeatView`] to a handler that must work for *every* brand lifetime
//! `'a`. Items appear as opaque [`ItemRef<'a>`] handles that can only be fed
//! back to the key and template closures of the same view. Because the
//! handler's return type is chosen outside the `for<'a>` binder, neither an
//! item handle nor anything borrowed from the view can escape:
//!
//! ```rust,compile_fail
//! use trellis_core::tree::{Repeat, Tree};
//!
//! let repeat = Repeat::new(vec![1_u32, 2], |n| *n as u64, |_, _| Tree::Empty).unwrap();
//! // The item handle would outlive the handler.
//! let leaked = repeat.with_view(|view| view.items().next());
//! ```

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::collections::btree_map::Entry;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::fmt;
use core::marker::PhantomData;

use super::attr::{Attr, AttrName, Thunk};
use super::Tree;
use crate::error::{Result, TreeError, check_animatable};
use crate::key::Key;
use crate::time::Duration;
use crate::transition::Timing;
use crate::value::Value;

/// Invariant lifetime brand tying item handles to one view.
type Brand<'a> = PhantomData<fn(&'a ()) -> &'a ()>;

/// Context handed to a repeat template while it builds one item's sub-tree.
///
/// Data-bound attributes can only be created here, so code outside a template
/// has no way to build one.
#[derive(Debug)]
pub struct ItemScope<'a> {
    index: usize,
    key: &'a Key,
}

impl ItemScope<'_> {
    /// Position of the item in the repeat's item list.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Key of the item.
    #[must_use]
    pub fn key(&self) -> &Key {
        self.key
    }

    /// An attribute whose value is computed by `f`, which typically captures
    /// data cloned from the item. `f` runs once, here.
    #[must_use]
    pub fn thunked(&self, name: impl Into<AttrName>, f: impl FnOnce() -> Value) -> Attr {
        Attr::thunked(name.into(), Thunk::new(f))
    }
}

/// Object-safe face of a [`RepeatSpec`].
trait ErasedRepeat {
    fn len(&self) -> usize;
    fn key_at(&self, index: usize) -> &Key;
    fn instantiate(&self, index: usize) -> Tree;
}

type Template<T> = Box<dyn Fn(&T, &ItemScope<'_>) -> Tree>;

/// A typed repetition: items, their keys, and a template.
pub struct RepeatSpec<T> {
    items: Vec<T>,
    keys: Vec<Key>,
    template: Template<T>,
}

impl<T: 'static> RepeatSpec<T> {
    /// Creates a repetition over `items`.
    ///
    /// `key` runs once per item, immediately.
    ///
    /// # Errors
    ///
    /// Fails with [`TreeError::DuplicateKey`] when two items share a key.
    pub fn new<K: Into<Key>>(
        items: impl IntoIterator<Item = T>,
        key: impl Fn(&T) -> K,
        template: impl Fn(&T, &ItemScope<'_>) -> Tree + 'static,
    ) -> Result<Self> {
        let items: Vec<T> = items.into_iter().collect();
        let mut seen = BTreeMap::new();
        let mut keys = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let k: Key = key(item).into();
            match seen.entry(k.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(index);
                }
                Entry::Occupied(slot) => {
                    return Err(TreeError::DuplicateKey {
                        key: k,
                        first: *slot.get(),
                        second: index,
                    });
                }
            }
            keys.push(k);
        }
        Ok(Self {
            items,
            keys,
            template: Box::new(template),
        })
    }

    /// The items, in order.
    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Hides the item type.
    #[must_use]
    pub fn erase(self) -> Repeat {
        Repeat {
            spec: Rc::new(self),
            phases: Rc::new(Phases::default()),
        }
    }
}

impl<T> ErasedRepeat for RepeatSpec<T> {
    fn len(&self) -> usize {
        self.items.len()
    }

    fn key_at(&self, index: usize) -> &Key {
        &self.keys[index]
    }

    fn instantiate(&self, index: usize) -> Tree {
        let scope = ItemScope {
            index,
            key: &self.keys[index],
        };
        (self.template)(&self.items[index], &scope)
    }
}

impl<T> fmt::Debug for RepeatSpec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepeatSpec")
            .field("keys", &self.keys)
            .finish_non_exhaustive()
    }
}

/// A repetition whose item type is hidden.
#[derive(Clone)]
pub struct Repeat {
    spec: Rc<dyn ErasedRepeat>,
    phases: Rc<Phases>,
}

impl Repeat {
    /// Shorthand for [`RepeatSpec::new`] followed by [`RepeatSpec::erase`].
    ///
    /// # Errors
    ///
    /// Fails with [`TreeError::DuplicateKey`] when two items share a key.
    pub fn new<T: 'static, K: Into<Key>>(
        items: impl IntoIterator<Item = T>,
        key: impl Fn(&T) -> K,
        template: impl Fn(&T, &ItemScope<'_>) -> Tree + 'static,
    ) -> Result<Self> {
        RepeatSpec::new(items, key, template).map(RepeatSpec::erase)
    }

    /// Attaches enter/update/exit configuration.
    #[must_use]
    pub fn with_phases(mut self, phases: Phases) -> Self {
        self.phases = Rc::new(phases);
        self
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.spec.len()
    }

    /// Whether the repetition has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The enter/update/exit configuration.
    #[must_use]
    pub fn phases(&self) -> &Phases {
        &self.phases
    }

    pub(crate) fn shared_phases(&self) -> Rc<Phases> {
        self.phases.clone()
    }

    /// Runs `handler` with a view of the hidden items.
    ///
    /// The handler is polymorphic over the brand lifetime `'a`, so nothing it
    /// receives can be part of its return value.
    pub fn with_view<R>(&self, handler: impl for<'a> FnOnce(RepeatView<'a>) -> R) -> R {
        handler(RepeatView {
            spec: &*self.spec,
            phases: &self.phases,
            _brand: PhantomData,
        })
    }
}

impl fmt::Debug for Repeat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repeat")
            .field("len", &self.len())
            .field("phases", &self.phases)
            .finish()
    }
}

/// Branded access to the items of a [`Repeat`].
pub struct RepeatView<'a> {
    spec: &'a dyn ErasedRepeat,
    phases: &'a Phases,
    _brand: Brand<'a>,
}

/// An opaque handle to one item of a [`RepeatView`].
#[derive(Clone, Copy)]
pub struct ItemRef<'a> {
    index: usize,
    _brand: Brand<'a>,
}

impl ItemRef<'_> {
    /// Position of the item in the item list.
    #[must_use]
    pub fn index(self) -> usize {
        self.index
    }
}

impl fmt::Debug for ItemRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ItemRef({})", self.index)
    }
}

impl<'a> RepeatView<'a> {
    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.spec.len()
    }

    /// Whether there are no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Handles to all items, in order.
    pub fn items(&self) -> impl Iterator<Item = ItemRef<'a>> + use<'a> {
        (0..self.spec.len()).map(|index| ItemRef {
            index,
            _brand: PhantomData,
        })
    }

    /// The key of `item`.
    #[must_use]
    pub fn key(&self, item: ItemRef<'a>) -> &'a Key {
        self.spec.key_at(item.index)
    }

    /// Applies the template to `item`.
    #[must_use]
    pub fn template(&self, item: ItemRef<'a>) -> Tree {
        self.spec.instantiate(item.index)
    }

    /// The enter/update/exit configuration.
    #[must_use]
    pub fn phases(&self) -> &'a Phases {
        self.phases
    }
}

impl fmt::Debug for RepeatView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepeatView")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

/// Enter/update/exit configuration of a repeat group.
///
/// Initial and final values must be interpolable. When one of them has a
/// different kind than the attribute it applies to, that attribute is
/// written directly instead of animated.
#[derive(Clone, Debug, Default)]
pub struct Phases {
    enter_from: BTreeMap<AttrName, Value>,
    exit_to: BTreeMap<AttrName, Value>,
    enter: Option<Timing>,
    update: Option<Timing>,
    exit: Option<Timing>,
    stagger: Duration,
}

impl Phases {
    /// No phase animations: entering nodes appear at their targets, updates
    /// are written directly and exiting nodes are removed immediately.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Entering nodes start with `name` at `value`.
    ///
    /// # Errors
    ///
    /// Fails with [`TreeError::NotInterpolable`] for text and path values.
    pub fn enter_from(
        mut self,
        name: impl Into<AttrName>,
        value: impl Into<Value>,
    ) -> Result<Self> {
        let (name, value) = (name.into(), value.into());
        check_animatable(&name, &value, &value)?;
        self.enter_from.insert(name, value);
        Ok(self)
    }

    /// Exiting nodes move `name` to `value` before removal.
    ///
    /// # Errors
    ///
    /// Fails with [`TreeError::NotInterpolable`] for text and path values.
    pub fn exit_to(
        mut self,
        name: impl Into<AttrName>,
        value: impl Into<Value>,
    ) -> Result<Self> {
        let (name, value) = (name.into(), value.into());
        check_animatable(&name, &value, &value)?;
        self.exit_to.insert(name, value);
        Ok(self)
    }

    /// Timing of enter transitions.
    #[must_use]
    pub fn enter(mut self, timing: Timing) -> Self {
        self.enter = Some(timing);
        self
    }

    /// Timing of update transitions.
    #[must_use]
    pub fn update(mut self, timing: Timing) -> Self {
        self.update = Some(timing);
        self
    }

    /// Timing of exit transitions.
    #[must_use]
    pub fn exit(mut self, timing: Timing) -> Self {
        self.exit = Some(timing);
        self
    }

    /// Extra delay per entering item, in entering order.
    #[must_use]
    pub fn stagger(mut self, step: Duration) -> Self {
        self.stagger = step;
        self
    }

    /// The initial value of `name` for entering nodes.
    #[must_use]
    pub fn initial(&self, name: &str) -> Option<&Value> {
        self.enter_from.get(name)
    }

    /// Final values of exiting nodes.
    pub fn exit_values(&self) -> impl Iterator<Item = (&AttrName, &Value)> {
        self.exit_to.iter()
    }

    /// Timing of enter transitions, if any.
    #[must_use]
    pub fn enter_timing(&self) -> Option<Timing> {
        self.enter
    }

    /// Timing of update transitions, if any.
    #[must_use]
    pub fn update_timing(&self) -> Option<Timing> {
        self.update
    }

    /// Timing of exit transitions, if any.
    #[must_use]
    pub fn exit_timing(&self) -> Option<Timing> {
        self.exit
    }

    /// Timing of the `nth` entering item, including its stagger delay.
    #[must_use]
    pub fn staggered_enter(&self, nth: u64) -> Option<Timing> {
        self.enter.map(|t| {
            t.with_delay(t.delay.saturating_add(self.stagger.saturating_mul(nth)))
        })
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::vec;
    use core::cell::Cell;

    use super::*;
    use crate::tree::Elem;
    use crate::value::ValueKind;

    #[test]
    fn duplicate_keys_fail_construction() {
        let err = Repeat::new(vec!["a", "b", "a"], |s| *s, |_, _| Tree::Empty).unwrap_err();
        assert_eq!(
            err,
            TreeError::DuplicateKey {
                key: Key::from("a"),
                first: 0,
                second: 2
            }
        );
    }

    #[test]
    fn view_exposes_keys_and_templates_in_order() {
        let repeat = Repeat::new(vec![3_u64, 1, 2], |n| *n, |n, _| {
            Elem::new("circle").attr(Attr::fixed("r", *n as f64)).into()
        })
        .unwrap();
        let keys = repeat.with_view(|view| {
            view.items()
                .map(|item| String::from(view.key(item).as_str()))
                .collect::<Vec<_>>()
        });
        assert_eq!(keys, ["3", "1", "2"]);
        let kinds = repeat.with_view(|view| {
            view.items()
                .filter(|item| matches!(view.template(*item), Tree::Elem(_)))
                .count()
        });
        assert_eq!(kinds, 3);
    }

    #[test]
    fn thunks_capture_item_data() {
        let items = vec![(String::from("a"), 4.0)];
        let repeat = Repeat::new(
            items,
            |(k, _)| k.clone(),
            |(_, v), scope| {
                let v = *v;
                Elem::new("rect")
                    .attr(scope.thunked("width", move || Value::Number(v * 2.0)))
                    .into()
            },
        )
        .unwrap();
        let width = repeat.with_view(|view| {
            let item = view.items().next().unwrap();
            match view.template(item) {
                Tree::Elem(e) => e.attrs()[0].resolve(),
                _ => Value::Number(0.0),
            }
        });
        assert_eq!(width, Value::Number(8.0));
    }

    #[test]
    fn thunks_run_when_the_template_builds() {
        let calls = Rc::new(Cell::new(0_u32));
        let counter = calls.clone();
        let repeat = Repeat::new(vec!["a"], |s| *s, move |_, scope| {
            let counter = counter.clone();
            Elem::new("rect")
                .attr(scope.thunked("width", move || {
                    counter.set(counter.get() + 1);
                    Value::Number(1.0)
                }))
                .into()
        })
        .unwrap();
        let tree = repeat.with_view(|view| {
            let item = view.items().next().unwrap();
            view.template(item)
        });
        assert_eq!(calls.get(), 1);
        if let Tree::Elem(e) = &tree {
            assert_eq!(e.attrs()[0].resolve(), Value::Number(1.0));
            assert_eq!(e.attrs()[0].resolve(), Value::Number(1.0));
        }
        assert_eq!(calls.get(), 1, "resolving does not rerun the thunk");
    }

    #[test]
    fn phase_values_must_interpolate() {
        let err = Phases::new().enter_from("class", "hidden").unwrap_err();
        assert!(matches!(
            err,
            TreeError::NotInterpolable {
                kind: ValueKind::Text,
                ..
            }
        ));
    }

    #[test]
    fn stagger_accumulates_delay() {
        let phases = Phases::new()
            .enter(Timing::millis(100))
            .stagger(Duration::from_millis(20));
        assert_eq!(
            phases.staggered_enter(3).map(|t| t.delay),
            Some(Duration::from_millis(60))
        );
        assert!(Phases::new().staggered_enter(1).is_none());
    }
}
