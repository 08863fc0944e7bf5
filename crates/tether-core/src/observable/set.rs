#![forbid(unsafe_code)]

//! Duplicate-free element set with bulk change notification.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::batch::notify_or_defer;
use super::{ChangeListener, Disposable, ListenerSet, SetObservable, Subscription, listener};
use crate::event::{ChangeEvent, ChangeKind};
use crate::value::{Value, ValueType};

struct SetInner {
    items: RefCell<Vec<Value>>,
    element_type: Option<ValueType>,
    listeners: ListenerSet,
    disposed: Cell<bool>,
}

/// An insertion-ordered set of values.
///
/// Bulk operations report only the elements that actually changed
/// membership: `add_all` fires one `AddMany`, `remove_all` one `RemoveMany`,
/// and neither fires when nothing changed.
#[derive(Clone)]
pub struct ValueSet {
    inner: Rc<SetInner>,
}

impl ValueSet {
    pub fn new(element_type: Option<ValueType>) -> Self {
        Self {
            inner: Rc::new(SetInner {
                items: RefCell::new(Vec::new()),
                element_type,
                listeners: ListenerSet::new(),
                disposed: Cell::new(false),
            }),
        }
    }

    /// Build a set from values, silently dropping duplicates.
    pub fn of<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let items: Vec<Value> = items.into_iter().map(Into::into).collect();
        let set = Self::new(items.first().and_then(Value::value_type));
        {
            let mut slot = set.inner.items.borrow_mut();
            for item in items {
                if !slot.contains(&item) {
                    slot.push(item);
                }
            }
        }
        set
    }

    pub fn watch(&self, f: impl Fn(&ChangeEvent) + 'static) -> Subscription {
        SetObservable::subscribe(self, listener(f))
    }

    /// Add elements, returning those that were not already present.
    pub fn add_all(&self, elements: Vec<Value>) -> Vec<Value> {
        if self.inner.disposed.get() {
            return Vec::new();
        }
        let added: Vec<Value> = {
            let mut items = self.inner.items.borrow_mut();
            let mut added = Vec::new();
            for element in elements {
                if !items.contains(&element) {
                    items.push(element.clone());
                    added.push(element);
                }
            }
            added
        };
        if !added.is_empty() {
            self.publish(
                ChangeEvent::new(ChangeKind::AddMany).with_new(Some(Value::List(added.clone()))),
            );
        }
        added
    }

    /// Remove elements, returning those that were present.
    pub fn remove_all(&self, elements: Vec<Value>) -> Vec<Value> {
        if self.inner.disposed.get() {
            return Vec::new();
        }
        let removed: Vec<Value> = {
            let mut items = self.inner.items.borrow_mut();
            let mut removed = Vec::new();
            for element in elements {
                if let Some(pos) = items.iter().position(|v| *v == element) {
                    removed.push(items.remove(pos));
                }
            }
            removed
        };
        if !removed.is_empty() {
            self.publish(
                ChangeEvent::new(ChangeKind::RemoveMany)
                    .with_old(Some(Value::List(removed.clone()))),
            );
        }
        removed
    }

    pub fn insert(&self, element: impl Into<Value>) -> bool {
        !self.add_all(vec![element.into()]).is_empty()
    }

    pub fn remove(&self, element: &Value) -> bool {
        !self.remove_all(vec![element.clone()]).is_empty()
    }

    /// Announce that the contents can no longer be trusted.
    pub fn mark_stale(&self) {
        if !self.inner.disposed.get() {
            self.publish(ChangeEvent::new(ChangeKind::Stale));
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.items.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.items.borrow().is_empty()
    }

    fn publish(&self, event: ChangeEvent) {
        let inner = Rc::clone(&self.inner);
        notify_or_defer(move || inner.listeners.notify(&event));
    }
}

impl SetObservable for ValueSet {
    fn element_type(&self) -> Option<ValueType> {
        self.inner.element_type
    }

    fn elements(&self) -> Vec<Value> {
        self.inner.items.borrow().clone()
    }

    fn contains(&self, element: &Value) -> bool {
        self.inner.items.borrow().contains(element)
    }

    fn subscribe(&self, listener: ChangeListener) -> Subscription {
        if self.inner.disposed.get() {
            return Subscription::detached();
        }
        self.inner.listeners.subscribe(listener)
    }
}

impl Disposable for ValueSet {
    fn dispose(&self) {
        self.inner.disposed.set(true);
        self.inner.listeners.clear();
    }

    fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }
}

impl std::fmt::Debug for ValueSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.inner.items.borrow().iter()).finish()
    }
}
