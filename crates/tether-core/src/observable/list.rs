#![forbid(unsafe_code)]

//! Ordered collection observable.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::batch::notify_or_defer;
use super::{
    ChangeListener, CollectionObservable, Disposable, ListenerSet, Subscription, listener,
};
use crate::event::{ChangeEvent, ChangeKind};
use crate::value::{Value, ValueType};

struct ListInner {
    items: RefCell<Vec<Value>>,
    element_type: Option<ValueType>,
    listeners: ListenerSet,
    disposed: Cell<bool>,
}

/// A shared list of values with element-level change notification.
///
/// | Operation | Events |
/// |-----------|--------|
/// | `set_element` | `Verify(i)`, `Change(i)` |
/// | `insert_element` | `Verify(i)`, `Add(i)` |
/// | `remove_element` | `Remove(i)` |
/// | `set_elements` | `Verify(whole)`, `Change(whole)` |
#[derive(Clone)]
pub struct ListObservable {
    inner: Rc<ListInner>,
}

impl ListObservable {
    pub fn new(element_type: Option<ValueType>) -> Self {
        Self::from_values(element_type, Vec::new())
    }

    pub fn from_values(element_type: Option<ValueType>, items: Vec<Value>) -> Self {
        Self {
            inner: Rc::new(ListInner {
                items: RefCell::new(items),
                element_type,
                listeners: ListenerSet::new(),
                disposed: Cell::new(false),
            }),
        }
    }

    /// Build from anything convertible into values; the element type is
    /// taken from the first item.
    pub fn of<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let items: Vec<Value> = items.into_iter().map(Into::into).collect();
        let ty = items.first().and_then(Value::value_type);
        Self::from_values(ty, items)
    }

    pub fn watch(&self, f: impl Fn(&ChangeEvent) + 'static) -> Subscription {
        CollectionObservable::subscribe(self, listener(f))
    }

    /// Append an element.
    pub fn push(&self, value: impl Into<Value>) -> bool {
        let len = self.size();
        self.insert_element(len, value.into())
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<Value> {
        self.inner.items.borrow().clone()
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }

    fn live(&self) -> bool {
        if self.inner.disposed.get() {
            tracing::debug!("mutation on disposed list observable ignored");
            return false;
        }
        true
    }

    fn verify(&self, event: ChangeEvent) -> bool {
        self.inner.listeners.notify(&event);
        if event.is_vetoed() {
            tracing::debug!(position = ?event.position, "list change vetoed");
            return false;
        }
        true
    }

    fn publish(&self, event: ChangeEvent) {
        let inner = Rc::clone(&self.inner);
        notify_or_defer(move || inner.listeners.notify(&event));
    }
}

impl CollectionObservable for ListObservable {
    fn element_type(&self) -> Option<ValueType> {
        self.inner.element_type
    }

    fn size(&self) -> usize {
        self.inner.items.borrow().len()
    }

    fn element(&self, index: usize) -> Option<Value> {
        self.inner.items.borrow().get(index).cloned()
    }

    fn elements(&self) -> Vec<Value> {
        self.to_vec()
    }

    fn set_element(&self, index: usize, value: Value) -> bool {
        if !self.live() {
            return false;
        }
        let Some(current) = self.element(index) else {
            return false;
        };
        if current == value {
            return false;
        }
        if !self.verify(ChangeEvent::verify(Some(current), value.clone()).at(index)) {
            return false;
        }
        let old = {
            let mut items = self.inner.items.borrow_mut();
            let Some(slot) = items.get_mut(index) else {
                return false;
            };
            std::mem::replace(slot, value.clone())
        };
        self.publish(ChangeEvent::changed(old, value).at(index));
        true
    }

    fn insert_element(&self, index: usize, value: Value) -> bool {
        if !self.live() || index > self.size() {
            return false;
        }
        if !self.verify(ChangeEvent::verify(None, value.clone()).at(index)) {
            return false;
        }
        {
            let mut items = self.inner.items.borrow_mut();
            if index > items.len() {
                return false;
            }
            items.insert(index, value.clone());
        }
        self.publish(
            ChangeEvent::new(ChangeKind::Add)
                .at(index)
                .with_new(Some(value)),
        );
        true
    }

    fn remove_element(&self, index: usize) -> Option<Value> {
        if !self.live() || index >= self.size() {
            return None;
        }
        let removed = self.inner.items.borrow_mut().remove(index);
        self.publish(
            ChangeEvent::new(ChangeKind::Remove)
                .at(index)
                .with_old(Some(removed.clone())),
        );
        Some(removed)
    }

    fn set_elements(&self, values: Vec<Value>) -> bool {
        if !self.live() {
            return false;
        }
        let current = self.to_vec();
        if current == values {
            return false;
        }
        let candidate = Value::List(values.clone());
        if !self.verify(ChangeEvent::verify(Some(Value::List(current)), candidate.clone())) {
            return false;
        }
        let old = self.inner.items.replace(values);
        self.publish(ChangeEvent::changed(Value::List(old), candidate));
        true
    }

    fn subscribe(&self, listener: ChangeListener) -> Subscription {
        if self.inner.disposed.get() {
            return Subscription::detached();
        }
        self.inner.listeners.subscribe(listener)
    }
}

impl Disposable for ListObservable {
    fn dispose(&self) {
        self.inner.disposed.set(true);
        self.inner.listeners.clear();
    }

    fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }
}

impl std::fmt::Debug for ListObservable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.inner.items.borrow().iter()).finish()
    }
}
