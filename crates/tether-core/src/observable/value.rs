#![forbid(unsafe_code)]

//! Version-tracked scalar observable.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::batch::notify_or_defer;
use super::{ChangeListener, Disposable, ListenerSet, ScalarObservable, Subscription, listener};
use crate::event::{ChangeEvent, ChangeKind};
use crate::value::{Value, ValueType};

struct ValueInner {
    value: RefCell<Value>,
    value_type: Option<ValueType>,
    version: Cell<u64>,
    listeners: ListenerSet,
    disposed: Cell<bool>,
}

/// A shared, version-tracked value with change notification.
///
/// `set` runs the verify phase first: any listener may veto the candidate,
/// in which case nothing is committed. Setting an equal value is a no-op.
#[derive(Clone)]
pub struct ValueObservable {
    inner: Rc<ValueInner>,
}

impl ValueObservable {
    /// Create an observable whose declared type is the type of `value`.
    pub fn new(value: impl Into<Value>) -> Self {
        let value = value.into();
        Self::typed(value.value_type(), value)
    }

    /// Create an observable with an explicit declared type.
    pub fn typed(value_type: Option<ValueType>, value: impl Into<Value>) -> Self {
        Self {
            inner: Rc::new(ValueInner {
                value: RefCell::new(value.into()),
                value_type,
                version: Cell::new(0),
                listeners: ListenerSet::new(),
                disposed: Cell::new(false),
            }),
        }
    }

    /// An empty text observable, as used for validation messages.
    #[must_use]
    pub fn text() -> Self {
        Self::typed(Some(ValueType::Text), Value::text(""))
    }

    #[must_use]
    pub fn get(&self) -> Value {
        self.inner.value.borrow().clone()
    }

    /// Borrow the current value without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&Value) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Set the value, running the verify phase. Returns `true` when committed.
    pub fn set(&self, value: impl Into<Value>) -> bool {
        let value = value.into();
        if self.inner.disposed.get() {
            tracing::debug!("set on disposed value observable ignored");
            return false;
        }
        if *self.inner.value.borrow() == value {
            return false;
        }

        let verify = ChangeEvent::verify(Some(self.get()), value.clone());
        self.inner.listeners.notify(&verify);
        if verify.is_vetoed() {
            tracing::debug!(candidate = %value, "value change vetoed");
            return false;
        }

        let old = self.inner.value.replace(value.clone());
        self.inner.version.set(self.inner.version.get() + 1);
        let event = ChangeEvent::changed(old, value);
        let inner = Rc::clone(&self.inner);
        notify_or_defer(move || inner.listeners.notify(&event));
        true
    }

    /// Number of committed changes so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    /// Subscribe a closure to every event, verify included.
    pub fn watch(&self, f: impl Fn(&ChangeEvent) + 'static) -> Subscription {
        ScalarObservable::subscribe(self, listener(f))
    }

    /// Subscribe a closure to committed values only.
    pub fn on_change(&self, f: impl Fn(&Value) + 'static) -> Subscription {
        self.watch(move |ev| {
            if ev.kind == ChangeKind::Change {
                if let Some(v) = &ev.new_value {
                    f(v);
                }
            }
        })
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }

    /// Whether two handles share the same state.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl ScalarObservable for ValueObservable {
    fn value_type(&self) -> Option<ValueType> {
        self.inner.value_type
    }

    fn get(&self) -> Value {
        ValueObservable::get(self)
    }

    fn set(&self, value: Value) -> bool {
        ValueObservable::set(self, value)
    }

    fn subscribe(&self, listener: ChangeListener) -> Subscription {
        if self.inner.disposed.get() {
            return Subscription::detached();
        }
        self.inner.listeners.subscribe(listener)
    }
}

impl Disposable for ValueObservable {
    fn dispose(&self) {
        self.inner.disposed.set(true);
        self.inner.listeners.clear();
    }

    fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }
}

impl std::fmt::Debug for ValueObservable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueObservable")
            .field("value", &*self.inner.value.borrow())
            .field("version", &self.inner.version.get())
            .finish()
    }
}
