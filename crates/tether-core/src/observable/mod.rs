#![forbid(unsafe_code)]

//! Observable contracts and in-memory reference observables.
//!
//! The binding engine only depends on the traits in this module:
//!
//! - [`ScalarObservable`]: a single value with get/set.
//! - [`CollectionObservable`]: an ordered, index-addressable collection.
//! - [`SetObservable`] plus [`CellProvider`]: an unordered element set with a
//!   per-(element, column) cell function; the model side of a table binding.
//! - [`TableObservable`]: a tabular target fed by bulk add/remove.
//! - [`TreeObservable`]: a lazily populated hierarchy keyed by parent node.
//!
//! Every contract exposes `subscribe`, returning a [`Subscription`] that
//! detaches the listener when dropped.
//!
//! The concrete types ([`ValueObservable`], [`ListObservable`], [`ValueSet`],
//! [`CellStore`], [`TableList`], [`TreeNodes`]) are single-threaded
//! `Rc<..>`-backed implementations. Cloning one yields another handle to the
//! same state.
//!
//! # Invariants
//!
//! 1. Listeners are notified in registration order.
//! 2. A mutation that does not change anything fires no event.
//! 3. A vetoed `Verify` prevents the commit; nothing else is notified.
//! 4. A disposed observable ignores mutations and holds no listeners.

use std::rc::Rc;

use crate::event::ChangeEvent;
use crate::value::{Value, ValueType};

pub mod batch;
pub mod list;
pub mod set;
pub mod subscription;
pub mod table;
pub mod tree;
pub mod value;

pub use batch::BatchScope;
pub use list::ListObservable;
pub use set::ValueSet;
pub use subscription::{ChangeListener, ListenerSet, Subscription, listener};
pub use table::{CellStore, TableList};
pub use tree::TreeNodes;
pub use value::ValueObservable;

/// Explicit teardown for observables owned by a binding context.
pub trait Disposable {
    /// Drop all listeners and refuse further mutation.
    fn dispose(&self);

    fn is_disposed(&self) -> bool;
}

/// A single observable value.
pub trait ScalarObservable {
    /// Declared type of the value, `None` when unknown.
    fn value_type(&self) -> Option<ValueType>;

    fn get(&self) -> Value;

    /// Replace the value. Returns `true` when the change was committed.
    fn set(&self, value: Value) -> bool;

    fn subscribe(&self, listener: ChangeListener) -> Subscription;
}

/// An ordered collection addressed by index.
pub trait CollectionObservable {
    fn element_type(&self) -> Option<ValueType>;

    fn size(&self) -> usize;

    fn element(&self, index: usize) -> Option<Value>;

    fn elements(&self) -> Vec<Value>;

    /// Replace the element at `index`. Returns `true` when committed.
    fn set_element(&self, index: usize, value: Value) -> bool;

    /// Insert before `index` (`index == size()` appends). Returns `true` when committed.
    fn insert_element(&self, index: usize, value: Value) -> bool;

    fn remove_element(&self, index: usize) -> Option<Value>;

    /// Replace the whole content. Returns `true` when committed.
    fn set_elements(&self, values: Vec<Value>) -> bool;

    fn subscribe(&self, listener: ChangeListener) -> Subscription;
}

/// An unordered, duplicate-free element set.
pub trait SetObservable {
    fn element_type(&self) -> Option<ValueType>;

    fn elements(&self) -> Vec<Value>;

    fn contains(&self, element: &Value) -> bool;

    fn subscribe(&self, listener: ChangeListener) -> Subscription;
}

/// Cell values for (element, column) pairs.
pub trait CellProvider {
    /// The cell value; `Null` when the provider has nothing for the cell.
    fn cell_value(&self, element: &Value, column: usize) -> Value;

    fn set_cell_value(&self, element: &Value, column: usize, value: Value);

    /// Listen for `FunctionChanged` events.
    fn subscribe(&self, listener: ChangeListener) -> Subscription;
}

/// A tabular target: rows are elements, cells come from a [`CellProvider`].
pub trait TableObservable {
    fn clear(&self);

    fn add_all(&self, elements: Vec<Value>);

    fn remove_all(&self, elements: Vec<Value>);

    /// Hint that the cells of `elements` must be re-read.
    fn update_elements(&self, elements: Vec<Value>);

    fn set_cell_provider(&self, provider: Rc<dyn CellProvider>);

    fn subscribe(&self, listener: ChangeListener) -> Subscription;
}

/// A hierarchy whose children are addressed by parent node (`None` = root).
pub trait TreeObservable {
    /// Node types this tree may hold.
    fn node_types(&self) -> Vec<ValueType>;

    /// Children of `parent`, or `None` when they have not been loaded yet.
    fn children(&self, parent: Option<&Value>) -> Option<Vec<Value>>;

    /// Replace all children of `parent`.
    fn set_children(&self, parent: Option<&Value>, children: Vec<Value>);

    fn set_element(&self, parent: Option<&Value>, index: usize, value: Value) -> bool;

    fn add_element(&self, parent: Option<&Value>, index: usize, value: Value) -> bool;

    fn remove_element(&self, parent: Option<&Value>, index: usize) -> Option<Value>;

    fn subscribe(&self, listener: ChangeListener) -> Subscription;
}

/// Convenience for tests and glue code: collect every event an observable fires.
#[derive(Default, Clone)]
pub struct EventLog {
    events: Rc<std::cell::RefCell<Vec<ChangeEvent>>>,
}

impl EventLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A listener that appends to this log.
    #[must_use]
    pub fn listener(&self) -> ChangeListener {
        let events = Rc::clone(&self.events);
        listener(move |ev| events.borrow_mut().push(ev.clone()))
    }

    #[must_use]
    pub fn events(&self) -> Vec<ChangeEvent> {
        self.events.borrow().clone()
    }

    /// Events of the given kind.
    #[must_use]
    pub fn of_kind(&self, kind: crate::event::ChangeKind) -> Vec<ChangeEvent> {
        self.events
            .borrow()
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl std::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLog").field("len", &self.len()).finish()
    }
}
