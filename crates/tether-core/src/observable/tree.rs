#![forbid(unsafe_code)]

//! Lazily populated tree observable.
//!
//! Children are stored per parent node (`None` is the root). A parent whose
//! children were never installed is "not loaded": `children` returns `None`
//! and `expand` fires a `Virtual` request so that whoever owns the data can
//! install them.
//!
//! # Invariants
//!
//! 1. `expand` fires at most one `Virtual` per call, and only for parents
//!    that are not loaded.
//! 2. `set_children` always marks the parent loaded, even with no children.
//! 3. Node identity is value equality.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::batch::notify_or_defer;
use super::{ChangeListener, Disposable, ListenerSet, Subscription, TreeObservable, listener};
use crate::event::{ChangeEvent, ChangeKind};
use crate::value::{Value, ValueType};

type Branch = (Option<Value>, Vec<Value>);

struct TreeInner {
    node_types: Vec<ValueType>,
    branches: RefCell<Vec<Branch>>,
    listeners: ListenerSet,
    disposed: Cell<bool>,
}

/// A shared tree of values keyed by parent node.
#[derive(Clone)]
pub struct TreeNodes {
    inner: Rc<TreeInner>,
}

impl TreeNodes {
    pub fn new(node_types: Vec<ValueType>) -> Self {
        Self {
            inner: Rc::new(TreeInner {
                node_types,
                branches: RefCell::new(Vec::new()),
                listeners: ListenerSet::new(),
                disposed: Cell::new(false),
            }),
        }
    }

    /// Builder-style seed without notification.
    #[must_use]
    pub fn with_children(self, parent: Option<Value>, children: Vec<Value>) -> Self {
        self.install(parent.as_ref(), children);
        self
    }

    pub fn watch(&self, f: impl Fn(&ChangeEvent) + 'static) -> Subscription {
        TreeObservable::subscribe(self, listener(f))
    }

    #[must_use]
    pub fn is_loaded(&self, parent: Option<&Value>) -> bool {
        self.position(parent).is_some()
    }

    /// Request the children of `parent`. Fires `Virtual` when they are not
    /// loaded; returns whether a request was fired.
    pub fn expand(&self, parent: Option<&Value>) -> bool {
        if self.inner.disposed.get() || self.is_loaded(parent) {
            return false;
        }
        tracing::trace!(parent = ?parent, "virtual children requested");
        self.inner
            .listeners
            .notify(&ChangeEvent::new(ChangeKind::Virtual).with_parent(parent.cloned()));
        true
    }

    fn position(&self, parent: Option<&Value>) -> Option<usize> {
        self.inner
            .branches
            .borrow()
            .iter()
            .position(|(p, _)| p.as_ref() == parent)
    }

    fn install(&self, parent: Option<&Value>, children: Vec<Value>) -> Option<Vec<Value>> {
        let pos = self.position(parent);
        let mut branches = self.inner.branches.borrow_mut();
        match pos {
            Some(i) => Some(std::mem::replace(&mut branches[i].1, children)),
            None => {
                branches.push((parent.cloned(), children));
                None
            }
        }
    }

    fn publish(&self, event: ChangeEvent) {
        let inner = Rc::clone(&self.inner);
        notify_or_defer(move || inner.listeners.notify(&event));
    }
}

impl TreeObservable for TreeNodes {
    fn node_types(&self) -> Vec<ValueType> {
        self.inner.node_types.clone()
    }

    fn children(&self, parent: Option<&Value>) -> Option<Vec<Value>> {
        let pos = self.position(parent)?;
        Some(self.inner.branches.borrow()[pos].1.clone())
    }

    fn set_children(&self, parent: Option<&Value>, children: Vec<Value>) {
        if self.inner.disposed.get() {
            return;
        }
        let new = Value::List(children.clone());
        let old = self.install(parent, children);
        if old.as_deref() == new.as_list() {
            return;
        }
        self.publish(
            ChangeEvent::new(ChangeKind::Replace)
                .with_parent(parent.cloned())
                .with_old(old.map(Value::List))
                .with_new(Some(new)),
        );
    }

    fn set_element(&self, parent: Option<&Value>, index: usize, value: Value) -> bool {
        if self.inner.disposed.get() {
            return false;
        }
        let Some(pos) = self.position(parent) else {
            return false;
        };
        let old = {
            let mut branches = self.inner.branches.borrow_mut();
            let Some(slot) = branches[pos].1.get_mut(index) else {
                return false;
            };
            if *slot == value {
                return false;
            }
            std::mem::replace(slot, value.clone())
        };
        self.publish(
            ChangeEvent::changed(old, value)
                .at(index)
                .with_parent(parent.cloned()),
        );
        true
    }

    fn add_element(&self, parent: Option<&Value>, index: usize, value: Value) -> bool {
        if self.inner.disposed.get() {
            return false;
        }
        match self.position(parent) {
            Some(pos) => {
                let mut branches = self.inner.branches.borrow_mut();
                let children = &mut branches[pos].1;
                if index > children.len() {
                    return false;
                }
                children.insert(index, value.clone());
            }
            // An unloaded parent has no children yet; only index 0 fits.
            None if index == 0 => {
                self.install(parent, vec![value.clone()]);
            }
            None => return false,
        }
        self.publish(
            ChangeEvent::new(ChangeKind::Add)
                .at(index)
                .with_new(Some(value))
                .with_parent(parent.cloned()),
        );
        true
    }

    fn remove_element(&self, parent: Option<&Value>, index: usize) -> Option<Value> {
        if self.inner.disposed.get() {
            return None;
        }
        let pos = self.position(parent)?;
        let removed = {
            let mut branches = self.inner.branches.borrow_mut();
            let children = &mut branches[pos].1;
            if index >= children.len() {
                return None;
            }
            children.remove(index)
        };
        self.publish(
            ChangeEvent::new(ChangeKind::Remove)
                .at(index)
                .with_old(Some(removed.clone()))
                .with_parent(parent.cloned()),
        );
        Some(removed)
    }

    fn subscribe(&self, listener: ChangeListener) -> Subscription {
        if self.inner.disposed.get() {
            return Subscription::detached();
        }
        self.inner.listeners.subscribe(listener)
    }
}

impl Disposable for TreeNodes {
    fn dispose(&self) {
        self.inner.disposed.set(true);
        self.inner.listeners.clear();
    }

    fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }
}

impl std::fmt::Debug for TreeNodes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeNodes")
            .field("node_types", &self.inner.node_types)
            .field("loaded_parents", &self.inner.branches.borrow().len())
            .finish()
    }
}
