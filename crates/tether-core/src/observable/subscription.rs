#![forbid(unsafe_code)]

//! Listener storage and RAII subscriptions.
//!
//! Observables keep listeners as `Weak` pointers; the [`Subscription`]
//! returned to the subscriber owns the only strong reference. Dropping the
//! subscription therefore detaches the listener without the observable
//! having to be told. Dead entries are pruned lazily during notification.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::event::ChangeEvent;

/// A change listener as stored by observables.
pub type ChangeListener = Rc<dyn Fn(&ChangeEvent)>;

/// Wrap a closure as a [`ChangeListener`].
pub fn listener(f: impl Fn(&ChangeEvent) + 'static) -> ChangeListener {
    Rc::new(f)
}

/// RAII guard for a registered listener. Dropping it unsubscribes.
#[must_use = "dropping a Subscription immediately detaches the listener"]
pub struct Subscription {
    _listener: Option<ChangeListener>,
}

impl Subscription {
    pub(crate) fn new(listener: ChangeListener) -> Self {
        Self {
            _listener: Some(listener),
        }
    }

    /// A subscription that holds nothing (for disposed observables).
    pub fn detached() -> Self {
        Self { _listener: None }
    }

    /// Whether this subscription still keeps a listener alive.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self._listener.is_some()
    }

    /// Explicitly detach the listener.
    pub fn unsubscribe(self) {}
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Ordered set of weakly held listeners.
#[derive(Default)]
pub struct ListenerSet {
    entries: RefCell<Vec<Weak<dyn Fn(&ChangeEvent)>>>,
}

impl ListenerSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener`, returning the guard that keeps it alive.
    pub fn subscribe(&self, listener: ChangeListener) -> Subscription {
        self.entries.borrow_mut().push(Rc::downgrade(&listener));
        Subscription::new(listener)
    }

    /// Call every live listener in registration order.
    ///
    /// The listener list is snapshotted first, so listeners may subscribe,
    /// unsubscribe, or mutate the observable re-entrantly.
    pub fn notify(&self, event: &ChangeEvent) {
        let live: Vec<ChangeListener> = {
            let mut entries = self.entries.borrow_mut();
            entries.retain(|w| w.strong_count() > 0);
            entries.iter().filter_map(Weak::upgrade).collect()
        };
        for l in live {
            l(event);
        }
    }

    /// Number of listeners still alive.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .borrow()
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget every listener. Outstanding subscriptions become inert.
    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

impl std::fmt::Debug for ListenerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerSet")
            .field("live", &self.len())
            .finish()
    }
}
