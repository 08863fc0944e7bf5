#![forbid(unsafe_code)]

//! Deferred change notification.
//!
//! While a [`BatchScope`] is alive on the current thread, reference
//! observables commit values immediately but queue their post-commit
//! notifications. The queue is flushed, in order, when the outermost scope
//! is dropped. `Verify` notifications are never deferred because a veto must
//! be known before the commit.
//!
//! # Invariants
//!
//! 1. Nested scopes are allowed; only the outermost drop flushes.
//! 2. Notifications queued during a flush run in the same flush.
//! 3. Outside any scope, notifications run inline.

use std::cell::RefCell;
use std::marker::PhantomData;

type Deferred = Box<dyn FnOnce()>;

#[derive(Default)]
struct BatchState {
    depth: usize,
    pending: Vec<Deferred>,
}

thread_local! {
    static BATCH: RefCell<BatchState> = RefCell::new(BatchState::default());
}

/// RAII guard deferring observable notifications until it is dropped.
#[must_use = "notifications flush as soon as the scope is dropped"]
pub struct BatchScope {
    // Thread-bound: the queue lives in a thread-local.
    _not_send: PhantomData<*const ()>,
}

impl BatchScope {
    /// Open a batch scope on the current thread.
    pub fn new() -> Self {
        BATCH.with(|b| b.borrow_mut().depth += 1);
        Self {
            _not_send: PhantomData,
        }
    }

    /// Whether any batch scope is open on this thread.
    #[must_use]
    pub fn is_active() -> bool {
        BATCH.with(|b| b.borrow().depth > 0)
    }

    /// Number of notifications waiting for the outermost scope.
    #[must_use]
    pub fn pending() -> usize {
        BATCH.with(|b| b.borrow().pending.len())
    }
}

impl Default for BatchScope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for BatchScope {
    fn drop(&mut self) {
        let outermost = BATCH.with(|b| {
            let mut state = b.borrow_mut();
            state.depth -= 1;
            state.depth == 0
        });
        if !outermost {
            return;
        }
        loop {
            let batch = BATCH.with(|b| std::mem::take(&mut b.borrow_mut().pending));
            if batch.is_empty() {
                break;
            }
            for notify in batch {
                notify();
            }
        }
    }
}

impl std::fmt::Debug for BatchScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchScope")
            .field("pending", &Self::pending())
            .finish()
    }
}

/// Run `notify` now, or queue it if a batch scope is open.
pub(crate) fn notify_or_defer(notify: impl FnOnce() + 'static) {
    let queued = BATCH.with(|b| {
        let mut state = b.borrow_mut();
        if state.depth > 0 {
            state.pending.push(Box::new(notify));
            None
        } else {
            Some(notify)
        }
    });
    if let Some(notify) = queued {
        notify();
    }
}
