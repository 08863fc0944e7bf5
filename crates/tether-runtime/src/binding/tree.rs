#![forbid(unsafe_code)]

//! Tree binding with on-demand subtree loading.
//!
//! Only the root level is copied eagerly. Deeper levels arrive when either
//! side fires `Virtual` for a parent whose children it has not loaded; the
//! binding answers by installing the other side's children for that parent.
//!
//! # Re-entrancy
//!
//! Unlike the other variants, a tree binding tracks a depth instead of a
//! single flag. `Change`, `Add`, `Remove` and `Replace` are ignored while any
//! propagation is in flight, but `Virtual` is always honoured, so a renderer
//! that expands a node from inside a change notification still gets its
//! children.
//!
//! There is no conversion or validation; node values are copied as they are.

use std::cell::RefCell;
use std::rc::Rc;

use tether_core::{
    ChangeEvent, ChangeKind, Position, Subscription, TreeObservable, Value, ValueType, type_name,
};
use tether_i18n::keys;

use super::{
    Binding, BindingCore, BindingEnv, BindingEvent, BindingKind, CopyDirection, PipelineStage,
    SyncState, weak_listener,
};
use crate::error::BindingError;

struct TreeInner {
    core: BindingCore,
    target: Rc<dyn TreeObservable>,
    model: Rc<dyn TreeObservable>,
    /// Directions of the propagations currently in flight, outermost first.
    active: RefCell<Vec<CopyDirection>>,
    subscriptions: RefCell<Vec<Subscription>>,
}

/// Pops the direction pushed by [`TreeInner::enter`].
struct DepthGuard<'a> {
    active: &'a RefCell<Vec<CopyDirection>>,
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.active.borrow_mut().pop();
    }
}

/// Keeps two trees in sync, loading subtrees lazily.
#[derive(Clone)]
pub struct TreeBinding {
    inner: Rc<TreeInner>,
}

impl TreeBinding {
    /// Wire the trees and copy the model's root level into the target.
    ///
    /// # Errors
    ///
    /// [`BindingError::IncompatibleNodeTypes`] when some model node type is
    /// not assignable to any target node type.
    pub fn new(
        env: BindingEnv,
        target: Rc<dyn TreeObservable>,
        model: Rc<dyn TreeObservable>,
    ) -> Result<Self, BindingError> {
        check_node_types(&target.node_types(), &model.node_types())?;

        let inner = Rc::new(TreeInner {
            core: BindingCore::new(BindingKind::Tree, env),
            target,
            model,
            active: RefCell::new(Vec::new()),
            subscriptions: RefCell::new(Vec::new()),
        });
        let target_sub = inner
            .target
            .subscribe(weak_listener(&inner, TreeInner::on_target));
        let model_sub = inner
            .model
            .subscribe(weak_listener(&inner, TreeInner::on_model));
        inner
            .subscriptions
            .borrow_mut()
            .extend([target_sub, model_sub]);

        let binding = Self { inner };
        binding.refresh_target_from_model();
        Ok(binding)
    }

    #[must_use]
    pub fn target(&self) -> &Rc<dyn TreeObservable> {
        &self.inner.target
    }

    #[must_use]
    pub fn model(&self) -> &Rc<dyn TreeObservable> {
        &self.inner.model
    }

    /// Number of propagations currently in flight on this binding.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.inner.active.borrow().len()
    }
}

fn check_node_types(target: &[ValueType], model: &[ValueType]) -> Result<(), BindingError> {
    match model
        .iter()
        .find(|m| !target.iter().any(|t| t.is_assignable_from(**m)))
    {
        Some(orphan) => Err(BindingError::IncompatibleNodeTypes {
            node_type: orphan.name(),
        }),
        None => Ok(()),
    }
}

impl TreeInner {
    fn enter(&self, direction: CopyDirection) -> Option<DepthGuard<'_>> {
        if self.core.is_disposed() {
            return None;
        }
        self.active.borrow_mut().push(direction);
        Some(DepthGuard {
            active: &self.active,
        })
    }

    fn is_busy(&self) -> bool {
        !self.active.borrow().is_empty()
    }

    /// The side a propagation in `direction` writes to.
    fn destination(&self, direction: CopyDirection) -> &Rc<dyn TreeObservable> {
        match direction {
            CopyDirection::ToModel => &self.model,
            CopyDirection::ToTarget => &self.target,
        }
    }

    fn source(&self, direction: CopyDirection) -> &Rc<dyn TreeObservable> {
        match direction {
            CopyDirection::ToModel => &self.target,
            CopyDirection::ToTarget => &self.model,
        }
    }

    fn on_target(&self, ev: &ChangeEvent) {
        self.dispatch(ev, CopyDirection::ToModel);
    }

    fn on_model(&self, ev: &ChangeEvent) {
        self.dispatch(ev, CopyDirection::ToTarget);
    }

    /// `outgoing` is the direction a change on the notifying side travels.
    fn dispatch(&self, ev: &ChangeEvent, outgoing: CopyDirection) {
        match ev.kind {
            ChangeKind::Verify => {}
            // The requesting side is filled from its counterpart.
            ChangeKind::Virtual => self.load_children(ev.parent.as_ref(), reverse(outgoing)),
            kind if self.is_busy() => {
                tracing::trace!(binding = %self.core.id(), %kind, depth = self.active.borrow().len(), "own tree change ignored");
            }
            _ => self.apply(ev, outgoing),
        }
    }

    fn load_children(&self, parent: Option<&Value>, direction: CopyDirection) {
        let Some(_guard) = self.enter(direction) else {
            return;
        };
        let children = self.source(direction).children(parent).unwrap_or_default();
        tracing::trace!(binding = %self.core.id(), parent = ?parent, %direction, count = children.len(), "virtual children installed");
        self.destination(direction).set_children(parent, children);
    }

    fn apply(&self, ev: &ChangeEvent, direction: CopyDirection) {
        let Some(_guard) = self.enter(direction) else {
            return;
        };
        let parent = ev.parent.as_ref();
        let dst = self.destination(direction);
        let element_edit = matches!(
            ev.kind,
            ChangeKind::Change | ChangeKind::Add | ChangeKind::Remove
        );
        if element_edit && dst.children(parent).is_none() {
            // The destination loads this level through its own Virtual request.
            tracing::trace!(binding = %self.core.id(), kind = %ev.kind, parent = ?parent, %direction, "edit under unloaded parent skipped");
            return;
        }
        match (ev.kind, ev.position) {
            (ChangeKind::Change, Position::Index(index)) => {
                let Some(event) = self.before(ev, direction, ev.new_value_or_null()) else {
                    return;
                };
                dst.set_element(parent, index, event.value.clone());
                self.after(event);
            }
            (ChangeKind::Add, Position::Index(index)) => {
                let Some(event) = self.before(ev, direction, ev.new_value_or_null()) else {
                    return;
                };
                dst.add_element(parent, index, event.value.clone());
                self.after(event);
            }
            (ChangeKind::Remove, Position::Index(index)) => {
                let removed = ev.old_value.clone().unwrap_or_default();
                let Some(event) = self.before(ev, direction, removed) else {
                    return;
                };
                dst.remove_element(parent, index);
                self.after(event);
            }
            (ChangeKind::Replace, _) => self.replace(ev, direction),
            (kind, position) => {
                tracing::trace!(binding = %self.core.id(), %kind, ?position, "tree change ignored");
            }
        }
    }

    fn replace(&self, ev: &ChangeEvent, direction: CopyDirection) {
        let payload = ev.new_value_or_null();
        if payload.as_list().is_none() {
            self.unrecognized(&payload);
            return;
        }
        let Some(event) = self.before(ev, direction, payload) else {
            return;
        };
        let Some(children) = event.value.as_list().map(<[Value]>::to_vec) else {
            self.unrecognized(&event.value);
            return;
        };
        self.destination(direction)
            .set_children(ev.parent.as_ref(), children);
        self.after(event);
    }

    fn unrecognized(&self, payload: &Value) {
        let found = type_name(payload.value_type());
        let err = BindingError::UnrecognizedPayload { found };
        tracing::error!(binding = %self.core.id(), error = %err, "tree replace rejected");
        let message = self
            .core
            .env()
            .message(keys::UNRECOGNIZED_PAYLOAD, &[("kind", found)]);
        self.core.fault(err, message);
    }

    fn before(
        &self,
        ev: &ChangeEvent,
        direction: CopyDirection,
        value: Value,
    ) -> Option<BindingEvent> {
        let mut event = BindingEvent::new(ev.clone(), direction, value);
        self.core
            .stage(&mut event, PipelineStage::AfterGet)
            .then_some(event)
    }

    fn after(&self, mut event: BindingEvent) {
        self.core.stage(&mut event, PipelineStage::AfterChange);
    }
}

fn reverse(direction: CopyDirection) -> CopyDirection {
    match direction {
        CopyDirection::ToModel => CopyDirection::ToTarget,
        CopyDirection::ToTarget => CopyDirection::ToModel,
    }
}

impl Binding for TreeBinding {
    fn core(&self) -> &BindingCore {
        &self.inner.core
    }

    fn refresh_target_from_model(&self) {
        let inner = &self.inner;
        let Some(_guard) = inner.enter(CopyDirection::ToTarget) else {
            return;
        };
        let roots = inner.model.children(None).unwrap_or_default();
        tracing::trace!(binding = %inner.core.id(), count = roots.len(), "root level copied");
        inner.target.set_children(None, roots);
    }

    fn dispose(&self) {
        if self.inner.core.retire() {
            self.inner.subscriptions.borrow_mut().clear();
        }
    }

    fn sync_state(&self) -> SyncState {
        self.inner
            .active
            .borrow()
            .first()
            .map_or(SyncState::Idle, |d| SyncState::Propagating(*d))
    }
}

impl std::fmt::Debug for TreeBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeBinding")
            .field("core", &self.inner.core)
            .field("depth", &self.depth())
            .finish()
    }
}
