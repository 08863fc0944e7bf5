#![forbid(unsafe_code)]

//! Collection-to-collection binding.
//!
//! Element changes are replayed one by one on the counterpart; a change at
//! `Position::Whole` copies the full element list.
//!
//! | Source event | Counterpart call | Validated |
//! |--------------|------------------|-----------|
//! | `Change(i)` | `set_element(i, v)` | yes |
//! | `Add(i)` | `insert_element(i, v)` | yes |
//! | `Remove(i)` | `remove_element(i)` | no |
//! | `Change(whole)` | `set_elements(all)` | every element |
//!
//! An element payload that no longer matches the source (a notification
//! released late by a `BatchScope`) is answered with a whole copy.
//!
//! Only target-originated changes are validated and only target `Verify`
//! events can be vetoed. Conversion failures are handled as in
//! [`ValueBinding`](super::ValueBinding): the update is dropped and the
//! localized set-error message is published.

use std::cell::RefCell;
use std::rc::Rc;

use tether_core::{ChangeEvent, ChangeKind, CollectionObservable, Position, Subscription, Value};

use super::value::check_converter;
use super::{
    Binding, BindingCore, BindingEnv, BindingEvent, BindingKind, CopyDirection, PipelineStage,
    weak_listener,
};
use crate::convert::Converter;
use crate::error::{BindingError, ConversionError};
use crate::validate::{ValidationMessage, Validator};

struct CollectionInner {
    core: BindingCore,
    target: Rc<dyn CollectionObservable>,
    model: Rc<dyn CollectionObservable>,
    converter: Rc<dyn Converter>,
    validator: Rc<dyn Validator>,
    subscriptions: RefCell<Vec<Subscription>>,
}

/// Keeps two ordered collections in sync, element by element.
#[derive(Clone)]
pub struct CollectionBinding {
    inner: Rc<CollectionInner>,
}

impl CollectionBinding {
    /// Wire `target` and `model` and copy every model element into the target.
    ///
    /// # Errors
    ///
    /// [`BindingError::IncompatibleConverter`] when the converter's declared
    /// types do not fit the element types.
    pub fn new(
        env: BindingEnv,
        target: Rc<dyn CollectionObservable>,
        model: Rc<dyn CollectionObservable>,
        converter: Rc<dyn Converter>,
        validator: Rc<dyn Validator>,
    ) -> Result<Self, BindingError> {
        check_converter(converter.as_ref(), target.element_type(), model.element_type())?;

        let inner = Rc::new(CollectionInner {
            core: BindingCore::new(BindingKind::Collection, env),
            target,
            model,
            converter,
            validator,
            subscriptions: RefCell::new(Vec::new()),
        });
        let subs = [
            inner
                .target
                .subscribe(weak_listener(&inner, CollectionInner::on_target)),
            inner
                .model
                .subscribe(weak_listener(&inner, CollectionInner::on_model)),
        ];
        inner.subscriptions.borrow_mut().extend(subs);

        let binding = Self { inner };
        binding.refresh_target_from_model();
        Ok(binding)
    }

    #[must_use]
    pub fn target(&self) -> &Rc<dyn CollectionObservable> {
        &self.inner.target
    }

    #[must_use]
    pub fn model(&self) -> &Rc<dyn CollectionObservable> {
        &self.inner.model
    }

    /// Copy every target element into the model.
    pub fn update_model_from_target(&self) {
        let all = Value::List(self.inner.target.elements());
        self.inner.propagate(
            &ChangeEvent::new(ChangeKind::Change).with_new(Some(all)),
            CopyDirection::ToModel,
        );
    }
}

impl CollectionInner {
    fn on_target(&self, ev: &ChangeEvent) {
        if ev.kind == ChangeKind::Verify {
            self.verify_target(ev);
        } else {
            self.propagate(ev, CopyDirection::ToModel);
        }
    }

    fn on_model(&self, ev: &ChangeEvent) {
        if ev.kind != ChangeKind::Verify {
            self.propagate(ev, CopyDirection::ToTarget);
        }
    }

    fn verify_target(&self, ev: &ChangeEvent) {
        if !self.core.is_idle() || self.core.is_disposed() {
            return;
        }
        let result = match (&ev.position, ev.new_value_or_null()) {
            (Position::Whole, Value::List(items)) => items
                .iter()
                .try_for_each(|v| self.validator.is_partially_valid(v)),
            (_, candidate) => self.validator.is_partially_valid(&candidate),
        };
        let rejected = result.is_err();
        self.core.report_partial(result.err());
        if rejected {
            tracing::debug!(binding = %self.core.id(), position = ?ev.position, "target element change vetoed");
            ev.veto();
        }
    }

    fn source(&self, direction: CopyDirection) -> &dyn CollectionObservable {
        match direction {
            CopyDirection::ToModel => self.target.as_ref(),
            CopyDirection::ToTarget => self.model.as_ref(),
        }
    }

    fn destination(&self, direction: CopyDirection) -> &dyn CollectionObservable {
        match direction {
            CopyDirection::ToModel => self.model.as_ref(),
            CopyDirection::ToTarget => self.target.as_ref(),
        }
    }

    fn convert(&self, direction: CopyDirection, value: &Value) -> Result<Value, ConversionError> {
        match direction {
            CopyDirection::ToModel => self.converter.convert_target_to_model(value),
            CopyDirection::ToTarget => self.converter.convert_model_to_target(value),
        }
    }

    /// Final validation: before conversion toward the model, after the
    /// write toward the target (when re-validation is enabled).
    fn validate_all<'a>(
        &self,
        values: impl IntoIterator<Item = &'a Value>,
    ) -> Result<(), ValidationMessage> {
        values
            .into_iter()
            .try_for_each(|v| self.validator.is_valid(v))
    }

    fn propagate(&self, ev: &ChangeEvent, direction: CopyDirection) {
        let revalidate = {
            let Some(_guard) = self.core.begin(direction) else {
                return;
            };
            match (ev.kind, ev.position) {
                (ChangeKind::Change, Position::Whole) => self.replace_all(ev, direction),
                (ChangeKind::Change | ChangeKind::Add, Position::Index(index)) => {
                    if self.source(direction).element(index) == ev.new_value {
                        self.copy_element(ev, direction, index)
                    } else {
                        // Delivered late (batched): the source moved on since.
                        tracing::trace!(binding = %self.core.id(), kind = %ev.kind, index, "stale element payload, copying whole collection");
                        self.replace_all(ev, direction)
                    }
                }
                (ChangeKind::Remove, Position::Index(index)) => {
                    self.remove_element(ev, direction, index);
                    None
                }
                (kind, position) => {
                    tracing::trace!(binding = %self.core.id(), %kind, ?position, "collection change without counterpart ignored");
                    None
                }
            }
        };
        if let Some(values) = revalidate {
            if self.core.env().revalidates() {
                self.core.report(self.validate_all(&values).err());
            }
        }
    }

    /// Runs the pipeline for one value. Returns the converted value, or
    /// `None` when vetoed, invalid, or unconvertible.
    fn validate_and_convert(
        &self,
        event: &mut BindingEvent,
        direction: CopyDirection,
    ) -> Option<Value> {
        if !self.core.stage(event, PipelineStage::AfterGet) {
            return None;
        }
        if direction == CopyDirection::ToModel {
            let values: Vec<&Value> = match &event.value {
                Value::List(items) if event.change.position == Position::Whole => {
                    items.iter().collect()
                }
                single => vec![single],
            };
            let verdict = self.validate_all(values);
            let valid = verdict.is_ok();
            self.core.report(verdict.err());
            if !valid || !self.core.stage(event, PipelineStage::AfterValidate) {
                return None;
            }
        }
        let converted = match (&event.value, event.change.position) {
            (Value::List(items), Position::Whole) => items
                .iter()
                .map(|v| self.convert(direction, v))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            (single, _) => self.convert(direction, single),
        };
        match converted {
            Ok(v) => Some(v),
            Err(err) => {
                self.core.conversion_failed(direction, &err);
                None
            }
        }
    }

    fn copy_element(
        &self,
        ev: &ChangeEvent,
        direction: CopyDirection,
        index: usize,
    ) -> Option<Vec<Value>> {
        let mut event = BindingEvent::new(ev.clone(), direction, ev.new_value_or_null());
        let converted = self.validate_and_convert(&mut event, direction)?;
        let destination = self.destination(direction);
        let committed = match ev.kind {
            ChangeKind::Add => destination.insert_element(index, converted.clone()),
            _ => destination.set_element(index, converted.clone()),
        };
        if !committed {
            tracing::debug!(binding = %self.core.id(), index, %direction, "destination rejected element");
        }
        event.value = converted.clone();
        if !self.core.stage(&mut event, PipelineStage::AfterChange) {
            return None;
        }
        (direction == CopyDirection::ToTarget).then(|| vec![converted])
    }

    fn remove_element(&self, ev: &ChangeEvent, direction: CopyDirection, index: usize) {
        let removed = ev.old_value.clone().unwrap_or_default();
        let mut event = BindingEvent::new(ev.clone(), direction, removed);
        if !self.core.stage(&mut event, PipelineStage::AfterGet) {
            return;
        }
        if self.destination(direction).remove_element(index).is_none() {
            tracing::debug!(binding = %self.core.id(), index, %direction, "nothing to remove");
        }
        self.core.stage(&mut event, PipelineStage::AfterChange);
    }

    fn replace_all(&self, ev: &ChangeEvent, direction: CopyDirection) -> Option<Vec<Value>> {
        let all = Value::List(self.source(direction).elements());
        let mut change = ev.clone();
        change.kind = ChangeKind::Change;
        change.position = Position::Whole;
        change.new_value = Some(all.clone());
        let mut event = BindingEvent::new(change, direction, all);
        let converted = match self.validate_and_convert(&mut event, direction)? {
            Value::List(items) => items,
            single => vec![single],
        };
        self.destination(direction).set_elements(converted.clone());
        event.value = Value::List(converted.clone());
        if !self.core.stage(&mut event, PipelineStage::AfterChange) {
            return None;
        }
        (direction == CopyDirection::ToTarget).then_some(converted)
    }
}

impl Binding for CollectionBinding {
    fn core(&self) -> &BindingCore {
        &self.inner.core
    }

    fn refresh_target_from_model(&self) {
        let all = Value::List(self.inner.model.elements());
        self.inner.propagate(
            &ChangeEvent::new(ChangeKind::Change).with_new(Some(all)),
            CopyDirection::ToTarget,
        );
    }

    fn dispose(&self) {
        if self.inner.core.retire() {
            self.inner.subscriptions.borrow_mut().clear();
        }
    }
}

impl std::fmt::Debug for CollectionBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionBinding")
            .field("core", &self.inner.core)
            .field("target_size", &self.inner.target.size())
            .field("model_size", &self.inner.model.size())
            .finish()
    }
}
