#![forbid(unsafe_code)]

//! Scalar-to-scalar binding.
//!
//! # Pipeline
//!
//! Target to model (on a committed target change):
//!
//! ```text
//! AfterGet -> is_valid -> AfterValidate -> convert, model.set -> AfterChange
//! ```
//!
//! Model to target (on a committed model change, and on refresh):
//!
//! ```text
//! AfterGet -> convert, target.set -> AfterChange -> is_valid(target value)
//! ```
//!
//! A target `Verify` runs `is_partially_valid` and vetoes the pending change
//! when it fails. The partial result is published either way.

use std::cell::RefCell;
use std::rc::Rc;

use tether_core::{
    ChangeEvent, ChangeKind, ScalarObservable, Subscription, Value, ValueType, type_name,
};

use super::{
    Binding, BindingCore, BindingEnv, BindingEvent, BindingKind, CopyDirection, PipelineStage,
    weak_listener,
};
use crate::convert::{Converter, fits};
use crate::error::BindingError;
use crate::validate::Validator;

struct ValueInner {
    core: BindingCore,
    target: Rc<dyn ScalarObservable>,
    model: Rc<dyn ScalarObservable>,
    converter: Rc<dyn Converter>,
    validator: Rc<dyn Validator>,
    subscriptions: RefCell<Vec<Subscription>>,
}

/// Keeps two scalar observables in sync through a converter and validator.
#[derive(Clone)]
pub struct ValueBinding {
    inner: Rc<ValueInner>,
}

impl ValueBinding {
    /// Wire `target` and `model` and copy the model into the target.
    ///
    /// # Errors
    ///
    /// [`BindingError::IncompatibleConverter`] when the converter's declared
    /// types do not fit the observables.
    pub fn new(
        env: BindingEnv,
        target: Rc<dyn ScalarObservable>,
        model: Rc<dyn ScalarObservable>,
        converter: Rc<dyn Converter>,
        validator: Rc<dyn Validator>,
    ) -> Result<Self, BindingError> {
        check_converter(converter.as_ref(), target.value_type(), model.value_type())?;

        let inner = Rc::new(ValueInner {
            core: BindingCore::new(BindingKind::Value, env),
            target,
            model,
            converter,
            validator,
            subscriptions: RefCell::new(Vec::new()),
        });
        let target_sub = inner
            .target
            .subscribe(weak_listener(&inner, ValueInner::on_target));
        let model_sub = inner
            .model
            .subscribe(weak_listener(&inner, ValueInner::on_model));
        inner
            .subscriptions
            .borrow_mut()
            .extend([target_sub, model_sub]);

        let binding = Self { inner };
        binding.refresh_target_from_model();
        Ok(binding)
    }

    #[must_use]
    pub fn target(&self) -> &Rc<dyn ScalarObservable> {
        &self.inner.target
    }

    #[must_use]
    pub fn model(&self) -> &Rc<dyn ScalarObservable> {
        &self.inner.model
    }

    /// Validate the target's current value and publish the result, without
    /// copying anything.
    pub fn validate_target(&self) {
        let inner = &self.inner;
        inner
            .core
            .report(inner.validator.is_valid(&inner.target.get()).err());
    }

    /// Copy the target into the model, as if the target had just changed.
    pub fn update_model_from_target(&self) {
        let value = self.inner.target.get();
        self.inner
            .target_to_model(ChangeEvent::new(ChangeKind::Change).with_new(Some(value)));
    }
}

pub(crate) fn check_converter(
    converter: &dyn Converter,
    target: Option<ValueType>,
    model: Option<ValueType>,
) -> Result<(), BindingError> {
    let (declared_target, declared_model) = converter.declared_types();
    if fits(declared_target, target) && fits(declared_model, model) {
        return Ok(());
    }
    Err(BindingError::IncompatibleConverter {
        declared_target: type_name(declared_target),
        declared_model: type_name(declared_model),
        target: type_name(target),
        model: type_name(model),
    })
}

/// The source's value now, with `change` brought up to date. A notification
/// delivered after a [`BatchScope`](tether_core::BatchScope) may describe a
/// value the source no longer holds.
fn current(change: &ChangeEvent, source: &dyn ScalarObservable) -> (ChangeEvent, Value) {
    let value = source.get();
    let mut change = change.clone();
    if change.new_value.as_ref() != Some(&value) {
        tracing::trace!(payload = ?change.new_value, current = %value, "stale change payload replaced");
        change.new_value = Some(value.clone());
    }
    (change, value)
}

impl ValueInner {
    fn on_target(&self, ev: &ChangeEvent) {
        if ev.kind == ChangeKind::Verify {
            self.verify_target(ev);
            return;
        }
        if !self.core.is_idle() {
            tracing::trace!(binding = %self.core.id(), kind = %ev.kind, "own target change ignored");
            return;
        }
        self.target_to_model(ev.clone());
    }

    fn on_model(&self, ev: &ChangeEvent) {
        if ev.kind == ChangeKind::Verify {
            return;
        }
        if !self.core.is_idle() {
            tracing::trace!(binding = %self.core.id(), kind = %ev.kind, "own model change ignored");
            return;
        }
        let (change, value) = current(ev, self.model.as_ref());
        self.model_to_target(change, value);
    }

    fn verify_target(&self, ev: &ChangeEvent) {
        if !self.core.is_idle() || self.core.is_disposed() {
            return;
        }
        let result = self.validator.is_partially_valid(&ev.new_value_or_null());
        let rejected = result.is_err();
        self.core.report_partial(result.err());
        if rejected {
            tracing::debug!(binding = %self.core.id(), candidate = %ev.new_value_or_null(), "target change vetoed");
            ev.veto();
        }
    }

    fn target_to_model(&self, change: ChangeEvent) {
        let Some(_guard) = self.core.begin(CopyDirection::ToModel) else {
            return;
        };
        let (change, value) = current(&change, self.target.as_ref());
        let mut event = BindingEvent::new(change, CopyDirection::ToModel, value);

        if !self.core.stage(&mut event, PipelineStage::AfterGet) {
            return;
        }
        let verdict = self.validator.is_valid(&event.value);
        let valid = verdict.is_ok();
        self.core.report(verdict.err());
        if !valid || !self.core.stage(&mut event, PipelineStage::AfterValidate) {
            return;
        }

        let converted = match self.converter.convert_target_to_model(&event.value) {
            Ok(v) => v,
            Err(err) => {
                self.core.conversion_failed(CopyDirection::ToModel, &err);
                return;
            }
        };
        if !self.model.set(converted.clone()) {
            tracing::trace!(binding = %self.core.id(), "model unchanged");
        }
        event.value = converted;
        self.core.stage(&mut event, PipelineStage::AfterChange);
    }

    fn model_to_target(&self, change: ChangeEvent, value: Value) {
        {
            let Some(_guard) = self.core.begin(CopyDirection::ToTarget) else {
                return;
            };
            let mut event = BindingEvent::new(change, CopyDirection::ToTarget, value);
            if !self.core.stage(&mut event, PipelineStage::AfterGet) {
                return;
            }
            let converted = match self.converter.convert_model_to_target(&event.value) {
                Ok(v) => v,
                Err(err) => {
                    self.core.conversion_failed(CopyDirection::ToTarget, &err);
                    return;
                }
            };
            self.target.set(converted.clone());
            event.value = converted;
            if !self.core.stage(&mut event, PipelineStage::AfterChange) {
                return;
            }
        }
        if self.core.env().revalidates() {
            self.core
                .report(self.validator.is_valid(&self.target.get()).err());
        }
    }
}

impl Binding for ValueBinding {
    fn core(&self) -> &BindingCore {
        &self.inner.core
    }

    fn refresh_target_from_model(&self) {
        let value = self.inner.model.get();
        let change = ChangeEvent::new(ChangeKind::Change).with_new(Some(value.clone()));
        self.inner.model_to_target(change, value);
    }

    fn dispose(&self) {
        if self.inner.core.retire() {
            self.inner.subscriptions.borrow_mut().clear();
        }
    }
}

impl std::fmt::Debug for ValueBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueBinding")
            .field("core", &self.inner.core)
            .field("target", &self.inner.target.get())
            .field("model", &self.inner.model.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::tests::env;
    use crate::binding::{SyncState, event_listener};
    use crate::convert::{IdentityConverter, TextConverter};
    use crate::validate::{AlwaysValid, FnValidator, TextValidator};
    use tether_core::ValueObservable;
    use tether_i18n::default_catalog;
    use tracing_test::traced_test;

    fn int_text_binding(
        target: &ValueObservable,
        model: &ValueObservable,
    ) -> (ValueBinding, BindingEnv) {
        let env = env();
        let validator =
            TextValidator::new(ValueType::Int, Rc::new(default_catalog()), "en").unwrap();
        let binding = ValueBinding::new(
            env.clone(),
            Rc::new(target.clone()),
            Rc::new(model.clone()),
            Rc::new(TextConverter::int()),
            Rc::new(validator),
        )
        .unwrap();
        (binding, env)
    }

    #[test]
    fn construction_copies_model_into_target() {
        let target = ValueObservable::text();
        let model = ValueObservable::new(42);
        let _b = int_text_binding(&target, &model);
        assert_eq!(target.get(), Value::from("42"));
    }

    #[test]
    fn target_change_reaches_model_once() {
        let target = ValueObservable::text();
        let model = ValueObservable::new(0);
        let _b = int_text_binding(&target, &model);
        let before = model.version();
        assert!(target.set("17"));
        assert_eq!(model.get(), Value::Int(17));
        assert_eq!(model.version(), before + 1);
        assert_eq!(target.get(), Value::from("17"));
    }

    #[test]
    fn model_change_reaches_target() {
        let target = ValueObservable::text();
        let model = ValueObservable::new(1);
        let _b = int_text_binding(&target, &model);
        model.set(99);
        assert_eq!(target.get(), Value::from("99"));
    }

    #[test]
    fn non_numeric_keystroke_is_vetoed() {
        let target = ValueObservable::text();
        let model = ValueObservable::new(5);
        let (binding, env) = int_text_binding(&target, &model);

        assert!(!target.set("12a"));
        assert_eq!(target.get(), Value::from("5"));
        assert_eq!(model.get(), Value::Int(5));
        assert_eq!(
            env.messages().partial_message_of(binding.id()),
            Some("'12a' is not a whole number".into())
        );
        assert_eq!(binding.sync_state(), SyncState::Idle);
    }

    #[test]
    fn incomplete_input_fails_final_validation() {
        let target = ValueObservable::text();
        let model = ValueObservable::new(5);
        let (binding, env) = int_text_binding(&target, &model);

        assert!(target.set("-"));
        assert_eq!(model.get(), Value::Int(5));
        assert!(env.messages().final_message_of(binding.id()).is_some());

        assert!(target.set("-4"));
        assert_eq!(model.get(), Value::Int(-4));
        assert_eq!(env.messages().final_message_of(binding.id()), None);
    }

    #[test]
    #[traced_test]
    fn conversion_failure_publishes_set_error() {
        let target = ValueObservable::text();
        let model = ValueObservable::new(5);
        let env = env();
        let binding = ValueBinding::new(
            env.clone(),
            Rc::new(target.clone()),
            Rc::new(model.clone()),
            Rc::new(TextConverter::int()),
            Rc::new(AlwaysValid),
        )
        .unwrap();

        target.set("nope");
        assert_eq!(model.get(), Value::Int(5));
        let message = env.messages().final_message_of(binding.id()).unwrap();
        assert!(message.starts_with("Error while setting value"), "{message}");
        assert_eq!(binding.sync_state(), SyncState::Idle);
        assert!(logs_contain("conversion failed"));
    }

    #[test]
    fn listener_veto_stops_the_update() {
        let target = ValueObservable::new(0);
        let model = ValueObservable::new(0);
        let binding = ValueBinding::new(
            env(),
            Rc::new(target.clone()),
            Rc::new(model.clone()),
            Rc::new(IdentityConverter::default()),
            Rc::new(AlwaysValid),
        )
        .unwrap();
        binding.add_binding_event_listener(event_listener(|ev| {
            if ev.direction == CopyDirection::ToModel
                && ev.stage == PipelineStage::AfterValidate
                && ev.value == Value::Int(13)
            {
                Err("unlucky".into())
            } else {
                Ok(())
            }
        }));

        target.set(13);
        assert_eq!(model.get(), Value::Int(0));
        target.set(14);
        assert_eq!(model.get(), Value::Int(14));
    }

    #[test]
    fn listener_may_rewrite_value_in_flight() {
        let target = ValueObservable::new(0);
        let model = ValueObservable::new(0);
        let binding = ValueBinding::new(
            env(),
            Rc::new(target.clone()),
            Rc::new(model.clone()),
            Rc::new(IdentityConverter::default()),
            Rc::new(AlwaysValid),
        )
        .unwrap();
        binding.add_binding_event_listener(event_listener(|ev| {
            if ev.direction == CopyDirection::ToModel && ev.stage == PipelineStage::AfterGet {
                ev.value = Value::Int(ev.value.as_int().unwrap_or_default().clamp(0, 10));
            }
            Ok(())
        }));
        target.set(50);
        assert_eq!(model.get(), Value::Int(10));
    }

    #[test]
    fn incompatible_converter_is_rejected() {
        let err = ValueBinding::new(
            env(),
            Rc::new(ValueObservable::new(true)),
            Rc::new(ValueObservable::new(1)),
            Rc::new(TextConverter::int()),
            Rc::new(AlwaysValid),
        )
        .unwrap_err();
        assert!(matches!(err, BindingError::IncompatibleConverter { .. }));
    }

    #[test]
    fn revalidation_after_model_update() {
        let target = ValueObservable::text();
        let model = ValueObservable::new(3);
        let env = env();
        let binding = ValueBinding::new(
            env.clone(),
            Rc::new(target.clone()),
            Rc::new(model.clone()),
            Rc::new(IdentityConverter::default()),
            Rc::new(FnValidator::new(|v| {
                if v.as_text().is_some_and(|s| s.len() > 3) {
                    Err("too long".into())
                } else {
                    Ok(())
                }
            })),
        )
        .unwrap();
        model.set("abcdef");
        assert_eq!(target.get(), Value::from("abcdef"));
        assert_eq!(
            env.messages().final_message_of(binding.id()),
            Some("too long".into())
        );
    }

    #[test]
    fn dispose_detaches_both_sides() {
        let target = ValueObservable::text();
        let model = ValueObservable::new(1);
        let (binding, _env) = int_text_binding(&target, &model);
        assert_eq!(model.listener_count(), 1);
        binding.dispose();
        assert!(binding.is_disposed());
        assert_eq!(model.listener_count(), 0);
        assert_eq!(target.listener_count(), 0);
        model.set(2);
        assert_eq!(target.get(), Value::from("1"));
    }
}
