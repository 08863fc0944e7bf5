#![forbid(unsafe_code)]

//! Property tests for the synchronization guarantees.

use std::cell::RefCell;
use std::rc::Rc;

use proptest::prelude::*;
use tether_core::{EventLog, ScalarObservable, Value, ValueObservable, ValueType};
use tether_runtime::{
    Binding, BindSpec, BindingContext, BindingId, ContextConfig, CopyDirection, PipelineStage,
    SyncState, ValidationMessage, ValidationMessages, event_listener,
};

fn context() -> BindingContext {
    BindingContext::with_config(ContextConfig::default().with_locale("en"))
}

#[derive(Debug, Clone)]
enum Edit {
    Target(i64),
    Model(i64),
}

fn edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        (-50i64..50).prop_map(Edit::Target),
        (-50i64..50).prop_map(Edit::Model),
    ]
}

proptest! {
    #[test]
    fn each_edit_commits_at_most_once_on_the_other_side(edits in prop::collection::vec(edit(), 1..40)) {
        let ctx = context();
        let target = ValueObservable::new(0);
        let model = ValueObservable::new(0);
        let binding = ctx.bind(target.clone(), model.clone(), BindSpec::default()).unwrap();

        for edit in edits {
            let (source, other, value) = match edit {
                Edit::Target(v) => (&target, &model, v),
                Edit::Model(v) => (&model, &target, v),
            };
            let before = other.version();
            source.set(value);
            prop_assert!(other.version() - before <= 1);
            prop_assert_eq!(target.get(), model.get());
            prop_assert_eq!(binding.sync_state(), SyncState::Idle);
        }
    }

    #[test]
    fn first_veto_silences_later_listeners(count in 1usize..8, veto_at in 0usize..8) {
        let veto_at = veto_at % count;
        let ctx = context();
        let target = ValueObservable::new(0);
        let model = ValueObservable::new(0);
        let binding = ctx.bind(target.clone(), model.clone(), BindSpec::default()).unwrap();

        let calls = Rc::new(RefCell::new(Vec::new()));
        for i in 0..count {
            let calls = Rc::clone(&calls);
            binding.add_binding_event_listener(event_listener(move |ev| {
                if ev.direction != CopyDirection::ToModel || ev.stage != PipelineStage::AfterGet {
                    return Ok(());
                }
                calls.borrow_mut().push(i);
                if i == veto_at { Err(ValidationMessage::new(format!("listener {i}"))) } else { Ok(()) }
            }));
        }

        target.set(1);
        prop_assert_eq!(model.get(), Value::Int(0));
        prop_assert_eq!(calls.borrow().clone(), (0..=veto_at).collect::<Vec<_>>());
        prop_assert_eq!(ctx.validation_message().get(), Value::text(format!("listener {veto_at}")));
    }

    #[test]
    fn integer_text_round_trips(x in any::<i64>()) {
        let ctx = context();
        let field = ValueObservable::text();
        let model = ValueObservable::typed(Some(ValueType::Int), 0);
        ctx.bind(field.clone(), model.clone(), BindSpec::default()).unwrap();

        field.set(x.to_string());
        prop_assert_eq!(model.get(), Value::Int(x));
        model.set(Value::Int(x));
        prop_assert_eq!(field.get(), Value::text(x.to_string()));
    }

    #[test]
    fn equal_values_converge_without_events(x in any::<i64>()) {
        let ctx = context();
        let target = ValueObservable::new(x);
        let model = ValueObservable::new(x);
        let log = EventLog::new();
        let _t = ScalarObservable::subscribe(&target, log.listener());
        let _m = ScalarObservable::subscribe(&model, log.listener());

        ctx.bind(target, model, BindSpec::default()).unwrap();
        prop_assert!(log.is_empty());
    }

    #[test]
    fn combined_prefers_partial(
        updates in prop::collection::vec((0usize..3, any::<bool>(), prop::option::of("[a-z]{1,6}")), 0..30)
    ) {
        let registry = ValidationMessages::new();
        let ids = [BindingId::next(), BindingId::next(), BindingId::next()];

        for (who, partial, message) in updates {
            let message = message.map(ValidationMessage::new);
            if partial {
                registry.update_partial_validation_error(ids[who], message);
            } else {
                registry.update_validation_error(ids[who], message);
            }

            let partial = registry.partial_validation_message().get();
            let last_final = registry.validation_message().get();
            let expected = if partial == Value::text("") { last_final } else { partial };
            prop_assert_eq!(registry.combined_validation_message().get(), expected);
        }
    }
}
