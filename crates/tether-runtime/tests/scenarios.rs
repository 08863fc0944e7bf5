#![forbid(unsafe_code)]

//! End-to-end binding scenarios driven through a `BindingContext`.

use tether_core::{
    BatchScope, ChangeKind, CollectionObservable, EventLog, ListObservable, TreeNodes, TreeObservable, Value,
    ValueObservable, ValueType,
};
use tether_runtime::{Binding, BindSpec, BindingContext, ContextConfig, IdentityConverter, SyncState};

fn context() -> BindingContext {
    BindingContext::with_config(ContextConfig::default().with_locale("en"))
}

fn int_field(ctx: &BindingContext, initial: i64) -> (ValueObservable, ValueObservable) {
    let field = ValueObservable::text();
    let model = ValueObservable::typed(Some(ValueType::Int), initial);
    ctx.bind(field.clone(), model.clone(), BindSpec::default())
        .expect("text to int binding");
    (field, model)
}

#[test]
fn rejected_keystroke_leaves_model_alone() {
    let ctx = context();
    let field = ValueObservable::text();
    let model = ValueObservable::typed(Some(ValueType::Int), 12);
    let binding = ctx
        .bind(field.clone(), model.clone(), BindSpec::default())
        .unwrap();

    assert!(!field.set("12a"));
    assert_eq!(model.get(), Value::Int(12));
    assert_eq!(field.get(), Value::from("12"));
    assert_eq!(
        ctx.partial_validation_message().get(),
        Value::from("'12a' is not a whole number")
    );
    assert_eq!(
        ctx.combined_validation_message().get(),
        ctx.partial_validation_message().get()
    );
    assert_eq!(binding.sync_state(), SyncState::Idle);
}

#[test]
fn accepted_input_clears_messages() {
    let ctx = context();
    let (field, model) = int_field(&ctx, 0);

    field.set("4x");
    field.set("-");
    assert_ne!(ctx.validation_message().get(), Value::from(""));
    field.set("-8");
    assert_eq!(model.get(), Value::Int(-8));
    assert_eq!(ctx.validation_message().get(), Value::from(""));
    assert_eq!(ctx.combined_validation_message().get(), Value::from(""));
}

#[test]
fn partial_message_takes_precedence_over_final() {
    let ctx = context();
    let (age, _) = int_field(&ctx, 30);
    let (height, _) = int_field(&ctx, 180);

    age.set("-");
    let final_message = ctx.validation_message().get();
    assert_ne!(final_message, Value::from(""));
    assert_eq!(ctx.combined_validation_message().get(), final_message);

    height.set("18o");
    let partial = ctx.partial_validation_message().get();
    assert_eq!(partial, Value::from("'18o' is not a whole number"));
    assert_eq!(ctx.combined_validation_message().get(), partial);

    height.set("181");
    assert_eq!(ctx.partial_validation_message().get(), Value::from(""));
    assert_eq!(ctx.combined_validation_message().get(), final_message);
}

#[test]
fn collection_insert_propagates_as_one_add() {
    let ctx = context();
    let target = ListObservable::new(Some(ValueType::Int));
    let model = ListObservable::of([1, 2, 3]);
    ctx.bind(
        target.clone(),
        model.clone(),
        BindSpec::default().with_converter(IdentityConverter::default()),
    )
    .unwrap();
    assert_eq!(target.to_vec(), model.to_vec());

    let log = EventLog::new();
    let _sub = CollectionObservable::subscribe(&target, log.listener());
    model.insert_element(1, Value::Int(99));

    assert_eq!(
        target.to_vec(),
        vec![Value::Int(1), Value::Int(99), Value::Int(2), Value::Int(3)]
    );
    let adds = log.of_kind(ChangeKind::Add);
    assert_eq!(adds.len(), 1);
    assert_eq!(adds[0].new_value, Some(Value::Int(99)));
    assert_eq!(log.of_kind(ChangeKind::Change).len(), 0);
}

#[test]
fn binding_equal_values_fires_nothing_more() {
    let ctx = context();
    let target = ValueObservable::new(5);
    let model = ValueObservable::new(5);
    let log = EventLog::new();
    let _t = tether_core::ScalarObservable::subscribe(&target, log.listener());
    let _m = tether_core::ScalarObservable::subscribe(&model, log.listener());

    ctx.bind(target.clone(), model.clone(), BindSpec::default())
        .unwrap();
    assert!(log.is_empty());
    assert_eq!((target.version(), model.version()), (0, 0));
}

#[test]
fn batched_edits_on_both_sides_converge() {
    let ctx = context();
    let target = ValueObservable::new(0);
    let model = ValueObservable::new(0);
    let binding = ctx
        .bind(target.clone(), model.clone(), BindSpec::default())
        .unwrap();

    {
        let _batch = BatchScope::new();
        assert!(target.set(5));
        assert!(model.set(7));
    }
    assert_eq!(target.get(), model.get());
    assert_eq!(model.get(), Value::Int(5));
    assert_eq!(binding.sync_state(), SyncState::Idle);
}

#[test]
fn batched_model_edits_reach_the_field_as_last_written() {
    let ctx = context();
    let (field, model) = int_field(&ctx, 1);

    {
        let _batch = BatchScope::new();
        model.set(2);
        model.set(3);
    }
    assert_eq!(field.get(), Value::from("3"));
    assert_eq!(model.get(), Value::Int(3));
}

#[test]
fn virtual_request_is_answered_during_a_propagated_change() {
    let ctx = context();
    let parent = Value::from("src");
    let model = TreeNodes::new(vec![ValueType::Text])
        .with_children(None, vec![Value::from("README"), parent.clone()])
        .with_children(Some(parent.clone()), vec![Value::from("lib.rs")]);
    let target = ctx.create_tree(vec![ValueType::Text]);
    ctx.bind(target.clone(), model.clone(), BindSpec::default())
        .unwrap();
    assert!(!target.is_loaded(Some(&parent)));

    let view = target.clone();
    let expand_at = parent.clone();
    let _renderer = target.watch(move |ev| {
        if ev.kind == ChangeKind::Change {
            view.expand(Some(&expand_at));
        }
    });
    model.set_element(None, 0, Value::from("README.md"));

    assert_eq!(
        target.children(None),
        Some(vec![Value::from("README.md"), parent.clone()])
    );
    assert_eq!(
        target.children(Some(&parent)),
        Some(vec![Value::from("lib.rs")])
    );
}

#[test]
fn table_rows_follow_the_model_set() {
    use tether_core::{CellStore, TableList, ValueSet};

    let ctx = context();
    let rows = ValueSet::of(["ada", "grace"]);
    let cells = CellStore::new().with_cell("ada", 0, "Lovelace");
    let table = TableList::new();
    ctx.bind(table.clone(), (rows.clone(), cells), BindSpec::default())
        .unwrap();

    assert_eq!(table.cell(0, 0), Value::from("Lovelace"));
    assert_eq!(table.cell(1, 0), Value::from(""));
    rows.insert("linus");
    assert_eq!(table.row_count(), 3);
}

#[test]
fn disposing_the_context_detaches_everything() {
    let ctx = context();
    let (field, model) = int_field(&ctx, 1);
    let owned = ctx.create_list(Some(ValueType::Int), vec![Value::Int(1)]);
    let mirror = ListObservable::new(Some(ValueType::Int));
    ctx.bind(mirror.clone(), owned.clone(), BindSpec::default())
        .unwrap();

    ctx.dispose();
    field.set("7");
    assert_eq!(model.get(), Value::Int(1));
    assert!(!owned.push(2));
    assert_eq!(mirror.to_vec(), vec![Value::Int(1)]);
    assert_eq!(ctx.binding_count(), 0);
}

#[test]
fn explicit_identity_round_trips() {
    let ctx = context();
    let target = ValueObservable::typed(None, Value::Null);
    let model = ValueObservable::typed(None, Value::Null);
    ctx.bind(
        target.clone(),
        model.clone(),
        BindSpec::default().with_converter(IdentityConverter::default()),
    )
    .unwrap();

    for value in [Value::from("x"), Value::Int(3), Value::list([true, false])] {
        target.set(value.clone());
        assert_eq!(model.get(), value);
    }
}
