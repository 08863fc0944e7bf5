#![forbid(unsafe_code)]

//! Reference observables checked against plain `Vec` operations.

use proptest::prelude::*;
use tether_core::{
    BatchScope, ChangeKind, CollectionObservable, EventLog, ListObservable, ScalarObservable,
    SetObservable, Value, ValueObservable, ValueSet, ValueType,
};

#[derive(Debug, Clone)]
enum ListOp {
    Insert(usize, i64),
    Set(usize, i64),
    Remove(usize),
}

fn list_op() -> impl Strategy<Value = ListOp> {
    prop_oneof![
        (0usize..12, -9i64..9).prop_map(|(i, v)| ListOp::Insert(i, v)),
        (0usize..12, -9i64..9).prop_map(|(i, v)| ListOp::Set(i, v)),
        (0usize..12).prop_map(ListOp::Remove),
    ]
}

proptest! {
    #[test]
    fn list_matches_vec(ops in prop::collection::vec(list_op(), 0..60)) {
        let list = ListObservable::new(Some(ValueType::Int));
        let log = EventLog::new();
        let _sub = CollectionObservable::subscribe(&list, log.listener());
        let mut mirror: Vec<Value> = Vec::new();
        let mut inserts = 0;

        for op in ops {
            match op {
                ListOp::Insert(i, v) => {
                    let ok = list.insert_element(i, Value::Int(v));
                    prop_assert_eq!(ok, i <= mirror.len());
                    if ok {
                        mirror.insert(i, Value::Int(v));
                        inserts += 1;
                    }
                }
                ListOp::Set(i, v) => {
                    let changed = mirror.get(i).is_some_and(|old| *old != Value::Int(v));
                    prop_assert_eq!(list.set_element(i, Value::Int(v)), changed);
                    if changed {
                        mirror[i] = Value::Int(v);
                    }
                }
                ListOp::Remove(i) => {
                    let expected = (i < mirror.len()).then(|| mirror.remove(i));
                    prop_assert_eq!(list.remove_element(i), expected);
                }
            }
            prop_assert_eq!(list.to_vec(), mirror.clone());
        }
        prop_assert_eq!(log.of_kind(ChangeKind::Add).len(), inserts);
    }

    #[test]
    fn set_bulk_events_carry_only_real_changes(
        seed in prop::collection::vec(0i64..10, 0..10),
        added in prop::collection::vec(0i64..10, 0..10),
    ) {
        let set = ValueSet::of(seed.clone());
        let log = EventLog::new();
        let _sub = SetObservable::subscribe(&set, log.listener());

        let before = set.elements();
        let fresh = set.add_all(added.into_iter().map(Value::Int).collect());
        for value in &fresh {
            prop_assert!(!before.contains(value));
        }
        match log.of_kind(ChangeKind::AddMany).as_slice() {
            [] => prop_assert!(fresh.is_empty()),
            [event] => prop_assert_eq!(event.new_value.clone(), Some(Value::List(fresh))),
            more => prop_assert!(false, "expected one AddMany, got {}", more.len()),
        }
    }

    #[test]
    fn batched_changes_arrive_after_the_scope(values in prop::collection::vec(any::<i64>(), 1..10)) {
        let cell = ValueObservable::new(i64::MIN);
        let log = EventLog::new();
        let _sub = ScalarObservable::subscribe(&cell, log.listener());

        {
            let _batch = BatchScope::new();
            for v in &values {
                cell.set(*v);
            }
            prop_assert!(log.of_kind(ChangeKind::Change).is_empty());
        }
        let committed = log.of_kind(ChangeKind::Change).len();
        prop_assert_eq!(committed as u64, cell.version());
        prop_assert_eq!(cell.get(), Value::Int(*values.last().unwrap_or(&i64::MIN)));
    }
}
