#![forbid(unsafe_code)]

//! Table binding: a set-valued model with a cell provider, shown by a
//! table target.
//!
//! Rows travel model to target only. Cells are never copied: the target
//! reads and writes them through a shim over the model's cell provider, and
//! the binding turns the provider's `FunctionChanged` into an
//! `update_elements` refresh hint. There is no conversion or validation.
//!
//! | Model event | Target call |
//! |-------------|-------------|
//! | `AddMany` | `add_all(elements)` |
//! | `RemoveMany` | `remove_all(elements)` |
//! | `FunctionChanged` (cells) | `update_elements(elements)` |
//! | `Stale` | none; recorded as [`BindingError::Unsupported`] |

use std::cell::RefCell;
use std::rc::Rc;

use tether_core::{
    CellProvider, ChangeEvent, ChangeKind, ChangeListener, SetObservable, Subscription,
    TableObservable, Value,
};
use tether_i18n::keys;

use super::{
    Binding, BindingCore, BindingEnv, BindingEvent, BindingKind, CopyDirection, PipelineStage,
    weak_listener,
};
use crate::error::BindingError;

/// Installed on the target: reads fall through to the model's provider with
/// `Null` shown as empty text.
struct CellProviderShim {
    cells: Rc<dyn CellProvider>,
}

impl CellProvider for CellProviderShim {
    fn cell_value(&self, element: &Value, column: usize) -> Value {
        match self.cells.cell_value(element, column) {
            Value::Null => Value::text(""),
            value => value,
        }
    }

    fn set_cell_value(&self, element: &Value, column: usize, value: Value) {
        self.cells.set_cell_value(element, column, value);
    }

    fn subscribe(&self, listener: ChangeListener) -> Subscription {
        self.cells.subscribe(listener)
    }
}

struct TableInner {
    core: BindingCore,
    target: Rc<dyn TableObservable>,
    elements: Rc<dyn SetObservable>,
    cells: Rc<dyn CellProvider>,
    subscriptions: RefCell<Vec<Subscription>>,
}

/// Shows the elements of a set in a table, with cells from a provider.
#[derive(Clone)]
pub struct TableBinding {
    inner: Rc<TableInner>,
}

impl TableBinding {
    /// Wire the table and fill it with the model's current elements.
    pub fn new(
        env: BindingEnv,
        target: Rc<dyn TableObservable>,
        elements: Rc<dyn SetObservable>,
        cells: Rc<dyn CellProvider>,
    ) -> Self {
        let inner = Rc::new(TableInner {
            core: BindingCore::new(BindingKind::Table, env),
            target,
            elements,
            cells,
            subscriptions: RefCell::new(Vec::new()),
        });
        let subs = [
            inner
                .elements
                .subscribe(weak_listener(&inner, TableInner::on_elements)),
            inner
                .cells
                .subscribe(weak_listener(&inner, TableInner::on_cells)),
        ];
        inner.subscriptions.borrow_mut().extend(subs);

        let binding = Self { inner };
        binding.refresh_target_from_model();
        binding
    }

    #[must_use]
    pub fn target(&self) -> &Rc<dyn TableObservable> {
        &self.inner.target
    }
}

impl TableInner {
    fn on_elements(&self, ev: &ChangeEvent) {
        match ev.kind {
            ChangeKind::AddMany => self.bulk(ev, ev.new_value.clone()),
            ChangeKind::RemoveMany => self.bulk(ev, ev.old_value.clone()),
            ChangeKind::Stale => self.stale(),
            kind => {
                tracing::trace!(binding = %self.core.id(), %kind, "table model change ignored");
            }
        }
    }

    fn on_cells(&self, ev: &ChangeEvent) {
        if ev.kind != ChangeKind::FunctionChanged {
            return;
        }
        let Some(_guard) = self.core.begin(CopyDirection::ToTarget) else {
            return;
        };
        let changed = into_elements(ev.new_value_or_null());
        tracing::trace!(binding = %self.core.id(), rows = changed.len(), "cell refresh");
        self.target.update_elements(changed);
    }

    fn bulk(&self, ev: &ChangeEvent, payload: Option<Value>) {
        let Some(_guard) = self.core.begin(CopyDirection::ToTarget) else {
            return;
        };
        let payload = payload.unwrap_or_else(|| Value::List(Vec::new()));
        let mut event = BindingEvent::new(ev.clone(), CopyDirection::ToTarget, payload);
        if !self.core.stage(&mut event, PipelineStage::AfterGet) {
            return;
        }
        let elements = into_elements(event.value.clone());
        if ev.kind == ChangeKind::AddMany {
            self.target.add_all(elements);
        } else {
            self.target.remove_all(elements);
        }
        self.core.stage(&mut event, PipelineStage::AfterChange);
    }

    fn stale(&self) {
        let err = BindingError::Unsupported {
            operation: "stale",
            binding: BindingKind::Table.name(),
        };
        tracing::warn!(binding = %self.core.id(), error = %err, "stale table model left as is");
        let message = self.core.env().message(keys::STALE_UNSUPPORTED, &[]);
        self.core.fault(err, message);
    }
}

fn into_elements(value: Value) -> Vec<Value> {
    match value {
        Value::List(items) => items,
        Value::Null => Vec::new(),
        single => vec![single],
    }
}

impl Binding for TableBinding {
    fn core(&self) -> &BindingCore {
        &self.inner.core
    }

    fn refresh_target_from_model(&self) {
        let inner = &self.inner;
        let Some(_guard) = inner.core.begin(CopyDirection::ToTarget) else {
            return;
        };
        inner.target.clear();
        inner.target.add_all(inner.elements.elements());
        inner.target.set_cell_provider(Rc::new(CellProviderShim {
            cells: Rc::clone(&inner.cells),
        }));
    }

    fn dispose(&self) {
        if self.inner.core.retire() {
            self.inner.subscriptions.borrow_mut().clear();
        }
    }
}

impl std::fmt::Debug for TableBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableBinding")
            .field("core", &self.inner.core)
            .field("elements", &self.inner.elements.elements().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::tests::env;
    use crate::binding::{BindingEnv, event_listener};
    use tether_core::{CellStore, TableList, ValueSet};
    use tracing_test::traced_test;

    fn setup() -> (TableList, ValueSet, CellStore, TableBinding, BindingEnv) {
        let target = TableList::new();
        let set = ValueSet::of(["ada", "linus"]);
        let cells = CellStore::new()
            .with_cell("ada", 0, "Ada Lovelace")
            .with_cell("linus", 0, "Linus Torvalds");
        let env = env();
        let binding = TableBinding::new(
            env.clone(),
            Rc::new(target.clone()),
            Rc::new(set.clone()),
            Rc::new(cells.clone()),
        );
        (target, set, cells, binding, env)
    }

    #[test]
    fn construction_fills_rows_and_installs_shim() {
        let (target, _set, _cells, _b, _env) = setup();
        assert_eq!(target.rows(), vec![Value::from("ada"), Value::from("linus")]);
        assert_eq!(target.cell(0, 0), Value::from("Ada Lovelace"));
        assert_eq!(target.cell(0, 7), Value::from(""));
    }

    #[test]
    fn bulk_changes_reach_the_table() {
        let (target, set, _cells, _b, _env) = setup();
        set.add_all(vec!["grace".into()]);
        assert_eq!(target.row_count(), 3);
        set.remove_all(vec!["ada".into(), "linus".into()]);
        assert_eq!(target.rows(), vec![Value::from("grace")]);
    }

    #[test]
    fn listener_can_filter_added_rows() {
        let (target, set, _cells, binding, _env) = setup();
        binding.add_binding_event_listener(event_listener(|ev| {
            if ev.stage == PipelineStage::AfterGet {
                if let Value::List(items) = &mut ev.value {
                    items.retain(|v| v.as_text().is_some_and(|s| !s.starts_with('_')));
                }
            }
            Ok(())
        }));
        set.add_all(vec!["_hidden".into(), "shown".into()]);
        assert_eq!(target.row_count(), 3);
        assert!(target.rows().contains(&Value::from("shown")));
    }

    #[test]
    fn cell_edits_become_refresh_hints() {
        let (target, _set, cells, _b, _env) = setup();
        assert!(target.edit_cell(1, 0, "Linus B. Torvalds"));
        assert_eq!(cells.cell_value(&Value::from("linus"), 0), Value::from("Linus B. Torvalds"));
        assert_eq!(target.take_updates(), vec![Value::from("linus")]);
    }

    #[test]
    #[traced_test]
    fn stale_is_reported_as_unsupported() {
        let (target, set, _cells, binding, env) = setup();
        set.mark_stale();
        assert!(matches!(
            binding.last_fault(),
            Some(BindingError::Unsupported { operation: "stale", .. })
        ));
        assert!(env.messages().final_message_of(binding.id()).is_some());
        assert_eq!(target.row_count(), 2);
        assert!(logs_contain("stale table model left as is"));
    }

    #[test]
    fn dispose_stops_row_updates() {
        let (target, set, _cells, binding, _env) = setup();
        binding.dispose();
        set.insert("grace");
        assert_eq!(target.row_count(), 2);
    }
}
