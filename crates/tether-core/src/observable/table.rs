#![forbid(unsafe_code)]

//! Tabular reference observables: a cell store and a table target.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::batch::notify_or_defer;
use super::{
    CellProvider, ChangeListener, Disposable, ListenerSet, Subscription, TableObservable, listener,
};
use crate::event::{ChangeEvent, ChangeKind};
use crate::value::Value;

// ---------------------------------------------------------------------------
// CellStore
// ---------------------------------------------------------------------------

#[derive(Default)]
struct CellInner {
    cells: RefCell<Vec<(Value, usize, Value)>>,
    listeners: ListenerSet,
}

/// A [`CellProvider`] backed by an (element, column) -> value table.
///
/// `set_cell_value` fires `FunctionChanged` with the changed element when the
/// stored value actually changes.
#[derive(Clone, Default)]
pub struct CellStore {
    inner: Rc<CellInner>,
}

impl CellStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style seed without notification.
    #[must_use]
    pub fn with_cell(self, element: impl Into<Value>, column: usize, value: impl Into<Value>) -> Self {
        self.inner
            .cells
            .borrow_mut()
            .push((element.into(), column, value.into()));
        self
    }

    pub fn watch(&self, f: impl Fn(&ChangeEvent) + 'static) -> Subscription {
        CellProvider::subscribe(self, listener(f))
    }
}

impl CellProvider for CellStore {
    fn cell_value(&self, element: &Value, column: usize) -> Value {
        self.inner
            .cells
            .borrow()
            .iter()
            .find(|(e, c, _)| e == element && *c == column)
            .map(|(_, _, v)| v.clone())
            .unwrap_or_default()
    }

    fn set_cell_value(&self, element: &Value, column: usize, value: Value) {
        let changed = {
            let mut cells = self.inner.cells.borrow_mut();
            let pos = cells
                .iter()
                .position(|(e, c, _)| e == element && *c == column);
            match pos {
                Some(i) if cells[i].2 == value => false,
                Some(i) => {
                    cells[i].2 = value;
                    true
                }
                None => {
                    cells.push((element.clone(), column, value));
                    true
                }
            }
        };
        if changed {
            let event = ChangeEvent::new(ChangeKind::FunctionChanged)
                .with_new(Some(Value::List(vec![element.clone()])));
            let inner = Rc::clone(&self.inner);
            notify_or_defer(move || inner.listeners.notify(&event));
        }
    }

    fn subscribe(&self, listener: ChangeListener) -> Subscription {
        self.inner.listeners.subscribe(listener)
    }
}

impl std::fmt::Debug for CellStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CellStore")
            .field("cells", &self.inner.cells.borrow().len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// TableList
// ---------------------------------------------------------------------------

struct TableInner {
    rows: RefCell<Vec<Value>>,
    provider: RefCell<Option<Rc<dyn CellProvider>>>,
    updates: RefCell<Vec<Value>>,
    listeners: ListenerSet,
    disposed: Cell<bool>,
}

/// A table target holding rows and reading cells through an installed
/// [`CellProvider`].
///
/// Update hints passed to `update_elements` are recorded so callers (and
/// tests) can see which rows a renderer would have refreshed.
#[derive(Clone)]
pub struct TableList {
    inner: Rc<TableInner>,
}

impl Default for TableList {
    fn default() -> Self {
        Self::new()
    }
}

impl TableList {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(TableInner {
                rows: RefCell::new(Vec::new()),
                provider: RefCell::new(None),
                updates: RefCell::new(Vec::new()),
                listeners: ListenerSet::new(),
                disposed: Cell::new(false),
            }),
        }
    }

    #[must_use]
    pub fn rows(&self) -> Vec<Value> {
        self.inner.rows.borrow().clone()
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.inner.rows.borrow().len()
    }

    /// Read a cell through the installed provider; `Null` without one.
    #[must_use]
    pub fn cell(&self, row: usize, column: usize) -> Value {
        let Some(element) = self.inner.rows.borrow().get(row).cloned() else {
            return Value::Null;
        };
        let provider = self.inner.provider.borrow().clone();
        provider.map_or(Value::Null, |p| p.cell_value(&element, column))
    }

    /// Write a cell through the installed provider, as an editor would.
    pub fn edit_cell(&self, row: usize, column: usize, value: impl Into<Value>) -> bool {
        let Some(element) = self.inner.rows.borrow().get(row).cloned() else {
            return false;
        };
        let provider = self.inner.provider.borrow().clone();
        match provider {
            Some(p) => {
                p.set_cell_value(&element, column, value.into());
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn has_cell_provider(&self) -> bool {
        self.inner.provider.borrow().is_some()
    }

    /// Drain the recorded update hints.
    pub fn take_updates(&self) -> Vec<Value> {
        std::mem::take(&mut *self.inner.updates.borrow_mut())
    }

    pub fn watch(&self, f: impl Fn(&ChangeEvent) + 'static) -> Subscription {
        TableObservable::subscribe(self, listener(f))
    }

    fn publish(&self, event: ChangeEvent) {
        let inner = Rc::clone(&self.inner);
        notify_or_defer(move || inner.listeners.notify(&event));
    }
}

impl TableObservable for TableList {
    fn clear(&self) {
        if self.inner.disposed.get() {
            return;
        }
        let old = std::mem::take(&mut *self.inner.rows.borrow_mut());
        if !old.is_empty() {
            self.publish(ChangeEvent::new(ChangeKind::RemoveMany).with_old(Some(Value::List(old))));
        }
    }

    fn add_all(&self, elements: Vec<Value>) {
        if self.inner.disposed.get() {
            return;
        }
        let added: Vec<Value> = {
            let mut rows = self.inner.rows.borrow_mut();
            let mut added = Vec::new();
            for element in elements {
                if !rows.contains(&element) {
                    rows.push(element.clone());
                    added.push(element);
                }
            }
            added
        };
        if !added.is_empty() {
            self.publish(ChangeEvent::new(ChangeKind::AddMany).with_new(Some(Value::List(added))));
        }
    }

    fn remove_all(&self, elements: Vec<Value>) {
        if self.inner.disposed.get() {
            return;
        }
        let removed: Vec<Value> = {
            let mut rows = self.inner.rows.borrow_mut();
            let mut removed = Vec::new();
            for element in elements {
                if let Some(pos) = rows.iter().position(|r| *r == element) {
                    removed.push(rows.remove(pos));
                }
            }
            removed
        };
        if !removed.is_empty() {
            self.publish(
                ChangeEvent::new(ChangeKind::RemoveMany).with_old(Some(Value::List(removed))),
            );
        }
    }

    fn update_elements(&self, elements: Vec<Value>) {
        if self.inner.disposed.get() {
            return;
        }
        self.inner.updates.borrow_mut().extend(elements.iter().cloned());
        self.publish(
            ChangeEvent::new(ChangeKind::FunctionChanged).with_new(Some(Value::List(elements))),
        );
    }

    fn set_cell_provider(&self, provider: Rc<dyn CellProvider>) {
        *self.inner.provider.borrow_mut() = Some(provider);
    }

    fn subscribe(&self, listener: ChangeListener) -> Subscription {
        if self.inner.disposed.get() {
            return Subscription::detached();
        }
        self.inner.listeners.subscribe(listener)
    }
}

impl Disposable for TableList {
    fn dispose(&self) {
        self.inner.disposed.set(true);
        self.inner.listeners.clear();
        *self.inner.provider.borrow_mut() = None;
    }

    fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }
}

impl std::fmt::Debug for TableList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableList")
            .field("rows", &self.inner.rows.borrow().len())
            .field("has_provider", &self.has_cell_provider())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observable::EventLog;

    #[test]
    fn cell_store_fires_function_changed_on_real_change() {
        let cells = CellStore::new().with_cell("alice", 0, "Alice");
        let log = EventLog::new();
        let _sub = CellProvider::subscribe(&cells, log.listener());

        cells.set_cell_value(&Value::from("alice"), 0, Value::from("Alice"));
        assert!(log.is_empty());

        cells.set_cell_value(&Value::from("alice"), 0, Value::from("Alicia"));
        let ev = &log.of_kind(ChangeKind::FunctionChanged)[0];
        assert_eq!(ev.new_value, Some(Value::list(["alice"])));
        assert_eq!(cells.cell_value(&Value::from("alice"), 0), Value::from("Alicia"));
    }

    #[test]
    fn missing_cell_is_null() {
        let cells = CellStore::new();
        assert_eq!(cells.cell_value(&Value::from("x"), 3), Value::Null);
    }

    #[test]
    fn table_reads_and_writes_through_provider() {
        let cells = CellStore::new().with_cell(1, 0, "one");
        let table = TableList::new();
        table.add_all(vec![Value::Int(1)]);
        assert_eq!(table.cell(0, 0), Value::Null);

        table.set_cell_provider(Rc::new(cells.clone()));
        assert_eq!(table.cell(0, 0), Value::from("one"));
        assert!(table.edit_cell(0, 0, "uno"));
        assert_eq!(cells.cell_value(&Value::Int(1), 0), Value::from("uno"));
    }

    #[test]
    fn update_hints_are_recorded() {
        let table = TableList::new();
        table.update_elements(vec![Value::Int(4)]);
        assert_eq!(table.take_updates(), vec![Value::Int(4)]);
        assert!(table.take_updates().is_empty());
    }

    #[test]
    fn clear_then_add_all_skips_duplicates() {
        let table = TableList::new();
        table.add_all(vec![Value::Int(1), Value::Int(1), Value::Int(2)]);
        assert_eq!(table.row_count(), 2);
        table.clear();
        assert_eq!(table.row_count(), 0);
    }
}
