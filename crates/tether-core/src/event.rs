#![forbid(unsafe_code)]

//! Change events raised by observables.
//!
//! A [`ChangeEvent`] describes one mutation (or one pending mutation, for
//! [`ChangeKind::Verify`]) of an observable. The set of kinds is closed: the
//! binding engine matches on it exhaustively.
//!
//! # Payload conventions
//!
//! | Kind | `old_value` | `new_value` |
//! |------|-------------|-------------|
//! | `Verify` | current value | candidate value |
//! | `Change` | previous value | committed value |
//! | `Add` | - | inserted element |
//! | `Remove` | removed element | - |
//! | `AddMany` | - | `List` of added elements |
//! | `RemoveMany` | `List` of removed elements | - |
//! | `Replace` | previous children | new children (normally a `List`) |
//! | `Virtual` | - | - |
//! | `Stale` | - | - |
//! | `FunctionChanged` | - | `List` of elements whose cells changed |
//!
//! # Invariants
//!
//! 1. The veto flag can only be raised while `kind == Verify`.
//! 2. A vetoed event stays vetoed; later listeners cannot clear it.

use core::cell::Cell;
use core::fmt;

use crate::value::Value;

/// The closed set of change kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// A change is about to happen and may be vetoed.
    Verify,
    /// A value (or one element) was replaced.
    Change,
    /// One element was inserted.
    Add,
    /// One element was removed.
    Remove,
    /// Several elements were added to a set.
    AddMany,
    /// Several elements were removed from a set.
    RemoveMany,
    /// All children of a tree node were replaced.
    Replace,
    /// Children of a tree node are requested on demand.
    Virtual,
    /// The observable's contents can no longer be trusted.
    Stale,
    /// Derived cell values changed for some elements.
    FunctionChanged,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Verify => "verify",
            Self::Change => "change",
            Self::Add => "add",
            Self::Remove => "remove",
            Self::AddMany => "add-many",
            Self::RemoveMany => "remove-many",
            Self::Replace => "replace",
            Self::Virtual => "virtual",
            Self::Stale => "stale",
            Self::FunctionChanged => "function-changed",
        };
        f.write_str(name)
    }
}

/// Where in the observable a change happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Position {
    /// The whole observable (scalar values, full replacement).
    #[default]
    Whole,
    /// A single element index.
    Index(usize),
}

impl Position {
    #[must_use]
    pub fn index(self) -> Option<usize> {
        match self {
            Self::Whole => None,
            Self::Index(i) => Some(i),
        }
    }
}

/// A change notification. Immutable at dispatch except for the veto flag.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub position: Position,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
    /// Tree parent node; `None` for flat observables and tree roots.
    pub parent: Option<Value>,
    veto: Cell<bool>,
}

impl ChangeEvent {
    /// Create an event with no payload.
    #[must_use]
    pub fn new(kind: ChangeKind) -> Self {
        Self {
            kind,
            position: Position::Whole,
            old_value: None,
            new_value: None,
            parent: None,
            veto: Cell::new(false),
        }
    }

    /// A vetoable announcement that `candidate` is about to replace `current`.
    #[must_use]
    pub fn verify(current: Option<Value>, candidate: Value) -> Self {
        Self::new(ChangeKind::Verify)
            .with_old(current)
            .with_new(Some(candidate))
    }

    /// A committed whole-value change.
    #[must_use]
    pub fn changed(old: Value, new: Value) -> Self {
        Self::new(ChangeKind::Change)
            .with_old(Some(old))
            .with_new(Some(new))
    }

    #[must_use]
    pub fn at(mut self, index: usize) -> Self {
        self.position = Position::Index(index);
        self
    }

    #[must_use]
    pub fn with_old(mut self, old: Option<Value>) -> Self {
        self.old_value = old;
        self
    }

    #[must_use]
    pub fn with_new(mut self, new: Option<Value>) -> Self {
        self.new_value = new;
        self
    }

    #[must_use]
    pub fn with_parent(mut self, parent: Option<Value>) -> Self {
        self.parent = parent;
        self
    }

    /// Reject the pending change. Ignored unless this is a `Verify` event.
    pub fn veto(&self) {
        if self.kind == ChangeKind::Verify {
            self.veto.set(true);
        } else {
            tracing::debug!(kind = %self.kind, "veto ignored outside verify phase");
        }
    }

    #[must_use]
    pub fn is_vetoed(&self) -> bool {
        self.veto.get()
    }

    /// The new value, or `Null` when the event carries none.
    #[must_use]
    pub fn new_value_or_null(&self) -> Value {
        self.new_value.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn veto_only_applies_during_verify() {
        let verify = ChangeEvent::verify(None, Value::from(1));
        verify.veto();
        assert!(verify.is_vetoed());

        let change = ChangeEvent::changed(Value::from(1), Value::from(2));
        change.veto();
        assert!(!change.is_vetoed());
    }

    #[test]
    fn builder_sets_position_and_parent() {
        let ev = ChangeEvent::new(ChangeKind::Add)
            .at(3)
            .with_new(Some(Value::from("x")))
            .with_parent(Some(Value::from("root")));
        assert_eq!(ev.position, Position::Index(3));
        assert_eq!(ev.position.index(), Some(3));
        assert_eq!(ev.parent, Some(Value::from("root")));
        assert_eq!(ev.new_value_or_null(), Value::from("x"));
    }

    #[test]
    fn kind_display_is_kebab_case() {
        assert_eq!(ChangeKind::FunctionChanged.to_string(), "function-changed");
        assert_eq!(ChangeKind::AddMany.to_string(), "add-many");
    }
}
