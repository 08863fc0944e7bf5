#![forbid(unsafe_code)]

//! Per-context registry of validation messages.
//!
//! Every binding reports its latest partial (keystroke-level) and final
//! validation result here, keyed by its [`BindingId`]. The registry keeps
//! both lists in report order and derives three text observables:
//!
//! | Observable | Value |
//! |------------|-------|
//! | `validation_message` | newest final message, or `""` |
//! | `partial_validation_message` | newest partial message, or `""` |
//! | `combined_validation_message` | newest partial if any, else newest final, else `""` |
//!
//! # Invariants
//!
//! 1. At most one partial and one final entry per binding.
//! 2. Reporting a message moves the binding's entry to the newest position;
//!    reporting `None` removes it.
//! 3. The three observables are committed together before any of them
//!    notifies, so no subscriber sees a half-updated triple.

use std::cell::RefCell;

use tether_core::{BatchScope, ValueObservable};

use crate::binding::BindingId;
use crate::validate::ValidationMessage;

type Entries = RefCell<Vec<(BindingId, String)>>;

/// Validation-message registry shared by every binding of a context.
pub struct ValidationMessages {
    partial: Entries,
    finals: Entries,
    validation: ValueObservable,
    partial_validation: ValueObservable,
    combined: ValueObservable,
}

impl Default for ValidationMessages {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationMessages {
    #[must_use]
    pub fn new() -> Self {
        Self {
            partial: RefCell::new(Vec::new()),
            finals: RefCell::new(Vec::new()),
            validation: ValueObservable::text(),
            partial_validation: ValueObservable::text(),
            combined: ValueObservable::text(),
        }
    }

    /// Record (or clear, with `None`) the final validation result of `binding`.
    pub fn update_validation_error(&self, binding: BindingId, message: Option<ValidationMessage>) {
        if store(&self.finals, binding, message) {
            self.publish();
        }
    }

    /// Record (or clear, with `None`) the partial validation result of `binding`.
    pub fn update_partial_validation_error(
        &self,
        binding: BindingId,
        message: Option<ValidationMessage>,
    ) {
        if store(&self.partial, binding, message) {
            self.publish();
        }
    }

    /// Forget both entries of `binding`.
    pub fn clear(&self, binding: BindingId) {
        let a = store(&self.partial, binding, None);
        let b = store(&self.finals, binding, None);
        if a || b {
            self.publish();
        }
    }

    #[must_use]
    pub fn validation_message(&self) -> ValueObservable {
        self.validation.clone()
    }

    #[must_use]
    pub fn partial_validation_message(&self) -> ValueObservable {
        self.partial_validation.clone()
    }

    #[must_use]
    pub fn combined_validation_message(&self) -> ValueObservable {
        self.combined.clone()
    }

    /// The final message currently recorded for `binding`.
    #[must_use]
    pub fn final_message_of(&self, binding: BindingId) -> Option<String> {
        lookup(&self.finals, binding)
    }

    /// The partial message currently recorded for `binding`.
    #[must_use]
    pub fn partial_message_of(&self, binding: BindingId) -> Option<String> {
        lookup(&self.partial, binding)
    }

    fn publish(&self) {
        let newest = |entries: &Entries| entries.borrow().last().map(|(_, m)| m.clone());
        let partial = newest(&self.partial);
        let finals = newest(&self.finals);
        let combined = partial.clone().or_else(|| finals.clone()).unwrap_or_default();

        let _batch = BatchScope::new();
        self.validation.set(finals.unwrap_or_default());
        self.partial_validation.set(partial.unwrap_or_default());
        self.combined.set(combined);
    }
}

/// Replace `binding`'s entry. Returns whether anything changed.
fn store(entries: &Entries, binding: BindingId, message: Option<ValidationMessage>) -> bool {
    let mut entries = entries.borrow_mut();
    let removed = match entries.iter().position(|(id, _)| *id == binding) {
        Some(i) => {
            entries.remove(i);
            true
        }
        None => false,
    };
    let message = message
        .map(ValidationMessage::into_string)
        .filter(|m| !m.is_empty());
    let added = message.is_some();
    if let Some(m) = message {
        entries.push((binding, m));
    }
    removed || added
}

fn lookup(entries: &Entries, binding: BindingId) -> Option<String> {
    entries
        .borrow()
        .iter()
        .find(|(id, _)| *id == binding)
        .map(|(_, m)| m.clone())
}

impl std::fmt::Debug for ValidationMessages {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationMessages")
            .field("partial", &self.partial.borrow().len())
            .field("final", &self.finals.borrow().len())
            .field("combined", &self.combined.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tether_core::Value;

    fn msg(s: &str) -> Option<ValidationMessage> {
        Some(ValidationMessage::from(s))
    }

    #[test]
    fn partial_takes_precedence_over_final() {
        let (a, b) = (BindingId::next(), BindingId::next());
        let m = ValidationMessages::new();
        m.update_validation_error(a, msg("final"));
        assert_eq!(m.combined_validation_message().get(), Value::from("final"));

        m.update_partial_validation_error(b, msg("partial"));
        assert_eq!(m.combined_validation_message().get(), Value::from("partial"));

        m.update_partial_validation_error(b, None);
        assert_eq!(m.combined_validation_message().get(), Value::from("final"));
    }

    #[test]
    fn newest_entry_wins() {
        let (a, b) = (BindingId::next(), BindingId::next());
        let m = ValidationMessages::new();
        m.update_validation_error(a, msg("a"));
        m.update_validation_error(b, msg("b"));
        assert_eq!(m.validation_message().get(), Value::from("b"));

        m.update_validation_error(a, msg("a again"));
        assert_eq!(m.validation_message().get(), Value::from("a again"));

        m.update_validation_error(a, None);
        assert_eq!(m.validation_message().get(), Value::from("b"));
    }

    #[test]
    fn empty_message_counts_as_cleared() {
        let a = BindingId::next();
        let m = ValidationMessages::new();
        m.update_validation_error(a, msg("x"));
        m.update_validation_error(a, msg(""));
        assert_eq!(m.final_message_of(a), None);
        assert_eq!(m.validation_message().get(), Value::from(""));
    }

    #[test]
    fn clear_drops_both_lists() {
        let a = BindingId::next();
        let m = ValidationMessages::new();
        m.update_validation_error(a, msg("f"));
        m.update_partial_validation_error(a, msg("p"));
        m.clear(a);
        assert_eq!(m.combined_validation_message().get(), Value::from(""));
        assert_eq!(m.partial_message_of(a), None);
    }

    #[test]
    fn subscribers_see_a_consistent_triple() {
        let a = BindingId::next();
        let m = Rc::new(ValidationMessages::new());
        m.update_validation_error(a, msg("final"));

        let seen = Rc::new(RefCell::new(Vec::new()));
        let (s, mm) = (Rc::clone(&seen), Rc::clone(&m));
        let _sub = m.combined_validation_message().on_change(move |combined| {
            s.borrow_mut().push((
                combined.clone(),
                mm.partial_validation_message().get(),
                mm.validation_message().get(),
            ));
        });

        m.update_partial_validation_error(a, msg("partial"));
        assert_eq!(
            *seen.borrow(),
            vec![(Value::from("partial"), Value::from("partial"), Value::from("final"))]
        );
    }
}
