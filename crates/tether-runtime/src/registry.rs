#![forbid(unsafe_code)]

//! Converter and validator resolution.
//!
//! A [`SupportRegistry`] asks its factories, newest first, for a converter
//! or validator between a target type and a model type. The first factory
//! that answers wins; if none does, the question goes to the parent
//! registry.
//!
//! # Invariants
//!
//! 1. A factory registered later shadows earlier ones for the pairs it
//!    answers, and only those.
//! 2. A child registry never changes what its parent resolves.
//! 3. Resolution is pure: the same registry state gives the same answer.

use std::cell::RefCell;
use std::rc::Rc;

use tether_core::ValueType;
use tether_i18n::{Locale, MessageCatalog};

use crate::convert::{Converter, Flipped, IdentityConverter, TextConverter};
use crate::validate::{AlwaysValid, TextValidator, Validator};

/// Supplies converters and validators for type pairs.
///
/// `from` is the target type and `to` the model type; `None` means the
/// observable could not state its type. `hint` is the free-form hint of the
/// bind request.
pub trait BindSupportFactory {
    fn create_converter(
        &self,
        _from: Option<ValueType>,
        _to: Option<ValueType>,
        _hint: Option<&str>,
    ) -> Option<Rc<dyn Converter>> {
        None
    }

    fn create_validator(
        &self,
        _from: Option<ValueType>,
        _to: Option<ValueType>,
        _hint: Option<&str>,
    ) -> Option<Rc<dyn Validator>> {
        None
    }
}

/// Factory chain with parent delegation.
#[derive(Default)]
pub struct SupportRegistry {
    factories: RefCell<Vec<Rc<dyn BindSupportFactory>>>,
    parent: Option<Rc<SupportRegistry>>,
}

impl SupportRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry that delegates unanswered requests to `parent`.
    #[must_use]
    pub fn with_parent(parent: Rc<SupportRegistry>) -> Self {
        Self {
            factories: RefCell::new(Vec::new()),
            parent: Some(parent),
        }
    }

    pub fn register(&self, factory: Rc<dyn BindSupportFactory>) {
        self.factories.borrow_mut().push(factory);
    }

    #[must_use]
    pub fn factory_count(&self) -> usize {
        self.factories.borrow().len()
    }

    #[must_use]
    pub fn parent(&self) -> Option<&Rc<SupportRegistry>> {
        self.parent.as_ref()
    }

    pub fn resolve_converter(
        &self,
        from: Option<ValueType>,
        to: Option<ValueType>,
        hint: Option<&str>,
    ) -> Option<Rc<dyn Converter>> {
        self.resolve(|f| f.create_converter(from, to, hint))
            .or_else(|| self.parent.as_ref()?.resolve_converter(from, to, hint))
    }

    pub fn resolve_validator(
        &self,
        from: Option<ValueType>,
        to: Option<ValueType>,
        hint: Option<&str>,
    ) -> Option<Rc<dyn Validator>> {
        self.resolve(|f| f.create_validator(from, to, hint))
            .or_else(|| self.parent.as_ref()?.resolve_validator(from, to, hint))
    }

    fn resolve<T>(&self, ask: impl Fn(&dyn BindSupportFactory) -> Option<T>) -> Option<T> {
        // Snapshot so a factory may register another factory while answering.
        let factories: Vec<_> = self.factories.borrow().iter().rev().cloned().collect();
        factories.iter().find_map(|f| ask(f.as_ref()))
    }
}

impl std::fmt::Debug for SupportRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupportRegistry")
            .field("factories", &self.factory_count())
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// DefaultSupportFactory
// ---------------------------------------------------------------------------

/// The factory every root context starts with.
///
/// | Target | Model | Converter | Validator |
/// |--------|-------|-----------|-----------|
/// | unknown | any | identity | always valid |
/// | any | unknown | identity | always valid |
/// | `A` | `B`, `A` and `B` assignable | identity | always valid |
/// | text | int, float, bool | parse / format | text-parse validator |
/// | int, float, bool | text | format / parse | always valid |
/// | anything else | | none | none |
#[derive(Debug, Clone)]
pub struct DefaultSupportFactory {
    catalog: Rc<MessageCatalog>,
    locale: Locale,
}

impl DefaultSupportFactory {
    pub fn new(catalog: Rc<MessageCatalog>, locale: impl Into<Locale>) -> Self {
        Self {
            catalog,
            locale: locale.into(),
        }
    }
}

fn assignable(from: Option<ValueType>, to: Option<ValueType>) -> bool {
    match (from, to) {
        (Some(a), Some(b)) => a.is_compatible_with(b),
        _ => true,
    }
}

impl BindSupportFactory for DefaultSupportFactory {
    fn create_converter(
        &self,
        from: Option<ValueType>,
        to: Option<ValueType>,
        _hint: Option<&str>,
    ) -> Option<Rc<dyn Converter>> {
        if assignable(from, to) {
            return Some(Rc::new(IdentityConverter::new(from, to)));
        }
        match (from?, to?) {
            (ValueType::Text, model) => {
                TextConverter::for_type(model).map(|c| Rc::new(c) as Rc<dyn Converter>)
            }
            (target, ValueType::Text) => TextConverter::for_type(target)
                .map(|c| Rc::new(Flipped(Rc::new(c))) as Rc<dyn Converter>),
            _ => None,
        }
    }

    fn create_validator(
        &self,
        from: Option<ValueType>,
        to: Option<ValueType>,
        _hint: Option<&str>,
    ) -> Option<Rc<dyn Validator>> {
        if assignable(from, to) {
            return Some(Rc::new(AlwaysValid));
        }
        match (from?, to?) {
            (ValueType::Text, model) => {
                TextValidator::new(model, Rc::clone(&self.catalog), self.locale.clone())
                    .map(|v| Rc::new(v) as Rc<dyn Validator>)
            }
            (target, ValueType::Text) => TextConverter::for_type(target)
                .map(|_| Rc::new(AlwaysValid) as Rc<dyn Validator>),
            _ => None,
        }
    }
}
