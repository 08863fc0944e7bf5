#![forbid(unsafe_code)]

//! The binding context: owner of bindings, message registry, and support
//! registry.
//!
//! # Ownership
//!
//! A context disposes, on [`BindingContext::dispose`] or drop:
//!
//! 1. every binding it created, then
//! 2. every observable it created through a `create_*` helper.
//!
//! Observables passed in by the caller are never disposed by the context.
//!
//! # Example
//!
//! ```
//! use tether_core::{ValueObservable, ValueType};
//! use tether_runtime::{BindSpec, BindingContext, ContextConfig};
//!
//! let ctx = BindingContext::with_config(ContextConfig::default().with_locale("en"));
//! let field = ValueObservable::text();
//! let age = ValueObservable::typed(Some(ValueType::Int), 30);
//! ctx.bind(field.clone(), age.clone(), BindSpec::default()).unwrap();
//!
//! assert_eq!(field.get().to_string(), "30");
//! field.set("31");
//! assert_eq!(age.get().as_int(), Some(31));
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tether_core::{
    CellProvider, CellStore, CollectionObservable, Disposable, ListObservable, ScalarObservable,
    SetObservable, TableList, TableObservable, TreeNodes, TreeObservable, Value, ValueObservable,
    ValueSet, ValueType,
};
use tether_i18n::MessageCatalog;

use crate::binding::{
    AnyBinding, Binding, BindingEnv, CollectionBinding, TableBinding, TreeBinding, ValueBinding,
};
use crate::config::ContextConfig;
use crate::convert::Converter;
use crate::error::BindingError;
use crate::registry::{BindSupportFactory, DefaultSupportFactory, SupportRegistry};
use crate::validate::Validator;
use crate::validation::ValidationMessages;

// ---------------------------------------------------------------------------
// Observable kinds
// ---------------------------------------------------------------------------

/// The capability an observable offers to a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObservableKind {
    Scalar,
    Collection,
    Table,
    Set,
    Tree,
}

impl fmt::Display for ObservableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Scalar => "scalar",
            Self::Collection => "collection",
            Self::Table => "table",
            Self::Set => "set",
            Self::Tree => "tree",
        })
    }
}

/// The target side of a binding (usually a widget).
#[derive(Clone)]
pub enum Target {
    Scalar(Rc<dyn ScalarObservable>),
    Collection(Rc<dyn CollectionObservable>),
    Table(Rc<dyn TableObservable>),
    Tree(Rc<dyn TreeObservable>),
}

impl Target {
    #[must_use]
    pub fn kind(&self) -> ObservableKind {
        match self {
            Self::Scalar(_) => ObservableKind::Scalar,
            Self::Collection(_) => ObservableKind::Collection,
            Self::Table(_) => ObservableKind::Table,
            Self::Tree(_) => ObservableKind::Tree,
        }
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Target::{}", self.kind())
    }
}

/// The model side of a binding (usually application state).
#[derive(Clone)]
pub enum Model {
    Scalar(Rc<dyn ScalarObservable>),
    Collection(Rc<dyn CollectionObservable>),
    /// Table rows and the provider of their cells.
    Set {
        elements: Rc<dyn SetObservable>,
        cells: Rc<dyn CellProvider>,
    },
    Tree(Rc<dyn TreeObservable>),
}

impl Model {
    #[must_use]
    pub fn kind(&self) -> ObservableKind {
        match self {
            Self::Scalar(_) => ObservableKind::Scalar,
            Self::Collection(_) => ObservableKind::Collection,
            Self::Set { .. } => ObservableKind::Set,
            Self::Tree(_) => ObservableKind::Tree,
        }
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Model::{}", self.kind())
    }
}

impl From<ValueObservable> for Target {
    fn from(o: ValueObservable) -> Self {
        Self::Scalar(Rc::new(o))
    }
}

impl From<ListObservable> for Target {
    fn from(o: ListObservable) -> Self {
        Self::Collection(Rc::new(o))
    }
}

impl From<TableList> for Target {
    fn from(o: TableList) -> Self {
        Self::Table(Rc::new(o))
    }
}

impl From<TreeNodes> for Target {
    fn from(o: TreeNodes) -> Self {
        Self::Tree(Rc::new(o))
    }
}

impl From<ValueObservable> for Model {
    fn from(o: ValueObservable) -> Self {
        Self::Scalar(Rc::new(o))
    }
}

impl From<ListObservable> for Model {
    fn from(o: ListObservable) -> Self {
        Self::Collection(Rc::new(o))
    }
}

impl From<(ValueSet, CellStore)> for Model {
    fn from((elements, cells): (ValueSet, CellStore)) -> Self {
        Self::Set {
            elements: Rc::new(elements),
            cells: Rc::new(cells),
        }
    }
}

impl From<TreeNodes> for Model {
    fn from(o: TreeNodes) -> Self {
        Self::Tree(Rc::new(o))
    }
}

// ---------------------------------------------------------------------------
// BindSpec
// ---------------------------------------------------------------------------

/// Per-binding options. Anything left `None` is resolved from the context's
/// support registry.
#[derive(Clone, Default)]
pub struct BindSpec {
    pub converter: Option<Rc<dyn Converter>>,
    pub validator: Option<Rc<dyn Validator>>,
    /// Passed to support factories to pick between several candidates.
    pub hint: Option<String>,
}

impl BindSpec {
    #[must_use]
    pub fn with_converter(mut self, converter: impl Converter + 'static) -> Self {
        self.converter = Some(Rc::new(converter));
        self
    }

    #[must_use]
    pub fn with_validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validator = Some(Rc::new(validator));
        self
    }

    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl fmt::Debug for BindSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindSpec")
            .field("converter", &self.converter.is_some())
            .field("validator", &self.validator.is_some())
            .field("hint", &self.hint)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// BindingContext
// ---------------------------------------------------------------------------

/// Creates bindings and owns what they share.
pub struct BindingContext {
    config: ContextConfig,
    catalog: Rc<MessageCatalog>,
    registry: Rc<SupportRegistry>,
    messages: Rc<ValidationMessages>,
    bindings: RefCell<Vec<AnyBinding>>,
    owned: RefCell<Vec<Rc<dyn Disposable>>>,
    disposed: Cell<bool>,
}

impl Default for BindingContext {
    fn default() -> Self {
        Self::new()
    }
}

impl BindingContext {
    /// A root context with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ContextConfig::default())
    }

    /// A root context. Its registry starts with a [`DefaultSupportFactory`].
    #[must_use]
    pub fn with_config(config: ContextConfig) -> Self {
        let catalog = Rc::new(config.catalog());
        let registry = SupportRegistry::new();
        registry.register(Rc::new(DefaultSupportFactory::new(
            Rc::clone(&catalog),
            config.locale.clone(),
        )));
        Self::assemble(config, catalog, Rc::new(registry))
    }

    /// A child context whose registry falls back to `parent`'s. Bindings
    /// and messages are not shared with the parent.
    #[must_use]
    pub fn with_parent(parent: &BindingContext) -> Self {
        let registry = SupportRegistry::with_parent(Rc::clone(&parent.registry));
        Self::assemble(
            parent.config.clone(),
            Rc::clone(&parent.catalog),
            Rc::new(registry),
        )
    }

    fn assemble(
        config: ContextConfig,
        catalog: Rc<MessageCatalog>,
        registry: Rc<SupportRegistry>,
    ) -> Self {
        tracing::debug!(locale = %config.locale, has_parent = registry.parent().is_some(), "binding context created");
        Self {
            config,
            catalog,
            registry,
            messages: Rc::new(ValidationMessages::new()),
            bindings: RefCell::new(Vec::new()),
            owned: RefCell::new(Vec::new()),
            disposed: Cell::new(false),
        }
    }

    /// Add a factory; it is consulted before every factory added earlier.
    pub fn register_factory(&self, factory: impl BindSupportFactory + 'static) {
        self.registry.register(Rc::new(factory));
    }

    /// Bind any supported pair of observables.
    ///
    /// | Target | Model | Binding |
    /// |--------|-------|---------|
    /// | scalar | scalar | [`ValueBinding`] |
    /// | collection | collection | [`CollectionBinding`] |
    /// | table | set | [`TableBinding`] |
    /// | tree | tree | [`TreeBinding`] |
    ///
    /// # Errors
    ///
    /// [`BindingError::UnsupportedPairing`] for any other pair,
    /// [`BindingError::Disposed`] after [`dispose`](Self::dispose), and the
    /// construction errors of the chosen binding.
    pub fn bind(
        &self,
        target: impl Into<Target>,
        model: impl Into<Model>,
        spec: BindSpec,
    ) -> Result<AnyBinding, BindingError> {
        let (target, model) = (target.into(), model.into());
        let span = tracing::debug_span!("bind", target = %target.kind(), model = %model.kind());
        let _enter = span.enter();

        match (target, model) {
            (Target::Scalar(t), Model::Scalar(m)) => self.bind_value(t, m, spec).map(Into::into),
            (Target::Collection(t), Model::Collection(m)) => {
                self.bind_list(t, m, spec).map(Into::into)
            }
            (Target::Table(t), Model::Set { elements, cells }) => {
                self.bind_table(t, elements, cells).map(Into::into)
            }
            (Target::Tree(t), Model::Tree(m)) => self.bind_tree(t, m).map(Into::into),
            (t, m) => {
                let err = BindingError::UnsupportedPairing {
                    target: t.kind(),
                    model: m.kind(),
                };
                tracing::debug!(error = %err, "bind rejected");
                Err(err)
            }
        }
    }

    /// Bind two scalars.
    ///
    /// # Errors
    ///
    /// Missing or incompatible converter or validator, or a disposed context.
    pub fn bind_value(
        &self,
        target: Rc<dyn ScalarObservable>,
        model: Rc<dyn ScalarObservable>,
        spec: BindSpec,
    ) -> Result<ValueBinding, BindingError> {
        self.ensure_live()?;
        let (converter, validator) = self.support(target.value_type(), model.value_type(), spec)?;
        let binding = ValueBinding::new(self.env(), target, model, converter, validator)?;
        self.adopt(binding.clone().into());
        Ok(binding)
    }

    /// Bind two collections element by element.
    ///
    /// # Errors
    ///
    /// Missing or incompatible converter or validator, or a disposed context.
    pub fn bind_list(
        &self,
        target: Rc<dyn CollectionObservable>,
        model: Rc<dyn CollectionObservable>,
        spec: BindSpec,
    ) -> Result<CollectionBinding, BindingError> {
        self.ensure_live()?;
        let (converter, validator) =
            self.support(target.element_type(), model.element_type(), spec)?;
        let binding = CollectionBinding::new(self.env(), target, model, converter, validator)?;
        self.adopt(binding.clone().into());
        Ok(binding)
    }

    /// Show a set in a table.
    ///
    /// # Errors
    ///
    /// [`BindingError::Disposed`] after [`dispose`](Self::dispose).
    pub fn bind_table(
        &self,
        target: Rc<dyn TableObservable>,
        elements: Rc<dyn SetObservable>,
        cells: Rc<dyn CellProvider>,
    ) -> Result<TableBinding, BindingError> {
        self.ensure_live()?;
        let binding = TableBinding::new(self.env(), target, elements, cells);
        self.adopt(binding.clone().into());
        Ok(binding)
    }

    /// Bind two trees.
    ///
    /// # Errors
    ///
    /// [`BindingError::IncompatibleNodeTypes`], or a disposed context.
    pub fn bind_tree(
        &self,
        target: Rc<dyn TreeObservable>,
        model: Rc<dyn TreeObservable>,
    ) -> Result<TreeBinding, BindingError> {
        self.ensure_live()?;
        let binding = TreeBinding::new(self.env(), target, model)?;
        self.adopt(binding.clone().into());
        Ok(binding)
    }

    fn ensure_live(&self) -> Result<(), BindingError> {
        if self.disposed.get() {
            return Err(BindingError::Disposed);
        }
        Ok(())
    }

    fn env(&self) -> BindingEnv {
        BindingEnv::new(
            Rc::clone(&self.messages),
            Rc::clone(&self.catalog),
            self.config.locale.clone(),
        )
        .with_revalidation(self.config.revalidate_after_model_update)
    }

    /// Explicit converter and validator from `spec`, the rest from the
    /// registry (target type to model type).
    fn support(
        &self,
        target: Option<ValueType>,
        model: Option<ValueType>,
        spec: BindSpec,
    ) -> Result<(Rc<dyn Converter>, Rc<dyn Validator>), BindingError> {
        let hint = spec.hint.as_deref();
        let converter = match spec.converter {
            Some(converter) => converter,
            None => self
                .registry
                .resolve_converter(target, model, hint)
                .ok_or_else(|| BindingError::missing_converter(target, model))?,
        };
        let validator = match spec.validator {
            Some(validator) => validator,
            None => self
                .registry
                .resolve_validator(target, model, hint)
                .ok_or_else(|| BindingError::missing_validator(target, model))?,
        };
        Ok((converter, validator))
    }

    fn adopt(&self, binding: AnyBinding) {
        tracing::debug!(binding = %binding.id(), kind = %binding.kind(), "binding created");
        self.prune();
        self.bindings.borrow_mut().push(binding);
    }

    /// Drop bindings disposed on their own, releasing their observables.
    fn prune(&self) {
        self.bindings.borrow_mut().retain(|b| !b.is_disposed());
    }

    fn own<T: Disposable + Clone + 'static>(&self, observable: T) -> T {
        self.owned.borrow_mut().push(Rc::new(observable.clone()));
        observable
    }

    /// A scalar owned by this context.
    pub fn create_value(&self, value: impl Into<Value>) -> ValueObservable {
        self.own(ValueObservable::new(value))
    }

    /// A list owned by this context.
    pub fn create_list(&self, element_type: Option<ValueType>, items: Vec<Value>) -> ListObservable {
        self.own(ListObservable::from_values(element_type, items))
    }

    /// A set owned by this context.
    pub fn create_set(&self, element_type: Option<ValueType>) -> ValueSet {
        self.own(ValueSet::new(element_type))
    }

    /// A table target owned by this context.
    pub fn create_table(&self) -> TableList {
        self.own(TableList::new())
    }

    /// A tree owned by this context.
    pub fn create_tree(&self, node_types: Vec<ValueType>) -> TreeNodes {
        self.own(TreeNodes::new(node_types))
    }

    /// Newest final validation message of any binding, or `""`.
    #[must_use]
    pub fn validation_message(&self) -> ValueObservable {
        self.messages.validation_message()
    }

    /// Newest partial validation message of any binding, or `""`.
    #[must_use]
    pub fn partial_validation_message(&self) -> ValueObservable {
        self.messages.partial_validation_message()
    }

    /// The partial message if there is one, else the final message.
    #[must_use]
    pub fn combined_validation_message(&self) -> ValueObservable {
        self.messages.combined_validation_message()
    }

    #[must_use]
    pub fn messages(&self) -> &Rc<ValidationMessages> {
        &self.messages
    }

    /// Copy every live binding's model into its target again.
    pub fn refresh_targets(&self) {
        self.prune();
        let bindings: Vec<AnyBinding> = self.bindings.borrow().clone();
        for binding in &bindings {
            binding.refresh_target_from_model();
        }
    }

    /// Bindings created here and not yet disposed.
    #[must_use]
    pub fn binding_count(&self) -> usize {
        self.prune();
        self.bindings.borrow().len()
    }

    #[must_use]
    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    #[must_use]
    pub fn locale(&self) -> &str {
        &self.config.locale
    }

    #[must_use]
    pub fn catalog(&self) -> &Rc<MessageCatalog> {
        &self.catalog
    }

    #[must_use]
    pub fn registry(&self) -> &Rc<SupportRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    /// Dispose every binding, then every context-created observable.
    /// Later calls do nothing.
    pub fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }
        let bindings = std::mem::take(&mut *self.bindings.borrow_mut());
        let owned = std::mem::take(&mut *self.owned.borrow_mut());
        tracing::debug!(
            bindings = bindings.len(),
            observables = owned.len(),
            "binding context disposed"
        );
        for binding in &bindings {
            binding.dispose();
        }
        for observable in &owned {
            observable.dispose();
        }
    }
}

impl Drop for BindingContext {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for BindingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingContext")
            .field("locale", &self.config.locale)
            .field("bindings", &self.binding_count())
            .field("owned", &self.owned.borrow().len())
            .field("registry", &self.registry)
            .field("disposed", &self.disposed.get())
            .finish()
    }
}
