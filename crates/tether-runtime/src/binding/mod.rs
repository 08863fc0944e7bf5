#![forbid(unsafe_code)]

//! Bindings: the synchronization units pairing one target with one model.
//!
//! Four variants share the [`Binding`] contract:
//!
//! | Variant | Target | Model | Converts |
//! |---------|--------|-------|----------|
//! | [`ValueBinding`] | scalar | scalar | yes |
//! | [`CollectionBinding`] | collection | collection | per element |
//! | [`TableBinding`] | table | set + cell provider | no |
//! | [`TreeBinding`] | tree | tree | no |
//!
//! # Invariants
//!
//! 1. While a binding propagates in one direction it ignores every change
//!    notification it receives, so one external change commits at most once
//!    on the counterpart. Tree bindings are the exception for `Virtual`
//!    requests, which may nest.
//! 2. Binding-event listeners run in registration order; the first `Err`
//!    stops the remaining listeners and aborts the synchronization before
//!    anything further is written.
//! 3. The sync state is back to [`SyncState::Idle`] when a propagation
//!    returns, on every path.
//! 4. After `dispose`, no observable holds a listener of the binding and
//!    the binding has no entry in the validation-message registry.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Validation failure | validator rejects a value | message published, nothing written |
//! | Listener veto | binding-event listener returns `Err` | message published, nothing further written |
//! | Conversion failure | converter returns `Err` | `warn!`, localized message published, nothing written |
//! | Runtime fault | change kind without a policy, bad payload | logged, stored as [`Binding::last_fault`], message published |

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use tether_core::{ChangeEvent, ChangeListener, listener};
use tether_i18n::{Locale, MessageCatalog, keys};

use crate::error::{BindingError, ConversionError};
use crate::validate::ValidationMessage;
use crate::validation::ValidationMessages;

pub mod collection;
pub mod event;
pub mod table;
pub mod tree;
pub mod value;

pub use collection::CollectionBinding;
pub use event::{BindingEvent, BindingEventListener, CopyDirection, PipelineStage, event_listener};
pub use table::TableBinding;
pub use tree::TreeBinding;
pub use value::ValueBinding;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

static BINDING_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a binding, used to key its validation messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(u64);

impl BindingId {
    /// Allocate a process-wide unique id.
    pub fn next() -> Self {
        Self(BINDING_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub const fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "binding#{}", self.0)
    }
}

/// Handle for removing a binding-event listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Which variant a binding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
    Value,
    Collection,
    Table,
    Tree,
}

impl BindingKind {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Value => "value",
            Self::Collection => "collection",
            Self::Table => "table",
            Self::Tree => "tree",
        }
    }
}

impl fmt::Display for BindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Propagation state of a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    #[default]
    Idle,
    Propagating(CopyDirection),
}

// ---------------------------------------------------------------------------
// BindingEnv
// ---------------------------------------------------------------------------

/// What a binding receives from its context: the shared message registry
/// and the localization it reports with.
#[derive(Clone)]
pub struct BindingEnv {
    messages: Rc<ValidationMessages>,
    catalog: Rc<MessageCatalog>,
    locale: Locale,
    revalidate_after_model_update: bool,
}

impl BindingEnv {
    pub fn new(
        messages: Rc<ValidationMessages>,
        catalog: Rc<MessageCatalog>,
        locale: impl Into<Locale>,
    ) -> Self {
        Self {
            messages,
            catalog,
            locale: locale.into(),
            revalidate_after_model_update: true,
        }
    }

    /// Whether value and collection bindings re-validate the target after
    /// copying from the model. On by default.
    #[must_use]
    pub fn with_revalidation(mut self, enabled: bool) -> Self {
        self.revalidate_after_model_update = enabled;
        self
    }

    #[must_use]
    pub fn messages(&self) -> &Rc<ValidationMessages> {
        &self.messages
    }

    #[must_use]
    pub fn locale(&self) -> &str {
        &self.locale
    }

    #[must_use]
    pub fn revalidates(&self) -> bool {
        self.revalidate_after_model_update
    }

    /// Render a catalog message in this environment's locale.
    #[must_use]
    pub fn message(&self, key: &str, args: &[(&str, &str)]) -> ValidationMessage {
        ValidationMessage::new(self.catalog.format_or_key(&self.locale, key, args))
    }
}

impl fmt::Debug for BindingEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingEnv")
            .field("locale", &self.locale)
            .field("revalidate", &self.revalidate_after_model_update)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// BindingCore
// ---------------------------------------------------------------------------

/// State every binding variant shares.
pub struct BindingCore {
    id: BindingId,
    kind: BindingKind,
    env: BindingEnv,
    listeners: RefCell<Vec<(ListenerId, BindingEventListener)>>,
    next_listener: Cell<u64>,
    state: Cell<SyncState>,
    disposed: Cell<bool>,
    fault: RefCell<Option<BindingError>>,
}

impl BindingCore {
    pub(crate) fn new(kind: BindingKind, env: BindingEnv) -> Self {
        Self {
            id: BindingId::next(),
            kind,
            env,
            listeners: RefCell::new(Vec::new()),
            next_listener: Cell::new(0),
            state: Cell::new(SyncState::Idle),
            disposed: Cell::new(false),
            fault: RefCell::new(None),
        }
    }

    #[must_use]
    pub fn id(&self) -> BindingId {
        self.id
    }

    #[must_use]
    pub fn kind(&self) -> BindingKind {
        self.kind
    }

    #[must_use]
    pub fn env(&self) -> &BindingEnv {
        &self.env
    }

    #[must_use]
    pub fn state(&self) -> SyncState {
        self.state.get()
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.state.get() == SyncState::Idle
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    #[must_use]
    pub fn last_fault(&self) -> Option<BindingError> {
        self.fault.borrow().clone()
    }

    pub fn add_listener(&self, listener: BindingEventListener) -> ListenerId {
        let id = ListenerId(self.next_listener.get());
        self.next_listener.set(id.0 + 1);
        self.listeners.borrow_mut().push((id, listener));
        id
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    /// Run every listener in registration order, stopping at the first `Err`.
    pub fn fire(&self, event: &mut BindingEvent) -> Result<(), ValidationMessage> {
        let listeners: Vec<BindingEventListener> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, l)| Rc::clone(l))
            .collect();
        for l in listeners {
            if let Err(message) = l(event) {
                tracing::debug!(
                    binding = %self.id,
                    stage = ?event.stage,
                    direction = %event.direction,
                    %message,
                    "binding event vetoed"
                );
                return Err(message);
            }
        }
        Ok(())
    }

    /// Enter `Propagating(direction)` unless a propagation is already running.
    pub(crate) fn begin(&self, direction: CopyDirection) -> Option<PropagationGuard<'_>> {
        if self.disposed.get() {
            return None;
        }
        if let SyncState::Propagating(running) = self.state.get() {
            tracing::trace!(binding = %self.id, %running, "re-entrant notification ignored");
            return None;
        }
        self.state.set(SyncState::Propagating(direction));
        Some(PropagationGuard { state: &self.state })
    }

    /// Move `event` to `stage` and fire it. A veto is published as the
    /// binding's validation message; returns whether to continue.
    pub(crate) fn stage(&self, event: &mut BindingEvent, stage: PipelineStage) -> bool {
        event.stage = stage;
        tracing::trace!(binding = %self.id, ?stage, direction = %event.direction, value = %event.value, "pipeline");
        match self.fire(event) {
            Ok(()) => true,
            Err(message) => {
                self.report(Some(message));
                false
            }
        }
    }

    pub(crate) fn report(&self, message: Option<ValidationMessage>) {
        self.env.messages.update_validation_error(self.id, message);
    }

    pub(crate) fn report_partial(&self, message: Option<ValidationMessage>) {
        self.env
            .messages
            .update_partial_validation_error(self.id, message);
    }

    pub(crate) fn conversion_failed(&self, direction: CopyDirection, err: &ConversionError) {
        tracing::warn!(binding = %self.id, %direction, error = %err, "conversion failed");
        let detail = err.to_string();
        self.report(Some(
            self.env.message(keys::SET_VALUE_FAILED, &[("detail", &detail)]),
        ));
    }

    /// Record a runtime fault and publish `message` as the final message.
    pub(crate) fn fault(&self, err: BindingError, message: ValidationMessage) {
        *self.fault.borrow_mut() = Some(err);
        self.report(Some(message));
    }

    /// Flip to disposed. Returns `false` if it already was.
    pub(crate) fn retire(&self) -> bool {
        if self.disposed.replace(true) {
            return false;
        }
        self.listeners.borrow_mut().clear();
        self.env.messages.clear(self.id);
        tracing::debug!(binding = %self.id, kind = %self.kind, "binding disposed");
        true
    }
}

impl fmt::Debug for BindingCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingCore")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("state", &self.state.get())
            .field("listeners", &self.listeners.borrow().len())
            .field("disposed", &self.disposed.get())
            .finish()
    }
}

/// Restores [`SyncState::Idle`] when dropped.
#[must_use]
pub(crate) struct PropagationGuard<'a> {
    state: &'a Cell<SyncState>,
}

impl Drop for PropagationGuard<'_> {
    fn drop(&mut self) {
        self.state.set(SyncState::Idle);
    }
}

/// An observable listener that forwards to `inner` while it is alive.
pub(crate) fn weak_listener<T: 'static>(
    inner: &Rc<T>,
    f: impl Fn(&T, &ChangeEvent) + 'static,
) -> ChangeListener {
    let weak = Rc::downgrade(inner);
    listener(move |ev| {
        if let Some(inner) = weak.upgrade() {
            f(&inner, ev);
        }
    })
}

// ---------------------------------------------------------------------------
// Binding trait
// ---------------------------------------------------------------------------

/// Contract shared by every binding variant.
pub trait Binding {
    /// Shared state (identity, listeners, sync state).
    fn core(&self) -> &BindingCore;

    /// Push the model's state into the target.
    fn refresh_target_from_model(&self);

    /// Detach from both observables and drop this binding's messages.
    fn dispose(&self);

    fn id(&self) -> BindingId {
        self.core().id()
    }

    fn kind(&self) -> BindingKind {
        self.core().kind()
    }

    fn add_binding_event_listener(&self, listener: BindingEventListener) -> ListenerId {
        self.core().add_listener(listener)
    }

    fn remove_binding_event_listener(&self, id: ListenerId) -> bool {
        self.core().remove_listener(id)
    }

    fn fire_binding_event(&self, event: &mut BindingEvent) -> Result<(), ValidationMessage> {
        self.core().fire(event)
    }

    fn is_disposed(&self) -> bool {
        self.core().is_disposed()
    }

    fn last_fault(&self) -> Option<BindingError> {
        self.core().last_fault()
    }

    fn sync_state(&self) -> SyncState {
        self.core().state()
    }
}

/// A binding of any variant, as returned by
/// [`BindingContext::bind`](crate::context::BindingContext::bind).
#[derive(Clone, Debug)]
pub enum AnyBinding {
    Value(ValueBinding),
    Collection(CollectionBinding),
    Table(TableBinding),
    Tree(TreeBinding),
}

impl AnyBinding {
    fn as_dyn(&self) -> &dyn Binding {
        match self {
            Self::Value(b) => b,
            Self::Collection(b) => b,
            Self::Table(b) => b,
            Self::Tree(b) => b,
        }
    }

    #[must_use]
    pub fn as_value(&self) -> Option<&ValueBinding> {
        match self {
            Self::Value(b) => Some(b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_collection(&self) -> Option<&CollectionBinding> {
        match self {
            Self::Collection(b) => Some(b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_table(&self) -> Option<&TableBinding> {
        match self {
            Self::Table(b) => Some(b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_tree(&self) -> Option<&TreeBinding> {
        match self {
            Self::Tree(b) => Some(b),
            _ => None,
        }
    }
}

impl Binding for AnyBinding {
    fn core(&self) -> &BindingCore {
        self.as_dyn().core()
    }

    fn refresh_target_from_model(&self) {
        self.as_dyn().refresh_target_from_model();
    }

    fn dispose(&self) {
        self.as_dyn().dispose();
    }

    fn sync_state(&self) -> SyncState {
        self.as_dyn().sync_state()
    }
}

impl From<ValueBinding> for AnyBinding {
    fn from(b: ValueBinding) -> Self {
        Self::Value(b)
    }
}

impl From<CollectionBinding> for AnyBinding {
    fn from(b: CollectionBinding) -> Self {
        Self::Collection(b)
    }
}

impl From<TableBinding> for AnyBinding {
    fn from(b: TableBinding) -> Self {
        Self::Table(b)
    }
}

impl From<TreeBinding> for AnyBinding {
    fn from(b: TreeBinding) -> Self {
        Self::Tree(b)
    }
}
