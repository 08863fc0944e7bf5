#![forbid(unsafe_code)]

//! Binding-event pipeline types.

use std::fmt;
use std::rc::Rc;

use tether_core::{ChangeEvent, Value};

use crate::validate::ValidationMessage;

/// Which way a synchronization copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CopyDirection {
    /// Target to model.
    ToModel,
    /// Model to target.
    ToTarget,
}

impl fmt::Display for CopyDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ToModel => "to-model",
            Self::ToTarget => "to-target",
        })
    }
}

/// Where in the pipeline a binding event is raised.
///
/// Stages always occur in declaration order; a stage is skipped when the
/// binding has no work for it (e.g. no validation toward the target).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PipelineStage {
    /// The value was read from the source.
    AfterGet,
    /// The value passed validation.
    AfterValidate,
    /// The destination was written.
    AfterChange,
}

/// One step of an in-flight synchronization, offered to binding-event
/// listeners.
///
/// Listeners may rewrite `value`; the binding continues with whatever is
/// there when the listener returns `Ok`.
#[derive(Debug, Clone)]
pub struct BindingEvent {
    /// The observable change that started this synchronization.
    pub change: ChangeEvent,
    pub direction: CopyDirection,
    pub stage: PipelineStage,
    /// Working value. For bulk operations this is a `Value::List`.
    pub value: Value,
}

impl BindingEvent {
    #[must_use]
    pub fn new(change: ChangeEvent, direction: CopyDirection, value: Value) -> Self {
        Self {
            change,
            direction,
            stage: PipelineStage::AfterGet,
            value,
        }
    }
}

/// A binding-event listener. Returning `Err` vetoes the synchronization and
/// stops later listeners from running.
pub type BindingEventListener = Rc<dyn Fn(&mut BindingEvent) -> Result<(), ValidationMessage>>;

/// Wrap a closure as a [`BindingEventListener`].
pub fn event_listener(
    f: impl Fn(&mut BindingEvent) -> Result<(), ValidationMessage> + 'static,
) -> BindingEventListener {
    Rc::new(f)
}
