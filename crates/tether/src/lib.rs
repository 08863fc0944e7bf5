#![forbid(unsafe_code)]

//! Tether: keep widgets and application state in sync.
//!
//! This crate re-exports the workspace crates under one name:
//!
//! - [`tether_core`]: values, change events, observable contracts, and
//!   in-memory observables.
//! - [`tether_i18n`]: the message catalog used for validation messages.
//! - [`tether_runtime`]: the binding context, bindings, converters, and
//!   validators.
//!
//! Most applications only need the [`prelude`].
//!
//! ```
//! use tether::prelude::*;
//!
//! let ctx = BindingContext::with_config(ContextConfig::default().with_locale("en"));
//! let input = ValueObservable::text();
//! let quantity = ValueObservable::typed(Some(ValueType::Int), 1);
//! ctx.bind(input.clone(), quantity.clone(), BindSpec::default())?;
//!
//! assert!(!input.set("3x"));
//! assert_eq!(
//!     ctx.combined_validation_message().get(),
//!     Value::from("'3x' is not a whole number")
//! );
//! assert!(input.set("3"));
//! assert_eq!(quantity.get(), Value::Int(3));
//! # Ok::<(), BindingError>(())
//! ```

pub use tether_core;
pub use tether_i18n;
pub use tether_runtime;

pub use tether_core::{ChangeEvent, ChangeKind, Value, ValueType};
pub use tether_runtime::{
    AnyBinding, BindSpec, Binding, BindingContext, BindingError, ContextConfig,
};

/// The types needed to create a context, bind observables, and react to
/// binding events.
pub mod prelude {
    pub use tether_core::{
        BatchScope, CellProvider, CellStore, ChangeEvent, ChangeKind, CollectionObservable,
        Disposable, ListObservable, Position, ScalarObservable, SetObservable, Subscription,
        TableList, TableObservable, TreeNodes, TreeObservable, Value, ValueObservable, ValueSet,
        ValueType,
    };
    pub use tether_runtime::{
        AlwaysValid, AnyBinding, BindSpec, BindSupportFactory, Binding, BindingContext,
        BindingError, BindingEvent, ContextConfig, ConversionError, Converter, CopyDirection,
        FnConverter, FnValidator, IdentityConverter, PipelineStage, TextConverter,
        ValidationMessage, Validator, event_listener,
    };
}
