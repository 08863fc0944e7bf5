#![forbid(unsafe_code)]

//! Core types for Tether data binding.
//!
//! - [`value`]: the dynamic [`Value`] carried by observables and its runtime
//!   [`ValueType`] descriptor.
//! - [`event`]: the closed set of [`ChangeKind`]s and the [`ChangeEvent`]
//!   record dispatched to listeners.
//! - [`observable`]: the observable contracts the binding engine consumes,
//!   RAII [`Subscription`]s, [`BatchScope`], and in-memory reference
//!   observables.
//!
//! Everything here is single-threaded (`Rc`-based). Propagation happens
//! inline on the caller's thread inside the mutating call.

pub mod event;
pub mod observable;
pub mod value;

pub use event::{ChangeEvent, ChangeKind, Position};
pub use observable::{
    BatchScope, CellProvider, CellStore, ChangeListener, CollectionObservable, Disposable,
    EventLog, ListObservable, ScalarObservable, SetObservable, Subscription, TableList,
    TableObservable, TreeNodes, TreeObservable, ValueObservable, ValueSet, listener,
};
pub use value::{Value, ValueType, type_name};
