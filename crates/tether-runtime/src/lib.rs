#![forbid(unsafe_code)]

//! Synchronization engine for Tether.
//!
//! A [`BindingContext`] pairs a *target* observable (typically a widget) with
//! a *model* observable (application state) and keeps them in sync:
//!
//! - [`registry`] resolves [`Converter`]s and [`Validator`]s for a pair of
//!   value types, newest factory first, falling back to a parent registry.
//! - [`binding`] holds the four binding variants and the vetoable
//!   [`BindingEvent`] pipeline they run.
//! - [`validation`] collects per-binding validation messages and publishes
//!   the newest final, partial, and combined message as observables.
//! - [`config`] carries locale and behavior settings, optionally loaded from
//!   TOML (feature `config-file`).
//!
//! The engine is single-threaded: every propagation runs inline inside the
//! observable mutation that triggered it.
//!
//! # Logging
//!
//! Uses `tracing` throughout and installs no subscriber. `bind` runs inside a
//! `debug` span named `bind`; conversion failures and unsupported change
//! kinds log at `warn`, bad payloads at `error`.

pub mod binding;
pub mod config;
pub mod context;
pub mod convert;
pub mod error;
pub mod registry;
pub mod validate;
pub mod validation;

pub use binding::{
    AnyBinding, Binding, BindingCore, BindingEnv, BindingEvent, BindingEventListener, BindingId,
    BindingKind, CollectionBinding, CopyDirection, ListenerId, PipelineStage, SyncState,
    TableBinding, TreeBinding, ValueBinding, event_listener,
};
pub use config::ContextConfig;
pub use context::{BindSpec, BindingContext, Model, ObservableKind, Target};
pub use convert::{Converter, FnConverter, Flipped, IdentityConverter, TextConverter};
pub use error::{BindingError, ConfigError, ConversionError};
pub use registry::{BindSupportFactory, DefaultSupportFactory, SupportRegistry};
pub use validate::{AlwaysValid, FnValidator, TextValidator, ValidationMessage, Validator};
pub use validation::ValidationMessages;
