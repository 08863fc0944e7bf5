#![forbid(unsafe_code)]

//! Localized messages for the tether binding runtime.
//!
//! - [`catalog`]: per-locale message tables with a fallback chain and
//!   `{name}` interpolation.
//! - [`locale`]: locale normalization and system locale detection.
//! - [`defaults`]: the built-in message table and its [`keys`].

pub mod catalog;
pub mod defaults;
pub mod locale;

pub use catalog::{I18nError, LocaleMessages, MessageCatalog, interpolate};
pub use defaults::{default_catalog, keys};
pub use locale::{DEFAULT_LOCALE, Locale, detect_system_locale, parse_locale};
