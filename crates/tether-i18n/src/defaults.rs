#![forbid(unsafe_code)]

//! Built-in message tables.

use crate::catalog::{LocaleMessages, MessageCatalog};
use crate::locale::DEFAULT_LOCALE;

/// Message keys used by the binding runtime.
pub mod keys {
    /// A converter failed while a binding wrote a value. Args: `detail`.
    pub const SET_VALUE_FAILED: &str = "binding.set-value-failed";
    /// A table model announced `Stale`.
    pub const STALE_UNSUPPORTED: &str = "binding.stale-unsupported";
    /// A tree `Replace` carried something other than a list. Args: `kind`.
    pub const UNRECOGNIZED_PAYLOAD: &str = "binding.unrecognized-payload";
    /// Args: `value`.
    pub const NOT_AN_INTEGER: &str = "validate.not-an-integer";
    /// Args: `value`.
    pub const NOT_A_NUMBER: &str = "validate.not-a-number";
    /// Args: `value`.
    pub const NOT_A_BOOLEAN: &str = "validate.not-a-boolean";
}

const EN: &[(&str, &str)] = &[
    (keys::SET_VALUE_FAILED, "Error while setting value: {detail}"),
    (
        keys::STALE_UNSUPPORTED,
        "The model is stale and cannot be resynchronized",
    ),
    (
        keys::UNRECOGNIZED_PAYLOAD,
        "Cannot replace children from a {kind} payload",
    ),
    (keys::NOT_AN_INTEGER, "'{value}' is not a whole number"),
    (keys::NOT_A_NUMBER, "'{value}' is not a number"),
    (keys::NOT_A_BOOLEAN, "'{value}' is not true or false"),
];

const DE: &[(&str, &str)] = &[
    (keys::SET_VALUE_FAILED, "Fehler beim Setzen des Wertes: {detail}"),
    (keys::NOT_AN_INTEGER, "'{value}' ist keine ganze Zahl"),
    (keys::NOT_A_NUMBER, "'{value}' ist keine Zahl"),
    (keys::NOT_A_BOOLEAN, "'{value}' ist weder true noch false"),
];

/// The catalog a binding context starts with: English, with a partial
/// German table, falling back to English.
#[must_use]
pub fn default_catalog() -> MessageCatalog {
    let mut catalog = MessageCatalog::new();
    catalog.add_locale(DEFAULT_LOCALE, EN.iter().copied().collect::<LocaleMessages>());
    catalog.add_locale("de", DE.iter().copied().collect::<LocaleMessages>());
    catalog.set_fallback_chain(vec![DEFAULT_LOCALE.to_owned()]);
    catalog
}
