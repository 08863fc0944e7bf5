#![forbid(unsafe_code)]

//! Binding context configuration.
//!
//! ```toml
//! locale = "de_DE.UTF-8"
//! revalidate_after_model_update = false
//!
//! [messages]
//! "validate.not-an-integer" = "Bitte eine ganze Zahl eingeben"
//! ```
//!
//! Every field is optional; missing fields take their [`Default`] value.
//! `messages` overrides entries of the built-in catalog for the configured
//! locale.

use std::collections::BTreeMap;

use tether_i18n::{
    Locale, LocaleMessages, MessageCatalog, default_catalog, detect_system_locale, parse_locale,
};

use crate::error::ConfigError;

/// Settings for a [`BindingContext`](crate::context::BindingContext).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ContextConfig {
    /// Locale used for validation messages.
    pub locale: Locale,
    /// Re-run final validation on the target after every model-to-target
    /// copy.
    pub revalidate_after_model_update: bool,
    /// Message overrides for `locale`, keyed by message key.
    pub messages: BTreeMap<String, String>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            locale: detect_system_locale(),
            revalidate_after_model_update: true,
            messages: BTreeMap::new(),
        }
    }
}

impl ContextConfig {
    #[must_use]
    pub fn with_locale(mut self, locale: impl Into<Locale>) -> Self {
        self.locale = locale.into();
        self
    }

    #[must_use]
    pub fn with_revalidation(mut self, enabled: bool) -> Self {
        self.revalidate_after_model_update = enabled;
        self
    }

    #[must_use]
    pub fn with_message(mut self, key: impl Into<String>, text: impl Into<String>) -> Self {
        self.messages.insert(key.into(), text.into());
        self
    }

    /// Normalize the locale (`de_DE.UTF-8` becomes `de-DE`).
    ///
    /// # Errors
    ///
    /// [`ConfigError::Locale`] when the locale is empty or malformed.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        self.locale = parse_locale(&self.locale)?;
        Ok(self)
    }

    /// Parse and validate a TOML configuration.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] for malformed TOML or mistyped fields,
    /// [`ConfigError::Locale`] for a bad locale.
    #[cfg(feature = "config-file")]
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()
    }

    /// The built-in catalog with this configuration's overrides applied.
    #[must_use]
    pub fn catalog(&self) -> MessageCatalog {
        let mut catalog = default_catalog();
        if !self.messages.is_empty() {
            let overrides: LocaleMessages = self
                .messages
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            catalog.add_locale(self.locale.clone(), overrides);
        }
        catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_i18n::keys;

    #[test]
    fn builders_set_fields() {
        let config = ContextConfig::default()
            .with_locale("fr")
            .with_revalidation(false)
            .with_message(keys::NOT_A_NUMBER, "pas un nombre");
        assert_eq!(config.locale, "fr");
        assert!(!config.revalidate_after_model_update);
        assert_eq!(config.messages.len(), 1);
    }

    #[test]
    fn validate_normalizes_locale() {
        let config = ContextConfig::default()
            .with_locale("de_DE.UTF-8")
            .validate()
            .unwrap();
        assert_eq!(config.locale, "de-DE");
    }

    #[test]
    fn validate_rejects_garbage_locale() {
        let err = ContextConfig::default()
            .with_locale("en US!")
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Locale(_)));
    }

    #[test]
    fn overrides_win_over_builtins() {
        let config = ContextConfig::default()
            .with_locale("en")
            .with_message(keys::NOT_AN_INTEGER, "whole numbers only");
        let catalog = config.catalog();
        assert_eq!(
            catalog.get("en", keys::NOT_AN_INTEGER),
            Some("whole numbers only")
        );
        assert!(catalog.get("en", keys::NOT_A_NUMBER).is_some());
    }

    #[cfg(feature = "config-file")]
    #[test]
    fn toml_fills_missing_fields_with_defaults() {
        let config = ContextConfig::from_toml_str(
            r#"
            locale = "de_DE.UTF-8"

            [messages]
            "validate.not-a-number" = "keine Zahl"
            "#,
        )
        .unwrap();
        assert_eq!(config.locale, "de-DE");
        assert!(config.revalidate_after_model_update);
        assert_eq!(config.messages["validate.not-a-number"], "keine Zahl");
    }

    #[cfg(feature = "config-file")]
    #[test]
    fn toml_type_errors_are_parse_errors() {
        let err = ContextConfig::from_toml_str("revalidate_after_model_update = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
