#![forbid(unsafe_code)]

//! Error types for binding construction, conversion, and configuration.
//!
//! Validation failures are not errors: they travel as
//! [`ValidationMessage`](crate::validate::ValidationMessage)s through the
//! context's message registry. The types here cover wiring mistakes
//! ([`BindingError`]), converter failures ([`ConversionError`]) and bad
//! configuration ([`ConfigError`]).

use thiserror::Error;

use tether_core::{ValueType, type_name};
use tether_i18n::I18nError;

use crate::context::ObservableKind;

/// A binding could not be constructed, or hit a path it cannot handle.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    /// No converter was supplied and none could be resolved.
    #[error("no converter from {from} to {to}")]
    MissingConverter {
        from: &'static str,
        to: &'static str,
    },

    /// No validator was supplied and none could be resolved.
    #[error("no validator from {from} to {to}")]
    MissingValidator {
        from: &'static str,
        to: &'static str,
    },

    /// The converter's declared types do not fit the observables.
    #[error(
        "converter declared for {declared_target} -> {declared_model} cannot bind {target} -> {model}"
    )]
    IncompatibleConverter {
        declared_target: &'static str,
        declared_model: &'static str,
        target: &'static str,
        model: &'static str,
    },

    /// A model tree node type has no assignable counterpart in the target.
    #[error("model node type {node_type} is not assignable to any target node type")]
    IncompatibleNodeTypes { node_type: &'static str },

    /// A tree `Replace` carried something other than a list of children.
    #[error("tree replace payload must be a list, got {found}")]
    UnrecognizedPayload { found: &'static str },

    /// The context has no binding for this pair of observable kinds.
    #[error("cannot bind a {target} target to a {model} model")]
    UnsupportedPairing {
        target: ObservableKind,
        model: ObservableKind,
    },

    /// A change kind reached a binding that has no policy for it.
    #[error("{operation} is not supported by {binding} bindings")]
    Unsupported {
        operation: &'static str,
        binding: &'static str,
    },

    /// The context (or binding) was already disposed.
    #[error("binding context has been disposed")]
    Disposed,
}

impl BindingError {
    pub(crate) fn missing_converter(from: Option<ValueType>, to: Option<ValueType>) -> Self {
        Self::MissingConverter {
            from: type_name(from),
            to: type_name(to),
        }
    }

    pub(crate) fn missing_validator(from: Option<ValueType>, to: Option<ValueType>) -> Self {
        Self::MissingValidator {
            from: type_name(from),
            to: type_name(to),
        }
    }

    /// Whether this error comes from wiring (construction time) rather than
    /// from a change the binding received later.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::MissingConverter { .. }
                | Self::MissingValidator { .. }
                | Self::IncompatibleConverter { .. }
                | Self::IncompatibleNodeTypes { .. }
                | Self::UnsupportedPairing { .. }
        )
    }

    /// Whether this error was raised while a live binding handled a change.
    pub fn is_runtime_fault(&self) -> bool {
        matches!(
            self,
            Self::UnrecognizedPayload { .. } | Self::Unsupported { .. }
        )
    }
}

/// A converter could not translate a value.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    /// Text could not be parsed as the expected type.
    #[error("'{input}' cannot be read as {expected}")]
    Unparsable { input: String, expected: ValueType },

    /// The value had a type the converter does not accept.
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: ValueType,
        found: &'static str,
    },

    /// Failure reported by a user-supplied converter.
    #[error("{0}")]
    Custom(String),
}

impl ConversionError {
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }

    pub(crate) fn mismatch(expected: ValueType, found: Option<ValueType>) -> Self {
        Self::TypeMismatch {
            expected,
            found: type_name(found),
        }
    }
}

/// Invalid context configuration.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid locale in configuration: {0}")]
    Locale(#[from] I18nError),

    #[cfg(feature = "config-file")]
    #[error("cannot parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_types() {
        let err = BindingError::missing_converter(Some(ValueType::List), None);
        assert_eq!(err.to_string(), "no converter from list to unknown");
        assert!(err.is_configuration_error());
        assert!(!err.is_runtime_fault());
    }

    #[test]
    fn unsupported_is_a_runtime_fault() {
        let err = BindingError::Unsupported {
            operation: "stale",
            binding: "table",
        };
        assert_eq!(err.to_string(), "stale is not supported by table bindings");
        assert!(err.is_runtime_fault());
    }

    #[test]
    fn conversion_error_display() {
        let err = ConversionError::Unparsable {
            input: "12a".into(),
            expected: ValueType::Int,
        };
        assert_eq!(err.to_string(), "'12a' cannot be read as int");
        assert_eq!(
            ConversionError::mismatch(ValueType::Text, Some(ValueType::List)).to_string(),
            "expected text, found list"
        );
    }

    #[test]
    fn config_error_wraps_locale_error() {
        let err = ConfigError::from(I18nError::InvalidLocale("??".into()));
        assert_eq!(
            err.to_string(),
            "invalid locale in configuration: unusable locale tag \"??\""
        );
    }
}
