#![forbid(unsafe_code)]

//! Validators and validation messages.
//!
//! A [`Validator`] answers two questions about a target-side value:
//! `is_partially_valid` (may this still become valid while the user is
//! typing?) and `is_valid` (is it acceptable to commit?). Both return
//! `Result<(), ValidationMessage>`; the message is what the context
//! publishes to the UI.

use std::fmt;
use std::rc::Rc;

use tether_core::{Value, ValueType};
use tether_i18n::{Locale, MessageCatalog, keys};

/// A human-readable reason a value was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValidationMessage(String);

impl ValidationMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ValidationMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ValidationMessage {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ValidationMessage {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Checks candidate values before they are committed.
pub trait Validator {
    /// Final check, run before a value is converted and written.
    fn is_valid(&self, value: &Value) -> Result<(), ValidationMessage>;

    /// In-progress check, run on `Verify`. Accepts everything by default.
    fn is_partially_valid(&self, _value: &Value) -> Result<(), ValidationMessage> {
        Ok(())
    }
}

/// Accepts every value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlwaysValid;

impl Validator for AlwaysValid {
    fn is_valid(&self, _value: &Value) -> Result<(), ValidationMessage> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TextValidator
// ---------------------------------------------------------------------------

/// Validates text that must parse as `Int`, `Float` or `Bool`.
///
/// | Input | Partial | Final |
/// |-------|---------|-------|
/// | `""`, `"-"` (numbers) | ok | rejected |
/// | `"1."` (float) | ok | ok |
/// | `"12a"` (int) | rejected | rejected |
/// | `"tr"` (bool) | ok | rejected |
///
/// Values that already have an assignable type pass both checks.
#[derive(Clone)]
pub struct TextValidator {
    expected: ValueType,
    catalog: Rc<MessageCatalog>,
    locale: Locale,
}

impl TextValidator {
    /// `None` when `expected` has no textual form to check.
    pub fn new(
        expected: ValueType,
        catalog: Rc<MessageCatalog>,
        locale: impl Into<Locale>,
    ) -> Option<Self> {
        matches!(expected, ValueType::Int | ValueType::Float | ValueType::Bool).then(|| Self {
            expected,
            catalog,
            locale: locale.into(),
        })
    }

    #[must_use]
    pub fn expected(&self) -> ValueType {
        self.expected
    }

    fn reject(&self, input: &str) -> ValidationMessage {
        let key = match self.expected {
            ValueType::Int => keys::NOT_AN_INTEGER,
            ValueType::Bool => keys::NOT_A_BOOLEAN,
            _ => keys::NOT_A_NUMBER,
        };
        ValidationMessage::new(self.catalog.format_or_key(
            &self.locale,
            key,
            &[("value", input)],
        ))
    }

    /// `Some(text)` when the value needs checking, `None` when it is
    /// already of an acceptable type.
    fn text_of<'a>(&self, value: &'a Value) -> Result<Option<&'a str>, ValidationMessage> {
        match value {
            Value::Text(s) => Ok(Some(s.as_str())),
            Value::Null => Ok(Some("")),
            other => match other.value_type() {
                Some(t) if self.expected.is_assignable_from(t) => Ok(None),
                _ => Err(self.reject(&other.to_string())),
            },
        }
    }

    fn complete(&self, s: &str) -> bool {
        let s = s.trim();
        match self.expected {
            ValueType::Int => s.parse::<i64>().is_ok(),
            ValueType::Float => s.parse::<f64>().is_ok_and(f64::is_finite),
            ValueType::Bool => s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("false"),
            ValueType::Text | ValueType::List => false,
        }
    }

    fn in_progress(&self, s: &str) -> bool {
        let s = s.trim();
        let unsigned = s.strip_prefix(['-', '+']).unwrap_or(s);
        match self.expected {
            ValueType::Int => unsigned.chars().all(|c| c.is_ascii_digit()),
            ValueType::Float => {
                let (mantissa, exponent) = match unsigned.split_once(['e', 'E']) {
                    Some((m, e)) => (m, Some(e.strip_prefix(['-', '+']).unwrap_or(e))),
                    None => (unsigned, None),
                };
                mantissa.chars().filter(|&c| c == '.').count() <= 1
                    && mantissa.chars().all(|c| c.is_ascii_digit() || c == '.')
                    && exponent.is_none_or(|e| e.chars().all(|c| c.is_ascii_digit()))
            }
            ValueType::Bool => {
                let lower = s.to_ascii_lowercase();
                "true".starts_with(&lower) || "false".starts_with(&lower)
            }
            ValueType::Text | ValueType::List => false,
        }
    }
}

impl Validator for TextValidator {
    fn is_valid(&self, value: &Value) -> Result<(), ValidationMessage> {
        match self.text_of(value)? {
            Some(s) if !self.complete(s) => Err(self.reject(s)),
            _ => Ok(()),
        }
    }

    fn is_partially_valid(&self, value: &Value) -> Result<(), ValidationMessage> {
        match self.text_of(value)? {
            Some(s) if !self.in_progress(s) => Err(self.reject(s)),
            _ => Ok(()),
        }
    }
}

impl fmt::Debug for TextValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextValidator")
            .field("expected", &self.expected)
            .field("locale", &self.locale)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// FnValidator
// ---------------------------------------------------------------------------

type CheckFn = Rc<dyn Fn(&Value) -> Result<(), ValidationMessage>>;

/// A validator built from closures.
#[derive(Clone)]
pub struct FnValidator {
    valid: CheckFn,
    partial: Option<CheckFn>,
}

impl FnValidator {
    pub fn new(valid: impl Fn(&Value) -> Result<(), ValidationMessage> + 'static) -> Self {
        Self {
            valid: Rc::new(valid),
            partial: None,
        }
    }

    /// Add an in-progress check; without one, partial validation accepts
    /// everything.
    #[must_use]
    pub fn with_partial(
        mut self,
        partial: impl Fn(&Value) -> Result<(), ValidationMessage> + 'static,
    ) -> Self {
        self.partial = Some(Rc::new(partial));
        self
    }
}

impl Validator for FnValidator {
    fn is_valid(&self, value: &Value) -> Result<(), ValidationMessage> {
        (self.valid)(value)
    }

    fn is_partially_valid(&self, value: &Value) -> Result<(), ValidationMessage> {
        self.partial.as_ref().map_or(Ok(()), |p| p(value))
    }
}

impl fmt::Debug for FnValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnValidator")
            .field("has_partial", &self.partial.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_i18n::default_catalog;

    fn validator(ty: ValueType) -> TextValidator {
        TextValidator::new(ty, Rc::new(default_catalog()), "en").unwrap()
    }

    #[test]
    fn int_text_partial_and_final() {
        let v = validator(ValueType::Int);
        for ok in ["", "-", "+", "12", "-3"] {
            assert!(v.is_partially_valid(&Value::from(ok)).is_ok(), "{ok}");
        }
        assert!(v.is_partially_valid(&Value::from("12a")).is_err());
        assert!(v.is_valid(&Value::from("-")).is_err());
        assert!(v.is_valid(&Value::from(" 17 ")).is_ok());
    }

    #[test]
    fn rejection_message_is_localized() {
        let v = validator(ValueType::Int);
        let msg = v.is_valid(&Value::from("12a")).unwrap_err();
        assert_eq!(msg.as_str(), "'12a' is not a whole number");

        let de = TextValidator::new(ValueType::Int, Rc::new(default_catalog()), "de").unwrap();
        let msg = de.is_valid(&Value::from("x")).unwrap_err();
        assert_eq!(msg.as_str(), "'x' ist keine ganze Zahl");
    }

    #[test]
    fn float_text_accepts_in_progress_forms() {
        let v = validator(ValueType::Float);
        for ok in ["1.", "-0.5", "1e", "1e-", ".5"] {
            assert!(v.is_partially_valid(&Value::from(ok)).is_ok(), "{ok}");
        }
        assert!(v.is_partially_valid(&Value::from("1.2.3")).is_err());
        assert!(v.is_valid(&Value::from("1.")).is_ok());
        assert!(v.is_valid(&Value::from("1e")).is_err());
    }

    #[test]
    fn bool_text_accepts_prefixes() {
        let v = validator(ValueType::Bool);
        assert!(v.is_partially_valid(&Value::from("tr")).is_ok());
        assert!(v.is_partially_valid(&Value::from("x")).is_err());
        assert!(v.is_valid(&Value::from("tr")).is_err());
        assert!(v.is_valid(&Value::from("False")).is_ok());
    }

    #[test]
    fn typed_values_pass() {
        let v = validator(ValueType::Float);
        assert!(v.is_valid(&Value::Int(3)).is_ok());
        assert!(v.is_valid(&Value::list([1])).is_err());
    }

    #[test]
    fn text_validator_needs_parseable_type() {
        assert!(TextValidator::new(ValueType::Text, Rc::new(default_catalog()), "en").is_none());
    }

    #[test]
    fn fn_validator_defaults_partial_to_ok() {
        let v = FnValidator::new(|v| {
            if v.as_int().is_some_and(|i| i >= 0) {
                Ok(())
            } else {
                Err("must not be negative".into())
            }
        });
        assert!(v.is_partially_valid(&Value::Int(-1)).is_ok());
        assert_eq!(
            v.is_valid(&Value::Int(-1)).unwrap_err().to_string(),
            "must not be negative"
        );
    }
}
