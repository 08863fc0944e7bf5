#![forbid(unsafe_code)]

//! Converters between target and model representations.
//!
//! A [`Converter`] is oriented: "target" is the UI-facing side, "model" the
//! domain side. Converters are pure; failures are reported as
//! [`ConversionError`] and never panic.

use std::rc::Rc;

use tether_core::{Value, ValueType};

use crate::error::ConversionError;

/// Translates values between the target and model side of a binding.
pub trait Converter {
    fn convert_target_to_model(&self, value: &Value) -> Result<Value, ConversionError>;

    fn convert_model_to_target(&self, value: &Value) -> Result<Value, ConversionError>;

    /// `(target, model)` types this converter was written for; `None`
    /// accepts any type on that side.
    fn declared_types(&self) -> (Option<ValueType>, Option<ValueType>) {
        (None, None)
    }
}

/// Whether a converter declaring `declared` may sit between observables of
/// type `actual`. Unknown on either side is accepted.
#[must_use]
pub fn fits(declared: Option<ValueType>, actual: Option<ValueType>) -> bool {
    match (declared, actual) {
        (Some(d), Some(a)) => d.is_compatible_with(a),
        _ => true,
    }
}

fn widen(value: &Value, to: Option<ValueType>) -> Value {
    match (value, to) {
        (Value::Int(i), Some(ValueType::Float)) => Value::Float(*i as f64),
        _ => value.clone(),
    }
}

// ---------------------------------------------------------------------------
// IdentityConverter
// ---------------------------------------------------------------------------

/// Passes values through unchanged, widening `Int` to `Float` when the
/// receiving side is declared `Float`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdentityConverter {
    target: Option<ValueType>,
    model: Option<ValueType>,
}

impl IdentityConverter {
    #[must_use]
    pub const fn new(target: Option<ValueType>, model: Option<ValueType>) -> Self {
        Self { target, model }
    }
}

impl Converter for IdentityConverter {
    fn convert_target_to_model(&self, value: &Value) -> Result<Value, ConversionError> {
        Ok(widen(value, self.model))
    }

    fn convert_model_to_target(&self, value: &Value) -> Result<Value, ConversionError> {
        Ok(widen(value, self.target))
    }

    fn declared_types(&self) -> (Option<ValueType>, Option<ValueType>) {
        (self.target, self.model)
    }
}

// ---------------------------------------------------------------------------
// TextConverter
// ---------------------------------------------------------------------------

/// Text on the target side, a parsed scalar on the model side.
///
/// Parsing trims surrounding whitespace. Booleans accept `true`/`false` in
/// any case. Formatting uses `Value`'s `Display`, so `Null` becomes `""`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextConverter {
    model: ValueType,
}

impl TextConverter {
    #[must_use]
    pub const fn int() -> Self {
        Self {
            model: ValueType::Int,
        }
    }

    #[must_use]
    pub const fn float() -> Self {
        Self {
            model: ValueType::Float,
        }
    }

    #[must_use]
    pub const fn bool() -> Self {
        Self {
            model: ValueType::Bool,
        }
    }

    /// A text converter for `model`, if it is a parseable scalar type.
    #[must_use]
    pub fn for_type(model: ValueType) -> Option<Self> {
        match model {
            ValueType::Int | ValueType::Float | ValueType::Bool => Some(Self { model }),
            ValueType::Text | ValueType::List => None,
        }
    }

    pub fn parse(&self, text: &str) -> Result<Value, ConversionError> {
        let trimmed = text.trim();
        let unparsable = || ConversionError::Unparsable {
            input: text.to_owned(),
            expected: self.model,
        };
        match self.model {
            ValueType::Int => trimmed.parse().map(Value::Int).map_err(|_| unparsable()),
            ValueType::Float => trimmed
                .parse::<f64>()
                .ok()
                .filter(|x| x.is_finite())
                .map(Value::Float)
                .ok_or_else(unparsable),
            ValueType::Bool => {
                if trimmed.eq_ignore_ascii_case("true") {
                    Ok(Value::Bool(true))
                } else if trimmed.eq_ignore_ascii_case("false") {
                    Ok(Value::Bool(false))
                } else {
                    Err(unparsable())
                }
            }
            ValueType::Text | ValueType::List => Err(unparsable()),
        }
    }
}

impl Converter for TextConverter {
    fn convert_target_to_model(&self, value: &Value) -> Result<Value, ConversionError> {
        match value {
            Value::Text(s) => self.parse(s),
            Value::Null => Ok(Value::Null),
            other if other.value_type().is_some_and(|t| self.model.is_assignable_from(t)) => {
                Ok(widen(other, Some(self.model)))
            }
            other => Err(ConversionError::mismatch(ValueType::Text, other.value_type())),
        }
    }

    fn convert_model_to_target(&self, value: &Value) -> Result<Value, ConversionError> {
        match value {
            Value::List(_) => Err(ConversionError::mismatch(self.model, Some(ValueType::List))),
            other => Ok(Value::Text(other.to_string())),
        }
    }

    fn declared_types(&self) -> (Option<ValueType>, Option<ValueType>) {
        (Some(ValueType::Text), Some(self.model))
    }
}

// ---------------------------------------------------------------------------
// Flipped
// ---------------------------------------------------------------------------

/// Swaps the target and model sides of another converter.
#[derive(Clone)]
pub struct Flipped(pub Rc<dyn Converter>);

impl Converter for Flipped {
    fn convert_target_to_model(&self, value: &Value) -> Result<Value, ConversionError> {
        self.0.convert_model_to_target(value)
    }

    fn convert_model_to_target(&self, value: &Value) -> Result<Value, ConversionError> {
        self.0.convert_target_to_model(value)
    }

    fn declared_types(&self) -> (Option<ValueType>, Option<ValueType>) {
        let (target, model) = self.0.declared_types();
        (model, target)
    }
}

impl std::fmt::Debug for Flipped {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Flipped")
            .field(&self.0.declared_types())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// FnConverter
// ---------------------------------------------------------------------------

type ConvertFn = Rc<dyn Fn(&Value) -> Result<Value, ConversionError>>;

/// A converter built from two closures.
///
/// ```
/// use tether_core::{Value, ValueType};
/// use tether_runtime::convert::{Converter, FnConverter};
///
/// let cents = FnConverter::new(
///     |v| Ok(Value::Int((v.as_float().unwrap_or_default() * 100.0).round() as i64)),
///     |v| Ok(Value::Float(v.as_int().unwrap_or_default() as f64 / 100.0)),
/// )
/// .with_types(Some(ValueType::Float), Some(ValueType::Int));
///
/// assert_eq!(cents.convert_target_to_model(&Value::Float(1.25)).unwrap(), Value::Int(125));
/// ```
#[derive(Clone)]
pub struct FnConverter {
    to_model: ConvertFn,
    to_target: ConvertFn,
    types: (Option<ValueType>, Option<ValueType>),
}

impl FnConverter {
    pub fn new(
        to_model: impl Fn(&Value) -> Result<Value, ConversionError> + 'static,
        to_target: impl Fn(&Value) -> Result<Value, ConversionError> + 'static,
    ) -> Self {
        Self {
            to_model: Rc::new(to_model),
            to_target: Rc::new(to_target),
            types: (None, None),
        }
    }

    #[must_use]
    pub fn with_types(mut self, target: Option<ValueType>, model: Option<ValueType>) -> Self {
        self.types = (target, model);
        self
    }
}

impl Converter for FnConverter {
    fn convert_target_to_model(&self, value: &Value) -> Result<Value, ConversionError> {
        (self.to_model)(value)
    }

    fn convert_model_to_target(&self, value: &Value) -> Result<Value, ConversionError> {
        (self.to_target)(value)
    }

    fn declared_types(&self) -> (Option<ValueType>, Option<ValueType>) {
        self.types
    }
}

impl std::fmt::Debug for FnConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnConverter")
            .field("types", &self.types)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_widens_int_into_float_model() {
        let c = IdentityConverter::new(Some(ValueType::Int), Some(ValueType::Float));
        assert_eq!(c.convert_target_to_model(&Value::Int(3)).unwrap(), Value::Float(3.0));
        assert_eq!(c.convert_model_to_target(&Value::Float(2.5)).unwrap(), Value::Float(2.5));
    }

    #[test]
    fn text_int_parses_and_formats() {
        let c = TextConverter::int();
        assert_eq!(c.convert_target_to_model(&Value::from(" 42 ")).unwrap(), Value::Int(42));
        assert_eq!(c.convert_model_to_target(&Value::Int(-7)).unwrap(), Value::from("-7"));
        let err = c.convert_target_to_model(&Value::from("12a")).unwrap_err();
        assert_eq!(
            err,
            ConversionError::Unparsable {
                input: "12a".into(),
                expected: ValueType::Int
            }
        );
    }

    #[test]
    fn text_float_rejects_non_finite() {
        let c = TextConverter::float();
        assert_eq!(c.convert_target_to_model(&Value::from("1.5")).unwrap(), Value::Float(1.5));
        assert!(c.convert_target_to_model(&Value::from("inf")).is_err());
    }

    #[test]
    fn text_bool_is_case_insensitive() {
        let c = TextConverter::bool();
        assert_eq!(c.convert_target_to_model(&Value::from("TRUE")).unwrap(), Value::Bool(true));
        assert_eq!(c.convert_model_to_target(&Value::Bool(false)).unwrap(), Value::from("false"));
        assert!(c.convert_target_to_model(&Value::from("yes")).is_err());
    }

    #[test]
    fn null_passes_both_ways() {
        let c = TextConverter::int();
        assert_eq!(c.convert_target_to_model(&Value::Null).unwrap(), Value::Null);
        assert_eq!(c.convert_model_to_target(&Value::Null).unwrap(), Value::from(""));
    }

    #[test]
    fn flipped_swaps_direction_and_types() {
        let c = Flipped(Rc::new(TextConverter::int()));
        assert_eq!(c.declared_types(), (Some(ValueType::Int), Some(ValueType::Text)));
        assert_eq!(c.convert_target_to_model(&Value::Int(5)).unwrap(), Value::from("5"));
        assert_eq!(c.convert_model_to_target(&Value::from("6")).unwrap(), Value::Int(6));
    }

    #[test]
    fn fits_accepts_unknown_and_compatible() {
        assert!(fits(None, Some(ValueType::Int)));
        assert!(fits(Some(ValueType::Float), Some(ValueType::Int)));
        assert!(!fits(Some(ValueType::Text), Some(ValueType::Int)));
    }
}
