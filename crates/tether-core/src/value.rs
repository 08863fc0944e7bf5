#![forbid(unsafe_code)]

//! Dynamic value model shared by observables, converters, and validators.
//!
//! Bindings resolve converters by runtime type, so observable contents are
//! carried as a [`Value`] and described by a [`ValueType`]. An observable
//! that cannot state its type reports `None` ("unknown").
//!
//! # Invariants
//!
//! 1. `Value::Null.value_type()` is `None`; every other variant maps to
//!    exactly one `ValueType`.
//! 2. Assignability is reflexive, and the only widening is `Float <- Int`.
//! 3. `Display` never fails; `Null` renders as the empty string.

use core::fmt;

/// Runtime type descriptor for a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValueType {
    Bool,
    Int,
    Float,
    Text,
    List,
}

impl ValueType {
    /// Whether a value of type `other` may be stored where `self` is expected.
    #[must_use]
    pub fn is_assignable_from(self, other: ValueType) -> bool {
        self == other || matches!((self, other), (ValueType::Float, ValueType::Int))
    }

    /// Whether either type is assignable to the other.
    #[must_use]
    pub fn is_compatible_with(self, other: ValueType) -> bool {
        self.is_assignable_from(other) || other.is_assignable_from(self)
    }

    /// Short lowercase name, used in error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Text => "text",
            Self::List => "list",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Render an optional type, spelling out the unknown case.
#[must_use]
pub fn type_name(ty: Option<ValueType>) -> &'static str {
    ty.map_or("unknown", ValueType::name)
}

/// A dynamically typed value held by an observable.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<Value>),
}

impl Value {
    /// The runtime type of this value, `None` for `Null`.
    #[must_use]
    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            Self::Null => None,
            Self::Bool(_) => Some(ValueType::Bool),
            Self::Int(_) => Some(ValueType::Int),
            Self::Float(_) => Some(ValueType::Float),
            Self::Text(_) => Some(ValueType::Text),
            Self::List(_) => Some(ValueType::List),
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view; integers widen to floats.
    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    /// Consume the value, returning the list items if this is a list.
    #[must_use]
    pub fn into_list(self) -> Option<Vec<Value>> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Build a text value.
    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Build a list value from anything convertible into values.
    #[must_use]
    pub fn list<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::List(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_has_no_type() {
        assert_eq!(Value::Null.value_type(), None);
        assert_eq!(Value::from(3).value_type(), Some(ValueType::Int));
        assert_eq!(Value::from("x").value_type(), Some(ValueType::Text));
    }

    #[test]
    fn float_accepts_int_but_not_reverse() {
        assert!(ValueType::Float.is_assignable_from(ValueType::Int));
        assert!(!ValueType::Int.is_assignable_from(ValueType::Float));
        assert!(ValueType::Int.is_compatible_with(ValueType::Float));
        assert!(!ValueType::Text.is_compatible_with(ValueType::Int));
    }

    #[test]
    fn display_renders_null_as_empty() {
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::list([1, 2, 3]).to_string(), "[1, 2, 3]");
        assert_eq!(Value::text("hi").to_string(), "hi");
    }

    #[test]
    fn option_maps_none_to_null() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some(7)), Value::Int(7));
    }

    #[test]
    fn int_widens_to_float_view() {
        assert_eq!(Value::Int(2).as_float(), Some(2.0));
        assert_eq!(Value::text("2").as_float(), None);
    }

    #[test]
    fn type_name_spells_unknown() {
        assert_eq!(type_name(None), "unknown");
        assert_eq!(type_name(Some(ValueType::List)), "list");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn value_serializes_with_serde() {
        let json = serde_json::to_string(&Value::list([1, 2])).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Value::list([1, 2]));
    }
}
