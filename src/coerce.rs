//! Conversion of raw path/query strings into declared parameter types.
//!
//! The set of supported types is closed: [`FieldType`] lists every shape a path or
//! query parameter may declare, and [`coerce`] is total over it. Failures are
//! reported uniformly as [`TypeConversion`] without the underlying parse error, so
//! callers can map them onto a single HTTP condition.

use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Declared type of a path or query parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Integer,
    Text,
    Boolean,
    Uuid,
    ListOf(Box<FieldType>),
    OptionalOf(Box<FieldType>),
}

impl FieldType {
    /// A list whose element type was left unspecified; elements stay text.
    #[must_use]
    pub fn list() -> Self {
        FieldType::ListOf(Box::new(FieldType::Text))
    }

    #[must_use]
    pub fn list_of(item: FieldType) -> Self {
        FieldType::ListOf(Box::new(item))
    }

    #[must_use]
    pub fn optional(inner: FieldType) -> Self {
        FieldType::OptionalOf(Box::new(inner))
    }

    #[must_use]
    pub fn is_optional(&self) -> bool {
        matches!(self, FieldType::OptionalOf(_))
    }

    /// The type used for coercion: optional wrappers removed.
    #[must_use]
    pub fn inner(&self) -> &FieldType {
        match self {
            FieldType::OptionalOf(inner) => inner.inner(),
            other => other,
        }
    }

    /// Regex fragment matching one path segment of this type.
    ///
    /// Only scalar types can appear in a path template.
    #[must_use]
    pub fn path_pattern(&self) -> Option<&'static str> {
        match self {
            FieldType::Integer => Some("[0-9]+"),
            FieldType::Text => Some("[^/]+"),
            FieldType::Boolean => Some("(?:true|false)"),
            FieldType::Uuid => {
                Some("[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}")
            }
            FieldType::ListOf(_) | FieldType::OptionalOf(_) => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Integer => f.write_str("int"),
            FieldType::Text => f.write_str("str"),
            FieldType::Boolean => f.write_str("bool"),
            FieldType::Uuid => f.write_str("uuid"),
            FieldType::ListOf(item) => write!(f, "list[{item}]"),
            FieldType::OptionalOf(inner) => write!(f, "optional[{inner}]"),
        }
    }
}

/// A coerced parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Integer(i64),
    Text(String),
    Boolean(bool),
    Uuid(Uuid),
    List(Vec<ParamValue>),
    /// An optional parameter that was not supplied.
    Null,
}

impl ParamValue {
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Text(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            ParamValue::Uuid(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[ParamValue]> {
        match self {
            ParamValue::List(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, ParamValue::Null)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Integer(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Boolean(value)
    }
}

impl From<ParamValue> for Value {
    fn from(value: ParamValue) -> Self {
        match value {
            ParamValue::Integer(v) => Value::from(v),
            ParamValue::Text(v) => Value::String(v),
            ParamValue::Boolean(v) => Value::Bool(v),
            ParamValue::Uuid(v) => Value::String(v.to_string()),
            ParamValue::List(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            ParamValue::Null => Value::Null,
        }
    }
}

/// Raw input to [`coerce`]: a single string or an already-split sequence.
#[derive(Debug, Clone, Copy)]
pub enum RawValue<'a> {
    Single(&'a str),
    Many(&'a [String]),
}

/// A raw value could not be converted to its declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeConversion {
    pub ty: FieldType,
}

impl fmt::Display for TypeConversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Failed to convert parameter to type {}", self.ty)
    }
}

impl std::error::Error for TypeConversion {}

/// Convert `raw` into a value of type `ty`.
///
/// Booleans never fail: only a case-insensitive `true` is truthy. Lists require a
/// sequence and coerce each element with the list's element type. A scalar target
/// accepts a sequence of exactly one element.
pub fn coerce(ty: &FieldType, raw: RawValue<'_>) -> Result<ParamValue, TypeConversion> {
    convert(ty, raw).ok_or_else(|| TypeConversion { ty: ty.clone() })
}

fn convert(ty: &FieldType, raw: RawValue<'_>) -> Option<ParamValue> {
    match ty {
        FieldType::OptionalOf(inner) => convert(inner, raw),
        FieldType::ListOf(item) => match raw {
            RawValue::Many(values) => values
                .iter()
                .map(|v| convert(item, RawValue::Single(v)))
                .collect::<Option<Vec<_>>>()
                .map(ParamValue::List),
            RawValue::Single(_) => None,
        },
        scalar => {
            let value = match raw {
                RawValue::Single(v) => v,
                RawValue::Many([only]) => only.as_str(),
                RawValue::Many(_) => return None,
            };
            convert_scalar(scalar, value)
        }
    }
}

fn convert_scalar(ty: &FieldType, value: &str) -> Option<ParamValue> {
    match ty {
        FieldType::Integer => value.parse::<i64>().ok().map(ParamValue::Integer),
        FieldType::Text => Some(ParamValue::Text(value.to_string())),
        FieldType::Boolean => Some(ParamValue::Boolean(value.eq_ignore_ascii_case("true"))),
        FieldType::Uuid => Uuid::parse_str(value).ok().map(ParamValue::Uuid),
        FieldType::ListOf(_) | FieldType::OptionalOf(_) => None,
    }
}

/// Conversion from a coerced [`ParamValue`] into a native Rust type.
pub trait FromParam: Sized {
    fn from_param(value: &ParamValue) -> Option<Self>;
}

impl FromParam for ParamValue {
    fn from_param(value: &ParamValue) -> Option<Self> {
        Some(value.clone())
    }
}

impl FromParam for i64 {
    fn from_param(value: &ParamValue) -> Option<Self> {
        value.as_i64()
    }
}

impl FromParam for String {
    fn from_param(value: &ParamValue) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl FromParam for bool {
    fn from_param(value: &ParamValue) -> Option<Self> {
        value.as_bool()
    }
}

impl FromParam for Uuid {
    fn from_param(value: &ParamValue) -> Option<Self> {
        value.as_uuid()
    }
}

impl<T: FromParam> FromParam for Vec<T> {
    fn from_param(value: &ParamValue) -> Option<Self> {
        value.as_list()?.iter().map(T::from_param).collect()
    }
}

impl<T: FromParam> FromParam for Option<T> {
    fn from_param(value: &ParamValue) -> Option<Self> {
        match value {
            ParamValue::Null => Some(None),
            other => T::from_param(other).map(Some),
        }
    }
}
