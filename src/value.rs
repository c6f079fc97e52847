//! Runtime value representation for extracted field data.
//!
//! Accessors produce [`Value`]s; the column materializer packs them into
//! typed Arrow arrays. The mapping is strict: a `Value` variant must match
//! the declared [`ElementType`](crate::schema::ElementType) of its column,
//! and `Value::Null` is only legal for nullable fields. Accessors own any
//! conversions (e.g. widening an `i32` source field to `Int64`).

use crate::schema::ElementType;

/// A single extracted field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent value; legal only for nullable fields.
    Null,
    /// Boolean value.
    Bool(bool),
    /// 32-bit signed integer.
    Int32(i32),
    /// 64-bit signed integer.
    Int64(i64),
    /// 32-bit IEEE 754 float.
    Float32(f32),
    /// 64-bit IEEE 754 float.
    Float64(f64),
    /// UTF-8 string.
    Utf8(String),
    /// Arbitrary byte sequence.
    Binary(Vec<u8>),
}

impl Value {
    /// Whether this value is `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Element type this value packs into, or `None` for `Null`.
    pub fn element_type(&self) -> Option<ElementType> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(ElementType::Bool),
            Value::Int32(_) => Some(ElementType::Int32),
            Value::Int64(_) => Some(ElementType::Int64),
            Value::Float32(_) => Some(ElementType::Float32),
            Value::Float64(_) => Some(ElementType::Float64),
            Value::Utf8(_) => Some(ElementType::Utf8),
            Value::Binary(_) => Some(ElementType::Binary),
        }
    }

    /// Short variant name for diagnostics.
    pub(crate) fn variant_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Int32(_) => "Int32",
            Value::Int64(_) => "Int64",
            Value::Float32(_) => "Float32",
            Value::Float64(_) => "Float64",
            Value::Utf8(_) => "Utf8",
            Value::Binary(_) => "Binary",
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Utf8(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Utf8(v.to_owned())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Binary(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => Value::Null,
        }
    }
}

/// Failure to read or convert a value out of one record.
///
/// Raised by [`FieldAccessor`](crate::record::FieldAccessor) closures when a
/// source value cannot be represented (out of range, invalid encoding, ...).
/// The materializer wraps it with the field name before surfacing it.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct ExtractError(pub String);

impl ExtractError {
    /// Build an extract error from any displayable reason.
    pub fn new(reason: impl Into<String>) -> Self {
        ExtractError(reason.into())
    }
}
