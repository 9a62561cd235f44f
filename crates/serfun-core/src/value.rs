//! The series value model: an ordering key (`Column`) plus one of seven payloads.
//!
//! Accessors never coerce silently. A conversion that does not make sense for the
//! variant fails with `Error::WrongVariant`, with two deliberate exceptions:
//! `as_double` on a string is NaN, and `as_boolean` on a string is "non-empty".

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::id::Endpoint;
use crate::structure::{self, Structure};

/// Ordering/identity key of a sample. `Column::null()` is the explicit "no key" sentinel.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Column(Option<String>);

impl Column {
    pub const fn null() -> Self {
        Self(None)
    }

    pub fn new(key: impl Into<String>) -> Self {
        Self(Some(key.into()))
    }

    pub fn is_null(&self) -> bool {
        self.0.is_none()
    }

    pub fn as_str(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl From<&str> for Column {
    fn from(s: &str) -> Self {
        Column::new(s)
    }
}

impl From<String> for Column {
    fn from(s: String) -> Self {
        Column::new(s)
    }
}

impl From<Option<String>> for Column {
    fn from(s: Option<String>) -> Self {
        Column(s)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str().unwrap_or(""))
    }
}

/// Payload of a series value. Nested members of `Structure` and `Array` carry no column.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Long(i64),
    Decimal(f64),
    String(String),
    Boolean(bool),
    Structure(Structure),
    Array(Vec<Value>),
    /// Output port of a node in the enclosing graph.
    Stream(Endpoint),
}

impl Value {
    /// Variant name used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Long(_) => "long",
            Value::Decimal(_) => "decimal",
            Value::String(_) => "string",
            Value::Boolean(_) => "boolean",
            Value::Structure(_) => "structure",
            Value::Array(_) => "array",
            Value::Stream(_) => "stream",
        }
    }

    /// Decimals truncate toward zero.
    pub fn as_long(&self) -> Result<i64> {
        match self {
            Value::Long(v) => Ok(*v),
            Value::Decimal(v) => Ok(*v as i64),
            other => Err(Error::wrong("long", other.kind())),
        }
    }

    pub fn as_double(&self) -> Result<f64> {
        match self {
            Value::Long(v) => Ok(*v as f64),
            Value::Decimal(v) => Ok(*v),
            Value::String(_) => Ok(f64::NAN),
            other => Err(Error::wrong("decimal", other.kind())),
        }
    }

    /// Textual form. Streams have none.
    pub fn as_string(&self) -> Result<String> {
        match self {
            Value::String(s) => Ok(s.clone()),
            Value::Stream(_) => Err(Error::wrong("string", "stream")),
            other => Ok(other.to_string()),
        }
    }

    pub fn as_boolean(&self) -> Result<bool> {
        match self {
            Value::Boolean(b) => Ok(*b),
            Value::String(s) => Ok(!s.is_empty()),
            other => Err(Error::wrong("boolean", other.kind())),
        }
    }

    pub fn as_structure(&self) -> Result<&Structure> {
        match self {
            Value::Structure(s) => Ok(s),
            other => Err(Error::wrong("structure", other.kind())),
        }
    }

    pub fn as_array(&self) -> Result<&[Value]> {
        match self {
            Value::Array(items) => Ok(items),
            other => Err(Error::wrong("array", other.kind())),
        }
    }

    pub fn as_stream(&self) -> Result<Endpoint> {
        match self {
            Value::Stream(ep) => Ok(*ep),
            other => Err(Error::wrong("stream", other.kind())),
        }
    }

    pub fn is_long(&self) -> bool {
        matches!(self, Value::Long(_))
    }

    pub fn is_double(&self) -> bool {
        matches!(self, Value::Decimal(_))
    }

    pub fn is_number(&self) -> bool {
        self.is_long() || self.is_double()
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, Value::Boolean(_))
    }

    pub fn is_structure(&self) -> bool {
        matches!(self, Value::Structure(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    pub fn is_stream(&self) -> bool {
        matches!(self, Value::Stream(_))
    }

    /// JSON tree text. Fails for streams and non-finite decimals, which JSON cannot carry.
    pub fn to_json(&self) -> Result<String> {
        let tree = structure::value_to_json(self, true)?;
        Ok(serde_json::to_string(&tree)?)
    }

    /// Parse any JSON tree: objects become structures, arrays become arrays.
    pub fn parse_json(text: &str) -> Result<Value> {
        let tree: serde_json::Value = serde_json::from_str(text)?;
        structure::value_from_json(tree)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Long(v) => write!(f, "{v}"),
            Value::Decimal(v) => write!(f, "{v}"),
            Value::String(s) => f.write_str(s),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Stream(ep) => write!(f, "stream:{ep}"),
            Value::Structure(_) | Value::Array(_) => {
                let tree = structure::value_to_json(self, false).map_err(|_| fmt::Error)?;
                write!(f, "{tree}")
            }
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Decimal(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Structure> for Value {
    fn from(v: Structure) -> Self {
        Value::Structure(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

impl From<Endpoint> for Value {
    fn from(v: Endpoint) -> Self {
        Value::Stream(v)
    }
}

/// One sample of a series.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesValue {
    pub column: Column,
    pub value: Value,
}

impl SeriesValue {
    pub fn new(column: impl Into<Column>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }

    /// A value without a column key (literals, CSV header rows).
    pub fn unkeyed(value: impl Into<Value>) -> Self {
        Self {
            column: Column::null(),
            value: value.into(),
        }
    }

    pub fn column(&self) -> &Column {
        &self.column
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn kind(&self) -> &'static str {
        self.value.kind()
    }

    pub fn as_long(&self) -> Result<i64> {
        self.value.as_long()
    }

    pub fn as_double(&self) -> Result<f64> {
        self.value.as_double()
    }

    pub fn as_string(&self) -> Result<String> {
        self.value.as_string()
    }

    pub fn as_boolean(&self) -> Result<bool> {
        self.value.as_boolean()
    }

    pub fn as_structure(&self) -> Result<&Structure> {
        self.value.as_structure()
    }

    pub fn as_array(&self) -> Result<&[Value]> {
        self.value.as_array()
    }

    pub fn as_stream(&self) -> Result<Endpoint> {
        self.value.as_stream()
    }

    pub fn is_long(&self) -> bool {
        self.value.is_long()
    }

    pub fn is_double(&self) -> bool {
        self.value.is_double()
    }

    pub fn is_number(&self) -> bool {
        self.value.is_number()
    }

    pub fn is_string(&self) -> bool {
        self.value.is_string()
    }

    pub fn is_boolean(&self) -> bool {
        self.value.is_boolean()
    }

    pub fn is_structure(&self) -> bool {
        self.value.is_structure()
    }

    pub fn is_array(&self) -> bool {
        self.value.is_array()
    }

    pub fn is_stream(&self) -> bool {
        self.value.is_stream()
    }

    /// Pair parallel column/value sequences into keyed samples (bulk ingest).
    pub fn zip<C, V>(
        columns: impl IntoIterator<Item = C>,
        values: impl IntoIterator<Item = V>,
    ) -> Result<Vec<SeriesValue>>
    where
        C: Into<Column>,
        V: Into<Value>,
    {
        let columns: Vec<Column> = columns.into_iter().map(Into::into).collect();
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if columns.len() != values.len() {
            return Err(Error::ArityOrType(format!(
                "zip needs equal lengths, got {} columns and {} values",
                columns.len(),
                values.len()
            )));
        }
        Ok(columns
            .into_iter()
            .zip(values)
            .map(|(column, value)| SeriesValue { column, value })
            .collect())
    }
}

impl fmt::Display for SeriesValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.value.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::NodeId;

    #[test]
    fn string_double_is_nan_not_error() {
        let v = SeriesValue::new("1", "hello");
        assert!(v.as_double().unwrap().is_nan());
        assert!(v.as_boolean().unwrap());
        assert!(!SeriesValue::new("1", "").as_boolean().unwrap());
    }

    #[test]
    fn wrong_variant_names_both_sides() {
        let v = SeriesValue::new("1", "text");
        match v.as_long() {
            Err(Error::WrongVariant { attempted, actual }) => {
                assert_eq!(attempted, "long");
                assert_eq!(actual, "string");
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(SeriesValue::new("1", true).as_double().is_err());
        assert!(SeriesValue::new("1", 3i64).as_structure().is_err());
    }

    #[test]
    fn stream_has_no_string_form() {
        let v = SeriesValue::unkeyed(Endpoint::new(NodeId::new(2), 1));
        assert!(v.is_stream());
        assert!(v.as_string().is_err());
        assert_eq!(v.as_stream().unwrap().port, 1);
    }

    #[test]
    fn decimal_truncates_to_long() {
        assert_eq!(SeriesValue::new("a", 2.9).as_long().unwrap(), 2);
        assert_eq!(SeriesValue::new("a", -2.9).as_long().unwrap(), -2);
    }

    #[test]
    fn zip_pairs_columns_positionally() {
        let out = SeriesValue::zip(["1", "2"], [1.5, 2.5]).unwrap();
        assert_eq!(out[1], SeriesValue::new("2", 2.5));
        assert!(SeriesValue::zip(["1"], [1i64, 2]).is_err());
    }

    #[test]
    fn array_displays_as_json() {
        let v = Value::Array(vec![Value::Long(1), Value::from("x")]);
        assert_eq!(v.to_string(), r#"[1,"x"]"#);
        assert_eq!(Value::parse_json(&v.to_json().unwrap()).unwrap(), v);
    }

    #[test]
    fn null_column_sorts_first() {
        assert!(Column::null() < Column::new(""));
        assert!(Column::new("1") < Column::new("2"));
    }
}
