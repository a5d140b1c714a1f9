//! Owned field values
//!
//! Rows, query operands and default values all carry `Value`. The enum is
//! deliberately close to a JSON document model, with one addition: a typed
//! date variant, which the date coercions need. Deep equality is plain
//! `PartialEq`; comparison for ordering lives here as well so the predicate
//! evaluator and the sorter agree on it.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, TimeZone, Utc};

use crate::error::{Error, Result};

/// A field-name → value mapping, the shape of one row
pub type ValueMap = BTreeMap<String, Value>;

/// A single field value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent / SQL NULL
    Null,
    /// Boolean
    Bool(bool),
    /// 64-bit float; the engine's only numeric representation
    Number(f64),
    /// UTF-8 text
    Text(String),
    /// UTC timestamp
    Date(DateTime<Utc>),
    /// Ordered sequence of values
    Array(Vec<Value>),
    /// Keyed structure
    Object(ValueMap),
}

impl Value {
    /// Returns true for `Value::Null`
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Type name used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Text(_) => "text",
            Value::Date(_) => "date",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    /// Date from epoch milliseconds, when in chrono's representable range
    pub fn date_from_millis(millis: i64) -> Option<Value> {
        Utc.timestamp_millis_opt(millis).single().map(Value::Date)
    }

    /// Convert a `serde_json::Value` into an engine value.
    ///
    /// JSON has no date representation, so timestamps arrive as text or
    /// epoch numbers and are only typed once coerced through a DATE field.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::Text(s.clone()),
            serde_json::Value::Array(items) => {
                Value::Array(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Convert into a `serde_json::Value`; dates become RFC 3339 text
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Date(d) => serde_json::Value::String(d.to_rfc3339()),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Object(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }

    /// Compare two values of the same kind.
    ///
    /// Returns `None` across kinds (and for arrays/objects), which every
    /// ordering predicate treats as "no match".
    pub fn partial_compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Total order used by the sorter: nulls first, then by kind
    /// (boolean < number < date < text < array < object), then by value
    /// within a kind.
    pub fn sort_compare(&self, other: &Value) -> Ordering {
        let rank = |v: &Value| -> u8 {
            match v {
                Value::Null => 0,
                Value::Bool(_) => 1,
                Value::Number(_) => 2,
                Value::Date(_) => 3,
                Value::Text(_) => 4,
                Value::Array(_) => 5,
                Value::Object(_) => 6,
            }
        };

        let (ra, rb) = (rank(self), rank(other));
        if ra != rb {
            return ra.cmp(&rb);
        }
        self.partial_compare(other).unwrap_or(Ordering::Equal)
    }
}

impl serde::Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Date(d) => serializer.serialize_str(&d.to_rfc3339()),
            Value::Array(items) => serializer.collect_seq(items),
            Value::Object(map) => serializer.collect_map(map),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::Text(s) => write!(f, "\"{}\"", s),
            Value::Date(d) => write!(f, "{}", d.to_rfc3339()),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Object(_) => write!(f, "{{..}}"),
        }
    }
}

/// Render a number the way scripting runtimes print it: integral values
/// without a trailing `.0`.
pub(crate) fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Number(v as f64)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Number(f64::from(v))
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Number(v as f64)
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::Number(v as f64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Date(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Anything that can be turned into a row's worth of field values.
///
/// Implemented for the native `ValueMap`, for pair lists, and for
/// `serde_json::Value` objects so tests and callers can hand over
/// `json!({...})` literals directly.
pub trait IntoValues {
    /// Perform the conversion; fails only for JSON input that is not an
    /// object.
    fn into_values(self) -> Result<ValueMap>;
}

impl IntoValues for ValueMap {
    fn into_values(self) -> Result<ValueMap> {
        Ok(self)
    }
}

impl IntoValues for serde_json::Value {
    fn into_values(self) -> Result<ValueMap> {
        match Value::from_json(&self) {
            Value::Object(map) => Ok(map),
            other => Err(Error::type_mismatch("object of field values", other)),
        }
    }
}

impl IntoValues for Vec<(String, Value)> {
    fn into_values(self) -> Result<ValueMap> {
        Ok(self.into_iter().collect())
    }
}

impl<'a, const N: usize> IntoValues for [(&'a str, Value); N] {
    fn into_values(self) -> Result<ValueMap> {
        Ok(self
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_round_trip() {
        let value = Value::from_json(&json!({
            "name": "Alice",
            "age": 30,
            "active": true,
            "tags": ["a", "b"],
            "extra": null
        }));

        let Value::Object(map) = &value else {
            panic!("expected an object");
        };
        assert_eq!(map["name"], Value::Text("Alice".into()));
        assert_eq!(map["age"], Value::Number(30.0));
        assert_eq!(map["active"], Value::Bool(true));
        assert_eq!(map["extra"], Value::Null);

        assert_eq!(
            value.to_json(),
            json!({"name": "Alice", "age": 30, "active": true, "tags": ["a", "b"], "extra": null})
        );
    }

    #[test]
    fn test_partial_compare_same_kind() {
        assert_eq!(
            Value::Number(1.0).partial_compare(&Value::Number(2.0)),
            Some(Ordering::Less)
        );
        assert_eq!(
            Value::Text("b".into()).partial_compare(&Value::Text("a".into())),
            Some(Ordering::Greater)
        );
    }

    #[test]
    fn test_partial_compare_cross_kind_is_none() {
        assert_eq!(
            Value::Number(1.0).partial_compare(&Value::Text("1".into())),
            None
        );
        assert_eq!(Value::Null.partial_compare(&Value::Number(1.0)), None);
    }

    #[test]
    fn test_sort_compare_ranks_nulls_first() {
        assert_eq!(
            Value::Null.sort_compare(&Value::Number(0.0)),
            Ordering::Less
        );
        assert_eq!(
            Value::Text("a".into()).sort_compare(&Value::Number(9.0)),
            Ordering::Greater
        );
    }

    #[test]
    fn test_format_number_drops_integral_fraction() {
        assert_eq!(format_number(5.0), "5");
        assert_eq!(format_number(-5.2), "-5.2");
    }

    #[test]
    fn test_into_values_rejects_non_object_json() {
        let result = json!([1, 2, 3]).into_values();
        assert!(matches!(result, Err(Error::TypeMismatch { .. })));
    }
}
