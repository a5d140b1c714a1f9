//! Data-type registry
//!
//! Every schema field carries a `DataType` that owns its coercion rule.
//! Coercion happens on every save and on the constant side of every query
//! predicate, so a row never holds a value its field type did not produce.
//!
//! The surface mirrors a SQL-ish type catalogue: a handful of base types
//! plus a long tail of dialect aliases that share a base coercion
//! (INTEGER, BIGINT, DECIMAL, ... are all NUMBER; UUID, CHAR, JSON, ...
//! are all TEXT). Array, range and enum types are parameterized through
//! their constructors and carry their options as part of the value.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::error::{Error, Result};
use crate::value::{format_number, Value};

/// A field type with its coercion rule
#[derive(Debug, Clone, PartialEq)]
pub enum DataType {
    /// Sequence of values, every element coerced through the element type
    Array(Box<DataType>),
    /// Truthiness of the input
    Boolean,
    /// A date, an epoch-milliseconds number, or parseable text
    Date,
    /// Closed set of allowed text values
    Enum(Vec<String>),
    /// Opaque; passed through unchanged
    Geography,
    /// Opaque; passed through unchanged
    Geometry,
    /// Finite 64-bit float
    Number,
    /// Keyed structure, required as-is
    Object,
    /// A scalar coerced through the element type
    Range(Box<DataType>),
    /// Stringified scalar
    Text,
    /// Opaque; passed through unchanged
    Virtual,
}

impl DataType {
    // Numeric dialect aliases — all coerce as NUMBER.
    pub const NUMBER: DataType = DataType::Number;
    pub const TINYINT: DataType = DataType::Number;
    pub const SMALLINT: DataType = DataType::Number;
    pub const MEDIUMINT: DataType = DataType::Number;
    pub const INTEGER: DataType = DataType::Number;
    pub const BIGINT: DataType = DataType::Number;
    pub const DECIMAL: DataType = DataType::Number;
    pub const DOUBLE: DataType = DataType::Number;
    pub const FLOAT: DataType = DataType::Number;
    pub const REAL: DataType = DataType::Number;
    pub const NUMERIC: DataType = DataType::Number;

    // Text dialect aliases — all coerce as TEXT.
    pub const STRING: DataType = DataType::Text;
    pub const CHAR: DataType = DataType::Text;
    pub const CITEXT: DataType = DataType::Text;
    pub const BLOB: DataType = DataType::Text;
    pub const JSON: DataType = DataType::Text;
    pub const JSONB: DataType = DataType::Text;
    pub const UUID: DataType = DataType::Text;
    pub const UUIDV1: DataType = DataType::Text;
    pub const UUIDV4: DataType = DataType::Text;
    pub const MACADDR: DataType = DataType::Text;
    pub const CIDR: DataType = DataType::Text;
    pub const INET: DataType = DataType::Text;
    pub const TSVECTOR: DataType = DataType::Text;

    // Temporal aliases.
    pub const DATE: DataType = DataType::Date;
    pub const TIME: DataType = DataType::Date;
    pub const DATEONLY: DataType = DataType::Date;

    // Keyed-structure alias.
    pub const HSTORE: DataType = DataType::Object;

    /// An array type over the given element type
    pub fn array(element: DataType) -> DataType {
        DataType::Array(Box::new(element))
    }

    /// A range type over the given element type
    pub fn range(element: DataType) -> DataType {
        DataType::Range(Box::new(element))
    }

    /// An enumerated type over the given allowed values
    pub fn enumeration<I, S>(values: I) -> DataType
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        DataType::Enum(values.into_iter().map(Into::into).collect())
    }

    /// Canonical name of the base type
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Array(_) => "ARRAY",
            DataType::Boolean => "BOOLEAN",
            DataType::Date => "DATE",
            DataType::Enum(_) => "ENUM",
            DataType::Geography => "GEOGRAPHY",
            DataType::Geometry => "GEOMETRY",
            DataType::Number => "NUMBER",
            DataType::Object => "OBJECT",
            DataType::Range(_) => "RANGE",
            DataType::Text => "TEXT",
            DataType::Virtual => "VIRTUAL",
        }
    }

    /// Look up a type by its registry name, including dialect aliases.
    ///
    /// Parameterized types (ARRAY, RANGE, ENUM) cannot be built from a
    /// bare name and return `None`; use their constructors.
    pub fn by_name(name: &str) -> Option<DataType> {
        let base = match name {
            "BOOLEAN" => DataType::Boolean,
            "DATE" | "TIME" | "DATEONLY" => DataType::Date,
            "GEOGRAPHY" => DataType::Geography,
            "GEOMETRY" => DataType::Geometry,
            "NUMBER" | "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INTEGER" | "BIGINT"
            | "DECIMAL" | "DOUBLE" | "FLOAT" | "REAL" | "NUMERIC" => DataType::Number,
            "OBJECT" | "HSTORE" => DataType::Object,
            "TEXT" | "STRING" | "CHAR" | "CITEXT" | "BLOB" | "JSON" | "JSONB" | "UUID"
            | "UUIDV1" | "UUIDV4" | "MACADDR" | "CIDR" | "INET" | "TSVECTOR" => DataType::Text,
            "VIRTUAL" => DataType::Virtual,
            _ => return None,
        };
        Some(base)
    }

    /// True for the numeric base type; gates auto-increment eligibility
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Number)
    }

    /// True for the text base type; drives the seeder's naming of values
    pub fn is_text(&self) -> bool {
        matches!(self, DataType::Text)
    }

    /// Coerce a raw value through this type.
    ///
    /// Null is never passed in here; nullability is the schema's concern
    /// and is enforced before coercion runs.
    pub fn coerce(&self, value: &Value) -> Result<Value> {
        match self {
            DataType::Number => coerce_number(value),
            DataType::Text => coerce_text(value),
            DataType::Boolean => Ok(Value::Bool(truthy(value))),
            DataType::Date => coerce_date(value),
            DataType::Enum(allowed) => coerce_enum(allowed, value),
            DataType::Array(element) => match value {
                Value::Array(items) => {
                    let coerced = items
                        .iter()
                        .map(|item| element.coerce(item))
                        .collect::<Result<Vec<_>>>()?;
                    Ok(Value::Array(coerced))
                }
                other => Err(Error::type_mismatch("array", other)),
            },
            DataType::Range(element) => element.coerce(value),
            DataType::Object => match value {
                Value::Object(_) => Ok(value.clone()),
                other => Err(Error::type_mismatch("object", other)),
            },
            DataType::Geography | DataType::Geometry | DataType::Virtual => Ok(value.clone()),
        }
    }
}

fn coerce_number(value: &Value) -> Result<Value> {
    let n = match value {
        Value::Number(n) => *n,
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| Error::type_mismatch("number", value))?,
        Value::Date(d) => d.timestamp_millis() as f64,
        other => return Err(Error::type_mismatch("number", other)),
    };
    if !n.is_finite() {
        return Err(Error::type_mismatch("number", value));
    }
    Ok(Value::Number(n))
}

fn coerce_text(value: &Value) -> Result<Value> {
    let s = match value {
        Value::Text(s) => s.clone(),
        Value::Number(n) => format_number(*n),
        Value::Bool(b) => b.to_string(),
        Value::Date(d) => d.to_rfc3339(),
        other => return Err(Error::type_mismatch("text", other)),
    };
    Ok(Value::Text(s))
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => *n != 0.0,
        Value::Text(s) => !s.is_empty(),
        Value::Date(_) | Value::Array(_) | Value::Object(_) => true,
    }
}

fn coerce_date(value: &Value) -> Result<Value> {
    match value {
        Value::Date(d) => Ok(Value::Date(*d)),
        Value::Number(n) => {
            Value::date_from_millis(*n as i64).ok_or_else(|| Error::type_mismatch("date", value))
        }
        Value::Text(s) => parse_date_text(s)
            .map(Value::Date)
            .ok_or_else(|| Error::type_mismatch("date", value)),
        other => Err(Error::type_mismatch("date", other)),
    }
}

/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM:SS[.fff]`, the space-separated
/// variant, and a bare `YYYY-MM-DD`.
fn parse_date_text(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(d) = DateTime::parse_from_rfc3339(s) {
        return Some(d.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }
    None
}

fn coerce_enum(allowed: &[String], value: &Value) -> Result<Value> {
    if let Value::Text(s) = value {
        if allowed.iter().any(|a| a == s) {
            return Ok(value.clone());
        }
    }
    Err(Error::type_mismatch(
        format!("one of [{}]", allowed.join(", ")),
        value,
    ))
}

/// Default-value producer: the current time
pub fn now() -> Value {
    Value::Date(Utc::now())
}

/// Default-value producer: a fresh v4 UUID as text
pub fn uuid_v4() -> Value {
    Value::Text(uuid::Uuid::new_v4().to_string())
}
