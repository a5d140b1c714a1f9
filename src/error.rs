//! Engine error taxonomy
//!
//! Every failure the engine can surface maps onto one of these variants:
//!
//! - `InvalidSchema`: malformed field or association declarations, fatal
//!   at definition time and never recovered
//! - `TypeMismatch`: a value could not be coerced through a field's type;
//!   aborts the single save or query that triggered it
//! - `NotNullViolation` / `UniqueViolation`: abort the save that triggered
//!   them and leave the store unchanged
//! - `UnsupportedOperator`: a query used an operator whose semantics need
//!   full relational set operations; the query is rejected, never
//!   silently ignored
//!
//! No error is retried internally; everything propagates to the immediate
//! caller. A failed save never inserts or updates the backing row.

use thiserror::Error;

/// Result alias used throughout the engine
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the in-memory engine
#[derive(Debug, Clone, Error, PartialEq)]
pub enum Error {
    /// Malformed field or association declaration
    #[error("invalid schema: {reason}")]
    InvalidSchema {
        /// What was wrong with the declaration
        reason: String,
    },

    /// A value could not be coerced through a field's type
    #[error("{value} is not a valid {expected}")]
    TypeMismatch {
        /// The type (or allowed-value set) that was expected
        expected: String,
        /// Display form of the offending value
        value: String,
    },

    /// A non-nullable field was null at save time
    #[error("field \"{field}\" cannot be null")]
    NotNullViolation {
        /// The violating field
        field: String,
    },

    /// A unique field collided with an already-persisted row
    #[error("the value of field \"{field}\" must be unique")]
    UniqueViolation {
        /// The violating field
        field: String,
    },

    /// The operator exists in the surface but is not evaluable in memory
    #[error("operator \"{operator}\" is not supported by the in-memory evaluator")]
    UnsupportedOperator {
        /// Operator name as written in the condition tree
        operator: String,
    },

    /// A predicate or projection named a field the schema does not declare
    #[error("unknown field \"{field}\"")]
    UnknownField {
        /// The undeclared field name
        field: String,
    },

    /// An accessor named an association alias that was never declared
    #[error("unknown association \"{alias}\"")]
    UnknownAssociation {
        /// The unresolved alias
        alias: String,
    },
}

impl Error {
    /// Create an `InvalidSchema` error
    pub fn invalid_schema(reason: impl Into<String>) -> Self {
        Self::InvalidSchema {
            reason: reason.into(),
        }
    }

    /// Create a `TypeMismatch` error
    pub fn type_mismatch(expected: impl Into<String>, value: impl std::fmt::Display) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            value: value.to_string(),
        }
    }

    /// Create a `NotNullViolation` error
    pub fn not_null(field: impl Into<String>) -> Self {
        Self::NotNullViolation {
            field: field.into(),
        }
    }

    /// Create a `UniqueViolation` error
    pub fn unique(field: impl Into<String>) -> Self {
        Self::UniqueViolation {
            field: field.into(),
        }
    }

    /// Create an `UnsupportedOperator` error
    pub fn unsupported_operator(operator: impl Into<String>) -> Self {
        Self::UnsupportedOperator {
            operator: operator.into(),
        }
    }

    /// Create an `UnknownField` error
    pub fn unknown_field(field: impl Into<String>) -> Self {
        Self::UnknownField {
            field: field.into(),
        }
    }

    /// Create an `UnknownAssociation` error
    pub fn unknown_association(alias: impl Into<String>) -> Self {
        Self::UnknownAssociation {
            alias: alias.into(),
        }
    }
}
