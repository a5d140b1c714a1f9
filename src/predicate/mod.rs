//! Declarative query predicates
//!
//! A query's `where` clause is a condition tree: leaves test one field
//! with one operator, interior nodes combine with and/or/not. The tree is
//! data, not code; [`Where::compile`] turns it into a boolean test over a
//! row after validating every field name and coercing every constant
//! through the field's type. Compilation is where malformed conditions
//! surface, so a bad query fails even against an empty store.
//!
//! Operators whose semantics require full relational set operations
//! (array containment/overlap, geometric adjacency) are part of the
//! surface but always fail compilation with `UnsupportedOperator`.

mod compile;
mod json;
mod pattern;

pub use compile::CompiledWhere;

use crate::error::Result;
use crate::schema::Schema;
use crate::value::Value;

/// The constant side of a comparison: a value, or another column of the
/// same row.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A literal, coerced through the tested field's type at compile time
    Value(Value),
    /// Another field of the same row, compared raw
    Col(String),
}

/// One field-level operator
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// Equality; a null operand tests for null
    Eq(Operand),
    /// Negated equality; a null operand tests for not-null
    Ne(Operand),
    /// Alias of equality with explicit null semantics
    Is(Value),
    /// Alias of negated equality with explicit null semantics
    IsNot(Value),
    /// Strictly greater than
    Gt(Operand),
    /// Greater than or equal
    Gte(Operand),
    /// Strictly less than
    Lt(Operand),
    /// Less than or equal
    Lte(Operand),
    /// Inclusive range test
    Between(Value, Value),
    /// Negated inclusive range test
    NotBetween(Value, Value),
    /// Membership over a coerced list
    In(Vec<Value>),
    /// Negated membership
    NotIn(Vec<Value>),
    /// SQL LIKE: `%` matches any sequence, `_` any single character
    Like(String),
    /// Negated LIKE
    NotLike(String),
    /// Case-insensitive LIKE
    ILike(String),
    /// Negated case-insensitive LIKE
    NotILike(String),
    /// LIKE `<prefix>%`
    StartsWith(String),
    /// LIKE `%<suffix>`
    EndsWith(String),
    /// LIKE `%<infix>%`
    Substring(String),
    /// Raw regular-expression match
    Regexp(String),
    /// Negated raw regular-expression match
    NotRegexp(String),
    /// Array containment — requires set semantics, always unsupported
    Contains(Value),
    /// Reverse containment — always unsupported
    Contained(Value),
    /// Array overlap — always unsupported
    Overlap(Value),
    /// Range adjacency — always unsupported
    Adjacent(Value),
}

impl Op {
    /// Operator name as written in the JSON condition form
    pub fn name(&self) -> &'static str {
        match self {
            Op::Eq(_) => "eq",
            Op::Ne(_) => "ne",
            Op::Is(_) => "is",
            Op::IsNot(_) => "not",
            Op::Gt(_) => "gt",
            Op::Gte(_) => "gte",
            Op::Lt(_) => "lt",
            Op::Lte(_) => "lte",
            Op::Between(_, _) => "between",
            Op::NotBetween(_, _) => "notBetween",
            Op::In(_) => "in",
            Op::NotIn(_) => "notIn",
            Op::Like(_) => "like",
            Op::NotLike(_) => "notLike",
            Op::ILike(_) => "iLike",
            Op::NotILike(_) => "notILike",
            Op::StartsWith(_) => "startsWith",
            Op::EndsWith(_) => "endsWith",
            Op::Substring(_) => "substring",
            Op::Regexp(_) => "regexp",
            Op::NotRegexp(_) => "notRegexp",
            Op::Contains(_) => "contains",
            Op::Contained(_) => "contained",
            Op::Overlap(_) => "overlap",
            Op::Adjacent(_) => "adjacent",
        }
    }
}

/// A condition tree over field names
#[derive(Debug, Clone, PartialEq)]
pub enum Where {
    /// Every branch must match; an empty list matches everything
    And(Vec<Where>),
    /// At least one branch must match; an empty list matches nothing
    Or(Vec<Where>),
    /// Inverted branch
    Not(Box<Where>),
    /// One field tested with one operator
    Cond {
        /// Field under test
        field: String,
        /// Operator applied to it
        op: Op,
    },
}

macro_rules! operand_cond {
    ($fn_name:ident, $col_fn_name:ident, $variant:ident) => {
        /// Field-against-value comparison
        pub fn $fn_name(field: impl Into<String>, value: impl Into<Value>) -> Where {
            Where::Cond {
                field: field.into(),
                op: Op::$variant(Operand::Value(value.into())),
            }
        }

        /// Field-against-column comparison on the same row
        pub fn $col_fn_name(field: impl Into<String>, other: impl Into<String>) -> Where {
            Where::Cond {
                field: field.into(),
                op: Op::$variant(Operand::Col(other.into())),
            }
        }
    };
}

macro_rules! text_cond {
    ($fn_name:ident, $variant:ident) => {
        /// Pattern condition over the field's text form
        pub fn $fn_name(field: impl Into<String>, pattern: impl Into<String>) -> Where {
            Where::Cond {
                field: field.into(),
                op: Op::$variant(pattern.into()),
            }
        }
    };
}

impl Where {
    operand_cond!(eq, col_eq, Eq);
    operand_cond!(ne, col_ne, Ne);
    operand_cond!(gt, col_gt, Gt);
    operand_cond!(gte, col_gte, Gte);
    operand_cond!(lt, col_lt, Lt);
    operand_cond!(lte, col_lte, Lte);

    text_cond!(like, Like);
    text_cond!(not_like, NotLike);
    text_cond!(ilike, ILike);
    text_cond!(not_ilike, NotILike);
    text_cond!(starts_with, StartsWith);
    text_cond!(ends_with, EndsWith);
    text_cond!(substring, Substring);
    text_cond!(regexp, Regexp);
    text_cond!(not_regexp, NotRegexp);

    /// Explicit is-test (null-aware equality)
    pub fn is(field: impl Into<String>, value: impl Into<Value>) -> Where {
        Where::Cond {
            field: field.into(),
            op: Op::Is(value.into()),
        }
    }

    /// Explicit is-not-test (null-aware negated equality)
    pub fn is_not(field: impl Into<String>, value: impl Into<Value>) -> Where {
        Where::Cond {
            field: field.into(),
            op: Op::IsNot(value.into()),
        }
    }

    /// Inclusive range test
    pub fn between(
        field: impl Into<String>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Where {
        Where::Cond {
            field: field.into(),
            op: Op::Between(low.into(), high.into()),
        }
    }

    /// Negated inclusive range test
    pub fn not_between(
        field: impl Into<String>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Where {
        Where::Cond {
            field: field.into(),
            op: Op::NotBetween(low.into(), high.into()),
        }
    }

    /// Membership test
    pub fn is_in<I, V>(field: impl Into<String>, values: I) -> Where
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Where::Cond {
            field: field.into(),
            op: Op::In(values.into_iter().map(Into::into).collect()),
        }
    }

    /// Negated membership test
    pub fn not_in<I, V>(field: impl Into<String>, values: I) -> Where
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Where::Cond {
            field: field.into(),
            op: Op::NotIn(values.into_iter().map(Into::into).collect()),
        }
    }

    /// Array containment; declared but unsupported in memory
    pub fn contains(field: impl Into<String>, value: impl Into<Value>) -> Where {
        Where::Cond {
            field: field.into(),
            op: Op::Contains(value.into()),
        }
    }

    /// Reverse containment; declared but unsupported in memory
    pub fn contained(field: impl Into<String>, value: impl Into<Value>) -> Where {
        Where::Cond {
            field: field.into(),
            op: Op::Contained(value.into()),
        }
    }

    /// Array overlap; declared but unsupported in memory
    pub fn overlap(field: impl Into<String>, value: impl Into<Value>) -> Where {
        Where::Cond {
            field: field.into(),
            op: Op::Overlap(value.into()),
        }
    }

    /// Range adjacency; declared but unsupported in memory
    pub fn adjacent(field: impl Into<String>, value: impl Into<Value>) -> Where {
        Where::Cond {
            field: field.into(),
            op: Op::Adjacent(value.into()),
        }
    }

    /// Conjunction of branches
    pub fn and(branches: impl IntoIterator<Item = Where>) -> Where {
        Where::And(branches.into_iter().collect())
    }

    /// Disjunction of branches
    pub fn or(branches: impl IntoIterator<Item = Where>) -> Where {
        Where::Or(branches.into_iter().collect())
    }

    /// Negation of a branch
    pub fn not(branch: Where) -> Where {
        Where::Not(Box::new(branch))
    }

    /// Compile against a schema into a reusable row test.
    ///
    /// Validates field names, coerces constants, translates patterns.
    pub fn compile(&self, schema: &Schema) -> Result<CompiledWhere> {
        compile::compile(schema, self)
    }
}
