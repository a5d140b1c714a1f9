//! Condition-tree compilation and evaluation
//!
//! Compilation walks the tree once: every named field must exist in the
//! schema, every literal operand is coerced through the tested field's
//! type, LIKE patterns become anchored regexes, and unsupported operators
//! are rejected outright. Evaluation is then infallible over any row the
//! store owns, since row values went through the same coercions at save
//! time.

use std::cmp::Ordering;

use regex::Regex;

use crate::error::{Error, Result};
use crate::schema::Schema;
use crate::types::DataType;
use crate::value::{format_number, Value, ValueMap};

use super::pattern::{like_to_regex, raw_regex};
use super::{Op, Operand, Where};

/// A compiled literal or column operand
#[derive(Debug, Clone)]
enum CompiledOperand {
    Value(Value),
    Col(String),
}

/// One compiled field test
#[derive(Debug, Clone)]
enum Test {
    Eq(CompiledOperand),
    Ne(CompiledOperand),
    Gt(CompiledOperand),
    Gte(CompiledOperand),
    Lt(CompiledOperand),
    Lte(CompiledOperand),
    Between(Value, Value),
    NotBetween(Value, Value),
    In(Vec<Value>),
    NotIn(Vec<Value>),
    Match(Regex),
    NotMatch(Regex),
}

/// A compiled condition tree: a reusable boolean test over a row
#[derive(Debug, Clone)]
pub struct CompiledWhere {
    node: Node,
}

#[derive(Debug, Clone)]
enum Node {
    And(Vec<Node>),
    Or(Vec<Node>),
    Not(Box<Node>),
    Cond { field: String, test: Test },
}

impl CompiledWhere {
    /// Does the row satisfy the condition tree?
    pub fn matches(&self, row: &ValueMap) -> bool {
        eval(&self.node, row)
    }
}

pub(crate) fn compile(schema: &Schema, where_: &Where) -> Result<CompiledWhere> {
    Ok(CompiledWhere {
        node: compile_node(schema, where_)?,
    })
}

fn compile_node(schema: &Schema, where_: &Where) -> Result<Node> {
    match where_ {
        Where::And(branches) => Ok(Node::And(
            branches
                .iter()
                .map(|b| compile_node(schema, b))
                .collect::<Result<_>>()?,
        )),
        Where::Or(branches) => Ok(Node::Or(
            branches
                .iter()
                .map(|b| compile_node(schema, b))
                .collect::<Result<_>>()?,
        )),
        Where::Not(branch) => Ok(Node::Not(Box::new(compile_node(schema, branch)?))),
        Where::Cond { field, op } => {
            let def = schema
                .field(field)
                .ok_or_else(|| Error::unknown_field(field.clone()))?;
            let test = compile_op(schema, &def.data_type, op)?;
            Ok(Node::Cond {
                field: field.clone(),
                test,
            })
        }
    }
}

fn compile_op(schema: &Schema, field_type: &DataType, op: &Op) -> Result<Test> {
    let operand = |o: &Operand| -> Result<CompiledOperand> {
        match o {
            Operand::Value(v) => Ok(CompiledOperand::Value(coerce_constant(field_type, v)?)),
            Operand::Col(name) => {
                if !schema.has_field(name) {
                    return Err(Error::unknown_field(name.clone()));
                }
                Ok(CompiledOperand::Col(name.clone()))
            }
        }
    };
    let constant = |v: &Value| coerce_constant(field_type, v);

    Ok(match op {
        Op::Eq(o) => Test::Eq(operand(o)?),
        Op::Ne(o) => Test::Ne(operand(o)?),
        Op::Is(v) => Test::Eq(CompiledOperand::Value(constant(v)?)),
        Op::IsNot(v) => Test::Ne(CompiledOperand::Value(constant(v)?)),
        Op::Gt(o) => Test::Gt(operand(o)?),
        Op::Gte(o) => Test::Gte(operand(o)?),
        Op::Lt(o) => Test::Lt(operand(o)?),
        Op::Lte(o) => Test::Lte(operand(o)?),
        Op::Between(lo, hi) => Test::Between(constant(lo)?, constant(hi)?),
        Op::NotBetween(lo, hi) => Test::NotBetween(constant(lo)?, constant(hi)?),
        Op::In(values) => Test::In(values.iter().map(constant).collect::<Result<_>>()?),
        Op::NotIn(values) => Test::NotIn(values.iter().map(constant).collect::<Result<_>>()?),
        Op::Like(p) => Test::Match(like_to_regex(p, false)?),
        Op::NotLike(p) => Test::NotMatch(like_to_regex(p, false)?),
        Op::ILike(p) => Test::Match(like_to_regex(p, true)?),
        Op::NotILike(p) => Test::NotMatch(like_to_regex(p, true)?),
        Op::StartsWith(s) => Test::Match(like_to_regex(&format!("{}%", s), false)?),
        Op::EndsWith(s) => Test::Match(like_to_regex(&format!("%{}", s), false)?),
        Op::Substring(s) => Test::Match(like_to_regex(&format!("%{}%", s), false)?),
        Op::Regexp(p) => Test::Match(raw_regex(p)?),
        Op::NotRegexp(p) => Test::NotMatch(raw_regex(p)?),
        Op::Contains(_) | Op::Contained(_) | Op::Overlap(_) | Op::Adjacent(_) => {
            return Err(Error::unsupported_operator(op.name()));
        }
    })
}

/// Coerce a literal operand through the tested field's type.
///
/// Null stays null: it is a presence test, not a value of the type.
fn coerce_constant(field_type: &DataType, value: &Value) -> Result<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    field_type.coerce(value)
}

fn eval(node: &Node, row: &ValueMap) -> bool {
    match node {
        Node::And(branches) => branches.iter().all(|b| eval(b, row)),
        Node::Or(branches) => branches.iter().any(|b| eval(b, row)),
        Node::Not(branch) => !eval(branch, row),
        Node::Cond { field, test } => {
            let actual = row.get(field).cloned().unwrap_or(Value::Null);
            eval_test(test, &actual, row)
        }
    }
}

fn eval_test(test: &Test, actual: &Value, row: &ValueMap) -> bool {
    match test {
        Test::Eq(operand) => value_eq(actual, &resolve(operand, row)),
        Test::Ne(operand) => !value_eq(actual, &resolve(operand, row)),
        Test::Gt(operand) => ordered(actual, &resolve(operand, row), &[Ordering::Greater]),
        Test::Gte(operand) => ordered(
            actual,
            &resolve(operand, row),
            &[Ordering::Greater, Ordering::Equal],
        ),
        Test::Lt(operand) => ordered(actual, &resolve(operand, row), &[Ordering::Less]),
        Test::Lte(operand) => ordered(
            actual,
            &resolve(operand, row),
            &[Ordering::Less, Ordering::Equal],
        ),
        Test::Between(lo, hi) => {
            ordered(actual, lo, &[Ordering::Greater, Ordering::Equal])
                && ordered(actual, hi, &[Ordering::Less, Ordering::Equal])
        }
        Test::NotBetween(lo, hi) => !(ordered(actual, lo, &[Ordering::Greater, Ordering::Equal])
            && ordered(actual, hi, &[Ordering::Less, Ordering::Equal])),
        Test::In(values) => values.iter().any(|v| value_eq(actual, v)),
        Test::NotIn(values) => !values.iter().any(|v| value_eq(actual, v)),
        Test::Match(re) => text_form(actual).map(|s| re.is_match(&s)).unwrap_or(false),
        Test::NotMatch(re) => text_form(actual).map(|s| !re.is_match(&s)).unwrap_or(false),
    }
}

fn resolve(operand: &CompiledOperand, row: &ValueMap) -> Value {
    match operand {
        CompiledOperand::Value(v) => v.clone(),
        CompiledOperand::Col(name) => row.get(name).cloned().unwrap_or(Value::Null),
    }
}

/// Null-aware equality: a null operand is a presence test.
fn value_eq(actual: &Value, expected: &Value) -> bool {
    if expected.is_null() {
        return actual.is_null();
    }
    actual == expected
}

fn ordered(actual: &Value, bound: &Value, accepted: &[Ordering]) -> bool {
    actual
        .partial_compare(bound)
        .map(|ord| accepted.contains(&ord))
        .unwrap_or(false)
}

/// Text form used by the pattern operators; non-scalar values never match.
fn text_form(value: &Value) -> Option<String> {
    match value {
        Value::Text(s) => Some(s.clone()),
        Value::Number(n) => Some(format_number(*n)),
        Value::Bool(b) => Some(b.to_string()),
        Value::Date(d) => Some(d.to_rfc3339()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
