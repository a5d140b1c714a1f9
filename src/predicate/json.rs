//! JSON form of the condition tree
//!
//! The wire shape accepted here mirrors the declarative input the engine
//! models:
//!
//! ```json
//! {
//!   "foo": "bar",                      // scalar leaf: equality
//!   "n": [1, 2, 3],                    // array leaf: membership
//!   "m": { "gt": 3, "lte": 9 },        // keyed bundle: operators (AND)
//!   "or": [ { "a": 1 }, { "b": 2 } ],  // logical nodes
//!   "not": { "c": null }
//! }
//! ```
//!
//! Top-level keys combine with AND. A `col` object in operand position
//! compares against another column of the same row. Unknown operator keys
//! are rejected with `UnsupportedOperator`, never ignored.

use crate::error::{Error, Result};
use crate::value::Value;

use super::{Op, Operand, Where};

impl Where {
    /// Parse a JSON condition tree.
    pub fn from_json(json: &serde_json::Value) -> Result<Where> {
        let serde_json::Value::Object(map) = json else {
            return Err(Error::type_mismatch("condition object", Value::from_json(json)));
        };
        parse_object(map)
    }
}

fn parse_object(map: &serde_json::Map<String, serde_json::Value>) -> Result<Where> {
    let mut branches = Vec::with_capacity(map.len());
    for (key, value) in map {
        branches.push(match key.as_str() {
            "and" => Where::And(parse_branch_list(value)?),
            "or" => Where::Or(parse_branch_list(value)?),
            "not" => Where::not(Where::from_json(value)?),
            field => parse_leaf(field, value)?,
        });
    }
    if branches.len() == 1 {
        return Ok(branches.remove(0));
    }
    Ok(Where::And(branches))
}

/// Logical nodes accept either a list of sub-trees or a single object.
fn parse_branch_list(value: &serde_json::Value) -> Result<Vec<Where>> {
    match value {
        serde_json::Value::Array(items) => items.iter().map(Where::from_json).collect(),
        serde_json::Value::Object(_) => Ok(vec![Where::from_json(value)?]),
        other => Err(Error::type_mismatch(
            "list of condition objects",
            Value::from_json(other),
        )),
    }
}

fn parse_leaf(field: &str, value: &serde_json::Value) -> Result<Where> {
    match value {
        // Scalar leaf: implicit equality (null included: a presence test).
        serde_json::Value::Null
        | serde_json::Value::Bool(_)
        | serde_json::Value::Number(_)
        | serde_json::Value::String(_) => Ok(Where::Cond {
            field: field.to_string(),
            op: Op::Eq(Operand::Value(Value::from_json(value))),
        }),
        // Array leaf: implicit membership.
        serde_json::Value::Array(items) => Ok(Where::Cond {
            field: field.to_string(),
            op: Op::In(items.iter().map(Value::from_json).collect()),
        }),
        // Keyed bundle: one condition per operator, combined with AND.
        serde_json::Value::Object(bundle) => {
            let mut conds = Vec::with_capacity(bundle.len());
            for (op_name, operand) in bundle {
                conds.push(Where::Cond {
                    field: field.to_string(),
                    op: parse_op(op_name, operand)?,
                });
            }
            if conds.len() == 1 {
                return Ok(conds.remove(0));
            }
            Ok(Where::And(conds))
        }
    }
}

fn parse_op(name: &str, operand: &serde_json::Value) -> Result<Op> {
    Ok(match name {
        "eq" => Op::Eq(parse_operand(operand)),
        "ne" => Op::Ne(parse_operand(operand)),
        "is" => Op::Is(Value::from_json(operand)),
        "not" => Op::IsNot(Value::from_json(operand)),
        "gt" => Op::Gt(parse_operand(operand)),
        "gte" => Op::Gte(parse_operand(operand)),
        "lt" => Op::Lt(parse_operand(operand)),
        "lte" => Op::Lte(parse_operand(operand)),
        "between" => {
            let (lo, hi) = parse_bounds(operand)?;
            Op::Between(lo, hi)
        }
        "notBetween" => {
            let (lo, hi) = parse_bounds(operand)?;
            Op::NotBetween(lo, hi)
        }
        "in" => Op::In(parse_value_list(operand)?),
        "notIn" => Op::NotIn(parse_value_list(operand)?),
        "like" => Op::Like(parse_text(operand)?),
        "notLike" => Op::NotLike(parse_text(operand)?),
        "iLike" => Op::ILike(parse_text(operand)?),
        "notILike" => Op::NotILike(parse_text(operand)?),
        "startsWith" => Op::StartsWith(parse_text(operand)?),
        "endsWith" => Op::EndsWith(parse_text(operand)?),
        "substring" => Op::Substring(parse_text(operand)?),
        "regexp" => Op::Regexp(parse_text(operand)?),
        "notRegexp" => Op::NotRegexp(parse_text(operand)?),
        "col" => Op::Eq(Operand::Col(parse_text(operand)?)),
        "contains" => Op::Contains(Value::from_json(operand)),
        "contained" => Op::Contained(Value::from_json(operand)),
        "overlap" => Op::Overlap(Value::from_json(operand)),
        "adjacent" => Op::Adjacent(Value::from_json(operand)),
        other => return Err(Error::unsupported_operator(other)),
    })
}

/// An operand is a literal, or `{"col": "other_field"}`.
fn parse_operand(operand: &serde_json::Value) -> Operand {
    if let serde_json::Value::Object(map) = operand {
        if map.len() == 1 {
            if let Some(serde_json::Value::String(col)) = map.get("col") {
                return Operand::Col(col.clone());
            }
        }
    }
    Operand::Value(Value::from_json(operand))
}

fn parse_bounds(operand: &serde_json::Value) -> Result<(Value, Value)> {
    if let serde_json::Value::Array(items) = operand {
        if let [lo, hi] = items.as_slice() {
            return Ok((Value::from_json(lo), Value::from_json(hi)));
        }
    }
    Err(Error::type_mismatch(
        "pair of bounds",
        Value::from_json(operand),
    ))
}

fn parse_value_list(operand: &serde_json::Value) -> Result<Vec<Value>> {
    if let serde_json::Value::Array(items) = operand {
        return Ok(items.iter().map(Value::from_json).collect());
    }
    Err(Error::type_mismatch(
        "list of values",
        Value::from_json(operand),
    ))
}

fn parse_text(operand: &serde_json::Value) -> Result<String> {
    if let serde_json::Value::String(s) = operand {
        return Ok(s.clone());
    }
    Err(Error::type_mismatch("text", Value::from_json(operand)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_leaf_is_equality() {
        let parsed = Where::from_json(&json!({"foo": "bar"})).unwrap();
        assert_eq!(parsed, Where::eq("foo", "bar"));
    }

    #[test]
    fn test_array_leaf_is_membership() {
        let parsed = Where::from_json(&json!({"n": [1, 2]})).unwrap();
        assert_eq!(parsed, Where::is_in("n", [1, 2]));
    }

    #[test]
    fn test_multiple_keys_combine_with_and() {
        let parsed = Where::from_json(&json!({"foo": "bar", "baz": "qux"})).unwrap();
        assert_eq!(
            parsed,
            Where::and([Where::eq("baz", "qux"), Where::eq("foo", "bar")])
        );
    }

    #[test]
    fn test_operator_bundle() {
        let parsed = Where::from_json(&json!({"n": {"gt": 3, "lte": 9}})).unwrap();
        assert_eq!(
            parsed,
            Where::and([Where::gt("n", 3), Where::lte("n", 9)])
        );
    }

    #[test]
    fn test_logical_nodes() {
        let parsed =
            Where::from_json(&json!({"or": [{"foo": "bar"}, {"n": {"lt": 3}}]})).unwrap();
        assert_eq!(
            parsed,
            Where::or([Where::eq("foo", "bar"), Where::lt("n", 3)])
        );

        let parsed = Where::from_json(&json!({"not": {"foo": null}})).unwrap();
        assert_eq!(parsed, Where::not(Where::eq("foo", Value::Null)));
    }

    #[test]
    fn test_between_takes_a_pair() {
        let parsed = Where::from_json(&json!({"n": {"between": [2, 4]}})).unwrap();
        assert_eq!(parsed, Where::between("n", 2, 4));

        let result = Where::from_json(&json!({"n": {"between": [2]}}));
        assert!(matches!(result, Err(Error::TypeMismatch { .. })));
    }

    #[test]
    fn test_col_operand() {
        let parsed = Where::from_json(&json!({"foo": {"eq": {"col": "bar"}}})).unwrap();
        assert_eq!(parsed, Where::col_eq("foo", "bar"));

        let parsed = Where::from_json(&json!({"foo": {"col": "bar"}})).unwrap();
        assert_eq!(parsed, Where::col_eq("foo", "bar"));
    }

    #[test]
    fn test_unknown_operator_is_rejected() {
        let result = Where::from_json(&json!({"foo": {"nearby": 1}}));
        assert_eq!(result.unwrap_err(), Error::unsupported_operator("nearby"));
    }

    #[test]
    fn test_set_operators_parse_but_stay_unsupported() {
        let parsed = Where::from_json(&json!({"foo": {"overlap": [1, 2]}})).unwrap();
        assert!(matches!(
            parsed,
            Where::Cond {
                op: Op::Overlap(_),
                ..
            }
        ));
    }

    #[test]
    fn test_non_object_root_is_rejected() {
        assert!(Where::from_json(&json!("foo")).is_err());
        assert!(Where::from_json(&json!([1, 2])).is_err());
    }
}
