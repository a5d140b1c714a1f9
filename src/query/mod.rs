//! Query execution
//!
//! A [`Query`] bundles the full read surface: a `where` condition tree,
//! multi-key ordering, offset/limit paging, a field projection
//! (`attributes`) and association inclusion (`include`). Execution order
//! is fixed: filter, then stable sort, then skip `offset`, then yield at
//! most `limit` records.
//!
//! [`RecordIter`] is a lazy, finite, single-pass sequence over the store's
//! rows as they were when iteration began. It is not a snapshot of row
//! contents: mutating the store while iterating is undefined behavior and
//! left to the caller to avoid. Re-issuing the query restarts it.

use std::cmp::Ordering;

use crate::error::{Error, Result};
use crate::model::Model;
use crate::predicate::{CompiledWhere, Where};
use crate::record::Record;
use crate::store::Row;
use crate::value::Value;

/// Sort direction for one ordering key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Smallest first
    Asc,
    /// Largest first
    Desc,
}

/// A declarative read: condition, ordering, paging, projection, inclusion
#[derive(Debug, Clone, Default)]
pub struct Query {
    /// Condition tree; absent matches every row
    pub where_: Option<Where>,
    /// Ordering keys, applied left to right with a stable tie-break
    pub order: Vec<(String, Direction)>,
    /// Maximum number of records to yield; 0 or absent is unbounded
    pub limit: Option<usize>,
    /// Matching records skipped before the first yield
    pub offset: usize,
    /// Fields to materialize; absent materializes the whole row
    pub attributes: Option<Vec<String>>,
    /// Association aliases eagerly loaded by `find_all`/`find_one`
    pub include: Vec<String>,
}

impl Query {
    /// A query matching every row
    pub fn new() -> Query {
        Query::default()
    }

    /// A query with just a condition tree
    pub fn filter(where_: Where) -> Query {
        Query {
            where_: Some(where_),
            ..Query::default()
        }
    }

    /// Replace the condition tree
    pub fn where_(mut self, where_: Where) -> Query {
        self.where_ = Some(where_);
        self
    }

    /// Append an ordering key
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Query {
        self.order.push((field.into(), direction));
        self
    }

    /// Cap the number of yielded records; 0 means unbounded
    pub fn limit(mut self, limit: usize) -> Query {
        self.limit = Some(limit);
        self
    }

    /// Skip the first `offset` matching records
    pub fn offset(mut self, offset: usize) -> Query {
        self.offset = offset;
        self
    }

    /// Project onto the named fields only
    pub fn attributes<I, S>(mut self, fields: I) -> Query
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Eagerly load an association alias
    pub fn include(mut self, alias: impl Into<String>) -> Query {
        self.include.push(alias.into());
        self
    }
}

/// Lazy, single-pass sequence of matching records
pub struct RecordIter {
    rows: std::vec::IntoIter<Row>,
    predicate: Option<CompiledWhere>,
    to_skip: usize,
    remaining: Option<usize>,
    model: Model,
    attributes: Option<Vec<String>>,
}

impl Iterator for RecordIter {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        if matches!(self.remaining, Some(0)) {
            return None;
        }
        for row in self.rows.by_ref() {
            let matched = {
                let values = row.values.read().unwrap();
                self.predicate
                    .as_ref()
                    .map(|p| p.matches(&values))
                    .unwrap_or(true)
            };
            if !matched {
                continue;
            }
            if self.to_skip > 0 {
                self.to_skip -= 1;
                continue;
            }
            if let Some(remaining) = &mut self.remaining {
                *remaining -= 1;
            }
            return Some(Record::from_row(&self.model, &row, self.attributes.as_deref()));
        }
        None
    }
}

/// Validate a query against the model and start iterating.
///
/// Everything that can fail — unknown fields, uncoercible constants,
/// unsupported operators, unknown include aliases — fails here, before
/// any row is visited.
pub(crate) fn run(model: &Model, query: &Query) -> Result<RecordIter> {
    let schema = model.schema();

    if let Some(attrs) = &query.attributes {
        for field in attrs {
            if !schema.has_field(field) {
                return Err(Error::unknown_field(field.clone()));
            }
        }
    }
    for (field, _) in &query.order {
        if !schema.has_field(field) {
            return Err(Error::unknown_field(field.clone()));
        }
    }
    for alias in &query.include {
        if model.association(alias).is_none() {
            return Err(Error::unknown_association(alias.clone()));
        }
    }

    let predicate = query
        .where_
        .as_ref()
        .map(|w| w.compile(&schema))
        .transpose()?;

    let mut rows = model.rows_snapshot();
    if !query.order.is_empty() {
        rows = sort_rows(rows, &query.order);
    }

    let remaining = match query.limit {
        None | Some(0) => None,
        Some(n) => Some(n),
    };

    Ok(RecordIter {
        rows: rows.into_iter(),
        predicate,
        to_skip: query.offset,
        remaining,
        model: model.clone(),
        attributes: query.attributes.clone(),
    })
}

/// Stable multi-key sort: equal on one key falls through to the next.
fn sort_rows(rows: Vec<Row>, order: &[(String, Direction)]) -> Vec<Row> {
    let mut keyed: Vec<(Row, Vec<Value>)> = rows
        .into_iter()
        .map(|row| {
            let keys = {
                let values = row.values.read().unwrap();
                order
                    .iter()
                    .map(|(field, _)| values.get(field).cloned().unwrap_or(Value::Null))
                    .collect()
            };
            (row, keys)
        })
        .collect();

    keyed.sort_by(|(_, a), (_, b)| {
        for (i, (_, direction)) in order.iter().enumerate() {
            let mut ord = a[i].sort_compare(&b[i]);
            if *direction == Direction::Desc {
                ord = ord.reverse();
            }
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });

    keyed.into_iter().map(|(row, _)| row).collect()
}
