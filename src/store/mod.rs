//! Row storage
//!
//! One `StoreState` backs one model: the persisted rows in insertion
//! order, the auto-increment counter, and nothing else. A row is a shared,
//! mutable snapshot (`Arc<RwLock<ValueMap>>`): every record instance
//! loaded from the same row aliases the same snapshot, which is exactly
//! the identity that `equals` and destroy operate on. A stable `RowId` is
//! carried alongside for diagnostics.
//!
//! Rows enter only through a successful save of a new record and leave
//! only through destroy. The call log tracks the eight public store
//! operations for test assertions; internal queries are never recorded.

mod seed;

pub(crate) use seed::seed_values;

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::value::ValueMap;

/// Stable identifier of a persisted row within its store
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowId(pub u64);

/// The shared snapshot a row's record instances alias
pub(crate) type RowValues = Arc<RwLock<ValueMap>>;

/// One persisted row
#[derive(Debug, Clone)]
pub(crate) struct Row {
    pub id: RowId,
    pub values: RowValues,
}

/// Per-model row storage and auto-increment counter
#[derive(Debug, Default)]
pub(crate) struct StoreState {
    rows: Vec<Row>,
    last_id: u64,
    next_row_id: u64,
}

impl StoreState {
    /// Insert a row snapshot; insertion order is observable in queries.
    pub fn insert(&mut self, values: RowValues) -> RowId {
        self.next_row_id += 1;
        let id = RowId(self.next_row_id);
        self.rows.push(Row { id, values });
        id
    }

    /// Remove the row whose snapshot is the given one (by identity).
    pub fn remove(&mut self, values: &RowValues) -> bool {
        let before = self.rows.len();
        self.rows.retain(|row| !Arc::ptr_eq(&row.values, values));
        self.rows.len() != before
    }

    /// Snapshot of the row handles, cheap to clone
    pub fn rows(&self) -> Vec<Row> {
        self.rows.clone()
    }

    /// Number of persisted rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Next auto-increment value; strictly increasing from 1
    pub fn next_auto_increment(&mut self) -> u64 {
        self.last_id += 1;
        self.last_id
    }

    /// Drop every row and reset the counter to zero
    pub fn wipe(&mut self) {
        self.rows.clear();
        self.last_id = 0;
    }
}

/// The trackable store operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StoreCall {
    /// `build`
    Build,
    /// `create`
    Create,
    /// `find_by_pk`
    FindByPk,
    /// `find_one`
    FindOne,
    /// `find_all`
    FindAll,
    /// `count`
    Count,
    /// `update_where`
    Update,
    /// `destroy_where`
    Destroy,
}

impl StoreCall {
    /// Human-readable operation name
    pub fn name(&self) -> &'static str {
        match self {
            StoreCall::Build => "build",
            StoreCall::Create => "create",
            StoreCall::FindByPk => "findByPk",
            StoreCall::FindOne => "findOne",
            StoreCall::FindAll => "findAll",
            StoreCall::Count => "count",
            StoreCall::Update => "update",
            StoreCall::Destroy => "destroy",
        }
    }
}

/// Invocation counts for the trackable operations
#[derive(Debug, Default)]
pub(crate) struct CallLog {
    counts: RwLock<BTreeMap<StoreCall, u64>>,
}

impl CallLog {
    pub fn record(&self, call: StoreCall) {
        *self.counts.write().unwrap().entry(call).or_insert(0) += 1;
    }

    pub fn count(&self, call: StoreCall) -> u64 {
        self.counts
            .read()
            .unwrap()
            .get(&call)
            .copied()
            .unwrap_or(0)
    }

    pub fn clear(&self) {
        self.counts.write().unwrap().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn snapshot(n: f64) -> RowValues {
        let mut map = ValueMap::new();
        map.insert("n".into(), Value::Number(n));
        Arc::new(RwLock::new(map))
    }

    #[test]
    fn test_insert_preserves_order_and_assigns_ids() {
        let mut state = StoreState::default();
        let a = state.insert(snapshot(1.0));
        let b = state.insert(snapshot(2.0));

        assert_ne!(a, b);
        let rows = state.rows();
        assert_eq!(rows[0].id, a);
        assert_eq!(rows[1].id, b);
    }

    #[test]
    fn test_remove_is_by_snapshot_identity() {
        let mut state = StoreState::default();
        let kept = snapshot(1.0);
        let removed = snapshot(1.0);
        state.insert(kept.clone());
        state.insert(removed.clone());

        // Equal contents, different snapshot: only the matching one goes.
        assert!(state.remove(&removed));
        assert_eq!(state.len(), 1);
        assert!(Arc::ptr_eq(&state.rows()[0].values, &kept));
        assert!(!state.remove(&removed));
    }

    #[test]
    fn test_auto_increment_starts_at_one_and_survives_removals() {
        let mut state = StoreState::default();
        assert_eq!(state.next_auto_increment(), 1);
        assert_eq!(state.next_auto_increment(), 2);

        let row = snapshot(1.0);
        state.insert(row.clone());
        state.remove(&row);
        assert_eq!(state.next_auto_increment(), 3);
    }

    #[test]
    fn test_wipe_resets_counter_and_rows() {
        let mut state = StoreState::default();
        state.insert(snapshot(1.0));
        state.next_auto_increment();

        state.wipe();
        assert_eq!(state.len(), 0);
        assert_eq!(state.next_auto_increment(), 1);
    }

    #[test]
    fn test_call_log_counts_and_clears() {
        let log = CallLog::default();
        log.record(StoreCall::FindAll);
        log.record(StoreCall::FindAll);
        log.record(StoreCall::Create);

        assert_eq!(log.count(StoreCall::FindAll), 2);
        assert_eq!(log.count(StoreCall::Create), 1);
        assert_eq!(log.count(StoreCall::Destroy), 0);

        log.clear();
        assert_eq!(log.count(StoreCall::FindAll), 0);
    }
}
