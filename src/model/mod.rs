//! Model handles
//!
//! A `Model` is the per-schema store handle: it owns the compiled schema,
//! the row storage, the call log and the resolved associations, all behind
//! one cheaply-cloneable `Arc`. Every read and write of rows goes through
//! here, and everything here is synchronous: the engine never suspends,
//! and callers needing cross-thread exclusion must provide it themselves.
//!
//! The eight public store operations (`build`, `create`, `find_by_pk`,
//! `find_one`, `find_all`, `count`, `update_where`, `destroy_where`) are
//! call-tracked for test assertions. The `*_internal` twins do the same
//! work untracked and are what saves, seeding and association accessors
//! use, so exercising a relationship never pollutes the counts a test is
//! asserting on.

use std::sync::{Arc, RwLock, Weak};

use tracing::debug;

use crate::association::{
    self, Association, AssociationOptions, ManyToManyOptions,
};
use crate::error::{Error, Result};
use crate::predicate::Where;
use crate::query::{self, Query, RecordIter};
use crate::record::Record;
use crate::registry::{Database, DatabaseInner};
use crate::schema::{FieldDef, Schema};
use crate::store::{seed_values, CallLog, Row, RowValues, StoreCall, StoreState};
use crate::value::{IntoValues, Value};

pub(crate) struct ModelInner {
    name: String,
    seed_rows: usize,
    schema: RwLock<Schema>,
    state: RwLock<StoreState>,
    calls: CallLog,
    associations: RwLock<Vec<Association>>,
    db: RwLock<Weak<DatabaseInner>>,
}

/// Per-schema store handle
#[derive(Clone)]
pub struct Model {
    pub(crate) inner: Arc<ModelInner>,
}

/// Non-owning model handle, carried by resolved associations.
///
/// Associations reference their target (and join) models weakly so that a
/// relationship cycle between two models never keeps their stores alive
/// on its own; the registry and the caller hold the strong handles.
#[derive(Clone)]
pub struct ModelRef {
    name: String,
    inner: Weak<ModelInner>,
}

impl std::fmt::Debug for ModelRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRef").field("name", &self.name).finish()
    }
}

impl ModelRef {
    /// Name of the referenced model
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Recover the strong handle; fails if the model was dropped.
    pub fn upgrade(&self) -> Result<Model> {
        self.inner
            .upgrade()
            .map(|inner| Model { inner })
            .ok_or_else(|| {
                Error::invalid_schema(format!("model \"{}\" is no longer alive", self.name))
            })
    }
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.inner.name)
            .field("rows", &self.row_count())
            .finish()
    }
}

impl Model {
    /// Compile a schema and create its store, seeded with `seed_rows`
    /// deterministic fixtures.
    pub fn new(
        name: impl Into<String>,
        fields: Vec<(String, FieldDef)>,
        seed_rows: usize,
    ) -> Result<Model> {
        let name = name.into();
        let schema = Schema::compile(name.clone(), fields)?;
        let model = Model {
            inner: Arc::new(ModelInner {
                name,
                seed_rows,
                schema: RwLock::new(schema),
                state: RwLock::new(StoreState::default()),
                calls: CallLog::default(),
                associations: RwLock::new(Vec::new()),
                db: RwLock::new(Weak::new()),
            }),
        };
        model.seed(seed_rows)?;
        Ok(model)
    }

    /// The model's name
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Snapshot of the compiled schema (including any synthesized
    /// foreign-key fields)
    pub fn schema(&self) -> Schema {
        self.inner.schema.read().unwrap().clone()
    }

    /// Number of persisted rows
    pub fn row_count(&self) -> usize {
        self.inner.state.read().unwrap().len()
    }

    /// Invocations of a tracked store operation since the last clear
    pub fn call_count(&self, call: StoreCall) -> u64 {
        self.inner.calls.count(call)
    }

    // ----------------------------------------------------------------
    // Tracked store operations
    // ----------------------------------------------------------------

    /// Construct an unsaved record instance.
    pub fn build(&self, data: impl IntoValues) -> Result<Record> {
        self.inner.calls.record(StoreCall::Build);
        Ok(self.build_internal(data.into_values()?))
    }

    /// Construct and immediately save a record instance.
    pub fn create(&self, data: impl IntoValues) -> Result<Record> {
        self.inner.calls.record(StoreCall::Create);
        self.create_internal(data.into_values()?)
    }

    /// Find the record whose primary key equals `id`.
    ///
    /// A schema without a primary key never matches.
    pub fn find_by_pk(&self, id: impl Into<Value>) -> Result<Option<Record>> {
        self.inner.calls.record(StoreCall::FindByPk);
        let schema = self.schema();
        let Some(primary) = schema.primary_field() else {
            return Ok(None);
        };
        self.find_one_internal(&Where::eq(primary, id.into()))
    }

    /// First record matching the query, in store order
    pub fn find_one(&self, query: &Query) -> Result<Option<Record>> {
        self.inner.calls.record(StoreCall::FindOne);
        self.find_one_query(query)
    }

    /// Every record matching the query
    pub fn find_all(&self, query: &Query) -> Result<Vec<Record>> {
        self.inner.calls.record(StoreCall::FindAll);
        self.find_all_query(query)
    }

    /// Number of records matching the query
    pub fn count(&self, query: &Query) -> Result<usize> {
        self.inner.calls.record(StoreCall::Count);
        Ok(self.select(query)?.count())
    }

    /// Assign `values` on every matching record and save each.
    ///
    /// Returns the number of records updated.
    pub fn update_where(&self, values: impl IntoValues, query: &Query) -> Result<usize> {
        self.inner.calls.record(StoreCall::Update);
        let values = values.into_values()?;
        let records = self.select(query)?.collect::<Vec<_>>();
        let updated = records.len();
        for mut record in records {
            record.update(values.clone())?;
        }
        Ok(updated)
    }

    /// Destroy every matching record.
    ///
    /// Returns the number of records removed.
    pub fn destroy_where(&self, query: &Query) -> Result<usize> {
        self.inner.calls.record(StoreCall::Destroy);
        let records = self.select(query)?.collect::<Vec<_>>();
        let destroyed = records.len();
        for mut record in records {
            record.destroy();
        }
        Ok(destroyed)
    }

    // ----------------------------------------------------------------
    // Untracked internals
    // ----------------------------------------------------------------

    /// Lazy, untracked iteration over matching records.
    ///
    /// The sequence walks the store's rows as they were when the call was
    /// made; mutating the store mid-iteration is undefined behavior.
    /// Eager includes are not applied here — use `find_all`.
    pub fn select(&self, query: &Query) -> Result<RecordIter> {
        query::run(self, query)
    }

    pub(crate) fn build_internal(&self, data: crate::value::ValueMap) -> Record {
        Record::build(self, data)
    }

    pub(crate) fn create_internal(&self, data: crate::value::ValueMap) -> Result<Record> {
        let mut record = self.build_internal(data);
        record.save()?;
        Ok(record)
    }

    pub(crate) fn find_one_internal(&self, where_: &Where) -> Result<Option<Record>> {
        Ok(self.select(&Query::filter(where_.clone()))?.next())
    }

    pub(crate) fn find_all_internal(&self, where_: &Where) -> Result<Vec<Record>> {
        Ok(self.select(&Query::filter(where_.clone()))?.collect())
    }

    fn find_one_query(&self, query: &Query) -> Result<Option<Record>> {
        let Some(mut record) = self.select(query)?.next() else {
            return Ok(None);
        };
        self.apply_includes(std::slice::from_mut(&mut record), &query.include)?;
        Ok(Some(record))
    }

    fn find_all_query(&self, query: &Query) -> Result<Vec<Record>> {
        let mut records: Vec<Record> = self.select(query)?.collect();
        self.apply_includes(&mut records, &query.include)?;
        Ok(records)
    }

    /// Materialize eagerly-included associations onto query results.
    fn apply_includes(&self, records: &mut [Record], include: &[String]) -> Result<()> {
        for alias in include {
            let association = self
                .association(alias)
                .ok_or_else(|| Error::unknown_association(alias.clone()))?;
            for record in records.iter_mut() {
                let related = association::accessors::fetch(&association, record)?;
                record.attach_included(alias.clone(), related);
            }
        }
        Ok(())
    }

    /// Does any persisted row hold `value` in `field`? (uniqueness probe)
    pub(crate) fn exists_with(&self, field: &str, value: &Value) -> Result<bool> {
        Ok(self
            .find_one_internal(&Where::eq(field, value.clone()))?
            .is_some())
    }

    pub(crate) fn rows_snapshot(&self) -> Vec<Row> {
        self.inner.state.read().unwrap().rows()
    }

    pub(crate) fn next_auto_increment(&self) -> u64 {
        self.inner.state.write().unwrap().next_auto_increment()
    }

    pub(crate) fn insert_row(&self, values: RowValues) -> crate::store::RowId {
        let id = self.inner.state.write().unwrap().insert(values);
        debug!(model = %self.inner.name, row = id.0, "row inserted");
        id
    }

    pub(crate) fn remove_row(&self, values: &RowValues) -> bool {
        let removed = self.inner.state.write().unwrap().remove(values);
        if removed {
            debug!(model = %self.inner.name, "row destroyed");
        }
        removed
    }

    // ----------------------------------------------------------------
    // Test-double administration
    // ----------------------------------------------------------------

    /// Populate `n` deterministic fixture rows (1-based positions).
    pub fn seed(&self, n: usize) -> Result<()> {
        let schema = self.schema();
        for i in 1..=n as u64 {
            self.create_internal(seed_values(&schema, i)?)?;
        }
        Ok(())
    }

    /// Forget call counts; rows and the auto-increment counter stay.
    pub fn mock_clear(&self) {
        self.inner.calls.clear();
    }

    /// Forget call counts, wipe all rows, reset the counter to zero and
    /// re-seed the configured fixture count.
    pub fn mock_reset(&self) -> Result<()> {
        self.mock_clear();
        self.inner.state.write().unwrap().wipe();
        self.seed(self.inner.seed_rows)
    }

    // ----------------------------------------------------------------
    // Association declaration
    // ----------------------------------------------------------------

    /// Declare: this model holds a foreign key to `target`.
    pub fn belongs_to(&self, target: &Model, options: AssociationOptions) -> Result<Association> {
        let association = association::resolve_belongs_to(self, target, options)?;
        self.register_association(association.clone())?;
        Ok(association)
    }

    /// Declare: `target` holds a foreign key back to this model, with at
    /// most one holder.
    pub fn has_one(&self, target: &Model, options: AssociationOptions) -> Result<Association> {
        let association = association::resolve_has_one(self, target, options)?;
        self.register_association(association.clone())?;
        Ok(association)
    }

    /// Declare: `target` holds a foreign key back to this model.
    pub fn has_many(&self, target: &Model, options: AssociationOptions) -> Result<Association> {
        let association = association::resolve_has_many(self, target, options)?;
        self.register_association(association.clone())?;
        Ok(association)
    }

    /// Declare a many-to-many relationship through a join model, which is
    /// looked up in the registry by name or synthesized with exactly the
    /// two foreign-key fields.
    pub fn belongs_to_many(
        &self,
        target: &Model,
        options: ManyToManyOptions,
    ) -> Result<Association> {
        let association = association::resolve_belongs_to_many(self, target, options)?;
        self.register_association(association.clone())?;
        Ok(association)
    }

    /// The resolved association behind an alias
    pub fn association(&self, alias: &str) -> Option<Association> {
        self.inner
            .associations
            .read()
            .unwrap()
            .iter()
            .find(|a| a.alias == alias)
            .cloned()
    }

    /// All resolved associations, in declaration order
    pub fn associations(&self) -> Vec<Association> {
        self.inner.associations.read().unwrap().clone()
    }

    fn register_association(&self, association: Association) -> Result<()> {
        let mut associations = self.inner.associations.write().unwrap();
        if associations.iter().any(|a| a.alias == association.alias) {
            return Err(Error::invalid_schema(format!(
                "association alias \"{}\" already declared on \"{}\"",
                association.alias, self.inner.name
            )));
        }
        debug!(
            source = %self.inner.name,
            alias = %association.alias,
            "association resolved"
        );
        associations.push(association);
        Ok(())
    }

    /// Append a synthesized foreign-key field to the schema.
    pub(crate) fn add_schema_field(&self, name: &str, def: FieldDef) -> bool {
        self.inner.schema.write().unwrap().add_field(name, def)
    }

    pub(crate) fn attach_db(&self, db: &Arc<DatabaseInner>) {
        *self.inner.db.write().unwrap() = Arc::downgrade(db);
    }

    /// The registry this model was defined on, when there is one
    pub fn database(&self) -> Option<Database> {
        self.inner
            .db
            .read()
            .unwrap()
            .upgrade()
            .map(Database::from_inner)
    }

    /// Non-owning handle for association metadata
    pub fn downgrade(&self) -> ModelRef {
        ModelRef {
            name: self.inner.name.clone(),
            inner: Arc::downgrade(&self.inner),
        }
    }
}
