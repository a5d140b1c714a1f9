//! Record instances
//!
//! A `Record` is a live, possibly-unsaved view over one row: the current
//! field values (`data_values`), the shared persisted snapshot it aliases,
//! and a new-record flag. Every instance loaded from the same row shares
//! the same snapshot, so `equals` is snapshot identity and a save through
//! one instance is visible to the others after they `reload`.
//!
//! `save` is the only path that validates and the only path that mutates
//! the store: defaults, null checks, coercion and uniqueness run per field
//! in declaration order, and the first failure aborts before anything is
//! persisted. Mutations the save already applied to `data_values`
//! (substituted defaults, coerced values) stay visible on the instance;
//! the store is untouched.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::association::{accessors, AssociationKind};
use crate::error::{Error, Result};
use crate::model::Model;
use crate::store::{Row, RowId, RowValues};
use crate::value::{IntoValues, Value, ValueMap};

/// Materialized relationship value
#[derive(Debug, Clone)]
pub enum Related {
    /// To-one target, if linked
    One(Option<Record>),
    /// To-many targets in link order
    Many(Vec<Record>),
}

impl Related {
    /// Number of linked targets
    pub fn count(&self) -> usize {
        match self {
            Related::One(target) => usize::from(target.is_some()),
            Related::Many(targets) => targets.len(),
        }
    }

    /// The single target of a to-one relationship
    pub fn one(self) -> Option<Record> {
        match self {
            Related::One(target) => target,
            Related::Many(mut targets) => {
                if targets.is_empty() {
                    None
                } else {
                    Some(targets.remove(0))
                }
            }
        }
    }

    /// The targets of a to-many relationship
    pub fn many(self) -> Vec<Record> {
        match self {
            Related::One(target) => target.into_iter().collect(),
            Related::Many(targets) => targets,
        }
    }
}

/// Reference to an association target: a live instance or its raw key
pub enum TargetRef<'a> {
    /// A record instance of the target model
    Record(&'a Record),
    /// A raw key value, coerced through the target key's type
    Key(Value),
}

impl<'a> From<&'a Record> for TargetRef<'a> {
    fn from(record: &'a Record) -> Self {
        TargetRef::Record(record)
    }
}

impl<'a> From<Value> for TargetRef<'a> {
    fn from(value: Value) -> Self {
        TargetRef::Key(value)
    }
}

/// A live handle over one row's values
#[derive(Debug, Clone)]
pub struct Record {
    model: Model,
    data_values: ValueMap,
    previous: RowValues,
    row_id: Option<RowId>,
    is_new: bool,
    included: BTreeMap<String, Related>,
}

impl Record {
    /// Build an unsaved instance; no store interaction happens.
    pub(crate) fn build(model: &Model, data: ValueMap) -> Record {
        let schema = model.schema();
        let mut data_values = ValueMap::new();
        for field in schema.fields() {
            let value = data.get(&field.name).cloned().unwrap_or(Value::Null);
            data_values.insert(field.name.clone(), value);
        }
        Record {
            model: model.clone(),
            data_values,
            previous: Arc::new(RwLock::new(ValueMap::new())),
            row_id: None,
            is_new: true,
            included: BTreeMap::new(),
        }
    }

    /// Load an instance over an existing row, optionally projected.
    pub(crate) fn from_row(model: &Model, row: &Row, attributes: Option<&[String]>) -> Record {
        let schema = model.schema();
        let values = row.values.read().unwrap();
        let mut data_values = ValueMap::new();
        for field in schema.fields() {
            if let Some(attrs) = attributes {
                if !attrs.iter().any(|a| a == &field.name) {
                    continue;
                }
            }
            let value = values.get(&field.name).cloned().unwrap_or(Value::Null);
            data_values.insert(field.name.clone(), value);
        }
        drop(values);

        Record {
            model: model.clone(),
            data_values,
            previous: row.values.clone(),
            row_id: Some(row.id),
            is_new: false,
            included: BTreeMap::new(),
        }
    }

    /// The model this instance belongs to
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Whether the instance has never been saved
    pub fn is_new_record(&self) -> bool {
        self.is_new
    }

    /// Stable row identifier, once persisted
    pub fn row_id(&self) -> Option<RowId> {
        self.row_id
    }

    /// Current value of one field (a copy; null when absent or projected
    /// out)
    pub fn get(&self, field: &str) -> Value {
        self.data_values.get(field).cloned().unwrap_or(Value::Null)
    }

    /// Copy of all current values, independent of internal state
    pub fn get_all(&self) -> ValueMap {
        self.data_values.clone()
    }

    /// Copy of the last-persisted snapshot
    pub fn previous_data_values(&self) -> ValueMap {
        self.previous.read().unwrap().clone()
    }

    /// Assign one known field; unknown fields are ignored.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) {
        if self.model.schema().has_field(field) {
            self.data_values.insert(field.to_string(), value.into());
        }
    }

    /// Assign several fields at once; unknown fields are ignored.
    pub fn set_many(&mut self, values: impl IntoValues) -> Result<()> {
        let values = values.into_values()?;
        let schema = self.model.schema();
        for (field, value) in values {
            if schema.has_field(&field) {
                self.data_values.insert(field, value);
            }
        }
        Ok(())
    }

    /// Does the field's current value differ (deeply) from the snapshot?
    ///
    /// A field that was projected out of this instance reports false:
    /// unknown is treated as unchanged.
    pub fn changed(&self, field: &str) -> bool {
        let Some(current) = self.data_values.get(field) else {
            return false;
        };
        let previous = self.previous.read().unwrap();
        match previous.get(field) {
            Some(persisted) => persisted != current,
            None => true,
        }
    }

    /// All fields whose current value differs from the snapshot
    pub fn changed_fields(&self) -> Vec<String> {
        self.data_values
            .keys()
            .filter(|field| self.changed(field))
            .cloned()
            .collect()
    }

    /// Snapshot identity: true iff both instances alias the same row.
    pub fn equals(&self, other: &Record) -> bool {
        Arc::ptr_eq(&self.previous, &other.previous)
    }

    /// Validate and persist the current values.
    ///
    /// Per field, in declaration order: substitute the default when unset,
    /// reject forbidden nulls, coerce through the field type, and check
    /// uniqueness against the store. A new record then receives its
    /// auto-increment key and its snapshot enters the store. The snapshot
    /// contents are replaced last, so any failure leaves the store as it
    /// was.
    pub fn save(&mut self) -> Result<()> {
        let schema = self.model.schema();

        for field in schema.fields() {
            let name = field.name.as_str();
            let def = &field.def;
            // Projected-out fields are unknown to this instance and are
            // left alone entirely.
            let Some(current) = self.data_values.get(name) else {
                continue;
            };

            let mut value = current.clone();
            if value.is_null() {
                if let Some(default) = &def.default_value {
                    value = default.resolve();
                }
            }

            if !def.allow_null && value.is_null() && !(def.auto_increment && self.is_new) {
                return Err(Error::not_null(name));
            }

            if !value.is_null() {
                value = def.data_type.coerce(&value)?;
            }
            self.data_values.insert(name.to_string(), value.clone());

            if def.unique
                && (self.is_new || self.changed(name))
                && self.model.exists_with(name, &value)?
            {
                return Err(Error::unique(name));
            }
        }

        if self.is_new {
            if let Some(primary) = schema.primary_field() {
                let auto = schema
                    .field(primary)
                    .map(|def| def.auto_increment)
                    .unwrap_or(false);
                if auto {
                    let next = self.model.next_auto_increment();
                    self.data_values
                        .insert(primary.to_string(), Value::from(next));
                }
            }
            self.is_new = false;
            self.row_id = Some(self.model.insert_row(self.previous.clone()));
        }

        let mut previous = self.previous.write().unwrap();
        for (field, value) in &self.data_values {
            previous.insert(field.clone(), value.clone());
        }
        Ok(())
    }

    /// Assign fields, then save.
    pub fn update(&mut self, values: impl IntoValues) -> Result<()> {
        self.set_many(values)?;
        self.save()
    }

    /// Discard unsaved values and restore the full persisted snapshot.
    pub fn reload(&mut self) {
        self.data_values = self.previous.read().unwrap().clone();
    }

    /// Remove the backing row from the store.
    ///
    /// The instance stays readable but is orphaned; a later save will not
    /// re-insert it.
    pub fn destroy(&mut self) {
        self.model.remove_row(&self.previous);
    }

    /// Deep copy of the current values as JSON
    pub fn to_json(&self) -> serde_json::Value {
        Value::Object(self.data_values.clone()).to_json()
    }

    // ----------------------------------------------------------------
    // Association accessors
    // ----------------------------------------------------------------

    /// Materialize the related instance(s) behind an alias.
    ///
    /// Uses the eagerly-included value when the instance came from a query
    /// with `include`; otherwise resolves live against the target store.
    pub fn related(&self, alias: &str) -> Result<Related> {
        if let Some(included) = self.included.get(alias) {
            return Ok(included.clone());
        }
        let association = self
            .model
            .association(alias)
            .ok_or_else(|| Error::unknown_association(alias))?;
        accessors::fetch(&association, self)
    }

    /// Cardinality of [`Record::related`]
    pub fn count_related(&self, alias: &str) -> Result<usize> {
        Ok(self.related(alias)?.count())
    }

    /// Replace a to-one relationship; `None` clears it.
    pub fn set_related(&mut self, alias: &str, target: Option<&Record>) -> Result<()> {
        let association = self
            .model
            .association(alias)
            .ok_or_else(|| Error::unknown_association(alias))?;
        match association.kind {
            AssociationKind::BelongsTo | AssociationKind::HasOne => {
                accessors::set_one(&association, self, target)
            }
            _ => Err(Error::invalid_schema(format!(
                "association \"{}\" is to-many; use set_related_many",
                alias
            ))),
        }
    }

    /// Replace a to-many relationship; an empty slice clears it.
    pub fn set_related_many(&mut self, alias: &str, targets: &[TargetRef<'_>]) -> Result<()> {
        let association = self
            .model
            .association(alias)
            .ok_or_else(|| Error::unknown_association(alias))?;
        match association.kind {
            AssociationKind::HasMany | AssociationKind::BelongsToMany => {
                accessors::set_many(&association, self, targets)
            }
            _ => Err(Error::invalid_schema(format!(
                "association \"{}\" is to-one; use set_related",
                alias
            ))),
        }
    }

    /// Link one more target into a to-many relationship.
    pub fn add_related<'t>(&mut self, alias: &str, target: impl Into<TargetRef<'t>>) -> Result<()> {
        let association = self
            .model
            .association(alias)
            .ok_or_else(|| Error::unknown_association(alias))?;
        accessors::add(&association, self, &target.into())
    }

    /// Unlink one target from a to-many relationship.
    pub fn remove_related<'t>(&mut self, alias: &str, target: impl Into<TargetRef<'t>>) -> Result<()> {
        let association = self
            .model
            .association(alias)
            .ok_or_else(|| Error::unknown_association(alias))?;
        accessors::remove(&association, self, &target.into())
    }

    /// Are all the given targets currently linked?
    pub fn has_related(&self, alias: &str, targets: &[TargetRef<'_>]) -> Result<bool> {
        let association = self
            .model
            .association(alias)
            .ok_or_else(|| Error::unknown_association(alias))?;
        accessors::has(&association, self, targets)
    }

    /// Create a target row already linked to this instance.
    pub fn create_related(&mut self, alias: &str, values: impl IntoValues) -> Result<Record> {
        let association = self
            .model
            .association(alias)
            .ok_or_else(|| Error::unknown_association(alias))?;
        accessors::create(&association, self, values.into_values()?)
    }

    /// Stash an eagerly-loaded relationship on the instance.
    pub(crate) fn attach_included(&mut self, alias: String, related: Related) {
        self.included.insert(alias, related);
    }
}
