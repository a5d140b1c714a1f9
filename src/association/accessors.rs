//! Accessor operations
//!
//! Every operation here is bound to a specific source instance and routes
//! through the untracked query/save internals, so relationship traffic
//! never shows up in the call counts a test is asserting on.
//!
//! Link identity is key equality: `get` issues a predicate keyed by the
//! relevant foreign or through key, `set` replaces the link set (nulling
//! or deleting prior links first), `add`/`remove` adjust membership, and
//! `create` builds an already-linked target row. For belongsToMany the
//! membership lives in join rows, one per link, visited in insertion
//! order.

use crate::error::{Error, Result};
use crate::model::Model;
use crate::predicate::Where;
use crate::record::{Record, Related, TargetRef};
use crate::value::{Value, ValueMap};

use super::{Association, AssociationKind};

/// Materialize the related instance(s) for a source record.
pub(crate) fn fetch(association: &Association, record: &Record) -> Result<Related> {
    let target = association.target.upgrade()?;
    match association.kind {
        AssociationKind::BelongsTo => {
            let fk_value = record.get(&association.foreign_key);
            if fk_value.is_null() {
                return Ok(Related::One(None));
            }
            Ok(Related::One(target.find_one_internal(&Where::eq(
                &association.target_key,
                fk_value,
            ))?))
        }
        AssociationKind::HasOne => {
            let key = record.get(&association.source_key);
            if key.is_null() {
                return Ok(Related::One(None));
            }
            Ok(Related::One(target.find_one_internal(&Where::eq(
                &association.foreign_key,
                key,
            ))?))
        }
        AssociationKind::HasMany => {
            let key = record.get(&association.source_key);
            if key.is_null() {
                return Ok(Related::Many(Vec::new()));
            }
            Ok(Related::Many(target.find_all_internal(&Where::eq(
                &association.foreign_key,
                key,
            ))?))
        }
        AssociationKind::BelongsToMany => {
            let mut targets = Vec::new();
            for join_row in join_rows(association, record)? {
                let target_value = join_row.get(other_key(association));
                if target_value.is_null() {
                    continue;
                }
                if let Some(found) =
                    target.find_one_internal(&Where::eq(&association.target_key, target_value))?
                {
                    targets.push(found);
                }
            }
            Ok(Related::Many(targets))
        }
    }
}

/// Replace a to-one relationship.
pub(crate) fn set_one(
    association: &Association,
    record: &mut Record,
    target: Option<&Record>,
) -> Result<()> {
    match association.kind {
        AssociationKind::BelongsTo => {
            let value = target
                .map(|t| t.get(&association.target_key))
                .unwrap_or(Value::Null);
            record.set(&association.foreign_key, value);
            record.save()
        }
        AssociationKind::HasOne => {
            let key = link_key(record, &association.source_key)?;
            let held = association.target.upgrade()?;
            // Single-holder invariant: unlink whoever holds the key now.
            if let Some(mut current) =
                held.find_one_internal(&Where::eq(&association.foreign_key, key.clone()))?
            {
                current.set(&association.foreign_key, Value::Null);
                current.save()?;
            }
            if let Some(target) = target {
                let mut linked = target.clone();
                linked.set(&association.foreign_key, key);
                linked.save()?;
            }
            Ok(())
        }
        _ => Err(to_many_misuse(association)),
    }
}

/// Replace the full membership of a to-many relationship.
pub(crate) fn set_many(
    association: &Association,
    record: &mut Record,
    targets: &[TargetRef<'_>],
) -> Result<()> {
    match association.kind {
        AssociationKind::HasMany => {
            let key = link_key(record, &association.source_key)?;
            let target_model = association.target.upgrade()?;
            for mut linked in
                target_model.find_all_internal(&Where::eq(&association.foreign_key, key))?
            {
                linked.set(&association.foreign_key, Value::Null);
                linked.save()?;
            }
            for target in targets {
                add(association, record, target)?;
            }
            Ok(())
        }
        AssociationKind::BelongsToMany => {
            for mut join_row in join_rows(association, record)? {
                join_row.destroy();
            }
            for target in targets {
                add(association, record, target)?;
            }
            Ok(())
        }
        _ => Err(to_one_misuse(association)),
    }
}

/// Link one more target.
pub(crate) fn add(
    association: &Association,
    record: &mut Record,
    target: &TargetRef<'_>,
) -> Result<()> {
    match association.kind {
        AssociationKind::HasMany => {
            let key = link_key(record, &association.source_key)?;
            if let Some(mut linked) = resolve_target(association, target)? {
                linked.set(&association.foreign_key, key);
                linked.save()?;
            }
            Ok(())
        }
        AssociationKind::BelongsToMany => {
            let key = link_key(record, &association.source_key)?;
            let target_value = target_key_value(association, target)?;
            if target_value.is_null() {
                return Err(Error::not_null(association.target_key.clone()));
            }
            let through = through_model(association)?;
            let link = Where::and([
                Where::eq(&association.foreign_key, key.clone()),
                Where::eq(other_key(association), target_value.clone()),
            ]);
            // One join row per link pair; adding twice stays one row.
            if through.find_one_internal(&link)?.is_none() {
                let mut values = ValueMap::new();
                values.insert(association.foreign_key.clone(), key);
                values.insert(other_key(association).to_string(), target_value);
                through.create_internal(values)?;
            }
            Ok(())
        }
        _ => Err(to_one_misuse(association)),
    }
}

/// Unlink one target; unknown targets are a no-op.
pub(crate) fn remove(
    association: &Association,
    record: &mut Record,
    target: &TargetRef<'_>,
) -> Result<()> {
    match association.kind {
        AssociationKind::HasMany => {
            let key = link_key(record, &association.source_key)?;
            if let Some(mut linked) = resolve_target(association, target)? {
                if linked.get(&association.foreign_key) == key {
                    linked.set(&association.foreign_key, Value::Null);
                    linked.save()?;
                }
            }
            Ok(())
        }
        AssociationKind::BelongsToMany => {
            let key = link_key(record, &association.source_key)?;
            let target_value = target_key_value(association, target)?;
            let through = through_model(association)?;
            let link = Where::and([
                Where::eq(&association.foreign_key, key),
                Where::eq(other_key(association), target_value),
            ]);
            for mut join_row in through.find_all_internal(&link)? {
                join_row.destroy();
            }
            Ok(())
        }
        _ => Err(to_one_misuse(association)),
    }
}

/// Are all the given targets linked right now?
pub(crate) fn has(
    association: &Association,
    record: &Record,
    targets: &[TargetRef<'_>],
) -> Result<bool> {
    match association.kind {
        AssociationKind::HasMany => {
            let linked = fetch(association, record)?.many();
            for target in targets {
                let present = match target {
                    TargetRef::Record(r) => linked.iter().any(|l| l.equals(r)),
                    TargetRef::Key(value) => {
                        let key_value = coerce_primary_key(association, value)?;
                        let primary = primary_of_target(association)?;
                        linked.iter().any(|l| l.get(&primary) == key_value)
                    }
                };
                if !present {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        AssociationKind::BelongsToMany => {
            let member_keys: Vec<Value> = join_rows(association, record)?
                .iter()
                .map(|row| row.get(other_key(association)))
                .collect();
            for target in targets {
                let wanted = target_key_value(association, target)?;
                if !member_keys.contains(&wanted) {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        _ => Err(to_one_misuse(association)),
    }
}

/// Create a target row already linked to the source instance.
pub(crate) fn create(
    association: &Association,
    record: &mut Record,
    mut values: ValueMap,
) -> Result<Record> {
    let target_model = association.target.upgrade()?;
    match association.kind {
        AssociationKind::BelongsTo => {
            let created = target_model.create_internal(values)?;
            record.set(
                &association.foreign_key,
                created.get(&association.target_key),
            );
            record.save()?;
            Ok(created)
        }
        AssociationKind::HasOne => {
            let key = link_key(record, &association.source_key)?;
            if let Some(mut current) = target_model
                .find_one_internal(&Where::eq(&association.foreign_key, key.clone()))?
            {
                current.set(&association.foreign_key, Value::Null);
                current.save()?;
            }
            values.insert(association.foreign_key.clone(), key);
            target_model.create_internal(values)
        }
        AssociationKind::HasMany => {
            let key = link_key(record, &association.source_key)?;
            values.insert(association.foreign_key.clone(), key);
            target_model.create_internal(values)
        }
        AssociationKind::BelongsToMany => {
            let created = target_model.create_internal(values)?;
            add(association, record, &TargetRef::Record(&created))?;
            Ok(created)
        }
    }
}

// --------------------------------------------------------------------
// Helpers
// --------------------------------------------------------------------

/// The source-side key value links refer to; linking an instance without
/// one is an error.
fn link_key(record: &Record, source_key: &str) -> Result<Value> {
    let key = record.get(source_key);
    if key.is_null() {
        return Err(Error::not_null(source_key));
    }
    Ok(key)
}

fn other_key(association: &Association) -> &str {
    association.other_key.as_deref().unwrap_or("")
}

fn through_model(association: &Association) -> Result<Model> {
    association
        .through
        .as_ref()
        .ok_or_else(|| {
            Error::invalid_schema(format!(
                "association \"{}\" has no join model",
                association.alias
            ))
        })?
        .upgrade()
}

/// All join rows linking the source instance, in insertion order.
fn join_rows(association: &Association, record: &Record) -> Result<Vec<Record>> {
    let key = record.get(&association.source_key);
    if key.is_null() {
        return Ok(Vec::new());
    }
    through_model(association)?.find_all_internal(&Where::eq(&association.foreign_key, key))
}

/// The target-side key value a reference stands for: read from the
/// instance, or coerce a raw key through the target key's type.
fn target_key_value(association: &Association, target: &TargetRef<'_>) -> Result<Value> {
    match target {
        TargetRef::Record(record) => Ok(record.get(&association.target_key)),
        TargetRef::Key(value) => {
            let target_model = association.target.upgrade()?;
            let schema = target_model.schema();
            match schema.field(&association.target_key) {
                Some(def) if !value.is_null() => def.data_type.coerce(value),
                _ => Ok(value.clone()),
            }
        }
    }
}

/// Resolve a reference to a live target record, by identity or by
/// primary-key lookup; a key with no matching row resolves to nothing.
fn resolve_target(
    association: &Association,
    target: &TargetRef<'_>,
) -> Result<Option<Record>> {
    match target {
        TargetRef::Record(record) => Ok(Some((*record).clone())),
        TargetRef::Key(value) => {
            let target_model = association.target.upgrade()?;
            let primary = primary_of_target(association)?;
            target_model.find_one_internal(&Where::eq(primary, value.clone()))
        }
    }
}

fn primary_of_target(association: &Association) -> Result<String> {
    let target_model = association.target.upgrade()?;
    target_model
        .schema()
        .primary_field()
        .map(str::to_string)
        .ok_or_else(|| {
            Error::invalid_schema(format!(
                "\"{}\" has no primary key for key-based membership",
                target_model.name()
            ))
        })
}

fn coerce_primary_key(association: &Association, value: &Value) -> Result<Value> {
    let target_model = association.target.upgrade()?;
    let schema = target_model.schema();
    let primary = primary_of_target(association)?;
    match schema.field(&primary) {
        Some(def) if !value.is_null() => def.data_type.coerce(value),
        _ => Ok(value.clone()),
    }
}

fn to_one_misuse(association: &Association) -> Error {
    Error::invalid_schema(format!(
        "association \"{}\" is to-one; use set_related",
        association.alias
    ))
}

fn to_many_misuse(association: &Association) -> Error {
    Error::invalid_schema(format!(
        "association \"{}\" is to-many; use set_related_many",
        association.alias
    ))
}
