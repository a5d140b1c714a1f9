//! Relationship topology
//!
//! An association is a declared edge between two models. Resolution
//! derives everything the accessors need: the foreign-key field (added to
//! the source schema for belongsTo, to the target schema for hasOne and
//! hasMany), the referenced keys (primary keys unless overridden), the
//! accessor alias, and, for belongsToMany, the join model — looked up in
//! the registry by name or synthesized with exactly the two foreign-key
//! fields.
//!
//! Default names follow the `{ModelName}{KeyName}` convention: a
//! `belongs_to(Owner)` from `Item` derives `OwnerId` on `Item`, a
//! `has_many(Item)` from `Owner` derives `OwnerId` on `Item`, and a
//! `belongs_to_many` between `A` and `B` derives the `AB` join model with
//! `AId` and `BId`.

pub(crate) mod accessors;

use crate::error::{Error, Result};
use crate::model::{Model, ModelRef};
use crate::registry::ModelDef;
use crate::schema::FieldDef;
use crate::types::DataType;

/// The four relationship shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationKind {
    /// The source holds the foreign key
    BelongsTo,
    /// The target holds the foreign key; at most one holder
    HasOne,
    /// The target holds the foreign key
    HasMany,
    /// A join model holds one foreign key per side
    BelongsToMany,
}

/// A resolved relationship edge, stored on the source model
#[derive(Debug, Clone)]
pub struct Association {
    /// Relationship shape
    pub kind: AssociationKind,
    /// Accessor alias this edge answers to
    pub alias: String,
    /// Source model name
    pub source: String,
    /// Target model handle
    pub target: ModelRef,
    /// Foreign-key field: on the source for belongsTo, on the target for
    /// hasOne/hasMany, on the join model for belongsToMany
    pub foreign_key: String,
    /// Key on the source side that links refer to
    pub source_key: String,
    /// Key on the target side that links refer to
    pub target_key: String,
    /// Join-model field referring to the target (belongsToMany only)
    pub other_key: Option<String>,
    /// Join model (belongsToMany only)
    pub through: Option<ModelRef>,
}

/// Options for belongsTo / hasOne / hasMany
#[derive(Debug, Clone, Default)]
pub struct AssociationOptions {
    alias: Option<String>,
    foreign_key: Option<String>,
    source_key: Option<String>,
    target_key: Option<String>,
}

impl AssociationOptions {
    /// All defaults: derived alias, derived foreign key, primary keys
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the accessor alias
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Override the foreign-key field name
    pub fn foreign_key(mut self, foreign_key: impl Into<String>) -> Self {
        self.foreign_key = Some(foreign_key.into());
        self
    }

    /// Override the referenced key on the source (hasOne/hasMany)
    pub fn source_key(mut self, source_key: impl Into<String>) -> Self {
        self.source_key = Some(source_key.into());
        self
    }

    /// Override the referenced key on the target (belongsTo)
    pub fn target_key(mut self, target_key: impl Into<String>) -> Self {
        self.target_key = Some(target_key.into());
        self
    }
}

/// Options for belongsToMany
#[derive(Debug, Clone, Default)]
pub struct ManyToManyOptions {
    alias: Option<String>,
    through: Option<String>,
    foreign_key: Option<String>,
    other_key: Option<String>,
    source_key: Option<String>,
    target_key: Option<String>,
}

impl ManyToManyOptions {
    /// All defaults: derived alias, derived join model, primary keys
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the accessor alias
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Name of the join model to reuse or synthesize
    pub fn through(mut self, through: impl Into<String>) -> Self {
        self.through = Some(through.into());
        self
    }

    /// Override the join field referring to the source
    pub fn foreign_key(mut self, foreign_key: impl Into<String>) -> Self {
        self.foreign_key = Some(foreign_key.into());
        self
    }

    /// Override the join field referring to the target
    pub fn other_key(mut self, other_key: impl Into<String>) -> Self {
        self.other_key = Some(other_key.into());
        self
    }

    /// Override the referenced key on the source
    pub fn source_key(mut self, source_key: impl Into<String>) -> Self {
        self.source_key = Some(source_key.into());
        self
    }

    /// Override the referenced key on the target
    pub fn target_key(mut self, target_key: impl Into<String>) -> Self {
        self.target_key = Some(target_key.into());
        self
    }
}

/// `"id"` → `"Id"`, for derived key names
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// The key a relationship references on one side, defaulting to that
/// side's primary key.
fn referenced_key(model: &Model, explicit: Option<String>, role: &str) -> Result<String> {
    let schema = model.schema();
    let key = match explicit {
        Some(key) => key,
        None => schema
            .primary_field()
            .map(str::to_string)
            .ok_or_else(|| {
                Error::invalid_schema(format!(
                    "\"{}\" has no primary key to use as the {} key",
                    model.name(),
                    role
                ))
            })?,
    };
    if !schema.has_field(&key) {
        return Err(Error::unknown_field(key));
    }
    Ok(key)
}

/// Field type carried by a synthesized foreign key: the type of the key
/// it refers to, stripped of constraints.
fn foreign_key_def(model: &Model, key: &str) -> FieldDef {
    let data_type = model
        .schema()
        .field(key)
        .map(|def| def.data_type.clone())
        .unwrap_or(DataType::Number);
    FieldDef::new(data_type)
}

pub(crate) fn resolve_belongs_to(
    source: &Model,
    target: &Model,
    options: AssociationOptions,
) -> Result<Association> {
    let target_key = referenced_key(target, options.target_key, "target")?;
    let foreign_key = options
        .foreign_key
        .unwrap_or_else(|| format!("{}{}", target.name(), capitalize(&target_key)));
    source.add_schema_field(&foreign_key, foreign_key_def(target, &target_key));

    Ok(Association {
        kind: AssociationKind::BelongsTo,
        alias: options.alias.unwrap_or_else(|| target.name().to_string()),
        source: source.name().to_string(),
        target: target.downgrade(),
        source_key: foreign_key.clone(),
        target_key,
        foreign_key,
        other_key: None,
        through: None,
    })
}

pub(crate) fn resolve_has_one(
    source: &Model,
    target: &Model,
    options: AssociationOptions,
) -> Result<Association> {
    resolve_has(source, target, options, AssociationKind::HasOne)
}

pub(crate) fn resolve_has_many(
    source: &Model,
    target: &Model,
    options: AssociationOptions,
) -> Result<Association> {
    resolve_has(source, target, options, AssociationKind::HasMany)
}

fn resolve_has(
    source: &Model,
    target: &Model,
    options: AssociationOptions,
    kind: AssociationKind,
) -> Result<Association> {
    let source_key = referenced_key(source, options.source_key, "source")?;
    let foreign_key = options
        .foreign_key
        .unwrap_or_else(|| format!("{}{}", source.name(), capitalize(&source_key)));
    target.add_schema_field(&foreign_key, foreign_key_def(source, &source_key));

    let alias = options.alias.unwrap_or_else(|| match kind {
        AssociationKind::HasMany => format!("{}s", target.name()),
        _ => target.name().to_string(),
    });

    Ok(Association {
        kind,
        alias,
        source: source.name().to_string(),
        target: target.downgrade(),
        source_key,
        target_key: foreign_key.clone(),
        foreign_key,
        other_key: None,
        through: None,
    })
}

pub(crate) fn resolve_belongs_to_many(
    source: &Model,
    target: &Model,
    options: ManyToManyOptions,
) -> Result<Association> {
    let db = source.database().ok_or_else(|| {
        Error::invalid_schema(format!(
            "belongsToMany on \"{}\" requires models defined on a database registry",
            source.name()
        ))
    })?;

    let source_key = referenced_key(source, options.source_key, "source")?;
    let target_key = referenced_key(target, options.target_key, "target")?;
    let foreign_key = options
        .foreign_key
        .unwrap_or_else(|| format!("{}{}", source.name(), capitalize(&source_key)));
    let other_key = options
        .other_key
        .unwrap_or_else(|| format!("{}{}", target.name(), capitalize(&target_key)));
    let through_name = options
        .through
        .unwrap_or_else(|| format!("{}{}", source.name(), target.name()));

    let through = match db.model(&through_name) {
        Some(existing) => {
            // Reused join models still need both key fields.
            existing.add_schema_field(&foreign_key, foreign_key_def(source, &source_key));
            existing.add_schema_field(&other_key, foreign_key_def(target, &target_key));
            existing
        }
        None => db.define(
            ModelDef::new(&through_name)
                .field(&foreign_key, foreign_key_def(source, &source_key))
                .field(&other_key, foreign_key_def(target, &target_key)),
        )?,
    };

    Ok(Association {
        kind: AssociationKind::BelongsToMany,
        alias: options
            .alias
            .unwrap_or_else(|| format!("{}s", target.name())),
        source: source.name().to_string(),
        target: target.downgrade(),
        source_key,
        target_key,
        foreign_key,
        other_key: Some(other_key),
        through: Some(through.downgrade()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("id"), "Id");
        assert_eq!(capitalize("uuid"), "Uuid");
        assert_eq!(capitalize(""), "");
    }
}
