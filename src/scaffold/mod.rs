//! Source scaffolding
//!
//! Naming conventions and templates for new model and migration files,
//! plus a small generator that writes them. Model names are capitalized
//! identifiers (`Owner`, `LineItem2`); migration files carry a UTC
//! timestamp prefix so lexical order is creation order
//! (`20260805120000-add-owners.rs`). The generator refuses to overwrite
//! an existing model file.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Scaffolding failures
#[derive(Debug, Error)]
pub enum ScaffoldError {
    /// Name does not match the capitalized-identifier convention
    #[error("invalid name \"{0}\"")]
    InvalidName(String),

    /// Refusing to overwrite an existing file
    #[error("\"{0}\" already exists")]
    AlreadyExists(PathBuf),

    /// Underlying filesystem failure
    #[error("scaffold io error: {0}")]
    Io(#[from] io::Error),
}

/// Result alias for scaffold operations
pub type ScaffoldResult<T> = std::result::Result<T, ScaffoldError>;

/// Model names are capitalized alphanumeric identifiers.
pub fn validate_model_name(name: &str) -> ScaffoldResult<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => first.is_ascii_uppercase() && chars.all(|c| c.is_ascii_alphanumeric()),
        None => false,
    };
    if !valid {
        return Err(ScaffoldError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Lowercase, with every non-alphanumeric run collapsed to one dash.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Compact UTC timestamp used as a migration filename prefix
pub fn timestamp_prefix(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d%H%M%S").to_string()
}

/// `<timestamp>-<slug>.rs`
pub fn migration_filename(name: &str, at: DateTime<Utc>) -> String {
    format!("{}-{}.rs", timestamp_prefix(at), slugify(name))
}

/// Source template for a new model definition file
pub fn model_template(name: &str) -> String {
    let module = name.to_lowercase();
    format!(
        r#"use mimicdb::{{AssociationOptions, DataType, FieldDef, ModelDef}};

/// Declarative definition of the `{name}` model.
pub fn {module}() -> ModelDef {{
    ModelDef::new("{name}")
        .field(
            "id",
            FieldDef::new(DataType::INTEGER).primary_key().auto_increment(),
        )
        .field("name", FieldDef::new(DataType::STRING).not_null())
        .field(
            "createdAt",
            FieldDef::new(DataType::DATE).default_fn(mimicdb::types::now),
        )
        .associate("Parent", |model, parent| {{
            model.belongs_to(
                parent,
                AssociationOptions::new().alias("parent").foreign_key("ParentId"),
            )?;
            Ok(())
        }})
}}
"#
    )
}

/// Source template for a new migration file
pub fn migration_template() -> String {
    r#"use mimicdb::{DataType, FieldDef, Migration, MigrationContext, ModelDef, Result};

pub struct Step;

impl Migration for Step {
    fn up(&self, ctx: &mut MigrationContext<'_>) -> Result<()> {
        ctx.create_collection(
            ModelDef::new("Owner")
                .field(
                    "id",
                    FieldDef::new(DataType::INTEGER).primary_key().auto_increment(),
                )
                .field(
                    "createdAt",
                    FieldDef::new(DataType::DATE).default_fn(mimicdb::types::now),
                ),
        )?;
        ctx.create_collection(
            ModelDef::new("Item")
                .field("name", FieldDef::new(DataType::STRING).not_null())
                .field("OwnerId", FieldDef::new(DataType::INTEGER)),
        )?;
        Ok(())
    }

    fn down(&self, ctx: &mut MigrationContext<'_>) -> Result<()> {
        ctx.drop_collection("Item")?;
        ctx.drop_collection("Owner")?;
        Ok(())
    }
}
"#
    .to_string()
}

/// Writes model and migration sources at their derived paths
pub struct Scaffolder {
    models_dir: PathBuf,
    migrations_dir: PathBuf,
}

impl Scaffolder {
    /// A generator writing under the given directories
    pub fn new(models_dir: impl Into<PathBuf>, migrations_dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
            migrations_dir: migrations_dir.into(),
        }
    }

    /// Write a new model source file; fails if it already exists.
    pub fn create_model(&self, name: &str) -> ScaffoldResult<PathBuf> {
        validate_model_name(name)?;
        let destination = self.models_dir.join(format!("{}.rs", name));
        if destination.exists() {
            return Err(ScaffoldError::AlreadyExists(destination));
        }
        write_file(&destination, &model_template(name))?;
        Ok(destination)
    }

    /// Write a new timestamped migration source file.
    pub fn create_migration(&self, name: &str, at: DateTime<Utc>) -> ScaffoldResult<PathBuf> {
        let destination = self.migrations_dir.join(migration_filename(name, at));
        if destination.exists() {
            return Err(ScaffoldError::AlreadyExists(destination));
        }
        write_file(&destination, &migration_template())?;
        Ok(destination)
    }
}

impl fmt::Debug for Scaffolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scaffolder")
            .field("models_dir", &self.models_dir)
            .field("migrations_dir", &self.migrations_dir)
            .finish()
    }
}

fn write_file(path: &Path, contents: &str) -> ScaffoldResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    Ok(())
}
