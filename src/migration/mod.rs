//! Migration boundary
//!
//! The engine exposes only the per-migration shape: an `up`/`down` pair
//! over a [`MigrationContext`]. Ordering migrations, storing applied
//! versions and transactional execution belong to an external runner and
//! are deliberately absent here; the context gives a migration exactly
//! what the in-memory engine can honor — creating and dropping record
//! collections on a registry.

use crate::error::{Error, Result};
use crate::model::Model;
use crate::registry::{Database, ModelDef};

/// One reversible migration step
pub trait Migration {
    /// Apply the step
    fn up(&self, ctx: &mut MigrationContext<'_>) -> Result<()>;

    /// Revert the step
    fn down(&self, ctx: &mut MigrationContext<'_>) -> Result<()>;
}

/// What a migration may do: collection-level DDL against a registry
pub struct MigrationContext<'a> {
    db: &'a Database,
}

impl<'a> MigrationContext<'a> {
    /// A context over the given registry
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Define a new record collection
    pub fn create_collection(&mut self, def: ModelDef) -> Result<Model> {
        self.db.define(def)
    }

    /// Drop an existing record collection
    pub fn drop_collection(&mut self, name: &str) -> Result<()> {
        if !self.db.drop_model(name) {
            return Err(Error::invalid_schema(format!(
                "no model \"{}\" to drop",
                name
            )));
        }
        Ok(())
    }

    /// The underlying registry, for reads
    pub fn database(&self) -> &Database {
        self.db
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldDef;
    use crate::types::DataType;

    struct AddOwners;

    impl Migration for AddOwners {
        fn up(&self, ctx: &mut MigrationContext<'_>) -> Result<()> {
            ctx.create_collection(
                ModelDef::new("Owner").field(
                    "id",
                    FieldDef::new(DataType::INTEGER)
                        .primary_key()
                        .auto_increment(),
                ),
            )?;
            Ok(())
        }

        fn down(&self, ctx: &mut MigrationContext<'_>) -> Result<()> {
            ctx.drop_collection("Owner")
        }
    }

    #[test]
    fn test_up_down_round_trip() {
        let db = Database::new();
        let migration = AddOwners;

        migration.up(&mut MigrationContext::new(&db)).unwrap();
        assert!(db.model("Owner").is_some());

        migration.down(&mut MigrationContext::new(&db)).unwrap();
        assert!(db.model("Owner").is_none());
    }

    #[test]
    fn test_dropping_a_missing_collection_fails() {
        let db = Database::new();
        let result = MigrationContext::new(&db).drop_collection("Nope");
        assert!(matches!(result, Err(Error::InvalidSchema { .. })));
    }
}
