//! Model registry
//!
//! A `Database` is a shared set of named models plus the pending
//! associations waiting for their target. An association declared before
//! its target model exists is queued, and the whole queue is retried — in
//! declaration order — every time a model is defined. An edge whose
//! target never appears stays pending forever; that is an observable
//! state, surfaced by [`Database::pending_associations`] for diagnostics,
//! not a silent drop.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::model::Model;
use crate::schema::FieldDef;

/// Association binder: invoked once source and target both exist
pub type Binder = Box<dyn Fn(&Model, &Model) -> Result<()> + Send + Sync>;

/// A queued association whose target model does not exist yet
struct PendingAssociation {
    source: String,
    target: String,
    binder: Binder,
}

pub(crate) struct DatabaseInner {
    models: RwLock<BTreeMap<String, Model>>,
    pending: RwLock<Vec<PendingAssociation>>,
}

/// Declarative model definition
///
/// The declaration-order field list becomes the compiled schema;
/// `associate` queues a binder per target model name, called by the
/// registry once the target exists.
pub struct ModelDef {
    name: String,
    fields: Vec<(String, FieldDef)>,
    seed_rows: usize,
    associations: Vec<(String, Binder)>,
}

impl ModelDef {
    /// Start a definition for the named model
    pub fn new(name: impl Into<String>) -> ModelDef {
        ModelDef {
            name: name.into(),
            fields: Vec::new(),
            seed_rows: 0,
            associations: Vec::new(),
        }
    }

    /// Append a field declaration
    pub fn field(mut self, name: impl Into<String>, def: FieldDef) -> ModelDef {
        self.fields.push((name.into(), def));
        self
    }

    /// Seed this many deterministic fixture rows at definition (and on
    /// every `mock_reset`)
    pub fn seed(mut self, rows: usize) -> ModelDef {
        self.seed_rows = rows;
        self
    }

    /// Declare an association with the named target model.
    ///
    /// The binder runs once the target exists, in declaration order, and
    /// typically calls `belongs_to`/`has_many`/... on the source.
    pub fn associate(
        mut self,
        target: impl Into<String>,
        binder: impl Fn(&Model, &Model) -> Result<()> + Send + Sync + 'static,
    ) -> ModelDef {
        self.associations.push((target.into(), Box::new(binder)));
        self
    }
}

/// A shared registry of named models
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

impl Database {
    /// An empty registry
    pub fn new() -> Database {
        Database {
            inner: Arc::new(DatabaseInner {
                models: RwLock::new(BTreeMap::new()),
                pending: RwLock::new(Vec::new()),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Arc<DatabaseInner>) -> Database {
        Database { inner }
    }

    /// Compile and register a model, then retry every pending
    /// association.
    pub fn define(&self, def: ModelDef) -> Result<Model> {
        let ModelDef {
            name,
            fields,
            seed_rows,
            associations,
        } = def;

        if self.inner.models.read().unwrap().contains_key(&name) {
            return Err(Error::invalid_schema(format!(
                "model \"{}\" is already defined",
                name
            )));
        }

        let model = Model::new(name.clone(), fields, seed_rows)?;
        model.attach_db(&self.inner);
        self.inner
            .models
            .write()
            .unwrap()
            .insert(name.clone(), model.clone());
        debug!(model = %name, "model defined");

        if !associations.is_empty() {
            let mut pending = self.inner.pending.write().unwrap();
            for (target, binder) in associations {
                pending.push(PendingAssociation {
                    source: name.clone(),
                    target,
                    binder,
                });
            }
        }
        self.resolve_pending()?;
        Ok(model)
    }

    /// Look up a model by name
    pub fn model(&self, name: &str) -> Option<Model> {
        self.inner.models.read().unwrap().get(name).cloned()
    }

    /// All registered model names
    pub fn model_names(&self) -> Vec<String> {
        self.inner.models.read().unwrap().keys().cloned().collect()
    }

    /// Remove a model from the registry.
    ///
    /// Pending associations that name it as a target stay queued: a model
    /// by that name may be defined again later.
    pub fn drop_model(&self, name: &str) -> bool {
        let removed = self.inner.models.write().unwrap().remove(name).is_some();
        if removed {
            debug!(model = %name, "model dropped");
        }
        removed
    }

    /// The `(source, target)` pairs of associations still waiting for
    /// their target model
    pub fn pending_associations(&self) -> Vec<(String, String)> {
        self.inner
            .pending
            .read()
            .unwrap()
            .iter()
            .map(|p| (p.source.clone(), p.target.clone()))
            .collect()
    }

    /// Run every queued binder whose source and target both exist.
    ///
    /// The queue is drained outside the lock: a binder may re-enter the
    /// registry (belongsToMany synthesizing its join model does). On a
    /// binder failure the already-resolved entries stay resolved, the
    /// unprocessed rest is re-queued, and the error propagates.
    fn resolve_pending(&self) -> Result<()> {
        let queue = std::mem::take(&mut *self.inner.pending.write().unwrap());
        let mut unresolved = Vec::new();
        let mut failure = None;

        let mut entries = queue.into_iter();
        for entry in entries.by_ref() {
            let pair = {
                let models = self.inner.models.read().unwrap();
                match (models.get(&entry.source), models.get(&entry.target)) {
                    (Some(source), Some(target)) => Some((source.clone(), target.clone())),
                    _ => None,
                }
            };
            match pair {
                Some((source, target)) => {
                    if let Err(err) = (entry.binder)(&source, &target) {
                        failure = Some(err);
                        break;
                    }
                    debug!(
                        source = %entry.source,
                        target = %entry.target,
                        "pending association resolved"
                    );
                }
                None => unresolved.push(entry),
            }
        }
        unresolved.extend(entries);

        if !unresolved.is_empty() {
            warn!(count = unresolved.len(), "associations still pending");
        }

        // Binders may have queued new entries meanwhile; keep the older
        // unresolved ones ahead of them to preserve declaration order.
        {
            let mut pending = self.inner.pending.write().unwrap();
            let newer = std::mem::take(&mut *pending);
            *pending = unresolved;
            pending.extend(newer);
        }

        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("models", &self.model_names())
            .field("pending", &self.pending_associations())
            .finish()
    }
}
