//! mimicdb - an in-memory relational engine for deterministic tests
//!
//! Reproduces the observable behavior of a schema-driven record store —
//! typed fields, primary keys, uniqueness and nullability, auto-increment
//! identifiers, composable query predicates, ordering and paging, and
//! relationships between collections — without any real database or
//! network connection. Everything runs synchronously in memory, so code
//! written against a relational-mapping contract can be exercised
//! deterministically.
//!
//! ```
//! use mimicdb::{DataType, FieldDef, Model, Query, Where};
//!
//! let items = Model::new(
//!     "Item",
//!     vec![
//!         (
//!             "id".into(),
//!             FieldDef::new(DataType::INTEGER).primary_key().auto_increment(),
//!         ),
//!         ("foo".into(), FieldDef::new(DataType::STRING)),
//!     ],
//!     2, // seed two deterministic fixture rows
//! )
//! .unwrap();
//!
//! let row = items
//!     .find_one(&Query::filter(Where::eq("foo", "foo 2")))
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(row.get("id"), 2.into());
//! ```
//!
//! Not goals: persistence across restarts, multi-writer isolation,
//! transactional rollback, query planning, SQL compatibility. The engine
//! is correct and introspectable, not fast or durable.

pub mod association;
pub mod cli;
pub mod client;
pub mod error;
pub mod migration;
pub mod model;
pub mod predicate;
pub mod query;
pub mod record;
pub mod registry;
pub mod scaffold;
pub mod schema;
pub mod store;
pub mod types;
pub mod value;

pub use association::{Association, AssociationKind, AssociationOptions, ManyToManyOptions};
pub use client::{ClientStub, TransactionState, TransactionStub};
pub use error::{Error, Result};
pub use migration::{Migration, MigrationContext};
pub use model::{Model, ModelRef};
pub use predicate::{Op, Operand, Where};
pub use query::{Direction, Query, RecordIter};
pub use record::{Record, Related, TargetRef};
pub use registry::{Database, ModelDef};
pub use scaffold::{ScaffoldError, Scaffolder};
pub use schema::{DefaultValue, Field, FieldDef, Schema};
pub use store::{RowId, StoreCall};
pub use types::DataType;
pub use value::{IntoValues, Value, ValueMap};
