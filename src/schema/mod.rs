//! Schema compilation
//!
//! A schema is compiled once from a declarative field map and is immutable
//! afterwards from the caller's point of view; only association resolution
//! may append synthesized foreign-key fields. Compilation normalizes the
//! constraint flags:
//!
//! - at most one field is the primary key
//! - the primary key is always unique and never nullable
//! - auto-increment is only honored on a numeric primary key
//! - every other field is nullable unless declared otherwise
//!
//! Field order is declaration order and is observable: saves validate in
//! it and the seeder fills in it.

use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::types::DataType;
use crate::value::Value;

/// A declared default: either a literal or a zero-argument producer
/// (invoked at every save that needs it).
#[derive(Clone)]
pub enum DefaultValue {
    /// Fixed value substituted as-is
    Literal(Value),
    /// Producer invoked per save, e.g. [`crate::types::now`]
    Producer(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl DefaultValue {
    /// Materialize the default
    pub fn resolve(&self) -> Value {
        match self {
            DefaultValue::Literal(value) => value.clone(),
            DefaultValue::Producer(f) => f(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Literal(value) => write!(f, "Literal({:?})", value),
            DefaultValue::Producer(_) => write!(f, "Producer(..)"),
        }
    }
}

/// One field's declaration
#[derive(Debug, Clone)]
pub struct FieldDef {
    /// The field's type, owning its coercion rule
    pub data_type: DataType,
    /// Whether this field is the schema's primary key
    pub primary_key: bool,
    /// Assign the next counter value on insert (numeric primary keys only)
    pub auto_increment: bool,
    /// No two rows may share a value in this field
    pub unique: bool,
    /// Whether null survives a save
    pub allow_null: bool,
    /// Substituted when the field is unset at save time
    pub default_value: Option<DefaultValue>,
}

impl FieldDef {
    /// A plain nullable field of the given type
    pub fn new(data_type: DataType) -> Self {
        Self {
            data_type,
            primary_key: false,
            auto_increment: false,
            unique: false,
            allow_null: true,
            default_value: None,
        }
    }

    /// Mark as the primary key
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Request auto-increment; only effective on a numeric primary key
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Enforce uniqueness across rows
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Reject null at save time
    pub fn not_null(mut self) -> Self {
        self.allow_null = false;
        self
    }

    /// Default literal substituted when the field is unset
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(DefaultValue::Literal(value.into()));
        self
    }

    /// Default producer invoked when the field is unset
    pub fn default_fn(mut self, f: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        self.default_value = Some(DefaultValue::Producer(Arc::new(f)));
        self
    }
}

/// A named field inside a compiled schema
#[derive(Debug, Clone)]
pub struct Field {
    /// Field name, unique within the schema
    pub name: String,
    /// Normalized declaration
    pub def: FieldDef,
}

/// A compiled, name-unique, ordered field map
#[derive(Debug, Clone)]
pub struct Schema {
    name: String,
    fields: Vec<Field>,
    primary: Option<String>,
}

impl Schema {
    /// Compile a declarative field map into a schema.
    ///
    /// Fails with `InvalidSchema` on duplicate field names, more than one
    /// primary key, or an enum with no allowed values.
    pub fn compile(name: impl Into<String>, fields: Vec<(String, FieldDef)>) -> Result<Schema> {
        let name = name.into();
        let mut compiled: Vec<Field> = Vec::with_capacity(fields.len());
        let mut primary: Option<String> = None;

        for (field_name, mut def) in fields {
            if compiled.iter().any(|f| f.name == field_name) {
                return Err(Error::invalid_schema(format!(
                    "duplicate field \"{}\" in \"{}\"",
                    field_name, name
                )));
            }
            validate_type(&field_name, &def.data_type)?;

            if def.primary_key {
                if let Some(existing) = &primary {
                    return Err(Error::invalid_schema(format!(
                        "\"{}\" declares more than one primary key (\"{}\" and \"{}\")",
                        name, existing, field_name
                    )));
                }
                primary = Some(field_name.clone());
                def.unique = true;
                def.allow_null = false;
            }
            def.auto_increment =
                def.auto_increment && def.primary_key && def.data_type.is_numeric();

            compiled.push(Field {
                name: field_name,
                def,
            });
        }

        Ok(Schema {
            name,
            fields: compiled,
            primary,
        })
    }

    /// The schema's name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All fields in declaration order
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Look up one field's declaration
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.def)
    }

    /// Whether the schema declares the field
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    /// Name of the primary-key field, if one was declared
    pub fn primary_field(&self) -> Option<&str> {
        self.primary.as_deref()
    }

    /// Append a synthesized field (association foreign keys).
    ///
    /// Returns false when the field already exists, in which case the
    /// existing declaration wins.
    pub(crate) fn add_field(&mut self, name: impl Into<String>, def: FieldDef) -> bool {
        let name = name.into();
        if self.has_field(&name) {
            return false;
        }
        self.fields.push(Field { name, def });
        true
    }
}

fn validate_type(field_name: &str, data_type: &DataType) -> Result<()> {
    match data_type {
        DataType::Enum(allowed) if allowed.is_empty() => Err(Error::invalid_schema(format!(
            "enum field \"{}\" declares no allowed values",
            field_name
        ))),
        DataType::Array(element) | DataType::Range(element) => validate_type(field_name, element),
        _ => Ok(()),
    }
}
