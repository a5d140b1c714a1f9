//! Deterministic seeding
//!
//! `seed(n)` populates a store with position-derived fixtures so tests can
//! rely on exact row contents. For the 1-based position `i`:
//!
//! - auto-increment primary keys are left unset (the counter assigns them)
//! - numeric fields get `i`
//! - text fields get `"<field> <i>"`, except a text primary key, which
//!   gets the positional number coerced (`"1"`, `"2"`, ...)
//! - enum fields cycle through the allowed values
//! - array fields get the ascending 3-element sequence `[i, i+1, i+2]`
//!   coerced through the element type
//! - everything else gets the positional number coerced through the
//!   field's type (booleans become truthiness, dates epoch `i`)

use crate::error::Result;
use crate::schema::Schema;
use crate::types::DataType;
use crate::value::{Value, ValueMap};

/// Values for the `i`-th seeded row (1-based).
pub(crate) fn seed_values(schema: &Schema, i: u64) -> Result<ValueMap> {
    let mut values = ValueMap::new();
    for field in schema.fields() {
        if field.def.auto_increment {
            continue;
        }
        let value = match &field.def.data_type {
            DataType::Text if !field.def.primary_key => {
                Value::Text(format!("{} {}", field.name, i))
            }
            DataType::Enum(allowed) => {
                Value::Text(allowed[(i as usize - 1) % allowed.len()].clone())
            }
            DataType::Array(element) => {
                let items = (i..i + 3)
                    .map(|n| element.coerce(&Value::from(n)))
                    .collect::<Result<Vec<_>>>()?;
                Value::Array(items)
            }
            other => other.coerce(&Value::from(i))?,
        };
        values.insert(field.name.clone(), value);
    }
    Ok(values)
}
