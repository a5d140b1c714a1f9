//! Query semantics tests
//!
//! Covers the read surface end to end:
//! - condition trees: implicit equality, membership, operator bundles,
//!   logical nodes, column comparison, the JSON form
//! - pattern matching (like family, regexp)
//! - ordering with stable multi-key tie-breaks
//! - offset/limit paging consistent with the full ordered result
//! - projection (attributes) and the unknown-is-unchanged policy
//! - eager relationship inclusion
//! - eager failure for unknown fields and unsupported operators

use mimicdb::{
    AssociationOptions, Direction, Error, FieldDef, DataType, Database, Model, ModelDef, Query,
    Value, Where,
};
use serde_json::json;

// =============================================================================
// Helper Functions
// =============================================================================

fn people() -> Model {
    let model = Model::new(
        "Person",
        vec![
            (
                "id".into(),
                FieldDef::new(DataType::INTEGER)
                    .primary_key()
                    .auto_increment(),
            ),
            ("name".into(), FieldDef::new(DataType::STRING)),
            ("alias".into(), FieldDef::new(DataType::STRING)),
            ("age".into(), FieldDef::new(DataType::NUMBER)),
            ("city".into(), FieldDef::new(DataType::STRING)),
        ],
        0,
    )
    .unwrap();

    for (name, alias, age, city) in [
        ("Ada", "Ada", 36.0, "London"),
        ("Grace", "Amazing Grace", 45.0, "Arlington"),
        ("Alan", "Alan", 41.0, "London"),
        ("Edsger", "EWD", 72.0, "Austin"),
    ] {
        model
            .create(json!({"name": name, "alias": alias, "age": age, "city": city}))
            .unwrap();
    }
    model
}

fn names(records: &[mimicdb::Record]) -> Vec<Value> {
    records.iter().map(|r| r.get("name")).collect()
}

// =============================================================================
// Filtering
// =============================================================================

#[test]
fn test_empty_where_returns_every_row() {
    let model = people();
    let rows = model.find_all(&Query::new()).unwrap();
    assert_eq!(rows.len(), 4);
}

#[test]
fn test_implicit_equality_and_membership() {
    let model = people();

    let rows = model
        .find_all(&Query::filter(Where::eq("city", "London")))
        .unwrap();
    assert_eq!(names(&rows), vec!["Ada".into(), "Alan".into()]);

    let rows = model
        .find_all(&Query::filter(Where::is_in("name", ["Ada", "Edsger"])))
        .unwrap();
    assert_eq!(names(&rows), vec!["Ada".into(), "Edsger".into()]);
}

#[test]
fn test_conjunction_of_top_level_conditions() {
    let model = people();

    let rows = model
        .find_all(&Query::filter(Where::and([
            Where::eq("city", "London"),
            Where::gt("age", 40),
        ])))
        .unwrap();
    assert_eq!(names(&rows), vec!["Alan".into()]);
}

#[test]
fn test_ordering_operators_and_between() {
    let model = people();

    let rows = model
        .find_all(&Query::filter(Where::between("age", 41, 45)))
        .unwrap();
    assert_eq!(names(&rows), vec!["Grace".into(), "Alan".into()]);

    let rows = model
        .find_all(&Query::filter(Where::not_between("age", 36, 45)))
        .unwrap();
    assert_eq!(names(&rows), vec!["Edsger".into()]);

    let rows = model
        .find_all(&Query::filter(Where::lte("age", 36)))
        .unwrap();
    assert_eq!(names(&rows), vec!["Ada".into()]);
}

#[test]
fn test_logical_or_and_not() {
    let model = people();

    let rows = model
        .find_all(&Query::filter(Where::or([
            Where::eq("name", "Ada"),
            Where::eq("name", "Edsger"),
        ])))
        .unwrap();
    assert_eq!(names(&rows), vec!["Ada".into(), "Edsger".into()]);

    let rows = model
        .find_all(&Query::filter(Where::not(Where::eq("city", "London"))))
        .unwrap();
    assert_eq!(names(&rows), vec!["Grace".into(), "Edsger".into()]);
}

#[test]
fn test_pattern_matching() {
    let model = Model::new(
        "Item",
        vec![("foo".into(), FieldDef::new(DataType::STRING))],
        0,
    )
    .unwrap();
    for foo in ["bar", "baz", "123"] {
        model.create(json!({"foo": foo})).unwrap();
    }

    let rows = model
        .find_all(&Query::filter(Where::like("foo", "%a%")))
        .unwrap();
    let values: Vec<Value> = rows.iter().map(|r| r.get("foo")).collect();
    assert_eq!(values, vec!["bar".into(), "baz".into()]);

    let rows = model
        .find_all(&Query::filter(Where::not_like("foo", "%a%")))
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("foo"), Value::Text("123".into()));

    let rows = model
        .find_all(&Query::filter(Where::starts_with("foo", "ba")))
        .unwrap();
    assert_eq!(rows.len(), 2);

    let rows = model
        .find_all(&Query::filter(Where::ilike("foo", "BA_")))
        .unwrap();
    assert_eq!(rows.len(), 2);

    let rows = model
        .find_all(&Query::filter(Where::regexp("foo", "^[0-9]+$")))
        .unwrap();
    assert_eq!(rows.len(), 1);
}

#[test]
fn test_null_equality_is_a_presence_test() {
    let model = Model::new(
        "Item",
        vec![("foo".into(), FieldDef::new(DataType::STRING))],
        0,
    )
    .unwrap();
    model.create(json!({"foo": "set"})).unwrap();
    model.create(json!({})).unwrap();

    let rows = model
        .find_all(&Query::filter(Where::eq("foo", Value::Null)))
        .unwrap();
    assert_eq!(rows.len(), 1);

    let rows = model
        .find_all(&Query::filter(Where::ne("foo", Value::Null)))
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("foo"), Value::Text("set".into()));
}

#[test]
fn test_same_row_column_comparison() {
    let model = people();

    let rows = model
        .find_all(&Query::filter(Where::col_eq("name", "alias")))
        .unwrap();
    assert_eq!(names(&rows), vec!["Ada".into(), "Alan".into()]);
}

#[test]
fn test_where_constants_are_coerced_through_field_types() {
    let model = people();

    // Text constant against the numeric field.
    let rows = model
        .find_all(&Query::filter(Where::eq("age", "36")))
        .unwrap();
    assert_eq!(names(&rows), vec!["Ada".into()]);
}

// =============================================================================
// Failure modes
// =============================================================================

#[test]
fn test_unknown_field_fails_even_on_an_empty_store() {
    let model = Model::new(
        "Item",
        vec![("foo".into(), FieldDef::new(DataType::STRING))],
        0,
    )
    .unwrap();

    let err = model
        .find_all(&Query::filter(Where::eq("nope", 1)))
        .unwrap_err();
    assert_eq!(err, Error::unknown_field("nope"));
}

#[test]
fn test_uncoercible_constant_fails_the_query() {
    let model = people();
    let err = model
        .find_all(&Query::filter(Where::eq("age", "forty")))
        .unwrap_err();
    assert!(matches!(err, Error::TypeMismatch { .. }));
}

#[test]
fn test_unsupported_operators_fail_loudly() {
    let model = people();
    let err = model
        .find_all(&Query::filter(Where::overlap("name", Value::Array(vec![]))))
        .unwrap_err();
    assert_eq!(err, Error::unsupported_operator("overlap"));
}

// =============================================================================
// JSON condition form
// =============================================================================

#[test]
fn test_json_condition_tree_round_trip() {
    let model = people();

    let where_ = Where::from_json(&json!({
        "or": [
            {"city": "Austin"},
            {"age": {"between": [36, 41]}, "city": "London"}
        ]
    }))
    .unwrap();

    let rows = model.find_all(&Query::filter(where_)).unwrap();
    assert_eq!(
        names(&rows),
        vec!["Ada".into(), "Alan".into(), "Edsger".into()]
    );
}

#[test]
fn test_json_condition_rejects_unknown_operators() {
    let err = Where::from_json(&json!({"age": {"approx": 40}})).unwrap_err();
    assert_eq!(err, Error::unsupported_operator("approx"));
}

// =============================================================================
// Ordering and paging
// =============================================================================

#[test]
fn test_order_by_single_key() {
    let model = people();

    let rows = model
        .find_all(&Query::new().order_by("age", Direction::Desc))
        .unwrap();
    assert_eq!(
        names(&rows),
        vec![
            "Edsger".into(),
            "Grace".into(),
            "Alan".into(),
            "Ada".into()
        ]
    );
}

#[test]
fn test_order_ties_fall_through_to_the_next_key() {
    let model = people();

    let rows = model
        .find_all(
            &Query::new()
                .order_by("city", Direction::Asc)
                .order_by("age", Direction::Desc),
        )
        .unwrap();
    assert_eq!(
        names(&rows),
        vec![
            "Grace".into(),
            "Edsger".into(),
            "Alan".into(),
            "Ada".into()
        ]
    );
}

#[test]
fn test_order_is_stable_for_full_ties() {
    let model = people();

    // Two rows tie on city; insertion order breaks the tie.
    let rows = model
        .find_all(&Query::new().order_by("city", Direction::Desc))
        .unwrap();
    assert_eq!(
        names(&rows),
        vec![
            "Ada".into(),
            "Alan".into(),
            "Edsger".into(),
            "Grace".into()
        ]
    );
}

#[test]
fn test_limit_and_offset_slice_the_ordered_result() {
    let model = people();
    let ordered = Query::new().order_by("age", Direction::Asc);

    let all = model.find_all(&ordered).unwrap();
    let page = model
        .find_all(&ordered.clone().offset(1).limit(2))
        .unwrap();

    assert_eq!(names(&page), names(&all[1..3]));
}

#[test]
fn test_limit_zero_means_unbounded() {
    let model = people();
    let rows = model.find_all(&Query::new().limit(0)).unwrap();
    assert_eq!(rows.len(), 4);
}

#[test]
fn test_offset_beyond_the_result_yields_nothing() {
    let model = people();
    let rows = model.find_all(&Query::new().offset(10)).unwrap();
    assert!(rows.is_empty());
}

#[test]
fn test_find_one_takes_the_first_match_in_store_order() {
    let model = people();
    let row = model
        .find_one(&Query::filter(Where::eq("city", "London")))
        .unwrap()
        .unwrap();
    assert_eq!(row.get("name"), Value::Text("Ada".into()));
}

#[test]
fn test_lazy_selection_can_be_restarted() {
    let model = people();
    let query = Query::filter(Where::eq("city", "London"));

    let mut first = model.select(&query).unwrap();
    assert_eq!(first.next().unwrap().get("name"), Value::Text("Ada".into()));

    // A fresh selection starts over.
    let mut second = model.select(&query).unwrap();
    assert_eq!(
        second.next().unwrap().get("name"),
        Value::Text("Ada".into())
    );
}

// =============================================================================
// Projection
// =============================================================================

#[test]
fn test_attributes_project_the_materialized_fields() {
    let model = people();

    let rows = model
        .find_all(&Query::new().attributes(["id", "name"]))
        .unwrap();
    let row = &rows[0];

    assert_eq!(row.get("name"), Value::Text("Ada".into()));
    assert_eq!(row.get("age"), Value::Null);
    assert!(!row.get_all().contains_key("age"));
}

#[test]
fn test_projected_out_fields_report_unchanged() {
    let model = people();

    let rows = model
        .find_all(&Query::new().attributes(["id", "name"]))
        .unwrap();
    // The excluded field genuinely differs from the row, but the
    // instance does not know it: unknown counts as unchanged.
    assert!(!rows[0].changed("age"));
    assert!(rows[0].changed_fields().is_empty());
}

#[test]
fn test_unknown_projection_field_fails() {
    let model = people();
    let err = model
        .find_all(&Query::new().attributes(["nope"]))
        .unwrap_err();
    assert_eq!(err, Error::unknown_field("nope"));
}

// =============================================================================
// Relationship inclusion
// =============================================================================

#[test]
fn test_include_materializes_the_relationship_at_query_time() {
    let db = Database::new();
    let owners = db
        .define(
            ModelDef::new("Owner")
                .field(
                    "id",
                    FieldDef::new(DataType::INTEGER).primary_key().auto_increment(),
                )
                .field("name", FieldDef::new(DataType::STRING)),
        )
        .unwrap();
    let items = db
        .define(
            ModelDef::new("Item")
                .field(
                    "id",
                    FieldDef::new(DataType::INTEGER).primary_key().auto_increment(),
                )
                .associate("Owner", |item, owner| {
                    item.belongs_to(owner, AssociationOptions::new())?;
                    Ok(())
                }),
        )
        .unwrap();

    let mut owner = owners.create(json!({"name": "Ada"})).unwrap();
    let item = items.create(json!({})).unwrap();
    drop(item);
    let mut item = items.find_one(&Query::new()).unwrap().unwrap();
    item.set_related("Owner", Some(&owners.find_one(&Query::new()).unwrap().unwrap()))
        .unwrap();

    let included = items
        .find_one(&Query::new().include("Owner"))
        .unwrap()
        .unwrap();

    // Destroying the owner afterwards does not unload the eager copy.
    owner.destroy();
    let related = included.related("Owner").unwrap().one().unwrap();
    assert_eq!(related.get("name"), Value::Text("Ada".into()));

    // A lazily resolved instance sees the live (now empty) store.
    let lazy = items.find_one(&Query::new()).unwrap().unwrap();
    assert!(lazy.related("Owner").unwrap().one().is_none());
}

#[test]
fn test_unknown_include_alias_fails() {
    let model = people();
    let err = model
        .find_all(&Query::new().include("Nope"))
        .unwrap_err();
    assert_eq!(err, Error::unknown_association("Nope"));
}
