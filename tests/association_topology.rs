//! Association topology tests
//!
//! Covers relationship declaration and the accessor operations bound to a
//! record instance:
//! - belongsTo: foreign key on the source, get/set/create
//! - hasOne: foreign key on the target, single-holder invariant
//! - hasMany: get/count/has/set/add/remove/create
//! - belongsToMany: implicit join model synthesis, one join row per link,
//!   membership in insertion order
//! - pending associations resolved in declaration order when the target
//!   model appears, observable until then

use mimicdb::{
    AssociationOptions, DataType, Database, Error, FieldDef, ManyToManyOptions, Model, ModelDef,
    Query, TargetRef, Value, Where,
};
use serde_json::json;

// =============================================================================
// Helper Functions
// =============================================================================

fn id_field() -> FieldDef {
    FieldDef::new(DataType::INTEGER)
        .primary_key()
        .auto_increment()
}

fn define_plain(db: &Database, name: &str) -> Model {
    db.define(
        ModelDef::new(name)
            .field("id", id_field())
            .field("name", FieldDef::new(DataType::STRING)),
    )
    .unwrap()
}

// =============================================================================
// belongsTo
// =============================================================================

#[test]
fn test_belongs_to_derives_the_foreign_key_on_the_source() {
    let db = Database::new();
    let owners = define_plain(&db, "Owner");
    let items = define_plain(&db, "Item");

    items.belongs_to(&owners, AssociationOptions::new()).unwrap();

    assert!(items.schema().has_field("OwnerId"));
    assert!(!owners.schema().has_field("OwnerId"));
}

#[test]
fn test_belongs_to_get_set_and_clear() {
    let db = Database::new();
    let owners = define_plain(&db, "Owner");
    let items = define_plain(&db, "Item");
    items.belongs_to(&owners, AssociationOptions::new()).unwrap();

    let owner = owners.create(json!({"name": "Ada"})).unwrap();
    let mut item = items.create(json!({})).unwrap();

    assert!(item.related("Owner").unwrap().one().is_none());

    item.set_related("Owner", Some(&owner)).unwrap();
    assert_eq!(item.get("OwnerId"), owner.get("id"));
    let linked = item.related("Owner").unwrap().one().unwrap();
    assert!(linked.equals(&owner));

    item.set_related("Owner", None).unwrap();
    assert_eq!(item.get("OwnerId"), Value::Null);
    assert!(item.related("Owner").unwrap().one().is_none());
}

#[test]
fn test_belongs_to_create_links_the_new_target() {
    let db = Database::new();
    let owners = define_plain(&db, "Owner");
    let items = define_plain(&db, "Item");
    items.belongs_to(&owners, AssociationOptions::new()).unwrap();

    let mut item = items.create(json!({})).unwrap();
    let owner = item.create_related("Owner", json!({"name": "Ada"})).unwrap();

    assert_eq!(owners.row_count(), 1);
    assert_eq!(item.get("OwnerId"), owner.get("id"));
}

#[test]
fn test_belongs_to_honors_explicit_keys_and_alias() {
    let db = Database::new();
    let owners = db
        .define(
            ModelDef::new("Owner")
                .field("id", id_field())
                .field("code", FieldDef::new(DataType::STRING).unique()),
        )
        .unwrap();
    let items = define_plain(&db, "Item");

    items
        .belongs_to(
            &owners,
            AssociationOptions::new()
                .alias("holder")
                .foreign_key("HolderCode")
                .target_key("code"),
        )
        .unwrap();

    let owner = owners.create(json!({"code": "A-1"})).unwrap();
    let mut item = items.create(json!({})).unwrap();
    item.set_related("holder", Some(&owner)).unwrap();

    assert_eq!(item.get("HolderCode"), Value::Text("A-1".into()));
    assert!(item
        .related("holder")
        .unwrap()
        .one()
        .unwrap()
        .equals(&owner));
}

// =============================================================================
// hasOne
// =============================================================================

#[test]
fn test_has_one_derives_the_foreign_key_on_the_target() {
    let db = Database::new();
    let users = define_plain(&db, "User");
    let profiles = define_plain(&db, "Profile");

    users.has_one(&profiles, AssociationOptions::new()).unwrap();

    assert!(profiles.schema().has_field("UserId"));
    assert!(!users.schema().has_field("UserId"));
}

#[test]
fn test_has_one_set_moves_the_single_holder() {
    let db = Database::new();
    let users = define_plain(&db, "User");
    let profiles = define_plain(&db, "Profile");
    users.has_one(&profiles, AssociationOptions::new()).unwrap();

    let mut user = users.create(json!({})).unwrap();
    let first = profiles.create(json!({"name": "first"})).unwrap();
    let second = profiles.create(json!({"name": "second"})).unwrap();

    user.set_related("Profile", Some(&first)).unwrap();
    assert!(user
        .related("Profile")
        .unwrap()
        .one()
        .unwrap()
        .equals(&first));

    user.set_related("Profile", Some(&second)).unwrap();
    let holder = user.related("Profile").unwrap().one().unwrap();
    assert!(holder.equals(&second));

    // The previous holder was unlinked, not duplicated.
    let orphan = profiles
        .find_one(&Query::filter(Where::eq("name", "first")))
        .unwrap()
        .unwrap();
    assert_eq!(orphan.get("UserId"), Value::Null);
}

#[test]
fn test_has_one_create_unlinks_the_existing_holder() {
    let db = Database::new();
    let users = define_plain(&db, "User");
    let profiles = define_plain(&db, "Profile");
    users.has_one(&profiles, AssociationOptions::new()).unwrap();

    let mut user = users.create(json!({})).unwrap();
    user.create_related("Profile", json!({"name": "first"}))
        .unwrap();
    user.create_related("Profile", json!({"name": "second"}))
        .unwrap();

    let holders = profiles
        .find_all(&Query::filter(Where::ne("UserId", Value::Null)))
        .unwrap();
    assert_eq!(holders.len(), 1);
    assert_eq!(holders[0].get("name"), Value::Text("second".into()));
}

// =============================================================================
// hasMany
// =============================================================================

#[test]
fn test_has_many_accessor_set() {
    let db = Database::new();
    let owners = define_plain(&db, "Owner");
    let items = define_plain(&db, "Item");
    owners.has_many(&items, AssociationOptions::new()).unwrap();

    let mut owner = owners.create(json!({})).unwrap();
    let a = items.create(json!({"name": "a"})).unwrap();
    let b = items.create(json!({"name": "b"})).unwrap();

    assert_eq!(owner.count_related("Items").unwrap(), 0);

    owner.add_related("Items", &a).unwrap();
    owner.add_related("Items", &b).unwrap();
    assert_eq!(owner.count_related("Items").unwrap(), 2);
    assert!(owner
        .has_related("Items", &[TargetRef::Record(&a), TargetRef::Record(&b)])
        .unwrap());

    owner.remove_related("Items", &a).unwrap();
    assert_eq!(owner.count_related("Items").unwrap(), 1);
    assert!(!owner.has_related("Items", &[TargetRef::Record(&a)]).unwrap());

    let created = owner
        .create_related("Items", json!({"name": "c"}))
        .unwrap();
    assert_eq!(created.get("OwnerId"), owner.get("id"));
    assert_eq!(owner.count_related("Items").unwrap(), 2);
}

#[test]
fn test_has_many_set_replaces_the_membership() {
    let db = Database::new();
    let owners = define_plain(&db, "Owner");
    let items = define_plain(&db, "Item");
    owners.has_many(&items, AssociationOptions::new()).unwrap();

    let mut owner = owners.create(json!({})).unwrap();
    let a = items.create(json!({"name": "a"})).unwrap();
    let b = items.create(json!({"name": "b"})).unwrap();
    let c = items.create(json!({"name": "c"})).unwrap();

    owner
        .set_related_many("Items", &[TargetRef::Record(&a), TargetRef::Record(&b)])
        .unwrap();
    assert_eq!(owner.count_related("Items").unwrap(), 2);

    owner
        .set_related_many("Items", &[TargetRef::Record(&c)])
        .unwrap();
    let linked = owner.related("Items").unwrap().many();
    assert_eq!(linked.len(), 1);
    assert!(linked[0].equals(&c));

    owner.set_related_many("Items", &[]).unwrap();
    assert_eq!(owner.count_related("Items").unwrap(), 0);
}

#[test]
fn test_has_many_membership_accepts_raw_keys() {
    let db = Database::new();
    let owners = define_plain(&db, "Owner");
    let items = define_plain(&db, "Item");
    owners.has_many(&items, AssociationOptions::new()).unwrap();

    let mut owner = owners.create(json!({})).unwrap();
    let item = items.create(json!({"name": "a"})).unwrap();
    owner.add_related("Items", &item).unwrap();

    assert!(owner
        .has_related("Items", &[TargetRef::Key(item.get("id"))])
        .unwrap());
    // Keys coerce through the target key's type.
    assert!(owner
        .has_related("Items", &[TargetRef::Key("1".into())])
        .unwrap());

    owner
        .remove_related("Items", TargetRef::Key(item.get("id")))
        .unwrap();
    assert_eq!(owner.count_related("Items").unwrap(), 0);
}

// =============================================================================
// belongsToMany
// =============================================================================

#[test]
fn test_belongs_to_many_synthesizes_the_join_model() {
    let db = Database::new();
    let a = define_plain(&db, "A");
    let b = define_plain(&db, "B");

    a.belongs_to_many(&b, ManyToManyOptions::new()).unwrap();

    let join = db.model("AB").expect("join model synthesized");
    assert!(join.schema().has_field("AId"));
    assert!(join.schema().has_field("BId"));
    assert_eq!(join.schema().fields().len(), 2);
}

#[test]
fn test_belongs_to_many_add_inserts_exactly_one_join_row() {
    let db = Database::new();
    let a_model = define_plain(&db, "A");
    let b_model = define_plain(&db, "B");
    a_model
        .belongs_to_many(&b_model, ManyToManyOptions::new())
        .unwrap();
    let join = db.model("AB").unwrap();

    let mut a = a_model.create(json!({})).unwrap();
    let b = b_model.create(json!({})).unwrap();

    a.add_related("Bs", &b).unwrap();
    assert_eq!(join.row_count(), 1);

    // Linking the same pair twice stays one row.
    a.add_related("Bs", &b).unwrap();
    assert_eq!(join.row_count(), 1);

    a.remove_related("Bs", &b).unwrap();
    assert_eq!(join.row_count(), 0);
    assert_eq!(a.count_related("Bs").unwrap(), 0);
}

#[test]
fn test_belongs_to_many_membership_in_insertion_order() {
    let db = Database::new();
    let a_model = define_plain(&db, "A");
    let b_model = define_plain(&db, "B");
    a_model
        .belongs_to_many(&b_model, ManyToManyOptions::new())
        .unwrap();

    let mut a = a_model.create(json!({})).unwrap();
    let b1 = b_model.create(json!({"name": "one"})).unwrap();
    let b2 = b_model.create(json!({"name": "two"})).unwrap();
    let b3 = b_model.create(json!({"name": "three"})).unwrap();

    a.add_related("Bs", &b2).unwrap();
    a.add_related("Bs", &b1).unwrap();
    a.add_related("Bs", &b3).unwrap();

    let linked = a.related("Bs").unwrap().many();
    let names: Vec<Value> = linked.iter().map(|r| r.get("name")).collect();
    assert_eq!(names, vec!["two".into(), "one".into(), "three".into()]);

    assert!(a
        .has_related("Bs", &[TargetRef::Record(&b1), TargetRef::Record(&b3)])
        .unwrap());

    a.set_related_many("Bs", &[TargetRef::Record(&b1)]).unwrap();
    assert_eq!(a.count_related("Bs").unwrap(), 1);
}

#[test]
fn test_belongs_to_many_create_links_through_the_join() {
    let db = Database::new();
    let a_model = define_plain(&db, "A");
    let b_model = define_plain(&db, "B");
    a_model
        .belongs_to_many(&b_model, ManyToManyOptions::new())
        .unwrap();

    let mut a = a_model.create(json!({})).unwrap();
    let created = a.create_related("Bs", json!({"name": "new"})).unwrap();

    assert_eq!(b_model.row_count(), 1);
    assert_eq!(db.model("AB").unwrap().row_count(), 1);
    assert!(a
        .has_related("Bs", &[TargetRef::Record(&created)])
        .unwrap());
}

#[test]
fn test_belongs_to_many_reuses_a_declared_through_model() {
    let db = Database::new();
    let a_model = define_plain(&db, "A");
    let b_model = define_plain(&db, "B");
    let membership = db
        .define(ModelDef::new("Membership").field("since", FieldDef::new(DataType::DATE)))
        .unwrap();

    a_model
        .belongs_to_many(&b_model, ManyToManyOptions::new().through("Membership"))
        .unwrap();

    // The declared join model gained both key fields alongside its own.
    assert!(membership.schema().has_field("AId"));
    assert!(membership.schema().has_field("BId"));
    assert!(membership.schema().has_field("since"));

    let mut a = a_model.create(json!({})).unwrap();
    let b = b_model.create(json!({})).unwrap();
    a.add_related("Bs", &b).unwrap();
    assert_eq!(membership.row_count(), 1);
}

#[test]
fn test_belongs_to_many_requires_a_registry() {
    let standalone_a = Model::new("A", vec![("id".into(), id_field())], 0).unwrap();
    let standalone_b = Model::new("B", vec![("id".into(), id_field())], 0).unwrap();

    let err = standalone_a
        .belongs_to_many(&standalone_b, ManyToManyOptions::new())
        .unwrap_err();
    assert!(matches!(err, Error::InvalidSchema { .. }));
}

// =============================================================================
// Pending associations
// =============================================================================

#[test]
fn test_associations_wait_for_their_target_model() {
    let db = Database::new();
    db.define(
        ModelDef::new("Item")
            .field("id", id_field())
            .associate("Owner", |item, owner| {
                item.belongs_to(owner, AssociationOptions::new())?;
                Ok(())
            }),
    )
    .unwrap();

    // Target not defined yet: the edge is pending and observable.
    let items = db.model("Item").unwrap();
    assert!(items.association("Owner").is_none());
    assert_eq!(
        db.pending_associations(),
        vec![("Item".to_string(), "Owner".to_string())]
    );

    define_plain(&db, "Owner");

    assert!(items.association("Owner").is_some());
    assert!(db.pending_associations().is_empty());
    assert!(items.schema().has_field("OwnerId"));
}

#[test]
fn test_pending_associations_resolve_in_declaration_order() {
    let db = Database::new();
    db.define(
        ModelDef::new("Item")
            .field("id", id_field())
            .associate("Owner", |item, owner| {
                item.belongs_to(owner, AssociationOptions::new().alias("first"))?;
                Ok(())
            })
            .associate("Owner", |item, owner| {
                item.belongs_to(owner, AssociationOptions::new().alias("second"))?;
                Ok(())
            }),
    )
    .unwrap();
    define_plain(&db, "Owner");

    let aliases: Vec<String> = db
        .model("Item")
        .unwrap()
        .associations()
        .iter()
        .map(|a| a.alias.clone())
        .collect();
    assert_eq!(aliases, vec!["first", "second"]);
}

#[test]
fn test_unresolvable_associations_stay_pending_not_dropped() {
    let db = Database::new();
    db.define(
        ModelDef::new("Item")
            .field("id", id_field())
            .associate("Nowhere", |item, nowhere| {
                item.belongs_to(nowhere, AssociationOptions::new())?;
                Ok(())
            }),
    )
    .unwrap();
    define_plain(&db, "Owner");

    assert_eq!(
        db.pending_associations(),
        vec![("Item".to_string(), "Nowhere".to_string())]
    );
}

#[test]
fn test_duplicate_alias_is_rejected() {
    let db = Database::new();
    let owners = define_plain(&db, "Owner");
    let items = define_plain(&db, "Item");

    items.belongs_to(&owners, AssociationOptions::new()).unwrap();
    let err = items
        .belongs_to(&owners, AssociationOptions::new())
        .unwrap_err();
    assert!(matches!(err, Error::InvalidSchema { .. }));
}

#[test]
fn test_to_one_and_to_many_accessor_arity_is_enforced() {
    let db = Database::new();
    let owners = define_plain(&db, "Owner");
    let items = define_plain(&db, "Item");
    items.belongs_to(&owners, AssociationOptions::new()).unwrap();
    owners.has_many(&items, AssociationOptions::new()).unwrap();

    let mut item = items.create(json!({})).unwrap();
    let mut owner = owners.create(json!({})).unwrap();

    assert!(matches!(
        item.set_related_many("Owner", &[]),
        Err(Error::InvalidSchema { .. })
    ));
    assert!(matches!(
        owner.set_related("Items", None),
        Err(Error::InvalidSchema { .. })
    ));
}
