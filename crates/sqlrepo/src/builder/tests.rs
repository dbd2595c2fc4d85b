use super::*;
use crate::adapter::default_adapter;
use crate::dialect::DatabaseType;
use crate::metadata::{ColumnKind, EntityDescriptor, FieldDescriptor};
use crate::value::Value;

const fn field(name: &'static str, kind: ColumnKind) -> FieldDescriptor {
    FieldDescriptor {
        field: name,
        column: name,
        kind,
    }
}

fn users() -> EntityMetadata {
    const FIELDS: &[FieldDescriptor] = &[
        field("id", ColumnKind::Key),
        field("name", ColumnKind::Writable),
        field("email", ColumnKind::Writable),
        field("created_at", ColumnKind::Computed),
    ];
    EntityMetadata::from_descriptor(&EntityDescriptor {
        type_name: "User",
        table: None,
        fields: FIELDS,
    })
}

fn memberships() -> EntityMetadata {
    const FIELDS: &[FieldDescriptor] = &[
        field("group_id", ColumnKind::ExplicitKey),
        field("user_id", ColumnKind::ExplicitKey),
        field("role", ColumnKind::Writable),
    ];
    EntityMetadata::from_descriptor(&EntityDescriptor {
        type_name: "Membership",
        table: None,
        fields: FIELDS,
    })
}

fn keyless() -> EntityMetadata {
    const FIELDS: &[FieldDescriptor] = &[field("label", ColumnKind::Writable)];
    EntityMetadata::from_descriptor(&EntityDescriptor {
        type_name: "AuditLog",
        table: Some("audit_log"),
        fields: FIELDS,
    })
}

#[test]
fn get_uses_single_key() {
    let adapter = default_adapter(DatabaseType::SqlServer);
    let b = SqlBuilder::new(adapter.as_ref());
    assert_eq!(
        b.build_get(&users()).unwrap(),
        "SELECT * FROM users WHERE [id] = @id"
    );
    assert!(b.build_get(&memberships()).unwrap_err().is_configuration());
    assert!(b.build_get(&keyless()).unwrap_err().is_configuration());
}

#[test]
fn get_list_joins_filter_names() {
    let adapter = default_adapter(DatabaseType::MySql);
    let b = SqlBuilder::new(adapter.as_ref());
    let filter = crate::params! { "name" => "a", "email" => "b" };
    assert_eq!(
        b.build_get_list(&users(), &filter, false).unwrap(),
        "SELECT * FROM users WHERE `name` = @name AND `email` = @email"
    );
    assert_eq!(
        b.build_get_list(&users(), &filter, true).unwrap(),
        "SELECT * FROM users WHERE `name` = @name OR `email` = @email"
    );
    assert!(
        b.build_get_list(&users(), &Params::new(), false)
            .unwrap_err()
            .is_configuration()
    );
}

#[test]
fn insert_skips_generated_key_and_computed() {
    let adapter = default_adapter(DatabaseType::Sqlite);
    let b = SqlBuilder::new(adapter.as_ref());
    assert_eq!(
        b.build_insert(&users()),
        ("\"name\", \"email\"".to_string(), "@name, @email".to_string())
    );
    let (cols, params) = b.build_insert(&memberships());
    assert_eq!(cols, "\"group_id\", \"user_id\", \"role\"");
    assert_eq!(params, "@group_id, @user_id, @role");
}

#[test]
fn oracle_insert_uses_colon_placeholders() {
    let adapter = default_adapter(DatabaseType::Oracle);
    let b = SqlBuilder::new(adapter.as_ref());
    assert_eq!(
        b.build_insert(&users()),
        ("name, email".to_string(), ":name, :email".to_string())
    );
}

#[test]
fn update_sets_writable_and_filters_on_identity() {
    let adapter = default_adapter(DatabaseType::PostgreSql);
    let b = SqlBuilder::new(adapter.as_ref());
    assert_eq!(
        b.build_update(&users()).unwrap(),
        "UPDATE users SET \"name\" = @name, \"email\" = @email WHERE \"id\" = @id"
    );
    assert_eq!(
        b.build_update(&memberships()).unwrap(),
        "UPDATE memberships SET \"role\" = @role WHERE \"group_id\" = @group_id AND \"user_id\" = @user_id"
    );
}

#[test]
fn keyless_update_and_delete_fail() {
    let adapter = default_adapter(DatabaseType::Sqlite);
    let b = SqlBuilder::new(adapter.as_ref());
    assert!(b.build_update(&keyless()).unwrap_err().is_configuration());
    assert!(b.build_delete(&keyless()).unwrap_err().is_configuration());
    assert_eq!(b.build_delete_all(&keyless()), "DELETE FROM audit_log");
}

#[test]
fn partial_update_defaults_to_identity_filter() {
    let adapter = default_adapter(DatabaseType::SqlServer);
    let b = SqlBuilder::new(adapter.as_ref());
    let data = crate::params! { "email" => "x@y", "id" => 3 };
    let (sql, params) = b.build_partial_update(&users(), &data, None, false).unwrap();
    assert_eq!(sql, "UPDATE users SET [email] = @email, [id] = @id WHERE [id] = @id");
    assert_eq!(params, data);
}

#[test]
fn partial_update_with_filter_merges_params() {
    let adapter = default_adapter(DatabaseType::SqlServer);
    let b = SqlBuilder::new(adapter.as_ref());
    let data = crate::params! { "role" => "admin" };
    let filter = crate::params! { "group_id" => 9 };
    let (sql, params) = b
        .build_partial_update(&memberships(), &data, Some(&filter), false)
        .unwrap();
    assert_eq!(sql, "UPDATE memberships SET [role] = @role WHERE [group_id] = @group_id");
    assert_eq!(params.get("group_id"), Some(&Value::I64(9)));
}

#[test]
fn self_join_suffixes_filter_placeholders() {
    let adapter = default_adapter(DatabaseType::Sqlite);
    let b = SqlBuilder::new(adapter.as_ref());
    let data = crate::params! { "role" => "owner" };
    let filter = crate::params! { "role" => "admin" };
    let (sql, params) = b
        .build_partial_update(&memberships(), &data, Some(&filter), true)
        .unwrap();
    assert_eq!(sql, "UPDATE memberships SET \"role\" = @role WHERE \"role\" = @role2");
    assert_eq!(params.get("role"), Some(&Value::Text("owner".into())));
    assert_eq!(params.get("role2"), Some(&Value::Text("admin".into())));
}

#[test]
fn delete_variants() {
    let adapter = default_adapter(DatabaseType::MySql);
    let b = SqlBuilder::new(adapter.as_ref());
    assert_eq!(
        b.build_delete(&users()).unwrap(),
        "DELETE FROM users WHERE `id` = @id"
    );
    let filter = crate::params! { "email" => "x" };
    assert_eq!(
        b.build_delete_by(&users(), &filter).unwrap(),
        "DELETE FROM users WHERE `email` = @email"
    );
    assert!(
        b.build_delete_by(&users(), &Params::new())
            .unwrap_err()
            .is_configuration()
    );
}
