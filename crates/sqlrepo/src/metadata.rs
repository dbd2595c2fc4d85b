//! Entity metadata: static descriptors emitted by `#[derive(Entity)]` and the
//! process-wide cache of resolved [`EntityMetadata`].
//!
//! Resolution happens once per concrete type. Racing first lookups serialize
//! on the cache's write lock, so every caller observes the same record and the
//! column lists feeding SQL text are computed exactly once.

use crate::entity::Entity;
use crate::error::{RepoError, RepoResult};
use heck::ToSnakeCase;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

/// How a mapped field participates in generated SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    /// Plain column: inserted and updated.
    Writable,
    /// Database-generated key: never inserted, used as update/delete filter,
    /// written back after insert.
    Key,
    /// Caller-supplied key: inserted, used as update/delete filter.
    ExplicitKey,
    /// Maintained by the database: never inserted or updated.
    Computed,
}

/// Static description of one mapped field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Rust field name.
    pub field: &'static str,
    /// Column name (defaults to the field name).
    pub column: &'static str,
    pub kind: ColumnKind,
}

/// Static description of an entity type, produced at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityDescriptor {
    /// Bare type name, e.g. `"OrderItem"`.
    pub type_name: &'static str,
    /// Explicit `#[orm(table = "...")]`, if any.
    pub table: Option<&'static str>,
    pub fields: &'static [FieldDescriptor],
}

/// Resolved, immutable column information for one entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityMetadata {
    table: String,
    columns: Vec<String>,
    keys: Vec<String>,
    explicit_keys: Vec<String>,
    computed: Vec<String>,
    writable: Vec<String>,
}

impl EntityMetadata {
    /// Resolve a descriptor into column buckets.
    ///
    /// When no field is marked `key` or `explicit_key`, a column named `id`
    /// (case-insensitive) is taken as the generated key.
    pub fn from_descriptor(desc: &EntityDescriptor) -> Self {
        let has_marked_key = desc
            .fields
            .iter()
            .any(|f| matches!(f.kind, ColumnKind::Key | ColumnKind::ExplicitKey));

        let mut meta = EntityMetadata {
            table: resolve_table_name(desc),
            columns: Vec::with_capacity(desc.fields.len()),
            keys: Vec::new(),
            explicit_keys: Vec::new(),
            computed: Vec::new(),
            writable: Vec::new(),
        };

        for field in desc.fields {
            let column = field.column.to_string();
            let kind = match field.kind {
                ColumnKind::Writable if !has_marked_key && column.eq_ignore_ascii_case("id") => {
                    ColumnKind::Key
                }
                kind => kind,
            };
            match kind {
                ColumnKind::Key => meta.keys.push(column.clone()),
                ColumnKind::ExplicitKey => meta.explicit_keys.push(column.clone()),
                ColumnKind::Computed => meta.computed.push(column.clone()),
                ColumnKind::Writable => meta.writable.push(column.clone()),
            }
            meta.columns.push(column);
        }

        meta
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// All mapped columns in declaration order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Database-generated key columns.
    pub fn key_columns(&self) -> &[String] {
        &self.keys
    }

    /// Caller-supplied key columns.
    pub fn explicit_key_columns(&self) -> &[String] {
        &self.explicit_keys
    }

    pub fn computed_columns(&self) -> &[String] {
        &self.computed
    }

    /// Columns that are neither key, explicit key nor computed.
    pub fn writable_columns(&self) -> &[String] {
        &self.writable
    }

    /// Columns written by INSERT: everything except generated keys and
    /// computed columns, in declaration order.
    pub fn insert_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| !self.keys.contains(c) && !self.computed.contains(c))
            .map(String::as_str)
            .collect()
    }

    /// Key then explicit-key columns; the identity filter for update/delete.
    pub fn identity_columns(&self) -> Vec<&str> {
        self.keys
            .iter()
            .chain(self.explicit_keys.iter())
            .map(String::as_str)
            .collect()
    }

    /// Identity columns, failing when the entity declares none.
    pub fn require_identity(&self, operation: &str) -> RepoResult<Vec<&str>> {
        let cols = self.identity_columns();
        if cols.is_empty() {
            return Err(RepoError::configuration(format!(
                "{operation}: entity `{}` must have at least one key or explicit_key column",
                self.table
            )));
        }
        Ok(cols)
    }

    /// The sole identity column, for point lookups.
    pub fn single_key(&self, operation: &str) -> RepoResult<&str> {
        let cols = self.identity_columns();
        match cols.as_slice() {
            [only] => Ok(only),
            [] => Err(RepoError::configuration(format!(
                "{operation}: entity `{}` has no key column",
                self.table
            ))),
            many => Err(RepoError::configuration(format!(
                "{operation}: entity `{}` has {} key columns; only single-key entities are supported",
                self.table,
                many.len()
            ))),
        }
    }
}

/// Apply the table naming convention to a descriptor.
///
/// An explicit table wins; otherwise the type name is snake_cased and
/// pluralized (`OrderItem` → `order_items`, `Category` → `categories`).
pub fn resolve_table_name(desc: &EntityDescriptor) -> String {
    if let Some(table) = desc.table {
        return table.to_string();
    }
    pluralize(&desc.type_name.to_snake_case())
}

fn pluralize(name: &str) -> String {
    const SIBILANT: [&str; 5] = ["s", "x", "z", "ch", "sh"];
    if SIBILANT.iter().any(|s| name.ends_with(s)) {
        return format!("{name}es");
    }
    let mut chars = name.chars().rev();
    if let (Some('y'), Some(prev)) = (chars.next(), chars.next()) {
        if !"aeiou".contains(prev) {
            return format!("{}ies", &name[..name.len() - 1]);
        }
    }
    format!("{name}s")
}

type Cache = RwLock<HashMap<TypeId, Arc<EntityMetadata>>>;

fn cache() -> &'static Cache {
    static CACHE: OnceLock<Cache> = OnceLock::new();
    CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Cached metadata for `T`, computed on first access.
pub fn metadata_of<T: Entity>() -> Arc<EntityMetadata> {
    metadata_for(TypeId::of::<T>(), T::descriptor)
}

fn metadata_for(type_id: TypeId, descriptor: fn() -> &'static EntityDescriptor) -> Arc<EntityMetadata> {
    {
        let read = cache().read().unwrap_or_else(|e| e.into_inner());
        if let Some(meta) = read.get(&type_id) {
            return Arc::clone(meta);
        }
    }

    let mut write = cache().write().unwrap_or_else(|e| e.into_inner());
    // Another caller may have populated the entry while we waited.
    if let Some(meta) = write.get(&type_id) {
        return Arc::clone(meta);
    }
    let desc = descriptor();
    let meta = Arc::new(EntityMetadata::from_descriptor(desc));
    tracing::trace!(
        target: "sqlrepo.metadata",
        entity = desc.type_name,
        table = meta.table(),
        columns = meta.columns().len(),
        "resolved entity metadata"
    );
    write.insert(type_id, Arc::clone(&meta));
    meta
}

/// Registration record submitted by `#[derive(Entity)]` via `inventory`.
pub struct EntityRegistration {
    pub type_id: fn() -> TypeId,
    pub descriptor: fn() -> &'static EntityDescriptor,
}

inventory::collect!(EntityRegistration);

/// Descriptors of every entity derived in the binary.
pub fn registered_entities() -> impl Iterator<Item = &'static EntityDescriptor> {
    inventory::iter::<EntityRegistration>
        .into_iter()
        .map(|reg| (reg.descriptor)())
}

/// Resolve every registered entity up front, e.g. at application startup.
///
/// Returns the number of registrations visited.
pub fn preload_registered() -> usize {
    let mut n = 0;
    for reg in inventory::iter::<EntityRegistration> {
        metadata_for((reg.type_id)(), reg.descriptor);
        n += 1;
    }
    n
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELDS: &[FieldDescriptor] = &[
        FieldDescriptor {
            field: "id",
            column: "id",
            kind: ColumnKind::Writable,
        },
        FieldDescriptor {
            field: "sku",
            column: "sku",
            kind: ColumnKind::Writable,
        },
        FieldDescriptor {
            field: "created_at",
            column: "created_at",
            kind: ColumnKind::Computed,
        },
    ];

    #[test]
    fn id_column_becomes_key_by_convention() {
        let desc = EntityDescriptor {
            type_name: "StockItem",
            table: None,
            fields: FIELDS,
        };
        let meta = EntityMetadata::from_descriptor(&desc);
        assert_eq!(meta.table(), "stock_items");
        assert_eq!(meta.key_columns(), ["id"]);
        assert_eq!(meta.writable_columns(), ["sku"]);
        assert_eq!(meta.computed_columns(), ["created_at"]);
        assert_eq!(meta.insert_columns(), vec!["sku"]);
        assert_eq!(meta.single_key("get").unwrap(), "id");
    }

    #[test]
    fn marked_explicit_key_suppresses_id_convention() {
        const MARKED: &[FieldDescriptor] = &[
            FieldDescriptor {
                field: "id",
                column: "id",
                kind: ColumnKind::Writable,
            },
            FieldDescriptor {
                field: "code",
                column: "code",
                kind: ColumnKind::ExplicitKey,
            },
        ];
        let desc = EntityDescriptor {
            type_name: "Country",
            table: Some("country"),
            fields: MARKED,
        };
        let meta = EntityMetadata::from_descriptor(&desc);
        assert_eq!(meta.table(), "country");
        assert!(meta.key_columns().is_empty());
        assert_eq!(meta.explicit_key_columns(), ["code"]);
        assert_eq!(meta.insert_columns(), vec!["id", "code"]);
        assert_eq!(meta.identity_columns(), vec!["code"]);
    }

    #[test]
    fn pluralization_rules() {
        assert_eq!(pluralize("user"), "users");
        assert_eq!(pluralize("category"), "categories");
        assert_eq!(pluralize("day"), "days");
        assert_eq!(pluralize("address"), "addresses");
        assert_eq!(pluralize("box"), "boxes");
        assert_eq!(pluralize("batch"), "batches");
    }

    #[test]
    fn keyless_entity_fails_identity_requirements() {
        const NO_KEY: &[FieldDescriptor] = &[FieldDescriptor {
            field: "label",
            column: "label",
            kind: ColumnKind::Writable,
        }];
        let desc = EntityDescriptor {
            type_name: "Tag",
            table: None,
            fields: NO_KEY,
        };
        let meta = EntityMetadata::from_descriptor(&desc);
        assert!(meta.require_identity("update").unwrap_err().is_configuration());
        assert!(meta.single_key("get").unwrap_err().is_configuration());
    }
}
