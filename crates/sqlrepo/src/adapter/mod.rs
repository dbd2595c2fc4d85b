//! Per-dialect SQL strategies.
//!
//! An adapter is a stateless value selected once per connection. It decides
//! identifier quoting, the parameter sigil, the pagination rule and how the
//! generated key is recovered after an insert.

mod mysql;
mod oracle;
mod postgres;
mod sqlite;
mod sqlserver;

pub use mysql::MySqlAdapter;
pub use oracle::OracleAdapter;
pub use postgres::PostgresAdapter;
pub use sqlite::SqliteAdapter;
pub use sqlserver::SqlServerAdapter;

use crate::dialect::DatabaseType;
use crate::pager::Pager;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// How the repository recovers database-generated keys after an insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyRetrieval {
    /// Nothing to read back; the insert reports its affected-row count.
    AffectedRows,
    /// The insert text is a batch whose last statement selects the key as `id`.
    TrailingSelect,
    /// Run the insert, then this statement, which selects the key as `id`.
    FollowUpQuery(String),
    /// The insert itself returns the key columns (or the whole row).
    Returning,
}

/// A ready-to-run insert statement plus its key recovery strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertPlan {
    pub sql: String,
    pub key_retrieval: KeyRetrieval,
}

/// Dialect strategy.
pub trait SqlAdapter: Send + Sync + fmt::Debug {
    fn database_type(&self) -> DatabaseType;

    /// Quote a column identifier.
    fn quote_column(&self, column: &str) -> String;

    /// Sigil placed before named parameters.
    fn parameter_prefix(&self) -> char {
        '@'
    }

    /// Placeholder for the parameter `name`.
    fn placeholder(&self, name: &str) -> String {
        format!("{}{}", self.parameter_prefix(), name)
    }

    /// `<quoted column> = <placeholder>`.
    fn column_equals(&self, column: &str, parameter: &str) -> String {
        format!("{} = {}", self.quote_column(column), self.placeholder(parameter))
    }

    /// Page statement for `pager`, or `None` without a pagination rule.
    fn page_sql(&self, _pager: &Pager) -> Option<String> {
        None
    }

    /// Build the insert statement and choose how the key comes back.
    ///
    /// `columns` and `parameters` are the comma-joined lists produced by
    /// [`SqlBuilder::build_insert`](crate::builder::SqlBuilder::build_insert).
    fn insert_plan(
        &self,
        table: &str,
        columns: &str,
        parameters: &str,
        key_columns: &[&str],
    ) -> InsertPlan;

    fn begin_sql(&self) -> &'static str {
        "BEGIN"
    }

    fn commit_sql(&self) -> &'static str {
        "COMMIT"
    }

    fn rollback_sql(&self) -> &'static str {
        "ROLLBACK"
    }
}

pub(crate) fn plain_insert(table: &str, columns: &str, parameters: &str) -> String {
    format!("INSERT INTO {table} ({columns}) VALUES ({parameters})")
}

/// `DatabaseType -> adapter` lookup, filled explicitly.
#[derive(Debug, Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<DatabaseType, Arc<dyn SqlAdapter>>,
}

impl AdapterRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in adapter of every dialect.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry
            .register(Arc::new(SqlServerAdapter))
            .register(Arc::new(OracleAdapter))
            .register(Arc::new(MySqlAdapter))
            .register(Arc::new(SqliteAdapter))
            .register(Arc::new(PostgresAdapter));
        registry
    }

    /// Register `adapter` for its database type, replacing any previous one.
    pub fn register(&mut self, adapter: Arc<dyn SqlAdapter>) -> &mut Self {
        self.adapters.insert(adapter.database_type(), adapter);
        self
    }

    pub fn get(&self, database_type: DatabaseType) -> Option<Arc<dyn SqlAdapter>> {
        self.adapters.get(&database_type).cloned()
    }
}

/// The built-in adapter for `database_type`.
pub fn default_adapter(database_type: DatabaseType) -> Arc<dyn SqlAdapter> {
    match database_type {
        DatabaseType::SqlServer => Arc::new(SqlServerAdapter),
        DatabaseType::Oracle => Arc::new(OracleAdapter),
        DatabaseType::MySql => Arc::new(MySqlAdapter),
        DatabaseType::Sqlite => Arc::new(SqliteAdapter),
        DatabaseType::PostgreSql => Arc::new(PostgresAdapter),
    }
}
