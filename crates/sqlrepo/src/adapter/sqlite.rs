use super::{InsertPlan, KeyRetrieval, SqlAdapter, plain_insert};
use crate::dialect::DatabaseType;
use crate::pager::Pager;

/// SQLite.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteAdapter;

impl SqlAdapter for SqliteAdapter {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::Sqlite
    }

    fn quote_column(&self, column: &str) -> String {
        format!("\"{column}\"")
    }

    fn page_sql(&self, pager: &Pager) -> Option<String> {
        Some(pager.limit_comma_sql())
    }

    fn insert_plan(&self, table: &str, columns: &str, parameters: &str, _key_columns: &[&str]) -> InsertPlan {
        InsertPlan {
            sql: format!(
                "{}; SELECT last_insert_rowid() id",
                plain_insert(table, columns, parameters)
            ),
            key_retrieval: KeyRetrieval::TrailingSelect,
        }
    }
}
