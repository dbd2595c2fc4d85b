use super::{InsertPlan, KeyRetrieval, SqlAdapter, plain_insert};
use crate::dialect::DatabaseType;
use crate::pager::Pager;

/// PostgreSQL.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresAdapter;

impl SqlAdapter for PostgresAdapter {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::PostgreSql
    }

    fn quote_column(&self, column: &str) -> String {
        format!("\"{column}\"")
    }

    fn page_sql(&self, pager: &Pager) -> Option<String> {
        Some(pager.limit_offset_sql())
    }

    /// `RETURNING` the key columns, or the whole row for keyless tables.
    fn insert_plan(&self, table: &str, columns: &str, parameters: &str, key_columns: &[&str]) -> InsertPlan {
        let returning = if key_columns.is_empty() {
            "*".to_string()
        } else {
            key_columns
                .iter()
                .map(|c| self.quote_column(c))
                .collect::<Vec<_>>()
                .join(", ")
        };
        InsertPlan {
            sql: format!(
                "{} RETURNING {returning}",
                plain_insert(table, columns, parameters)
            ),
            key_retrieval: KeyRetrieval::Returning,
        }
    }
}
