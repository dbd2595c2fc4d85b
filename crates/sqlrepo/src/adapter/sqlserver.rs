use super::{InsertPlan, KeyRetrieval, SqlAdapter, plain_insert};
use crate::dialect::DatabaseType;
use crate::pager::Pager;

/// Microsoft SQL Server.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServerAdapter;

impl SqlAdapter for SqlServerAdapter {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::SqlServer
    }

    fn quote_column(&self, column: &str) -> String {
        format!("[{column}]")
    }

    fn page_sql(&self, pager: &Pager) -> Option<String> {
        Some(pager.row_number_sql())
    }

    fn insert_plan(&self, table: &str, columns: &str, parameters: &str, _key_columns: &[&str]) -> InsertPlan {
        InsertPlan {
            sql: format!(
                "{}; SELECT SCOPE_IDENTITY() id",
                plain_insert(table, columns, parameters)
            ),
            key_retrieval: KeyRetrieval::TrailingSelect,
        }
    }

    fn begin_sql(&self) -> &'static str {
        "BEGIN TRANSACTION"
    }

    fn commit_sql(&self) -> &'static str {
        "COMMIT TRANSACTION"
    }

    fn rollback_sql(&self) -> &'static str {
        "ROLLBACK TRANSACTION"
    }
}
