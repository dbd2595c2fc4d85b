use super::{InsertPlan, KeyRetrieval, SqlAdapter, plain_insert};
use crate::dialect::DatabaseType;
use crate::pager::Pager;

/// MySQL / MariaDB.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlAdapter;

impl SqlAdapter for MySqlAdapter {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::MySql
    }

    fn quote_column(&self, column: &str) -> String {
        format!("`{column}`")
    }

    fn page_sql(&self, pager: &Pager) -> Option<String> {
        Some(pager.limit_comma_sql())
    }

    fn insert_plan(&self, table: &str, columns: &str, parameters: &str, _key_columns: &[&str]) -> InsertPlan {
        InsertPlan {
            sql: plain_insert(table, columns, parameters),
            key_retrieval: KeyRetrieval::FollowUpQuery("SELECT LAST_INSERT_ID() id".to_string()),
        }
    }

    fn begin_sql(&self) -> &'static str {
        "START TRANSACTION"
    }
}
