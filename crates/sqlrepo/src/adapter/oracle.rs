use super::{InsertPlan, KeyRetrieval, SqlAdapter, plain_insert};
use crate::dialect::DatabaseType;
use crate::pager::Pager;

/// Oracle.
///
/// Identifiers are left unquoted so they keep Oracle's upper-case folding.
/// Generated keys are not recovered after insert: without driver-specific
/// OUT parameters there is no portable way to read them back.
#[derive(Debug, Clone, Copy, Default)]
pub struct OracleAdapter;

impl SqlAdapter for OracleAdapter {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::Oracle
    }

    fn quote_column(&self, column: &str) -> String {
        column.to_string()
    }

    fn parameter_prefix(&self) -> char {
        ':'
    }

    fn page_sql(&self, pager: &Pager) -> Option<String> {
        Some(pager.rownum_sql())
    }

    fn insert_plan(&self, table: &str, columns: &str, parameters: &str, key_columns: &[&str]) -> InsertPlan {
        if !key_columns.is_empty() {
            tracing::debug!(
                target: "sqlrepo.sql",
                table,
                "oracle insert: generated key is not read back"
            );
        }
        InsertPlan {
            sql: plain_insert(table, columns, parameters),
            key_retrieval: KeyRetrieval::AffectedRows,
        }
    }

    fn begin_sql(&self) -> &'static str {
        "SET TRANSACTION READ WRITE"
    }
}
