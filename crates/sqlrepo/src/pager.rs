//! Paginated SELECT generation for every supported dialect.
//!
//! A [`Pager`] describes one page request. [`Pager::to_sql`] renders either
//! the count statement or the page statement for a [`DatabaseType`]; adapters
//! expose the same rules through [`SqlAdapter::page_sql`].

use crate::adapter::SqlAdapter;
use crate::dialect::DatabaseType;
use crate::error::{RepoError, RepoResult};
use serde::{Deserialize, Serialize};

const NEUTRAL_FILTER: &str = "(1=1)";

/// A validated page request.
///
/// ```ignore
/// let pager = Pager::new("orders", 2, 10)?
///     .filter("status = 'open'")
///     .order_by("created_at desc");
/// let (count_sql, data_sql) = pager.page_sql(adapter.as_ref())?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pager {
    table_or_sql: String,
    fields: String,
    filter: String,
    sort: String,
    page_index: u32,
    page_size: u32,
}

impl Pager {
    /// Page `page_index` (1-based) of `page_size` rows from a table name or a
    /// raw SELECT statement.
    pub fn new(table_or_sql: impl Into<String>, page_index: u32, page_size: u32) -> RepoResult<Self> {
        if page_index < 1 {
            return Err(RepoError::configuration("page index must be >= 1"));
        }
        if page_size == 0 {
            return Err(RepoError::configuration("page size must be > 0"));
        }
        Ok(Self {
            table_or_sql: table_or_sql.into(),
            fields: "*".to_string(),
            filter: NEUTRAL_FILTER.to_string(),
            sort: String::new(),
            page_index,
            page_size,
        })
    }

    /// Projected column list; defaults to `*`.
    pub fn fields(mut self, fields: impl Into<String>) -> Self {
        let fields = fields.into();
        self.fields = if fields.trim().is_empty() {
            "*".to_string()
        } else {
            fields
        };
        self
    }

    /// Filter predicate text. Empty or whitespace means no filter.
    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        let filter = filter.into();
        self.filter = if filter.trim().is_empty() {
            NEUTRAL_FILTER.to_string()
        } else {
            filter
        };
        self
    }

    /// Sort expression text, without `ORDER BY`.
    pub fn order_by(mut self, sort: impl Into<String>) -> Self {
        self.sort = sort.into().trim().to_string();
        self
    }

    pub fn page_index(&self) -> u32 {
        self.page_index
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn filter_text(&self) -> &str {
        &self.filter
    }

    /// Rows skipped before the page starts.
    pub fn min_row(&self) -> u64 {
        u64::from(self.page_size) * u64::from(self.page_index - 1)
    }

    /// Last row (1-based, inclusive) of the page.
    pub fn max_row(&self) -> u64 {
        self.min_row() + u64::from(self.page_size)
    }

    /// The FROM source: the table name, or the caller's statement wrapped as
    /// a derived table when it contains `from`.
    pub fn source(&self) -> String {
        if self.table_or_sql.to_ascii_lowercase().contains("from") {
            format!("({}) AA", self.table_or_sql)
        } else {
            self.table_or_sql.clone()
        }
    }

    /// `SELECT COUNT(*) AS total ...` over the filtered source.
    pub fn count_sql(&self) -> String {
        format!(
            "SELECT COUNT(*) AS total FROM {} WHERE {}",
            self.source(),
            self.filter
        )
    }

    fn order_clause(&self) -> String {
        if self.sort.is_empty() {
            String::new()
        } else {
            format!(" ORDER BY {}", self.sort)
        }
    }

    fn filtered_select(&self) -> String {
        format!(
            "SELECT {} FROM {} WHERE {}{}",
            self.fields,
            self.source(),
            self.filter,
            self.order_clause()
        )
    }

    /// `ROW_NUMBER()` window inside a CTE.
    pub fn row_number_sql(&self) -> String {
        let order = if self.sort.is_empty() {
            "ORDER BY (SELECT NULL)".to_string()
        } else {
            format!("ORDER BY {}", self.sort)
        };
        format!(
            "WITH paging AS (SELECT ROW_NUMBER() OVER ({order}) AS rownumber, {} FROM {} WHERE {}) \
             SELECT * FROM paging WHERE rownumber BETWEEN {} AND {}",
            self.fields,
            self.source(),
            self.filter,
            self.min_row() + 1,
            self.max_row()
        )
    }

    /// `ROWNUM` window around an ordered subquery.
    pub fn rownum_sql(&self) -> String {
        format!(
            "SELECT b.* FROM (SELECT a.*, ROWNUM AS rowIndex FROM ({}) a) b \
             WHERE b.rowIndex > {} AND b.rowIndex <= {}",
            self.filtered_select(),
            self.min_row(),
            self.max_row()
        )
    }

    /// `LIMIT offset, count`.
    pub fn limit_comma_sql(&self) -> String {
        format!(
            "{} LIMIT {},{}",
            self.filtered_select(),
            self.min_row(),
            self.page_size
        )
    }

    /// `LIMIT count OFFSET offset`.
    pub fn limit_offset_sql(&self) -> String {
        format!(
            "{} LIMIT {} OFFSET {}",
            self.filtered_select(),
            self.page_size,
            self.min_row()
        )
    }

    /// Count or page statement for `database_type`.
    pub fn to_sql(&self, count_only: bool, database_type: DatabaseType) -> String {
        if count_only {
            return self.count_sql();
        }
        match database_type {
            DatabaseType::SqlServer => self.row_number_sql(),
            DatabaseType::Oracle => self.rownum_sql(),
            DatabaseType::MySql | DatabaseType::Sqlite => self.limit_comma_sql(),
            DatabaseType::PostgreSql => self.limit_offset_sql(),
        }
    }

    /// `(count_sql, data_sql)` through `adapter`'s pagination rule.
    pub fn page_sql(&self, adapter: &dyn SqlAdapter) -> RepoResult<(String, String)> {
        match adapter.page_sql(self) {
            Some(data) if !data.is_empty() => Ok((self.count_sql(), data)),
            _ => Err(RepoError::UnsupportedDialect(adapter.database_type())),
        }
    }
}

/// Caller-side paging state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageParam {
    pub page_index: u32,
    pub page_size: u32,
    /// Total matching rows, filled by `get_page`.
    pub record_count: u64,
    pub sort_condition: String,
}

impl Default for PageParam {
    fn default() -> Self {
        Self {
            page_index: 1,
            page_size: 20,
            record_count: 0,
            sort_condition: String::new(),
        }
    }
}

impl PageParam {
    pub fn new(page_index: u32, page_size: u32) -> Self {
        Self {
            page_index,
            page_size,
            ..Self::default()
        }
    }

    pub fn sort(mut self, sort_condition: impl Into<String>) -> Self {
        self.sort_condition = sort_condition.into();
        self
    }

    /// Number of pages implied by `record_count`.
    pub fn page_count(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.record_count.div_ceil(u64::from(self.page_size))
    }
}

/// One page of results plus the total row count.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests;
