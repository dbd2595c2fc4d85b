//! The query executor contract.
//!
//! Everything above this module builds SQL text and [`Params`]; everything
//! below it (drivers, pooled clients, transactions) runs them. Repository
//! methods accept any [`QueryExecutor`], so a connection and a transaction
//! on it are interchangeable.

use crate::dialect::DatabaseType;
use crate::error::{RepoError, RepoResult};
use crate::params::Params;
use crate::row::Row;
use crate::value::Value;
use std::future::Future;
use std::time::Duration;

/// Longest SQL prefix written to the `sqlrepo.sql` log target.
pub const LOG_SQL_MAX_BYTES: usize = 200;

/// One statement (or batch) plus its named parameters.
#[derive(Debug, Clone, Copy)]
pub struct Command<'a> {
    pub sql: &'a str,
    pub params: &'a Params,
    /// Forwarded to the driver as-is.
    pub timeout: Option<Duration>,
}

impl<'a> Command<'a> {
    pub fn new(sql: &'a str, params: &'a Params) -> Self {
        Self {
            sql,
            params,
            timeout: None,
        }
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Runs SQL text with named parameters.
///
/// `query_multiple` runs a `;`-separated batch and returns one result set
/// per row-producing statement, in order.
pub trait QueryExecutor: Send + Sync {
    /// The engine behind this executor.
    fn database_type(&self) -> DatabaseType;

    /// Make sure the underlying connection is open.
    ///
    /// The default implementation does nothing.
    fn open(&self) -> impl Future<Output = RepoResult<()>> + Send {
        async { Ok(()) }
    }

    /// Execute and return the number of affected rows.
    fn execute(&self, cmd: Command<'_>) -> impl Future<Output = RepoResult<u64>> + Send;

    /// Execute and return all rows of the first result set.
    fn query(&self, cmd: Command<'_>) -> impl Future<Output = RepoResult<Vec<Row>>> + Send;

    /// Execute a batch and return every result set.
    fn query_multiple(&self, cmd: Command<'_>) -> impl Future<Output = RepoResult<Vec<Vec<Row>>>> + Send;

    /// First row, if any. Extra rows are ignored.
    fn query_opt(&self, cmd: Command<'_>) -> impl Future<Output = RepoResult<Option<Row>>> + Send {
        async move { Ok(self.query(cmd).await?.into_iter().next()) }
    }

    /// First column of the first row; `Value::Null` when there are no rows.
    fn query_scalar(&self, cmd: Command<'_>) -> impl Future<Output = RepoResult<Value>> + Send {
        async move {
            let row = self.query_opt(cmd).await?;
            Ok(row
                .and_then(|r| r.get_index(0).cloned())
                .unwrap_or(Value::Null))
        }
    }
}

impl<E: QueryExecutor> QueryExecutor for &E {
    fn database_type(&self) -> DatabaseType {
        (**self).database_type()
    }

    fn open(&self) -> impl Future<Output = RepoResult<()>> + Send {
        (**self).open()
    }

    fn execute(&self, cmd: Command<'_>) -> impl Future<Output = RepoResult<u64>> + Send {
        (**self).execute(cmd)
    }

    fn query(&self, cmd: Command<'_>) -> impl Future<Output = RepoResult<Vec<Row>>> + Send {
        (**self).query(cmd)
    }

    fn query_multiple(&self, cmd: Command<'_>) -> impl Future<Output = RepoResult<Vec<Vec<Row>>>> + Send {
        (**self).query_multiple(cmd)
    }
}

/// Emit the statement about to run on the `sqlrepo.sql` target.
pub(crate) fn log_command(database_type: DatabaseType, cmd: &Command<'_>) {
    let sql = if cmd.sql.len() > LOG_SQL_MAX_BYTES {
        format!("{}...", truncate_sql_bytes(cmd.sql, LOG_SQL_MAX_BYTES))
    } else {
        cmd.sql.to_string()
    };
    tracing::debug!(
        target: "sqlrepo.sql",
        database_type = database_type.as_str(),
        param_count = cmd.params.len(),
        sql = %sql,
    );
}

pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

/// Race `future` against `timeout`.
pub(crate) async fn with_timeout<T, F>(timeout: Option<Duration>, future: F) -> RepoResult<T>
where
    F: Future<Output = RepoResult<T>> + Send,
{
    match timeout {
        Some(timeout) => {
            tokio::pin!(future);
            tokio::select! {
                result = &mut future => result,
                _ = tokio::time::sleep(timeout) => Err(RepoError::Timeout(timeout)),
            }
        }
        None => future.await,
    }
}

/// End (exclusive) of the quoted literal, quoted identifier or comment that
/// opens at `i`, or `None` when `bytes[i]` is plain SQL text.
///
/// Strings and `"identifiers"` close on their own quote, so doubled quotes
/// lex as two adjacent regions. Backticks quote on MySQL and SQLite,
/// brackets on SQL Server, `$tag$` bodies on PostgreSQL. `--` and `/* */`
/// comments are skipped everywhere. An unterminated region runs to the end.
fn skip_region(bytes: &[u8], i: usize, dialect: DatabaseType) -> Option<usize> {
    let next = bytes.get(i + 1).copied();
    match bytes[i] {
        q @ (b'\'' | b'"') => Some(close_after(bytes, i + 1, &[q])),
        b'`' if matches!(dialect, DatabaseType::MySql | DatabaseType::Sqlite) => {
            Some(close_after(bytes, i + 1, b"`"))
        }
        b'[' if dialect == DatabaseType::SqlServer => Some(close_after(bytes, i + 1, b"]")),
        b'-' if next == Some(b'-') => Some(close_after(bytes, i + 2, b"\n")),
        b'/' if next == Some(b'*') => Some(close_after(bytes, i + 2, b"*/")),
        b'$' if dialect == DatabaseType::PostgreSql => {
            let body = dollar_tag_end(bytes, i)?;
            Some(close_after(bytes, body, &bytes[i..body]))
        }
        _ => None,
    }
}

/// Index just past the first `delimiter` at or after `from`.
fn close_after(bytes: &[u8], from: usize, delimiter: &[u8]) -> usize {
    bytes
        .get(from..)
        .and_then(|rest| rest.windows(delimiter.len()).position(|w| w == delimiter))
        .map_or(bytes.len(), |pos| from + pos + delimiter.len())
}

/// `$$` or `$tag$` opening at `i`; returns the index after the tag.
/// `$1` positional markers are not tags.
fn dollar_tag_end(bytes: &[u8], i: usize) -> Option<usize> {
    let mut j = i + 1;
    if bytes.get(j).is_some_and(|b| is_ident_start(*b)) {
        while j < bytes.len() && is_ident_char(bytes[j]) {
            j += 1;
        }
    }
    (bytes.get(j) == Some(&b'$')).then_some(j + 1)
}

/// Walk `sql`, calling `on_placeholder` for every `@name` / `:name` in plain
/// text. When the callback returns `Some(replacement)`, the placeholder is
/// replaced in the returned text.
///
/// `::type` casts and `@@name` system variables are left alone.
pub(crate) fn scan_placeholders<F>(sql: &str, dialect: DatabaseType, mut on_placeholder: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    let bytes = sql.as_bytes();
    let mut out = String::with_capacity(sql.len());
    let mut copied = 0;
    let mut i = 0;

    while i < bytes.len() {
        if let Some(end) = skip_region(bytes, i, dialect) {
            i = end;
            continue;
        }
        let next = bytes.get(i + 1).copied();
        match bytes[i] {
            b':' if next == Some(b':') => i += 2,
            b'@' if next == Some(b'@') => i = ident_end(bytes, i + 2),
            b'@' | b':' if next.is_some_and(is_ident_start) => {
                let start = i + 1;
                let end = ident_end(bytes, start);
                if let Some(replacement) = on_placeholder(&sql[start..end]) {
                    out.push_str(&sql[copied..i]);
                    out.push_str(&replacement);
                    copied = end;
                }
                i = end;
            }
            _ => i += 1,
        }
    }

    out.push_str(&sql[copied..]);
    out
}

/// Split a `;`-separated batch into statements, ignoring separators inside
/// quotes, comments and dollar-quoted bodies. Blank statements are dropped.
pub(crate) fn split_statements(sql: &str, dialect: DatabaseType) -> Vec<&str> {
    let bytes = sql.as_bytes();
    let mut parts = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        if let Some(end) = skip_region(bytes, i, dialect) {
            i = end;
            continue;
        }
        if bytes[i] == b';' {
            parts.push(&sql[start..i]);
            start = i + 1;
        }
        i += 1;
    }
    parts.push(&sql[start..]);
    parts
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

fn ident_end(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && is_ident_char(bytes[i]) {
        i += 1;
    }
    i
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}
