//! SQLite through `rusqlite`.
//!
//! rusqlite is blocking; statements run inline on the calling task while the
//! connection mutex is held. SQLite understands `@name` and `:name`
//! placeholders natively, so parameters bind by name without rewriting.

use crate::dialect::DatabaseType;
use crate::error::{RepoError, RepoResult};
use crate::executor::{Command, QueryExecutor, log_command};
use crate::row::Row;
use crate::value::Value;
use rusqlite::types::{ToSqlOutput, ValueRef};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// A single SQLite connection.
pub struct SqliteExecutor {
    conn: Mutex<rusqlite::Connection>,
}

impl std::fmt::Debug for SqliteExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteExecutor").finish_non_exhaustive()
    }
}

impl SqliteExecutor {
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        let conn = rusqlite::Connection::open(path)
            .map_err(|e| RepoError::Connection(e.to_string()))?;
        Ok(Self::from_connection(conn))
    }

    pub fn open_in_memory() -> RepoResult<Self> {
        let conn = rusqlite::Connection::open_in_memory()
            .map_err(|e| RepoError::Connection(e.to_string()))?;
        Ok(Self::from_connection(conn))
    }

    /// Open from a connection string: a file path, `:memory:`, or an ADO-style
    /// `Data Source=<path>;...` string.
    pub fn open_connection_string(conn_str: &str) -> RepoResult<Self> {
        let path = data_source(conn_str);
        if path.is_empty() || path.eq_ignore_ascii_case(":memory:") {
            Self::open_in_memory()
        } else {
            Self::open(path)
        }
    }

    pub fn from_connection(conn: rusqlite::Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Run every statement of `cmd.sql`, returning the summed affected rows
    /// and the rows of each row-producing statement.
    fn run_batch(&self, cmd: &Command<'_>) -> RepoResult<(u64, Vec<Vec<Row>>)> {
        log_command(DatabaseType::Sqlite, cmd);
        let conn = self
            .conn
            .lock()
            .map_err(|_| RepoError::Connection("sqlite connection mutex poisoned".into()))?;
        if let Some(timeout) = cmd.timeout {
            conn.busy_timeout(timeout)?;
        }

        let mut affected = 0u64;
        let mut sets = Vec::new();
        let mut batch = rusqlite::Batch::new(&conn, cmd.sql);
        while let Some(mut stmt) = batch.next()? {
            bind_named(&mut stmt, cmd)?;
            if stmt.column_count() == 0 {
                affected += stmt.raw_execute()? as u64;
                continue;
            }

            let columns: Arc<[String]> = stmt
                .column_names()
                .into_iter()
                .map(str::to_string)
                .collect::<Vec<_>>()
                .into();
            let width = columns.len();
            let mut rows = stmt.raw_query();
            let mut set = Vec::new();
            while let Some(row) = rows.next()? {
                let mut values = Vec::with_capacity(width);
                for i in 0..width {
                    values.push(from_sqlite(row.get_ref(i)?, &columns[i])?);
                }
                set.push(Row::new(Arc::clone(&columns), values));
            }
            sets.push(set);
        }
        Ok((affected, sets))
    }
}

impl QueryExecutor for SqliteExecutor {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::Sqlite
    }

    async fn execute(&self, cmd: Command<'_>) -> RepoResult<u64> {
        self.run_batch(&cmd).map(|(affected, _)| affected)
    }

    async fn query(&self, cmd: Command<'_>) -> RepoResult<Vec<Row>> {
        let (_, sets) = self.run_batch(&cmd)?;
        Ok(sets.into_iter().next().unwrap_or_default())
    }

    async fn query_multiple(&self, cmd: Command<'_>) -> RepoResult<Vec<Vec<Row>>> {
        self.run_batch(&cmd).map(|(_, sets)| sets)
    }
}

fn data_source(conn_str: &str) -> &str {
    let trimmed = conn_str.trim();
    if !trimmed.contains('=') {
        return trimmed;
    }
    trimmed
        .split(';')
        .filter_map(|part| part.split_once('='))
        .find(|(key, _)| {
            let key = key.trim();
            key.eq_ignore_ascii_case("data source") || key.eq_ignore_ascii_case("datasource")
        })
        .map(|(_, value)| value.trim())
        .unwrap_or_default()
}

fn bind_named(stmt: &mut rusqlite::Statement<'_>, cmd: &Command<'_>) -> RepoResult<()> {
    for index in 1..=stmt.parameter_count() {
        let Some(raw) = stmt.parameter_name(index) else {
            return Err(RepoError::query(format!(
                "positional parameter ?{index} is not supported; use @name"
            )));
        };
        let name = raw.trim_start_matches(['@', ':', '$']).to_string();
        let value = cmd
            .params
            .get_ignore_case(&name)
            .ok_or_else(|| RepoError::query(format!("missing parameter `{name}`")))?;
        stmt.raw_bind_parameter(index, value)?;
    }
    Ok(())
}

impl rusqlite::ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        use rusqlite::types::Value as Sql;
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(Sql::Null),
            Value::Bool(v) => ToSqlOutput::Owned(Sql::Integer(i64::from(*v))),
            Value::I64(v) => ToSqlOutput::Owned(Sql::Integer(*v)),
            Value::F64(v) => ToSqlOutput::Owned(Sql::Real(*v)),
            Value::Decimal(v) => ToSqlOutput::Owned(Sql::Text(v.to_string())),
            Value::Text(v) => ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes())),
            Value::Bytes(v) => ToSqlOutput::Borrowed(ValueRef::Blob(v)),
            Value::Uuid(v) => ToSqlOutput::Owned(Sql::Text(v.to_string())),
            Value::Date(v) => ToSqlOutput::Owned(Sql::Text(v.format("%Y-%m-%d").to_string())),
            Value::Timestamp(v) => {
                ToSqlOutput::Owned(Sql::Text(v.format("%Y-%m-%d %H:%M:%S%.f").to_string()))
            }
            Value::TimestampTz(v) => ToSqlOutput::Owned(Sql::Text(v.to_rfc3339())),
            Value::Json(v) => ToSqlOutput::Owned(Sql::Text(v.to_string())),
        })
    }
}

fn from_sqlite(value: ValueRef<'_>, column: &str) -> RepoResult<Value> {
    Ok(match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(v) => Value::I64(v),
        ValueRef::Real(v) => Value::F64(v),
        ValueRef::Text(t) => Value::Text(
            std::str::from_utf8(t)
                .map_err(|e| RepoError::decode(column, e.to_string()))?
                .to_string(),
        ),
        ValueRef::Blob(b) => Value::Bytes(b.to_vec()),
    })
}
