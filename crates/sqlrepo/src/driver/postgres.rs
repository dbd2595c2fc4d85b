//! PostgreSQL through `tokio-postgres` (and `deadpool-postgres` with the
//! `pool` feature).
//!
//! Named placeholders are rewritten to `$n` per statement; a batch is split
//! on `;` and run statement by statement.

use crate::dialect::DatabaseType;
use crate::error::{RepoError, RepoResult};
use crate::executor::{Command, QueryExecutor, log_command, scan_placeholders, split_statements};
use crate::row::Row;
use crate::value::Value;
use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio_postgres::Client;
use tokio_postgres::types::{IsNull, ToSql, Type};
use uuid::Uuid;

/// A single `tokio-postgres` connection.
pub struct PgExecutor {
    client: Client,
}

impl std::fmt::Debug for PgExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgExecutor")
            .field("closed", &self.client.is_closed())
            .finish()
    }
}

impl PgExecutor {
    /// Connect with `NoTls`.
    ///
    /// Accepts URLs (`postgres://...`), libpq key/value strings, and
    /// ADO-style `Host=...;Username=...;Database=...` strings.
    pub async fn connect(conn_str: &str) -> RepoResult<Self> {
        let pg_config: tokio_postgres::Config = normalize_connection_string(conn_str)
            .parse()
            .map_err(|e: tokio_postgres::Error| RepoError::Connection(e.to_string()))?;

        let (client, connection) = pg_config
            .connect(tokio_postgres::NoTls)
            .await
            .map_err(|e| RepoError::Connection(e.to_string()))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(target: "sqlrepo.sql", error = %e, "postgres connection error");
            }
        });

        Ok(Self { client })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl QueryExecutor for PgExecutor {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::PostgreSql
    }

    async fn execute(&self, cmd: Command<'_>) -> RepoResult<u64> {
        execute_on(&self.client, cmd).await
    }

    async fn query(&self, cmd: Command<'_>) -> RepoResult<Vec<Row>> {
        query_on(&self.client, cmd).await
    }

    async fn query_multiple(&self, cmd: Command<'_>) -> RepoResult<Vec<Vec<Row>>> {
        query_multiple_on(&self.client, cmd).await
    }
}

#[cfg(feature = "pool")]
impl QueryExecutor for deadpool_postgres::Object {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::PostgreSql
    }

    async fn execute(&self, cmd: Command<'_>) -> RepoResult<u64> {
        execute_on(self, cmd).await
    }

    async fn query(&self, cmd: Command<'_>) -> RepoResult<Vec<Row>> {
        query_on(self, cmd).await
    }

    async fn query_multiple(&self, cmd: Command<'_>) -> RepoResult<Vec<Vec<Row>>> {
        query_multiple_on(self, cmd).await
    }
}

/// Create a `NoTls` pool with a max size of 16.
#[cfg(feature = "pool")]
pub fn create_pool(database_url: &str) -> RepoResult<deadpool_postgres::Pool> {
    create_pool_with_config(database_url, 16)
}

/// Create a `NoTls` pool with `max_size` connections.
#[cfg(feature = "pool")]
pub fn create_pool_with_config(database_url: &str, max_size: usize) -> RepoResult<deadpool_postgres::Pool> {
    use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};

    let pg_config: tokio_postgres::Config = normalize_connection_string(database_url)
        .parse()
        .map_err(|e: tokio_postgres::Error| RepoError::Connection(e.to_string()))?;
    let mgr = Manager::from_config(
        pg_config,
        tokio_postgres::NoTls,
        ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        },
    );
    Pool::builder(mgr)
        .max_size(max_size)
        .build()
        .map_err(|e| RepoError::Pool(e.to_string()))
}

/// A statement with `$n` placeholders and the values to bind.
struct Prepared<'a> {
    sql: String,
    values: Vec<&'a Value>,
}

fn prepare<'a>(statement: &str, cmd: &Command<'a>) -> RepoResult<Prepared<'a>> {
    let mut names: Vec<String> = Vec::new();
    let mut values: Vec<&'a Value> = Vec::new();
    let mut missing: Option<String> = None;

    let params = cmd.params;
    let sql = scan_placeholders(statement, DatabaseType::PostgreSql, |name| {
        if let Some(pos) = names.iter().position(|n| n == name) {
            return Some(format!("${}", pos + 1));
        }
        match params.get_ignore_case(name) {
            Some(value) => {
                names.push(name.to_string());
                values.push(value);
                Some(format!("${}", names.len()))
            }
            None => {
                missing.get_or_insert_with(|| name.to_string());
                None
            }
        }
    });

    match missing {
        Some(name) => Err(RepoError::query(format!("missing parameter `{name}`"))),
        None => Ok(Prepared { sql, values }),
    }
}

fn bind<'v>(values: &'v [&'v Value]) -> Vec<&'v (dyn ToSql + Sync)> {
    values.iter().map(|v| *v as &(dyn ToSql + Sync)).collect()
}

async fn execute_on(client: &Client, cmd: Command<'_>) -> RepoResult<u64> {
    log_command(DatabaseType::PostgreSql, &cmd);
    with_cancel(client, cmd.timeout, async {
        let mut affected = 0;
        for statement in split_statements(cmd.sql, DatabaseType::PostgreSql) {
            let prepared = prepare(statement, &cmd)?;
            affected += client.execute(prepared.sql.as_str(), &bind(&prepared.values)).await?;
        }
        Ok(affected)
    })
    .await
}

async fn query_on(client: &Client, cmd: Command<'_>) -> RepoResult<Vec<Row>> {
    let sets = query_multiple_on(client, cmd).await?;
    Ok(sets.into_iter().next().unwrap_or_default())
}

async fn query_multiple_on(client: &Client, cmd: Command<'_>) -> RepoResult<Vec<Vec<Row>>> {
    log_command(DatabaseType::PostgreSql, &cmd);
    with_cancel(client, cmd.timeout, async {
        let mut sets = Vec::new();
        for statement in split_statements(cmd.sql, DatabaseType::PostgreSql) {
            let prepared = prepare(statement, &cmd)?;
            let stmt = client.prepare(&prepared.sql).await?;
            let rows = client.query(&stmt, &bind(&prepared.values)).await?;
            if stmt.columns().is_empty() {
                continue;
            }
            let columns: Arc<[String]> = stmt
                .columns()
                .iter()
                .map(|c| c.name().to_string())
                .collect::<Vec<_>>()
                .into();
            let mut set = Vec::with_capacity(rows.len());
            for row in &rows {
                set.push(convert_row(row, &columns)?);
            }
            sets.push(set);
        }
        Ok(sets)
    })
    .await
}

/// Like [`with_timeout`](crate::executor::with_timeout), also cancelling the
/// server-side query when the deadline passes.
async fn with_cancel<T, F>(client: &Client, timeout: Option<Duration>, future: F) -> RepoResult<T>
where
    F: std::future::Future<Output = RepoResult<T>> + Send,
{
    match timeout {
        Some(timeout) => {
            tokio::pin!(future);
            tokio::select! {
                result = &mut future => result,
                _ = tokio::time::sleep(timeout) => {
                    let cancel_token = client.cancel_token();
                    tokio::spawn(async move {
                        let _ = cancel_token.cancel_query(tokio_postgres::NoTls).await;
                    });
                    Err(RepoError::Timeout(timeout))
                }
            }
        }
        None => future.await,
    }
}

fn convert_row(row: &tokio_postgres::Row, columns: &Arc<[String]>) -> RepoResult<Row> {
    let mut values = Vec::with_capacity(columns.len());
    for (i, column) in row.columns().iter().enumerate() {
        values.push(read_cell(row, i, column.type_(), column.name())?);
    }
    Ok(Row::new(Arc::clone(columns), values))
}

fn read_cell(row: &tokio_postgres::Row, i: usize, ty: &Type, name: &str) -> RepoResult<Value> {
    fn get<'r, T>(row: &'r tokio_postgres::Row, i: usize, name: &str) -> RepoResult<Option<T>>
    where
        T: tokio_postgres::types::FromSql<'r>,
    {
        row.try_get::<_, Option<T>>(i)
            .map_err(|e| RepoError::decode(name, e.to_string()))
    }

    let value = match *ty {
        Type::BOOL => get::<bool>(row, i, name)?.map(Value::Bool),
        Type::INT2 => get::<i16>(row, i, name)?.map(Value::from),
        Type::INT4 => get::<i32>(row, i, name)?.map(Value::from),
        Type::INT8 => get::<i64>(row, i, name)?.map(Value::I64),
        Type::OID => get::<u32>(row, i, name)?.map(Value::from),
        Type::FLOAT4 => get::<f32>(row, i, name)?.map(Value::from),
        Type::FLOAT8 => get::<f64>(row, i, name)?.map(Value::F64),
        Type::NUMERIC => get::<Decimal>(row, i, name)?.map(Value::Decimal),
        Type::BYTEA => get::<Vec<u8>>(row, i, name)?.map(Value::Bytes),
        Type::UUID => get::<Uuid>(row, i, name)?.map(Value::Uuid),
        Type::DATE => get::<NaiveDate>(row, i, name)?.map(Value::Date),
        Type::TIMESTAMP => get::<NaiveDateTime>(row, i, name)?.map(Value::Timestamp),
        Type::TIMESTAMPTZ => get::<DateTime<Utc>>(row, i, name)?.map(Value::TimestampTz),
        Type::JSON | Type::JSONB => get::<serde_json::Value>(row, i, name)?.map(Value::Json),
        _ => get::<String>(row, i, name)?.map(Value::Text),
    };
    Ok(value.unwrap_or(Value::Null))
}

type BoxError = Box<dyn Error + Sync + Send>;

fn narrow<T: TryFrom<i64>>(v: i64, ty: &Type) -> Result<T, BoxError> {
    T::try_from(v).map_err(|_| format!("value {v} out of range for {ty}").into())
}

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(v) => v.to_sql(ty, out),
            Value::I64(v) => match *ty {
                Type::INT2 => narrow::<i16>(*v, ty)?.to_sql(ty, out),
                Type::INT4 => narrow::<i32>(*v, ty)?.to_sql(ty, out),
                Type::OID => narrow::<u32>(*v, ty)?.to_sql(ty, out),
                Type::FLOAT4 => (*v as f32).to_sql(ty, out),
                Type::FLOAT8 => (*v as f64).to_sql(ty, out),
                Type::BOOL => (*v != 0).to_sql(ty, out),
                Type::NUMERIC => Decimal::from(*v).to_sql(ty, out),
                Type::TEXT | Type::VARCHAR | Type::BPCHAR => v.to_string().to_sql(ty, out),
                _ => v.to_sql(ty, out),
            },
            Value::F64(v) => match *ty {
                Type::FLOAT4 => (*v as f32).to_sql(ty, out),
                Type::NUMERIC => Decimal::try_from(*v)?.to_sql(ty, out),
                _ => v.to_sql(ty, out),
            },
            Value::Decimal(v) => match *ty {
                Type::FLOAT4 => f32::try_from(*v)?.to_sql(ty, out),
                Type::FLOAT8 => f64::try_from(*v)?.to_sql(ty, out),
                Type::INT2 => narrow::<i16>(i64::try_from(*v)?, ty)?.to_sql(ty, out),
                Type::INT4 => narrow::<i32>(i64::try_from(*v)?, ty)?.to_sql(ty, out),
                Type::INT8 => i64::try_from(*v)?.to_sql(ty, out),
                Type::TEXT | Type::VARCHAR | Type::BPCHAR => v.to_string().to_sql(ty, out),
                _ => v.to_sql(ty, out),
            },
            Value::Text(v) => match *ty {
                Type::UUID => Uuid::parse_str(v)?.to_sql(ty, out),
                Type::JSON | Type::JSONB => serde_json::from_str::<serde_json::Value>(v)?.to_sql(ty, out),
                _ => v.to_sql(ty, out),
            },
            Value::Bytes(v) => v.to_sql(ty, out),
            Value::Uuid(v) => match *ty {
                Type::TEXT | Type::VARCHAR | Type::BPCHAR => v.to_string().to_sql(ty, out),
                _ => v.to_sql(ty, out),
            },
            Value::Date(v) => v.to_sql(ty, out),
            Value::Timestamp(v) => match *ty {
                Type::TIMESTAMPTZ => v.and_utc().to_sql(ty, out),
                _ => v.to_sql(ty, out),
            },
            Value::TimestampTz(v) => match *ty {
                Type::TIMESTAMP => v.naive_utc().to_sql(ty, out),
                _ => v.to_sql(ty, out),
            },
            Value::Json(v) => v.to_sql(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    tokio_postgres::types::to_sql_checked!();
}

/// Translate ADO-style `Key=Value;` connection strings into libpq form.
/// URLs and libpq strings pass through unchanged.
fn normalize_connection_string(conn_str: &str) -> String {
    let trimmed = conn_str.trim();
    if trimmed.starts_with("postgres://") || trimmed.starts_with("postgresql://") || !trimmed.contains(';') {
        return trimmed.to_string();
    }
    trimmed
        .split(';')
        .filter_map(|part| part.split_once('='))
        .filter_map(|(key, value)| {
            let key = match key.trim().to_ascii_lowercase().as_str() {
                "host" | "server" => "host",
                "port" => "port",
                "username" | "user id" | "userid" | "user" => "user",
                "password" | "pwd" => "password",
                "database" | "initial catalog" => "dbname",
                "timeout" => "connect_timeout",
                "application name" => "application_name",
                _ => return None,
            };
            Some(format!("{key}='{}'", value.trim().replace('\'', "\\'")))
        })
        .collect::<Vec<_>>()
        .join(" ")
}
