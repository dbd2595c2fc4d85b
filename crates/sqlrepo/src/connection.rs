//! Lazily opened connections and the `DatabaseType -> driver` table.

use crate::dialect::DatabaseType;
use crate::error::{RepoError, RepoResult};
use crate::executor::{Command, QueryExecutor};
use crate::row::Row;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::OnceCell;

#[cfg(feature = "postgres")]
use crate::driver::PgExecutor;
#[cfg(feature = "sqlite")]
use crate::driver::SqliteExecutor;

/// An open driver connection.
#[derive(Debug)]
#[non_exhaustive]
pub enum Driver {
    #[cfg(feature = "sqlite")]
    Sqlite(SqliteExecutor),
    #[cfg(feature = "postgres")]
    Postgres(PgExecutor),
}

macro_rules! dispatch {
    ($driver:expr, $inner:ident => $call:expr) => {
        match $driver {
            #[cfg(feature = "sqlite")]
            Driver::Sqlite($inner) => $call,
            #[cfg(feature = "postgres")]
            Driver::Postgres($inner) => $call,
        }
    };
}

impl QueryExecutor for Driver {
    fn database_type(&self) -> DatabaseType {
        dispatch!(self, d => d.database_type())
    }

    async fn execute(&self, cmd: Command<'_>) -> RepoResult<u64> {
        dispatch!(self, d => d.execute(cmd).await)
    }

    async fn query(&self, cmd: Command<'_>) -> RepoResult<Vec<Row>> {
        dispatch!(self, d => d.query(cmd).await)
    }

    async fn query_multiple(&self, cmd: Command<'_>) -> RepoResult<Vec<Vec<Row>>> {
        dispatch!(self, d => d.query_multiple(cmd).await)
    }
}

/// Boxed future returned by a [`Connector`].
pub type ConnectFuture = Pin<Box<dyn Future<Output = RepoResult<Driver>> + Send>>;

/// Opens a driver from a connection string.
pub type Connector = Arc<dyn Fn(String) -> ConnectFuture + Send + Sync>;

/// A connection that opens on first use.
///
/// The driver is created at most once; concurrent first uses wait on the
/// same open.
pub struct DbConnection {
    database_type: DatabaseType,
    connection_string: String,
    connector: Connector,
    driver: OnceCell<Driver>,
}

impl fmt::Debug for DbConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConnection")
            .field("database_type", &self.database_type)
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}

impl DbConnection {
    pub fn is_open(&self) -> bool {
        self.driver.initialized()
    }

    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }

    async fn driver(&self) -> RepoResult<&Driver> {
        self.driver
            .get_or_try_init(|| {
                tracing::debug!(
                    target: "sqlrepo.sql",
                    database_type = self.database_type.as_str(),
                    "opening connection"
                );
                (self.connector)(self.connection_string.clone())
            })
            .await
    }
}

impl QueryExecutor for DbConnection {
    fn database_type(&self) -> DatabaseType {
        self.database_type
    }

    async fn open(&self) -> RepoResult<()> {
        self.driver().await.map(|_| ())
    }

    async fn execute(&self, cmd: Command<'_>) -> RepoResult<u64> {
        self.driver().await?.execute(cmd).await
    }

    async fn query(&self, cmd: Command<'_>) -> RepoResult<Vec<Row>> {
        self.driver().await?.query(cmd).await
    }

    async fn query_multiple(&self, cmd: Command<'_>) -> RepoResult<Vec<Vec<Row>>> {
        self.driver().await?.query_multiple(cmd).await
    }
}

/// `DatabaseType -> driver constructor` table.
#[derive(Clone, Default)]
pub struct ConnectionFactory {
    connectors: HashMap<DatabaseType, Connector>,
}

impl fmt::Debug for ConnectionFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<_> = self.connectors.keys().map(|t| t.as_str()).collect();
        types.sort_unstable();
        f.debug_struct("ConnectionFactory")
            .field("database_types", &types)
            .finish()
    }
}

impl ConnectionFactory {
    /// An empty factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// A factory with every compiled-in driver registered.
    pub fn with_defaults() -> Self {
        #[allow(unused_mut)]
        let mut factory = Self::new();
        #[cfg(feature = "sqlite")]
        factory.register(DatabaseType::Sqlite, |conn_str| async move {
            SqliteExecutor::open_connection_string(&conn_str).map(Driver::Sqlite)
        });
        #[cfg(feature = "postgres")]
        factory.register(DatabaseType::PostgreSql, |conn_str| async move {
            PgExecutor::connect(&conn_str).await.map(Driver::Postgres)
        });
        factory
    }

    /// Register (or replace) the driver constructor for `database_type`.
    pub fn register<F, Fut>(&mut self, database_type: DatabaseType, connect: F) -> &mut Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = RepoResult<Driver>> + Send + 'static,
    {
        let connector: Connector =
            Arc::new(move |conn_str| -> ConnectFuture { Box::pin(connect(conn_str)) });
        self.connectors.insert(database_type, connector);
        self
    }

    pub fn supports(&self, database_type: DatabaseType) -> bool {
        self.connectors.contains_key(&database_type)
    }

    /// An unopened connection; the driver opens on first use.
    pub fn create(&self, database_type: DatabaseType, connection_string: impl Into<String>) -> RepoResult<DbConnection> {
        let connector = self.connectors.get(&database_type).cloned().ok_or_else(|| {
            RepoError::Connection(format!("no driver registered for {database_type}"))
        })?;
        Ok(DbConnection {
            database_type,
            connection_string: connection_string.into(),
            connector,
            driver: OnceCell::new(),
        })
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use crate::params::Params;

    #[test]
    fn unregistered_type_is_a_connection_error() {
        let factory = ConnectionFactory::with_defaults();
        assert!(!factory.supports(DatabaseType::Oracle));
        let err = factory.create(DatabaseType::Oracle, "x").unwrap_err();
        assert!(matches!(err, RepoError::Connection(_)));
    }

    #[tokio::test]
    async fn opens_on_first_use() {
        let factory = ConnectionFactory::with_defaults();
        let conn = factory.create(DatabaseType::Sqlite, ":memory:").unwrap();
        assert!(!conn.is_open());

        let none = Params::new();
        let v = conn
            .query_scalar(Command::new("SELECT 41 + 1", &none))
            .await
            .unwrap();
        assert!(conn.is_open());
        assert_eq!(v.as_i64(), Some(42));
    }
}
