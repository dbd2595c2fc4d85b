//! Database drivers behind [`QueryExecutor`](crate::executor::QueryExecutor).

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "postgres")]
pub use postgres::PgExecutor;
#[cfg(feature = "pool")]
pub use postgres::{create_pool, create_pool_with_config};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteExecutor;
