//! # sqlrepo
//!
//! A repository layer over several SQL dialects.
//!
//! ## Features
//!
//! - **Entity metadata**: `#[derive(Entity)]` describes the table, keys and
//!   computed columns; resolution is cached once per type
//! - **CRUD without SQL**: get, list, insert (with generated-key write-back),
//!   full and partial update, delete
//! - **Dialect adapters**: SQL Server, Oracle, MySQL, SQLite and PostgreSQL
//!   quoting, parameter sigils, pagination and identity retrieval
//! - **Pagination**: count and page statements from a table or an arbitrary
//!   select
//! - **Change tracking**: `Tracked<T>` skips updates of unchanged entities
//! - **Raw SQL**: execute, scalar, query and multi-result paging
//! - **Transactions**: the `transaction!` macro commits on `Ok` and rolls back
//!   on `Err`
//!
//! ```ignore
//! use sqlrepo::{ConnectionFactory, DatabaseConfig, Entity, PageParam, Repository};
//!
//! #[derive(Debug, Entity)]
//! #[orm(table = "users")]
//! struct User {
//!     #[orm(key)]
//!     id: i64,
//!     name: String,
//! }
//!
//! let config = DatabaseConfig::load("sqlrepo.toml")?;
//! let repo = Repository::from_config(&config, &ConnectionFactory::with_defaults())?;
//!
//! let mut user = User { id: 0, name: "alice".into() };
//! repo.insert(&mut user).await?;
//!
//! let mut page = PageParam::new(1, 20).sort("id");
//! let users: Vec<User> = repo.get_page("users", "*", "", &mut page).await?;
//! ```

pub mod adapter;
pub mod builder;
pub mod config;
pub mod connection;
pub mod dialect;
pub mod driver;
pub mod entity;
pub mod error;
pub mod executor;
pub mod metadata;
pub mod pager;
pub mod params;
pub mod repository;
pub mod row;
pub mod tracked;
pub mod transaction;
pub mod value;

pub use adapter::{AdapterRegistry, InsertPlan, KeyRetrieval, SqlAdapter, default_adapter};
pub use builder::SqlBuilder;
pub use config::{ConnectionConfig, DatabaseConfig};
pub use connection::{ConnectionFactory, DbConnection, Driver};
pub use dialect::DatabaseType;
pub use entity::Entity;
pub use error::{RepoError, RepoResult};
pub use executor::{Command, QueryExecutor};
pub use metadata::{ColumnKind, EntityDescriptor, EntityMetadata, FieldDescriptor, metadata_of};
pub use pager::{Page, PageParam, Pager};
pub use params::{Params, ToParams};
pub use repository::Repository;
pub use row::{FromRow, Row};
pub use tracked::{Tracked, make_tracked};
pub use transaction::Transaction;
pub use value::{FromValue, Value};

#[cfg(feature = "postgres")]
pub use driver::PgExecutor;
#[cfg(feature = "sqlite")]
pub use driver::SqliteExecutor;
#[cfg(feature = "pool")]
pub use driver::{create_pool, create_pool_with_config};

#[cfg(feature = "derive")]
pub use sqlrepo_derive::{Entity, FromRow, Params};

// Re-export inventory for use by derive macros
pub use inventory;
