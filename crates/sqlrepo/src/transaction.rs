//! Pass-through transactions.
//!
//! A [`Transaction`] issues the adapter's BEGIN on an executor and then runs
//! every statement on that same executor until `commit` or `rollback`.
//!
//! ```ignore
//! let order_id = sqlrepo::transaction!(repo, tx, {
//!     let id = tx.insert(&mut order).await?;
//!     tx.insert_many(&lines).await?;
//!     Ok(id)
//! })?;
//! ```

use crate::adapter::SqlAdapter;
use crate::dialect::DatabaseType;
use crate::error::RepoResult;
use crate::executor::{Command, QueryExecutor};
use crate::params::Params;
use crate::row::Row;

/// Runs the block inside a transaction on a [`Repository`](crate::Repository).
///
/// `$tx` is bound to a repository over the transaction. The block must
/// evaluate to `RepoResult<T>`; `Ok` commits and `Err` rolls back.
#[macro_export]
macro_rules! transaction {
    ($repo:expr, $tx:ident, $body:block) => {{
        let __sqlrepo_repo = &$repo;
        let __sqlrepo_tx = __sqlrepo_repo.begin_transaction().await?;
        let __sqlrepo_result = {
            let $tx = __sqlrepo_repo.with_executor(&__sqlrepo_tx);
            async { $body }.await
        };
        match __sqlrepo_result {
            Ok(value) => {
                __sqlrepo_tx.commit().await?;
                Ok(value)
            }
            Err(error) => match __sqlrepo_tx.rollback().await {
                Ok(()) => Err(error),
                Err(rollback_err) => Err($crate::RepoError::Other(format!(
                    "{error} (rollback failed: {rollback_err})"
                ))),
            },
        }
    }};
}

/// An open transaction on `E`.
///
/// Dropping it without `commit` or `rollback` leaves the transaction open on
/// the connection and logs a warning.
#[derive(Debug)]
pub struct Transaction<'a, E: QueryExecutor> {
    executor: &'a E,
    commit_sql: &'static str,
    rollback_sql: &'static str,
    finished: bool,
}

impl<'a, E: QueryExecutor> Transaction<'a, E> {
    /// Open the connection if needed and issue `adapter`'s BEGIN.
    pub async fn begin(executor: &'a E, adapter: &dyn SqlAdapter) -> RepoResult<Self> {
        executor.open().await?;
        executor
            .execute(Command::new(adapter.begin_sql(), &Params::new()))
            .await?;
        Ok(Self {
            executor,
            commit_sql: adapter.commit_sql(),
            rollback_sql: adapter.rollback_sql(),
            finished: false,
        })
    }

    pub async fn commit(mut self) -> RepoResult<()> {
        self.finished = true;
        self.executor
            .execute(Command::new(self.commit_sql, &Params::new()))
            .await
            .map(|_| ())
    }

    pub async fn rollback(mut self) -> RepoResult<()> {
        self.finished = true;
        self.executor
            .execute(Command::new(self.rollback_sql, &Params::new()))
            .await
            .map(|_| ())
    }
}

impl<E: QueryExecutor> Drop for Transaction<'_, E> {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!(
                target: "sqlrepo.sql",
                database_type = self.executor.database_type().as_str(),
                "transaction dropped without commit or rollback"
            );
        }
    }
}

impl<E: QueryExecutor> QueryExecutor for Transaction<'_, E> {
    fn database_type(&self) -> DatabaseType {
        self.executor.database_type()
    }

    async fn execute(&self, cmd: Command<'_>) -> RepoResult<u64> {
        self.executor.execute(cmd).await
    }

    async fn query(&self, cmd: Command<'_>) -> RepoResult<Vec<Row>> {
        self.executor.query(cmd).await
    }

    async fn query_multiple(&self, cmd: Command<'_>) -> RepoResult<Vec<Vec<Row>>> {
        self.executor.query_multiple(cmd).await
    }
}
