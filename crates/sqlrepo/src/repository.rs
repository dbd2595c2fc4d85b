//! The repository: CRUD, paging and raw SQL over any [`QueryExecutor`].

use crate::adapter::{KeyRetrieval, SqlAdapter, default_adapter, plain_insert};
use crate::builder::SqlBuilder;
use crate::config::DatabaseConfig;
use crate::connection::{ConnectionFactory, DbConnection};
use crate::dialect::DatabaseType;
use crate::entity::Entity;
use crate::error::{RepoError, RepoResult};
use crate::executor::{Command, QueryExecutor};
use crate::metadata::{EntityMetadata, metadata_of};
use crate::pager::{Page, PageParam, Pager};
use crate::params::{Params, ToParams};
use crate::row::{FromRow, Row};
use crate::tracked::Tracked;
use crate::transaction::Transaction;
use crate::value::Value;
use std::sync::Arc;
use std::time::Duration;

/// Data access for one database.
///
/// `E` is usually a [`DbConnection`], a driver executor, or a reference to a
/// [`Transaction`]. Typed methods take the entity type as a generic
/// parameter; the SQL they run comes from the entity's cached metadata and
/// the repository's dialect adapter.
#[derive(Debug, Clone)]
pub struct Repository<E> {
    executor: E,
    adapter: Arc<dyn SqlAdapter>,
    command_timeout: Option<Duration>,
}

impl<E> Repository<E> {
    pub fn new(executor: E, adapter: Arc<dyn SqlAdapter>) -> Self {
        Self {
            executor,
            adapter,
            command_timeout: None,
        }
    }

    /// Timeout forwarded with every command.
    pub fn command_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn adapter(&self) -> &Arc<dyn SqlAdapter> {
        &self.adapter
    }

    pub fn database_type(&self) -> DatabaseType {
        self.adapter.database_type()
    }

    /// The same dialect and timeout over another executor, typically a
    /// transaction.
    pub fn with_executor<E2>(&self, executor: E2) -> Repository<E2> {
        Repository {
            executor,
            adapter: Arc::clone(&self.adapter),
            command_timeout: self.command_timeout,
        }
    }

    pub fn builder(&self) -> SqlBuilder<'_> {
        SqlBuilder::new(self.adapter.as_ref())
    }

    fn cmd<'a>(&self, sql: &'a str, params: &'a Params) -> Command<'a> {
        Command::new(sql, params).timeout(self.command_timeout)
    }
}

impl Repository<DbConnection> {
    /// Connect lazily to the config's default database.
    pub fn from_config(config: &DatabaseConfig, factory: &ConnectionFactory) -> RepoResult<Self> {
        let conn = factory.create(config.database_type, config.connection_string.clone())?;
        Ok(Repository::new(conn, default_adapter(config.database_type)).command_timeout(config.timeout()))
    }

    /// Switch to the named connection in `config`.
    pub fn use_database(
        &mut self,
        config: &DatabaseConfig,
        name: &str,
        factory: &ConnectionFactory,
    ) -> RepoResult<()> {
        let target = config.resolve(name)?;
        *self = Self::from_config(&target, factory)?;
        tracing::debug!(
            target: "sqlrepo.sql",
            name,
            database_type = target.database_type.as_str(),
            "switched database"
        );
        Ok(())
    }
}

impl<E: QueryExecutor> Repository<E> {
    // ─── Raw SQL ────────────────────────────────────────────────────────────

    /// Run a statement and return the number of affected rows.
    pub async fn execute(&self, sql: &str, params: &(impl ToParams + ?Sized)) -> RepoResult<u64> {
        let params = params.to_params();
        self.executor.execute(self.cmd(sql, &params)).await
    }

    /// First column of the first row, or `Value::Null`.
    pub async fn execute_scalar(&self, sql: &str, params: &(impl ToParams + ?Sized)) -> RepoResult<Value> {
        let params = params.to_params();
        self.executor.query_scalar(self.cmd(sql, &params)).await
    }

    pub async fn query(&self, sql: &str, params: &(impl ToParams + ?Sized)) -> RepoResult<Vec<Row>> {
        let params = params.to_params();
        self.executor.query(self.cmd(sql, &params)).await
    }

    pub async fn query_as<T: FromRow>(&self, sql: &str, params: &(impl ToParams + ?Sized)) -> RepoResult<Vec<T>> {
        let rows = self.query(sql, params).await?;
        rows.iter().map(T::from_row).collect()
    }

    pub async fn query_first(&self, sql: &str, params: &(impl ToParams + ?Sized)) -> RepoResult<Option<Row>> {
        let params = params.to_params();
        self.executor.query_opt(self.cmd(sql, &params)).await
    }

    pub async fn query_first_as<T: FromRow>(
        &self,
        sql: &str,
        params: &(impl ToParams + ?Sized),
    ) -> RepoResult<Option<T>> {
        self.query_first(sql, params)
            .await?
            .as_ref()
            .map(T::from_row)
            .transpose()
    }

    /// Run a two-statement batch: a count, then the page rows.
    pub async fn query_page<T: FromRow>(&self, sql: &str, params: &(impl ToParams + ?Sized)) -> RepoResult<Page<T>> {
        let params = params.to_params();
        let mut sets = self
            .executor
            .query_multiple(self.cmd(sql, &params))
            .await?
            .into_iter();
        let (Some(count), Some(rows)) = (sets.next(), sets.next()) else {
            return Err(RepoError::query(
                "query_page expects a count statement followed by a select",
            ));
        };
        let total = count
            .first()
            .map(|r| r.try_get_index::<u64>(0))
            .transpose()?
            .unwrap_or(0);
        let items = rows.iter().map(T::from_row).collect::<RepoResult<Vec<_>>>()?;
        Ok(Page { items, total })
    }

    /// Open the connection if needed and begin a transaction on it.
    pub async fn begin_transaction(&self) -> RepoResult<Transaction<'_, E>> {
        Transaction::begin(&self.executor, self.adapter.as_ref()).await
    }

    // ─── Reads ──────────────────────────────────────────────────────────────

    /// Load one entity by its single key.
    pub async fn get<T: Entity>(&self, id: impl Into<Value>) -> RepoResult<Option<T>> {
        let meta = metadata_of::<T>();
        let sql = self.builder().build_get(&meta)?;
        let key = meta.single_key("get")?;
        let params = Params::new().with(key, id);
        self.query_first_as::<T>(&sql, &params).await
    }

    /// [`get`](Self::get) wrapped for change tracking (clean).
    pub async fn get_tracked<T: Entity>(&self, id: impl Into<Value>) -> RepoResult<Option<Tracked<T>>> {
        Ok(self.get::<T>(id).await?.map(Tracked::loaded))
    }

    /// Entities whose columns equal the filter's fields (`AND`, or `OR`).
    pub async fn get_list<T: Entity>(&self, filter: &(impl ToParams + ?Sized), or_mode: bool) -> RepoResult<Vec<T>> {
        let meta = metadata_of::<T>();
        let params = filter.to_params();
        let sql = self.builder().build_get_list(&meta, &params, or_mode)?;
        self.query_as::<T>(&sql, &params).await
    }

    pub async fn get_all<T: Entity>(&self) -> RepoResult<Vec<T>> {
        let meta = metadata_of::<T>();
        let sql = self.builder().build_get_all(&meta);
        self.query_as::<T>(&sql, &Params::new()).await
    }

    pub async fn get_all_tracked<T: Entity>(&self) -> RepoResult<Vec<Tracked<T>>> {
        Ok(self
            .get_all::<T>()
            .await?
            .into_iter()
            .map(Tracked::loaded)
            .collect())
    }

    /// Count then fetch one page, filling `page.record_count`.
    pub async fn get_page<T: FromRow>(
        &self,
        table_or_sql: &str,
        fields: &str,
        filter: &str,
        page: &mut PageParam,
    ) -> RepoResult<Vec<T>> {
        let pager = Pager::new(table_or_sql, page.page_index, page.page_size)?
            .fields(fields)
            .filter(filter)
            .order_by(page.sort_condition.as_str());
        let (count_sql, data_sql) = pager.page_sql(self.adapter.as_ref())?;

        let total = self.execute_scalar(&count_sql, &()).await?;
        page.record_count = match total {
            Value::Null => 0,
            v => v
                .as_i64()
                .and_then(|n| u64::try_from(n).ok())
                .ok_or_else(|| RepoError::decode("total", format!("unexpected count {v:?}")))?,
        };
        self.query_as::<T>(&data_sql, &()).await
    }

    // ─── Writes ─────────────────────────────────────────────────────────────

    /// Insert `entity` and write the generated key back onto it.
    ///
    /// Returns the generated key (0 when none is recovered), or the affected
    /// row count for dialects without key recovery.
    pub async fn insert<T: Entity>(&self, entity: &mut T) -> RepoResult<i64> {
        let meta = metadata_of::<T>();
        let (columns, parameters) = self.builder().build_insert(&meta);
        let keys: Vec<&str> = meta.key_columns().iter().map(String::as_str).collect();
        let plan = self
            .adapter
            .insert_plan(meta.table(), &columns, &parameters, &keys);
        let params = entity.to_params();
        let cmd = self.cmd(&plan.sql, &params);

        match plan.key_retrieval {
            KeyRetrieval::AffectedRows => {
                let affected = self.executor.execute(cmd).await?;
                Ok(affected as i64)
            }
            KeyRetrieval::TrailingSelect => {
                let sets = self.executor.query_multiple(cmd).await?;
                let id = sets
                    .last()
                    .and_then(|set| set.first())
                    .and_then(|row| row.get("id").cloned())
                    .unwrap_or(Value::Null);
                write_back_single(entity, &meta, id)
            }
            KeyRetrieval::FollowUpQuery(follow_up) => {
                self.executor.execute(cmd).await?;
                let none = Params::new();
                let id = self
                    .executor
                    .query_scalar(self.cmd(&follow_up, &none))
                    .await?;
                write_back_single(entity, &meta, id)
            }
            KeyRetrieval::Returning => {
                let row = self.executor.query_opt(cmd).await?;
                let Some(row) = row else {
                    return Ok(0);
                };
                let mut first = 0;
                for key in &keys {
                    let value = row.get(key).cloned().unwrap_or(Value::Null);
                    if first == 0 {
                        first = value.as_i64().unwrap_or(0);
                    }
                    assign_key(entity, &meta, key, value)?;
                }
                Ok(first)
            }
        }
    }

    /// Insert every entity with one statement per element. Keys are not
    /// written back. Returns the summed affected rows.
    pub async fn insert_many<T: Entity>(&self, entities: &[T]) -> RepoResult<u64> {
        let meta = metadata_of::<T>();
        let (columns, parameters) = self.builder().build_insert(&meta);
        let sql = plain_insert(meta.table(), &columns, &parameters);
        let mut affected = 0;
        for entity in entities {
            let params = entity.to_params();
            affected += self.executor.execute(self.cmd(&sql, &params)).await?;
        }
        Ok(affected)
    }

    /// Write every writable column, keyed on the identity columns.
    pub async fn update<T: Entity>(&self, entity: &T) -> RepoResult<bool> {
        let meta = metadata_of::<T>();
        let sql = self.builder().build_update(&meta)?;
        let params = entity.to_params();
        Ok(self.executor.execute(self.cmd(&sql, &params)).await? > 0)
    }

    /// [`update`](Self::update), skipped when the entity is clean.
    pub async fn update_tracked<T: Entity>(&self, entity: &Tracked<T>) -> RepoResult<bool> {
        if !entity.is_dirty() {
            tracing::debug!(
                target: "sqlrepo.sql",
                table = metadata_of::<T>().table(),
                "skipping update of unchanged entity"
            );
            return Ok(false);
        }
        self.update::<T>(entity).await
    }

    /// Update each entity; true when any row changed.
    pub async fn update_many<T: Entity>(&self, entities: &[T]) -> RepoResult<bool> {
        let meta = metadata_of::<T>();
        let sql = self.builder().build_update(&meta)?;
        let mut affected = 0;
        for entity in entities {
            let params = entity.to_params();
            affected += self.executor.execute(self.cmd(&sql, &params)).await?;
        }
        Ok(affected > 0)
    }

    /// Update only the columns named by `data`.
    ///
    /// Rows are selected by `filter`, or by the entity's identity columns
    /// taken from `data` when `filter` is `None`. With `self_join`, filter
    /// values bind under suffixed names so the same column can be assigned
    /// and matched.
    pub async fn update_partial<T: Entity>(
        &self,
        data: &(impl ToParams + ?Sized),
        filter: Option<&dyn ToParams>,
        self_join: bool,
    ) -> RepoResult<bool> {
        let meta = metadata_of::<T>();
        let data = data.to_params();
        let filter = filter.map(|f| f.to_params());
        let (sql, params) = self
            .builder()
            .build_partial_update(&meta, &data, filter.as_ref(), self_join)?;
        Ok(self.executor.execute(self.cmd(&sql, &params)).await? > 0)
    }

    /// Delete by the entity's identity columns.
    pub async fn delete<T: Entity>(&self, entity: &T) -> RepoResult<bool> {
        let meta = metadata_of::<T>();
        let sql = self.builder().build_delete(&meta)?;
        let params = entity.to_params();
        Ok(self.executor.execute(self.cmd(&sql, &params)).await? > 0)
    }

    pub async fn delete_many<T: Entity>(&self, entities: &[T]) -> RepoResult<bool> {
        let meta = metadata_of::<T>();
        let sql = self.builder().build_delete(&meta)?;
        let mut affected = 0;
        for entity in entities {
            let params = entity.to_params();
            affected += self.executor.execute(self.cmd(&sql, &params)).await?;
        }
        Ok(affected > 0)
    }

    /// Delete rows whose columns equal the filter's fields.
    pub async fn delete_by<T: Entity>(&self, filter: &(impl ToParams + ?Sized)) -> RepoResult<bool> {
        let meta = metadata_of::<T>();
        let params = filter.to_params();
        let sql = self.builder().build_delete_by(&meta, &params)?;
        Ok(self.executor.execute(self.cmd(&sql, &params)).await? > 0)
    }

    pub async fn delete_all<T: Entity>(&self) -> RepoResult<bool> {
        let meta = metadata_of::<T>();
        let sql = self.builder().build_delete_all(&meta);
        let none = Params::new();
        Ok(self.executor.execute(self.cmd(&sql, &none)).await? > 0)
    }
}

fn write_back_single<T: Entity>(entity: &mut T, meta: &EntityMetadata, id: Value) -> RepoResult<i64> {
    if id.is_null() {
        return Ok(0);
    }
    let key_value = id.as_i64().unwrap_or(0);
    if let Some(key) = meta.key_columns().first() {
        assign_key(entity, meta, key, id)?;
    }
    Ok(key_value)
}

fn assign_key<T: Entity>(entity: &mut T, meta: &EntityMetadata, column: &str, value: Value) -> RepoResult<()> {
    if entity.set_column(column, value)? {
        Ok(())
    } else {
        Err(RepoError::configuration(format!(
            "insert into `{}`: no field maps onto generated key column `{column}`",
            meta.table()
        )))
    }
}

#[cfg(test)]
mod tests;
