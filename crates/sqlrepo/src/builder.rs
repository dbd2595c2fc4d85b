//! CRUD statement text from entity metadata.
//!
//! Builders are synchronous and side-effect free. Every placeholder is named
//! after its column, so an entity's [`ToParams`](crate::params::ToParams)
//! output binds directly.

use crate::adapter::SqlAdapter;
use crate::error::{RepoError, RepoResult};
use crate::metadata::EntityMetadata;
use crate::params::Params;

/// Suffix appended to filter placeholders in self-joined partial updates.
pub const SELF_JOIN_SUFFIX: &str = "2";

/// Statement builder bound to one dialect.
#[derive(Debug, Clone, Copy)]
pub struct SqlBuilder<'a> {
    adapter: &'a dyn SqlAdapter,
}

impl<'a> SqlBuilder<'a> {
    pub fn new(adapter: &'a dyn SqlAdapter) -> Self {
        Self { adapter }
    }

    pub fn adapter(&self) -> &'a dyn SqlAdapter {
        self.adapter
    }

    fn equals_list<'n>(&self, names: impl IntoIterator<Item = &'n str>, sep: &str) -> String {
        names
            .into_iter()
            .map(|n| self.adapter.column_equals(n, n))
            .collect::<Vec<_>>()
            .join(sep)
    }

    /// `SELECT * FROM <table> WHERE <key> = @<key>`.
    pub fn build_get(&self, meta: &EntityMetadata) -> RepoResult<String> {
        let key = meta.single_key("get")?;
        Ok(format!(
            "SELECT * FROM {} WHERE {}",
            meta.table(),
            self.adapter.column_equals(key, key)
        ))
    }

    /// Equality filter over the filter object's parameter names, joined with
    /// `AND`, or `OR` when `or_mode` is set.
    pub fn build_get_list(&self, meta: &EntityMetadata, filter: &Params, or_mode: bool) -> RepoResult<String> {
        if filter.is_empty() {
            return Err(RepoError::configuration(format!(
                "get_list on `{}`: filter has no fields",
                meta.table()
            )));
        }
        let sep = if or_mode { " OR " } else { " AND " };
        Ok(format!(
            "SELECT * FROM {} WHERE {}",
            meta.table(),
            self.equals_list(filter.names(), sep)
        ))
    }

    pub fn build_get_all(&self, meta: &EntityMetadata) -> String {
        format!("SELECT * FROM {}", meta.table())
    }

    /// `(column_list, parameter_list)` for INSERT: every column except
    /// generated keys and computed columns.
    pub fn build_insert(&self, meta: &EntityMetadata) -> (String, String) {
        let columns = meta.insert_columns();
        let column_list = columns
            .iter()
            .map(|c| self.adapter.quote_column(c))
            .collect::<Vec<_>>()
            .join(", ");
        let parameter_list = columns
            .iter()
            .map(|c| self.adapter.placeholder(c))
            .collect::<Vec<_>>()
            .join(", ");
        (column_list, parameter_list)
    }

    /// Full-row UPDATE keyed on key and explicit-key columns.
    pub fn build_update(&self, meta: &EntityMetadata) -> RepoResult<String> {
        let keys = meta.require_identity("update")?;
        let set: Vec<&str> = meta.writable_columns().iter().map(String::as_str).collect();
        if set.is_empty() {
            return Err(RepoError::configuration(format!(
                "update on `{}`: no writable columns",
                meta.table()
            )));
        }
        Ok(format!(
            "UPDATE {} SET {} WHERE {}",
            meta.table(),
            self.equals_list(set, ", "),
            self.equals_list(keys, " AND ")
        ))
    }

    /// UPDATE of the columns named by `data`.
    ///
    /// The WHERE clause comes from `filter`, or from the entity's identity
    /// columns (whose values must then be present in `data`). With
    /// `self_join`, filter placeholders carry [`SELF_JOIN_SUFFIX`] so a
    /// column can be both assigned and filtered on. Returns the statement and
    /// the merged parameters to bind.
    pub fn build_partial_update(
        &self,
        meta: &EntityMetadata,
        data: &Params,
        filter: Option<&Params>,
        self_join: bool,
    ) -> RepoResult<(String, Params)> {
        if data.is_empty() {
            return Err(RepoError::configuration(format!(
                "update_partial on `{}`: data has no fields",
                meta.table()
            )));
        }
        let mut params = data.clone();
        let set = self.equals_list(data.names(), ", ");

        let predicate = match filter {
            None => self.equals_list(meta.require_identity("update_partial")?, " AND "),
            Some(filter) if filter.is_empty() => {
                return Err(RepoError::configuration(format!(
                    "update_partial on `{}`: filter has no fields",
                    meta.table()
                )));
            }
            Some(filter) if self_join => {
                let mut parts = Vec::with_capacity(filter.len());
                for (name, value) in filter.iter() {
                    let suffixed = format!("{name}{SELF_JOIN_SUFFIX}");
                    parts.push(self.adapter.column_equals(name, &suffixed));
                    params.add(suffixed, value.clone());
                }
                parts.join(" AND ")
            }
            Some(filter) => {
                params.extend(filter.clone());
                self.equals_list(filter.names(), " AND ")
            }
        };

        Ok((
            format!("UPDATE {} SET {set} WHERE {predicate}", meta.table()),
            params,
        ))
    }

    /// DELETE keyed on key and explicit-key columns.
    pub fn build_delete(&self, meta: &EntityMetadata) -> RepoResult<String> {
        let keys = meta.require_identity("delete")?;
        Ok(format!(
            "DELETE FROM {} WHERE {}",
            meta.table(),
            self.equals_list(keys, " AND ")
        ))
    }

    /// DELETE filtered by the filter object's parameter names.
    pub fn build_delete_by(&self, meta: &EntityMetadata, filter: &Params) -> RepoResult<String> {
        if filter.is_empty() {
            return Err(RepoError::configuration(format!(
                "delete_by on `{}`: filter has no fields; use delete_all",
                meta.table()
            )));
        }
        Ok(format!(
            "DELETE FROM {} WHERE {}",
            meta.table(),
            self.equals_list(filter.names(), " AND ")
        ))
    }

    pub fn build_delete_all(&self, meta: &EntityMetadata) -> String {
        format!("DELETE FROM {}", meta.table())
    }
}

#[cfg(test)]
mod tests;
