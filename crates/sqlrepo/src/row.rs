//! Row mapping traits and utilities

use crate::error::{RepoError, RepoResult};
use crate::value::{FromValue, Value};
use std::sync::Arc;

/// One result row: column names in select order plus their values.
///
/// Rows from one result set share the same `columns` allocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    /// Build a row from `(column, value)` pairs.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        let (columns, values): (Vec<String>, Vec<Value>) =
            pairs.into_iter().map(|(c, v)| (c.into(), v)).unzip();
        Self::new(columns.into(), values)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Position of `column`: exact match first, then ASCII case-insensitive.
    pub fn index_of(&self, column: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c == column)
            .or_else(|| {
                self.columns
                    .iter()
                    .position(|c| c.eq_ignore_ascii_case(column))
            })
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.index_of(column).map(|i| &self.values[i])
    }

    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Decode the named column.
    pub fn try_get<T: FromValue>(&self, column: &str) -> RepoResult<T> {
        let value = self
            .get(column)
            .cloned()
            .ok_or_else(|| RepoError::decode(column, "column not found in row"))?;
        T::from_value(value).map_err(|e| with_column(e, column))
    }

    /// Decode the column at `index`.
    pub fn try_get_index<T: FromValue>(&self, index: usize) -> RepoResult<T> {
        let column = self
            .columns
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("#{index}"));
        let value = self
            .values
            .get(index)
            .cloned()
            .ok_or_else(|| RepoError::decode(column.as_str(), "column index out of range"))?;
        T::from_value(value).map_err(|e| with_column(e, &column))
    }
}

fn with_column(err: RepoError, column: &str) -> RepoError {
    match err {
        RepoError::Decode { column: c, message } if c.is_empty() => RepoError::Decode {
            column: column.to_string(),
            message,
        },
        other => other,
    }
}

/// Trait for types that can be constructed from a result row.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> RepoResult<Self>;
}

impl FromRow for Row {
    fn from_row(row: &Row) -> RepoResult<Self> {
        Ok(row.clone())
    }
}

macro_rules! impl_from_row_scalar {
    ($($t:ty),*) => {
        $(
            impl FromRow for $t {
                fn from_row(row: &Row) -> RepoResult<Self> {
                    row.try_get_index(0)
                }
            }
        )*
    };
}

impl_from_row_scalar!(i32, i64, f64, bool, String);
