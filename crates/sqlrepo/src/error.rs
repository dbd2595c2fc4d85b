//! Error types for sqlrepo

use crate::dialect::DatabaseType;
use thiserror::Error;

/// Result type alias for sqlrepo operations
pub type RepoResult<T> = Result<T, RepoError>;

/// Error types for repository operations
#[derive(Debug, Error)]
pub enum RepoError {
    /// The entity shape or the call arguments cannot produce valid SQL
    /// (missing key columns, empty filter, invalid page request, ...).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Pagination was requested for a dialect without a generation rule.
    #[error("Unsupported dialect: no pagination rule for {0}")]
    UnsupportedDialect(DatabaseType),

    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Statement execution error reported by the driver
    #[error("Query error: {0}")]
    Query(String),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Query timeout error
    #[error("Query timeout after {0:?}")]
    Timeout(std::time::Duration),

    /// Pool error
    #[cfg(feature = "pool")]
    #[error("Pool error: {0}")]
    Pool(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl RepoError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a query error
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query(message.into())
    }

    /// Check if this is a configuration error
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for RepoError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(code, _) = &err {
            if code.code == rusqlite::ErrorCode::CannotOpen {
                return Self::Connection(err.to_string());
            }
        }
        Self::Query(err.to_string())
    }
}

#[cfg(feature = "postgres")]
impl From<tokio_postgres::Error> for RepoError {
    fn from(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            return Self::Query(format!(
                "{} ({})",
                db_err.message(),
                db_err.code().code()
            ));
        }
        if err.is_closed() {
            return Self::Connection(err.to_string());
        }
        Self::Query(err.to_string())
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for RepoError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicates_match_variants() {
        assert!(RepoError::configuration("no key").is_configuration());
        assert!(RepoError::not_found("row").is_not_found());
        assert!(RepoError::Timeout(std::time::Duration::from_secs(1)).is_timeout());
        assert!(!RepoError::query("boom").is_configuration());
    }

    #[test]
    fn display_includes_context() {
        let err = RepoError::decode("age", "expected integer");
        assert_eq!(
            err.to_string(),
            "Decode error on column 'age': expected integer"
        );
        let err = RepoError::UnsupportedDialect(DatabaseType::PostgreSql);
        assert_eq!(
            err.to_string(),
            "Unsupported dialect: no pagination rule for PostgreSql"
        );
    }
}
