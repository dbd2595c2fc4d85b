//! Supported database engines.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The relational engine a connection talks to.
///
/// Selects the SQL adapter (quoting, parameter sigil, pagination and
/// identity-retrieval strategy) and the driver used by
/// [`ConnectionFactory`](crate::connection::ConnectionFactory).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DatabaseType {
    SqlServer,
    Oracle,
    MySql,
    Sqlite,
    PostgreSql,
}

impl DatabaseType {
    /// All supported engines, in declaration order.
    pub const ALL: [DatabaseType; 5] = [
        DatabaseType::SqlServer,
        DatabaseType::Oracle,
        DatabaseType::MySql,
        DatabaseType::Sqlite,
        DatabaseType::PostgreSql,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DatabaseType::SqlServer => "SqlServer",
            DatabaseType::Oracle => "Oracle",
            DatabaseType::MySql => "MySql",
            DatabaseType::Sqlite => "SQLite",
            DatabaseType::PostgreSql => "PostgreSql",
        }
    }
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown database type name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownDatabaseType(pub String);

impl fmt::Display for UnknownDatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid database type `{}` (expected one of: sqlserver, oracle, mysql, sqlite, postgresql)",
            self.0
        )
    }
}

impl std::error::Error for UnknownDatabaseType {}

impl FromStr for DatabaseType {
    type Err = UnknownDatabaseType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlserver" | "mssql" => Ok(DatabaseType::SqlServer),
            "oracle" => Ok(DatabaseType::Oracle),
            "mysql" => Ok(DatabaseType::MySql),
            "sqlite" => Ok(DatabaseType::Sqlite),
            "postgresql" | "postgres" | "pg" => Ok(DatabaseType::PostgreSql),
            _ => Err(UnknownDatabaseType(s.to_string())),
        }
    }
}

impl TryFrom<String> for DatabaseType {
    type Error = UnknownDatabaseType;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DatabaseType> for String {
    fn from(value: DatabaseType) -> Self {
        value.as_str().to_string()
    }
}
