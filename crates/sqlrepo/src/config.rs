//! Database configuration loaded from TOML.
//!
//! ```toml
//! database_type = "sqlite"
//! connection_string = "app.db"
//! command_timeout_secs = 30
//!
//! [[connections]]
//! name = "reporting"
//! database_type = "postgres"
//! connection_string = "${REPORTING_DATABASE_URL}"
//! ```
//!
//! `${VAR}` references in names and connection strings are expanded from the
//! environment when loading.

use crate::dialect::DatabaseType;
use crate::error::{RepoError, RepoResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// Default connection plus optional named alternatives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub database_type: DatabaseType,
    pub connection_string: String,
    /// Forwarded to every command; unset means the driver default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_timeout_secs: Option<u64>,
    #[serde(default, rename = "connections", skip_serializing_if = "Vec::is_empty")]
    pub connection_configs: Vec<ConnectionConfig>,
}

/// A named connection selectable with `Repository::use_database`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub name: String,
    pub database_type: DatabaseType,
    pub connection_string: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_timeout_secs: Option<u64>,
}

impl DatabaseConfig {
    pub fn new(database_type: DatabaseType, connection_string: impl Into<String>) -> Self {
        Self {
            name: None,
            database_type,
            connection_string: connection_string.into(),
            command_timeout_secs: None,
            connection_configs: Vec::new(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout_secs = Some(timeout.as_secs());
        self
    }

    /// Add a named connection.
    pub fn connection(
        mut self,
        name: impl Into<String>,
        database_type: DatabaseType,
        connection_string: impl Into<String>,
    ) -> Self {
        self.connection_configs.push(ConnectionConfig {
            name: name.into(),
            database_type,
            connection_string: connection_string.into(),
            command_timeout_secs: None,
        });
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.command_timeout_secs.map(Duration::from_secs)
    }

    /// Parse, expand `${VAR}` references and validate.
    pub fn from_toml_str(raw: &str) -> RepoResult<Self> {
        let mut config: DatabaseConfig = toml::from_str(raw)
            .map_err(|e| RepoError::configuration(format!("failed to parse database config: {e}")))?;
        config.expand_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> RepoResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            RepoError::configuration(format!(
                "failed to read config file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_toml_str(&raw).map_err(|e| match e {
            RepoError::Configuration(msg) => {
                RepoError::Configuration(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
    }

    fn expand_env(&mut self) -> RepoResult<()> {
        self.connection_string = expand_env_vars(&self.connection_string)?;
        if let Some(name) = self.name.as_mut() {
            *name = expand_env_vars(name)?;
        }
        for c in &mut self.connection_configs {
            c.name = expand_env_vars(&c.name)?;
            c.connection_string = expand_env_vars(&c.connection_string)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> RepoResult<()> {
        if self.connection_string.trim().is_empty() {
            return Err(RepoError::configuration("connection_string must not be empty"));
        }
        if self.command_timeout_secs == Some(0) {
            return Err(RepoError::configuration("command_timeout_secs must be > 0"));
        }

        let mut seen = HashSet::<&str>::new();
        for c in &self.connection_configs {
            if c.name.trim().is_empty() {
                return Err(RepoError::configuration("connections.name must not be empty"));
            }
            if !seen.insert(c.name.as_str()) {
                return Err(RepoError::configuration(format!(
                    "duplicate connections.name: {}",
                    c.name
                )));
            }
            if c.connection_string.trim().is_empty() {
                return Err(RepoError::configuration(format!(
                    "connections.connection_string must not be empty (connection: {})",
                    c.name
                )));
            }
        }
        Ok(())
    }

    /// The named connection as a standalone config. It inherits the command
    /// timeout when it sets none.
    pub fn resolve(&self, name: &str) -> RepoResult<DatabaseConfig> {
        let c = self
            .connection_configs
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| {
                RepoError::configuration(format!("no database config named `{name}`"))
            })?;
        Ok(DatabaseConfig {
            name: Some(c.name.clone()),
            database_type: c.database_type,
            connection_string: c.connection_string.clone(),
            command_timeout_secs: c.command_timeout_secs.or(self.command_timeout_secs),
            connection_configs: Vec::new(),
        })
    }
}

/// Substitutes `${NAME}` and `${NAME:-fallback}` references from the process environment.
fn expand_env_vars(input: &str) -> RepoResult<String> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let body = &rest[start + 2..];
        let Some(end) = body.find('}') else {
            return Err(RepoError::configuration(format!(
                "unterminated environment reference `${{{body}` (missing `}}`)"
            )));
        };

        let reference = &body[..end];
        let (name, fallback) = match reference.split_once(":-") {
            Some((name, fallback)) => (name, Some(fallback)),
            None => (reference, None),
        };
        if name.is_empty() {
            return Err(RepoError::configuration(format!(
                "empty environment reference `${{{reference}}}`"
            )));
        }

        match (std::env::var(name), fallback) {
            (Ok(value), _) => out.push_str(&value),
            (Err(_), Some(fallback)) => out.push_str(fallback),
            (Err(_), None) => {
                return Err(RepoError::configuration(format!(
                    "environment variable `{name}` is not set"
                )));
            }
        }
        rest = &body[end + 1..];
    }

    out.push_str(rest);
    Ok(out)
}
