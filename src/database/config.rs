//! Database connection settings.
//!
//! A [`RegistryConfig`] lists the data sources an application opens at
//! startup. It is plain serde data, usually loaded from a JSON file:
//!
//! ```json
//! {
//!   "databases": [
//!     { "alias": "default", "dsn": "postgres://app@localhost/app", "max_open_conns": 16 },
//!     { "alias": "reports", "dsn": "postgres://ro@replica/app", "query_timeout_ms": 2000 }
//!   ]
//! }
//! ```

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while loading a [`RegistryConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("database alias `{0}` is declared more than once")]
    DuplicateAlias(String),
}

/// Settings for one named database.
///
/// Pool limits are passed to the [`Connector`](super::Connector) unchanged;
/// `None` leaves the client's default in place.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSource {
    pub alias: String,
    pub dsn: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_idle_conns: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_open_conns: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_timeout_ms: Option<u64>,
}

impl DataSource {
    pub fn new(alias: impl Into<String>, dsn: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            dsn: dsn.into(),
            ..Self::default()
        }
    }

    pub fn max_idle_conns(mut self, n: u32) -> Self {
        self.max_idle_conns = Some(n);
        self
    }

    pub fn max_open_conns(mut self, n: u32) -> Self {
        self.max_open_conns = Some(n);
        self
    }

    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout_ms = Some(timeout.as_millis().try_into().unwrap_or(u64::MAX));
        self
    }

    /// Per-query deadline, if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.query_timeout_ms.map(Duration::from_millis)
    }
}

// DSNs routinely embed credentials.
impl fmt::Debug for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataSource")
            .field("alias", &self.alias)
            .field("dsn", &"<redacted>")
            .field("max_idle_conns", &self.max_idle_conns)
            .field("max_open_conns", &self.max_open_conns)
            .field("query_timeout_ms", &self.query_timeout_ms)
            .finish()
    }
}

/// The set of databases to register at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub databases: Vec<DataSource>,
}

impl RegistryConfig {
    /// Parses a JSON document.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::Json`] — the document is malformed.
    /// - [`ConfigError::DuplicateAlias`] — two entries share an alias.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Checks that every alias is unique.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::with_capacity(self.databases.len());
        for source in &self.databases {
            if !seen.insert(source.alias.as_str()) {
                return Err(ConfigError::DuplicateAlias(source.alias.clone()));
            }
        }
        Ok(())
    }
}
