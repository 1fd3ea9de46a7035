//! Open databases kept by alias.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tracing::{info, warn};

use super::config::{DataSource, RegistryConfig};
use super::{BoxError, Connection, Database};

/// Errors produced by [`Registry`].
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("no database registered as `{0}`")]
    NotFound(String),

    #[error("failed to open database `{alias}`: {source}")]
    Open {
        alias: String,
        #[source]
        source: BoxError,
    },
}

/// Opens client connections from configuration.
///
/// Implementations apply the pool limits of the [`DataSource`] to the client
/// they create; fields left as `None` keep the client's defaults.
pub trait Connector {
    type Connection: Connection;

    fn open(&self, source: &DataSource) -> Result<Self::Connection, BoxError>;
}

/// A name-keyed table of open databases.
///
/// Registration is expected at startup and lookups on every request, so one
/// mutex guards the whole table. Handles are shared as `Arc`s and stay valid
/// after their entry is replaced or removed.
///
/// # Examples
///
/// ```rust,no_run
/// use rowmap::Connection;
/// use rowmap::database::{Registry, RegistryError};
///
/// # fn example<C: Connection>(conn: C) -> Result<(), RegistryError> {
/// let registry = Registry::new();
/// registry.register("default", conn);
///
/// let db = registry.get("default")?;
/// assert_eq!(db.alias(), "default");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Registry<C> {
    databases: Mutex<HashMap<String, Arc<Database<C>>>>,
}

impl<C> Default for Registry<C> {
    fn default() -> Self {
        Self {
            databases: Mutex::new(HashMap::new()),
        }
    }
}

impl<C: Connection> Registry<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens every source in `config` through `connector`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Open`] for the first source that fails to open.
    pub fn from_config<K>(connector: &K, config: &RegistryConfig) -> Result<Self, RegistryError>
    where
        K: Connector<Connection = C>,
    {
        let registry = Self::new();
        for source in &config.databases {
            registry.register_database(connector, source)?;
        }
        Ok(registry)
    }

    // A panic while holding the lock cannot leave the map half-updated.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<Database<C>>>> {
        self.databases.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers `conn` under `alias`, replacing any previous entry.
    pub fn register(&self, alias: impl Into<String>, conn: C) -> Arc<Database<C>> {
        self.insert(Database::new(alias, conn))
    }

    /// Opens `source` through `connector` and registers it under its alias.
    ///
    /// The source's query timeout, if any, applies to every query on the
    /// returned database.
    pub fn register_database<K>(
        &self,
        connector: &K,
        source: &DataSource,
    ) -> Result<Arc<Database<C>>, RegistryError>
    where
        K: Connector<Connection = C>,
    {
        let conn = connector
            .open(source)
            .map_err(|source_err| RegistryError::Open {
                alias: source.alias.clone(),
                source: source_err,
            })?;

        let mut database = Database::new(source.alias.clone(), conn);
        if let Some(timeout) = source.timeout() {
            database = database.with_query_timeout(timeout);
        }
        Ok(self.insert(database))
    }

    fn insert(&self, database: Database<C>) -> Arc<Database<C>> {
        let database = Arc::new(database);
        let alias = database.alias().to_owned();

        let previous = self.lock().insert(alias.clone(), Arc::clone(&database));
        if previous.is_some() {
            warn!(alias = %alias, "replaced registered database");
        } else {
            info!(alias = %alias, "registered database");
        }
        database
    }

    /// Returns the database registered under `alias`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::NotFound`] if nothing is registered under `alias`.
    pub fn get(&self, alias: &str) -> Result<Arc<Database<C>>, RegistryError> {
        self.lock()
            .get(alias)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(alias.to_owned()))
    }

    /// Unregisters `alias`, returning its database if it was present.
    pub fn remove(&self, alias: &str) -> Option<Arc<Database<C>>> {
        self.lock().remove(alias)
    }

    /// Registered aliases in sorted order.
    pub fn aliases(&self) -> Vec<String> {
        let mut aliases: Vec<_> = self.lock().keys().cloned().collect();
        aliases.sort_unstable();
        aliases
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
