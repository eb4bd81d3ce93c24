/// Connection Management Module
///
/// This module provides database kind selection and the connection factory
/// that opens connections to Oracle, SQL Server or the embedded default
/// database.
use crate::config::Config;
use crate::core::db::driver::{Connection, Driver};
use crate::core::db::sqlite::SqliteDriver;
use crate::core::error::{DataAccessError, DriverError};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Supported database kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseKind {
    Oracle,
    SqlServer,
    /// Embedded database, used when nothing else is selected
    Default,
}

impl DatabaseKind {
    /// Parses a database selector.
    ///
    /// Matching is case-insensitive after trimming. Blank or unrecognized
    /// selectors resolve to `Default`; this never fails.
    pub fn parse(selector: &str) -> DatabaseKind {
        let selector = selector.trim();
        match selector.to_ascii_lowercase().as_str() {
            "oracle" => DatabaseKind::Oracle,
            "sqlserver" => DatabaseKind::SqlServer,
            "" | "default" => DatabaseKind::Default,
            _ => {
                warn!(selector, "unrecognized database selector, using default database");
                DatabaseKind::Default
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseKind::Oracle => "oracle",
            DatabaseKind::SqlServer => "sqlserver",
            DatabaseKind::Default => "default",
        }
    }
}

impl From<&str> for DatabaseKind {
    fn from(selector: &str) -> Self {
        DatabaseKind::parse(selector)
    }
}

impl fmt::Display for DatabaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opens connections by database kind.
///
/// The factory is read-only once built and can be shared between threads;
/// the connections it hands out are not.
#[derive(Clone)]
pub struct ConnectionFactory {
    drivers: HashMap<DatabaseKind, Arc<dyn Driver>>,
    configured: HashSet<DatabaseKind>,
}

impl ConnectionFactory {
    /// Creates a factory whose default database is served by `default`.
    pub fn new(default: impl Driver + 'static) -> Self {
        let mut drivers: HashMap<DatabaseKind, Arc<dyn Driver>> = HashMap::new();
        drivers.insert(DatabaseKind::Default, Arc::new(default));
        ConnectionFactory {
            drivers,
            configured: HashSet::from([DatabaseKind::Default]),
        }
    }

    /// Factory with only an in-memory default database.
    pub fn in_memory() -> Self {
        ConnectionFactory::new(SqliteDriver::in_memory())
    }

    /// Builds the factory from configuration.
    ///
    /// Vendor drivers are registered when their section is present and the
    /// matching cargo feature (`oracle`, `sqlserver`) is enabled.
    pub fn from_config(config: &Config) -> Self {
        let mut factory = ConnectionFactory::new(SqliteDriver::new(config.default.path.clone()));

        if let Some(_oracle) = &config.oracle {
            factory.configured.insert(DatabaseKind::Oracle);
            #[cfg(feature = "oracle")]
            factory.register(
                DatabaseKind::Oracle,
                Arc::new(crate::core::db::oracle::OracleDriver::new(_oracle.clone())),
            );
        }
        if let Some(_sqlserver) = &config.sqlserver {
            factory.configured.insert(DatabaseKind::SqlServer);
            #[cfg(feature = "sqlserver")]
            factory.register(
                DatabaseKind::SqlServer,
                Arc::new(crate::core::db::sqlserver::SqlServerDriver::new(_sqlserver.clone())),
            );
        }
        factory
    }

    /// Registers (or replaces) the driver serving a kind.
    pub fn with_driver(mut self, kind: DatabaseKind, driver: impl Driver + 'static) -> Self {
        self.register(kind, Arc::new(driver));
        self
    }

    pub fn register(&mut self, kind: DatabaseKind, driver: Arc<dyn Driver>) {
        self.configured.insert(kind);
        self.drivers.insert(kind, driver);
    }

    pub fn has_driver(&self, kind: DatabaseKind) -> bool {
        self.drivers.contains_key(&kind)
    }

    /// Opens a new connection of the given kind. No retry is attempted.
    pub fn open(&self, kind: DatabaseKind) -> Result<Box<dyn Connection>, DataAccessError> {
        let driver = match self.drivers.get(&kind) {
            Some(driver) => driver,
            None if self.configured.contains(&kind) => {
                return Err(DataAccessError::connection(kind, DriverError::NoDriver(kind)))
            }
            None => return Err(DataAccessError::connection(kind, DriverError::MissingConfig(kind))),
        };
        debug!(kind = %kind, driver = driver.name(), "opening connection");
        driver
            .open()
            .map_err(|e| DataAccessError::connection(kind, e))
    }
}

impl fmt::Debug for ConnectionFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&str> = self.drivers.keys().map(|k| k.as_str()).collect();
        kinds.sort_unstable();
        f.debug_struct("ConnectionFactory").field("drivers", &kinds).finish()
    }
}

impl Default for ConnectionFactory {
    fn default() -> Self {
        ConnectionFactory::in_memory()
    }
}
