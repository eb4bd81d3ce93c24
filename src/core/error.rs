/// Legacy DAO Error Module
///
/// This module defines the error types for the legacy data-access layer.
/// Driver failures are reported as `DriverError`; the lifecycle manager wraps
/// them into a single uniform `DataAccessError` that carries the failed
/// operation and its failure kind; `LegacyError` is the crate-wide error.
use crate::core::db::DatabaseKind;
use std::fmt;
use thiserror::Error;

/// Boxed error used as the `source` of a data-access failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure taxonomy of the resource layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// A connection could not be established for a database kind
    Connection,
    /// A statement could not be prepared on an open connection
    StatementPreparation,
    /// A query or update failed while executing
    Execution,
    /// Teardown of a result set, statement or connection failed
    Disconnect,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Connection => "connection",
            FailureKind::StatementPreparation => "statement preparation",
            FailureKind::Execution => "execution",
            FailureKind::Disconnect => "disconnect",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by database drivers behind the `Connection` seam.
#[derive(Error, Debug)]
pub enum DriverError {
    /// Embedded database (SQLite) errors
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Oracle client errors
    #[cfg(feature = "oracle")]
    #[error("Oracle error: {0}")]
    Oracle(#[from] oracle::Error),

    /// ODBC errors (SQL Server)
    #[cfg(feature = "sqlserver")]
    #[error("ODBC error: {0}")]
    Odbc(#[from] odbc_api::Error),

    /// The handle was already closed
    #[error("{0} is closed")]
    Closed(&'static str),

    /// A placeholder was left without a bound value
    #[error("parameter {index} is not bound")]
    UnboundParameter { index: usize },

    /// Bind index outside the statement's placeholders
    #[error("parameter index {index} is out of range (statement has {count} parameters)")]
    ParameterIndex { index: usize, count: usize },

    /// No driver was compiled in or registered for the kind
    #[error("no driver available for {0}")]
    NoDriver(DatabaseKind),

    /// Vendor connection parameters were not configured
    #[error("missing connection parameters for {0}")]
    MissingConfig(DatabaseKind),

    /// Any other driver failure
    #[error("{0}")]
    Other(String),
}

/// Uniform error surfaced by the lifecycle manager for any connect, prepare,
/// execute or teardown failure.
#[derive(Error, Debug)]
#[error("{failure} failure during {operation}: {message}")]
pub struct DataAccessError {
    pub failure: FailureKind,
    pub operation: &'static str,
    pub database: Option<DatabaseKind>,
    pub message: String,
    #[source]
    pub source: Option<BoxError>,
}

impl DataAccessError {
    pub fn new(failure: FailureKind, operation: &'static str, cause: DriverError) -> Self {
        DataAccessError {
            failure,
            operation,
            database: None,
            message: cause.to_string(),
            source: Some(Box::new(cause)),
        }
    }

    /// Connection failure for a database kind.
    pub fn connection(kind: DatabaseKind, cause: DriverError) -> Self {
        DataAccessError::new(FailureKind::Connection, "connect", cause).with_database(kind)
    }

    pub fn with_database(mut self, kind: DatabaseKind) -> Self {
        self.database = Some(kind);
        self
    }
}

/// Crate-wide error type.
#[derive(Error, Debug)]
pub enum LegacyError {
    /// Resource-layer failures (connect, prepare, execute, disconnect)
    #[error(transparent)]
    DataAccess(#[from] DataAccessError),

    /// Query construction errors
    #[error("Query error: {0}")]
    Query(String),

    /// Row to record mapping errors
    #[error("Mapping error: {0}")]
    Mapping(String),

    /// Input validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration loading and validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File system and I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl LegacyError {
    /// The resource-layer failure kind, if this is a data-access error.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            LegacyError::DataAccess(e) => Some(e.failure),
            _ => None,
        }
    }
}

/// Type alias for Result to use LegacyError as the error type.
pub type Result<T> = std::result::Result<T, LegacyError>;
