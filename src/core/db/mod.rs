/// Database Module
///
/// This module provides the legacy data-access layer, organized into focused
/// submodules.
///
/// ## Architecture
///
/// - **Driver seam** (`driver.rs`, `value.rs`): connection, statement and result-set traits
/// - **Drivers** (`sqlite.rs`, `oracle.rs`, `sqlserver.rs`): one per database vendor
/// - **Connection Management** (`connection.rs`): database kinds and the connection factory
/// - **Resource Lifecycle** (`lifecycle.rs`): the `LegacyDao` state machine and its session guard
/// - **Query Building** (`query.rs`, `dialect.rs`): parameterized SQL from optional filters
/// - **Embedded Schema** (`schema.rs`): the legacy tables on the default database
///
/// ## Error Handling
///
/// Drivers report `DriverError`; everything surfaced by `LegacyDao` is a
/// `DataAccessError` carrying the failure kind and operation.
pub mod connection;
pub mod dialect;
pub mod driver;
pub mod lifecycle;
#[cfg(feature = "oracle")]
pub mod oracle;
pub mod query;
pub mod schema;
pub mod sqlite;
#[cfg(feature = "sqlserver")]
pub mod sqlserver;
pub mod value;

pub use connection::{ConnectionFactory, DatabaseKind};
pub use dialect::Dialect;
pub use driver::{Connection, Driver, DriverResult, MemoryResultSet, ParameterSlots, ResultSet, Statement};
pub use lifecycle::{DaoResult, LegacyDao, Session, SessionState};
pub use query::{count_placeholders, parse_code_list, BuiltQuery, Conjunction, FilterGroup, QueryBuilder};
pub use sqlite::SqliteDriver;
pub use value::{Row, SqlType, Value};
