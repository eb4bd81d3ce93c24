/// Resource Lifecycle Module
///
/// `LegacyDao` owns at most one connection, one statement and one result set
/// at a time and moves through `Idle -> Connected -> Prepared -> Executed`.
///
/// - Work attempted without an open connection connects to the default
///   database first.
/// - Preparing or running a new statement releases the previous statement
///   and its result set.
/// - `disconnect` closes result set, statement and connection in that order,
///   tolerates any of them being absent or already closed, and can be called
///   any number of times.
///
/// A manager is a single-threaded object; use one per logical operation.
/// There is no timeout or cancellation: a hung driver call blocks the caller.
use crate::core::db::connection::{ConnectionFactory, DatabaseKind};
use crate::core::db::dialect::Dialect;
use crate::core::db::driver::{collect_rows, Connection, ResultSet, Statement};
use crate::core::db::value::{Row, Value};
use crate::core::error::{DataAccessError, DriverError, FailureKind};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Result type of the lifecycle operations.
pub type DaoResult<T> = std::result::Result<T, DataAccessError>;

/// Observable state of a `LegacyDao`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No connection held
    Idle,
    /// Connection open, no statement
    Connected,
    /// Statement prepared, not executed
    Prepared,
    /// Result set available
    Executed,
}

/// Connection, statement and result-set holder for legacy queries.
pub struct LegacyDao {
    factory: Arc<ConnectionFactory>,
    kind: Option<DatabaseKind>,
    connection: Option<Box<dyn Connection>>,
    statement: Option<Box<dyn Statement>>,
    result_set: Option<Box<dyn ResultSet>>,
}

impl LegacyDao {
    pub fn new(factory: Arc<ConnectionFactory>) -> Self {
        LegacyDao {
            factory,
            kind: None,
            connection: None,
            statement: None,
            result_set: None,
        }
    }

    pub fn state(&self) -> SessionState {
        match (&self.connection, &self.statement, &self.result_set) {
            (None, _, _) => SessionState::Idle,
            (Some(_), _, Some(_)) => SessionState::Executed,
            (Some(_), Some(_), None) => SessionState::Prepared,
            (Some(_), None, None) => SessionState::Connected,
        }
    }

    /// Kind of the currently held connection.
    pub fn kind(&self) -> Option<DatabaseKind> {
        self.kind
    }

    /// Dialect of the currently held connection.
    pub fn dialect(&self) -> Option<Dialect> {
        self.connection.as_ref().map(|c| c.dialect())
    }

    pub fn is_connected(&self) -> bool {
        self.connection.as_ref().map_or(false, |c| !c.is_closed())
    }

    /// Connects to the database named by `selector`.
    ///
    /// Unrecognized selectors fall back to the default database.
    pub fn connect(&mut self, selector: &str) -> DaoResult<()> {
        self.connect_kind(DatabaseKind::parse(selector))
    }

    /// Connects to `kind`, closing any connection held before.
    ///
    /// On failure the manager is left idle.
    pub fn connect_kind(&mut self, kind: DatabaseKind) -> DaoResult<()> {
        self.open_kind(kind).map(|_| ())
    }

    fn open_kind(&mut self, kind: DatabaseKind) -> DaoResult<Dialect> {
        if self.connection.is_some() {
            debug!(previous = ?self.kind, next = %kind, "replacing open connection");
        }
        self.disconnect();

        match self.factory.open(kind) {
            Ok(conn) => {
                let dialect = conn.dialect();
                debug!(kind = %kind, dialect = %dialect, "connected");
                self.connection = Some(conn);
                self.kind = Some(kind);
                Ok(dialect)
            }
            Err(e) => {
                error!(operation = "connect", database = %kind, error = %e, "connection failed");
                Err(e)
            }
        }
    }

    fn ensure_connected(&mut self, operation: &'static str) -> DaoResult<()> {
        if !self.is_connected() {
            warn!(operation, "no open connection, connecting to the default database");
            self.connect_kind(DatabaseKind::Default)?;
        }
        Ok(())
    }

    fn failure(&self, failure: FailureKind, operation: &'static str, cause: DriverError) -> DataAccessError {
        let mut err = DataAccessError::new(failure, operation, cause);
        if let Some(kind) = self.kind {
            err = err.with_database(kind);
        }
        error!(
            operation,
            failure = %failure,
            database = ?self.kind,
            error = %err.message,
            "data access failure"
        );
        err
    }

    /// Closes the held result set and statement, keeping the connection.
    fn release_statement(&mut self) {
        if let Some(mut rs) = self.result_set.take() {
            if !rs.is_closed() {
                if let Err(e) = rs.close() {
                    warn!(error = %e, "failed to close superseded result set");
                }
            }
        }
        if let Some(mut stmt) = self.statement.take() {
            if !stmt.is_closed() {
                if let Err(e) = stmt.close() {
                    warn!(error = %e, "failed to close superseded statement");
                }
            }
        }
    }

    fn prepare(&mut self, operation: &'static str, sql: &str) -> DaoResult<&mut dyn Statement> {
        self.ensure_connected(operation)?;
        self.release_statement();
        debug!(operation, sql, "preparing statement");

        let prepared = match self.connection.as_mut() {
            Some(conn) => conn.prepare(sql),
            None => Err(DriverError::Closed("connection")),
        };
        match prepared {
            Ok(stmt) => {
                let stmt = self.statement.insert(stmt);
                Ok(stmt.as_mut())
            }
            Err(e) => Err(self.failure(FailureKind::StatementPreparation, operation, e)),
        }
    }

    /// Runs `sql` as a query on a fresh statement and holds its result set.
    pub fn run_query(&mut self, sql: &str) -> DaoResult<&mut dyn ResultSet> {
        self.prepare("run_query", sql)?;
        self.execute("run_query")
    }

    /// Prepares a parameterized query.
    pub fn prepare_statement(&mut self, sql: &str) -> DaoResult<&mut dyn Statement> {
        self.prepare("prepare_statement", sql)
    }

    /// Prepares an insert (or any other data-modifying statement).
    pub fn prepare_insert(&mut self, sql: &str) -> DaoResult<&mut dyn Statement> {
        self.prepare("prepare_insert", sql)
    }

    /// Alias of [`LegacyDao::prepare_insert`]; updates take the same path.
    pub fn prepare_update(&mut self, sql: &str) -> DaoResult<&mut dyn Statement> {
        self.prepare_insert(sql)
    }

    /// The held statement, if any.
    pub fn statement(&mut self) -> Option<&mut dyn Statement> {
        match self.statement.as_mut() {
            Some(stmt) => Some(stmt.as_mut()),
            None => None,
        }
    }

    /// The held result set, if any.
    pub fn result_set(&mut self) -> Option<&mut dyn ResultSet> {
        match self.result_set.as_mut() {
            Some(rs) => Some(rs.as_mut()),
            None => None,
        }
    }

    /// Binds values to the held statement, starting at parameter 1.
    pub fn bind_all(&mut self, params: &[Value]) -> DaoResult<()> {
        let bound = match self.statement.as_mut() {
            Some(stmt) => stmt.bind_all(params),
            None => Err(DriverError::Closed("statement")),
        };
        bound.map_err(|e| self.failure(FailureKind::StatementPreparation, "bind", e))
    }

    fn execute(&mut self, operation: &'static str) -> DaoResult<&mut dyn ResultSet> {
        if let Some(mut previous) = self.result_set.take() {
            if let Err(e) = previous.close() {
                warn!(error = %e, "failed to close previous result set");
            }
        }
        let executed = match self.statement.as_mut() {
            Some(stmt) => stmt.execute_query(),
            None => Err(DriverError::Closed("statement")),
        };
        match executed {
            Ok(rs) => {
                let rs = self.result_set.insert(rs);
                Ok(rs.as_mut())
            }
            Err(e) => Err(self.failure(FailureKind::Execution, operation, e)),
        }
    }

    /// Executes the held statement as a query.
    pub fn execute_query(&mut self) -> DaoResult<&mut dyn ResultSet> {
        self.execute("execute_query")
    }

    /// Executes the held statement as an update, returning affected rows.
    pub fn execute_update(&mut self) -> DaoResult<u64> {
        let executed = match self.statement.as_mut() {
            Some(stmt) => stmt.execute_update(),
            None => Err(DriverError::Closed("statement")),
        };
        executed.map_err(|e| self.failure(FailureKind::Execution, "execute_update", e))
    }

    /// Reads every remaining row of the held result set.
    pub fn fetch_all(&mut self) -> DaoResult<Vec<Row>> {
        let fetched = match self.result_set.as_mut() {
            Some(rs) => collect_rows(rs.as_mut()),
            None => Err(DriverError::Closed("result set")),
        };
        fetched.map_err(|e| self.failure(FailureKind::Execution, "fetch", e))
    }

    /// Prepares, binds and runs a query, returning all of its rows.
    pub fn query(&mut self, sql: &str, params: &[Value]) -> DaoResult<Vec<Row>> {
        self.prepare_statement(sql)?;
        self.bind_all(params)?;
        self.execute_query()?;
        self.fetch_all()
    }

    /// Closes result set, statement and connection, logging any failure.
    pub fn disconnect(&mut self) {
        if let Err(e) = self.try_disconnect() {
            warn!(error = %e, "disconnect completed with errors");
        }
    }

    /// Same teardown as [`LegacyDao::disconnect`], reporting the first error.
    ///
    /// Every handle is released even when an earlier close fails.
    pub fn try_disconnect(&mut self) -> DaoResult<()> {
        let mut first: Option<DataAccessError> = None;
        let kind = self.kind.take();
        let mut record = |what: &'static str, e: DriverError| {
            warn!(handle = what, error = %e, "close failed");
            if first.is_none() {
                let mut err = DataAccessError::new(FailureKind::Disconnect, "disconnect", e);
                if let Some(kind) = kind {
                    err = err.with_database(kind);
                }
                first = Some(err);
            }
        };

        if let Some(mut rs) = self.result_set.take() {
            if !rs.is_closed() {
                if let Err(e) = rs.close() {
                    record("result set", e);
                }
            }
        }
        if let Some(mut stmt) = self.statement.take() {
            if !stmt.is_closed() {
                if let Err(e) = stmt.close() {
                    record("statement", e);
                }
            }
        }
        if let Some(mut conn) = self.connection.take() {
            if !conn.is_closed() {
                if let Err(e) = conn.close() {
                    record("connection", e);
                }
            }
            debug!(kind = ?kind, "disconnected");
        }

        match first {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Connects and returns a guard that disconnects when dropped.
    pub fn session(&mut self, selector: &str) -> DaoResult<Session<'_>> {
        self.session_kind(DatabaseKind::parse(selector))
    }

    pub fn session_kind(&mut self, kind: DatabaseKind) -> DaoResult<Session<'_>> {
        let dialect = self.open_kind(kind)?;
        Ok(Session { dao: self, dialect })
    }
}

impl Drop for LegacyDao {
    fn drop(&mut self) {
        if self.connection.is_some() || self.statement.is_some() || self.result_set.is_some() {
            self.disconnect();
        }
    }
}

/// Scoped use of a connected `LegacyDao`; disconnects on every exit path.
pub struct Session<'a> {
    dao: &'a mut LegacyDao,
    dialect: Dialect,
}

impl Session<'_> {
    /// Dialect of the connection the session was opened on.
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }
}

impl Deref for Session<'_> {
    type Target = LegacyDao;

    fn deref(&self) -> &LegacyDao {
        self.dao
    }
}

impl DerefMut for Session<'_> {
    fn deref_mut(&mut self) -> &mut LegacyDao {
        self.dao
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        self.dao.disconnect();
    }
}
