/// Embedded Database Driver
///
/// SQLite implementation of the driver seam, backing the `Default` database
/// kind. Statements keep their SQL and bound parameters and are run through
/// rusqlite's statement cache on execution, so a statement handle never
/// borrows the connection it came from.
use crate::core::db::dialect::Dialect;
use crate::core::db::driver::{
    Connection, Driver, DriverResult, MemoryResultSet, ParameterSlots, ResultSet, Statement,
};
use crate::core::db::value::{SqlType, Value};
use crate::core::error::DriverError;
use rusqlite::types::{ToSqlOutput, Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, ToSql};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::debug;

/// Path of a private, throwaway in-memory database.
pub const MEMORY_PATH: &str = ":memory:";

/// Dates are stored as ISO-8601 text so `strftime` can format them.
impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null(_) => ToSqlOutput::Owned(SqlValue::Null),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Integer(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            Value::Real(f) => ToSqlOutput::Owned(SqlValue::Real(*f)),
            Value::Date(d) => ToSqlOutput::Owned(SqlValue::Text(d.format("%Y-%m-%d").to_string())),
        })
    }
}

fn read_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null(SqlType::Text),
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Real(f),
        ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).to_string()),
        ValueRef::Blob(b) => Value::Text(format!("<BLOB: {} bytes>", b.len())),
    }
}

/// Driver for the embedded database file.
#[derive(Debug, Clone)]
pub struct SqliteDriver {
    path: String,
}

impl SqliteDriver {
    /// Creates a driver for a database file, or `:memory:`.
    ///
    /// Every in-memory connection is a separate, empty database.
    pub fn new(path: impl Into<String>) -> Self {
        SqliteDriver { path: path.into() }
    }

    pub fn in_memory() -> Self {
        SqliteDriver::new(MEMORY_PATH)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Opens a plain rusqlite connection, used for schema setup.
    pub fn open_native(&self) -> DriverResult<rusqlite::Connection> {
        let conn = if self.path == MEMORY_PATH {
            rusqlite::Connection::open_in_memory()?
        } else {
            rusqlite::Connection::open(&self.path)?
        };
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(conn)
    }
}

impl Driver for SqliteDriver {
    fn open(&self) -> DriverResult<Box<dyn Connection>> {
        debug!(path = %self.path, "opening embedded database");
        let conn = self.open_native()?;
        Ok(Box::new(SqliteConnection {
            inner: Rc::new(RefCell::new(Some(conn))),
        }))
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}

type SharedConnection = Rc<RefCell<Option<rusqlite::Connection>>>;

/// A live embedded-database connection.
pub struct SqliteConnection {
    inner: SharedConnection,
}

impl Connection for SqliteConnection {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn prepare(&mut self, sql: &str) -> DriverResult<Box<dyn Statement>> {
        let guard = self.inner.borrow();
        let conn = guard.as_ref().ok_or(DriverError::Closed("connection"))?;
        let count = conn.prepare_cached(sql)?.parameter_count();
        Ok(Box::new(SqliteStatement {
            conn: Rc::clone(&self.inner),
            sql: sql.to_string(),
            params: ParameterSlots::new(count),
            closed: false,
        }))
    }

    fn is_closed(&self) -> bool {
        self.inner.borrow().is_none()
    }

    fn close(&mut self) -> DriverResult<()> {
        match self.inner.borrow_mut().take() {
            Some(conn) => conn.close().map_err(|(_, e)| DriverError::Sqlite(e)),
            None => Ok(()),
        }
    }
}

/// Prepared statement on the embedded database.
pub struct SqliteStatement {
    conn: SharedConnection,
    sql: String,
    params: ParameterSlots,
    closed: bool,
}

impl SqliteStatement {
    fn ensure_open(&self) -> DriverResult<()> {
        if self.closed {
            Err(DriverError::Closed("statement"))
        } else {
            Ok(())
        }
    }
}

impl Statement for SqliteStatement {
    fn sql(&self) -> &str {
        &self.sql
    }

    fn parameter_count(&self) -> usize {
        self.params.len()
    }

    fn bind(&mut self, index: usize, value: Value) -> DriverResult<()> {
        self.ensure_open()?;
        self.params.set(index, value)
    }

    fn clear_parameters(&mut self) {
        self.params.clear();
    }

    fn execute_query(&mut self) -> DriverResult<Box<dyn ResultSet>> {
        self.ensure_open()?;
        let values = self.params.values()?;
        let guard = self.conn.borrow();
        let conn = guard.as_ref().ok_or(DriverError::Closed("connection"))?;

        let mut stmt = conn.prepare_cached(&self.sql)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let width = columns.len();

        let mut rows = stmt.query(params_from_iter(values.iter()))?;
        let mut data = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                values.push(read_value(row.get_ref(i)?));
            }
            data.push(values);
        }
        Ok(Box::new(MemoryResultSet::new(columns, data)))
    }

    fn execute_update(&mut self) -> DriverResult<u64> {
        self.ensure_open()?;
        let values = self.params.values()?;
        let guard = self.conn.borrow();
        let conn = guard.as_ref().ok_or(DriverError::Closed("connection"))?;

        let mut stmt = conn.prepare_cached(&self.sql)?;
        let affected = stmt.execute(params_from_iter(values.iter()))?;
        Ok(affected as u64)
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn close(&mut self) -> DriverResult<()> {
        self.closed = true;
        self.params.clear();
        Ok(())
    }
}
