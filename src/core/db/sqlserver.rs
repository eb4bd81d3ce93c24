/// SQL Server Driver
///
/// Implementation of the driver seam over ODBC (`odbc-api`). One ODBC
/// environment is shared by the process; connections borrow it for
/// `'static`. Parameters are bound as text and converted by the server,
/// dates as ISO-8601 (`yyyy-mm-dd`).
use crate::config::SqlServerConfig;
use crate::core::db::dialect::{placeholder_positions, Dialect};
use crate::core::db::driver::{
    Connection, Driver, DriverResult, MemoryResultSet, ParameterSlots, ResultSet, Statement,
};
use crate::core::db::value::Value;
use crate::core::error::DriverError;
use odbc_api::buffers::TextRowSet;
use odbc_api::parameter::InputParameter;
use odbc_api::{ConnectionOptions, Cursor, Environment, IntoParameter, ResultSetMetadata};
use once_cell::sync::OnceCell;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, warn};

static ODBC_ENV: OnceCell<Environment> = OnceCell::new();

fn environment() -> DriverResult<&'static Environment> {
    Ok(ODBC_ENV.get_or_try_init(Environment::new)?)
}

const FETCH_BATCH: usize = 256;
const MAX_TEXT_LEN: usize = 4096;

/// Driver for a SQL Server instance reached through ODBC.
pub struct SqlServerDriver {
    config: SqlServerConfig,
}

impl SqlServerDriver {
    pub fn new(config: SqlServerConfig) -> Self {
        SqlServerDriver { config }
    }
}

impl Driver for SqlServerDriver {
    fn open(&self) -> DriverResult<Box<dyn Connection>> {
        debug!(
            server = %self.config.server_name,
            port = self.config.port,
            database = %self.config.database_name,
            "connecting to SQL Server (credentials hidden)"
        );
        let env = environment()?;
        let conn = env.connect_with_connection_string(
            &self.config.connection_string(),
            ConnectionOptions::default(),
        )?;
        Ok(Box::new(SqlServerConnection {
            inner: Rc::new(RefCell::new(Some(conn))),
        }))
    }

    fn name(&self) -> &'static str {
        "odbc"
    }
}

type SharedConnection = Rc<RefCell<Option<odbc_api::Connection<'static>>>>;

pub struct SqlServerConnection {
    inner: SharedConnection,
}

impl Connection for SqlServerConnection {
    fn dialect(&self) -> Dialect {
        Dialect::SqlServer
    }

    fn prepare(&mut self, sql: &str) -> DriverResult<Box<dyn Statement>> {
        {
            let guard = self.inner.borrow();
            let conn = guard.as_ref().ok_or(DriverError::Closed("connection"))?;
            conn.prepare(sql)?;
        }
        Ok(Box::new(SqlServerStatement {
            conn: Rc::clone(&self.inner),
            params: ParameterSlots::new(placeholder_positions(sql).len()),
            sql: sql.to_string(),
            closed: false,
        }))
    }

    fn is_closed(&self) -> bool {
        self.inner.borrow().is_none()
    }

    fn close(&mut self) -> DriverResult<()> {
        // Dropping the handle disconnects.
        self.inner.borrow_mut().take();
        Ok(())
    }
}

pub struct SqlServerStatement {
    conn: SharedConnection,
    sql: String,
    params: ParameterSlots,
    closed: bool,
}

/// Decodes one text cell. Values filling the whole buffer were cut short by
/// the driver.
fn text_cell(column: &str, bytes: Option<&[u8]>) -> Option<String> {
    bytes.map(|bytes| {
        if bytes.len() >= MAX_TEXT_LEN {
            warn!(column, limit = MAX_TEXT_LEN, "text value truncated at the fetch buffer limit");
        }
        String::from_utf8_lossy(bytes).into_owned()
    })
}

fn to_odbc(values: &[Value]) -> Vec<Box<dyn InputParameter>> {
    values
        .iter()
        .map(|v| Box::new(v.as_text().into_parameter()) as Box<dyn InputParameter>)
        .collect()
}

impl SqlServerStatement {
    fn ensure_open(&self) -> DriverResult<()> {
        if self.closed {
            Err(DriverError::Closed("statement"))
        } else {
            Ok(())
        }
    }
}

impl Statement for SqlServerStatement {
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
        let params = to_odbc(&self.params.values()?);
        let guard = self.conn.borrow();
        let conn = guard.as_ref().ok_or(DriverError::Closed("connection"))?;

        let mut columns = Vec::new();
        let mut data = Vec::new();
        if let Some(mut cursor) = conn.execute(&self.sql, params.as_slice())? {
            columns = cursor.column_names()?.collect::<Result<Vec<String>, _>>()?;
            let width = columns.len();

            let mut buffers = TextRowSet::for_cursor(FETCH_BATCH, &mut cursor, Some(MAX_TEXT_LEN))?;
            let mut row_cursor = cursor.bind_buffer(&mut buffers)?;
            while let Some(batch) = row_cursor.fetch()? {
                for row_idx in 0..batch.num_rows() {
                    let mut values = Vec::with_capacity(width);
                    for col_idx in 0..width {
                        let text = text_cell(&columns[col_idx], batch.at(col_idx, row_idx));
                        values.push(Value::text(text));
                    }
                    data.push(values);
                }
            }
        }
        Ok(Box::new(MemoryResultSet::new(columns, data)))
    }

    fn execute_update(&mut self) -> DriverResult<u64> {
        self.ensure_open()?;
        let params = to_odbc(&self.params.values()?);
        let guard = self.conn.borrow();
        let conn = guard.as_ref().ok_or(DriverError::Closed("connection"))?;

        let mut prepared = conn.prepare(&self.sql)?;
        prepared.execute(params.as_slice())?;
        Ok(prepared.row_count()?.unwrap_or(0) as u64)
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
