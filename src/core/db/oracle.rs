/// Oracle Driver
///
/// Implementation of the driver seam over the `oracle` crate (ODPI-C). The
/// statements are written with `?` placeholders and rewritten to Oracle's
/// positional `:N` binds before they reach the server. Connections run in
/// autocommit mode.
use crate::config::OracleConfig;
use crate::core::db::dialect::{placeholder_positions, Dialect};
use crate::core::db::driver::{
    Connection, Driver, DriverResult, MemoryResultSet, ParameterSlots, ResultSet, Statement,
};
use crate::core::db::value::{SqlType, Value};
use crate::core::error::DriverError;
use chrono::NaiveDate;
use oracle::sql_type::ToSql;
use oracle::Connector;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::debug;

/// Driver for an Oracle instance.
pub struct OracleDriver {
    config: OracleConfig,
}

impl OracleDriver {
    pub fn new(config: OracleConfig) -> Self {
        OracleDriver { config }
    }
}

impl Driver for OracleDriver {
    fn open(&self) -> DriverResult<Box<dyn Connection>> {
        debug!(url = %self.config.url, user = %self.config.username, "connecting to Oracle");
        let mut conn =
            Connector::new(&self.config.username, &self.config.password, &self.config.url).connect()?;
        conn.set_autocommit(true);
        Ok(Box::new(OracleConnection {
            inner: Rc::new(RefCell::new(Some(conn))),
        }))
    }

    fn name(&self) -> &'static str {
        "oracle"
    }
}

type SharedConnection = Rc<RefCell<Option<oracle::Connection>>>;

pub struct OracleConnection {
    inner: SharedConnection,
}

impl Connection for OracleConnection {
    fn dialect(&self) -> Dialect {
        Dialect::Oracle
    }

    fn prepare(&mut self, sql: &str) -> DriverResult<Box<dyn Statement>> {
        let native = Dialect::Oracle.native_placeholders(sql).into_owned();
        {
            let guard = self.inner.borrow();
            let conn = guard.as_ref().ok_or(DriverError::Closed("connection"))?;
            conn.statement(&native).build()?;
        }
        Ok(Box::new(OracleStatement {
            conn: Rc::clone(&self.inner),
            params: ParameterSlots::new(placeholder_positions(sql).len()),
            sql: sql.to_string(),
            native,
            closed: false,
        }))
    }

    fn is_closed(&self) -> bool {
        self.inner.borrow().is_none()
    }

    fn close(&mut self) -> DriverResult<()> {
        match self.inner.borrow_mut().take() {
            Some(conn) => Ok(conn.close()?),
            None => Ok(()),
        }
    }
}

pub struct OracleStatement {
    conn: SharedConnection,
    sql: String,
    native: String,
    params: ParameterSlots,
    closed: bool,
}

/// Converts bound values into Oracle bind values; typed NULLs keep their type.
fn to_oracle(values: &[Value]) -> Vec<Box<dyn ToSql>> {
    values
        .iter()
        .map(|v| -> Box<dyn ToSql> {
            match v {
                Value::Null(SqlType::Text) => Box::new(None::<String>),
                Value::Null(SqlType::Integer) => Box::new(None::<i64>),
                Value::Null(SqlType::Date) => Box::new(None::<NaiveDate>),
                Value::Text(s) => Box::new(s.clone()),
                Value::Integer(i) => Box::new(*i),
                Value::Real(f) => Box::new(*f),
                Value::Date(d) => Box::new(*d),
            }
        })
        .collect()
}

impl OracleStatement {
    fn ensure_open(&self) -> DriverResult<()> {
        if self.closed {
            Err(DriverError::Closed("statement"))
        } else {
            Ok(())
        }
    }
}

impl Statement for OracleStatement {
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
        let binds = to_oracle(&self.params.values()?);
        let refs: Vec<&dyn ToSql> = binds.iter().map(|b| b.as_ref()).collect();

        let guard = self.conn.borrow();
        let conn = guard.as_ref().ok_or(DriverError::Closed("connection"))?;
        let rows = conn.query(&self.native, &refs)?;
        let columns: Vec<String> = rows.column_info().iter().map(|c| c.name().to_string()).collect();

        let mut data = Vec::new();
        for row in rows {
            let row = row?;
            let mut values = Vec::with_capacity(columns.len());
            for i in 0..columns.len() {
                // Columns are read the way `getString` reads them.
                let text: Option<String> = row.get(i)?;
                values.push(Value::text(text));
            }
            data.push(values);
        }
        Ok(Box::new(MemoryResultSet::new(columns, data)))
    }

    fn execute_update(&mut self) -> DriverResult<u64> {
        self.ensure_open()?;
        let binds = to_oracle(&self.params.values()?);
        let refs: Vec<&dyn ToSql> = binds.iter().map(|b| b.as_ref()).collect();

        let guard = self.conn.borrow();
        let conn = guard.as_ref().ok_or(DriverError::Closed("connection"))?;
        let stmt = conn.execute(&self.native, &refs)?;
        Ok(stmt.row_count()?)
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
