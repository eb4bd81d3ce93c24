/// Driver Seam Module
///
/// Synchronous connection abstractions shared by every database vendor:
/// - `Driver`: opens connections for one database kind
/// - `Connection`: a live connection that prepares statements
/// - `Statement`: a prepared statement with positional parameters
/// - `ResultSet`: a forward-only cursor over result rows
///
/// Handles are single-threaded objects owned by one lifecycle manager; only
/// drivers (which are shared process-wide) are `Send + Sync`.
use crate::core::db::dialect::Dialect;
use crate::core::db::value::{Row, Value};
use crate::core::error::DriverError;
use std::collections::VecDeque;
use std::sync::Arc;

/// Result type for driver operations.
pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Factory for live connections of one database kind.
pub trait Driver: Send + Sync {
    /// Opens a new connection. No retry is attempted.
    fn open(&self) -> DriverResult<Box<dyn Connection>>;

    /// Human-readable driver name for logs.
    fn name(&self) -> &'static str;
}

/// A live database connection.
pub trait Connection {
    /// Dialect the connection speaks.
    fn dialect(&self) -> Dialect;

    /// Prepares a statement. Preparation errors (syntax, missing tables) are
    /// reported here rather than at execution time.
    fn prepare(&mut self, sql: &str) -> DriverResult<Box<dyn Statement>>;

    fn is_closed(&self) -> bool;

    /// Closes the connection. Closing an already closed connection is a no-op.
    fn close(&mut self) -> DriverResult<()>;
}

/// A prepared statement with 1-based positional parameters.
pub trait Statement {
    fn sql(&self) -> &str;

    /// Number of `?` placeholders in the statement.
    fn parameter_count(&self) -> usize;

    /// Binds a value to a 1-based parameter index.
    fn bind(&mut self, index: usize, value: Value) -> DriverResult<()>;

    /// Binds `params` to indexes `1..=params.len()`.
    fn bind_all(&mut self, params: &[Value]) -> DriverResult<()> {
        for (i, value) in params.iter().enumerate() {
            self.bind(i + 1, value.clone())?;
        }
        Ok(())
    }

    fn clear_parameters(&mut self);

    /// Runs the statement as a query.
    fn execute_query(&mut self) -> DriverResult<Box<dyn ResultSet>>;

    /// Runs the statement as an insert/update/delete, returning affected rows.
    fn execute_update(&mut self) -> DriverResult<u64>;

    fn is_closed(&self) -> bool;

    fn close(&mut self) -> DriverResult<()>;
}

/// A forward-only cursor over result rows.
pub trait ResultSet {
    fn columns(&self) -> &[String];

    /// Advances to the next row, `None` once exhausted.
    fn next(&mut self) -> DriverResult<Option<Row>>;

    fn is_closed(&self) -> bool;

    fn close(&mut self) -> DriverResult<()>;
}

/// Positional parameter storage shared by the driver statements.
#[derive(Debug, Clone, Default)]
pub struct ParameterSlots {
    slots: Vec<Option<Value>>,
}

impl ParameterSlots {
    pub fn new(count: usize) -> Self {
        ParameterSlots {
            slots: vec![None; count],
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn set(&mut self, index: usize, value: Value) -> DriverResult<()> {
        if index == 0 || index > self.slots.len() {
            return Err(DriverError::ParameterIndex {
                index,
                count: self.slots.len(),
            });
        }
        self.slots[index - 1] = Some(value);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = None);
    }

    /// All bound values in order; fails on the first unbound slot.
    pub fn values(&self) -> DriverResult<Vec<Value>> {
        self.slots
            .iter()
            .enumerate()
            .map(|(i, slot)| {
                slot.clone()
                    .ok_or(DriverError::UnboundParameter { index: i + 1 })
            })
            .collect()
    }
}

/// Result set whose rows were fully read when the statement executed.
#[derive(Debug)]
pub struct MemoryResultSet {
    columns: Arc<[String]>,
    rows: VecDeque<Vec<Value>>,
    closed: bool,
}

impl MemoryResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        MemoryResultSet {
            columns: columns.into(),
            rows: rows.into(),
            closed: false,
        }
    }
}

impl ResultSet for MemoryResultSet {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn next(&mut self) -> DriverResult<Option<Row>> {
        if self.closed {
            return Err(DriverError::Closed("result set"));
        }
        Ok(self
            .rows
            .pop_front()
            .map(|values| Row::new(Arc::clone(&self.columns), values)))
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn close(&mut self) -> DriverResult<()> {
        self.closed = true;
        self.rows.clear();
        Ok(())
    }
}

/// Drains a result set into its rows.
pub fn collect_rows(rs: &mut dyn ResultSet) -> DriverResult<Vec<Row>> {
    let mut rows = Vec::new();
    while let Some(row) = rs.next()? {
        rows.push(row);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_slots_bounds() {
        let mut slots = ParameterSlots::new(2);
        assert!(matches!(
            slots.set(0, Value::Integer(1)),
            Err(DriverError::ParameterIndex { index: 0, count: 2 })
        ));
        assert!(slots.set(3, Value::Integer(1)).is_err());

        slots.set(1, Value::Integer(1)).unwrap();
        assert!(matches!(
            slots.values(),
            Err(DriverError::UnboundParameter { index: 2 })
        ));

        slots.set(2, Value::from("x")).unwrap();
        assert_eq!(slots.values().unwrap(), vec![Value::Integer(1), Value::from("x")]);

        slots.clear();
        assert!(slots.values().is_err());
    }

    #[test]
    fn test_memory_result_set_cursor() {
        let mut rs = MemoryResultSet::new(
            vec!["a".to_string()],
            vec![vec![Value::Integer(1)], vec![Value::Integer(2)]],
        );
        let rows = collect_rows(&mut rs).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].get_str("A"), Some("2".to_string()));
        assert!(rs.next().unwrap().is_none());

        rs.close().unwrap();
        assert!(rs.is_closed());
        assert!(matches!(rs.next(), Err(DriverError::Closed("result set"))));
    }
}
