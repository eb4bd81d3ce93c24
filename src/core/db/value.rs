/// Value and Row Module
///
/// Parameter values bound to statements and rows read back from result sets.
/// Values are driver-neutral; each driver converts them to its own types.
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// SQL type of a typed NULL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SqlType {
    Text,
    Integer,
    Date,
}

/// A bindable SQL value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Value {
    /// NULL of a known SQL type
    Null(SqlType),
    Text(String),
    Integer(i64),
    Real(f64),
    /// Calendar date without time
    Date(NaiveDate),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null(_))
    }

    /// A text value, or a text-typed NULL when absent.
    pub fn text(value: Option<impl Into<String>>) -> Self {
        match value {
            Some(v) => Value::Text(v.into()),
            None => Value::Null(SqlType::Text),
        }
    }

    /// A date value, or a date-typed NULL when absent.
    pub fn date(value: Option<NaiveDate>) -> Self {
        match value {
            Some(d) => Value::Date(d),
            None => Value::Null(SqlType::Date),
        }
    }

    /// Renders the value as text the way the legacy drivers read columns
    /// with `getString`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Value::Null(_) => None,
            Value::Text(s) => Some(s.clone()),
            Value::Integer(i) => Some(i.to_string()),
            Value::Real(f) => Some(f.to_string()),
            Value::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
        }
    }

    pub fn sql_type(&self) -> &'static str {
        match self {
            Value::Null(_) => "NULL",
            Value::Text(_) => "VARCHAR",
            Value::Integer(_) => "INTEGER",
            Value::Real(_) => "REAL",
            Value::Date(_) => "DATE",
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(i64::from(value))
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Value::Date(value)
    }
}

/// Redacting display: only the type is shown so bound values never reach logs.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.sql_type())
    }
}

/// A single result row.
///
/// Column lookup by name is case-insensitive: Oracle reports unquoted
/// identifiers in upper case while the queries are written in lower case.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        Row { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.index_of(name).and_then(|i| self.values.get(i))
    }

    /// Reads a column as a string, `None` for NULL or a missing column.
    pub fn get_str(&self, name: &str) -> Option<String> {
        self.get(name).and_then(Value::as_text)
    }

    /// Whether the row carries the column at all.
    pub fn has_column(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }
}
