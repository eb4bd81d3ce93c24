/// SQL Dialect Module
///
/// The legacy queries are written once and rendered per vendor. Only the
/// constructs that actually differ between Oracle, SQL Server and the embedded
/// SQLite database live here.
use std::borrow::Cow;
use std::fmt;

/// SQL dialect spoken by a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    Oracle,
    SqlServer,
    Sqlite,
}

impl Dialect {
    /// Expression rendering a date column as a `dd/mm/yyyy` string.
    ///
    /// Birth dates are compared and returned as display strings, never as
    /// typed dates.
    pub fn format_date(&self, column: &str) -> String {
        match self {
            Dialect::Oracle => format!("TO_CHAR({},'dd/mm/yyyy')", column),
            Dialect::SqlServer => format!("CONVERT(varchar(10), {}, 103)", column),
            Dialect::Sqlite => format!("strftime('%d/%m/%Y', {})", column),
        }
    }

    /// Restricts a SELECT to its first `n` rows.
    pub fn limit(&self, sql: &str, n: u32) -> String {
        match self {
            Dialect::Oracle => format!("{} fetch first {} rows only", sql, n),
            Dialect::Sqlite => format!("{} limit {}", sql, n),
            Dialect::SqlServer => {
                let trimmed = sql.trim_start();
                let offset = sql.len() - trimmed.len();
                let is_select = trimmed
                    .get(..6)
                    .map_or(false, |p| p.eq_ignore_ascii_case("select"));
                if is_select {
                    format!("{}select top {}{}", &sql[..offset], n, &trimmed[6..])
                } else {
                    format!("select top {} * from ({}) limited", n, sql)
                }
            }
        }
    }

    /// Qualifies a table name with a schema when one is configured.
    pub fn qualify(&self, schema: Option<&str>, table: &str) -> String {
        match schema.map(str::trim).filter(|s| !s.is_empty()) {
            Some(s) => format!("{}.{}", s, table),
            None => table.to_string(),
        }
    }

    /// Rewrites `?` placeholders into the native style of the dialect.
    ///
    /// Oracle binds positionally with `:1`, `:2`, ...; the other dialects take
    /// `?` as written.
    pub fn native_placeholders<'a>(&self, sql: &'a str) -> Cow<'a, str> {
        match self {
            Dialect::Oracle => {
                let positions = placeholder_positions(sql);
                if positions.is_empty() {
                    return Cow::Borrowed(sql);
                }
                let mut out = String::with_capacity(sql.len() + positions.len() * 2);
                let mut last = 0;
                for (n, pos) in positions.iter().enumerate() {
                    out.push_str(&sql[last..*pos]);
                    out.push(':');
                    out.push_str(&(n + 1).to_string());
                    last = pos + 1;
                }
                out.push_str(&sql[last..]);
                Cow::Owned(out)
            }
            Dialect::SqlServer | Dialect::Sqlite => Cow::Borrowed(sql),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Oracle => write!(f, "Oracle"),
            Dialect::SqlServer => write!(f, "SQL Server"),
            Dialect::Sqlite => write!(f, "SQLite"),
        }
    }
}

/// Byte offsets of `?` placeholders outside quoted literals, identifiers
/// and comments.
pub(crate) fn placeholder_positions(sql: &str) -> Vec<usize> {
    let bytes = sql.as_bytes();
    let mut positions = Vec::new();
    let mut quote: Option<u8> = None;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            // A doubled quote closes and immediately reopens, which nets out.
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None => match b {
                b'\'' | b'"' => quote = Some(b),
                b'?' => positions.push(i),
                b'-' if bytes.get(i + 1) == Some(&b'-') => {
                    i = sql[i..].find('\n').map_or(bytes.len(), |n| i + n);
                }
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    i = sql[i + 2..].find("*/").map_or(bytes.len(), |n| i + 2 + n + 1);
                }
                _ => {}
            },
        }
        i += 1;
    }
    positions
}
