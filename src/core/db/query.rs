/// Query Building Module
///
/// This module builds parameterized SQL from a base SELECT (or UPDATE) and
/// a set of optional filters. Every value travels as a bound parameter, in
/// the same order as its placeholder; absent filters contribute neither SQL
/// nor parameters.
use crate::core::db::dialect::{placeholder_positions, Dialect};
use crate::core::db::value::Value;
use crate::core::{LegacyError, Result};
use tracing::debug;

/// How the predicates of a group are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conjunction {
    And,
    Or,
}

impl Conjunction {
    fn keyword(&self) -> &'static str {
        match self {
            Conjunction::And => " and ",
            Conjunction::Or => " or ",
        }
    }
}

/// SQL text plus its parameters in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

#[derive(Debug, Clone)]
enum Clause {
    Predicate { sql: String, params: Vec<Value> },
    Raw(String),
}

/// Normalizes an optional filter value: blank strings count as absent and
/// present strings are trimmed.
fn present(value: Value) -> Option<Value> {
    match value {
        Value::Text(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(Value::Text(trimmed.to_string()))
            }
        }
        Value::Null(_) => None,
        other => Some(other),
    }
}

fn present_str(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Alternatives collected for [`QueryBuilder::group`].
#[derive(Debug, Default)]
pub struct FilterGroup {
    parts: Vec<(String, Vec<Value>)>,
}

impl FilterGroup {
    /// Adds a predicate bound to `value` when it is present.
    pub fn filter<V: Into<Value>>(&mut self, template: &str, value: Option<V>) -> &mut Self {
        if let Some(v) = value.map(Into::into).and_then(present) {
            self.parts.push((template.to_string(), vec![v]));
        }
        self
    }

    /// `upper(column) like ?` bound to `PREFIX%`.
    pub fn starts_with(&mut self, column: &str, prefix: &str) -> &mut Self {
        if let Some(p) = present_str(Some(prefix)) {
            self.parts.push((
                format!("upper({}) like ?", column),
                vec![Value::Text(format!("{}%", p.to_uppercase()))],
            ));
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

/// Builder for parameterized queries with optional filters.
///
/// ```
/// use legacy_dao::core::db::{Dialect, QueryBuilder};
///
/// let query = QueryBuilder::new(Dialect::Sqlite, "select * from tpu_dependentes_dpd dpd")
///     .contains("dpd.dpd_nome_dependente", Some("Silva"))
///     .filter("dpd.dpd_num_cpf = ?", Some("12345678901"))
///     .filter("dpd.dpd_num_identid = ?", None::<&str>)
///     .build()
///     .unwrap();
/// assert_eq!(query.params.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    dialect: Dialect,
    base: String,
    clauses: Vec<Clause>,
    order_by: Vec<String>,
    limit: Option<u32>,
}

impl QueryBuilder {
    pub fn new(dialect: Dialect, base: impl Into<String>) -> Self {
        QueryBuilder {
            dialect,
            base: base.into(),
            clauses: Vec::new(),
            order_by: Vec::new(),
            limit: None,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Mandatory predicate with exactly one placeholder.
    pub fn condition<V: Into<Value>>(mut self, template: &str, value: V) -> Self {
        self.clauses.push(Clause::Predicate {
            sql: template.to_string(),
            params: vec![value.into()],
        });
        self
    }

    /// Predicate emitted only when `value` is present (non-blank for text).
    pub fn filter<V: Into<Value>>(mut self, template: &str, value: Option<V>) -> Self {
        if let Some(v) = value.map(Into::into).and_then(present) {
            self.clauses.push(Clause::Predicate {
                sql: template.to_string(),
                params: vec![v],
            });
        }
        self
    }

    /// Case-insensitive substring match: `upper(column) like %VALUE%`.
    pub fn contains(mut self, column: &str, value: Option<&str>) -> Self {
        if let Some(v) = present_str(value) {
            self.clauses.push(Clause::Predicate {
                sql: format!("upper({}) like ?", column),
                params: vec![Value::Text(format!("%{}%", v.to_uppercase()))],
            });
        }
        self
    }

    /// Compares a date column, rendered as `dd/mm/yyyy`, with `value`.
    pub fn date_equals(mut self, column: &str, value: Option<&str>) -> Self {
        if let Some(v) = present_str(value) {
            self.clauses.push(Clause::Predicate {
                sql: format!("{} = ?", self.dialect.format_date(column)),
                params: vec![Value::from(v)],
            });
        }
        self
    }

    /// Parenthesized group of alternatives; an empty group adds nothing.
    pub fn group<F>(mut self, conjunction: Conjunction, build: F) -> Self
    where
        F: FnOnce(&mut FilterGroup),
    {
        let mut group = FilterGroup::default();
        build(&mut group);
        if group.is_empty() {
            return self;
        }

        let (parts, params): (Vec<String>, Vec<Vec<Value>>) = group.parts.into_iter().unzip();
        self.clauses.push(Clause::Predicate {
            sql: format!("({})", parts.join(conjunction.keyword())),
            params: params.into_iter().flatten().collect(),
        });
        self
    }

    /// Names starting with any of `initials`, OR'ed; blank initials are skipped.
    pub fn starts_with_any<S: AsRef<str>>(self, column: &str, initials: &[S]) -> Self {
        self.group(Conjunction::Or, |g| {
            for initial in initials {
                g.starts_with(column, initial.as_ref());
            }
        })
    }

    /// `column in (?, ?, ...)` with one parameter per value; no values, no clause.
    pub fn any_of<I, V>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let params: Vec<Value> = values.into_iter().map(Into::into).collect();
        if params.is_empty() {
            return self;
        }
        let marks = vec!["?"; params.len()].join(", ");
        self.clauses.push(Clause::Predicate {
            sql: format!("{} in ({})", column, marks),
            params,
        });
        self
    }

    /// Literal clause without parameters.
    pub fn raw(mut self, clause: impl Into<String>) -> Self {
        self.clauses.push(Clause::Raw(clause.into()));
        self
    }

    pub fn order_by(mut self, expr: &str) -> Self {
        self.order_by.push(expr.to_string());
        self
    }

    /// Restricts the result to the first `n` rows.
    pub fn limit(mut self, n: u32) -> Self {
        self.limit = Some(n);
        self
    }

    /// Assembles the SQL and the parameter list.
    ///
    /// Fails when a raw clause or the base carries a placeholder, since the
    /// parameter order could not be guaranteed.
    pub fn build(self) -> Result<BuiltQuery> {
        let mut sql = self.base.trim_end().to_string();
        let mut params = Vec::new();
        let mut predicates = Vec::with_capacity(self.clauses.len());

        for clause in self.clauses {
            match clause {
                Clause::Predicate { sql: p, params: values } => {
                    let expected = count_placeholders(&p);
                    if expected != values.len() {
                        return Err(LegacyError::Query(format!(
                            "predicate '{}' has {} placeholders but {} values",
                            p,
                            expected,
                            values.len()
                        )));
                    }
                    predicates.push(p);
                    params.extend(values);
                }
                Clause::Raw(r) => {
                    if count_placeholders(&r) > 0 {
                        return Err(LegacyError::Query(format!(
                            "raw clause '{}' must not contain placeholders",
                            r
                        )));
                    }
                    predicates.push(r);
                }
            }
        }

        if count_placeholders(&sql) > 0 {
            return Err(LegacyError::Query(
                "base query must not contain placeholders".to_string(),
            ));
        }
        if !predicates.is_empty() {
            sql.push_str(" where ");
            sql.push_str(&predicates.join(" and "));
        }
        if !self.order_by.is_empty() {
            sql.push_str(" order by ");
            sql.push_str(&self.order_by.join(", "));
        }
        if let Some(n) = self.limit {
            sql = self.dialect.limit(&sql, n);
        }

        debug!(sql = %sql, params = params.len(), "built query");
        Ok(BuiltQuery { sql, params })
    }
}

/// Number of `?` placeholders outside quoted literals.
pub fn count_placeholders(sql: &str) -> usize {
    placeholder_positions(sql).len()
}

/// Splits a hyphen- or comma-joined code list into trimmed, non-empty codes.
pub fn parse_code_list(input: &str) -> Vec<String> {
    input
        .split(|c| c == '-' || c == ',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
