//! Fluent construction of keyed CRUD statements.
//!
//! A [`Query`] accumulates column/value pairs and conjunctive equality
//! filters for one table, then executes through a [`Database`]. Every
//! value travels through a bound parameter; nothing a caller supplies is
//! ever interpolated into statement text. Identifiers (table and column
//! names) come only from the schema constants of the embedding crate.

use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};

use crate::connection::Database;
use crate::result::QueryResult;

/// A literal bound into a statement through a placeholder.
///
/// Booleans are stored as integers 0/1, the encoding every tracked
/// statistic shares.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Int(i64),
    Real(f64),
    Text(String),
    Bool(bool),
    Null,
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Int(v) => ToSqlOutput::Owned(Value::Integer(*v)),
            SqlValue::Real(v) => ToSqlOutput::Owned(Value::Real(*v)),
            SqlValue::Text(v) => ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes())),
            SqlValue::Bool(v) => ToSqlOutput::Owned(Value::Integer(i64::from(*v))),
            SqlValue::Null => ToSqlOutput::Owned(Value::Null),
        })
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int(v.into())
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<u32> for SqlValue {
    fn from(v: u32) -> Self {
        SqlValue::Int(v.into())
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Real(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_owned())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

/// Builder for one statement against one table.
#[derive(Debug, Clone, Default)]
pub struct Query {
    table: &'static str,
    columns: Vec<&'static str>,
    values: Vec<(&'static str, SqlValue)>,
    filters: Vec<(&'static str, SqlValue)>,
}

impl Query {
    pub fn table(table: &'static str) -> Self {
        Self {
            table,
            ..Self::default()
        }
    }

    /// Add one column to the explicit SELECT list. Without any, SELECT
    /// fetches `*`.
    pub fn column(mut self, column: &'static str) -> Self {
        self.columns.push(column);
        self
    }

    pub fn columns(mut self, columns: impl IntoIterator<Item = &'static str>) -> Self {
        self.columns.extend(columns);
        self
    }

    /// Add one column/value pair for INSERT or UPDATE.
    pub fn value(mut self, column: &'static str, value: impl Into<SqlValue>) -> Self {
        self.values.push((column, value.into()));
        self
    }

    /// Add a whole projection at once, as produced by an entity's
    /// `values` call.
    pub fn values(mut self, pairs: Vec<(&'static str, SqlValue)>) -> Self {
        self.values.extend(pairs);
        self
    }

    /// Add one equality condition; conditions combine with AND.
    pub fn filter(mut self, column: &'static str, value: impl Into<SqlValue>) -> Self {
        self.filters.push((column, value.into()));
        self
    }

    /// Fetch all matching rows. No match is an empty vec, not an error;
    /// so is a failed read (see [`Database::execute_query`]).
    pub fn select(&self, db: &Database) -> Vec<QueryResult> {
        let (sql, params) = self.build_select(None);
        db.execute_query(&sql, &params)
    }

    /// True iff at least one row matches the filters.
    pub fn exists(&self, db: &Database) -> bool {
        let (sql, params) = self.build_select(Some(1));
        !db.execute_query(&sql, &params).is_empty()
    }

    /// Insert one row from the accumulated values. Constraint violations
    /// surface as `false`, letting callers fall back or retry.
    pub fn insert(&self, db: &Database) -> bool {
        let Some((sql, params)) = self.build_insert() else {
            log::warn!("Insert into '{}' built with no values", self.table);
            return false;
        };
        db.execute_update(&sql, &params)
    }

    /// Overwrite the accumulated values on every matching row. Zero rows
    /// changed reads as `false` but is not itself an error.
    pub fn update(&self, db: &Database) -> bool {
        let Some((sql, params)) = self.build_update() else {
            log::warn!("Update of '{}' built with no values", self.table);
            return false;
        };
        db.execute_update(&sql, &params)
    }

    /// Delete every matching row; same contract as update.
    pub fn delete(&self, db: &Database) -> bool {
        let (sql, params) = self.build_delete();
        db.execute_update(&sql, &params)
    }

    fn build_select(&self, limit: Option<u32>) -> (String, Vec<SqlValue>) {
        let cols = if self.columns.is_empty() {
            "*".to_owned()
        } else {
            self.columns.join(", ")
        };
        let mut sql = format!("SELECT {cols} FROM {}", self.table);
        let mut params = Vec::new();
        push_where(&mut sql, &mut params, &self.filters);
        if let Some(n) = limit {
            sql.push_str(&format!(" LIMIT {n}"));
        }
        (sql, params)
    }

    fn build_insert(&self) -> Option<(String, Vec<SqlValue>)> {
        if self.values.is_empty() {
            return None;
        }
        let columns: Vec<&str> = self.values.iter().map(|(c, _)| *c).collect();
        let placeholders: Vec<String> = (1..=self.values.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table,
            columns.join(", "),
            placeholders.join(", ")
        );
        let params = self.values.iter().map(|(_, v)| v.clone()).collect();
        Some((sql, params))
    }

    fn build_update(&self) -> Option<(String, Vec<SqlValue>)> {
        if self.values.is_empty() {
            return None;
        }
        let sets: Vec<String> = self
            .values
            .iter()
            .enumerate()
            .map(|(i, (c, _))| format!("{c} = ?{}", i + 1))
            .collect();
        let mut sql = format!("UPDATE {} SET {}", self.table, sets.join(", "));
        let mut params: Vec<SqlValue> = self.values.iter().map(|(_, v)| v.clone()).collect();
        push_where(&mut sql, &mut params, &self.filters);
        Some((sql, params))
    }

    fn build_delete(&self) -> (String, Vec<SqlValue>) {
        let mut sql = format!("DELETE FROM {}", self.table);
        let mut params = Vec::new();
        push_where(&mut sql, &mut params, &self.filters);
        (sql, params)
    }
}

/// Append a conjunctive WHERE clause, numbering placeholders after any
/// already in `params`.
fn push_where(sql: &mut String, params: &mut Vec<SqlValue>, filters: &[(&str, SqlValue)]) {
    if filters.is_empty() {
        return;
    }
    let offset = params.len();
    let clauses: Vec<String> = filters
        .iter()
        .enumerate()
        .map(|(i, (c, _))| format!("{c} = ?{}", offset + i + 1))
        .collect();
    sql.push_str(&format!(" WHERE {}", clauses.join(" AND ")));
    params.extend(filters.iter().map(|(_, v)| v.clone()));
}
