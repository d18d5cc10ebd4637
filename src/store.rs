//! Row-oriented data access by table name.
//!
//! Handlers and the reconciliation planner only see [`RowStore`]; the SQLite
//! adapter below stands in for the hosted store. Rows travel as JSON objects
//! so the store stays opaque about entity shapes.

use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::Path;
use thiserror::Error;
use uuid::Uuid;

pub type Row = Map<String, Value>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("refusing to {0} without a filter")]
    MissingFilter(&'static str),

    #[error("unsupported value for column {0}")]
    UnsupportedValue(String),

    #[error("{0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("row decode failed: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gte,
    Lte,
}

impl FilterOp {
    fn sql(self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Gte => ">=",
            FilterOp::Lte => "<=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Self::new(column, FilterOp::Eq, value)
    }

    pub fn gte(column: &str, value: impl Into<Value>) -> Self {
        Self::new(column, FilterOp::Gte, value)
    }

    pub fn lte(column: &str, value: impl Into<Value>) -> Self {
        Self::new(column, FilterOp::Lte, value)
    }

    fn new(column: &str, op: FilterOp, value: impl Into<Value>) -> Self {
        Self {
            column: column.to_string(),
            op,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// Parent-table columns pulled in through a foreign key, returned nested
/// under the parent table name (`{"classes": {"name": ...}}`).
#[derive(Debug, Clone, PartialEq)]
pub struct Embed {
    pub table: String,
    pub foreign_key: String,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: String,
    pub columns: Vec<String>,
    pub filters: Vec<Filter>,
    pub order: Vec<Order>,
    pub embeds: Vec<Embed>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn from(table: &str) -> Self {
        Self {
            table: table.to_string(),
            columns: Vec::new(),
            filters: Vec::new(),
            order: Vec::new(),
            embeds: Vec::new(),
            limit: None,
        }
    }

    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, column: &str, ascending: bool) -> Self {
        self.order.push(Order {
            column: column.to_string(),
            ascending,
        });
        self
    }

    pub fn embed(mut self, table: &str, foreign_key: &str, columns: &[&str]) -> Self {
        self.embeds.push(Embed {
            table: table.to_string(),
            foreign_key: foreign_key.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        });
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }
}

pub trait RowStore {
    fn select(&self, query: &Query) -> Result<Vec<Row>, StoreError>;

    /// Inserts the whole batch or nothing. Returns the rows as stored,
    /// including generated `id` and `created_at`.
    fn insert(&self, table: &str, rows: &[Row]) -> Result<Vec<Row>, StoreError>;

    fn update(&self, table: &str, patch: &Row, filters: &[Filter]) -> Result<usize, StoreError>;

    fn delete(&self, table: &str, filters: &[Filter]) -> Result<usize, StoreError>;

    fn count(&self, table: &str, filters: &[Filter]) -> Result<i64, StoreError> {
        let mut query = Query::from(table).columns(&["id"]);
        query.filters = filters.to_vec();
        Ok(self.select(&query)?.len() as i64)
    }

    fn select_one(&self, query: &Query) -> Result<Option<Row>, StoreError> {
        let limited = query.clone().limit(1);
        Ok(self.select(&limited)?.into_iter().next())
    }
}

pub fn to_row<T: Serialize>(value: &T) -> Result<Row, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::UnsupportedValue("<row>".to_string())),
    }
}

pub fn from_row<T: DeserializeOwned>(row: Row) -> Result<T, StoreError> {
    Ok(serde_json::from_value(Value::Object(row))?)
}

pub fn from_rows<T: DeserializeOwned>(rows: Vec<Row>) -> Result<Vec<T>, StoreError> {
    rows.into_iter().map(from_row).collect()
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(workspace: &Path) -> anyhow::Result<Self> {
        Ok(Self {
            conn: crate::db::open_db(workspace)?,
        })
    }

    #[cfg(test)]
    pub fn in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        crate::db::create_schema(&conn)?;
        Ok(Self { conn })
    }
}

impl RowStore for SqliteStore {
    fn select(&self, query: &Query) -> Result<Vec<Row>, StoreError> {
        let table = ident(&query.table)?;
        let mut select_list: Vec<String> = Vec::new();
        if query.columns.is_empty() {
            select_list.push("t.*".to_string());
        } else {
            for c in &query.columns {
                select_list.push(format!("t.\"{}\"", ident(c)?));
            }
        }
        let mut joins = String::new();
        for (i, e) in query.embeds.iter().enumerate() {
            let parent = ident(&e.table)?;
            for c in &e.columns {
                let c = ident(c)?;
                select_list.push(format!("p{i}.\"{c}\" AS \"{parent}.{c}\""));
            }
            joins.push_str(&format!(
                " LEFT JOIN \"{parent}\" p{i} ON p{i}.\"id\" = t.\"{}\"",
                ident(&e.foreign_key)?
            ));
        }

        let mut params: Vec<SqlValue> = Vec::new();
        let mut sql = format!(
            "SELECT {} FROM \"{table}\" t{joins}{}",
            select_list.join(", "),
            where_clause(&query.filters, "t.", &mut params)?
        );
        if !query.order.is_empty() {
            let mut parts = Vec::new();
            for o in &query.order {
                let dir = if o.ascending { "ASC" } else { "DESC" };
                parts.push(format!("t.\"{}\" {dir}", ident(&o.column)?));
            }
            sql.push_str(&format!(" ORDER BY {}", parts.join(", ")));
        }
        if let Some(n) = query.limit {
            sql.push_str(&format!(" LIMIT {n}"));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        let mut out = Vec::new();
        while let Some(r) = rows.next()? {
            let mut row = Row::new();
            for (i, name) in names.iter().enumerate() {
                let value = json_from_sql(r.get_ref(i)?);
                match name.split_once('.') {
                    Some((parent, field)) => {
                        let nested = row
                            .entry(parent.to_string())
                            .or_insert_with(|| Value::Object(Map::new()));
                        if let Value::Object(m) = nested {
                            m.insert(field.to_string(), value);
                        }
                    }
                    None => {
                        row.insert(name.clone(), value);
                    }
                }
            }
            // A missing parent comes back as null rather than an object of nulls.
            for e in &query.embeds {
                let empty = row
                    .get(&e.table)
                    .and_then(|v| v.as_object())
                    .map(|m| m.values().all(Value::is_null))
                    .unwrap_or(false);
                if empty {
                    row.insert(e.table.clone(), Value::Null);
                }
            }
            out.push(row);
        }
        tracing::debug!(table = %query.table, rows = out.len(), "select");
        Ok(out)
    }

    fn insert(&self, table: &str, rows: &[Row]) -> Result<Vec<Row>, StoreError> {
        let table = ident(table)?;
        let tx = self.conn.unchecked_transaction()?;
        let mut stored = Vec::with_capacity(rows.len());
        for row in rows {
            let mut row = row.clone();
            if !row.get("id").map(Value::is_string).unwrap_or(false) {
                row.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
            }
            if !row.contains_key("created_at") {
                row.insert(
                    "created_at".to_string(),
                    Value::String(
                        chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true),
                    ),
                );
            }
            let mut columns = Vec::with_capacity(row.len());
            let mut params = Vec::with_capacity(row.len());
            for (k, v) in &row {
                columns.push(format!("\"{}\"", ident(k)?));
                params.push(sql_from_json(k, v)?);
            }
            let placeholders = vec!["?"; columns.len()].join(", ");
            tx.execute(
                &format!(
                    "INSERT INTO \"{table}\"({}) VALUES({placeholders})",
                    columns.join(", ")
                ),
                params_from_iter(params.iter()),
            )?;
            stored.push(row);
        }
        tx.commit()?;
        tracing::debug!(table, rows = stored.len(), "insert");
        Ok(stored)
    }

    fn update(&self, table: &str, patch: &Row, filters: &[Filter]) -> Result<usize, StoreError> {
        let table = ident(table)?;
        if filters.is_empty() {
            return Err(StoreError::MissingFilter("update"));
        }
        if patch.is_empty() {
            return Ok(0);
        }
        let mut sets = Vec::with_capacity(patch.len());
        let mut params = Vec::with_capacity(patch.len() + filters.len());
        for (k, v) in patch {
            sets.push(format!("\"{}\" = ?", ident(k)?));
            params.push(sql_from_json(k, v)?);
        }
        let sql = format!(
            "UPDATE \"{table}\" SET {}{}",
            sets.join(", "),
            where_clause(filters, "", &mut params)?
        );
        let n = self.conn.execute(&sql, params_from_iter(params.iter()))?;
        tracing::debug!(table, affected = n, "update");
        Ok(n)
    }

    fn delete(&self, table: &str, filters: &[Filter]) -> Result<usize, StoreError> {
        let table = ident(table)?;
        if filters.is_empty() {
            return Err(StoreError::MissingFilter("delete"));
        }
        let mut params = Vec::new();
        let sql = format!(
            "DELETE FROM \"{table}\"{}",
            where_clause(filters, "", &mut params)?
        );
        let n = self.conn.execute(&sql, params_from_iter(params.iter()))?;
        tracing::debug!(table, affected = n, "delete");
        Ok(n)
    }

    fn count(&self, table: &str, filters: &[Filter]) -> Result<i64, StoreError> {
        let table = ident(table)?;
        let mut params = Vec::new();
        let sql = format!(
            "SELECT COUNT(*) FROM \"{table}\"{}",
            where_clause(filters, "", &mut params)?
        );
        Ok(self
            .conn
            .query_row(&sql, params_from_iter(params.iter()), |r| r.get(0))?)
    }
}

fn ident(name: &str) -> Result<&str, StoreError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit());
    if valid {
        Ok(name)
    } else {
        Err(StoreError::InvalidIdentifier(name.to_string()))
    }
}

fn where_clause(
    filters: &[Filter],
    prefix: &str,
    params: &mut Vec<SqlValue>,
) -> Result<String, StoreError> {
    if filters.is_empty() {
        return Ok(String::new());
    }
    let mut parts = Vec::with_capacity(filters.len());
    for f in filters {
        let column = ident(&f.column)?;
        if f.value.is_null() && f.op == FilterOp::Eq {
            parts.push(format!("{prefix}\"{column}\" IS NULL"));
            continue;
        }
        parts.push(format!("{prefix}\"{column}\" {} ?", f.op.sql()));
        params.push(sql_from_json(column, &f.value)?);
    }
    Ok(format!(" WHERE {}", parts.join(" AND ")))
}

fn sql_from_json(column: &str, v: &Value) -> Result<SqlValue, StoreError> {
    match v {
        Value::Null => Ok(SqlValue::Null),
        Value::Bool(b) => Ok(SqlValue::Integer(i64::from(*b))),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(SqlValue::Integer(i))
            } else if let Some(f) = n.as_f64() {
                Ok(SqlValue::Real(f))
            } else {
                Err(StoreError::UnsupportedValue(column.to_string()))
            }
        }
        Value::String(s) => Ok(SqlValue::Text(s.clone())),
        Value::Array(_) | Value::Object(_) => Err(StoreError::UnsupportedValue(column.to_string())),
    }
}

fn json_from_sql(v: ValueRef<'_>) -> Value {
    match v {
        ValueRef::Null | ValueRef::Blob(_) => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
    }
}
