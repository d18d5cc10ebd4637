use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::model::Student;
use crate::planner::{ExecuteError, PlanError};
use crate::store::{from_rows, Filter, Query, Row, RowStore, StoreError};
use crate::validate;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::fmt::Display;

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn bad_params(message: impl Into<String>) -> Self {
        Self::new("bad_params", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("not_found", message)
    }

    /// Store failures keep the store's own message after the screen's context.
    pub fn store(code: &'static str, context: &str, e: impl Display) -> Self {
        Self::new(code, format!("{context}: {e}"))
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

impl From<PlanError> for HandlerErr {
    fn from(e: PlanError) -> Self {
        let message = e.to_string();
        match e {
            PlanError::MarksOutOfRange {
                student_id,
                marks,
                total,
            } => HandlerErr::new("validation_failed", message).with_details(json!({
                "studentId": student_id,
                "marks": marks,
                "min": 0,
                "max": total,
            })),
        }
    }
}

pub fn execute_failed(context: &str, e: ExecuteError) -> HandlerErr {
    let code = match e {
        ExecuteError::Update { .. } => "db_update_failed",
        ExecuteError::Insert { .. } => "db_insert_failed",
    };
    let applied = e.applied_updates();
    HandlerErr::store(code, context, &e).with_details(json!({ "appliedUpdates": applied }))
}

/// Runs a handler body against the open store and wraps the outcome in the
/// response envelope.
pub fn run<F>(state: &AppState, req: &Request, f: F) -> serde_json::Value
where
    F: FnOnce(&dyn RowStore, &serde_json::Value) -> Result<serde_json::Value, HandlerErr>,
{
    let Some(store) = state.store.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match f(store, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => {
            tracing::warn!(method = %req.method, code = error.code, message = %error.message, "request failed");
            error.response(&req.id)
        }
    }
}

pub fn get_required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    required_field(params, key, &format!("missing {}", key))
}

/// Like [`get_required_str`] but with the form's own wording.
pub fn required_field(
    params: &serde_json::Value,
    key: &str,
    message: &str,
) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| HandlerErr::bad_params(message))
}

pub fn get_optional_str(params: &serde_json::Value, key: &str) -> Option<String> {
    validate::clean_optional(params.get(key).and_then(|v| v.as_str()))
}

pub fn get_required_date(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    let raw = get_required_str(params, key)?;
    validate::parse_date(&raw)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .ok_or_else(|| HandlerErr::bad_params(format!("{} must be YYYY-MM-DD", key)))
}

pub fn get_optional_date(
    params: &serde_json::Value,
    key: &str,
) -> Result<Option<String>, HandlerErr> {
    match get_optional_str(params, key) {
        None => Ok(None),
        Some(raw) => validate::parse_date(&raw)
            .map(|d| Some(d.format("%Y-%m-%d").to_string()))
            .ok_or_else(|| HandlerErr::bad_params(format!("{} must be YYYY-MM-DD", key))),
    }
}

/// Accepts a JSON number or a numeric string. Null, missing and blank
/// strings are "no value".
pub fn parse_number(v: Option<&serde_json::Value>) -> Result<Option<f64>, String> {
    let Some(v) = v else { return Ok(None) };
    match v {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Number(n) => Ok(n.as_f64()),
        serde_json::Value::String(s) if s.trim().is_empty() => Ok(None),
        serde_json::Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| format!("'{}' is not a number", s.trim())),
        _ => Err("expected number or string".to_string()),
    }
}

pub fn get_optional_number(
    params: &serde_json::Value,
    key: &str,
) -> Result<Option<f64>, HandlerErr> {
    parse_number(params.get(key)).map_err(|e| HandlerErr::bad_params(format!("{}: {}", key, e)))
}

pub fn fetch_row(
    store: &dyn RowStore,
    table: &str,
    id: &str,
    label: &str,
) -> Result<Row, HandlerErr> {
    fetch_row_with(store, Query::from(table), id, label)
}

/// Single-entity lookup; a missing id is `not_found` so the UI can send the
/// user back to the list.
pub fn fetch_row_with(
    store: &dyn RowStore,
    query: Query,
    id: &str,
    label: &str,
) -> Result<Row, HandlerErr> {
    store
        .select_one(&query.filter(Filter::eq("id", id)))
        .map_err(|e| HandlerErr::store("db_query_failed", &format!("Error fetching {}", label), e))?
        .ok_or_else(|| HandlerErr::not_found(format!("{} not found", label)))
}

pub fn select_rows(store: &dyn RowStore, query: &Query, label: &str) -> Result<Vec<Row>, HandlerErr> {
    store
        .select(query)
        .map_err(|e| HandlerErr::store("db_query_failed", &format!("Error fetching {}", label), e))
}

pub fn select_entities<T: DeserializeOwned>(
    store: &dyn RowStore,
    query: &Query,
    label: &str,
) -> Result<Vec<T>, HandlerErr> {
    from_rows(select_rows(store, query, label)?).map_err(|e| decode_failed(label, e))
}

fn decode_failed(label: &str, e: StoreError) -> HandlerErr {
    HandlerErr::store("db_query_failed", &format!("Error reading {}", label), e)
}

/// Students of a class in name order, the order every class screen uses.
pub fn list_roster(store: &dyn RowStore, class_id: &str) -> Result<Vec<Student>, HandlerErr> {
    select_entities(
        store,
        &Query::from("students")
            .columns(&["id", "name", "rollno", "class_id"])
            .filter(Filter::eq("class_id", class_id))
            .order_by("name", true),
        "students",
    )
}

pub fn ensure_exists(
    store: &dyn RowStore,
    table: &str,
    id: &str,
    label: &str,
) -> Result<(), HandlerErr> {
    fetch_row_with(store, Query::from(table).columns(&["id"]), id, label).map(|_| ())
}

/// Id the store assigned to the first row of an insert.
pub fn inserted_id(rows: &[Row]) -> Result<String, HandlerErr> {
    rows.first()
        .and_then(|r| r.get("id"))
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| HandlerErr::new("db_insert_failed", "store returned no id"))
}

pub fn rows_json(rows: Vec<Row>) -> serde_json::Value {
    serde_json::Value::Array(rows.into_iter().map(serde_json::Value::Object).collect())
}
