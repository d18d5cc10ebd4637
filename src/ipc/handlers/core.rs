use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{run, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::store::{Filter, RowStore};
use chrono::{Datelike, NaiveDate};
use serde_json::json;
use std::path::PathBuf;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string())
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    match state.open_workspace(&path) {
        Ok(()) => ok(&req.id, json!({ "workspacePath": path.to_string_lossy() })),
        Err(e) => err(&req.id, "db_open_failed", format!("{e:?}"), None),
    }
}

/// First and last day of the month containing `day`.
fn month_bounds(day: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = day.with_day(1).unwrap_or(day);
    let next_month = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
    };
    let last = next_month.and_then(|d| d.pred_opt()).unwrap_or(first);
    (first, last)
}

fn dashboard_stats(
    store: &dyn RowStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let today = match params.get("today").and_then(|v| v.as_str()) {
        Some(raw) => crate::validate::parse_date(raw)
            .ok_or_else(|| HandlerErr::bad_params("today must be YYYY-MM-DD"))?,
        None => chrono::Local::now().date_naive(),
    };
    let (first, last) = month_bounds(today);
    let count = |table: &str, filters: &[Filter]| {
        store
            .count(table, filters)
            .map_err(|e| HandlerErr::store("db_query_failed", "Error fetching dashboard stats", e))
    };

    Ok(json!({
        "students": count("students", &[])?,
        "classes": count("classes", &[])?,
        "teachers": count("teachers", &[])?,
        "exams": count("exams", &[])?,
        "attendance": count(
            "attendance",
            &[
                Filter::gte("date", first.format("%Y-%m-%d").to_string()),
                Filter::lte("date", last.format("%Y-%m-%d").to_string()),
            ],
        )?,
        "monthStart": first.format("%Y-%m-%d").to_string(),
        "monthEnd": last.format("%Y-%m-%d").to_string(),
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        "dashboard.stats" => Some(run(state, req, dashboard_stats)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_bounds_cover_whole_month() {
        let d = NaiveDate::from_ymd_opt(2024, 2, 14).expect("date");
        let (first, last) = month_bounds(d);
        assert_eq!(first.to_string(), "2024-02-01");
        assert_eq!(last.to_string(), "2024-02-29");

        let d = NaiveDate::from_ymd_opt(2023, 12, 31).expect("date");
        let (first, last) = month_bounds(d);
        assert_eq!(first.to_string(), "2023-12-01");
        assert_eq!(last.to_string(), "2023-12-31");
    }
}
