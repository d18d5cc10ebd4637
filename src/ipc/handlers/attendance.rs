use crate::ipc::helpers::{
    ensure_exists, execute_failed, get_optional_str, get_required_date, get_required_str,
    list_roster, run, select_entities, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{AttendanceRecord, AttendanceStatus};
use crate::planner::{self, AttendanceScope, ExecuteError, ExistingRecord};
use crate::report;
use crate::store::{Filter, Query, RowStore};
use serde_json::json;
use std::collections::HashMap;

fn day_records(
    store: &dyn RowStore,
    class_id: Option<&str>,
    date: &str,
) -> Result<Vec<AttendanceRecord>, HandlerErr> {
    let mut query = Query::from("attendance")
        .filter(Filter::eq("date", date))
        .order_by("created_at", true);
    if let Some(class_id) = class_id {
        query = query.filter(Filter::eq("class_id", class_id));
    }
    select_entities(store, &query, "attendance")
}

/// Keyed by student. If the store somehow holds two rows for one student on
/// one day, the oldest is the one that gets updated.
fn existing_by_student(
    records: Vec<AttendanceRecord>,
) -> HashMap<String, ExistingRecord<AttendanceStatus>> {
    let mut out = HashMap::new();
    for r in records {
        out.entry(r.student_id).or_insert(ExistingRecord {
            record_id: r.id,
            value: r.status,
        });
    }
    out
}

fn parse_statuses(
    params: &serde_json::Value,
) -> Result<HashMap<String, AttendanceStatus>, HandlerErr> {
    let Some(obj) = params.get("statuses") else {
        return Ok(HashMap::new());
    };
    let obj = obj
        .as_object()
        .ok_or_else(|| HandlerErr::bad_params("statuses must be an object"))?;
    let mut out = HashMap::with_capacity(obj.len());
    for (student_id, v) in obj {
        let raw = v
            .as_str()
            .ok_or_else(|| HandlerErr::bad_params(format!("status for {} must be a string", student_id)))?;
        let status = raw.parse::<AttendanceStatus>().map_err(HandlerErr::bad_params)?;
        out.insert(student_id.clone(), status);
    }
    Ok(out)
}

fn attendance_open(
    store: &dyn RowStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    let date = get_required_date(params, "date")?;
    ensure_exists(store, "classes", &class_id, "class")?;

    let roster = list_roster(store, &class_id)?;
    let existing = existing_by_student(day_records(store, Some(class_id.as_str()), &date)?);

    let students: Vec<serde_json::Value> = roster
        .iter()
        .map(|s| {
            json!({
                "id": s.id,
                "name": s.name,
                "rollno": s.rollno,
                "status": existing.get(&s.id).map(|r| r.value),
            })
        })
        .collect();
    let statuses: serde_json::Map<String, serde_json::Value> = existing
        .iter()
        .map(|(student_id, r)| (student_id.clone(), json!(r.value)))
        .collect();

    Ok(json!({
        "classId": class_id,
        "date": date,
        "students": students,
        "statuses": statuses,
    }))
}

fn attendance_save(
    store: &dyn RowStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    let date = get_required_date(params, "date")?;
    let desired = parse_statuses(params)?;

    let roster = list_roster(store, &class_id)?;
    if roster.is_empty() {
        return Err(HandlerErr::new(
            "validation_failed",
            "No students found in this class",
        ));
    }
    let existing = existing_by_student(day_records(store, Some(class_id.as_str()), &date)?);

    let plan = planner::plan_attendance(
        &existing,
        &desired,
        &roster,
        AttendanceScope {
            class_id: &class_id,
            date: &date,
        },
    );
    let summary = planner::execute_plan(store, "attendance", &plan).map_err(|e| {
        let context = match e {
            ExecuteError::Update { .. } => "Error updating attendance",
            ExecuteError::Insert { .. } => "Error saving attendance",
        };
        execute_failed(context, e)
    })?;

    Ok(json!({
        "classId": class_id,
        "date": date,
        "updated": summary.updated,
        "inserted": summary.inserted,
        "message": "Attendance saved successfully!",
    }))
}

fn attendance_report(
    store: &dyn RowStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    let start = get_required_date(params, "startDate")?;
    let end = get_required_date(params, "endDate")?;
    // ISO dates order lexically.
    if start > end {
        return Err(HandlerErr::bad_params("startDate must not be after endDate"));
    }
    ensure_exists(store, "classes", &class_id, "class")?;

    let roster = list_roster(store, &class_id)?;
    let records: Vec<AttendanceRecord> = select_entities(
        store,
        &Query::from("attendance")
            .filter(Filter::eq("class_id", class_id.as_str()))
            .filter(Filter::gte("date", start.as_str()))
            .filter(Filter::lte("date", end.as_str())),
        "attendance",
    )?;

    let rows = report::build_attendance_report(&roster, &records);
    Ok(json!({
        "classId": class_id,
        "startDate": start,
        "endDate": end,
        "rows": rows,
    }))
}

fn attendance_day_summary(
    store: &dyn RowStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let date = get_required_date(params, "date")?;
    let class_id = get_optional_str(params, "classId");
    let records = day_records(store, class_id.as_deref(), &date)?;
    Ok(json!({
        "date": date,
        "classId": class_id,
        "counts": report::summarize_day(&records),
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "attendance.open" => Some(run(state, req, attendance_open)),
        "attendance.save" => Some(run(state, req, attendance_save)),
        "attendance.report" => Some(run(state, req, attendance_report)),
        "attendance.daySummary" => Some(run(state, req, attendance_day_summary)),
        _ => None,
    }
}
