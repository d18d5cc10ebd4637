use crate::ipc::helpers::{
    execute_failed, fetch_row_with, get_required_str, list_roster, parse_number, run,
    select_entities, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{Exam, ExamResult};
use crate::planner::{self, ExistingRecord};
use crate::report;
use crate::store::{from_row, Filter, Query, Row, RowStore};
use serde_json::json;
use std::collections::{BTreeMap, HashMap, HashSet};

fn load_exam(store: &dyn RowStore, exam_id: &str) -> Result<(Row, Exam), HandlerErr> {
    let row = fetch_row_with(
        store,
        Query::from("exams")
            .embed("classes", "class_id", &["name"])
            .embed("subjects", "subject_id", &["name"]),
        exam_id,
        "exam",
    )?;
    let exam: Exam = from_row(row.clone())
        .map_err(|e| HandlerErr::store("db_query_failed", "Error reading exam", e))?;
    Ok((row, exam))
}

fn load_results(store: &dyn RowStore, exam_id: &str) -> Result<Vec<ExamResult>, HandlerErr> {
    select_entities(
        store,
        &Query::from("exam_results")
            .filter(Filter::eq("exam_id", exam_id))
            .order_by("created_at", true),
        "results",
    )
}

/// `{studentId: marks}` where marks is a number, a numeric string, blank or
/// null.
fn parse_marks(
    params: &serde_json::Value,
    key: &str,
) -> Result<BTreeMap<String, Option<f64>>, HandlerErr> {
    let Some(v) = params.get(key) else {
        return Ok(BTreeMap::new());
    };
    let obj = v
        .as_object()
        .ok_or_else(|| HandlerErr::bad_params(format!("{} must be an object", key)))?;
    let mut out = BTreeMap::new();
    for (student_id, raw) in obj {
        let marks = parse_number(Some(raw))
            .map_err(|e| HandlerErr::bad_params(format!("marks for {}: {}", student_id, e)))?;
        out.insert(student_id.clone(), marks);
    }
    Ok(out)
}

fn results_open(
    store: &dyn RowStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let exam_id = get_required_str(params, "examId")?;
    let drafts: HashMap<String, Option<f64>> = parse_marks(params, "drafts")?.into_iter().collect();

    let (exam_row, exam) = load_exam(store, &exam_id)?;
    let roster = list_roster(store, &exam.class_id)?;
    let results = load_results(store, &exam_id)?;

    let rows = report::build_results_view(&roster, &results, &drafts, &exam);
    Ok(json!({ "exam": exam_row, "rows": rows }))
}

fn results_save(
    store: &dyn RowStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let exam_id = get_required_str(params, "examId")?;
    let desired = parse_marks(params, "marks")?;

    let (_, exam) = load_exam(store, &exam_id)?;
    let roster = list_roster(store, &exam.class_id)?;
    let enrolled: HashSet<&str> = roster.iter().map(|s| s.id.as_str()).collect();
    // Blank cells are skipped by the planner, so only scored entries must be enrolled.
    let stranger = desired
        .iter()
        .find(|(id, marks)| marks.is_some() && !enrolled.contains(id.as_str()))
        .map(|(id, _)| id);
    if let Some(stranger) = stranger {
        return Err(HandlerErr::bad_params(format!(
            "student {} is not in this exam's class",
            stranger
        )));
    }

    let mut existing = HashMap::new();
    for r in load_results(store, &exam_id)? {
        existing.entry(r.student_id).or_insert(ExistingRecord {
            record_id: r.id,
            value: r.marks_obtained,
        });
    }

    let plan = planner::plan_results(&existing, &desired, &exam)?;
    if plan.is_empty() {
        tracing::debug!(exam_id = %exam_id, "no marks entered, nothing to save");
    }
    let summary = planner::execute_plan(store, "exam_results", &plan)
        .map_err(|e| execute_failed("Error saving results", e))?;

    Ok(json!({
        "examId": exam_id,
        "updated": summary.updated,
        "inserted": summary.inserted,
        "message": "Results saved successfully!",
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "results.open" => Some(run(state, req, results_open)),
        "results.save" => Some(run(state, req, results_save)),
        _ => None,
    }
}
