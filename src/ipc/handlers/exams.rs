use crate::ipc::helpers::{
    ensure_exists, fetch_row_with, get_optional_number, get_optional_str, get_required_date,
    get_required_str, inserted_id, required_field, rows_json, run, select_rows, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{ExamFields, ExamType};
use crate::store::{to_row, Filter, Query, RowStore};
use serde_json::json;

fn parse_exam_fields(
    store: &dyn RowStore,
    params: &serde_json::Value,
) -> Result<ExamFields, HandlerErr> {
    let name = required_field(params, "name", "Exam name is required")?;
    let exam_type = required_field(params, "examType", "Please select an exam type")?
        .parse::<ExamType>()
        .map_err(HandlerErr::bad_params)?;
    let class_id = required_field(params, "classId", "Please select a class")?;
    let exam_date = get_required_date(params, "examDate")?;

    let total_marks = get_optional_number(params, "totalMarks")?
        .filter(|t| t.is_finite() && *t > 0.0)
        .ok_or_else(|| {
            HandlerErr::new("validation_failed", "Total marks must be greater than 0")
        })?;
    let passing_marks = get_optional_number(params, "passingMarks")?;
    if let Some(p) = passing_marks {
        if !(0.0..=total_marks).contains(&p) {
            return Err(HandlerErr::new(
                "validation_failed",
                format!("Passing marks must be between 0 and {}", total_marks),
            )
            .with_details(json!({ "min": 0, "max": total_marks })));
        }
    }

    ensure_exists(store, "classes", &class_id, "class")?;
    let subject_id = get_optional_str(params, "subjectId");
    if let Some(s) = subject_id.as_deref() {
        ensure_exists(store, "subjects", s, "subject")?;
    }

    Ok(ExamFields {
        name,
        exam_type,
        class_id,
        subject_id,
        exam_date,
        total_marks,
        passing_marks,
    })
}

fn exams_query() -> Query {
    Query::from("exams")
        .embed("classes", "class_id", &["name"])
        .embed("subjects", "subject_id", &["name"])
}

fn exams_list(
    store: &dyn RowStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let mut query = exams_query().order_by("exam_date", false);
    if let Some(class_id) = get_optional_str(params, "classId") {
        query = query.filter(Filter::eq("class_id", class_id));
    }
    let exams = select_rows(store, &query, "exams")?;
    Ok(json!({ "exams": rows_json(exams) }))
}

fn exams_get(
    store: &dyn RowStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let exam_id = get_required_str(params, "examId")?;
    let exam = fetch_row_with(store, exams_query(), &exam_id, "exam")?;
    Ok(json!({ "exam": exam }))
}

fn exams_create(
    store: &dyn RowStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let fields = parse_exam_fields(store, params)?;
    let row = to_row(&fields).map_err(|e| HandlerErr::bad_params(e.to_string()))?;
    let stored = store
        .insert("exams", &[row])
        .map_err(|e| HandlerErr::store("db_insert_failed", "Error adding exam", e))?;
    Ok(json!({
        "examId": inserted_id(&stored)?,
        "message": "Exam added successfully!",
    }))
}

/// Stored results keep their derived metrics; only new saves pick up
/// changed totals or passing marks.
fn exams_update(
    store: &dyn RowStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let exam_id = get_required_str(params, "examId")?;
    ensure_exists(store, "exams", &exam_id, "exam")?;
    let fields = parse_exam_fields(store, params)?;
    let patch = to_row(&fields).map_err(|e| HandlerErr::bad_params(e.to_string()))?;
    store
        .update("exams", &patch, &[Filter::eq("id", exam_id.as_str())])
        .map_err(|e| HandlerErr::store("db_update_failed", "Error updating exam", e))?;
    Ok(json!({ "examId": exam_id, "message": "Exam updated successfully!" }))
}

fn exams_delete(
    store: &dyn RowStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let exam_id = get_required_str(params, "examId")?;
    ensure_exists(store, "exams", &exam_id, "exam")?;
    store
        .delete("exams", &[Filter::eq("id", exam_id.as_str())])
        .map_err(|e| HandlerErr::store("db_delete_failed", "Error deleting exam", e))?;
    Ok(json!({ "examId": exam_id, "message": "Exam deleted successfully!" }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "exams.list" => Some(run(state, req, exams_list)),
        "exams.get" => Some(run(state, req, exams_get)),
        "exams.create" => Some(run(state, req, exams_create)),
        "exams.update" => Some(run(state, req, exams_update)),
        "exams.delete" => Some(run(state, req, exams_delete)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;

    fn params(total: serde_json::Value, passing: serde_json::Value, class_id: &str) -> serde_json::Value {
        json!({
            "name": "Midterm",
            "examType": "Midterm",
            "classId": class_id,
            "examDate": "2024-05-01",
            "totalMarks": total,
            "passingMarks": passing,
        })
    }

    #[test]
    fn marks_bounds_are_enforced() {
        let store = SqliteStore::in_memory().expect("store");
        let class = store
            .insert("classes", &[to_row(&json!({ "name": "Grade 7" })).expect("row")])
            .expect("insert");
        let class_id = inserted_id(&class).ok().expect("id");

        let ok = parse_exam_fields(&store, &params(json!("80"), json!(32), &class_id))
            .ok()
            .expect("valid exam");
        assert_eq!(ok.exam_type, ExamType::Midterm);
        assert_eq!(ok.total_marks, 80.0);
        assert_eq!(ok.passing_marks, Some(32.0));

        let zero_total = parse_exam_fields(&store, &params(json!(0), json!(null), &class_id));
        assert_eq!(zero_total.err().map(|e| e.code), Some("validation_failed"));

        let passing_over = parse_exam_fields(&store, &params(json!(50), json!(60), &class_id));
        assert_eq!(passing_over.err().map(|e| e.code), Some("validation_failed"));

        let bad_type = parse_exam_fields(
            &store,
            &json!({ "name": "X", "examType": "oral", "classId": class_id, "examDate": "2024-05-01", "totalMarks": 10 }),
        );
        assert_eq!(bad_type.err().map(|e| e.code), Some("bad_params"));
    }
}
