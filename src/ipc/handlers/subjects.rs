use crate::ipc::helpers::{
    ensure_exists, fetch_row_with, get_optional_str, get_required_str, inserted_id,
    required_field, rows_json, run, select_rows, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::model::SubjectFields;
use crate::store::{to_row, Filter, Query, RowStore};
use serde_json::json;

fn parse_subject_fields(
    store: &dyn RowStore,
    params: &serde_json::Value,
) -> Result<SubjectFields, HandlerErr> {
    let name = required_field(params, "name", "Subject name is required")?;
    let class_id = required_field(params, "classId", "Please select a class")?;
    let section_id = required_field(params, "sectionId", "Please select a section")?;
    ensure_exists(store, "classes", &class_id, "class")?;
    // The section picker only offers the chosen class's sections.
    let section_class = fetch_row_with(
        store,
        Query::from("sections").columns(&["id", "class_id"]),
        &section_id,
        "section",
    )?;
    if section_class.get("class_id").and_then(|v| v.as_str()) != Some(class_id.as_str()) {
        return Err(HandlerErr::bad_params("section does not belong to the selected class"));
    }
    Ok(SubjectFields {
        name,
        class_id,
        section_id,
    })
}

fn subjects_query() -> Query {
    Query::from("subjects")
        .embed("classes", "class_id", &["name"])
        .embed("sections", "section_id", &["name"])
}

fn subjects_list(
    store: &dyn RowStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let mut query = subjects_query().order_by("name", true);
    if let Some(class_id) = get_optional_str(params, "classId") {
        query = query.filter(Filter::eq("class_id", class_id));
    }
    let subjects = select_rows(store, &query, "subjects")?;
    Ok(json!({ "subjects": rows_json(subjects) }))
}

fn subjects_get(
    store: &dyn RowStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let subject_id = get_required_str(params, "subjectId")?;
    let subject = fetch_row_with(store, subjects_query(), &subject_id, "subject")?;
    Ok(json!({ "subject": subject }))
}

fn subjects_create(
    store: &dyn RowStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let fields = parse_subject_fields(store, params)?;
    let row = to_row(&fields).map_err(|e| HandlerErr::bad_params(e.to_string()))?;
    let stored = store
        .insert("subjects", &[row])
        .map_err(|e| HandlerErr::store("db_insert_failed", "Error adding subject", e))?;
    Ok(json!({
        "subjectId": inserted_id(&stored)?,
        "message": "Subject added successfully!",
    }))
}

fn subjects_update(
    store: &dyn RowStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let subject_id = get_required_str(params, "subjectId")?;
    ensure_exists(store, "subjects", &subject_id, "subject")?;
    let fields = parse_subject_fields(store, params)?;
    let patch = to_row(&fields).map_err(|e| HandlerErr::bad_params(e.to_string()))?;
    store
        .update("subjects", &patch, &[Filter::eq("id", subject_id.as_str())])
        .map_err(|e| HandlerErr::store("db_update_failed", "Error updating subject", e))?;
    Ok(json!({ "subjectId": subject_id, "message": "Subject updated successfully!" }))
}

fn subjects_delete(
    store: &dyn RowStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let subject_id = get_required_str(params, "subjectId")?;
    ensure_exists(store, "subjects", &subject_id, "subject")?;
    store
        .delete("subjects", &[Filter::eq("id", subject_id.as_str())])
        .map_err(|e| HandlerErr::store("db_delete_failed", "Error deleting subject", e))?;
    Ok(json!({ "subjectId": subject_id, "message": "Subject deleted successfully!" }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "subjects.list" => Some(run(state, req, subjects_list)),
        "subjects.get" => Some(run(state, req, subjects_get)),
        "subjects.create" => Some(run(state, req, subjects_create)),
        "subjects.update" => Some(run(state, req, subjects_update)),
        "subjects.delete" => Some(run(state, req, subjects_delete)),
        _ => None,
    }
}
