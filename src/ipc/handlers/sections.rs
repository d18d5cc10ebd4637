use crate::ipc::helpers::{
    ensure_exists, fetch_row_with, get_optional_str, get_required_str, inserted_id,
    required_field, rows_json, run, select_rows, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::model::SectionFields;
use crate::store::{to_row, Filter, Query, RowStore};
use serde_json::json;

fn parse_section_fields(
    store: &dyn RowStore,
    params: &serde_json::Value,
) -> Result<SectionFields, HandlerErr> {
    let name = required_field(params, "name", "Section name is required")?;
    let class_id = required_field(params, "classId", "Please select a class")?;
    ensure_exists(store, "classes", &class_id, "class")?;
    Ok(SectionFields { name, class_id })
}

fn sections_query() -> Query {
    Query::from("sections").embed("classes", "class_id", &["name"])
}

fn sections_list(
    store: &dyn RowStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let mut query = sections_query().order_by("name", true);
    if let Some(class_id) = get_optional_str(params, "classId") {
        query = query.filter(Filter::eq("class_id", class_id));
    }
    let sections = select_rows(store, &query, "sections")?;
    Ok(json!({ "sections": rows_json(sections) }))
}

fn sections_get(
    store: &dyn RowStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let section_id = get_required_str(params, "sectionId")?;
    let section = fetch_row_with(store, sections_query(), &section_id, "section")?;
    Ok(json!({ "section": section }))
}

fn sections_create(
    store: &dyn RowStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let fields = parse_section_fields(store, params)?;
    let row = to_row(&fields).map_err(|e| HandlerErr::bad_params(e.to_string()))?;
    let stored = store
        .insert("sections", &[row])
        .map_err(|e| HandlerErr::store("db_insert_failed", "Error adding section", e))?;
    Ok(json!({
        "sectionId": inserted_id(&stored)?,
        "message": "Section added successfully!",
    }))
}

fn sections_update(
    store: &dyn RowStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let section_id = get_required_str(params, "sectionId")?;
    ensure_exists(store, "sections", &section_id, "section")?;
    let fields = parse_section_fields(store, params)?;
    let patch = to_row(&fields).map_err(|e| HandlerErr::bad_params(e.to_string()))?;
    store
        .update("sections", &patch, &[Filter::eq("id", section_id.as_str())])
        .map_err(|e| HandlerErr::store("db_update_failed", "Error updating section", e))?;
    Ok(json!({ "sectionId": section_id, "message": "Section updated successfully!" }))
}

fn sections_delete(
    store: &dyn RowStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let section_id = get_required_str(params, "sectionId")?;
    ensure_exists(store, "sections", &section_id, "section")?;
    store
        .delete("sections", &[Filter::eq("id", section_id.as_str())])
        .map_err(|e| HandlerErr::store("db_delete_failed", "Error deleting section", e))?;
    Ok(json!({ "sectionId": section_id, "message": "Section deleted successfully!" }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "sections.list" => Some(run(state, req, sections_list)),
        "sections.get" => Some(run(state, req, sections_get)),
        "sections.create" => Some(run(state, req, sections_create)),
        "sections.update" => Some(run(state, req, sections_update)),
        "sections.delete" => Some(run(state, req, sections_delete)),
        _ => None,
    }
}
