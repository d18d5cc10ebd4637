use crate::ipc::helpers::{
    ensure_exists, fetch_row, get_required_str, inserted_id, required_field, rows_json, run,
    select_rows, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{ClassFields, SectionFields};
use crate::store::{to_row, Filter, Query, RowStore};
use serde_json::json;

fn parse_class_fields(params: &serde_json::Value) -> Result<ClassFields, HandlerErr> {
    Ok(ClassFields {
        name: required_field(params, "name", "Class name is required")?,
    })
}

fn classes_list(
    store: &dyn RowStore,
    _params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let mut classes = select_rows(store, &Query::from("classes").order_by("name", true), "classes")?;
    // Counts for the class cards.
    for class in classes.iter_mut() {
        let Some(id) = class.get("id").and_then(|v| v.as_str()).map(str::to_string) else {
            continue;
        };
        let by_class = [Filter::eq("class_id", id.as_str())];
        let count = |table: &str| {
            store
                .count(table, &by_class)
                .map_err(|e| HandlerErr::store("db_query_failed", "Error fetching classes", e))
        };
        class.insert("studentCount".into(), json!(count("students")?));
        class.insert("sectionCount".into(), json!(count("sections")?));
    }
    Ok(json!({ "classes": rows_json(classes) }))
}

fn classes_get(
    store: &dyn RowStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    let class = fetch_row(store, "classes", &class_id, "class")?;
    let sections = select_rows(
        store,
        &Query::from("sections")
            .filter(Filter::eq("class_id", class_id.as_str()))
            .order_by("name", true),
        "sections",
    )?;
    Ok(json!({ "class": class, "sections": rows_json(sections) }))
}

/// Creates the class, then each non-blank section in order. A section
/// failure leaves the class and earlier sections in place.
fn classes_create(
    store: &dyn RowStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let fields = parse_class_fields(params)?;
    let section_names: Vec<String> = params
        .get("sections")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().or_else(|| v.get("name").and_then(|n| n.as_str())))
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let row = to_row(&fields).map_err(|e| HandlerErr::bad_params(e.to_string()))?;
    let class = store
        .insert("classes", &[row])
        .map_err(|e| HandlerErr::store("db_insert_failed", "Error adding class", e))?;
    let class_id = inserted_id(&class)?;

    let mut section_ids = Vec::with_capacity(section_names.len());
    for name in section_names {
        let section = to_row(&SectionFields {
            name,
            class_id: class_id.clone(),
        })
        .map_err(|e| HandlerErr::bad_params(e.to_string()))?;
        let stored = store.insert("sections", &[section]).map_err(|e| {
            HandlerErr::store("db_insert_failed", "Error adding section", e)
                .with_details(json!({ "classId": class_id }))
        })?;
        section_ids.extend(stored.into_iter().filter_map(|r| r.get("id").cloned()));
    }

    let message = if section_ids.is_empty() {
        "Class added successfully!"
    } else {
        "Class and sections added successfully!"
    };
    Ok(json!({
        "classId": class_id,
        "name": fields.name,
        "sectionIds": section_ids,
        "message": message,
    }))
}

fn classes_update(
    store: &dyn RowStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    let fields = parse_class_fields(params)?;
    ensure_exists(store, "classes", &class_id, "class")?;
    let patch = to_row(&fields).map_err(|e| HandlerErr::bad_params(e.to_string()))?;
    store
        .update("classes", &patch, &[Filter::eq("id", class_id.as_str())])
        .map_err(|e| HandlerErr::store("db_update_failed", "Error updating class", e))?;
    Ok(json!({ "classId": class_id, "message": "Class updated successfully!" }))
}

/// Deletes only the class row. Sections, subjects and students that point at
/// it are left behind and reported back so the caller can warn about them.
fn classes_delete(
    store: &dyn RowStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    ensure_exists(store, "classes", &class_id, "class")?;

    let by_class = [Filter::eq("class_id", class_id.as_str())];
    let mut orphaned = serde_json::Map::new();
    for table in ["sections", "subjects", "students", "exams", "attendance"] {
        let n = store
            .count(table, &by_class)
            .map_err(|e| HandlerErr::store("db_query_failed", "Error deleting class", e))?;
        orphaned.insert(table.to_string(), json!(n));
    }

    store
        .delete("classes", &[Filter::eq("id", class_id.as_str())])
        .map_err(|e| HandlerErr::store("db_delete_failed", "Error deleting class", e))?;
    Ok(json!({
        "classId": class_id,
        "orphaned": orphaned,
        "message": "Class deleted successfully!",
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "classes.list" => Some(run(state, req, classes_list)),
        "classes.get" => Some(run(state, req, classes_get)),
        "classes.create" => Some(run(state, req, classes_create)),
        "classes.update" => Some(run(state, req, classes_update)),
        "classes.delete" => Some(run(state, req, classes_delete)),
        _ => None,
    }
}
