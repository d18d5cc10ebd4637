use crate::ipc::helpers::{
    ensure_exists, fetch_row_with, get_optional_date, get_optional_str, get_required_str,
    inserted_id, required_field, rows_json, run, select_rows, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{Gender, StudentFields};
use crate::store::{to_row, Filter, Query, RowStore};
use crate::validate;
use serde_json::json;

const DEFAULT_ADMISSIONS_LIMIT: usize = 10;
const MAX_ADMISSIONS_LIMIT: u64 = 1000;

fn parse_student_fields(
    store: &dyn RowStore,
    params: &serde_json::Value,
) -> Result<StudentFields, HandlerErr> {
    let name = required_field(params, "name", "Student name is required")?;
    let gender = required_field(params, "gender", "Please select a gender")?
        .parse::<Gender>()
        .map_err(HandlerErr::bad_params)?;
    let class_id = required_field(params, "classId", "Please select a class")?;

    let rollno = get_optional_str(params, "rollno");
    if let Some(r) = rollno.as_deref() {
        if !validate::is_valid_roll_number(r) {
            return Err(HandlerErr::new(
                "validation_failed",
                "Roll number must be 2-20 letters or digits",
            ));
        }
    }
    let email = get_optional_str(params, "email");
    if let Some(e) = email.as_deref() {
        if !validate::is_valid_email(e) {
            return Err(HandlerErr::new("validation_failed", "Please enter a valid email address"));
        }
    }
    ensure_exists(store, "classes", &class_id, "class")?;

    Ok(StudentFields {
        name,
        rollno,
        class_id,
        gender,
        email,
        address: get_optional_str(params, "address"),
        date_of_birth: get_optional_date(params, "dateOfBirth")?,
    })
}

fn students_query() -> Query {
    Query::from("students").embed("classes", "class_id", &["name"])
}

fn students_list(
    store: &dyn RowStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let mut query = students_query().order_by("name", true);
    if let Some(class_id) = get_optional_str(params, "classId") {
        query = query.filter(Filter::eq("class_id", class_id));
    }
    let students = select_rows(store, &query, "students")?;
    Ok(json!({ "students": rows_json(students) }))
}

fn admissions_limit(params: &serde_json::Value) -> Result<usize, HandlerErr> {
    match params.get("limit") {
        None | Some(serde_json::Value::Null) => Ok(DEFAULT_ADMISSIONS_LIMIT),
        Some(v) => v
            .as_u64()
            .filter(|n| (1..=MAX_ADMISSIONS_LIMIT).contains(n))
            .map(|n| n as usize)
            .ok_or_else(|| {
                HandlerErr::bad_params(format!(
                    "limit must be an integer between 1 and {}",
                    MAX_ADMISSIONS_LIMIT
                ))
            }),
    }
}

/// Most recently created students first.
fn students_admissions(
    store: &dyn RowStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let limit = admissions_limit(params)?;
    let students = select_rows(
        store,
        &students_query().order_by("created_at", false).limit(limit),
        "students",
    )?;
    Ok(json!({ "students": rows_json(students) }))
}

fn students_get(
    store: &dyn RowStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let student = fetch_row_with(store, students_query(), &student_id, "student")?;
    Ok(json!({ "student": student }))
}

fn students_create(
    store: &dyn RowStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let fields = parse_student_fields(store, params)?;
    let row = to_row(&fields).map_err(|e| HandlerErr::bad_params(e.to_string()))?;
    let stored = store
        .insert("students", &[row])
        .map_err(|e| HandlerErr::store("db_insert_failed", "Error adding student", e))?;
    Ok(json!({
        "studentId": inserted_id(&stored)?,
        "message": "Student added successfully!",
    }))
}

fn students_update(
    store: &dyn RowStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    ensure_exists(store, "students", &student_id, "student")?;
    let fields = parse_student_fields(store, params)?;
    let patch = to_row(&fields).map_err(|e| HandlerErr::bad_params(e.to_string()))?;
    store
        .update("students", &patch, &[Filter::eq("id", student_id.as_str())])
        .map_err(|e| HandlerErr::store("db_update_failed", "Error updating student", e))?;
    Ok(json!({ "studentId": student_id, "message": "Student updated successfully!" }))
}

fn students_delete(
    store: &dyn RowStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    ensure_exists(store, "students", &student_id, "student")?;
    store
        .delete("students", &[Filter::eq("id", student_id.as_str())])
        .map_err(|e| HandlerErr::store("db_delete_failed", "Error deleting student", e))?;
    Ok(json!({ "studentId": student_id, "message": "Student deleted successfully!" }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(run(state, req, students_list)),
        "students.admissions" => Some(run(state, req, students_admissions)),
        "students.get" => Some(run(state, req, students_get)),
        "students.create" => Some(run(state, req, students_create)),
        "students.update" => Some(run(state, req, students_update)),
        "students.delete" => Some(run(state, req, students_delete)),
        _ => None,
    }
}
