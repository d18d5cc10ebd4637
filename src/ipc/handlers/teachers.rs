use crate::ipc::helpers::{
    ensure_exists, fetch_row, get_optional_date, get_optional_str, get_required_str,
    inserted_id, required_field, rows_json, run, select_rows, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{Gender, TeacherFields};
use crate::store::{to_row, Filter, Query, RowStore};
use crate::validate;
use serde_json::json;

fn parse_teacher_fields(params: &serde_json::Value) -> Result<TeacherFields, HandlerErr> {
    let name = required_field(params, "name", "Teacher name is required")?;

    let email = get_optional_str(params, "email");
    if let Some(e) = email.as_deref() {
        if !validate::is_valid_email(e) {
            return Err(HandlerErr::new("validation_failed", "Please enter a valid email address"));
        }
    }
    let phone = get_optional_str(params, "phone");
    if let Some(p) = phone.as_deref() {
        if !validate::is_valid_phone(p) {
            return Err(HandlerErr::new(
                "validation_failed",
                "Phone number must have 10 or 11 digits",
            ));
        }
    }
    let gender = match get_optional_str(params, "gender") {
        None => None,
        Some(g) => Some(g.parse::<Gender>().map_err(HandlerErr::bad_params)?),
    };

    Ok(TeacherFields {
        name,
        email,
        phone,
        gender,
        subject: get_optional_str(params, "subject"),
        qualification: get_optional_str(params, "qualification"),
        address: get_optional_str(params, "address"),
        date_of_birth: get_optional_date(params, "dateOfBirth")?,
        joining_date: get_optional_date(params, "joiningDate")?,
    })
}

fn teachers_list(
    store: &dyn RowStore,
    _params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let teachers = select_rows(store, &Query::from("teachers").order_by("name", true), "teachers")?;
    Ok(json!({ "teachers": rows_json(teachers) }))
}

fn teachers_get(
    store: &dyn RowStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let teacher_id = get_required_str(params, "teacherId")?;
    let teacher = fetch_row(store, "teachers", &teacher_id, "teacher")?;
    Ok(json!({ "teacher": teacher }))
}

fn teachers_create(
    store: &dyn RowStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let fields = parse_teacher_fields(params)?;
    let row = to_row(&fields).map_err(|e| HandlerErr::bad_params(e.to_string()))?;
    let stored = store
        .insert("teachers", &[row])
        .map_err(|e| HandlerErr::store("db_insert_failed", "Error adding teacher", e))?;
    Ok(json!({
        "teacherId": inserted_id(&stored)?,
        "message": "Teacher added successfully!",
    }))
}

fn teachers_update(
    store: &dyn RowStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let teacher_id = get_required_str(params, "teacherId")?;
    ensure_exists(store, "teachers", &teacher_id, "teacher")?;
    let fields = parse_teacher_fields(params)?;
    let patch = to_row(&fields).map_err(|e| HandlerErr::bad_params(e.to_string()))?;
    store
        .update("teachers", &patch, &[Filter::eq("id", teacher_id.as_str())])
        .map_err(|e| HandlerErr::store("db_update_failed", "Error updating teacher", e))?;
    Ok(json!({ "teacherId": teacher_id, "message": "Teacher updated successfully!" }))
}

fn teachers_delete(
    store: &dyn RowStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let teacher_id = get_required_str(params, "teacherId")?;
    ensure_exists(store, "teachers", &teacher_id, "teacher")?;
    store
        .delete("teachers", &[Filter::eq("id", teacher_id.as_str())])
        .map_err(|e| HandlerErr::store("db_delete_failed", "Error deleting teacher", e))?;
    Ok(json!({ "teacherId": teacher_id, "message": "Teacher deleted successfully!" }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "teachers.list" => Some(run(state, req, teachers_list)),
        "teachers.get" => Some(run(state, req, teachers_get)),
        "teachers.create" => Some(run(state, req, teachers_create)),
        "teachers.update" => Some(run(state, req, teachers_update)),
        "teachers.delete" => Some(run(state, req, teachers_delete)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn teacher_contact_fields_are_checked() {
        let good = parse_teacher_fields(&json!({
            "name": " Ms Rahman ",
            "email": "rahman@school.edu",
            "phone": "0300-1234567",
            "gender": "female",
            "qualification": "  ",
        }))
        .ok()
        .expect("valid teacher");
        assert_eq!(good.name, "Ms Rahman");
        assert_eq!(good.gender, Some(Gender::Female));
        assert_eq!(good.qualification, None);

        let bad_email = parse_teacher_fields(&json!({ "name": "T", "email": "nope" }));
        assert_eq!(bad_email.err().map(|e| e.code), Some("validation_failed"));

        let bad_phone = parse_teacher_fields(&json!({ "name": "T", "phone": "123" }));
        assert_eq!(bad_phone.err().map(|e| e.code), Some("validation_failed"));

        let no_name = parse_teacher_fields(&json!({ "email": "a@b.co" }));
        assert_eq!(
            no_name.err().map(|e| e.message),
            Some("Teacher name is required".to_string())
        );
    }
}
