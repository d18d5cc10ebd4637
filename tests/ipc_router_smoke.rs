mod test_support;

use serde_json::json;
use test_support::{code, spawn_sidecar, spawn_sidecar_with, str_field, temp_dir};

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let workspace = temp_dir("schoold-router-smoke");
    let mut sidecar = spawn_sidecar();

    let health = sidecar.request_ok("1", "health", json!({}));
    assert_eq!(health.get("workspacePath"), Some(&serde_json::Value::Null));

    // Store-backed methods refuse to run before a workspace is chosen.
    let err = sidecar.request_err("2", "classes.list", json!({}));
    assert_eq!(code(&err), "no_workspace");

    sidecar.select_workspace(workspace.path());
    let class_id = sidecar.create_class("Smoke Class");
    let student_id = sidecar.create_student(&class_id, "Smoke Student");

    let calls = [
        ("dashboard.stats", json!({})),
        ("classes.list", json!({})),
        ("classes.get", json!({ "classId": class_id })),
        ("sections.list", json!({ "classId": class_id })),
        ("subjects.list", json!({})),
        ("teachers.list", json!({})),
        ("students.list", json!({ "classId": class_id })),
        ("students.get", json!({ "studentId": student_id })),
        ("students.admissions", json!({})),
        ("exams.list", json!({})),
        ("attendance.open", json!({ "classId": class_id, "date": "2024-03-04" })),
        ("attendance.daySummary", json!({ "date": "2024-03-04" })),
        (
            "attendance.report",
            json!({ "classId": class_id, "startDate": "2024-03-01", "endDate": "2024-03-31" }),
        ),
    ];
    for (i, (method, params)) in calls.into_iter().enumerate() {
        let _ = sidecar.request_ok(&format!("c{}", i), method, params);
    }

    let err = sidecar.request_err("3", "marksets.list", json!({}));
    assert_eq!(code(&err), "not_implemented");
    assert_eq!(
        err.get("message").and_then(|v| v.as_str()),
        Some("unknown method: marksets.list")
    );
}

#[test]
fn unparseable_lines_get_bad_json_and_loop_continues() {
    let mut sidecar = spawn_sidecar();

    let resp = sidecar.send_line("{not json");
    assert_eq!(resp.get("ok").and_then(|v| v.as_bool()), Some(false));
    assert_eq!(
        resp.pointer("/error/code").and_then(|v| v.as_str()),
        Some("bad_json")
    );

    let health = sidecar.request_ok("after", "health", json!({}));
    assert!(health.get("version").and_then(|v| v.as_str()).is_some());
}

#[test]
fn workspace_flag_opens_store_at_startup() {
    let workspace = temp_dir("schoold-startup");
    let path = workspace.path().to_string_lossy().to_string();
    let mut sidecar = spawn_sidecar_with(&["--workspace", &path]);

    let health = sidecar.request_ok("1", "health", json!({}));
    assert_eq!(str_field(&health, "workspacePath"), path);

    let classes = sidecar.request_ok("2", "classes.list", json!({}));
    assert_eq!(classes.get("classes"), Some(&json!([])));
    assert!(workspace.path().join("school.sqlite3").exists());
}
