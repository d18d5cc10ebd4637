mod test_support;

use serde_json::json;
use test_support::{code, spawn_sidecar, str_field, temp_dir, Sidecar};

fn view_row<'a>(view: &'a serde_json::Value, student_id: &str) -> &'a serde_json::Value {
    view.get("rows")
        .and_then(|v| v.as_array())
        .and_then(|rows| {
            rows.iter()
                .find(|r| r.get("studentId").and_then(|v| v.as_str()) == Some(student_id))
        })
        .expect("results row")
}

fn create_exam(sidecar: &mut Sidecar, class_id: &str, passing: serde_json::Value) -> String {
    let created = sidecar.request_ok(
        "exam",
        "exams.create",
        json!({
            "name": "Term Final",
            "examType": "final",
            "classId": class_id,
            "examDate": "2024-06-10",
            "totalMarks": 80,
            "passingMarks": passing,
        }),
    );
    str_field(&created, "examId")
}

#[test]
fn results_are_scored_and_reconciled() {
    let workspace = temp_dir("schoold-results");
    let mut sidecar = spawn_sidecar();
    sidecar.select_workspace(workspace.path());

    let class_id = sidecar.create_class("Grade 9");
    let alice = sidecar.create_student(&class_id, "Alice");
    let bob = sidecar.create_student(&class_id, "Bob");
    let exam_id = create_exam(&mut sidecar, &class_id, serde_json::Value::Null);

    // Bob's blank entry is skipped.
    let saved = sidecar.request_ok(
        "1",
        "results.save",
        json!({ "examId": exam_id, "marks": { alice.clone(): 40, bob.clone(): "" } }),
    );
    assert_eq!(saved.get("inserted"), Some(&json!(1)));
    assert_eq!(
        saved.get("message").and_then(|v| v.as_str()),
        Some("Results saved successfully!")
    );

    let view = sidecar.request_ok("2", "results.open", json!({ "examId": exam_id }));
    assert_eq!(view.pointer("/exam/classes/name"), Some(&json!("Grade 9")));
    let a = view_row(&view, &alice);
    assert_eq!(a.get("marksObtained"), Some(&json!(40.0)));
    assert_eq!(a.get("percentage"), Some(&json!(50.0)));
    assert_eq!(a.get("grade"), Some(&json!("D")));
    assert_eq!(a.get("isPassed"), Some(&json!(true)));
    let b = view_row(&view, &bob);
    assert_eq!(b.get("marksObtained"), Some(&serde_json::Value::Null));
    assert_eq!(b.get("grade"), Some(&serde_json::Value::Null));

    // Drafts are scored live without touching the store.
    let drafted = sidecar.request_ok(
        "3",
        "results.open",
        json!({ "examId": exam_id, "drafts": { bob.clone(): "76" } }),
    );
    let b = view_row(&drafted, &bob);
    assert_eq!(b.get("percentage"), Some(&json!(95.0)));
    assert_eq!(b.get("grade"), Some(&json!("A+")));
    assert_eq!(b.get("draft"), Some(&json!(true)));

    let resaved = sidecar.request_ok(
        "4",
        "results.save",
        json!({ "examId": exam_id, "marks": { alice.clone(): 70, bob.clone(): 20 } }),
    );
    assert_eq!(resaved.get("updated"), Some(&json!(1)));
    assert_eq!(resaved.get("inserted"), Some(&json!(1)));

    let view = sidecar.request_ok("5", "results.open", json!({ "examId": exam_id }));
    assert_eq!(view_row(&view, &alice).get("grade"), Some(&json!("A")));
    assert_eq!(view_row(&view, &bob).get("isPassed"), Some(&json!(false)));
}

#[test]
fn out_of_range_marks_reject_the_whole_batch() {
    let workspace = temp_dir("schoold-results-range");
    let mut sidecar = spawn_sidecar();
    sidecar.select_workspace(workspace.path());

    let class_id = sidecar.create_class("Grade 8");
    let alice = sidecar.create_student(&class_id, "Alice");
    let bob = sidecar.create_student(&class_id, "Bob");
    let exam_id = create_exam(&mut sidecar, &class_id, json!(30));

    let err = sidecar.request_err(
        "1",
        "results.save",
        json!({ "examId": exam_id, "marks": { alice.clone(): 50, bob.clone(): 81 } }),
    );
    assert_eq!(code(&err), "validation_failed");
    assert_eq!(
        err.get("message").and_then(|v| v.as_str()),
        Some("Invalid marks for a student. Must be between 0 and 80")
    );
    assert_eq!(err.pointer("/details/max"), Some(&json!(80.0)));

    let err = sidecar.request_err(
        "2",
        "results.save",
        json!({ "examId": exam_id, "marks": { alice.clone(): -1 } }),
    );
    assert_eq!(code(&err), "validation_failed");

    // Nothing was written by either rejected batch.
    let view = sidecar.request_ok("3", "results.open", json!({ "examId": exam_id }));
    for id in [&alice, &bob] {
        let row = view_row(&view, id);
        assert_eq!(row.get("resultId"), Some(&serde_json::Value::Null));
        assert_eq!(row.get("marksObtained"), Some(&serde_json::Value::Null));
    }

    // An explicit passing mark overrides the percentage floor.
    let _ = sidecar.request_ok(
        "4",
        "results.save",
        json!({ "examId": exam_id, "marks": { alice.clone(): 30 } }),
    );
    let view = sidecar.request_ok("5", "results.open", json!({ "examId": exam_id }));
    let a = view_row(&view, &alice);
    assert_eq!(a.get("grade"), Some(&json!("F")));
    assert_eq!(a.get("isPassed"), Some(&json!(true)));

    let err = sidecar.request_err(
        "6",
        "results.save",
        json!({ "examId": exam_id, "marks": { "not-enrolled": 10 } }),
    );
    assert_eq!(code(&err), "bad_params");

    // A blank cell for a student who left the class does not block the save.
    let saved = sidecar.request_ok(
        "6b",
        "results.save",
        json!({ "examId": exam_id, "marks": { bob.clone(): 40, "not-enrolled": "" } }),
    );
    assert_eq!(saved.get("inserted"), Some(&json!(1)));

    let err = sidecar.request_err("7", "results.open", json!({ "examId": "missing" }));
    assert_eq!(code(&err), "not_found");
}
