//! Splits a screen's desired records into updates of rows that already exist
//! and inserts of new rows, then applies the plan to a [`RowStore`].
//!
//! Planning is pure. Execution is two phases with no transaction spanning
//! them: one `update` per existing record, then a single bulk `insert`. The
//! first failure stops the run and earlier writes stay applied.

use crate::calc::{self, Grade};
use crate::model::{AttendanceStatus, Exam, Student};
use crate::store::{to_row, Filter, RowStore, StoreError};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// A record the store already holds for the screen's scope, keyed elsewhere
/// by student id.
#[derive(Debug, Clone, PartialEq)]
pub struct ExistingRecord<V> {
    pub record_id: String,
    pub value: V,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedUpdate<U> {
    pub record_id: String,
    pub patch: U,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconcilePlan<U, I> {
    pub updates: Vec<PlannedUpdate<U>>,
    pub inserts: Vec<I>,
}

impl<U, I> ReconcilePlan<U, I> {
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.inserts.is_empty()
    }
}

impl<U, I> Default for ReconcilePlan<U, I> {
    fn default() -> Self {
        Self {
            updates: Vec::new(),
            inserts: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AttendanceScope<'a> {
    pub class_id: &'a str,
    pub date: &'a str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendancePatch {
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewAttendance {
    pub student_id: String,
    pub class_id: String,
    pub date: String,
    pub status: AttendanceStatus,
}

pub type AttendancePlan = ReconcilePlan<AttendancePatch, NewAttendance>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultPatch {
    pub marks_obtained: f64,
    pub percentage: f64,
    pub grade: Grade,
    pub is_passed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewResult {
    pub exam_id: String,
    pub student_id: String,
    #[serde(flatten)]
    pub scored: ResultPatch,
}

pub type ResultPlan = ReconcilePlan<ResultPatch, NewResult>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    #[error("Invalid marks for a student. Must be between 0 and {total}")]
    MarksOutOfRange {
        student_id: String,
        marks: f64,
        total: f64,
    },
}

/// Walks the roster in order. A student the operator never touched is
/// committed as `Absent`; desired entries for students outside the roster are
/// ignored.
pub fn plan_attendance(
    existing: &HashMap<String, ExistingRecord<AttendanceStatus>>,
    desired: &HashMap<String, AttendanceStatus>,
    roster: &[Student],
    scope: AttendanceScope<'_>,
) -> AttendancePlan {
    let mut plan = AttendancePlan::default();
    for student in roster {
        let status = desired
            .get(&student.id)
            .copied()
            .unwrap_or(AttendanceStatus::Absent);
        match existing.get(&student.id) {
            Some(rec) => plan.updates.push(PlannedUpdate {
                record_id: rec.record_id.clone(),
                patch: AttendancePatch { status },
            }),
            None => plan.inserts.push(NewAttendance {
                student_id: student.id.clone(),
                class_id: scope.class_id.to_string(),
                date: scope.date.to_string(),
                status,
            }),
        }
    }
    plan
}

/// `None` marks are skipped, so a partially graded sheet can be saved.
/// Any value outside `[0, total_marks]` rejects the whole batch before a
/// plan exists.
pub fn plan_results(
    existing: &HashMap<String, ExistingRecord<f64>>,
    desired: &BTreeMap<String, Option<f64>>,
    exam: &Exam,
) -> Result<ResultPlan, PlanError> {
    for (student_id, marks) in desired {
        let Some(m) = *marks else { continue };
        if !m.is_finite() || m < 0.0 || m > exam.total_marks {
            return Err(PlanError::MarksOutOfRange {
                student_id: student_id.clone(),
                marks: m,
                total: exam.total_marks,
            });
        }
    }

    let mut plan = ResultPlan::default();
    for (student_id, marks) in desired {
        let Some(marks_obtained) = *marks else { continue };
        let m = calc::result_metrics(marks_obtained, exam.total_marks, exam.passing_marks);
        let patch = ResultPatch {
            marks_obtained,
            percentage: m.percentage,
            grade: m.grade,
            is_passed: m.is_passed,
        };
        match existing.get(student_id) {
            Some(rec) => plan.updates.push(PlannedUpdate {
                record_id: rec.record_id.clone(),
                patch,
            }),
            None => plan.inserts.push(NewResult {
                exam_id: exam.id.clone(),
                student_id: student_id.clone(),
                scored: patch,
            }),
        }
    }
    Ok(plan)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteSummary {
    pub updated: usize,
    pub inserted: usize,
}

#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("{source}")]
    Update {
        record_id: String,
        applied: usize,
        #[source]
        source: StoreError,
    },

    #[error("{source}")]
    Insert {
        applied_updates: usize,
        #[source]
        source: StoreError,
    },
}

impl ExecuteError {
    /// Updates that reached the store before the failure.
    pub fn applied_updates(&self) -> usize {
        match self {
            ExecuteError::Update { applied, .. } => *applied,
            ExecuteError::Insert {
                applied_updates, ..
            } => *applied_updates,
        }
    }
}

pub fn execute_plan<S, U, I>(
    store: &S,
    table: &str,
    plan: &ReconcilePlan<U, I>,
) -> Result<ExecuteSummary, ExecuteError>
where
    S: RowStore + ?Sized,
    U: Serialize,
    I: Serialize,
{
    let mut applied = 0;
    for u in &plan.updates {
        let result = to_row(&u.patch).and_then(|patch| {
            store.update(table, &patch, &[Filter::eq("id", u.record_id.as_str())])
        });
        if let Err(source) = result {
            tracing::warn!(table, record_id = %u.record_id, applied, "update failed, stopping batch");
            return Err(ExecuteError::Update {
                record_id: u.record_id.clone(),
                applied,
                source,
            });
        }
        applied += 1;
    }

    let mut inserted = 0;
    if !plan.inserts.is_empty() {
        let rows = plan
            .inserts
            .iter()
            .map(to_row)
            .collect::<Result<Vec<_>, _>>()
            .and_then(|rows| store.insert(table, &rows));
        match rows {
            Ok(rows) => inserted = rows.len(),
            Err(source) => {
                tracing::warn!(table, applied_updates = applied, "bulk insert failed");
                return Err(ExecuteError::Insert {
                    applied_updates: applied,
                    source,
                });
            }
        }
    }

    tracing::info!(table, updated = applied, inserted, "plan applied");
    Ok(ExecuteSummary {
        updated: applied,
        inserted,
    })
}
