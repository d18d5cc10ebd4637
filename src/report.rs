use crate::calc::{self, AttendanceBand, Grade};
use crate::model::{AttendanceRecord, AttendanceStatus, Exam, ExamResult, Student};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub total: usize,
    pub present: usize,
    pub absent: usize,
    pub late: usize,
    pub excused: usize,
}

impl StatusCounts {
    fn add(&mut self, status: AttendanceStatus) {
        self.total += 1;
        match status {
            AttendanceStatus::Present => self.present += 1,
            AttendanceStatus::Absent => self.absent += 1,
            AttendanceStatus::Late => self.late += 1,
            AttendanceStatus::Excused => self.excused += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSummaryRow {
    pub student_id: String,
    pub name: String,
    pub rollno: Option<String>,
    #[serde(flatten)]
    pub counts: StatusCounts,
    pub rate: f64,
    pub band: AttendanceBand,
}

/// One row per roster student, in roster order. A student with no records in
/// range reports zero counts and a 0 rate, the same as one never present.
pub fn build_attendance_report(
    roster: &[Student],
    records: &[AttendanceRecord],
) -> Vec<AttendanceSummaryRow> {
    let mut by_student: HashMap<&str, StatusCounts> = HashMap::new();
    for r in records {
        by_student
            .entry(r.student_id.as_str())
            .or_default()
            .add(r.status);
    }

    roster
        .iter()
        .map(|s| {
            let counts = by_student.get(s.id.as_str()).copied().unwrap_or_default();
            let rate = calc::attendance_rate(counts.present, counts.total);
            AttendanceSummaryRow {
                student_id: s.id.clone(),
                name: s.name.clone(),
                rollno: s.rollno.clone(),
                counts,
                rate,
                band: calc::attendance_band(rate),
            }
        })
        .collect()
}

pub fn summarize_day(records: &[AttendanceRecord]) -> StatusCounts {
    let mut counts = StatusCounts::default();
    for r in records {
        counts.add(r.status);
    }
    counts
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultDisplayRow {
    pub student_id: String,
    pub name: String,
    pub rollno: Option<String>,
    pub result_id: Option<String>,
    pub marks_obtained: Option<f64>,
    pub percentage: Option<f64>,
    pub grade: Option<Grade>,
    pub is_passed: Option<bool>,
    /// Marks come from an unsaved edit rather than the stored result.
    pub draft: bool,
}

/// Derives percentage, grade and pass status live for every roster student.
/// A draft entry (even one cleared to `None`) wins over the stored result.
pub fn build_results_view(
    roster: &[Student],
    results: &[ExamResult],
    drafts: &HashMap<String, Option<f64>>,
    exam: &Exam,
) -> Vec<ResultDisplayRow> {
    let by_student: HashMap<&str, &ExamResult> =
        results.iter().map(|r| (r.student_id.as_str(), r)).collect();

    roster
        .iter()
        .map(|s| {
            let stored = by_student.get(s.id.as_str());
            let (marks, draft) = match drafts.get(&s.id) {
                Some(m) => (*m, true),
                None => (stored.map(|r| r.marks_obtained), false),
            };
            let metrics =
                marks.map(|m| calc::result_metrics(m, exam.total_marks, exam.passing_marks));
            ResultDisplayRow {
                student_id: s.id.clone(),
                name: s.name.clone(),
                rollno: s.rollno.clone(),
                result_id: stored.map(|r| r.id.clone()),
                marks_obtained: marks,
                percentage: metrics.map(|m| m.percentage),
                grade: metrics.map(|m| m.grade),
                is_passed: metrics.map(|m| m.is_passed),
                draft,
            }
        })
        .collect()
}
