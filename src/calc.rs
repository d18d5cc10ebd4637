use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fallback pass floor used when an exam has no explicit passing marks.
/// Independent of the `D` grade floor below.
pub const DEFAULT_PASS_PERCENT: f64 = 40.0;

const GRADE_FLOORS: [(f64, Grade); 7] = [
    (90.0, Grade::APlus),
    (85.0, Grade::A),
    (80.0, Grade::BPlus),
    (75.0, Grade::B),
    (70.0, Grade::CPlus),
    (65.0, Grade::C),
    (50.0, Grade::D),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "A+")]
    APlus,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "B+")]
    BPlus,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "C+")]
    CPlus,
    #[serde(rename = "C")]
    C,
    #[serde(rename = "D")]
    D,
    #[serde(rename = "F")]
    F,
}

impl Grade {
    pub fn as_str(self) -> &'static str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::CPlus => "C+",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Grade {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A+" => Ok(Grade::APlus),
            "A" => Ok(Grade::A),
            "B+" => Ok(Grade::BPlus),
            "B" => Ok(Grade::B),
            "C+" => Ok(Grade::CPlus),
            "C" => Ok(Grade::C),
            "D" => Ok(Grade::D),
            "F" => Ok(Grade::F),
            other => Err(format!("unknown grade: {other}")),
        }
    }
}

/// Colour band the attendance report uses for a rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AttendanceBand {
    Good,
    Warning,
    Poor,
}

/// `obtained / total * 100`, or 0 when there is no positive total.
/// Not rounded; display rounding belongs to the UI.
pub fn percentage(obtained: f64, total: f64) -> f64 {
    if total > 0.0 {
        (obtained / total) * 100.0
    } else {
        0.0
    }
}

pub fn grade_letter(percent: f64) -> Grade {
    GRADE_FLOORS
        .iter()
        .find(|(floor, _)| percent >= *floor)
        .map(|(_, g)| *g)
        .unwrap_or(Grade::F)
}

/// A positive passing threshold overrides the percentage rule entirely. A
/// threshold of 0 counts as unset and falls back to the 40% floor.
pub fn is_passed(marks_obtained: f64, passing_marks: Option<f64>, percent: f64) -> bool {
    match passing_marks {
        Some(threshold) if threshold > 0.0 => marks_obtained >= threshold,
        _ => percent >= DEFAULT_PASS_PERCENT,
    }
}

pub fn attendance_rate(present: usize, total: usize) -> f64 {
    percentage(present as f64, total as f64)
}

pub fn attendance_band(rate: f64) -> AttendanceBand {
    if rate >= 75.0 {
        AttendanceBand::Good
    } else if rate >= 50.0 {
        AttendanceBand::Warning
    } else {
        AttendanceBand::Poor
    }
}

/// Derived fields stored alongside a result and shown in the results grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultMetrics {
    pub percentage: f64,
    pub grade: Grade,
    pub is_passed: bool,
}

pub fn result_metrics(marks_obtained: f64, total_marks: f64, passing_marks: Option<f64>) -> ResultMetrics {
    let pct = percentage(marks_obtained, total_marks);
    ResultMetrics {
        percentage: pct,
        grade: grade_letter(pct),
        is_passed: is_passed(marks_obtained, passing_marks, pct),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_guards_zero_total() {
        assert_eq!(percentage(0.0, 0.0), 0.0);
        assert_eq!(percentage(5.0, 0.0), 0.0);
        assert_eq!(percentage(5.0, -10.0), 0.0);
        assert_eq!(percentage(50.0, 100.0), 50.0);
        assert!((percentage(1.0, 3.0) - 33.333_333_333).abs() < 1e-6);
    }

    #[test]
    fn grade_boundaries_belong_to_higher_grade() {
        assert_eq!(grade_letter(100.0), Grade::APlus);
        assert_eq!(grade_letter(90.0), Grade::APlus);
        assert_eq!(grade_letter(89.9), Grade::A);
        assert_eq!(grade_letter(85.0), Grade::A);
        assert_eq!(grade_letter(80.0), Grade::BPlus);
        assert_eq!(grade_letter(75.0), Grade::B);
        assert_eq!(grade_letter(70.0), Grade::CPlus);
        assert_eq!(grade_letter(65.0), Grade::C);
        assert_eq!(grade_letter(64.99), Grade::D);
        assert_eq!(grade_letter(50.0), Grade::D);
        assert_eq!(grade_letter(49.0), Grade::F);
        assert_eq!(grade_letter(0.0), Grade::F);
    }

    #[test]
    fn pass_floor_is_forty_without_threshold() {
        assert!(!is_passed(39.0, None, 39.0));
        assert!(is_passed(40.0, None, 40.0));
        // 45% passes yet grades F.
        assert!(is_passed(45.0, None, 45.0));
        assert_eq!(grade_letter(45.0), Grade::F);
    }

    #[test]
    fn explicit_threshold_overrides_percentage() {
        assert!(is_passed(30.0, Some(25.0), 0.0));
        assert!(is_passed(30.0, Some(25.0), 10.0));
        assert!(!is_passed(24.0, Some(25.0), 96.0));
    }

    #[test]
    fn zero_threshold_falls_back_to_pass_floor() {
        assert!(!is_passed(10.0, Some(0.0), 10.0));
        assert!(is_passed(40.0, Some(0.0), 40.0));
        assert!(!result_metrics(10.0, 100.0, Some(0.0)).is_passed);
    }

    #[test]
    fn attendance_rate_and_band() {
        assert_eq!(attendance_rate(0, 0), 0.0);
        assert_eq!(attendance_rate(1, 2), 50.0);
        assert_eq!(attendance_band(75.0), AttendanceBand::Good);
        assert_eq!(attendance_band(74.9), AttendanceBand::Warning);
        assert_eq!(attendance_band(50.0), AttendanceBand::Warning);
        assert_eq!(attendance_band(0.0), AttendanceBand::Poor);
    }

    #[test]
    fn grade_round_trips_through_text() {
        for g in [Grade::APlus, Grade::BPlus, Grade::F] {
            assert_eq!(g.to_string().parse::<Grade>(), Ok(g));
        }
        assert_eq!(
            serde_json::to_value(Grade::CPlus).expect("serialize"),
            serde_json::json!("C+")
        );
        assert!("E".parse::<Grade>().is_err());
    }

    #[test]
    fn result_metrics_uses_exam_threshold() {
        let m = result_metrics(18.0, 20.0, None);
        assert_eq!(m.percentage, 90.0);
        assert_eq!(m.grade, Grade::APlus);
        assert!(m.is_passed);

        let m = result_metrics(8.0, 20.0, Some(10.0));
        assert_eq!(m.grade, Grade::F);
        assert!(!m.is_passed);
    }
}
