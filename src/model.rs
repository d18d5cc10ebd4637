use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Excused,
}

impl AttendanceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AttendanceStatus::Present => "Present",
            AttendanceStatus::Absent => "Absent",
            AttendanceStatus::Late => "Late",
            AttendanceStatus::Excused => "Excused",
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttendanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "present" => Ok(AttendanceStatus::Present),
            "absent" => Ok(AttendanceStatus::Absent),
            "late" => Ok(AttendanceStatus::Late),
            "excused" => Ok(AttendanceStatus::Excused),
            _ => Err(format!("unknown attendance status: {}", s.trim())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExamType {
    Midterm,
    Final,
    Quiz,
    Assignment,
    Test,
}

impl FromStr for ExamType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "midterm" => Ok(ExamType::Midterm),
            "final" => Ok(ExamType::Final),
            "quiz" => Ok(ExamType::Quiz),
            "assignment" => Ok(ExamType::Assignment),
            "test" => Ok(ExamType::Test),
            _ => Err(format!("unknown exam type: {}", s.trim())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            _ => Err(format!("unknown gender: {}", s.trim())),
        }
    }
}

/// Roster entry. Class screens list students by name, so roster order is
/// name order unless the caller says otherwise.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Student {
    pub id: String,
    pub name: String,
    pub rollno: Option<String>,
    pub class_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AttendanceRecord {
    pub id: String,
    pub student_id: String,
    pub class_id: String,
    pub date: String,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Exam {
    pub id: String,
    pub name: String,
    pub exam_type: String,
    pub class_id: String,
    pub subject_id: Option<String>,
    pub exam_date: Option<String>,
    pub total_marks: f64,
    pub passing_marks: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExamResult {
    pub id: String,
    pub exam_id: String,
    pub student_id: String,
    pub marks_obtained: f64,
    pub percentage: Option<f64>,
    pub grade: Option<String>,
    #[serde(default, deserialize_with = "de_opt_flag")]
    pub is_passed: Option<bool>,
}

// Write-side field sets. Each one is a full row image for insert or update.

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassFields {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionFields {
    pub name: String,
    pub class_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectFields {
    pub name: String,
    pub class_id: String,
    pub section_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeacherFields {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<Gender>,
    pub subject: Option<String>,
    pub qualification: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<String>,
    pub joining_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentFields {
    pub name: String,
    pub rollno: Option<String>,
    pub class_id: String,
    pub gender: Gender,
    pub email: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExamFields {
    pub name: String,
    pub exam_type: ExamType,
    pub class_id: String,
    pub subject_id: Option<String>,
    pub exam_date: String,
    pub total_marks: f64,
    pub passing_marks: Option<f64>,
}

/// SQLite hands flags back as 0/1 integers.
fn de_opt_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match v {
        Some(serde_json::Value::Bool(b)) => Some(b),
        Some(serde_json::Value::Number(n)) => n.as_i64().map(|i| i != 0),
        _ => None,
    })
}
