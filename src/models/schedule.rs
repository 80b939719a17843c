use serde::{Deserialize, Serialize};

use crate::models::day::Weekday;

/// One schedule document per student. The slot list is unordered; any
/// ordering the clients see is produced at query time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentSchedule {
    pub id: String,
    pub student_id: String,
    pub student_name: String,
    pub course: String,
    pub year_level: String,
    pub section: String,
    pub semester: String,
    pub school_year: String,
    pub slots: Vec<ClassSlot>,
    pub updated_at: String,
}

impl StudentSchedule {
    /// Label of the contributing section, e.g. "BSIT 3-A".
    pub fn section_label(&self) -> String {
        format!("{} {}-{}", self.course, self.year_level, self.section)
    }
}

/// A single class meeting in a student's schedule. `professor` is free text
/// as entered by the student; `professor_id` is the explicit faculty
/// reference and wins over the text whenever it is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassSlot {
    pub subject: String,
    pub day: Weekday,
    pub start_time: String,
    pub end_time: String,
    pub room: String,
    pub professor: String,
    #[serde(default)]
    pub professor_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveScheduleRequest {
    pub student_id: String,
    pub student_name: String,
    pub course: String,
    pub year_level: String,
    pub section: String,
    pub semester: String,
    pub school_year: String,
    pub slots: Vec<ClassSlot>,
}

/// Computed aggregate of one class a faculty member teaches, keyed by
/// (subject, day, start, end). Never persisted; recomputed on every query.
#[derive(Debug, Clone, Serialize)]
pub struct DerivedFacultyClass {
    pub subject: String,
    pub day: Weekday,
    pub start_time: String,
    pub end_time: String,
    pub room: String,
    pub sections: Vec<String>,
    pub student_count: u32,
    pub validated: bool,
    pub students_needed: u32,
}

impl DerivedFacultyClass {
    /// Stable identity of the aggregate, also used as the notification
    /// idempotency key suffix.
    pub fn class_key(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.subject.trim().to_lowercase(),
            self.day,
            self.start_time,
            self.end_time
        )
    }
}
