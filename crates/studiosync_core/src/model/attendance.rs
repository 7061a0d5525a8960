//! Attendance entry domain model.
//!
//! # Invariants
//! - At most one entry exists per (student, course, date) triple; the
//!   ledger upserts against that key rather than inserting blindly.
//! - `status` is a flat tagged value. Any status may replace any other;
//!   there is deliberately no transition table.

use crate::model::course::CourseId;
use crate::model::student::StudentId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable document id for an attendance entry.
pub type AttendanceEntryId = String;

/// Recorded attendance outcome for one student on one course date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    EarlyLeave,
    /// Attended a make-up slot instead of the scheduled one.
    Transfer,
}

/// One row in the `attendance` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceEntry {
    pub id: AttendanceEntryId,
    pub student_id: StudentId,
    pub course_id: CourseId,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
}

impl AttendanceEntry {
    /// Creates an entry with a generated stable id.
    pub fn new(
        student_id: impl Into<StudentId>,
        course_id: impl Into<CourseId>,
        date: NaiveDate,
        status: AttendanceStatus,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            student_id: student_id.into(),
            course_id: course_id.into(),
            date,
            status,
        }
    }

    /// Returns true when this entry covers the given composite key.
    pub fn matches(&self, student_id: &str, course_id: &str, date: NaiveDate) -> bool {
        self.student_id == student_id && self.course_id == course_id && self.date == date
    }
}
