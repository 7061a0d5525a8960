//! Attendance ledger.
//!
//! # Responsibility
//! - Upsert attendance entries against the (student, course, date) key.
//! - Provide day-sheet and roster lookups.
//!
//! # Invariants
//! - Serialized upserts keep exactly one entry per composite key.
//! - An update touches only the `status` field; the key fields never
//!   change after insert.

use crate::model::attendance::{AttendanceEntry, AttendanceEntryId, AttendanceStatus};
use crate::model::student::Student;
use crate::store::{Collection, FieldEdit, WriteOp};
use crate::sync::{SyncEngine, SyncResult};
use chrono::NaiveDate;
use serde_json::json;
use std::sync::Arc;

/// Upserting view over the attendance collection.
pub struct AttendanceLedger {
    engine: Arc<SyncEngine>,
}

impl AttendanceLedger {
    pub fn new(engine: Arc<SyncEngine>) -> Self {
        Self { engine }
    }

    /// Records a status for one student on one course date.
    ///
    /// # Contract
    /// - An existing entry for the key gets only its status replaced.
    /// - A missing entry is inserted with the full key.
    /// - Any status may replace any other; there is no transition table.
    pub fn upsert(
        &self,
        student_id: &str,
        course_id: &str,
        date: NaiveDate,
        status: AttendanceStatus,
    ) -> SyncResult<AttendanceEntryId> {
        let existing = self
            .engine
            .attendance()
            .into_iter()
            .find(|entry| entry.matches(student_id, course_id, date));

        match existing {
            Some(entry) => {
                self.engine.commit(vec![WriteOp::Update {
                    collection: Collection::Attendance,
                    id: entry.id.clone(),
                    edits: vec![FieldEdit::set("status", json!(status))],
                }])?;
                Ok(entry.id)
            }
            None => self.engine.create_attendance_entry(&AttendanceEntry::new(
                student_id, course_id, date, status,
            )),
        }
    }

    /// Returns the entry for one composite key, when present.
    pub fn entry(
        &self,
        student_id: &str,
        course_id: &str,
        date: NaiveDate,
    ) -> Option<AttendanceEntry> {
        self.engine
            .attendance()
            .into_iter()
            .find(|entry| entry.matches(student_id, course_id, date))
    }

    /// Returns all entries recorded for one course on one date.
    pub fn entries_for(&self, course_id: &str, date: NaiveDate) -> Vec<AttendanceEntry> {
        self.engine
            .attendance()
            .into_iter()
            .filter(|entry| entry.course_id == course_id && entry.date == date)
            .collect()
    }

    /// Returns the students currently assigned to a course.
    pub fn roster(&self, course_id: &str) -> Vec<Student> {
        self.engine
            .students()
            .into_iter()
            .filter(|student| student.class_ids.iter().any(|id| id == course_id))
            .collect()
    }
}
