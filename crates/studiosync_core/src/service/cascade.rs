//! Cascade deletion.
//!
//! # Responsibility
//! - Delete a course, guardian, or student together with every back-
//!   reference pointing at it, in one atomic batch.
//!
//! # Invariants
//! - No dangling reference to the deleted entity survives the commit.
//! - A failed batch leaves prior state fully intact (store atomicity).

use crate::model::course::CourseId;
use crate::model::guardian::GuardianId;
use crate::model::student::StudentId;
use crate::store::{Collection, FieldEdit, WriteOp};
use crate::sync::{SyncEngine, SyncError};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub type CascadeResult<T> = Result<T, CascadeError>;

/// Errors from cascade deletion.
#[derive(Debug)]
pub enum CascadeError {
    CourseNotFound(CourseId),
    GuardianNotFound(GuardianId),
    StudentNotFound(StudentId),
    /// Sync-layer failure; the whole batch was rolled back.
    Sync(SyncError),
}

impl Display for CascadeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CourseNotFound(id) => write!(f, "course not found: {id}"),
            Self::GuardianNotFound(id) => write!(f, "guardian not found: {id}"),
            Self::StudentNotFound(id) => write!(f, "student not found: {id}"),
            Self::Sync(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CascadeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sync(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SyncError> for CascadeError {
    fn from(value: SyncError) -> Self {
        Self::Sync(value)
    }
}

/// Deletes entities together with their dangling references.
pub struct CascadeService {
    engine: Arc<SyncEngine>,
}

impl CascadeService {
    pub fn new(engine: Arc<SyncEngine>) -> Self {
        Self { engine }
    }

    /// Deletes a course and strips it from every referencing student's
    /// `class_ids` in the same batch.
    pub fn delete_course(&self, course_id: &str) -> CascadeResult<()> {
        if self.engine.course(course_id).is_none() {
            return Err(CascadeError::CourseNotFound(course_id.to_string()));
        }

        let mut ops = vec![WriteOp::Delete {
            collection: Collection::Courses,
            id: course_id.to_string(),
        }];
        for student in self.engine.students() {
            if student.class_ids.iter().any(|id| id == course_id) {
                ops.push(WriteOp::Update {
                    collection: Collection::Students,
                    id: student.id,
                    edits: vec![FieldEdit::remove_value(
                        "classIds",
                        Value::String(course_id.to_string()),
                    )],
                });
            }
        }
        self.engine.commit(ops)?;
        Ok(())
    }

    /// Deletes a guardian and clears the link on every student that pointed
    /// at it, in the same batch.
    pub fn delete_guardian(&self, guardian_id: &str) -> CascadeResult<()> {
        if self.engine.guardian(guardian_id).is_none() {
            return Err(CascadeError::GuardianNotFound(guardian_id.to_string()));
        }

        let mut ops = vec![WriteOp::Delete {
            collection: Collection::Guardians,
            id: guardian_id.to_string(),
        }];
        for student in self.engine.students() {
            if student.guardian_id.as_deref() == Some(guardian_id) {
                ops.push(WriteOp::Update {
                    collection: Collection::Students,
                    id: student.id,
                    edits: vec![FieldEdit::clear("guardianId")],
                });
            }
        }
        self.engine.commit(ops)?;
        Ok(())
    }

    /// Deletes a student and removes it from its guardian's `student_ids`
    /// in the same batch, when a guardian link exists.
    pub fn delete_student(&self, student_id: &str) -> CascadeResult<()> {
        let student = self
            .engine
            .student(student_id)
            .ok_or_else(|| CascadeError::StudentNotFound(student_id.to_string()))?;

        let mut ops = vec![WriteOp::Delete {
            collection: Collection::Students,
            id: student_id.to_string(),
        }];
        if let Some(guardian_id) = &student.guardian_id {
            // A stale link to an already-deleted guardian leaves nothing to
            // strip.
            if self.engine.guardian(guardian_id).is_some() {
                ops.push(WriteOp::Update {
                    collection: Collection::Guardians,
                    id: guardian_id.clone(),
                    edits: vec![FieldEdit::remove_value(
                        "studentIds",
                        Value::String(student_id.to_string()),
                    )],
                });
            }
        }
        self.engine.commit(ops)?;
        Ok(())
    }
}
