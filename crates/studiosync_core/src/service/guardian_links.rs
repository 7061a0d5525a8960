//! Guardian link coordination.
//!
//! # Responsibility
//! - Keep `Student::guardian_id` and `Guardian::student_ids` mutually
//!   consistent through single-batch link moves.
//!
//! # Invariants
//! - A student appears in at most one guardian's `student_ids`, exactly the
//!   guardian its `guardian_id` points at.
//! - Reassigning to the already-linked guardian commits no batch at all.
//! - Guardian-list membership is edited with in-transaction list edits
//!   (`AppendUnique`/`RemoveValue`), so a stale materialized copy of the
//!   list can never clobber a concurrent writer's change.

use crate::model::guardian::GuardianId;
use crate::model::student::StudentId;
use crate::store::{Collection, FieldEdit, WriteOp};
use crate::sync::{SyncEngine, SyncError};
use log::{debug, warn};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub type GuardianLinkResult<T> = Result<T, GuardianLinkError>;

/// Errors from guardian link coordination.
#[derive(Debug)]
pub enum GuardianLinkError {
    /// Target student is not in the materialized set.
    StudentNotFound(StudentId),
    /// Requested guardian is not in the materialized set.
    GuardianNotFound(GuardianId),
    /// Sync-layer failure.
    Sync(SyncError),
}

impl Display for GuardianLinkError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StudentNotFound(id) => write!(f, "student not found: {id}"),
            Self::GuardianNotFound(id) => write!(f, "guardian not found: {id}"),
            Self::Sync(err) => write!(f, "{err}"),
        }
    }
}

impl Error for GuardianLinkError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sync(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SyncError> for GuardianLinkError {
    fn from(value: SyncError) -> Self {
        Self::Sync(value)
    }
}

/// Coordinates both sides of the guardian/student back-reference.
pub struct GuardianLinkService {
    engine: Arc<SyncEngine>,
}

impl GuardianLinkService {
    pub fn new(engine: Arc<SyncEngine>) -> Self {
        Self { engine }
    }

    /// Moves a student's guardian link, updating both sides in one batch.
    ///
    /// # Contract
    /// - `None` unlinks the student.
    /// - When the link is already in the requested state, no batch is
    ///   committed (idempotent no-op).
    /// - Otherwise one batch sets the student's `guardian_id`, removes the
    ///   student from the prior guardian's list, and appends it to the new
    ///   guardian's list; either all three apply or none do.
    pub fn assign_guardian(
        &self,
        student_id: &str,
        new_guardian_id: Option<&str>,
    ) -> GuardianLinkResult<()> {
        let ops = self.plan_reassign(student_id, new_guardian_id)?;
        if ops.is_empty() {
            debug!(
                "event=guardian_assign module=service status=noop student_id={student_id}"
            );
            return Ok(());
        }
        self.engine.commit(ops)?;
        Ok(())
    }

    fn plan_reassign(
        &self,
        student_id: &str,
        new_guardian_id: Option<&str>,
    ) -> GuardianLinkResult<Vec<WriteOp>> {
        let student = self
            .engine
            .student(student_id)
            .ok_or_else(|| GuardianLinkError::StudentNotFound(student_id.to_string()))?;

        let current = student.guardian_id.as_deref();
        if current == new_guardian_id {
            return Ok(Vec::new());
        }

        if let Some(new_id) = new_guardian_id {
            if self.engine.guardian(new_id).is_none() {
                return Err(GuardianLinkError::GuardianNotFound(new_id.to_string()));
            }
        }

        let student_edit = match new_guardian_id {
            Some(new_id) => FieldEdit::set("guardianId", Value::String(new_id.to_string())),
            None => FieldEdit::clear("guardianId"),
        };
        let mut ops = vec![WriteOp::Update {
            collection: Collection::Students,
            id: student_id.to_string(),
            edits: vec![student_edit],
        }];

        if let Some(old_id) = current {
            if self.engine.guardian(old_id).is_some() {
                ops.push(WriteOp::Update {
                    collection: Collection::Guardians,
                    id: old_id.to_string(),
                    edits: vec![FieldEdit::remove_value(
                        "studentIds",
                        Value::String(student_id.to_string()),
                    )],
                });
            } else {
                // Stale link: the prior guardian is already gone, so there
                // is no list to strip.
                warn!(
                    "event=guardian_assign module=service status=stale_link student_id={student_id} guardian_id={old_id}"
                );
            }
        }

        if let Some(new_id) = new_guardian_id {
            ops.push(WriteOp::Update {
                collection: Collection::Guardians,
                id: new_id.to_string(),
                edits: vec![FieldEdit::append_unique(
                    "studentIds",
                    Value::String(student_id.to_string()),
                )],
            });
        }

        Ok(ops)
    }
}
