//! Guardian domain model.
//!
//! # Invariants
//! - `student_ids` is an ordered list without duplicates; every listed
//!   student's `guardian_id` points back at this guardian.
//! - The id equals the identity-provider user id when the guardian was
//!   provisioned through `auth::AccountService`.

use crate::model::student::{push_set_string, StudentId};
use crate::store::FieldEdit;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable document id for a guardian.
pub type GuardianId = String;

/// Guardian (account holder) record in the `guardians` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guardian {
    pub id: GuardianId,
    pub name: String,
    pub email: String,
    /// Denormalized back-references to owned students, kept in sync by the
    /// link coordinator and cascade deletion.
    pub student_ids: Vec<StudentId>,
}

impl Guardian {
    /// Creates a guardian with a generated stable id and no students.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), name, email)
    }

    /// Creates a guardian with a caller-provided id.
    ///
    /// Used by account provisioning, where the identity provider already
    /// issued the stable user id.
    pub fn with_id(
        id: impl Into<GuardianId>,
        name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            student_ids: Vec::new(),
        }
    }
}

/// Typed partial update for a guardian document.
///
/// `student_ids` is intentionally not patchable; the list only changes
/// through link coordination and cascade deletion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuardianPatch {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl GuardianPatch {
    pub fn into_edits(self) -> Vec<FieldEdit> {
        let mut edits = Vec::new();
        push_set_string(&mut edits, "name", self.name);
        push_set_string(&mut edits, "email", self.email);
        edits
    }
}
