//! Student domain model.
//!
//! # Responsibility
//! - Define the student record and its typed partial update.
//!
//! # Invariants
//! - `class_ids` must only reference currently-existing courses; cascade
//!   deletion strips stale entries in the same batch as the course delete.
//! - `guardian_id` and the owning guardian's `student_ids` always move
//!   together; only link coordination code may change either side.

use crate::model::course::CourseId;
use crate::model::guardian::GuardianId;
use crate::store::FieldEdit;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Stable document id for a student.
pub type StudentId = String;

/// Self-declared gender on the enrollment form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

/// Student record as stored in the `students` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: StudentId,
    pub first_name: String,
    pub last_name: String,
    pub first_name_kana: String,
    pub last_name_kana: String,
    pub gender: Gender,
    pub birth_date: NaiveDate,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub enrollment_date: NaiveDate,
    /// Course ids this student is currently assigned to.
    pub class_ids: Vec<CourseId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Back-reference to the owning guardian, mirrored by
    /// `Guardian::student_ids`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guardian_id: Option<GuardianId>,
}

impl Student {
    /// Creates an unassigned student with a generated stable id.
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            first_name_kana: String::new(),
            last_name_kana: String::new(),
            gender: Gender::Other,
            birth_date: NaiveDate::default(),
            phone: String::new(),
            email: String::new(),
            address: String::new(),
            enrollment_date: NaiveDate::default(),
            class_ids: Vec::new(),
            notes: None,
            guardian_id: None,
        }
    }

    /// Display name in "last first" order used by billing rows.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.last_name, self.first_name)
    }
}

/// Typed partial update for a student document.
///
/// Absent (`None`) members leave the stored field untouched; the guardian
/// link is deliberately excluded so it can only move through link
/// coordination (see `service::guardian_links`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub first_name_kana: Option<String>,
    pub last_name_kana: Option<String>,
    pub gender: Option<Gender>,
    pub birth_date: Option<NaiveDate>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub enrollment_date: Option<NaiveDate>,
    pub class_ids: Option<Vec<CourseId>>,
    /// `Some(None)` clears the note, `Some(Some(_))` replaces it.
    pub notes: Option<Option<String>>,
}

impl StudentPatch {
    /// Converts set members into store-level field edits.
    pub fn into_edits(self) -> Vec<FieldEdit> {
        let mut edits = Vec::new();
        push_set_string(&mut edits, "firstName", self.first_name);
        push_set_string(&mut edits, "lastName", self.last_name);
        push_set_string(&mut edits, "firstNameKana", self.first_name_kana);
        push_set_string(&mut edits, "lastNameKana", self.last_name_kana);
        if let Some(gender) = self.gender {
            edits.push(FieldEdit::set("gender", json_value(&gender)));
        }
        if let Some(date) = self.birth_date {
            edits.push(FieldEdit::set("birthDate", json_value(&date)));
        }
        push_set_string(&mut edits, "phone", self.phone);
        push_set_string(&mut edits, "email", self.email);
        push_set_string(&mut edits, "address", self.address);
        if let Some(date) = self.enrollment_date {
            edits.push(FieldEdit::set("enrollmentDate", json_value(&date)));
        }
        if let Some(class_ids) = self.class_ids {
            edits.push(FieldEdit::set("classIds", json_value(&class_ids)));
        }
        match self.notes {
            Some(Some(notes)) => edits.push(FieldEdit::set("notes", Value::String(notes))),
            Some(None) => edits.push(FieldEdit::clear("notes")),
            None => {}
        }
        edits
    }

    /// Returns true when no member is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

pub(crate) fn push_set_string(edits: &mut Vec<FieldEdit>, field: &str, value: Option<String>) {
    if let Some(value) = value {
        edits.push(FieldEdit::set(field, Value::String(value)));
    }
}

pub(crate) fn json_value<T: Serialize>(value: &T) -> Value {
    // Serializing plain strings, dates, and id vectors cannot fail.
    serde_json::to_value(value).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::{Student, StudentPatch};
    use crate::store::FieldEdit;
    use serde_json::Value;

    #[test]
    fn patch_emits_only_set_members() {
        let patch = StudentPatch {
            first_name: Some("Hana".to_string()),
            notes: Some(None),
            ..StudentPatch::default()
        };

        let edits = patch.into_edits();
        assert_eq!(
            edits,
            vec![
                FieldEdit::set("firstName", Value::String("Hana".to_string())),
                FieldEdit::clear("notes"),
            ]
        );
    }

    #[test]
    fn empty_patch_emits_no_edits() {
        let patch = StudentPatch::default();
        assert!(patch.is_empty());
        assert!(patch.into_edits().is_empty());
    }

    #[test]
    fn display_name_uses_last_first_order() {
        let student = Student::new("Hana", "Sato");
        assert_eq!(student.display_name(), "Sato Hana");
    }
}
