//! Directory maintenance: validated CRUD for the people and course records.
//!
//! # Responsibility
//! - Validate caller input before it reaches the store.
//! - Create students atomically with their guardian-list back-reference.
//! - Enforce the administrator floor on delete.
//!
//! # Invariants
//! - Names must not be blank; emails must be syntactically valid; fees and
//!   capacities are never negative.
//! - The admins collection never drops to zero members via `delete_admin`.

use crate::model::admin::{AdminId, AdminPatch};
use crate::model::course::{Course, CourseId, CoursePatch};
use crate::model::guardian::{GuardianId, GuardianPatch};
use crate::model::student::{Student, StudentId, StudentPatch};
use crate::store::{Collection, FieldEdit, WriteOp};
use crate::sync::{SyncEngine, SyncError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Caller-side input defect, rejected before any write is issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    BlankField(&'static str),
    InvalidEmail(String),
    NegativeFee(i64),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankField(field) => write!(f, "field `{field}` must not be blank"),
            Self::InvalidEmail(value) => write!(f, "invalid email address: `{value}`"),
            Self::NegativeFee(fee) => write!(f, "monthly fee must not be negative: {fee}"),
        }
    }
}

impl Error for ValidationError {}

/// Errors from directory operations.
#[derive(Debug)]
pub enum DirectoryError {
    Validation(ValidationError),
    GuardianNotFound(GuardianId),
    AdminNotFound(AdminId),
    /// Deleting this admin would empty the collection.
    LastAdmin(AdminId),
    Sync(SyncError),
}

impl Display for DirectoryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::GuardianNotFound(id) => write!(f, "guardian not found: {id}"),
            Self::AdminNotFound(id) => write!(f, "admin not found: {id}"),
            Self::LastAdmin(id) => {
                write!(f, "refusing to delete the last administrator: {id}")
            }
            Self::Sync(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DirectoryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Sync(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for DirectoryError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<SyncError> for DirectoryError {
    fn from(value: SyncError) -> Self {
        Self::Sync(value)
    }
}

/// Validated CRUD facade for students, guardians, courses, and admins.
pub struct DirectoryService {
    engine: Arc<SyncEngine>,
}

impl DirectoryService {
    pub fn new(engine: Arc<SyncEngine>) -> Self {
        Self { engine }
    }

    /// Creates a student; when a guardian link is present, the create and
    /// the guardian-list append commit as one batch.
    pub fn create_student(&self, student: &Student) -> DirectoryResult<StudentId> {
        require_non_blank("firstName", &student.first_name)?;
        require_non_blank("lastName", &student.last_name)?;
        if !student.email.is_empty() {
            require_email(&student.email)?;
        }

        let (id, create) = self.engine.create_op(Collection::Students, student)?;
        let mut ops = vec![create];
        if let Some(guardian_id) = &student.guardian_id {
            if self.engine.guardian(guardian_id).is_none() {
                return Err(DirectoryError::GuardianNotFound(guardian_id.clone()));
            }
            ops.push(WriteOp::Update {
                collection: Collection::Guardians,
                id: guardian_id.clone(),
                edits: vec![FieldEdit::append_unique(
                    "studentIds",
                    Value::String(id.clone()),
                )],
            });
        }
        self.engine.commit(ops)?;
        Ok(id)
    }

    /// Applies a validated patch to a student. Guardian moves are not part
    /// of the patch; they go through `GuardianLinkService::assign_guardian`.
    pub fn update_student(&self, id: &str, patch: StudentPatch) -> DirectoryResult<()> {
        if let Some(first_name) = &patch.first_name {
            require_non_blank("firstName", first_name)?;
        }
        if let Some(last_name) = &patch.last_name {
            require_non_blank("lastName", last_name)?;
        }
        if let Some(email) = &patch.email {
            if !email.is_empty() {
                require_email(email)?;
            }
        }
        self.engine.update_student(id, patch)?;
        Ok(())
    }

    pub fn create_course(&self, course: &Course) -> DirectoryResult<CourseId> {
        require_non_blank("name", &course.name)?;
        if course.monthly_fee < 0 {
            return Err(ValidationError::NegativeFee(course.monthly_fee).into());
        }
        Ok(self.engine.create_course(course)?)
    }

    pub fn update_course(&self, id: &str, patch: CoursePatch) -> DirectoryResult<()> {
        if let Some(name) = &patch.name {
            require_non_blank("name", name)?;
        }
        if let Some(fee) = patch.monthly_fee {
            if fee < 0 {
                return Err(ValidationError::NegativeFee(fee).into());
            }
        }
        self.engine.update_course(id, patch)?;
        Ok(())
    }

    pub fn update_guardian(&self, id: &str, patch: GuardianPatch) -> DirectoryResult<()> {
        if let Some(name) = &patch.name {
            require_non_blank("name", name)?;
        }
        if let Some(email) = &patch.email {
            require_email(email)?;
        }
        self.engine.update_guardian(id, patch)?;
        Ok(())
    }

    pub fn update_admin(&self, id: &str, patch: AdminPatch) -> DirectoryResult<()> {
        if let Some(name) = &patch.name {
            require_non_blank("name", name)?;
        }
        if let Some(email) = &patch.email {
            require_email(email)?;
        }
        self.engine.update_admin(id, patch)?;
        Ok(())
    }

    /// Deletes an administrator unless it is the last one.
    pub fn delete_admin(&self, id: &str) -> DirectoryResult<()> {
        let admins = self.engine.admins();
        if !admins.iter().any(|admin| admin.id == id) {
            return Err(DirectoryError::AdminNotFound(id.to_string()));
        }
        if admins.len() <= 1 {
            return Err(DirectoryError::LastAdmin(id.to_string()));
        }
        self.engine.delete(Collection::Admins, id)?;
        Ok(())
    }
}

pub(crate) fn require_non_blank(
    field: &'static str,
    value: &str,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::BlankField(field))
    } else {
        Ok(())
    }
}

pub(crate) fn require_email(value: &str) -> Result<(), ValidationError> {
    if EMAIL_RE.is_match(value.trim()) {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail(value.to_string()))
    }
}
