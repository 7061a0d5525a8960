//! Administrator domain model.
//!
//! # Invariants
//! - The `admins` collection never drops to zero members through a delete
//!   operation; `DirectoryService::delete_admin` enforces the floor.

use crate::model::student::push_set_string;
use crate::store::FieldEdit;
use serde::{Deserialize, Serialize};

/// Stable document id for an administrator; equals the identity-provider
/// user id when provisioned through `auth::AccountService`.
pub type AdminId = String;

/// Administrator record in the `admins` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Admin {
    pub id: AdminId,
    pub name: String,
    pub email: String,
}

impl Admin {
    /// Creates an administrator with a caller-provided id.
    pub fn with_id(
        id: impl Into<AdminId>,
        name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
        }
    }
}

/// Typed partial update for an administrator document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminPatch {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl AdminPatch {
    pub fn into_edits(self) -> Vec<FieldEdit> {
        let mut edits = Vec::new();
        push_set_string(&mut edits, "name", self.name);
        push_set_string(&mut edits, "email", self.email);
        edits
    }
}
