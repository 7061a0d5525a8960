//! Account provisioning and role resolution.
//!
//! # Responsibility
//! - Create guardian/admin documents keyed by freshly-issued identity ids.
//! - Resolve a signed-in identity to its admin or guardian record.
//!
//! # Invariants
//! - Identity creation and the document write are decoupled steps; the
//!   document write reuses the identity's stable id as the document id.
//! - An identity without a matching document is signed out again and
//!   surfaces as `UnknownAccount`.

use crate::auth::identity::{IdentityError, IdentityProvider, UserId};
use crate::model::admin::Admin;
use crate::model::guardian::{Guardian, GuardianId};
use crate::service::directory::{require_email, require_non_blank, ValidationError};
use crate::sync::{SyncEngine, SyncError};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub type AccountResult<T> = Result<T, AccountError>;

/// Errors from account provisioning and sign-in.
#[derive(Debug)]
pub enum AccountError {
    Identity(IdentityError),
    Validation(ValidationError),
    /// The identity exists but no admin/guardian document matches it.
    UnknownAccount(UserId),
    Sync(SyncError),
}

impl Display for AccountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Identity(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::UnknownAccount(user_id) => {
                write!(f, "no account record for user: {user_id}")
            }
            Self::Sync(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AccountError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Identity(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::UnknownAccount(_) => None,
            Self::Sync(err) => Some(err),
        }
    }
}

impl From<IdentityError> for AccountError {
    fn from(value: IdentityError) -> Self {
        Self::Identity(value)
    }
}

impl From<ValidationError> for AccountError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<SyncError> for AccountError {
    fn from(value: SyncError) -> Self {
        Self::Sync(value)
    }
}

/// Role-resolved result of a successful sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignedInAccount {
    Admin(Admin),
    Guardian(Guardian),
}

/// Provisions accounts against the identity provider and the engine.
pub struct AccountService {
    identity: Arc<dyn IdentityProvider>,
    engine: Arc<SyncEngine>,
}

impl AccountService {
    pub fn new(identity: Arc<dyn IdentityProvider>, engine: Arc<SyncEngine>) -> Self {
        Self { identity, engine }
    }

    /// Creates a guardian account: identity first, then the document keyed
    /// by the identity's user id, with an empty student list.
    pub fn create_guardian_account(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> AccountResult<GuardianId> {
        require_non_blank("name", name)?;
        require_email(email)?;

        let user_id = self.identity.create_user(email, password)?;
        self.engine
            .create_guardian(&Guardian::with_id(user_id.clone(), name, email))?;
        Ok(user_id)
    }

    /// Creates an administrator account the same way.
    pub fn create_admin_account(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> AccountResult<UserId> {
        require_non_blank("name", name)?;
        require_email(email)?;

        let user_id = self.identity.create_user(email, password)?;
        self.engine
            .create_admin(&Admin::with_id(user_id.clone(), name, email))?;
        Ok(user_id)
    }

    /// Signs in and resolves the role: admins are probed first, then
    /// guardians; an unmatched identity is signed out again.
    pub fn sign_in(&self, email: &str, password: &str) -> AccountResult<SignedInAccount> {
        let user_id = self.identity.sign_in(email, password)?;

        if let Some(admin) = self.engine.admin(&user_id) {
            return Ok(SignedInAccount::Admin(admin));
        }
        if let Some(guardian) = self.engine.guardian(&user_id) {
            return Ok(SignedInAccount::Guardian(guardian));
        }

        self.identity.sign_out();
        Err(AccountError::UnknownAccount(user_id))
    }

    pub fn sign_out(&self) {
        self.identity.sign_out();
    }
}
