//! Identity provider seam and in-memory implementation.
//!
//! # Responsibility
//! - Issue stable user ids for email/password pairs.
//! - Track the signed-in user for the local session.
//!
//! # Invariants
//! - A user id, once issued, never changes for that account.
//! - Credentials are stored as salted digests, never as plain text.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Mutex, PoisonError};
use uuid::Uuid;

/// Stable identifier issued by the identity provider, reused as the
/// guardian/admin document id.
pub type UserId = String;

pub type IdentityResult<T> = Result<T, IdentityError>;

const MIN_PASSWORD_LEN: usize = 6;

/// Identity-provider failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// An account already exists for this email.
    EmailTaken(String),
    /// Unknown email or wrong password; deliberately indistinguishable.
    InvalidCredentials,
    /// Password shorter than the provider minimum.
    WeakPassword { minimum_len: usize },
}

impl Display for IdentityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmailTaken(email) => write!(f, "email already registered: {email}"),
            Self::InvalidCredentials => write!(f, "invalid email or password"),
            Self::WeakPassword { minimum_len } => {
                write!(f, "password must be at least {minimum_len} characters")
            }
        }
    }
}

impl Error for IdentityError {}

/// External identity provider seam.
///
/// The core only consumes this to obtain a stable user id; provisioning of
/// the matching document happens separately in `AccountService`.
pub trait IdentityProvider: Send + Sync {
    fn create_user(&self, email: &str, password: &str) -> IdentityResult<UserId>;
    fn sign_in(&self, email: &str, password: &str) -> IdentityResult<UserId>;
    fn sign_out(&self);
    fn current_user(&self) -> Option<UserId>;
}

struct CredentialRecord {
    user_id: UserId,
    salt: String,
    digest: String,
}

/// In-process identity provider used by tests and local smoke runs.
pub struct MemoryIdentityProvider {
    users: Mutex<BTreeMap<String, CredentialRecord>>,
    active: Mutex<Option<UserId>>,
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(BTreeMap::new()),
            active: Mutex::new(None),
        }
    }
}

impl Default for MemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityProvider for MemoryIdentityProvider {
    fn create_user(&self, email: &str, password: &str) -> IdentityResult<UserId> {
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(IdentityError::WeakPassword {
                minimum_len: MIN_PASSWORD_LEN,
            });
        }

        let key = normalize_email(email);
        let mut users = self.users.lock().unwrap_or_else(PoisonError::into_inner);
        if users.contains_key(&key) {
            return Err(IdentityError::EmailTaken(key));
        }

        let user_id = Uuid::new_v4().to_string();
        let salt = Uuid::new_v4().to_string();
        let digest = credential_digest(&salt, password);
        users.insert(
            key,
            CredentialRecord {
                user_id: user_id.clone(),
                salt,
                digest,
            },
        );
        Ok(user_id)
    }

    fn sign_in(&self, email: &str, password: &str) -> IdentityResult<UserId> {
        let key = normalize_email(email);
        let users = self.users.lock().unwrap_or_else(PoisonError::into_inner);
        let record = users.get(&key).ok_or(IdentityError::InvalidCredentials)?;
        if credential_digest(&record.salt, password) != record.digest {
            return Err(IdentityError::InvalidCredentials);
        }

        let user_id = record.user_id.clone();
        *self.active.lock().unwrap_or_else(PoisonError::into_inner) = Some(user_id.clone());
        Ok(user_id)
    }

    fn sign_out(&self) {
        *self.active.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn current_user(&self) -> Option<UserId> {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

fn credential_digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::{IdentityError, IdentityProvider, MemoryIdentityProvider};

    #[test]
    fn create_then_sign_in_yields_same_user_id() {
        let provider = MemoryIdentityProvider::new();
        let created = provider
            .create_user("sato@example.com", "secret1")
            .expect("account should be created");

        let signed_in = provider
            .sign_in("  SATO@example.com ", "secret1")
            .expect("sign-in should succeed for normalized email");
        assert_eq!(signed_in, created);
        assert_eq!(provider.current_user(), Some(created));
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let provider = MemoryIdentityProvider::new();
        provider
            .create_user("sato@example.com", "secret1")
            .expect("first account should be created");
        let err = provider
            .create_user("Sato@Example.com", "another1")
            .expect_err("duplicate email must be rejected");
        assert!(matches!(err, IdentityError::EmailTaken(_)));
    }

    #[test]
    fn short_password_is_rejected() {
        let provider = MemoryIdentityProvider::new();
        let err = provider
            .create_user("sato@example.com", "abc")
            .expect_err("short password must be rejected");
        assert_eq!(err, IdentityError::WeakPassword { minimum_len: 6 });
    }

    #[test]
    fn wrong_password_and_unknown_email_look_identical() {
        let provider = MemoryIdentityProvider::new();
        provider
            .create_user("sato@example.com", "secret1")
            .expect("account should be created");

        let wrong = provider
            .sign_in("sato@example.com", "nope-nope")
            .expect_err("wrong password must fail");
        let unknown = provider
            .sign_in("kato@example.com", "secret1")
            .expect_err("unknown email must fail");
        assert_eq!(wrong, IdentityError::InvalidCredentials);
        assert_eq!(unknown, IdentityError::InvalidCredentials);
    }

    #[test]
    fn sign_out_clears_active_user() {
        let provider = MemoryIdentityProvider::new();
        provider
            .create_user("sato@example.com", "secret1")
            .expect("account should be created");
        provider
            .sign_in("sato@example.com", "secret1")
            .expect("sign-in should succeed");

        provider.sign_out();
        assert_eq!(provider.current_user(), None);
    }
}
