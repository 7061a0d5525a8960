//! Identity consumption and account provisioning.
//!
//! # Responsibility
//! - Define the external identity-provider seam (create/sign-in/sign-out).
//! - Provision guardian/admin documents keyed by the identity's user id.
//!
//! # Invariants
//! - The core consumes identities only to obtain a stable user id; no
//!   authorization logic lives here.

pub mod accounts;
pub mod identity;

pub use accounts::{AccountError, AccountService, SignedInAccount};
pub use identity::{IdentityError, IdentityProvider, MemoryIdentityProvider, UserId};
