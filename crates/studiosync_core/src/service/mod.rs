//! Coordinator services over the sync engine.
//!
//! # Responsibility
//! - Enforce cross-document invariants (guardian links, cascades, unique
//!   attendance/payment keys, the admin floor) above the sync layer.
//! - Keep every multi-document side effect inside one atomic batch.

pub mod attendance;
pub mod billing;
pub mod cascade;
pub mod directory;
pub mod guardian_links;
