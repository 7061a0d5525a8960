//! Synchronization layer over the document store.
//!
//! # Responsibility
//! - Keep materialized in-memory sets of all six collections current.
//! - Expose typed create/update/delete plus atomic batch commit.
//!
//! # Invariants
//! - Materialized sets are a derived, replaceable cache: every store push
//!   replaces the whole set, and the store stays the sole persistent owner.
//! - Batch failures leave both the store and the materialized sets
//!   untouched.

mod codec;
mod engine;

pub use engine::{SyncEngine, SyncError, SyncResult};
