//! Domain models for the six synchronized collections.
//!
//! # Responsibility
//! - Define canonical entity shapes mirrored into the document store.
//! - Define typed per-entity patch structs for partial updates.
//!
//! # Invariants
//! - Every entity carries a stable string `id`; the store keeps it as the
//!   document key, not as a body field.
//! - Field names serialize in camelCase to match the external schema.

pub mod admin;
pub mod attendance;
pub mod course;
pub mod guardian;
pub mod payment;
pub mod student;

/// Access to the stable document id every entity carries.
pub trait HasId {
    fn id(&self) -> &str;
}

impl HasId for admin::Admin {
    fn id(&self) -> &str {
        &self.id
    }
}

impl HasId for attendance::AttendanceEntry {
    fn id(&self) -> &str {
        &self.id
    }
}

impl HasId for course::Course {
    fn id(&self) -> &str {
        &self.id
    }
}

impl HasId for guardian::Guardian {
    fn id(&self) -> &str {
        &self.id
    }
}

impl HasId for payment::PaymentRecord {
    fn id(&self) -> &str {
        &self.id
    }
}

impl HasId for student::Student {
    fn id(&self) -> &str {
        &self.id
    }
}
