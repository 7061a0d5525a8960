//! Synchronized data core for the studio management system.
//! This crate is the single source of truth for cross-document invariants:
//! guardian/student back-references, cascade deletion, attendance and
//! payment key uniqueness, and the administrator floor.

pub mod auth;
pub mod logging;
pub mod model;
pub mod service;
pub mod store;
pub mod sync;

pub use auth::{AccountService, IdentityProvider, MemoryIdentityProvider, SignedInAccount};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::admin::{Admin, AdminPatch};
pub use model::attendance::{AttendanceEntry, AttendanceStatus};
pub use model::course::{Course, CoursePatch, DayOfWeek};
pub use model::guardian::{Guardian, GuardianPatch};
pub use model::payment::PaymentRecord;
pub use model::student::{Gender, Student, StudentPatch};
pub use service::attendance::AttendanceLedger;
pub use service::billing::{BillingService, MonthlyBillingRow};
pub use service::cascade::CascadeService;
pub use service::directory::{DirectoryService, ValidationError};
pub use service::guardian_links::GuardianLinkService;
pub use store::{Collection, DocumentStore, SqliteStore, StoreError, Subscription};
pub use sync::{SyncEngine, SyncError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
