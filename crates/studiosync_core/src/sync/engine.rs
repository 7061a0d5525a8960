//! Sync engine: materialized collection sets over the document store.
//!
//! # Responsibility
//! - Subscribe to all six collections and keep replacement caches current.
//! - Provide typed create/update/delete entry points and batch commit.
//!
//! # Invariants
//! - Reads serve cloned snapshots of the materialized sets; callers never
//!   observe a half-applied batch.
//! - Update entry points only accept typed patches; there is no free-form
//!   field-map merge above the store layer.

use crate::model::admin::{Admin, AdminId, AdminPatch};
use crate::model::attendance::{AttendanceEntry, AttendanceEntryId};
use crate::model::course::{Course, CourseId, CoursePatch};
use crate::model::guardian::{Guardian, GuardianId, GuardianPatch};
use crate::model::payment::{PaymentRecord, PaymentRecordId};
use crate::model::student::{Student, StudentId, StudentPatch};
use crate::model::HasId;
use crate::store::{
    Collection, DocumentStore, FieldEdit, StoreError, StoreResult, Subscription, WriteOp,
};
use crate::sync::codec::{decode_snapshot, encode_body, new_doc_id};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, PoisonError, RwLock};

pub type SyncResult<T> = Result<T, SyncError>;

/// Failure in the sync layer.
#[derive(Debug)]
pub enum SyncError {
    /// Store-originated failure, propagated unmodified.
    Store(StoreError),
    /// An entity could not be encoded into a document body.
    Codec {
        collection: Collection,
        message: String,
    },
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::Codec {
                collection,
                message,
            } => write!(f, "codec failure for {collection}: {message}"),
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Codec { .. } => None,
        }
    }
}

impl From<StoreError> for SyncError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Continuously-updated cache of one collection's decoded member set.
struct Materialized<T> {
    rows: Arc<RwLock<Vec<T>>>,
    _subscription: Subscription,
}

impl<T> Materialized<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn attach(store: &Arc<dyn DocumentStore>, collection: Collection) -> StoreResult<Self> {
        let rows = Arc::new(RwLock::new(Vec::new()));

        let cache = Arc::clone(&rows);
        let subscription = store.subscribe(
            collection,
            Box::new(move |documents| {
                let decoded = decode_snapshot::<T>(collection, documents);
                *cache.write().unwrap_or_else(PoisonError::into_inner) = decoded;
            }),
        );

        // Subscribe first, then seed: under the single-writer model no
        // commit interleaves, and later pushes replace the seed wholesale.
        let seeded = decode_snapshot::<T>(collection, &store.snapshot(collection)?);
        *rows.write().unwrap_or_else(PoisonError::into_inner) = seeded;

        Ok(Self {
            rows,
            _subscription: subscription,
        })
    }

    fn all(&self) -> Vec<T> {
        self.rows
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Synchronized data engine over a document store.
pub struct SyncEngine {
    store: Arc<dyn DocumentStore>,
    students: Materialized<Student>,
    guardians: Materialized<Guardian>,
    courses: Materialized<Course>,
    attendance: Materialized<AttendanceEntry>,
    payments: Materialized<PaymentRecord>,
    admins: Materialized<Admin>,
}

impl SyncEngine {
    /// Attaches to the store and materializes all six collections.
    pub fn new(store: Arc<dyn DocumentStore>) -> SyncResult<Self> {
        Ok(Self {
            students: Materialized::attach(&store, Collection::Students)?,
            guardians: Materialized::attach(&store, Collection::Guardians)?,
            courses: Materialized::attach(&store, Collection::Courses)?,
            attendance: Materialized::attach(&store, Collection::Attendance)?,
            payments: Materialized::attach(&store, Collection::Payments)?,
            admins: Materialized::attach(&store, Collection::Admins)?,
            store,
        })
    }

    // ----- materialized reads -----

    pub fn students(&self) -> Vec<Student> {
        self.students.all()
    }

    pub fn guardians(&self) -> Vec<Guardian> {
        self.guardians.all()
    }

    pub fn courses(&self) -> Vec<Course> {
        self.courses.all()
    }

    pub fn attendance(&self) -> Vec<AttendanceEntry> {
        self.attendance.all()
    }

    pub fn payments(&self) -> Vec<PaymentRecord> {
        self.payments.all()
    }

    pub fn admins(&self) -> Vec<Admin> {
        self.admins.all()
    }

    pub fn student(&self, id: &str) -> Option<Student> {
        self.students().into_iter().find(|row| row.id == id)
    }

    pub fn guardian(&self, id: &str) -> Option<Guardian> {
        self.guardians().into_iter().find(|row| row.id == id)
    }

    pub fn course(&self, id: &str) -> Option<Course> {
        self.courses().into_iter().find(|row| row.id == id)
    }

    pub fn admin(&self, id: &str) -> Option<Admin> {
        self.admins().into_iter().find(|row| row.id == id)
    }

    // ----- writes -----

    /// Commits a heterogeneous batch as one all-or-nothing unit.
    pub fn commit(&self, ops: Vec<WriteOp>) -> SyncResult<()> {
        self.store.apply(ops)?;
        Ok(())
    }

    pub fn create_student(&self, student: &Student) -> SyncResult<StudentId> {
        self.create_doc(Collection::Students, student)
    }

    pub fn create_guardian(&self, guardian: &Guardian) -> SyncResult<GuardianId> {
        self.create_doc(Collection::Guardians, guardian)
    }

    pub fn create_course(&self, course: &Course) -> SyncResult<CourseId> {
        self.create_doc(Collection::Courses, course)
    }

    pub fn create_attendance_entry(
        &self,
        entry: &AttendanceEntry,
    ) -> SyncResult<AttendanceEntryId> {
        self.create_doc(Collection::Attendance, entry)
    }

    pub fn create_payment_record(&self, record: &PaymentRecord) -> SyncResult<PaymentRecordId> {
        self.create_doc(Collection::Payments, record)
    }

    pub fn create_admin(&self, admin: &Admin) -> SyncResult<AdminId> {
        self.create_doc(Collection::Admins, admin)
    }

    pub fn update_student(&self, id: &str, patch: StudentPatch) -> SyncResult<()> {
        self.update_doc(Collection::Students, id, patch.into_edits())
    }

    pub fn update_guardian(&self, id: &str, patch: GuardianPatch) -> SyncResult<()> {
        self.update_doc(Collection::Guardians, id, patch.into_edits())
    }

    pub fn update_course(&self, id: &str, patch: CoursePatch) -> SyncResult<()> {
        self.update_doc(Collection::Courses, id, patch.into_edits())
    }

    pub fn update_admin(&self, id: &str, patch: AdminPatch) -> SyncResult<()> {
        self.update_doc(Collection::Admins, id, patch.into_edits())
    }

    /// Deletes one document without cascade side effects. Callers that must
    /// keep back-references consistent go through `service::cascade`.
    pub fn delete(&self, collection: Collection, id: &str) -> SyncResult<()> {
        self.commit(vec![WriteOp::Delete {
            collection,
            id: id.to_string(),
        }])
    }

    // ----- consumer subscriptions -----

    pub fn subscribe_students(
        &self,
        observer: impl Fn(&[Student]) + Send + Sync + 'static,
    ) -> Subscription {
        self.subscribe_collection(Collection::Students, observer)
    }

    pub fn subscribe_guardians(
        &self,
        observer: impl Fn(&[Guardian]) + Send + Sync + 'static,
    ) -> Subscription {
        self.subscribe_collection(Collection::Guardians, observer)
    }

    pub fn subscribe_courses(
        &self,
        observer: impl Fn(&[Course]) + Send + Sync + 'static,
    ) -> Subscription {
        self.subscribe_collection(Collection::Courses, observer)
    }

    pub fn subscribe_attendance(
        &self,
        observer: impl Fn(&[AttendanceEntry]) + Send + Sync + 'static,
    ) -> Subscription {
        self.subscribe_collection(Collection::Attendance, observer)
    }

    pub fn subscribe_payments(
        &self,
        observer: impl Fn(&[PaymentRecord]) + Send + Sync + 'static,
    ) -> Subscription {
        self.subscribe_collection(Collection::Payments, observer)
    }

    pub fn subscribe_admins(
        &self,
        observer: impl Fn(&[Admin]) + Send + Sync + 'static,
    ) -> Subscription {
        self.subscribe_collection(Collection::Admins, observer)
    }

    // ----- internals -----

    /// Plans a create operation for an entity carrying its own `id` field.
    /// An empty id gets a generated one; the body never embeds the id.
    pub(crate) fn create_op<T: HasId + Serialize>(
        &self,
        collection: Collection,
        entity: &T,
    ) -> SyncResult<(String, WriteOp)> {
        let id = if entity.id().is_empty() {
            new_doc_id()
        } else {
            entity.id().to_string()
        };
        let body = encode_body(collection, entity).map_err(|message| SyncError::Codec {
            collection,
            message,
        })?;
        let op = WriteOp::Create {
            collection,
            id: id.clone(),
            body,
        };
        Ok((id, op))
    }

    fn create_doc<T: HasId + Serialize>(
        &self,
        collection: Collection,
        entity: &T,
    ) -> SyncResult<String> {
        let (id, op) = self.create_op(collection, entity)?;
        self.commit(vec![op])?;
        Ok(id)
    }

    fn update_doc(
        &self,
        collection: Collection,
        id: &str,
        edits: Vec<FieldEdit>,
    ) -> SyncResult<()> {
        if edits.is_empty() {
            return Ok(());
        }
        self.commit(vec![WriteOp::Update {
            collection,
            id: id.to_string(),
            edits,
        }])
    }

    fn subscribe_collection<T>(
        &self,
        collection: Collection,
        observer: impl Fn(&[T]) + Send + Sync + 'static,
    ) -> Subscription
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        self.store.subscribe(
            collection,
            Box::new(move |documents| {
                let rows = decode_snapshot::<T>(collection, documents);
                observer(&rows);
            }),
        )
    }
}
