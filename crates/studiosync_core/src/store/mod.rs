//! Document store boundary: write operations, snapshots, subscriptions.
//!
//! # Responsibility
//! - Define the `DocumentStore` contract the sync layer is built on.
//! - Define the heterogeneous batch operations and their field edits.
//!
//! # Invariants
//! - `apply` is all-or-nothing: a rejected operation rolls back the whole
//!   batch and no snapshot is pushed.
//! - Every snapshot delivered to a subscriber is the complete authoritative
//!   member set of that collection, never a diff.
//! - List edits (`AppendUnique`/`RemoveValue`) are evaluated against the
//!   in-transaction document state, not a caller-side copy.

use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod sqlite;

pub use sqlite::SqliteStore;

/// JSON object holding a document's body fields.
pub type JsonMap = serde_json::Map<String, Value>;

/// Stable key of a document within its collection.
pub type DocumentId = String;

pub type StoreResult<T> = Result<T, StoreError>;

/// The six synchronized collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Collection {
    Students,
    Guardians,
    Courses,
    Attendance,
    Payments,
    Admins,
}

impl Collection {
    pub const ALL: [Collection; 6] = [
        Collection::Students,
        Collection::Guardians,
        Collection::Courses,
        Collection::Attendance,
        Collection::Payments,
        Collection::Admins,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Students => "students",
            Self::Guardians => "guardians",
            Self::Courses => "courses",
            Self::Attendance => "attendance",
            Self::Payments => "payments",
            Self::Admins => "admins",
        }
    }
}

impl Display for Collection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One stored document: id plus body fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    pub fields: JsonMap,
}

/// Single-field change applied inside an update operation.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldEdit {
    /// Replaces the field value (creates the field when absent).
    Set { field: String, value: Value },
    /// Removes the field from the document.
    Clear { field: String },
    /// Appends to a list field unless the value is already present.
    /// Evaluated against the in-transaction list state.
    AppendUnique { field: String, value: Value },
    /// Removes every occurrence of the value from a list field.
    /// Evaluated against the in-transaction list state.
    RemoveValue { field: String, value: Value },
}

impl FieldEdit {
    pub fn set(field: impl Into<String>, value: Value) -> Self {
        Self::Set {
            field: field.into(),
            value,
        }
    }

    pub fn clear(field: impl Into<String>) -> Self {
        Self::Clear {
            field: field.into(),
        }
    }

    pub fn append_unique(field: impl Into<String>, value: Value) -> Self {
        Self::AppendUnique {
            field: field.into(),
            value,
        }
    }

    pub fn remove_value(field: impl Into<String>, value: Value) -> Self {
        Self::RemoveValue {
            field: field.into(),
            value,
        }
    }
}

/// One operation inside an atomic batch.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Create {
        collection: Collection,
        id: DocumentId,
        body: JsonMap,
    },
    Update {
        collection: Collection,
        id: DocumentId,
        edits: Vec<FieldEdit>,
    },
    Delete {
        collection: Collection,
        id: DocumentId,
    },
}

impl WriteOp {
    pub fn collection(&self) -> Collection {
        match self {
            Self::Create { collection, .. }
            | Self::Update { collection, .. }
            | Self::Delete { collection, .. } => *collection,
        }
    }
}

/// Store-layer failure, propagated unmodified and never retried.
#[derive(Debug)]
pub enum StoreError {
    /// Failure in the backing engine (connection, transaction, I/O).
    Backend(rusqlite::Error),
    /// Update or delete targeted a document that does not exist.
    DocumentNotFound {
        collection: Collection,
        id: DocumentId,
    },
    /// Create targeted an id that already exists.
    DuplicateDocument {
        collection: Collection,
        id: DocumentId,
    },
    /// Persisted body is not a JSON object or cannot be parsed.
    InvalidDocument {
        collection: Collection,
        id: DocumentId,
        message: String,
    },
    /// A list edit targeted a field that holds a non-list value.
    FieldNotList {
        collection: Collection,
        id: DocumentId,
        field: String,
    },
    /// The on-disk layout was written by a newer build.
    UnsupportedLayoutVersion {
        found: u32,
        latest_supported: u32,
    },
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Backend(err) => write!(f, "{err}"),
            Self::DocumentNotFound { collection, id } => {
                write!(f, "document not found: {collection}/{id}")
            }
            Self::DuplicateDocument { collection, id } => {
                write!(f, "document already exists: {collection}/{id}")
            }
            Self::InvalidDocument {
                collection,
                id,
                message,
            } => write!(f, "invalid document {collection}/{id}: {message}"),
            Self::FieldNotList {
                collection,
                id,
                field,
            } => write!(
                f,
                "field `{field}` of {collection}/{id} does not hold a list"
            ),
            Self::UnsupportedLayoutVersion {
                found,
                latest_supported,
            } => write!(
                f,
                "store layout version {found} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Backend(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Backend(value)
    }
}

/// Callback receiving the full replacement snapshot of one collection.
pub type SnapshotObserver = Box<dyn Fn(&[Document]) + Send + Sync>;

/// Owned subscription handle; dropping it unsubscribes deterministically.
///
/// There are no ambient global listeners: whoever holds the handle owns the
/// delivery, and teardown is scoped to the holder's lifetime.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

/// Multi-collection document store with push-based snapshot delivery.
///
/// The bundled implementation is [`SqliteStore`]; the trait is the seam a
/// remote-backed adapter would plug into.
pub trait DocumentStore: Send + Sync {
    /// Reads the current full member set of one collection.
    fn snapshot(&self, collection: Collection) -> StoreResult<Vec<Document>>;

    /// Commits a heterogeneous batch as a single all-or-nothing unit, then
    /// pushes fresh snapshots of every touched collection to subscribers.
    fn apply(&self, ops: Vec<WriteOp>) -> StoreResult<()>;

    /// Registers an observer for one collection's replacement snapshots.
    fn subscribe(&self, collection: Collection, observer: SnapshotObserver) -> Subscription;
}
