//! SQLite-backed document store.
//!
//! # Responsibility
//! - Persist documents of all six collections in one keyed table.
//! - Provide the all-or-nothing batch primitive via SQLite transactions.
//! - Push full replacement snapshots to subscribers after each commit.
//!
//! # Invariants
//! - The on-disk layout version is tracked via `PRAGMA user_version`;
//!   newer-than-supported layouts are rejected on open.
//! - Snapshots are pushed only after a successful commit, and only for
//!   collections touched by the batch.
//! - Snapshot order is deterministic: `doc_id ASC`.

use super::{
    Collection, Document, DocumentStore, FieldEdit, JsonMap, SnapshotObserver, StoreError,
    StoreResult, Subscription, WriteOp,
};
use log::{error, info};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

const LAYOUT_VERSION: u32 = 1;

const LAYOUT_SQL: &str = "CREATE TABLE IF NOT EXISTS documents (
    collection TEXT NOT NULL,
    doc_id     TEXT NOT NULL,
    body       TEXT NOT NULL,
    PRIMARY KEY (collection, doc_id)
);";

struct SubscriberEntry {
    collection: Collection,
    observer: Arc<SnapshotObserver>,
}

type SubscriberMap = BTreeMap<u64, SubscriberEntry>;

/// Document store over a SQLite file or in-memory database.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    subscribers: Arc<Mutex<SubscriberMap>>,
    next_subscriber: AtomicU64,
}

impl SqliteStore {
    /// Opens a file-backed store, creating the layout when missing.
    ///
    /// # Side effects
    /// - Emits `store_open` logging events with duration and status.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let started_at = Instant::now();
        info!("event=store_open module=store status=start mode=file");
        let result = Connection::open(path)
            .map_err(StoreError::from)
            .and_then(Self::from_connection);
        log_open_result("file", started_at, &result);
        result
    }

    /// Opens an in-memory store; used by tests and local smoke runs.
    pub fn open_in_memory() -> StoreResult<Self> {
        let started_at = Instant::now();
        info!("event=store_open module=store status=start mode=memory");
        let result = Connection::open_in_memory()
            .map_err(StoreError::from)
            .and_then(Self::from_connection);
        log_open_result("memory", started_at, &result);
        result
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        bootstrap_layout(&conn)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(Self {
            conn: Mutex::new(conn),
            subscribers: Arc::new(Mutex::new(BTreeMap::new())),
            next_subscriber: AtomicU64::new(1),
        })
    }

    fn lock_conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn observers_for(&self, collection: Collection) -> Vec<Arc<SnapshotObserver>> {
        let subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers
            .values()
            .filter(|entry| entry.collection == collection)
            .map(|entry| Arc::clone(&entry.observer))
            .collect()
    }
}

impl DocumentStore for SqliteStore {
    fn snapshot(&self, collection: Collection) -> StoreResult<Vec<Document>> {
        let conn = self.lock_conn();
        read_snapshot(&conn, collection)
    }

    fn apply(&self, ops: Vec<WriteOp>) -> StoreResult<()> {
        if ops.is_empty() {
            return Ok(());
        }
        let started_at = Instant::now();
        let op_count = ops.len();

        let mut touched: Vec<Collection> = ops.iter().map(WriteOp::collection).collect();
        touched.sort();
        touched.dedup();

        let snapshots = {
            let mut conn = self.lock_conn();
            let tx = conn.transaction()?;
            let applied = ops.iter().try_for_each(|op| apply_op(&tx, op));
            if let Err(err) = applied {
                // Dropping the transaction rolls every op back.
                error!(
                    "event=batch_commit module=store status=error ops={} duration_ms={} error={}",
                    op_count,
                    started_at.elapsed().as_millis(),
                    err
                );
                return Err(err);
            }

            let mut snapshots = Vec::with_capacity(touched.len());
            for collection in &touched {
                snapshots.push((*collection, read_snapshot(&tx, *collection)?));
            }
            tx.commit()?;
            snapshots
        };

        info!(
            "event=batch_commit module=store status=ok ops={} collections={} duration_ms={}",
            op_count,
            touched.len(),
            started_at.elapsed().as_millis()
        );

        // Observers run outside the connection lock so a slow consumer
        // cannot stall the writer.
        for (collection, documents) in snapshots {
            for observer in self.observers_for(collection) {
                observer(&documents);
            }
        }
        Ok(())
    }

    fn subscribe(&self, collection: Collection, observer: SnapshotObserver) -> Subscription {
        let id = self.next_subscriber.fetch_add(1, Ordering::Relaxed);
        {
            let mut subscribers = self
                .subscribers
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            subscribers.insert(
                id,
                SubscriberEntry {
                    collection,
                    observer: Arc::new(observer),
                },
            );
        }

        let registry = Arc::downgrade(&self.subscribers);
        Subscription::new(move || {
            if let Some(subscribers) = registry.upgrade() {
                subscribers
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(&id);
            }
        })
    }
}

fn log_open_result(mode: &str, started_at: Instant, result: &StoreResult<SqliteStore>) {
    match result {
        Ok(_) => info!(
            "event=store_open module=store status=ok mode={mode} duration_ms={}",
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=store_open module=store status=error mode={mode} duration_ms={} error={}",
            started_at.elapsed().as_millis(),
            err
        ),
    }
}

fn bootstrap_layout(conn: &Connection) -> StoreResult<()> {
    let found: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if found > LAYOUT_VERSION {
        return Err(StoreError::UnsupportedLayoutVersion {
            found,
            latest_supported: LAYOUT_VERSION,
        });
    }
    conn.execute_batch(LAYOUT_SQL)?;
    conn.execute_batch(&format!("PRAGMA user_version = {LAYOUT_VERSION};"))?;
    Ok(())
}

fn read_snapshot(conn: &Connection, collection: Collection) -> StoreResult<Vec<Document>> {
    let mut stmt = conn.prepare(
        "SELECT doc_id, body FROM documents WHERE collection = ?1 ORDER BY doc_id ASC;",
    )?;
    let mut rows = stmt.query(params![collection.as_str()])?;

    let mut documents = Vec::new();
    while let Some(row) = rows.next()? {
        let id: String = row.get(0)?;
        let body: String = row.get(1)?;
        documents.push(Document {
            fields: parse_body(collection, &id, &body)?,
            id,
        });
    }
    Ok(documents)
}

fn apply_op(conn: &Connection, op: &WriteOp) -> StoreResult<()> {
    match op {
        WriteOp::Create {
            collection,
            id,
            body,
        } => {
            if load_body(conn, *collection, id)?.is_some() {
                return Err(StoreError::DuplicateDocument {
                    collection: *collection,
                    id: id.clone(),
                });
            }
            conn.execute(
                "INSERT INTO documents (collection, doc_id, body) VALUES (?1, ?2, ?3);",
                params![
                    collection.as_str(),
                    id,
                    Value::Object(body.clone()).to_string()
                ],
            )?;
            Ok(())
        }
        WriteOp::Update {
            collection,
            id,
            edits,
        } => {
            let mut body = load_body(conn, *collection, id)?.ok_or_else(|| {
                StoreError::DocumentNotFound {
                    collection: *collection,
                    id: id.clone(),
                }
            })?;
            apply_edits(*collection, id, &mut body, edits)?;
            conn.execute(
                "UPDATE documents SET body = ?3 WHERE collection = ?1 AND doc_id = ?2;",
                params![
                    collection.as_str(),
                    id,
                    Value::Object(body).to_string()
                ],
            )?;
            Ok(())
        }
        WriteOp::Delete { collection, id } => {
            let deleted = conn.execute(
                "DELETE FROM documents WHERE collection = ?1 AND doc_id = ?2;",
                params![collection.as_str(), id],
            )?;
            if deleted == 0 {
                return Err(StoreError::DocumentNotFound {
                    collection: *collection,
                    id: id.clone(),
                });
            }
            Ok(())
        }
    }
}

fn load_body(conn: &Connection, collection: Collection, id: &str) -> StoreResult<Option<JsonMap>> {
    let body: Option<String> = conn
        .query_row(
            "SELECT body FROM documents WHERE collection = ?1 AND doc_id = ?2;",
            params![collection.as_str(), id],
            |row| row.get(0),
        )
        .optional()?;
    match body {
        Some(body) => Ok(Some(parse_body(collection, id, &body)?)),
        None => Ok(None),
    }
}

fn parse_body(collection: Collection, id: &str, body: &str) -> StoreResult<JsonMap> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(StoreError::InvalidDocument {
            collection,
            id: id.to_string(),
            message: "body is not a JSON object".to_string(),
        }),
        Err(err) => Err(StoreError::InvalidDocument {
            collection,
            id: id.to_string(),
            message: err.to_string(),
        }),
    }
}

/// Applies edits to the in-transaction body state. List edits therefore see
/// whatever a concurrent committed batch left behind, never a caller-side
/// stale copy.
fn apply_edits(
    collection: Collection,
    id: &str,
    body: &mut JsonMap,
    edits: &[FieldEdit],
) -> StoreResult<()> {
    for edit in edits {
        match edit {
            FieldEdit::Set { field, value } => {
                body.insert(field.clone(), value.clone());
            }
            FieldEdit::Clear { field } => {
                body.remove(field);
            }
            FieldEdit::AppendUnique { field, value } => {
                match body
                    .entry(field.clone())
                    .or_insert_with(|| Value::Array(Vec::new()))
                {
                    Value::Array(items) => {
                        if !items.contains(value) {
                            items.push(value.clone());
                        }
                    }
                    _ => {
                        return Err(StoreError::FieldNotList {
                            collection,
                            id: id.to_string(),
                            field: field.clone(),
                        });
                    }
                }
            }
            FieldEdit::RemoveValue { field, value } => match body.get_mut(field) {
                Some(Value::Array(items)) => {
                    items.retain(|item| item != value);
                }
                Some(_) => {
                    return Err(StoreError::FieldNotList {
                        collection,
                        id: id.to_string(),
                        field: field.clone(),
                    });
                }
                // Absent list behaves like an empty one.
                None => {}
            },
        }
    }
    Ok(())
}
