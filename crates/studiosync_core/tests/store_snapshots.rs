use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use studiosync_core::store::{FieldEdit, WriteOp};
use studiosync_core::{Collection, DocumentStore, SqliteStore, StoreError};

fn body(entries: &[(&str, Value)]) -> serde_json::Map<String, Value> {
    entries
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}

fn create(collection: Collection, id: &str, fields: &[(&str, Value)]) -> WriteOp {
    WriteOp::Create {
        collection,
        id: id.to_string(),
        body: body(fields),
    }
}

#[test]
fn snapshot_returns_all_documents_in_id_order() {
    let store = SqliteStore::open_in_memory().unwrap();
    store
        .apply(vec![
            create(Collection::Students, "s2", &[("firstName", json!("Mio"))]),
            create(Collection::Students, "s1", &[("firstName", json!("Hana"))]),
        ])
        .unwrap();

    let docs = store.snapshot(Collection::Students).unwrap();
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0].id, "s1");
    assert_eq!(docs[1].id, "s2");
    assert_eq!(docs[0].fields["firstName"], json!("Hana"));
}

#[test]
fn failed_batch_rolls_back_every_operation() {
    let store = SqliteStore::open_in_memory().unwrap();
    store
        .apply(vec![create(
            Collection::Guardians,
            "g1",
            &[("name", json!("Sato"))],
        )])
        .unwrap();

    let err = store
        .apply(vec![
            create(Collection::Students, "s1", &[("firstName", json!("Hana"))]),
            WriteOp::Update {
                collection: Collection::Guardians,
                id: "missing".to_string(),
                edits: vec![FieldEdit::set("name", json!("Kato"))],
            },
        ])
        .unwrap_err();
    assert!(matches!(err, StoreError::DocumentNotFound { .. }));

    // The create in the same batch must not survive.
    assert!(store.snapshot(Collection::Students).unwrap().is_empty());
    let guardians = store.snapshot(Collection::Guardians).unwrap();
    assert_eq!(guardians[0].fields["name"], json!("Sato"));
}

#[test]
fn duplicate_create_is_rejected() {
    let store = SqliteStore::open_in_memory().unwrap();
    store
        .apply(vec![create(Collection::Courses, "c1", &[])])
        .unwrap();

    let err = store
        .apply(vec![create(Collection::Courses, "c1", &[])])
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::DuplicateDocument { id, .. } if id == "c1"
    ));
}

#[test]
fn subscribers_receive_full_replacement_snapshots_after_commit() {
    let store = SqliteStore::open_in_memory().unwrap();
    let received: Arc<Mutex<Vec<Vec<String>>>> = Arc::new(Mutex::new(Vec::new()));

    let sink = Arc::clone(&received);
    let _subscription = store.subscribe(
        Collection::Students,
        Box::new(move |documents| {
            let ids = documents.iter().map(|doc| doc.id.clone()).collect();
            sink.lock().unwrap().push(ids);
        }),
    );

    store
        .apply(vec![create(Collection::Students, "s1", &[])])
        .unwrap();
    store
        .apply(vec![create(Collection::Students, "s2", &[])])
        .unwrap();

    let pushes = received.lock().unwrap();
    // Each push carries the complete member set, not a diff.
    assert_eq!(pushes.len(), 2);
    assert_eq!(pushes[0], vec!["s1".to_string()]);
    assert_eq!(pushes[1], vec!["s1".to_string(), "s2".to_string()]);
}

#[test]
fn only_touched_collections_are_pushed() {
    let store = SqliteStore::open_in_memory().unwrap();
    let guardian_pushes = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&guardian_pushes);
    let _subscription = store.subscribe(
        Collection::Guardians,
        Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }),
    );

    store
        .apply(vec![create(Collection::Students, "s1", &[])])
        .unwrap();
    assert_eq!(guardian_pushes.load(Ordering::SeqCst), 0);

    store
        .apply(vec![create(Collection::Guardians, "g1", &[])])
        .unwrap();
    assert_eq!(guardian_pushes.load(Ordering::SeqCst), 1);
}

#[test]
fn no_push_happens_for_a_failed_batch() {
    let store = SqliteStore::open_in_memory().unwrap();
    let pushes = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&pushes);
    let _subscription = store.subscribe(
        Collection::Students,
        Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }),
    );

    let err = store.apply(vec![
        create(Collection::Students, "s1", &[]),
        WriteOp::Delete {
            collection: Collection::Students,
            id: "missing".to_string(),
        },
    ]);
    assert!(err.is_err());
    assert_eq!(pushes.load(Ordering::SeqCst), 0);
}

#[test]
fn dropping_the_subscription_stops_delivery() {
    let store = SqliteStore::open_in_memory().unwrap();
    let pushes = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&pushes);
    let subscription = store.subscribe(
        Collection::Students,
        Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }),
    );

    store
        .apply(vec![create(Collection::Students, "s1", &[])])
        .unwrap();
    assert_eq!(pushes.load(Ordering::SeqCst), 1);

    drop(subscription);
    store
        .apply(vec![create(Collection::Students, "s2", &[])])
        .unwrap();
    assert_eq!(pushes.load(Ordering::SeqCst), 1);
}

#[test]
fn empty_batch_is_a_noop() {
    let store = SqliteStore::open_in_memory().unwrap();
    let pushes = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&pushes);
    let _subscription = store.subscribe(
        Collection::Students,
        Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }),
    );

    store.apply(Vec::new()).unwrap();
    assert_eq!(pushes.load(Ordering::SeqCst), 0);
}

#[test]
fn list_edits_are_evaluated_against_stored_state() {
    let store = SqliteStore::open_in_memory().unwrap();
    store
        .apply(vec![create(
            Collection::Guardians,
            "g1",
            &[("studentIds", json!(["s1"]))],
        )])
        .unwrap();

    store
        .apply(vec![WriteOp::Update {
            collection: Collection::Guardians,
            id: "g1".to_string(),
            edits: vec![
                FieldEdit::append_unique("studentIds", json!("s2")),
                FieldEdit::append_unique("studentIds", json!("s1")),
                FieldEdit::remove_value("studentIds", json!("s1")),
            ],
        }])
        .unwrap();

    let docs = store.snapshot(Collection::Guardians).unwrap();
    assert_eq!(docs[0].fields["studentIds"], json!(["s2"]));
}

#[test]
fn file_backed_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("studio.db");

    {
        let store = SqliteStore::open(&path).unwrap();
        store
            .apply(vec![create(
                Collection::Students,
                "s1",
                &[("firstName", json!("Hana"))],
            )])
            .unwrap();
    }

    let reopened = SqliteStore::open(&path).unwrap();
    let docs = reopened.snapshot(Collection::Students).unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].fields["firstName"], json!("Hana"));
}
