// Integration tests for DocumentStore against the in-memory document service

use anyhow::Result;
use cloudutils::cloud::{DocumentIO, ErrorKind, FakeDocumentIO, JsonMap};
use cloudutils::document::{DATE_INPUT, WRITE_DATE};
use cloudutils::{DocumentStore, UpsertOutcome};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

const COLLECTION: &str = "customers";

fn map(value: Value) -> JsonMap {
    value.as_object().cloned().expect("test payload must be an object")
}

fn store() -> (FakeDocumentIO, DocumentStore) {
    let io = FakeDocumentIO::new();
    let store = DocumentStore::new(Arc::new(io.clone()));
    (io, store)
}

#[test]
fn test_upsert_creates_whitelisted_document() -> Result<()> {
    let (io, store) = store();
    let message = map(json!({"country": "FR", "id": "a/1", "name": "Ada", "password": "x"}));

    let outcome = store.upsert(&message, COLLECTION, &["country", "id"], &["country", "id", "name"])?;
    assert_eq!(outcome, UpsertOutcome::Created);

    let doc = store
        .select_by_id(COLLECTION, "FR_a|1")?
        .expect("document stored under the derived id");
    assert_eq!(doc["name"], "Ada");
    assert!(!doc.contains_key("password"));
    assert_eq!(doc[WRITE_DATE], doc[DATE_INPUT]);
    assert_eq!(io.document_count(COLLECTION), 1);
    Ok(())
}

#[test]
fn test_upsert_merge_keeps_date_input() -> Result<()> {
    let (io, store) = store();
    let whitelist = ["id", "status", "score"];

    store.upsert(&map(json!({"id": 7, "status": "new", "score": 1})), COLLECTION, &["id"], &whitelist)?;
    let first = store.select_by_id(COLLECTION, "7")?.expect("created");

    std::thread::sleep(Duration::from_millis(5));
    let outcome = store.upsert(&map(json!({"id": 7, "status": "active"})), COLLECTION, &["id"], &whitelist)?;
    assert_eq!(outcome, UpsertOutcome::Merged);

    let merged = store.select_by_id(COLLECTION, "7")?.expect("merged");
    assert_eq!(merged["status"], "active");
    assert_eq!(merged["score"], 1);
    assert_eq!(merged[DATE_INPUT], first[DATE_INPUT]);
    assert!(merged[WRITE_DATE].as_str() > first[WRITE_DATE].as_str());
    assert_eq!(io.document_count(COLLECTION), 1);
    Ok(())
}

#[test]
fn test_upsert_without_date_input() -> Result<()> {
    let (_, store) = store();
    let store = store.without_date_input();
    store.upsert(&map(json!({"id": "k"})), COLLECTION, &["id"], &["id"])?;

    let doc = store.select_by_id(COLLECTION, "k")?.expect("created");
    assert!(doc.contains_key(WRITE_DATE));
    assert!(!doc.contains_key(DATE_INPUT));
    Ok(())
}

#[test]
fn test_upsert_key_outside_whitelist_is_rejected() {
    let (io, store) = store();
    let err = store
        .upsert(&map(json!({"id": "k", "name": "n"})), COLLECTION, &["id"], &["name"])
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidInput);
    assert_eq!(io.document_count(COLLECTION), 0);
}

#[test]
fn test_upsert_propagates_store_failure() {
    let (io, store) = store();
    io.fail_next_writes([ErrorKind::PermissionDenied]);

    let err = store
        .upsert(&map(json!({"id": "k"})), COLLECTION, &["id"], &["id"])
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::PermissionDenied);
    assert_eq!(io.document_count(COLLECTION), 0);
}

#[test]
fn test_select_docs_filters_by_equality() -> Result<()> {
    let (io, store) = store();
    io.create(COLLECTION, "1", map(json!({"city": "Lyon", "tier": 1})))?;
    io.create(COLLECTION, "2", map(json!({"city": "Nice", "tier": 1})))?;
    io.create(COLLECTION, "3", map(json!({"city": "Lyon", "tier": 2})))?;

    let lyon = store.select_docs(COLLECTION, &map(json!({"city": "Lyon"})))?;
    assert_eq!(lyon.len(), 2);

    let exact = store.select_docs(COLLECTION, &map(json!({"city": "Lyon", "tier": 2})))?;
    assert_eq!(exact, vec![map(json!({"city": "Lyon", "tier": 2}))]);

    assert!(store.select_docs("unknown", &JsonMap::new())?.is_empty());
    Ok(())
}

#[test]
fn test_select_by_id_missing_is_none() -> Result<()> {
    let (_, store) = store();
    assert!(store.select_by_id(COLLECTION, "nope")?.is_none());
    Ok(())
}
