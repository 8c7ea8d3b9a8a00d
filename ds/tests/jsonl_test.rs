//! Integration tests for the JSONL store: persistence across reopen, locking, compaction

use std::fs;
use std::io::Write;

use docstore::{DocumentStore, Filter, JsonlStore, StoreError};
use serde_json::json;
use tempfile::TempDir;

#[tokio::test]
async fn test_documents_survive_reopen() {
    let temp = TempDir::new().expect("Failed to create temp dir");

    {
        let store = JsonlStore::open(temp.path()).unwrap();
        store
            .create_document("plant_instances", json!({"id": "p1", "water_level": 50}))
            .await
            .unwrap();
        store
            .update_document("plant_instances", "p1", json!({"water_level": 70}))
            .await
            .unwrap();
        store
            .create_document("plant_instances", json!({"id": "p2", "water_level": 10}))
            .await
            .unwrap();
        store.delete_document("plant_instances", "p2").await.unwrap();
    }

    let store = JsonlStore::open(temp.path()).unwrap();
    let p1 = store.get_document("plant_instances", "p1").await.unwrap().unwrap();
    assert_eq!(p1["water_level"], 70);
    assert!(store.get_document("plant_instances", "p2").await.unwrap().is_none());
}

#[tokio::test]
async fn test_second_open_is_locked() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let _first = JsonlStore::open(temp.path()).unwrap();

    let second = JsonlStore::open(temp.path());
    assert!(matches!(second, Err(StoreError::Locked(_))));
}

#[tokio::test]
async fn test_corrupt_lines_are_skipped() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    {
        let mut file = fs::File::create(temp.path().join("task_instances.jsonl")).unwrap();
        writeln!(file, r#"{{"op":"put","doc":{{"id":"t1","user_id":"alice"}}}}"#).unwrap();
        writeln!(file, "not json at all").unwrap();
        writeln!(file, r#"{{"op":"put","doc":{{"id":"t2","user_id":"bob"}}}}"#).unwrap();
    }

    let store = JsonlStore::open(temp.path()).unwrap();
    let all = store.list_documents("task_instances", &[]).await.unwrap();
    assert_eq!(all.len(), 2);

    let alice = store
        .list_documents("task_instances", &[Filter::eq("user_id", "alice")])
        .await
        .unwrap();
    assert_eq!(alice.len(), 1);
}

#[tokio::test]
async fn test_compact_keeps_only_live_documents() {
    let temp = TempDir::new().expect("Failed to create temp dir");

    {
        let store = JsonlStore::open(temp.path()).unwrap();
        for level in 0..5 {
            store
                .create_document("plant_instances", json!({"id": "p1", "water_level": level}))
                .await
                .unwrap();
        }
        store
            .create_document("plant_instances", json!({"id": "gone"}))
            .await
            .unwrap();
        store.delete_document("plant_instances", "gone").await.unwrap();

        let written = store.compact().unwrap();
        assert_eq!(written, 1);
    }

    let log = fs::read_to_string(temp.path().join("plant_instances.jsonl")).unwrap();
    assert_eq!(log.lines().count(), 1);

    let store = JsonlStore::open(temp.path()).unwrap();
    let p1 = store.get_document("plant_instances", "p1").await.unwrap().unwrap();
    assert_eq!(p1["water_level"], 4);
}

#[tokio::test]
async fn test_update_missing_document_writes_nothing() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let store = JsonlStore::open(temp.path()).unwrap();

    let err = store
        .update_document("plant_instances", "missing", json!({"water_level": 1}))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(!temp.path().join("plant_instances.jsonl").exists());
}
