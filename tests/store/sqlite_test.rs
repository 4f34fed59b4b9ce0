//! Tests for `src/store/sqlite.rs`.

use serde_json::json;

use sos_dispatch::store::sqlite::SqliteStore;
use sos_dispatch::store::{DocumentStore, Fields, SOS_HISTORY};

fn fields(value: serde_json::Value) -> Fields {
    match value {
        serde_json::Value::Object(map) => map,
        _ => panic!("test fields must be an object"),
    }
}

#[tokio::test]
async fn appended_documents_list_in_insertion_order() {
    let store = SqliteStore::open_in_memory()
        .await
        .expect("store should open");

    let first = store
        .append_document(SOS_HISTORY, fields(json!({"n": 1})))
        .await
        .expect("append should succeed");
    let second = store
        .append_document(SOS_HISTORY, fields(json!({"n": 2})))
        .await
        .expect("append should succeed");
    assert_ne!(first, second);

    let docs = store
        .list_documents(SOS_HISTORY, 10)
        .await
        .expect("list should succeed");
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0].id, first);
    assert_eq!(docs[0].fields["n"], 1);
    assert_eq!(docs[1].fields["n"], 2);
    assert!(!docs[0].created_at.is_empty());
}

#[tokio::test]
async fn list_limit_keeps_newest() {
    let store = SqliteStore::open_in_memory()
        .await
        .expect("store should open");
    for n in 0..5 {
        store
            .append_document(SOS_HISTORY, fields(json!({ "n": n })))
            .await
            .expect("append should succeed");
    }

    let docs = store
        .list_documents(SOS_HISTORY, 2)
        .await
        .expect("list should succeed");
    let ns: Vec<_> = docs.iter().map(|d| d.fields["n"].clone()).collect();
    assert_eq!(ns, vec![json!(3), json!(4)]);
}

#[tokio::test]
async fn collections_are_isolated() {
    let store = SqliteStore::open_in_memory()
        .await
        .expect("store should open");
    store
        .append_document("emergency_contacts", fields(json!({"name": "Ravi"})))
        .await
        .expect("append should succeed");

    let docs = store
        .list_documents(SOS_HISTORY, 10)
        .await
        .expect("list should succeed");
    assert!(docs.is_empty());
}

#[tokio::test]
async fn set_document_is_last_write_wins() {
    let store = SqliteStore::open_in_memory()
        .await
        .expect("store should open");
    store
        .set_document("preferences", "language", fields(json!({"selected_language": "English"})))
        .await
        .expect("set should succeed");
    store
        .set_document("preferences", "language", fields(json!({"selected_language": "Hindi"})))
        .await
        .expect("set should succeed");

    let doc = store
        .get_document("preferences", "language")
        .await
        .expect("get should succeed")
        .expect("document should exist");
    assert_eq!(doc["selected_language"], "Hindi");
    assert_eq!(
        store
            .list_documents("preferences", 10)
            .await
            .expect("list should succeed")
            .len(),
        1
    );
}

#[tokio::test]
async fn on_disk_store_survives_reopen() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let path = tmp.path().join("nested").join("sos.db");

    {
        let store = SqliteStore::open(&path).await.expect("store should open");
        store
            .append_document(SOS_HISTORY, fields(json!({"userName": "Ravi"})))
            .await
            .expect("append should succeed");
    }

    let reopened = SqliteStore::open(&path).await.expect("store should reopen");
    let docs = reopened
        .list_documents(SOS_HISTORY, 10)
        .await
        .expect("list should succeed");
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].fields["userName"], "Ravi");
}
