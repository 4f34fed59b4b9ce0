//! Tests for `src/recorder.rs` against the SQLite store.

use std::sync::Arc;
use std::time::Duration;

use sos_dispatch::recorder::Recorder;
use sos_dispatch::store::sqlite::SqliteStore;
use sos_dispatch::store::{
    RecordError, EMERGENCY_CONTACTS, LANGUAGE_DOCUMENT, PREFERENCES, SOS_HISTORY,
};
use sos_dispatch::types::{Contact, LocationFix, SosRecord};

async fn setup() -> (Arc<SqliteStore>, Recorder) {
    let store = Arc::new(
        SqliteStore::open_in_memory()
            .await
            .expect("store should open"),
    );
    let recorder = Recorder::new(store.clone());
    (store, recorder)
}

fn fix() -> LocationFix {
    LocationFix {
        latitude: 26.8467,
        longitude: 80.9462,
        accuracy_meters: 9.0,
        provider: "gps".to_owned(),
    }
}

#[tokio::test]
async fn record_writes_camel_case_fields() {
    let (store, recorder) = setup().await;
    let contact = Contact::new("+911000000002", "Ravi").with_email("ravi@example.com");
    let record = SosRecord::new(Some(&contact), &fix(), "Hindi");

    let id = recorder.record(&record).await.expect("record should store");

    let docs = store
        .list_documents(SOS_HISTORY, 10)
        .await
        .expect("list should succeed");
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].id, id);
    let fields = &docs[0].fields;
    assert_eq!(fields["userName"], "Ravi");
    assert_eq!(fields["phoneNumber"], "+911000000002");
    assert_eq!(fields["email"], "ravi@example.com");
    assert_eq!(fields["latitude"], 26.8467);
    assert_eq!(fields["longitude"], 80.9462);
    assert_eq!(fields["language"], "Hindi");
    assert!(fields["timestamp"].is_string());
}

#[tokio::test]
async fn background_record_completes_through_receipt() {
    let (store, recorder) = setup().await;
    let record = SosRecord::new(None, &fix(), "English");

    let receipt = recorder.record_in_background(record);
    let result = receipt
        .outcome_within(Duration::from_secs(5))
        .await
        .expect("write should finish in time");
    assert!(result.is_ok());

    let docs = store
        .list_documents(SOS_HISTORY, 10)
        .await
        .expect("list should succeed");
    assert_eq!(docs[0].fields["userName"], "Anonymous");
}

#[tokio::test]
async fn save_contact_stores_name_phone_email() {
    let (store, recorder) = setup().await;
    let contact = Contact::new("+911000000003", "Meena");

    recorder
        .save_contact(&contact)
        .await
        .expect("contact should store");

    let docs = store
        .list_documents(EMERGENCY_CONTACTS, 10)
        .await
        .expect("list should succeed");
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].fields["name"], "Meena");
    assert_eq!(docs[0].fields["phone"], "+911000000003");
    assert!(docs[0].fields["email"].is_null());
}

#[tokio::test]
async fn language_preference_is_overwritten() {
    let (store, recorder) = setup().await;
    recorder
        .save_language("English")
        .await
        .expect("language should store");
    recorder
        .save_language("Hindi")
        .await
        .expect("language should store");

    let doc = store
        .get_document(PREFERENCES, LANGUAGE_DOCUMENT)
        .await
        .expect("get should succeed")
        .expect("document should exist");
    assert_eq!(doc["selected_language"], "Hindi");
}

#[test]
fn offline_is_the_only_soft_error() {
    assert!(RecordError::Offline("network down".to_owned()).is_soft());
    assert!(!RecordError::Store("quota".to_owned()).is_soft());
}
