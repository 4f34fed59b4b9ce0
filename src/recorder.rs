//! Audit recording with connectivity-aware failure classification.
//!
//! Writes are fire-and-forget from the engine's point of view:
//! [`Recorder::record_in_background`] returns a [`RecordReceipt`] immediately
//! and the eventual store result arrives over a completion channel.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::store::{
    classify_failure, DocumentStore, Fields, RecordError, EMERGENCY_CONTACTS, LANGUAGE_DOCUMENT,
    PREFERENCES, SOS_HISTORY,
};
use crate::types::{Contact, SosRecord};

/// Persists SOS records, contacts, and the language preference.
#[derive(Clone)]
pub struct Recorder {
    store: Arc<dyn DocumentStore>,
}

impl std::fmt::Debug for Recorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recorder")
            .field("store", &self.store.name())
            .finish()
    }
}

fn into_fields(value: Value) -> Fields {
    match value {
        Value::Object(map) => map,
        _ => Fields::new(),
    }
}

impl Recorder {
    /// Create a recorder over a store handle.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Append one record to `sos_history`, returning the document id.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Offline`] for connectivity failures and
    /// [`RecordError::Store`] for everything else.
    pub async fn record(&self, record: &SosRecord) -> Result<String, RecordError> {
        let fields = serde_json::to_value(record)
            .map(into_fields)
            .map_err(|e| RecordError::Store(format!("failed to encode record: {e}")))?;
        match self.store.append_document(SOS_HISTORY, fields).await {
            Ok(id) => {
                info!(store = self.store.name(), id = %id, "sos record stored");
                Ok(id)
            }
            Err(failure) => {
                let err = classify_failure(&failure);
                if err.is_soft() {
                    warn!(error = %failure, "store offline, sos record will sync later");
                } else {
                    warn!(error = %failure, "sos record write failed");
                }
                Err(err)
            }
        }
    }

    /// Start writing `record` without waiting for acknowledgment.
    pub fn record_in_background(&self, record: SosRecord) -> RecordReceipt {
        let (tx, rx) = oneshot::channel();
        let recorder = self.clone();
        tokio::spawn(async move {
            let result = recorder.record(&record).await;
            if tx.send(result).is_err() {
                debug!("record receipt dropped before completion");
            }
        });
        RecordReceipt { rx }
    }

    /// Store a picked contact in `emergency_contacts`.
    ///
    /// # Errors
    ///
    /// Returns a classified [`RecordError`] on failure.
    pub async fn save_contact(&self, contact: &Contact) -> Result<String, RecordError> {
        let fields = into_fields(json!({
            "name": contact.display_name,
            "phone": contact.phone_number,
            "email": contact.email,
        }));
        self.store
            .append_document(EMERGENCY_CONTACTS, fields)
            .await
            .map_err(|f| classify_failure(&f))
    }

    /// Persist the selected UI language. Last write wins.
    ///
    /// # Errors
    ///
    /// Returns a classified [`RecordError`] on failure.
    pub async fn save_language(&self, language: &str) -> Result<(), RecordError> {
        let fields = into_fields(json!({ "selected_language": language }));
        self.store
            .set_document(PREFERENCES, LANGUAGE_DOCUMENT, fields)
            .await
            .map_err(|f| classify_failure(&f))
    }
}

/// Completion handle for a background record write.
#[derive(Debug)]
pub struct RecordReceipt {
    rx: oneshot::Receiver<Result<String, RecordError>>,
}

impl RecordReceipt {
    /// Wait for the write to finish.
    ///
    /// # Errors
    ///
    /// Returns the classified store error, or [`RecordError::Store`] if the
    /// write task ended without reporting.
    pub async fn outcome(self) -> Result<String, RecordError> {
        self.rx
            .await
            .unwrap_or_else(|_| Err(RecordError::Store("record task ended early".to_owned())))
    }

    /// Wait at most `timeout`.
    ///
    /// # Errors
    ///
    /// Hands the receipt back as `Err` while the write is still in flight, so
    /// the caller can keep waiting on it with [`RecordReceipt::outcome`].
    pub async fn outcome_within(
        mut self,
        timeout: Duration,
    ) -> Result<Result<String, RecordError>, Self> {
        match tokio::time::timeout(timeout, &mut self.rx).await {
            Ok(received) => Ok(received.unwrap_or_else(|_| {
                Err(RecordError::Store("record task ended early".to_owned()))
            })),
            Err(_) => Err(self),
        }
    }
}
