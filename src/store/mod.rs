//! Remote document store boundary and failure classification.
//!
//! The store is append-oriented and externally synchronized: implementations
//! need no local locking. Two backends are provided:
//! - [`sqlite::SqliteStore`]: local SQLite file, also used for history
//! - [`rest::RestStore`]: JSON-over-HTTP document service

pub mod rest;
pub mod sqlite;

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::{Map, Value};

/// Collection holding one [`SosRecord`](crate::types::SosRecord) per dispatch.
pub const SOS_HISTORY: &str = "sos_history";

/// Collection holding contacts picked by the user.
pub const EMERGENCY_CONTACTS: &str = "emergency_contacts";

/// Collection holding single-document preferences.
pub const PREFERENCES: &str = "preferences";

/// Document id of the language preference inside [`PREFERENCES`].
pub const LANGUAGE_DOCUMENT: &str = "language";

/// Document field map.
pub type Fields = Map<String, Value>;

/// A raw failure reported by a store backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct StoreFailure {
    /// Backend-specific error code, if any.
    pub code: Option<String>,
    /// Backend error text.
    pub message: String,
}

impl StoreFailure {
    /// A failure with only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    /// A failure with a code and message.
    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }
}

/// Classified outcome of a failed store write.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    /// Connectivity problem; the write is expected to sync later.
    #[error("store offline: {0}")]
    Offline(String),

    /// Any other store error.
    #[error("store error: {0}")]
    Store(String),
}

impl RecordError {
    /// Whether this failure is soft (user is told it will sync later).
    pub fn is_soft(&self) -> bool {
        matches!(self, Self::Offline(_))
    }
}

fn connectivity_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?i)offline|network").ok())
        .as_ref()
}

/// Classify a store failure by its text or code.
///
/// Anything mentioning "offline" or "network" (case-insensitive) is
/// [`RecordError::Offline`]; everything else is [`RecordError::Store`].
pub fn classify_failure(failure: &StoreFailure) -> RecordError {
    let is_connectivity = |text: &str| match connectivity_pattern() {
        Some(re) => re.is_match(text),
        None => {
            let lower = text.to_lowercase();
            lower.contains("offline") || lower.contains("network")
        }
    };
    let offline = is_connectivity(&failure.message)
        || failure.code.as_deref().is_some_and(is_connectivity);
    if offline {
        RecordError::Offline(failure.to_string())
    } else {
        RecordError::Store(failure.to_string())
    }
}

/// Structured document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Append a new document to `collection`, returning its id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreFailure`] when the backend rejects or cannot reach the write.
    async fn append_document(&self, collection: &str, fields: Fields)
        -> Result<String, StoreFailure>;

    /// Create or overwrite `document_id` in `collection` (last write wins).
    ///
    /// # Errors
    ///
    /// Returns [`StoreFailure`] when the backend rejects or cannot reach the write.
    async fn set_document(
        &self,
        collection: &str,
        document_id: &str,
        fields: Fields,
    ) -> Result<(), StoreFailure>;

    /// Short name used in logs.
    fn name(&self) -> &str;
}
