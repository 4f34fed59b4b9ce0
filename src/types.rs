//! Domain types shared by every stage of the SOS pipeline.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Contacts
// ---------------------------------------------------------------------------

/// A person who can receive an SOS alert.
///
/// Immutable once constructed. A contact used as a send target must carry a
/// non-empty phone number; see [`Contact::is_reachable`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Destination phone number (E.164 or local format).
    pub phone_number: String,
    /// Human-readable name.
    pub display_name: String,
    /// Optional email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Contact {
    /// Build a contact from its parts.
    pub fn new(phone_number: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            phone_number: phone_number.into(),
            display_name: display_name.into(),
            email: None,
        }
    }

    /// Attach an email address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Whether this contact has a number an SMS can be sent to.
    pub fn is_reachable(&self) -> bool {
        !self.phone_number.trim().is_empty()
    }
}

// ---------------------------------------------------------------------------
// Location
// ---------------------------------------------------------------------------

/// A single location reading from one provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Accuracy radius in meters. Lower is more precise.
    pub accuracy_meters: f64,
    /// Name of the provider that produced the fix (e.g. `gps`, `network`).
    pub provider: String,
}

/// Optional human-readable enrichment for a coordinate pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceInfo {
    /// Display name returned by the geocoder.
    pub display_name: String,
    /// Latitude of the matched place.
    pub latitude: f64,
    /// Longitude of the matched place.
    pub longitude: f64,
}

// ---------------------------------------------------------------------------
// Messages and targets
// ---------------------------------------------------------------------------

/// The composed alert text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertMessage {
    /// Full message body before transport segmentation.
    pub text: String,
}

/// One phone number that receives the alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "phone_number", rename_all = "snake_case")]
pub enum DispatchTarget {
    /// The always-configured emergency contact.
    PrimaryContact(String),
    /// The contact picked by the user for this session.
    SecondaryContact(String),
}

impl DispatchTarget {
    /// Destination phone number.
    pub fn phone_number(&self) -> &str {
        match self {
            Self::PrimaryContact(phone) | Self::SecondaryContact(phone) => phone,
        }
    }

    /// Short label used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::PrimaryContact(_) => "primary",
            Self::SecondaryContact(_) => "secondary",
        }
    }
}

// ---------------------------------------------------------------------------
// Audit record
// ---------------------------------------------------------------------------

/// Append-only audit entry written once per dispatch attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SosRecord {
    /// Name of the selected contact, or `Anonymous`.
    pub user_name: String,
    /// Phone of the selected contact, or `Unknown`.
    pub phone_number: String,
    /// Email of the selected contact, or `Unknown`.
    pub email: String,
    /// Latitude of the dispatched fix.
    pub latitude: f64,
    /// Longitude of the dispatched fix.
    pub longitude: f64,
    /// UI language active at dispatch time.
    pub language: String,
    /// Client timestamp taken when the record was built.
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Placeholder name when no contact was selected.
pub const ANONYMOUS_USER: &str = "Anonymous";

/// Placeholder for missing phone or email values.
pub const UNKNOWN_FIELD: &str = "Unknown";

impl SosRecord {
    /// Build a record from the selected contact and dispatched fix.
    ///
    /// Missing contact details fall back to [`ANONYMOUS_USER`] and
    /// [`UNKNOWN_FIELD`].
    pub fn new(selected: Option<&Contact>, fix: &LocationFix, language: &str) -> Self {
        Self {
            user_name: selected
                .map(|c| c.display_name.clone())
                .unwrap_or_else(|| ANONYMOUS_USER.to_owned()),
            phone_number: selected
                .map(|c| c.phone_number.clone())
                .unwrap_or_else(|| UNKNOWN_FIELD.to_owned()),
            email: selected
                .and_then(|c| c.email.clone())
                .unwrap_or_else(|| UNKNOWN_FIELD.to_owned()),
            latitude: fix.latitude,
            longitude: fix.longitude,
            language: language.to_owned(),
            timestamp: chrono::Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Classification of a dispatch failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No failure.
    None,
    /// Location or SMS capability not granted.
    PermissionDenied,
    /// No provider yielded a fix.
    LocationUnavailable,
    /// An SMS send attempt failed.
    TransportFailure,
    /// Audit store unreachable; the record will sync later (soft).
    StoreOffline,
    /// Audit store rejected the write (hard).
    StoreError,
}

impl ErrorKind {
    /// Returns the snake_case name used in logs and CLI output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::PermissionDenied => "permission_denied",
            Self::LocationUnavailable => "location_unavailable",
            Self::TransportFailure => "transport_failure",
            Self::StoreOffline => "store_offline",
            Self::StoreError => "store_error",
        }
    }
}

/// Result reported to the caller of the engine. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchOutcome {
    /// Whether the user-facing action succeeded.
    pub success: bool,
    /// Failure class, or a soft annotation when `success` is true.
    pub error_kind: ErrorKind,
    /// Human-readable detail.
    pub detail: String,
    /// Whether every SMS leg was handed to the transport.
    pub sms_delivered: bool,
}

impl DispatchOutcome {
    /// A clean success.
    pub fn sent(detail: impl Into<String>) -> Self {
        Self {
            success: true,
            error_kind: ErrorKind::None,
            detail: detail.into(),
            sms_delivered: true,
        }
    }

    /// A failure of the given kind.
    pub fn failed(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            success: false,
            error_kind: kind,
            detail: detail.into(),
            sms_delivered: false,
        }
    }

    /// Whether the outcome carries a soft "will sync later" notice.
    pub fn is_soft_failure(&self) -> bool {
        self.success && self.error_kind == ErrorKind::StoreOffline
    }
}

// ---------------------------------------------------------------------------
// Permissions
// ---------------------------------------------------------------------------

/// Host capabilities the pipeline depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionKind {
    /// Sending SMS.
    SendSms,
    /// Precise (GPS) location.
    FineLocation,
    /// Approximate (network) location.
    CoarseLocation,
}

/// Mask a phone number for logging, keeping only the last four digits.
pub fn mask_phone(phone: &str) -> String {
    let chars: Vec<char> = phone.chars().collect();
    let keep = chars.len().min(4);
    let hidden = chars.len().saturating_sub(keep);
    let tail: String = chars.iter().skip(hidden).collect();
    format!("{}{tail}", "*".repeat(hidden))
}
