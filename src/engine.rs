//! SOS dispatch orchestrator.
//!
//! Linear stage machine, no back-edges:
//! `Idle -> ResolvingLocation -> Composing -> Dispatching -> Recording -> Done`.
//! Permission and location failures stop before anything is sent or
//! recorded. A transport failure stops before recording. Store failures
//! never undo sent SMS.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::alert;
use crate::host::HostPlatform;
use crate::location::{resolve_best_location, LocationError, LocationProviders};
use crate::places::PlaceLookup;
use crate::recorder::{RecordReceipt, Recorder};
use crate::router::{build_targets, DispatchRouter};
use crate::store::RecordError;
use crate::types::{
    mask_phone, Contact, DispatchOutcome, ErrorKind, LocationFix, PlaceInfo, SosRecord,
};

/// Pipeline stages, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Not started.
    Idle,
    /// Reading provider fixes.
    ResolvingLocation,
    /// Building the alert text.
    Composing,
    /// Sending SMS to each target.
    Dispatching,
    /// Writing the audit record.
    Recording,
    /// Finished.
    Done,
}

impl Stage {
    /// Stage name for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::ResolvingLocation => "resolving_location",
            Self::Composing => "composing",
            Self::Dispatching => "dispatching",
            Self::Recording => "recording",
            Self::Done => "done",
        }
    }
}

/// Engine tuning knobs.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Search term for place enrichment (e.g. `hospital`).
    pub place_query: String,
    /// Upper bound on the place lookup.
    pub place_timeout: Duration,
    /// How long [`SosEngine::trigger_sos`] waits for the audit write.
    pub ack_timeout: Duration,
    /// Built-in primary contact used when the emergency contact has no number.
    pub fallback_contact: Contact,
}

/// Result of [`SosEngine::trigger`]: the SMS outcome now, the audit write later.
#[derive(Debug)]
pub struct Dispatch {
    /// Outcome of the pipeline up to and including SMS delivery.
    pub outcome: DispatchOutcome,
    /// Pending audit write. `None` when the pipeline stopped before recording.
    pub record: Option<RecordReceipt>,
}

/// Sequences resolve, compose, dispatch, and record for one SOS trigger.
///
/// Cheap to clone; concurrent triggers run independent pipelines.
#[derive(Clone)]
pub struct SosEngine {
    host: Arc<dyn HostPlatform>,
    providers: Arc<dyn LocationProviders>,
    places: Option<Arc<dyn PlaceLookup>>,
    router: DispatchRouter,
    recorder: Recorder,
    settings: EngineSettings,
}

impl std::fmt::Debug for SosEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SosEngine")
            .field("router", &self.router)
            .field("recorder", &self.recorder)
            .field("places", &self.places.is_some())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

fn enter(stage: Stage) {
    debug!(stage = stage.as_str(), "sos pipeline stage");
}

impl SosEngine {
    /// Assemble an engine from its collaborators.
    pub fn new(
        host: Arc<dyn HostPlatform>,
        providers: Arc<dyn LocationProviders>,
        router: DispatchRouter,
        recorder: Recorder,
        settings: EngineSettings,
    ) -> Self {
        Self {
            host,
            providers,
            places: None,
            router,
            recorder,
            settings,
        }
    }

    /// Enable best-effort place enrichment.
    #[must_use]
    pub fn with_places(mut self, places: Arc<dyn PlaceLookup>) -> Self {
        self.places = Some(places);
        self
    }

    /// Run the pipeline and return as soon as SMS delivery is decided.
    ///
    /// The audit write continues in the background; its result is available
    /// through [`Dispatch::record`].
    pub async fn trigger(
        &self,
        selected: Option<&Contact>,
        emergency: &Contact,
        language: &str,
    ) -> Dispatch {
        enter(Stage::Idle);
        let grants = self.host.check_permissions();

        enter(Stage::ResolvingLocation);
        let fix = match resolve_best_location(&grants, self.providers.as_ref()).await {
            Ok(fix) => fix,
            Err(err) => {
                let kind = match err {
                    LocationError::PermissionDenied => ErrorKind::PermissionDenied,
                    LocationError::Unavailable => ErrorKind::LocationUnavailable,
                };
                warn!(error = %err, "sos aborted before dispatch");
                return Dispatch {
                    outcome: DispatchOutcome::failed(kind, err.to_string()),
                    record: None,
                };
            }
        };
        if !grants.can_send_sms() {
            warn!("sms permission missing, sos aborted before dispatch");
            return Dispatch {
                outcome: DispatchOutcome::failed(
                    ErrorKind::PermissionDenied,
                    "sms permission denied",
                ),
                record: None,
            };
        }

        enter(Stage::Composing);
        let place = self.enrich(&fix).await;
        let message = alert::compose(&fix, place.as_ref());

        enter(Stage::Dispatching);
        let targets = build_targets(emergency, selected, &self.settings.fallback_contact);
        let receipt = match self.router.dispatch(&message, &targets).await {
            Ok(receipt) => receipt,
            Err(err) => {
                warn!(error = %err, "sos dispatch failed");
                return Dispatch {
                    outcome: DispatchOutcome::failed(ErrorKind::TransportFailure, err.to_string()),
                    record: None,
                };
            }
        };

        enter(Stage::Recording);
        let record = SosRecord::new(selected, &fix, language);
        let pending = self.recorder.record_in_background(record);

        enter(Stage::Done);
        info!(
            targets = receipt.targets,
            parts = receipt.parts,
            primary = %mask_phone(
                targets.iter().next().map(|t| t.phone_number()).unwrap_or_default()
            ),
            "sos message sent"
        );
        Dispatch {
            outcome: DispatchOutcome::sent(format!(
                "SOS message sent to {} contact(s)",
                receipt.targets
            )),
            record: Some(pending),
        }
    }

    /// Run the pipeline and fold the audit write into one outcome.
    ///
    /// Waits up to the configured acknowledgment timeout for the store. An
    /// offline store keeps `success: true` with a [`ErrorKind::StoreOffline`]
    /// annotation. A hard store error is reported as
    /// [`ErrorKind::StoreError`] with `sms_delivered` still true.
    pub async fn trigger_sos(
        &self,
        selected: Option<&Contact>,
        emergency: &Contact,
        language: &str,
    ) -> DispatchOutcome {
        let Dispatch { outcome, record } = self.trigger(selected, emergency, language).await;
        match record {
            Some(record) => self.settle(outcome, record).await.0,
            None => outcome,
        }
    }

    /// Wait up to the acknowledgment timeout for `record` and fold its result
    /// into `outcome`.
    ///
    /// When the write is still in flight the outcome notes "audit record
    /// pending" and the receipt is handed back so the caller can keep the
    /// write alive until it lands.
    pub async fn settle(
        &self,
        outcome: DispatchOutcome,
        record: RecordReceipt,
    ) -> (DispatchOutcome, Option<RecordReceipt>) {
        match record.outcome_within(self.settings.ack_timeout).await {
            Ok(Ok(_)) => (outcome, None),
            Ok(Err(RecordError::Offline(detail))) => (
                DispatchOutcome {
                    success: true,
                    error_kind: ErrorKind::StoreOffline,
                    detail: format!("{}; record will sync later ({detail})", outcome.detail),
                    sms_delivered: true,
                },
                None,
            ),
            Ok(Err(RecordError::Store(detail))) => (
                DispatchOutcome {
                    success: false,
                    error_kind: ErrorKind::StoreError,
                    detail: format!("{}; audit record failed: {detail}", outcome.detail),
                    sms_delivered: true,
                },
                None,
            ),
            Err(pending) => {
                debug!("audit write still in flight after ack timeout");
                (
                    DispatchOutcome {
                        detail: format!("{}; audit record pending", outcome.detail),
                        ..outcome
                    },
                    Some(pending),
                )
            }
        }
    }

    /// Best-effort place lookup. Errors and timeouts mean "no enrichment".
    async fn enrich(&self, fix: &LocationFix) -> Option<PlaceInfo> {
        let places = self.places.as_ref()?;
        let lookup = places.lookup(&self.settings.place_query, fix.latitude, fix.longitude);
        match tokio::time::timeout(self.settings.place_timeout, lookup).await {
            Ok(Ok(place)) => place,
            Ok(Err(err)) => {
                debug!(error = %err, "place enrichment unavailable");
                None
            }
            Err(_) => {
                debug!("place enrichment timed out");
                None
            }
        }
    }
}
