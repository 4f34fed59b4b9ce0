//! Recording test doubles for the engine's boundaries.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use sos_dispatch::engine::{EngineSettings, SosEngine};
use sos_dispatch::host::{FixedHost, PermissionGrants};
use sos_dispatch::location::{LocationProviders, ProviderReading};
use sos_dispatch::places::{PlaceError, PlaceLookup};
use sos_dispatch::recorder::Recorder;
use sos_dispatch::router::DispatchRouter;
use sos_dispatch::store::{DocumentStore, Fields, StoreFailure};
use sos_dispatch::transport::{SmsTransport, TransportError};
use sos_dispatch::types::{Contact, LocationFix, PlaceInfo};

// ---------------------------------------------------------------------------
// Location
// ---------------------------------------------------------------------------

pub struct MockProviders {
    readings: Vec<ProviderReading>,
    pub calls: AtomicUsize,
}

impl MockProviders {
    pub fn new(readings: Vec<ProviderReading>) -> Self {
        Self {
            readings,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LocationProviders for MockProviders {
    async fn query_providers(&self) -> Vec<ProviderReading> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.readings.clone()
    }
}

pub fn reading(provider: &str, lat: f64, lon: f64, accuracy: f64) -> ProviderReading {
    ProviderReading {
        provider: provider.to_owned(),
        fix: Some(LocationFix {
            latitude: lat,
            longitude: lon,
            accuracy_meters: accuracy,
            provider: provider.to_owned(),
        }),
    }
}

pub fn empty_reading(provider: &str) -> ProviderReading {
    ProviderReading {
        provider: provider.to_owned(),
        fix: None,
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingTransport {
    pub sent: Mutex<Vec<(String, Vec<String>)>>,
    fail_for: Option<String>,
}

impl RecordingTransport {
    pub fn failing_for(destination: &str) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_for: Some(destination.to_owned()),
        }
    }

    pub fn sent(&self) -> Vec<(String, Vec<String>)> {
        self.sent.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl SmsTransport for RecordingTransport {
    async fn send_multipart(
        &self,
        destination: &str,
        parts: &[String],
    ) -> Result<(), TransportError> {
        if self.fail_for.as_deref() == Some(destination) {
            return Err(TransportError::Rejected("radio off".to_owned()));
        }
        self.sent
            .lock()
            .expect("lock poisoned")
            .push((destination.to_owned(), parts.to_vec()));
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryStore {
    pub docs: Mutex<Vec<(String, Fields)>>,
    fail_with: Option<StoreFailure>,
    delay: Duration,
}

impl MemoryStore {
    pub fn failing(failure: StoreFailure) -> Self {
        Self {
            fail_with: Some(failure),
            ..Self::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn docs(&self) -> Vec<(String, Fields)> {
        self.docs.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn append_document(
        &self,
        collection: &str,
        fields: Fields,
    ) -> Result<String, StoreFailure> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(failure) = &self.fail_with {
            return Err(failure.clone());
        }
        let mut docs = self.docs.lock().expect("lock poisoned");
        docs.push((collection.to_owned(), fields));
        Ok(format!("doc-{}", docs.len()))
    }

    async fn set_document(
        &self,
        collection: &str,
        document_id: &str,
        fields: Fields,
    ) -> Result<(), StoreFailure> {
        if let Some(failure) = &self.fail_with {
            return Err(failure.clone());
        }
        let mut docs = self.docs.lock().expect("lock poisoned");
        let key = format!("{collection}/{document_id}");
        docs.retain(|(k, _)| *k != key);
        docs.push((key, fields));
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

// ---------------------------------------------------------------------------
// Places
// ---------------------------------------------------------------------------

pub struct MockPlaces {
    place: Option<PlaceInfo>,
    delay: Duration,
    fail: bool,
    pub calls: AtomicUsize,
}

impl MockPlaces {
    pub fn found(name: &str) -> Self {
        Self {
            place: Some(PlaceInfo {
                display_name: name.to_owned(),
                latitude: 0.0,
                longitude: 0.0,
            }),
            delay: Duration::ZERO,
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn slow(name: &str, delay: Duration) -> Self {
        Self {
            delay,
            ..Self::found(name)
        }
    }

    pub fn failing() -> Self {
        Self {
            place: None,
            delay: Duration::ZERO,
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PlaceLookup for MockPlaces {
    async fn lookup(
        &self,
        _query: &str,
        _lat: f64,
        _lon: f64,
    ) -> Result<Option<PlaceInfo>, PlaceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(PlaceError::HttpStatus(503));
        }
        Ok(self.place.clone())
    }
}

// ---------------------------------------------------------------------------
// Engine assembly
// ---------------------------------------------------------------------------

pub const EMERGENCY_PHONE: &str = "+911000000001";
pub const SELECTED_PHONE: &str = "+911000000002";

pub fn emergency() -> Contact {
    Contact::new(EMERGENCY_PHONE, "Village Health Worker")
}

pub fn selected() -> Contact {
    Contact::new(SELECTED_PHONE, "Ravi").with_email("ravi@example.com")
}

pub fn settings() -> EngineSettings {
    EngineSettings {
        place_query: "hospital".to_owned(),
        place_timeout: Duration::from_millis(100),
        ack_timeout: Duration::from_secs(2),
        fallback_contact: Contact::new("+919876543210", "Default Emergency"),
    }
}

pub struct Harness {
    pub providers: Arc<MockProviders>,
    pub transport: Arc<RecordingTransport>,
    pub store: Arc<MemoryStore>,
    pub engine: SosEngine,
}

pub fn harness(
    grants: PermissionGrants,
    readings: Vec<ProviderReading>,
    transport: RecordingTransport,
    store: MemoryStore,
) -> Harness {
    harness_with(settings(), grants, readings, transport, store)
}

pub fn harness_with(
    settings: EngineSettings,
    grants: PermissionGrants,
    readings: Vec<ProviderReading>,
    transport: RecordingTransport,
    store: MemoryStore,
) -> Harness {
    let providers = Arc::new(MockProviders::new(readings));
    let transport = Arc::new(transport);
    let store = Arc::new(store);
    let engine = SosEngine::new(
        Arc::new(FixedHost::new(None, grants)),
        providers.clone(),
        DispatchRouter::new(transport.clone()),
        Recorder::new(store.clone()),
        settings,
    );
    Harness {
        providers,
        transport,
        store,
        engine,
    }
}
