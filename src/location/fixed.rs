//! Providers backed by recorded readings (config file or host snapshot).

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::trace;

use super::{LocationProviders, ProviderReading};
use crate::types::LocationFix;

/// A cached reading with the time it was taken.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredReading {
    /// Provider name.
    pub provider: String,
    /// Cached fix, if the provider has one.
    pub fix: Option<LocationFix>,
    /// When the fix was taken. `None` means "just now".
    pub recorded_at: Option<DateTime<Utc>>,
}

/// Location providers that replay stored readings, applying a retention window.
#[derive(Debug, Clone)]
pub struct StaticProviders {
    readings: Vec<StoredReading>,
    max_age: Duration,
}

impl StaticProviders {
    /// Create providers from readings. Fixes older than `max_age` are absent.
    pub fn new(readings: Vec<StoredReading>, max_age: Duration) -> Self {
        Self { readings, max_age }
    }

    /// Enumerate readings as seen at `now`.
    pub fn readings_at(&self, now: DateTime<Utc>) -> Vec<ProviderReading> {
        self.readings
            .iter()
            .map(|stored| {
                let fresh = stored
                    .recorded_at
                    .map_or(true, |at| now.signed_duration_since(at) <= self.max_age);
                if !fresh {
                    trace!(provider = %stored.provider, "cached fix past retention");
                }
                ProviderReading {
                    provider: stored.provider.clone(),
                    fix: stored.fix.clone().filter(|_| fresh),
                }
            })
            .collect()
    }
}

#[async_trait]
impl LocationProviders for StaticProviders {
    async fn query_providers(&self) -> Vec<ProviderReading> {
        self.readings_at(Utc::now())
    }
}
