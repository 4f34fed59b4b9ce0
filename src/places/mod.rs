//! Best-effort place-name enrichment over a public geocoding endpoint.
//!
//! A failed, empty, or timed-out lookup is equivalent to "no enrichment".
//! Callers must never let this block or fail the dispatch.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::types::PlaceInfo;

/// Default Nominatim search endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://nominatim.openstreetmap.org/search";

/// Default `User-Agent` header identifying the app to the geocoder.
pub const DEFAULT_USER_AGENT: &str = "GramSwasthyaApp";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Errors from place lookups. Always absorbed by the engine.
#[derive(Debug, thiserror::Error)]
pub enum PlaceError {
    /// HTTP transport failure or timeout.
    #[error("place lookup request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The endpoint URL could not be built.
    #[error("invalid place lookup url: {0}")]
    Url(#[from] url::ParseError),

    /// Non-success HTTP status.
    #[error("place lookup returned status {0}")]
    HttpStatus(u16),

    /// Response body was not the expected JSON array.
    #[error("place lookup parse error: {0}")]
    Parse(String),
}

/// Place lookup service boundary.
#[async_trait]
pub trait PlaceLookup: Send + Sync {
    /// Find the place matching `query` nearest to the coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`PlaceError`] on transport or parse failure.
    async fn lookup(&self, query: &str, lat: f64, lon: f64)
        -> Result<Option<PlaceInfo>, PlaceError>;
}

/// Nominatim-compatible geocoding client.
#[derive(Debug, Clone)]
pub struct NominatimClient {
    client: reqwest::Client,
    endpoint: String,
}

impl NominatimClient {
    /// Create a client for `endpoint` sending `user_agent` with a request timeout.
    pub fn new(endpoint: impl Into<String>, user_agent: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "failed to build geocoder HTTP client, using default");
                reqwest::Client::default()
            });
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// Build the search URL for a query near a coordinate pair.
    ///
    /// # Errors
    ///
    /// Returns [`PlaceError::Url`] when the endpoint is not a valid URL.
    pub fn search_url(&self, query: &str, lat: f64, lon: f64) -> Result<url::Url, PlaceError> {
        let url = url::Url::parse_with_params(
            &self.endpoint,
            &[
                ("format", "json"),
                ("q", query),
                ("limit", "1"),
                ("lat", &lat.to_string()),
                ("lon", &lon.to_string()),
            ],
        )?;
        Ok(url)
    }
}

#[async_trait]
impl PlaceLookup for NominatimClient {
    async fn lookup(
        &self,
        query: &str,
        lat: f64,
        lon: f64,
    ) -> Result<Option<PlaceInfo>, PlaceError> {
        let url = self.search_url(query, lat, lon)?;
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PlaceError::HttpStatus(status.as_u16()));
        }
        let body = response.text().await?;
        let place = parse_places(&body)?;
        debug!(found = place.is_some(), "place lookup finished");
        Ok(place)
    }
}

/// Parse a geocoder response: a JSON array whose first element, if any, wins.
///
/// `lat` and `lon` may be JSON strings or numbers.
///
/// # Errors
///
/// Returns [`PlaceError::Parse`] when the body is not an array or the first
/// element lacks `display_name`, `lat`, or `lon`.
pub fn parse_places(body: &str) -> Result<Option<PlaceInfo>, PlaceError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| PlaceError::Parse(e.to_string()))?;
    let items = value
        .as_array()
        .ok_or_else(|| PlaceError::Parse("expected a JSON array".to_owned()))?;
    let Some(first) = items.first() else {
        return Ok(None);
    };

    let display_name = first
        .get("display_name")
        .and_then(Value::as_str)
        .ok_or_else(|| PlaceError::Parse("missing display_name".to_owned()))?;
    let latitude = coerce_f64(first.get("lat"))
        .ok_or_else(|| PlaceError::Parse("missing or invalid lat".to_owned()))?;
    let longitude = coerce_f64(first.get("lon"))
        .ok_or_else(|| PlaceError::Parse("missing or invalid lon".to_owned()))?;

    Ok(Some(PlaceInfo {
        display_name: display_name.to_owned(),
        latitude,
        longitude,
    }))
}

fn coerce_f64(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
