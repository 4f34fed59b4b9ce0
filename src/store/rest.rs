//! JSON-over-HTTP document store.
//!
//! `POST {base}/{collection}` appends and returns `{"id": ...}`;
//! `PUT {base}/{collection}/{id}` sets a document.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{trace, warn};

use super::{DocumentStore, Fields, StoreFailure};

/// Response body for an append.
#[derive(Debug, Deserialize)]
struct AppendResponse {
    id: Option<String>,
}

/// Document store reached over HTTP.
#[derive(Debug, Clone)]
pub struct RestStore {
    client: reqwest::Client,
    base_url: String,
}

impl RestStore {
    /// Create a client for `base_url` with a request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "failed to build store HTTP client, using default");
                reqwest::Client::default()
            });
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/{collection}", self.base_url)
    }
}

/// Connect and timeout failures are connectivity-class and read as offline.
fn request_failure(err: reqwest::Error) -> StoreFailure {
    if err.is_connect() || err.is_timeout() {
        StoreFailure::with_code("network", format!("network unreachable: {err}"))
    } else {
        StoreFailure::new(err.to_string())
    }
}

async fn check(response: reqwest::Response) -> Result<String, StoreFailure> {
    let status = response.status();
    let body = response.text().await.map_err(request_failure)?;
    if !status.is_success() {
        return Err(StoreFailure::with_code(
            status.as_u16().to_string(),
            format!("store returned status {status}: {}", body.trim()),
        ));
    }
    Ok(body)
}

#[async_trait]
impl DocumentStore for RestStore {
    async fn append_document(
        &self,
        collection: &str,
        fields: Fields,
    ) -> Result<String, StoreFailure> {
        let response = self
            .client
            .post(self.collection_url(collection))
            .json(&fields)
            .send()
            .await
            .map_err(request_failure)?;
        let body = check(response).await?;
        let id = serde_json::from_str::<AppendResponse>(&body)
            .ok()
            .and_then(|r| r.id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                warn!(collection, "store append response carried no document id");
                StoreFailure::with_code(
                    "decode",
                    format!("append response has no document id: {}", body.trim()),
                )
            })?;
        trace!(collection, id = %id, "remote document appended");
        Ok(id)
    }

    async fn set_document(
        &self,
        collection: &str,
        document_id: &str,
        fields: Fields,
    ) -> Result<(), StoreFailure> {
        let url = format!("{}/{document_id}", self.collection_url(collection));
        let response = self
            .client
            .put(url)
            .json(&fields)
            .send()
            .await
            .map_err(request_failure)?;
        check(response).await?;
        trace!(collection, id = document_id, "remote document set");
        Ok(())
    }

    fn name(&self) -> &str {
        "rest"
    }
}
