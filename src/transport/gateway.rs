//! HTTP SMS gateway transport.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use super::{SmsTransport, TransportError};
use crate::types::mask_phone;

/// Maximum characters of an error body kept in [`TransportError::HttpStatus`].
const MAX_ERROR_BODY_CHARS: usize = 256;

/// Request body posted to the gateway.
#[derive(Debug, Serialize)]
struct GatewayRequest<'a> {
    to: &'a str,
    parts: &'a [String],
    /// Always true: parts must be reassembled as one message.
    multipart: bool,
}

/// Transport posting multipart messages to an HTTP SMS gateway.
#[derive(Debug, Clone)]
pub struct HttpSmsGateway {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl HttpSmsGateway {
    /// Create a gateway client for `url`, with optional bearer token.
    pub fn new(url: impl Into<String>, token: Option<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "failed to build gateway HTTP client, using default");
                reqwest::Client::default()
            });
        Self {
            client,
            url: url.into(),
            token,
        }
    }
}

#[async_trait]
impl SmsTransport for HttpSmsGateway {
    async fn send_multipart(
        &self,
        destination: &str,
        parts: &[String],
    ) -> Result<(), TransportError> {
        let body = GatewayRequest {
            to: destination,
            parts,
            multipart: true,
        };
        let mut request = self.client.post(&self.url).json(&body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(TransportError::HttpStatus {
                status: status.as_u16(),
                body: truncate(&text),
            });
        }

        debug!(
            to = %mask_phone(destination),
            parts = parts.len(),
            "gateway accepted multipart sms"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "http-gateway"
    }
}

fn truncate(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() > MAX_ERROR_BODY_CHARS {
        let shortened: String = collapsed.chars().take(MAX_ERROR_BODY_CHARS).collect();
        return format!("{shortened}...[truncated]");
    }
    collapsed
}
