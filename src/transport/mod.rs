//! SMS transport boundary.
//!
//! A transport owns segmentation ([`SmsTransport::divide_message`]) and
//! multipart delivery ([`SmsTransport::send_multipart`]). Two
//! implementations ship with the crate:
//! - [`gateway::HttpSmsGateway`]: posts parts to an HTTP SMS gateway
//! - [`dry_run::DryRunTransport`]: logs parts without sending

pub mod dry_run;
pub mod gateway;
pub mod segment;

use async_trait::async_trait;

/// Errors raised by an SMS send attempt.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// HTTP transport failure.
    #[error("sms request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Gateway responded with an error status.
    #[error("sms gateway returned status {status}: {body}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Truncated response body.
        body: String,
    },

    /// The transport refused the message.
    #[error("sms rejected: {0}")]
    Rejected(String),
}

/// Transport that delivers an ordered, reassemblable part sequence.
#[async_trait]
pub trait SmsTransport: Send + Sync {
    /// Split a message body into transport-sized parts.
    fn divide_message(&self, text: &str) -> Vec<String> {
        segment::divide(text)
    }

    /// Send `parts` to `destination` as one multipart message.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the send attempt fails.
    async fn send_multipart(&self, destination: &str, parts: &[String])
        -> Result<(), TransportError>;

    /// Short name used in logs.
    fn name(&self) -> &str;
}
