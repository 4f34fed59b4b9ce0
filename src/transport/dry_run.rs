//! Transport that logs instead of sending. Used when no gateway is configured.

use async_trait::async_trait;
use tracing::info;

use super::{SmsTransport, TransportError};
use crate::types::mask_phone;

/// Logs every part at `info` and reports success.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunTransport;

#[async_trait]
impl SmsTransport for DryRunTransport {
    async fn send_multipart(
        &self,
        destination: &str,
        parts: &[String],
    ) -> Result<(), TransportError> {
        let total = parts.len();
        for (index, part) in parts.iter().enumerate() {
            info!(
                to = %mask_phone(destination),
                part = index.saturating_add(1),
                total,
                text = %part,
                "dry-run sms part"
            );
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "dry-run"
    }
}
