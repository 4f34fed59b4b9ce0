//! Dispatch routing: who receives the alert, and fan-out over the transport.
//!
//! Delivery is fail-fast. Targets are sent to in order and the first
//! transport error aborts the remaining sends. Legs already sent stay sent.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::transport::{SmsTransport, TransportError};
use crate::types::{mask_phone, AlertMessage, Contact, DispatchTarget};

/// Errors from a dispatch attempt.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// A send attempt failed; later targets were not attempted.
    #[error("sms to {target} contact failed after {delivered} delivered leg(s): {source}")]
    Transport {
        /// Label of the target that failed (`primary` / `secondary`).
        target: &'static str,
        /// Number of targets that were sent before the failure.
        delivered: usize,
        /// Underlying transport error.
        #[source]
        source: TransportError,
    },
}

/// The non-empty target set for one dispatch: a primary and optional secondary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchTargets {
    primary: DispatchTarget,
    secondary: Option<DispatchTarget>,
}

impl DispatchTargets {
    /// Targets in send order, primary first.
    pub fn iter(&self) -> impl Iterator<Item = &DispatchTarget> {
        std::iter::once(&self.primary).chain(self.secondary.as_ref())
    }

    /// Number of targets (1 or 2).
    pub fn len(&self) -> usize {
        if self.secondary.is_some() {
            2
        } else {
            1
        }
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Decide who receives the alert.
///
/// The emergency contact is the primary target. When its number is blank
/// the `fallback` contact takes its place. The selected contact is added as
/// secondary when it has a non-empty number.
pub fn build_targets(
    emergency: &Contact,
    selected: Option<&Contact>,
    fallback: &Contact,
) -> DispatchTargets {
    let primary_phone = if emergency.is_reachable() {
        emergency.phone_number.trim()
    } else {
        warn!("emergency contact has no number, using built-in default");
        fallback.phone_number.trim()
    };
    let secondary = selected
        .filter(|c| c.is_reachable())
        .map(|c| DispatchTarget::SecondaryContact(c.phone_number.trim().to_owned()));

    DispatchTargets {
        primary: DispatchTarget::PrimaryContact(primary_phone.to_owned()),
        secondary,
    }
}

/// Summary of a successful fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReceipt {
    /// Parts sent to each target.
    pub parts: usize,
    /// Targets that received the alert.
    pub targets: usize,
}

/// Sends one alert to every target over a shared transport.
#[derive(Clone)]
pub struct DispatchRouter {
    transport: Arc<dyn SmsTransport>,
}

impl std::fmt::Debug for DispatchRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchRouter")
            .field("transport", &self.transport.name())
            .finish()
    }
}

impl DispatchRouter {
    /// Create a router over `transport`.
    pub fn new(transport: Arc<dyn SmsTransport>) -> Self {
        Self { transport }
    }

    /// Segment `message` once and send the identical parts to each target.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Transport`] on the first failed send.
    pub async fn dispatch(
        &self,
        message: &AlertMessage,
        targets: &DispatchTargets,
    ) -> Result<DispatchReceipt, DispatchError> {
        let parts = self.transport.divide_message(&message.text);
        debug!(
            transport = self.transport.name(),
            parts = parts.len(),
            targets = targets.len(),
            "dispatching alert"
        );

        let mut delivered = 0usize;
        for target in targets.iter() {
            self.transport
                .send_multipart(target.phone_number(), &parts)
                .await
                .map_err(|source| {
                    warn!(
                        target = target.label(),
                        to = %mask_phone(target.phone_number()),
                        error = %source,
                        "sms send failed, aborting remaining targets"
                    );
                    DispatchError::Transport {
                        target: target.label(),
                        delivered,
                        source,
                    }
                })?;
            delivered = delivered.saturating_add(1);
            info!(
                target = target.label(),
                to = %mask_phone(target.phone_number()),
                parts = parts.len(),
                "sms sent"
            );
        }

        Ok(DispatchReceipt {
            parts: parts.len(),
            targets: delivered,
        })
    }
}
