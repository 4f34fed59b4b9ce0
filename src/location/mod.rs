//! Location resolution: reduce every provider's last-known fix to one.
//!
//! No network call happens here. Providers report their cached fixes and the
//! resolver picks the most precise one.

pub mod fixed;

use async_trait::async_trait;
use tracing::{debug, trace};

use crate::host::PermissionGrants;
use crate::types::LocationFix;

/// Errors from location resolution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    /// Neither fine nor coarse location was granted.
    #[error("location permission denied")]
    PermissionDenied,

    /// Every enabled provider returned no fix.
    #[error("no location provider returned a fix")]
    Unavailable,
}

/// One enabled provider and its last-known fix.
///
/// `fix` is `None` when the provider has nothing cached or its cached fix is
/// older than the provider's retention window.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderReading {
    /// Provider name.
    pub provider: String,
    /// Last-known fix, if any.
    pub fix: Option<LocationFix>,
}

/// Device location providers, consumed read-only.
#[async_trait]
pub trait LocationProviders: Send + Sync {
    /// Enumerate enabled providers in platform order with their last-known fix.
    async fn query_providers(&self) -> Vec<ProviderReading>;
}

/// Pick the most precise fix across all providers.
///
/// Fails with [`LocationError::PermissionDenied`] before touching providers
/// when neither fine nor coarse location is granted. Among present fixes the
/// smallest `accuracy_meters` wins; ties keep the first in enumeration order.
///
/// # Errors
///
/// Returns [`LocationError::PermissionDenied`] or
/// [`LocationError::Unavailable`].
pub async fn resolve_best_location(
    grants: &PermissionGrants,
    providers: &dyn LocationProviders,
) -> Result<LocationFix, LocationError> {
    if !grants.can_locate() {
        debug!("location permission missing, providers not queried");
        return Err(LocationError::PermissionDenied);
    }

    let readings = providers.query_providers().await;
    let best = select_best(readings).ok_or(LocationError::Unavailable)?;
    debug!(
        provider = %best.provider,
        accuracy_m = best.accuracy_meters,
        "best location fix selected"
    );
    Ok(best)
}

/// Reduce readings to the fix with the smallest accuracy radius.
pub fn select_best(readings: impl IntoIterator<Item = ProviderReading>) -> Option<LocationFix> {
    let mut best: Option<LocationFix> = None;
    for reading in readings {
        let Some(fix) = reading.fix else {
            trace!(provider = %reading.provider, "provider has no fix");
            continue;
        };
        let better = match &best {
            None => true,
            Some(current) => rank(&fix) < rank(current),
        };
        if better {
            best = Some(fix);
        }
    }
    best
}

/// NaN accuracy ranks last.
fn rank(fix: &LocationFix) -> f64 {
    if fix.accuracy_meters.is_nan() {
        f64::INFINITY
    } else {
        fix.accuracy_meters
    }
}
