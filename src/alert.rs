//! Alert text composition.

use crate::types::{AlertMessage, LocationFix, PlaceInfo};

/// Map link prefix; the query parameter is `"{lat},{lon}"`.
pub const MAP_LINK_BASE: &str = "https://maps.google.com/?q=";

/// Build the map link for a fix at full floating-point precision.
pub fn map_link(fix: &LocationFix) -> String {
    format!("{MAP_LINK_BASE}{},{}", fix.latitude, fix.longitude)
}

/// Compose the SOS alert text for a fix and optional place name.
///
/// Pure and deterministic: identical inputs always yield identical text.
pub fn compose(fix: &LocationFix, place: Option<&PlaceInfo>) -> AlertMessage {
    let mut text = format!("🚨 SOS: Need help!\nLocation: {}", map_link(fix));
    if let Some(place) = place.filter(|p| !p.display_name.trim().is_empty()) {
        text.push_str("\n📍 ");
        text.push_str(place.display_name.trim());
    }
    AlertMessage { text }
}
