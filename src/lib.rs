//! SOS dispatch engine.
//!
//! Resolves the best available location fix, composes an alert, sends it
//! over SMS to the emergency contacts, and records an audit entry that
//! tolerates an offline store.
//!
//! See `DESIGN.md` for the architecture notes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod logging;
pub mod types;

pub mod host;
pub mod location;
pub mod places;

pub mod alert;
pub mod router;
pub mod transport;

pub mod recorder;
pub mod store;

pub mod engine;
