//! Host platform collaborator: contact picking and permission prompts.
//!
//! The mobile shell owns both flows. The engine only sees their results.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::types::{Contact, PermissionKind};

/// Permissions requested before the SOS button becomes usable.
pub const REQUIRED_PERMISSIONS: [PermissionKind; 3] = [
    PermissionKind::SendSms,
    PermissionKind::FineLocation,
    PermissionKind::CoarseLocation,
];

/// Granted/denied state for each requested permission.
///
/// Permissions that were never requested count as denied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionGrants {
    grants: BTreeMap<PermissionKind, bool>,
}

impl PermissionGrants {
    /// Build grants from a map returned by the host.
    pub fn from_map(grants: BTreeMap<PermissionKind, bool>) -> Self {
        Self { grants }
    }

    /// Grants with every required permission allowed.
    pub fn all() -> Self {
        Self::from_map(REQUIRED_PERMISSIONS.iter().map(|p| (*p, true)).collect())
    }

    /// Grants with nothing allowed.
    pub fn none() -> Self {
        Self::default()
    }

    /// Set one permission.
    #[must_use]
    pub fn with(mut self, kind: PermissionKind, granted: bool) -> Self {
        self.grants.insert(kind, granted);
        self
    }

    /// Whether a permission was granted.
    pub fn is_granted(&self, kind: PermissionKind) -> bool {
        self.grants.get(&kind).copied().unwrap_or(false)
    }

    /// Fine or coarse location is enough to read a fix.
    pub fn can_locate(&self) -> bool {
        self.is_granted(PermissionKind::FineLocation)
            || self.is_granted(PermissionKind::CoarseLocation)
    }

    /// Whether SMS sending is allowed.
    pub fn can_send_sms(&self) -> bool {
        self.is_granted(PermissionKind::SendSms)
    }
}

/// UI flows owned by the host platform.
#[async_trait]
pub trait HostPlatform: Send + Sync {
    /// Let the user pick a contact. `None` means the picker was cancelled.
    async fn pick_contact(&self) -> Option<Contact>;

    /// Prompt for permissions and report which were granted.
    async fn request_permissions(&self, kinds: &[PermissionKind]) -> PermissionGrants;

    /// Current grants, without prompting.
    fn check_permissions(&self) -> PermissionGrants;
}

/// Non-interactive host with fixed answers, used by the CLI.
#[derive(Debug, Clone)]
pub struct FixedHost {
    contact: Option<Contact>,
    grants: PermissionGrants,
}

impl FixedHost {
    /// Create a host that always returns the given contact and grants.
    pub fn new(contact: Option<Contact>, grants: PermissionGrants) -> Self {
        Self { contact, grants }
    }
}

#[async_trait]
impl HostPlatform for FixedHost {
    async fn pick_contact(&self) -> Option<Contact> {
        self.contact.clone()
    }

    async fn request_permissions(&self, kinds: &[PermissionKind]) -> PermissionGrants {
        PermissionGrants::from_map(
            kinds
                .iter()
                .map(|kind| (*kind, self.grants.is_granted(*kind)))
                .collect(),
        )
    }

    fn check_permissions(&self) -> PermissionGrants {
        self.grants.clone()
    }
}
