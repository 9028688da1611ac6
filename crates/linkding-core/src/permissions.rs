//! Host permission seam.
//!
//! A browser extension has to ask the browser for access to the linkding
//! origin before it can reach it. The client only consumes that facility,
//! so it is expressed as a trait the host supplies.

use async_trait::async_trait;

#[async_trait]
pub trait PermissionBroker: Send + Sync {
    /// Ask for access to the given origin patterns (e.g. `https://host/*`).
    /// Returns whether access was granted.
    async fn request(&self, origins: &[String]) -> bool;
}

/// Broker for hosts without a permission model, such as the CLI.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoGrant;

#[async_trait]
impl PermissionBroker for AutoGrant {
    async fn request(&self, _origins: &[String]) -> bool {
        true
    }
}
