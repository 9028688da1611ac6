use anyhow::{Context, Result};
use keyring::Entry;

use crate::config::normalize_base_url;

const SERVICE_NAME: &str = "linkding-client";

/// API tokens in the OS keychain, keyed by server base URL.
///
/// The URL is normalized before it becomes the keychain account, so
/// `https://host/` and `https://host` share one entry.
pub struct CredentialStore;

impl CredentialStore {
    /// Keychain account name for a server URL
    pub fn account(base_url: &str) -> Result<String> {
        let account = normalize_base_url(base_url);
        if account.is_empty() {
            anyhow::bail!("Cannot store a token without a server URL");
        }
        Ok(account)
    }

    fn entry(base_url: &str) -> Result<Entry> {
        Entry::new(SERVICE_NAME, &Self::account(base_url)?)
            .context("Failed to create keyring entry")
    }

    /// Store the API token for a server. Surrounding whitespace from a
    /// pasted token is dropped.
    pub fn store(base_url: &str, token: &str) -> Result<()> {
        let token = token.trim();
        if token.is_empty() {
            anyhow::bail!("Refusing to store an empty API token");
        }
        Self::entry(base_url)?
            .set_password(token)
            .context("Failed to store token in keychain")?;
        Ok(())
    }

    /// Retrieve the API token for a server
    pub fn get_token(base_url: &str) -> Result<String> {
        Self::entry(base_url)?
            .get_password()
            .context("Failed to retrieve token from keychain")
    }

    /// Delete the stored token for a server. A missing entry counts as
    /// already deleted.
    pub fn delete(base_url: &str) -> Result<()> {
        match Self::entry(base_url)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete token from keychain"),
        }
    }

    /// Check if a token exists for a server
    pub fn has_token(base_url: &str) -> bool {
        Self::entry(base_url)
            .map(|entry| entry.get_password().is_ok())
            .unwrap_or(false)
    }
}
