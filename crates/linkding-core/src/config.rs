//! Connection configuration and persisted client settings.
//!
//! `Configuration` is the validated pair of server URL and API token that a
//! `LinkdingApi` is built from. `Settings` is what survives between runs:
//! the server URL and a preferred search page size, stored at
//! `~/.config/linkding-client/config.json`. The token is kept out of that
//! file and lives in the OS keychain instead (see `auth::CredentialStore`).

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use reqwest::header::HeaderValue;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::SearchOptions;

/// Application name used for the config directory path
const APP_NAME: &str = "linkding-client";

/// Config file name
const CONFIG_FILE: &str = "config.json";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("No server URL configured")]
    MissingBaseUrl,

    #[error("Invalid server URL: {0}")]
    InvalidBaseUrl(String),

    #[error("No API token configured")]
    MissingToken,

    #[error("API token contains characters that cannot be sent in a header")]
    InvalidToken,
}

/// Trim whitespace and trailing slashes from a server URL.
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

/// Server URL and API token for one linkding instance.
#[derive(Clone, PartialEq, Eq)]
pub struct Configuration {
    base_url: String,
    token: String,
    authorization: HeaderValue,
}

impl Configuration {
    /// Validate and build a configuration. Trailing slashes on the URL are
    /// dropped so endpoint paths can be appended directly.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self, ConfigError> {
        let base_url = normalize_base_url(&base_url.into());
        if base_url.is_empty() {
            return Err(ConfigError::MissingBaseUrl);
        }

        let parsed = Url::parse(&base_url)
            .map_err(|e| ConfigError::InvalidBaseUrl(format!("{}: {}", base_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidBaseUrl(format!(
                "{}: scheme must be http or https",
                base_url
            )));
        }
        if !parsed.has_host() {
            return Err(ConfigError::InvalidBaseUrl(format!("{}: missing host", base_url)));
        }
        if parsed.query().is_some() || parsed.fragment().is_some() {
            return Err(ConfigError::InvalidBaseUrl(format!(
                "{}: must not contain a query or fragment",
                base_url
            )));
        }

        let token = token.into().trim().to_string();
        if token.is_empty() {
            return Err(ConfigError::MissingToken);
        }
        let mut authorization = HeaderValue::from_str(&format!("Token {}", token))
            .map_err(|_| ConfigError::InvalidToken)?;
        authorization.set_sensitive(true);

        Ok(Self {
            base_url,
            token,
            authorization,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Host permission pattern covering every endpoint of the server.
    pub fn origin_pattern(&self) -> String {
        format!("{}/*", self.base_url)
    }

    pub(crate) fn authorization(&self) -> &HeaderValue {
        &self.authorization
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Settings {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub search_limit: Option<u32>,
}

impl Settings {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            limit: self.search_limit,
        }
    }

    /// Build a connection configuration from the stored URL and a token.
    pub fn configuration(&self, token: &str) -> Result<Configuration, ConfigError> {
        let base_url = self.base_url.as_deref().ok_or(ConfigError::MissingBaseUrl)?;
        Configuration::new(base_url, token)
    }
}
