//! Core library for talking to a linkding bookmark server.
//!
//! - `api`: the `LinkdingApi` client and its error type
//! - `config`: validated connection `Configuration` and persisted `Settings`
//! - `auth`: OS keychain storage for API tokens
//! - `permissions`: the host permission seam used by the connection test
//! - `models`: opaque JSON payload aliases and search options

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod permissions;

pub use api::{ApiError, LinkdingApi, Operation};
pub use config::{ConfigError, Configuration, Settings};
pub use models::{Bookmark, SearchOptions, Tag, UserProfile};
pub use permissions::{AutoGrant, PermissionBroker};
