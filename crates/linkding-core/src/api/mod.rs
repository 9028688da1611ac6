//! REST API client module for linkding servers.
//!
//! This module provides the `LinkdingApi` client for bookmark, tag, search
//! and profile requests against a single linkding instance.
//!
//! The API uses token authentication (`Authorization: Token <token>`); the
//! token is created in the linkding settings page.

pub mod client;
pub mod error;

pub use client::LinkdingApi;
pub use error::{ApiError, Operation};
