//! Token storage.
//!
//! `CredentialStore` keeps linkding API tokens in the OS keychain via
//! keyring, one entry per server URL.

pub mod credentials;

pub use credentials::CredentialStore;
