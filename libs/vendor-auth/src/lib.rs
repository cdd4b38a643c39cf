#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Bearer credential handling for the vendor gateway.
//!
//! [`CredentialManager`] runs the OAuth 2.0 client-credentials grant against the
//! vendor token endpoint and caches the result in an injected
//! [`CredentialStore`]. The cache is shared state: every replica reads the same
//! key, and a 401 from any vendor call invalidates it for all of them.

mod config;
mod credential;
mod error;
mod manager;
mod secret;
mod store;

pub use config::{CredentialConfig, DEFAULT_CACHE_KEY, DEFAULT_TOKEN_PATH};
pub use credential::Credential;
pub use error::CredentialError;
pub use manager::CredentialManager;
pub use secret::SecretString;
pub use store::{CredentialStore, InMemoryCredentialStore, StoreError};
