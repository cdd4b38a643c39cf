//! Resilient client for the core-banking vendor gateway.
//!
//! Two surfaces sit behind the same vendor: the fintech/UPI gateway and the
//! card-control gateway. Every call to either one
//!
//! - carries a bearer credential from the shared [`CredentialManager`](vendor_auth::CredentialManager),
//! - has its JSON body sealed into an `{"encryptRes": ...}` envelope with the
//!   surface's own key,
//! - is retried on transport failures and transient vendor codes, and
//!   re-authenticated once per 401.
//!
//! [`VendorClient`] is the typed entry point. [`GeneralInterceptor`] and
//! [`CardControlInterceptor`] take raw [`PreparedCall`]s, and
//! [`InterceptorService`] exposes either one as a `tower::Service`.
//!
//! ```no_run
//! # async fn demo(config: vendor_gateway::GatewayConfig) -> Result<(), vendor_gateway::GatewayError> {
//! use std::sync::Arc;
//! use vendor_auth::InMemoryCredentialStore;
//! use vendor_gateway::{CallerContext, VendorClient, dto::ListKeysRequest};
//!
//! let client = VendorClient::from_config(&config, Arc::new(InMemoryCredentialStore::new()))?;
//! let keys = client
//!     .list_keys(&ListKeysRequest::default(), &CallerContext::default())
//!     .await?;
//! # let _ = keys;
//! # Ok(())
//! # }
//! ```
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

pub mod cipher;
pub mod classifier;
mod client;
mod config;
pub mod dto;
mod error;
pub mod interceptor;
pub mod paths;

pub use cipher::{CipherError, Envelope, PayloadCipher, VendorSurface};
pub use classifier::{Classification, ClassifiedError};
pub use client::VendorClient;
pub use config::{DEFAULT_MAX_ATTEMPTS, GatewayConfig};
pub use error::GatewayError;
pub use interceptor::{
    CallerContext, CardControlInterceptor, GatewayResponse, GeneralInterceptor, Interceptor,
    InterceptorService, PreparedCall, ResponseDisposition,
};
