#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Outbound transport for vendor gateway calls.
//!
//! One capability, [`Transport`], with one operation: send a fully buffered
//! request and return a fully buffered response or a [`TransportError`].
//! [`HyperTransport`] is the production implementation:
//! - rustls TLS with webpki or OS roots (HTTPS only by default)
//! - connection pooling over HTTP/1.1 and HTTP/2
//! - one timeout per attempt, covering the body read
//! - response body size limit
//!
//! Retrying is the caller's job. A transport attempt never retries internally.

mod client;
mod config;
mod error;
mod tls;
mod transport;

pub use client::HyperTransport;
pub use config::{DEFAULT_USER_AGENT, HttpTransportConfig, TlsRootConfig, TransportSecurity};
pub use error::{BoxError, TransportError};
pub use transport::{Transport, VendorRequest, VendorResponse};
