use thiserror::Error;
use vendor_http::TransportError;

use crate::store::StoreError;

/// Failure to produce a bearer credential.
///
/// No variant carries the client secret or an access token.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CredentialError {
    /// Token endpoint answered 401: the client credentials are wrong.
    #[error("vendor rejected client credentials (HTTP 401)")]
    Unauthorized,

    /// Token endpoint answered 403.
    #[error("vendor refused to issue a token (HTTP 403)")]
    Forbidden,

    /// Token endpoint answered 400 with an OAuth 2.0 error object.
    #[error("vendor token error '{error}': {description}")]
    Vendor { error: String, description: String },

    /// Any other non-200 status from the token endpoint.
    #[error("unexpected token endpoint status {status}")]
    UnknownVendorError { status: u16 },

    #[error("token request failed: {0}")]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid token response: {0}")]
    InvalidResponse(String),

    #[error("credential config error: {0}")]
    Config(String),
}
