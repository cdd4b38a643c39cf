use thiserror::Error;
use vendor_auth::CredentialError;
use vendor_http::{BoxError, TransportError};

use crate::cipher::CipherError;
use crate::classifier::ClassifiedError;

/// Failure of one logical vendor call.
///
/// A non-200/401 fintech response is not an error: it comes back as a
/// [`GatewayResponse`](crate::GatewayResponse) with an `Unclassified`
/// disposition.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GatewayError {
    #[error("vendor transport failure: {0}")]
    Transport(#[from] TransportError),

    /// Vendor answered 401 to the bearer credential.
    #[error("vendor rejected the bearer credential")]
    AuthExpired,

    #[error("transient vendor error {0}")]
    VendorRetriable(ClassifiedError),

    #[error("vendor error {0}")]
    VendorFatal(ClassifiedError),

    #[error("payload cipher error: {0}")]
    Cipher(#[from] CipherError),

    #[error("credential error: {0}")]
    Credential(#[from] CredentialError),

    /// Card-control status with no defined meaning (400/404/408 and others),
    /// or a fintech passthrough seen by a typed caller.
    #[error("unexpected vendor status {status}")]
    UnexpectedStatus { status: u16 },

    #[error("vendor call failed after {attempts} attempts: {last}")]
    AttemptsExhausted {
        attempts: u32,
        #[source]
        last: Box<GatewayError>,
    },

    #[error("failed to encode request payload: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode vendor payload: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("failed to read request body: {0}")]
    Body(#[source] BoxError),

    #[error("gateway config error: {0}")]
    Config(String),
}

impl GatewayError {
    /// The classified vendor error behind this failure, looking through
    /// attempt exhaustion.
    #[must_use]
    pub fn vendor_error(&self) -> Option<&ClassifiedError> {
        match self {
            Self::VendorRetriable(e) | Self::VendorFatal(e) => Some(e),
            Self::AttemptsExhausted { last, .. } => last.vendor_error(),
            _ => None,
        }
    }

    /// Message safe to show to the customer, when the vendor provided one.
    #[must_use]
    pub fn user_message(&self) -> Option<&str> {
        self.vendor_error().map(ClassifiedError::user_message)
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::AttemptsExhausted { .. })
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use std::error::Error as _;

    fn classified(retriable: bool) -> ClassifiedError {
        ClassifiedError {
            vendor_code: "96".into(),
            vendor_message: "raw".into(),
            override_message: Some("Please try again.".into()),
            retriable,
        }
    }

    #[test]
    fn exhaustion_exposes_last_vendor_error() {
        let err = GatewayError::AttemptsExhausted {
            attempts: 3,
            last: Box::new(GatewayError::VendorRetriable(classified(true))),
        };
        assert!(err.is_exhausted());
        assert_eq!(err.user_message(), Some("Please try again."));
        assert!(err.source().is_some());
        assert_eq!(
            err.to_string(),
            "vendor call failed after 3 attempts: transient vendor error [96] Please try again."
        );
    }

    #[test]
    fn transport_error_has_no_user_message() {
        let err = GatewayError::from(TransportError::Connect("refused".into()));
        assert!(err.user_message().is_none());
        assert!(!err.is_exhausted());
    }
}
