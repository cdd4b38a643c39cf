use std::time::Duration;
use thiserror::Error;

/// Boxed error source preserved inside transport failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure to complete one network exchange with the vendor.
///
/// Every variant describes a problem below the HTTP status line: the request
/// never produced a response the caller could classify.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TransportError {
    /// Host name could not be resolved
    #[error("DNS resolution failed for '{host}': {source}")]
    Dns {
        host: String,
        #[source]
        source: BoxError,
    },

    /// Attempt did not complete within the configured timeout
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// TCP connect failed, connection reset, etc.
    #[error("connection failed: {0}")]
    Connect(#[source] BoxError),

    /// TLS setup or handshake error
    #[error("TLS error: {0}")]
    Tls(#[source] BoxError),

    /// Response body exceeded the configured limit
    #[error("response body too large: limit {limit} bytes")]
    BodyTooLarge { limit: usize },

    /// URL could not be parsed or lacks scheme/host
    #[error("invalid URL '{url}': {reason}")]
    InvalidUri { url: String, reason: String },

    /// URL scheme rejected by the transport security mode
    #[error("URL scheme '{scheme}' not allowed: {reason}")]
    InvalidScheme { scheme: String, reason: String },

    /// Request could not be assembled
    #[error("failed to build request: {0}")]
    RequestBuild(#[from] http::Error),

    /// Any other transport failure
    #[error("transport error: {0}")]
    Other(#[source] BoxError),
}

impl TransportError {
    #[must_use]
    pub fn is_dns(&self) -> bool {
        matches!(self, Self::Dns { .. })
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Map a hyper-util client error, separating DNS failures from other
    /// connect failures.
    pub(crate) fn from_client_error(err: hyper_util::client::legacy::Error, host: &str) -> Self {
        if err.is_connect() {
            if chain_mentions(&err, "dns error") {
                return Self::Dns {
                    host: host.to_owned(),
                    source: Box::new(err),
                };
            }
            return Self::Connect(Box::new(err));
        }
        Self::Other(Box::new(err))
    }
}

/// Walk the source chain looking for a message fragment.
///
/// hyper-util reports resolver failures as a `ConnectError` whose display
/// text is `dns error`; there is no typed accessor for it.
fn chain_mentions(err: &(dyn std::error::Error + 'static), needle: &str) -> bool {
    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = current {
        if e.to_string().to_ascii_lowercase().contains(needle) {
            return true;
        }
        current = e.source();
    }
    false
}
