use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};

use crate::error::TransportError;

/// One attempt's wire request.
///
/// The body is an immutable [`Bytes`] handle; retrying means building a new
/// `VendorRequest` around a clone of the same handle, never re-reading a stream.
#[derive(Debug, Clone)]
pub struct VendorRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl VendorRequest {
    #[must_use]
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    #[must_use]
    pub fn with_body(mut self, body: Bytes) -> Self {
        self.body = body;
        self
    }

    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }
}

/// Fully buffered vendor response.
#[derive(Debug, Clone)]
pub struct VendorResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl VendorResponse {
    #[must_use]
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Body as UTF-8 text, lossy.
    #[must_use]
    pub fn text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// The capability of sending one request and getting one response.
///
/// Implemented by [`crate::HyperTransport`] in production and by scripted
/// doubles in tests.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform a single network exchange.
    ///
    /// # Errors
    /// Returns [`TransportError`] when no HTTP response was obtained. Any
    /// status code, including 4xx/5xx, is a successful exchange.
    async fn execute(&self, request: VendorRequest) -> Result<VendorResponse, TransportError>;
}
