//! Authenticated, encrypted, retried vendor calls.
//!
//! Both surfaces share one attempt loop: capture the body once, then for each
//! attempt seal a fresh envelope from the same bytes, attach the current bearer
//! credential, send, and let the surface's `CallPolicy` turn the outcome into
//! a `Step`. Attempts run back to back with no delay.

mod card_control;
mod general;
mod service;

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{
    ACCEPT, AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, HOST, HeaderName, HeaderValue,
    TRANSFER_ENCODING,
};
use http::{HeaderMap, Method, StatusCode};
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::Instrument;
use vendor_auth::{CredentialError, CredentialManager};
use vendor_http::{BoxError, Transport, TransportError, VendorRequest, VendorResponse};

use crate::cipher::{CipherError, PayloadCipher, VendorSurface};
use crate::classifier::Classification;
use crate::error::GatewayError;

pub use card_control::CardControlInterceptor;
pub use general::GeneralInterceptor;
pub use service::InterceptorService;

/// Correlation headers set by the BFF's inbound middleware. Never forwarded.
pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const USER_ID_HEADER: &str = "x-user-id";
pub const APP_VERSION_HEADER: &str = "x-app-version";

const INTERNAL_HEADERS: [&str; 3] = [REQUEST_ID_HEADER, USER_ID_HEADER, APP_VERSION_HEADER];

/// Per-call card-control transaction id.
pub const TRANSACTION_ID_HEADER: &str = "x-transaction-id";

const APPLICATION_JSON: &str = "application/json";

/// Caller identity used only for log correlation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallerContext {
    pub request_id: Option<String>,
    pub user_id: Option<String>,
    pub app_version: Option<String>,
}

impl CallerContext {
    /// Remove the internal headers from `headers` and keep their values.
    fn take_from(headers: &mut HeaderMap) -> Self {
        let mut take = |name: &str| {
            headers
                .remove(name)
                .and_then(|v| v.to_str().ok().map(str::to_owned))
        };
        Self {
            request_id: take(REQUEST_ID_HEADER),
            user_id: take(USER_ID_HEADER),
            app_version: take(APP_VERSION_HEADER),
        }
    }
}

/// A logical call with its body captured into immutable bytes.
///
/// Built once before the first attempt. Every attempt reads `body` through a
/// cheap [`Bytes`] clone; the original request stream is never touched again.
#[derive(Debug, Clone)]
pub struct PreparedCall {
    method: Method,
    path: String,
    query: Option<String>,
    headers: HeaderMap,
    body: Bytes,
    context: CallerContext,
}

impl PreparedCall {
    /// A call to `path_and_query` relative to the surface's base URL.
    /// A missing leading `/` is added so the path never merges into the host.
    #[must_use]
    pub fn new(method: Method, path_and_query: &str, body: impl Into<Bytes>) -> Self {
        let (path, query) = match path_and_query.split_once('?') {
            Some((p, q)) => (p, Some(q.to_owned())),
            None => (path_and_query, None),
        };
        let path = if path.starts_with('/') {
            path.to_owned()
        } else {
            format!("/{path}")
        };
        Self {
            method,
            path,
            query,
            headers: HeaderMap::new(),
            body: body.into(),
            context: CallerContext::default(),
        }
    }

    #[must_use]
    pub fn with_context(mut self, context: CallerContext) -> Self {
        self.context = context;
        self
    }

    /// Extra header forwarded to the vendor on every attempt.
    ///
    /// Internal correlation headers are recorded in [`CallerContext`] instead.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        let slot = match name.as_str() {
            REQUEST_ID_HEADER => &mut self.context.request_id,
            USER_ID_HEADER => &mut self.context.user_id,
            APP_VERSION_HEADER => &mut self.context.app_version,
            _ => {
                self.headers.insert(name, value);
                return self;
            }
        };
        *slot = value.to_str().ok().map(str::to_owned);
        self
    }

    /// Drain `request` into a prepared call.
    ///
    /// Only the path and query of the request URI are kept; the host comes from
    /// the interceptor's base URL. Internal correlation headers move into
    /// [`CallerContext`]; framing and auth headers are dropped because every
    /// attempt sets its own.
    ///
    /// # Errors
    /// Returns [`GatewayError::Body`] if the body stream fails.
    pub async fn from_request<B>(request: http::Request<B>) -> Result<Self, GatewayError>
    where
        B: http_body::Body + Send,
        B::Data: Send,
        B::Error: Into<BoxError>,
    {
        let (parts, body) = request.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| GatewayError::Body(e.into()))?
            .to_bytes();

        let mut headers = parts.headers;
        let context = CallerContext::take_from(&mut headers);
        for name in [CONTENT_LENGTH, TRANSFER_ENCODING, HOST, AUTHORIZATION] {
            headers.remove(name);
        }

        Ok(Self {
            method: parts.method,
            path: parts.uri.path().to_owned(),
            query: parts.uri.query().map(str::to_owned),
            headers,
            body,
            context,
        })
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    #[must_use]
    pub fn context(&self) -> &CallerContext {
        &self.context
    }

    fn url(&self, base_url: &str) -> String {
        match &self.query {
            Some(q) => format!("{base_url}{}?{q}", self.path),
            None => format!("{base_url}{}", self.path),
        }
    }
}

/// How the body of a [`GatewayResponse`] was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseDisposition {
    /// Decrypted from the vendor envelope.
    Decrypted,
    /// Vendor sent plaintext (unencrypted path, or a raw success object).
    Plaintext,
    /// Non-200/401 fintech response returned as-is. The caller must inspect
    /// `status`.
    Unclassified,
}

/// Terminal response of a logical call.
#[derive(Debug, Clone)]
pub struct GatewayResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub disposition: ResponseDisposition,
}

impl GatewayResponse {
    fn from_vendor(response: VendorResponse, disposition: ResponseDisposition) -> Self {
        Self {
            status: response.status,
            headers: response.headers,
            body: response.body,
            disposition,
        }
    }

    /// Decode the body as JSON.
    ///
    /// # Errors
    /// Returns [`GatewayError::Decode`] if the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, GatewayError> {
        serde_json::from_slice(&self.body).map_err(GatewayError::Decode)
    }
}

/// One logical vendor call, end to end.
#[async_trait]
pub trait Interceptor: Send + Sync {
    fn surface(&self) -> VendorSurface;

    /// Run the call to a terminal outcome.
    ///
    /// # Errors
    /// Any [`GatewayError`]; retriable failures arrive wrapped in
    /// [`GatewayError::AttemptsExhausted`].
    async fn execute(&self, call: PreparedCall) -> Result<GatewayResponse, GatewayError>;
}

/// What the attempt loop does next.
pub(crate) enum Step {
    Done(GatewayResponse),
    Fail(GatewayError),
    Retry(GatewayError),
    Reauthenticate,
}

/// Per-call decisions made before the first attempt.
pub(crate) struct CallPlan {
    pub(crate) encrypt: bool,
    pub(crate) transaction_id: Option<String>,
}

/// The part of an interceptor that differs between surfaces.
pub(crate) trait CallPolicy: Send + Sync {
    const SURFACE: VendorSurface;

    fn plan(&self, call: &PreparedCall) -> CallPlan;

    fn on_transport_error(&self, error: TransportError, attempt: u32) -> Step;

    fn on_response(
        &self,
        call: &PreparedCall,
        plan: &CallPlan,
        cipher: &PayloadCipher,
        response: VendorResponse,
    ) -> Step;
}

/// Shared retry machinery.
pub(crate) struct AttemptLoop {
    transport: Arc<dyn Transport>,
    credentials: Arc<CredentialManager>,
    cipher: Arc<PayloadCipher>,
    base_url: String,
    max_attempts: u32,
}

impl AttemptLoop {
    pub(crate) fn new(
        surface: VendorSurface,
        transport: Arc<dyn Transport>,
        credentials: Arc<CredentialManager>,
        cipher: Arc<PayloadCipher>,
        base_url: &str,
        max_attempts: u32,
    ) -> Result<Self, GatewayError> {
        cipher.ensure_surface(surface)?;
        if max_attempts == 0 {
            return Err(GatewayError::Config("max_attempts must be at least 1".into()));
        }
        url::Url::parse(base_url).map_err(|e| {
            GatewayError::Config(format!("invalid {surface} base URL '{base_url}': {e}"))
        })?;

        Ok(Self {
            transport,
            credentials,
            cipher,
            base_url: base_url.trim_end_matches('/').to_owned(),
            max_attempts,
        })
    }

    pub(crate) async fn run<P: CallPolicy>(
        &self,
        policy: &P,
        call: &PreparedCall,
    ) -> Result<GatewayResponse, GatewayError> {
        let ctx = call.context();
        let span = tracing::info_span!(
            "vendor_call",
            surface = %P::SURFACE,
            method = %call.method,
            path = %call.path,
            request_id = ctx.request_id.as_deref().unwrap_or("-"),
            user_id = ctx.user_id.as_deref().unwrap_or("-"),
            app_version = ctx.app_version.as_deref().unwrap_or("-"),
        );
        self.attempt_all(policy, call).instrument(span).await
    }

    async fn attempt_all<P: CallPolicy>(
        &self,
        policy: &P,
        call: &PreparedCall,
    ) -> Result<GatewayResponse, GatewayError> {
        let plan = policy.plan(call);
        let url = call.url(&self.base_url);
        let mut bearer = self.bearer().await?;
        let mut last = None;

        for attempt in 1..=self.max_attempts {
            let request = self.build_request(call, &plan, &url, &bearer)?;
            tracing::debug!(attempt, max_attempts = self.max_attempts, "sending vendor request");

            let step = match self.transport.execute(request).await {
                Ok(response) => policy.on_response(call, &plan, &self.cipher, response),
                Err(error) => policy.on_transport_error(error, attempt),
            };

            match step {
                Step::Done(response) => {
                    tracing::debug!(
                        attempt,
                        status = response.status.as_u16(),
                        disposition = ?response.disposition,
                        "vendor call completed"
                    );
                    return Ok(response);
                }
                Step::Fail(error) => {
                    tracing::warn!(attempt, error = %error, "vendor call failed");
                    return Err(error);
                }
                Step::Retry(error) => {
                    tracing::warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %error,
                        "vendor attempt failed"
                    );
                    last = Some(error);
                }
                Step::Reauthenticate => {
                    tracing::warn!(attempt, "vendor rejected bearer credential, refreshing");
                    self.credentials.invalidate_credential().await?;
                    bearer = self.bearer().await?;
                    last = Some(GatewayError::AuthExpired);
                }
            }
        }

        match last {
            Some(last) => {
                tracing::error!(
                    attempts = self.max_attempts,
                    error = %last,
                    "vendor call attempts exhausted"
                );
                Err(GatewayError::AttemptsExhausted {
                    attempts: self.max_attempts,
                    last: Box::new(last),
                })
            }
            None => Err(GatewayError::Config("max_attempts must be at least 1".into())),
        }
    }

    async fn bearer(&self) -> Result<HeaderValue, GatewayError> {
        let credential = self.credentials.get_credential().await?;
        credential.bearer_header().map_err(|_| {
            GatewayError::Credential(CredentialError::InvalidResponse(
                "access token is not a valid header value".into(),
            ))
        })
    }

    /// Fresh wire request for one attempt. The envelope is sealed anew from
    /// the captured plaintext every time.
    fn build_request(
        &self,
        call: &PreparedCall,
        plan: &CallPlan,
        url: &str,
        bearer: &HeaderValue,
    ) -> Result<VendorRequest, GatewayError> {
        let body = if plan.encrypt {
            self.cipher
                .encrypt(&call.body, plan.transaction_id.as_deref())?
                .to_body()?
        } else {
            call.body.clone()
        };

        let mut headers = call.headers.clone();
        for name in INTERNAL_HEADERS {
            headers.remove(name);
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
        headers.insert(ACCEPT, HeaderValue::from_static(APPLICATION_JSON));
        headers.insert(AUTHORIZATION, bearer.clone());
        if let Some(txn) = &plan.transaction_id {
            let value = HeaderValue::from_str(txn)
                .map_err(|e| TransportError::RequestBuild(e.into()))?;
            headers.insert(TRANSACTION_ID_HEADER, value);
        }

        Ok(VendorRequest::new(call.method.clone(), url)
            .with_headers(headers)
            .with_body(body))
    }
}

/// Result of opening a 200 body.
pub(crate) enum Opened {
    Decrypted(GatewayResponse),
    /// Body was not an envelope but parsed as a vendor error object.
    Raw(GatewayResponse, Classification),
}

/// Decrypt a 200 response, falling back to reading the raw body as a vendor
/// error object when the envelope field is missing.
pub(crate) fn open_response(
    cipher: &PayloadCipher,
    response: VendorResponse,
    transaction_id: Option<&str>,
    parse_raw: impl FnOnce(&[u8]) -> Option<Classification>,
) -> Result<Opened, GatewayError> {
    match cipher.decrypt(&response.body, transaction_id) {
        Ok(plaintext) => {
            let mut opened = GatewayResponse::from_vendor(response, ResponseDisposition::Decrypted);
            opened.body = Bytes::from(plaintext);
            Ok(Opened::Decrypted(opened))
        }
        Err(CipherError::MissingEnvelope) => {
            let Some(classification) = parse_raw(&response.body) else {
                return Err(CipherError::MissingEnvelope.into());
            };
            tracing::debug!("vendor sent an unencrypted body, classifying it as-is");
            Ok(Opened::Raw(
                GatewayResponse::from_vendor(response, ResponseDisposition::Plaintext),
                classification,
            ))
        }
        Err(e) => Err(e.into()),
    }
}

/// Map a classification of `response` onto the next step.
pub(crate) fn settle(response: GatewayResponse, classification: Classification) -> Step {
    match classification {
        Classification::Success => Step::Done(response),
        Classification::Retriable(e) => Step::Retry(GatewayError::VendorRetriable(e)),
        Classification::Fatal(e) => Step::Fail(GatewayError::VendorFatal(e)),
    }
}
