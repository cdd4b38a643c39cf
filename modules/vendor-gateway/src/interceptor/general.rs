use async_trait::async_trait;
use http::StatusCode;
use std::sync::Arc;
use vendor_auth::CredentialManager;
use vendor_http::{Transport, TransportError, VendorResponse};

use super::{
    AttemptLoop, CallPlan, CallPolicy, GatewayResponse, Interceptor, Opened, PreparedCall,
    ResponseDisposition, Step, open_response, settle,
};
use crate::cipher::{PayloadCipher, VendorSurface};
use crate::classifier::{classify_body, classify_raw_error};
use crate::error::GatewayError;
use crate::paths;

/// Interceptor for the fintech/UPI gateway.
///
/// - the token path travels in plaintext and its 200 body is returned raw
/// - list-keys, transaction-history and beneficiary-registration bodies are
///   decrypted but not classified
/// - any status other than 200 or 401 is handed back unchanged, without retry
pub struct GeneralInterceptor {
    attempts: AttemptLoop,
}

impl GeneralInterceptor {
    /// # Errors
    /// Returns [`GatewayError::Cipher`] if `cipher` is not the fintech cipher,
    /// or [`GatewayError::Config`] for a bad base URL or zero attempts.
    pub fn new(
        transport: Arc<dyn Transport>,
        credentials: Arc<CredentialManager>,
        cipher: Arc<PayloadCipher>,
        base_url: &str,
        max_attempts: u32,
    ) -> Result<Self, GatewayError> {
        Ok(Self {
            attempts: AttemptLoop::new(
                VendorSurface::Fintech,
                transport,
                credentials,
                cipher,
                base_url,
                max_attempts,
            )?,
        })
    }
}

impl std::fmt::Debug for GeneralInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneralInterceptor")
            .field("base_url", &self.attempts.base_url)
            .field("max_attempts", &self.attempts.max_attempts)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Interceptor for GeneralInterceptor {
    fn surface(&self) -> VendorSurface {
        Self::SURFACE
    }

    async fn execute(&self, call: PreparedCall) -> Result<GatewayResponse, GatewayError> {
        self.attempts.run(self, &call).await
    }
}

impl CallPolicy for GeneralInterceptor {
    const SURFACE: VendorSurface = VendorSurface::Fintech;

    fn plan(&self, call: &PreparedCall) -> CallPlan {
        CallPlan {
            encrypt: !paths::is_unencrypted(call.path()),
            transaction_id: None,
        }
    }

    fn on_transport_error(&self, error: TransportError, attempt: u32) -> Step {
        tracing::warn!(attempt, error = %error, "vendor transport failure");
        Step::Retry(error.into())
    }

    fn on_response(
        &self,
        call: &PreparedCall,
        plan: &CallPlan,
        cipher: &PayloadCipher,
        response: VendorResponse,
    ) -> Step {
        match response.status {
            StatusCode::OK if !plan.encrypt => Step::Done(GatewayResponse::from_vendor(
                response,
                ResponseDisposition::Plaintext,
            )),
            StatusCode::OK => match open_response(cipher, response, None, classify_raw_error) {
                Err(e) => Step::Fail(e),
                Ok(Opened::Raw(raw, classification)) => settle(raw, classification),
                Ok(Opened::Decrypted(decrypted)) if paths::is_unclassified(call.path()) => {
                    tracing::debug!("classification skipped for this path");
                    Step::Done(decrypted)
                }
                Ok(Opened::Decrypted(decrypted)) => {
                    let classification = classify_body(&decrypted.body);
                    settle(decrypted, classification)
                }
            },
            StatusCode::UNAUTHORIZED => Step::Reauthenticate,
            status => {
                tracing::info!(
                    status = status.as_u16(),
                    "passing vendor response through unclassified"
                );
                Step::Done(GatewayResponse::from_vendor(
                    response,
                    ResponseDisposition::Unclassified,
                ))
            }
        }
    }
}
