use async_trait::async_trait;
use http::StatusCode;
use std::sync::Arc;
use uuid::Uuid;
use vendor_auth::CredentialManager;
use vendor_http::{Transport, TransportError, VendorResponse};

use super::{
    AttemptLoop, CallPlan, CallPolicy, GatewayResponse, Interceptor, Opened, PreparedCall, Step,
    TRANSACTION_ID_HEADER, open_response, settle,
};
use crate::cipher::{PayloadCipher, VendorSurface};
use crate::classifier::{classify_card_body, classify_raw_card_error};
use crate::error::GatewayError;

/// Interceptor for the card-control gateway.
///
/// Every logical call gets one `X-Transaction-ID` (UUID v4), sent on each
/// attempt and bound into the envelope. The header is removed from the
/// response before it reaches the caller. Unlike the fintech surface, every
/// non-200/401 status is retried.
pub struct CardControlInterceptor {
    attempts: AttemptLoop,
}

impl CardControlInterceptor {
    /// # Errors
    /// Returns [`GatewayError::Cipher`] if `cipher` is not the card-control
    /// cipher, or [`GatewayError::Config`] for a bad base URL or zero attempts.
    pub fn new(
        transport: Arc<dyn Transport>,
        credentials: Arc<CredentialManager>,
        cipher: Arc<PayloadCipher>,
        base_url: &str,
        max_attempts: u32,
    ) -> Result<Self, GatewayError> {
        Ok(Self {
            attempts: AttemptLoop::new(
                VendorSurface::CardControl,
                transport,
                credentials,
                cipher,
                base_url,
                max_attempts,
            )?,
        })
    }
}

impl std::fmt::Debug for CardControlInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardControlInterceptor")
            .field("base_url", &self.attempts.base_url)
            .field("max_attempts", &self.attempts.max_attempts)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Interceptor for CardControlInterceptor {
    fn surface(&self) -> VendorSurface {
        Self::SURFACE
    }

    async fn execute(&self, call: PreparedCall) -> Result<GatewayResponse, GatewayError> {
        self.attempts.run(self, &call).await
    }
}

impl CallPolicy for CardControlInterceptor {
    const SURFACE: VendorSurface = VendorSurface::CardControl;

    fn plan(&self, _call: &PreparedCall) -> CallPlan {
        let transaction_id = Uuid::new_v4().to_string();
        tracing::debug!(transaction_id = %transaction_id, "card-control transaction id assigned");
        CallPlan {
            encrypt: true,
            transaction_id: Some(transaction_id),
        }
    }

    fn on_transport_error(&self, error: TransportError, attempt: u32) -> Step {
        if error.is_dns() {
            tracing::warn!(attempt, error = %error, "card-control host did not resolve");
        } else if error.is_timeout() {
            tracing::warn!(attempt, error = %error, "card-control request timed out");
        } else {
            tracing::warn!(attempt, error = %error, "card-control transport failure");
        }
        Step::Retry(error.into())
    }

    fn on_response(
        &self,
        _call: &PreparedCall,
        plan: &CallPlan,
        cipher: &PayloadCipher,
        mut response: VendorResponse,
    ) -> Step {
        response.headers.remove(TRANSACTION_ID_HEADER);
        let status = response.status;

        match status {
            StatusCode::OK => {
                let txn = plan.transaction_id.as_deref();
                match open_response(cipher, response, txn, classify_raw_card_error) {
                    Err(e) => Step::Fail(e),
                    Ok(Opened::Raw(raw, classification)) => settle(raw, classification),
                    Ok(Opened::Decrypted(decrypted)) => {
                        let classification = classify_card_body(&decrypted.body);
                        settle(decrypted, classification)
                    }
                }
            }
            StatusCode::UNAUTHORIZED => Step::Reauthenticate,
            StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND | StatusCode::REQUEST_TIMEOUT => {
                tracing::warn!(status = status.as_u16(), "card-control status marked retriable");
                Step::Retry(GatewayError::UnexpectedStatus {
                    status: status.as_u16(),
                })
            }
            other => {
                tracing::warn!(
                    status = other.as_u16(),
                    body_len = response.body.len(),
                    "unexpected card-control status, retrying"
                );
                Step::Retry(GatewayError::UnexpectedStatus {
                    status: other.as_u16(),
                })
            }
        }
    }
}
