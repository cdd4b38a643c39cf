use http::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use vendor_auth::{CredentialManager, CredentialStore};
use vendor_http::{HyperTransport, Transport};

use crate::cipher::{PayloadCipher, VendorSurface};
use crate::config::GatewayConfig;
use crate::dto::{
    BeneficiaryRegistrationRequest, BeneficiaryRegistrationResponse, BeneficiaryStatusRequest,
    BeneficiaryStatusResponse, CardControlRequest, CardControlResponse, ListKeysRequest,
    ListKeysResponse, TransactionHistoryRequest, TransactionHistoryResponse,
};
use crate::error::GatewayError;
use crate::interceptor::{
    CallerContext, CardControlInterceptor, GatewayResponse, GeneralInterceptor, Interceptor,
    PreparedCall, ResponseDisposition,
};
use crate::paths;

/// Typed entry point for the vendor endpoints the BFF uses.
///
/// One instance per process: the credential manager and both interceptors are
/// shared by every call.
#[derive(Debug)]
pub struct VendorClient {
    credentials: Arc<CredentialManager>,
    fintech: Arc<GeneralInterceptor>,
    card_control: Arc<CardControlInterceptor>,
}

impl VendorClient {
    /// Build the production stack: one pooled HTTPS transport shared by the
    /// token endpoint and both surfaces.
    ///
    /// # Errors
    /// Returns [`GatewayError`] if the config does not validate or the
    /// transport cannot be built.
    pub fn from_config(
        config: &GatewayConfig,
        store: Arc<dyn CredentialStore>,
    ) -> Result<Self, GatewayError> {
        config.validate()?;
        let transport: Arc<dyn Transport> = Arc::new(HyperTransport::new(config.http.clone())?);
        Self::with_transport(config, transport, store)
    }

    /// Same as [`from_config`](Self::from_config) over a caller-supplied
    /// transport.
    ///
    /// # Errors
    /// Returns [`GatewayError`] if the config does not validate.
    pub fn with_transport(
        config: &GatewayConfig,
        transport: Arc<dyn Transport>,
        store: Arc<dyn CredentialStore>,
    ) -> Result<Self, GatewayError> {
        config.validate()?;
        let credentials = Arc::new(CredentialManager::new(
            Arc::clone(&transport),
            store,
            config.credentials.clone(),
        )?);
        let fintech_cipher = Arc::new(PayloadCipher::new(
            VendorSurface::Fintech,
            &config.fintech_secret,
        )?);
        let card_cipher = Arc::new(PayloadCipher::new(
            VendorSurface::CardControl,
            &config.card_control_secret,
        )?);

        let fintech = GeneralInterceptor::new(
            Arc::clone(&transport),
            Arc::clone(&credentials),
            fintech_cipher,
            &config.base_url,
            config.max_attempts,
        )?;
        let card_control = CardControlInterceptor::new(
            transport,
            Arc::clone(&credentials),
            card_cipher,
            config.card_control_base_url(),
            config.max_attempts,
        )?;

        tracing::info!(
            base_url = %config.base_url,
            card_control_base_url = %config.card_control_base_url(),
            max_attempts = config.max_attempts,
            "vendor client ready"
        );

        Ok(Self {
            credentials,
            fintech: Arc::new(fintech),
            card_control: Arc::new(card_control),
        })
    }

    #[must_use]
    pub fn credentials(&self) -> &Arc<CredentialManager> {
        &self.credentials
    }

    /// Raw fintech interceptor, e.g. to wrap in an
    /// [`InterceptorService`](crate::InterceptorService).
    #[must_use]
    pub fn fintech(&self) -> &Arc<GeneralInterceptor> {
        &self.fintech
    }

    #[must_use]
    pub fn card_control(&self) -> &Arc<CardControlInterceptor> {
        &self.card_control
    }

    /// POST `request` as JSON to a fintech path and decode the answer.
    ///
    /// # Errors
    /// Any [`GatewayError`]. A passthrough status becomes
    /// [`GatewayError::UnexpectedStatus`].
    pub async fn call_fintech<Req, Resp>(
        &self,
        path: &str,
        request: &Req,
        context: &CallerContext,
    ) -> Result<Resp, GatewayError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let response = call(self.fintech.as_ref(), path, request, context).await?;
        decode(&response)
    }

    /// POST `request` as JSON to a card-control path and decode the answer.
    ///
    /// # Errors
    /// Any [`GatewayError`].
    pub async fn call_card_control<Req, Resp>(
        &self,
        path: &str,
        request: &Req,
        context: &CallerContext,
    ) -> Result<Resp, GatewayError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let response = call(self.card_control.as_ref(), path, request, context).await?;
        decode(&response)
    }

    /// # Errors
    /// See [`call_fintech`](Self::call_fintech).
    pub async fn list_keys(
        &self,
        request: &ListKeysRequest,
        context: &CallerContext,
    ) -> Result<ListKeysResponse, GatewayError> {
        self.call_fintech(paths::LIST_KEYS, request, context).await
    }

    /// # Errors
    /// See [`call_fintech`](Self::call_fintech).
    pub async fn transaction_history(
        &self,
        request: &TransactionHistoryRequest,
        context: &CallerContext,
    ) -> Result<TransactionHistoryResponse, GatewayError> {
        self.call_fintech(paths::TRANSACTION_HISTORY, request, context)
            .await
    }

    /// # Errors
    /// See [`call_fintech`](Self::call_fintech).
    pub async fn register_beneficiary(
        &self,
        request: &BeneficiaryRegistrationRequest,
        context: &CallerContext,
    ) -> Result<BeneficiaryRegistrationResponse, GatewayError> {
        self.call_fintech(paths::BENEFICIARY_REGISTRATION, request, context)
            .await
    }

    /// # Errors
    /// See [`call_fintech`](Self::call_fintech).
    pub async fn beneficiary_status(
        &self,
        request: &BeneficiaryStatusRequest,
        context: &CallerContext,
    ) -> Result<BeneficiaryStatusResponse, GatewayError> {
        self.call_fintech(paths::BENEFICIARY_STATUS, request, context)
            .await
    }

    /// # Errors
    /// See [`call_card_control`](Self::call_card_control).
    pub async fn set_card_controls(
        &self,
        request: &CardControlRequest,
        context: &CallerContext,
    ) -> Result<CardControlResponse, GatewayError> {
        self.call_card_control(paths::CARD_CONTROLS, request, context)
            .await
    }
}

async fn call<I, Req>(
    interceptor: &I,
    path: &str,
    request: &Req,
    context: &CallerContext,
) -> Result<GatewayResponse, GatewayError>
where
    I: Interceptor,
    Req: Serialize + Sync,
{
    let body = serde_json::to_vec(request).map_err(GatewayError::Encode)?;
    let call = PreparedCall::new(Method::POST, path, body).with_context(context.clone());
    interceptor.execute(call).await
}

fn decode<T: DeserializeOwned>(response: &GatewayResponse) -> Result<T, GatewayError> {
    if response.disposition == ResponseDisposition::Unclassified {
        return Err(GatewayError::UnexpectedStatus {
            status: response.status.as_u16(),
        });
    }
    response.json()
}
