#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use http::StatusCode;
use vendor_auth::{
    CredentialConfig, CredentialManager, CredentialStore, InMemoryCredentialStore, SecretString,
    StoreError,
};
use vendor_gateway::interceptor::TRANSACTION_ID_HEADER;
use vendor_gateway::{
    CardControlInterceptor, GatewayConfig, GeneralInterceptor, PayloadCipher, VendorSurface,
};
use vendor_http::{HttpTransportConfig, Transport, TransportError, VendorRequest, VendorResponse};

pub const BASE_URL: &str = "https://vendor.test";
pub const FINTECH_SECRET: &str = "fintech-shared-secret";
pub const CARD_SECRET: &str = "card-control-shared-secret";
pub const TOKEN_PATH: &str = "/nbfc/v1/oauth/cc/accesstoken";

pub type Responder =
    Box<dyn FnOnce(&VendorRequest) -> Result<VendorResponse, TransportError> + Send>;

/// Transport double. The token endpoint issues `tok-1`, `tok-2`, ... on every
/// hit; any other request consumes the next scripted responder.
pub struct ScriptedTransport {
    tokens_issued: AtomicUsize,
    script: Mutex<VecDeque<Responder>>,
    requests: Mutex<Vec<VendorRequest>>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Responder>) -> Arc<Self> {
        Arc::new(Self {
            tokens_issued: AtomicUsize::new(0),
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Non-token requests, in send order.
    pub fn requests(&self) -> Vec<VendorRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn tokens_issued(&self) -> usize {
        self.tokens_issued.load(Ordering::SeqCst)
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: VendorRequest) -> Result<VendorResponse, TransportError> {
        if request.url.ends_with(TOKEN_PATH) {
            let n = self.tokens_issued.fetch_add(1, Ordering::SeqCst) + 1;
            let body = format!(r#"{{"access_token":"tok-{n}","expires_in":300,"token_type":"Bearer"}}"#);
            return Ok(VendorResponse::new(StatusCode::OK, body));
        }

        self.requests.lock().unwrap().push(request.clone());
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(responder) => responder(&request),
            None => Err(TransportError::Other("script exhausted".into())),
        }
    }
}

/// In-memory store that counts invalidations.
#[derive(Default)]
pub struct CountingStore {
    inner: InMemoryCredentialStore,
    deletes: AtomicUsize,
}

impl CountingStore {
    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialStore for CountingStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(key).await
    }
}

pub fn respond(status: u16, body: &'static str) -> Responder {
    Box::new(move |_| Ok(VendorResponse::new(StatusCode::from_u16(status).unwrap(), body)))
}

pub fn fail(error: TransportError) -> Responder {
    Box::new(move |_| Err(error))
}

/// 200 carrying `plaintext` sealed with the surface key, bound to the request's
/// transaction id when it has one. The transaction id is echoed back.
pub fn sealed(surface: VendorSurface, plaintext: &'static str) -> Responder {
    Box::new(move |request| {
        let cipher = cipher(surface);
        let txn = request
            .headers
            .get(TRANSACTION_ID_HEADER)
            .map(|v| v.to_str().unwrap().to_owned());
        let envelope = cipher.encrypt(plaintext.as_bytes(), txn.as_deref()).unwrap();
        let mut response = VendorResponse::new(StatusCode::OK, envelope.to_body().unwrap());
        if let Some(txn) = txn {
            response
                .headers
                .insert(TRANSACTION_ID_HEADER, txn.parse().unwrap());
        }
        Ok(response)
    })
}

pub fn cipher(surface: VendorSurface) -> PayloadCipher {
    let secret = match surface {
        VendorSurface::Fintech => FINTECH_SECRET,
        VendorSurface::CardControl => CARD_SECRET,
    };
    PayloadCipher::new(surface, &SecretString::new(secret)).unwrap()
}

/// Decrypt a recorded request body with the surface key.
pub fn open_request(surface: VendorSurface, request: &VendorRequest) -> Vec<u8> {
    let txn = request
        .headers
        .get(TRANSACTION_ID_HEADER)
        .map(|v| v.to_str().unwrap().to_owned());
    cipher(surface).decrypt(&request.body, txn.as_deref()).unwrap()
}

pub fn bearer(request: &VendorRequest) -> &str {
    request.headers.get("authorization").unwrap().to_str().unwrap()
}

pub fn gateway_config() -> GatewayConfig {
    GatewayConfig {
        base_url: BASE_URL.to_owned(),
        card_control_base_url: None,
        max_attempts: 3,
        fintech_secret: SecretString::new(FINTECH_SECRET),
        card_control_secret: SecretString::new(CARD_SECRET),
        http: HttpTransportConfig::for_testing(),
        credentials: CredentialConfig::new(BASE_URL, "svc-user", SecretString::new("svc-pass")),
    }
}

pub fn credentials(
    transport: &Arc<ScriptedTransport>,
    store: &Arc<CountingStore>,
) -> Arc<CredentialManager> {
    let config = CredentialConfig::new(BASE_URL, "svc-user", SecretString::new("svc-pass"));
    Arc::new(CredentialManager::new(transport.clone(), store.clone(), config).unwrap())
}

pub struct Harness<I> {
    pub interceptor: I,
    pub transport: Arc<ScriptedTransport>,
    pub store: Arc<CountingStore>,
}

pub fn general(script: Vec<Responder>) -> Harness<GeneralInterceptor> {
    let transport = ScriptedTransport::new(script);
    let store = Arc::new(CountingStore::default());
    let interceptor = GeneralInterceptor::new(
        transport.clone(),
        credentials(&transport, &store),
        Arc::new(cipher(VendorSurface::Fintech)),
        BASE_URL,
        3,
    )
    .unwrap();
    Harness {
        interceptor,
        transport,
        store,
    }
}

pub fn card_control(script: Vec<Responder>) -> Harness<CardControlInterceptor> {
    let transport = ScriptedTransport::new(script);
    let store = Arc::new(CountingStore::default());
    let interceptor = CardControlInterceptor::new(
        transport.clone(),
        credentials(&transport, &store),
        Arc::new(cipher(VendorSurface::CardControl)),
        BASE_URL,
        3,
    )
    .unwrap();
    Harness {
        interceptor,
        transport,
        store,
    }
}
