use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use vendor_http::{Transport, VendorRequest, VendorResponse};
use zeroize::Zeroizing;

use crate::config::CredentialConfig;
use crate::credential::Credential;
use crate::error::CredentialError;
use crate::store::CredentialStore;

/// Successful token endpoint body.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default, deserialize_with = "lenient_seconds")]
    expires_in: Option<u64>,
    #[serde(default)]
    token_type: Option<String>,
}

/// OAuth 2.0 error body returned with HTTP 400.
///
/// Either field may be missing; a body carrying neither is not an error object.
#[derive(Deserialize)]
struct TokenErrorResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// `expires_in` arrives as a number or as a numeric string.
fn lenient_seconds<'de, D>(d: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(u64),
        Str(String),
    }

    match Option::<Raw>::deserialize(d)? {
        None => Ok(None),
        Some(Raw::Num(n)) => Ok(Some(n)),
        Some(Raw::Str(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("expires_in '{s}' is not a number"))),
    }
}

/// Obtains, caches and invalidates the vendor bearer credential.
///
/// There is no lock around refresh: two callers that both miss the cache both
/// fetch a token, and the last write wins. The vendor tolerates this.
pub struct CredentialManager {
    transport: Arc<dyn Transport>,
    store: Arc<dyn CredentialStore>,
    config: CredentialConfig,
    token_url: String,
}

impl std::fmt::Debug for CredentialManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialManager")
            .field("token_url", &self.token_url)
            .field("cache_key", &self.config.cache_key)
            .finish_non_exhaustive()
    }
}

impl CredentialManager {
    /// # Errors
    /// Returns [`CredentialError::Config`] if `config` does not validate.
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<dyn CredentialStore>,
        config: CredentialConfig,
    ) -> Result<Self, CredentialError> {
        config.validate()?;
        let token_url = config.token_url()?.to_string();
        Ok(Self {
            transport,
            store,
            config,
            token_url,
        })
    }

    #[must_use]
    pub fn config(&self) -> &CredentialConfig {
        &self.config
    }

    /// Return the cached credential, or fetch and cache a new one.
    ///
    /// A store read failure is treated as a miss; a store write failure is
    /// logged and the fresh credential is still returned.
    ///
    /// # Errors
    /// Returns the token endpoint's failure mapped per [`CredentialError`].
    pub async fn get_credential(&self) -> Result<Credential, CredentialError> {
        match self.store.get(&self.config.cache_key).await {
            Ok(Some(raw)) => {
                if let Some(credential) = Credential::from_cache_entry(&raw)
                    && !credential.is_expired()
                {
                    tracing::trace!(expires_at = %credential.expires_at(), "credential cache hit");
                    return Ok(credential);
                }
                tracing::debug!("cached credential unusable, refreshing");
            }
            Ok(None) => tracing::debug!("no cached credential, refreshing"),
            Err(e) => tracing::warn!(error = %e, "credential store read failed, refreshing"),
        }
        self.refresh().await
    }

    /// Drop the cached credential so the next [`get_credential`](Self::get_credential)
    /// fetches a new one.
    ///
    /// # Errors
    /// Returns [`CredentialError::Store`] if the delete fails.
    pub async fn invalidate_credential(&self) -> Result<(), CredentialError> {
        self.store.delete(&self.config.cache_key).await?;
        tracing::info!(cache_key = %self.config.cache_key, "vendor credential invalidated");
        Ok(())
    }

    async fn refresh(&self) -> Result<Credential, CredentialError> {
        let response = self.transport.execute(self.token_request()?).await?;
        let credential = self.parse_token_response(&response)?;

        let ttl = ttl_until(credential.expires_at());
        match credential.to_cache_entry() {
            Ok(entry) => {
                if let Err(e) = self.store.set(&self.config.cache_key, &entry, ttl).await {
                    tracing::warn!(error = %e, "failed to cache vendor credential");
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to encode vendor credential"),
        }

        tracing::info!(
            expires_at = %credential.expires_at(),
            token_type = credential.token_type(),
            "vendor credential refreshed"
        );
        Ok(credential)
    }

    fn token_request(&self) -> Result<VendorRequest, CredentialError> {
        let basic = Zeroizing::new(format!(
            "{}:{}",
            self.config.username,
            self.config.password.expose()
        ));
        let encoded = Zeroizing::new(general_purpose::STANDARD.encode(basic.as_bytes()));
        let header = Zeroizing::new(format!("Basic {}", encoded.as_str()));
        let mut authorization = HeaderValue::from_str(&header)
            .map_err(|_| CredentialError::Config("credentials are not header-safe".into()))?;
        authorization.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, authorization);
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let form = serde_urlencoded::to_string([("grant_type", "client_credentials")])
            .map_err(|e| CredentialError::Config(format!("failed to encode token form: {e}")))?;

        Ok(VendorRequest::new(Method::POST, self.token_url.as_str())
            .with_headers(headers)
            .with_body(Bytes::from(form)))
    }

    fn parse_token_response(&self, response: &VendorResponse) -> Result<Credential, CredentialError> {
        match response.status {
            StatusCode::OK => {}
            StatusCode::UNAUTHORIZED => return Err(CredentialError::Unauthorized),
            StatusCode::FORBIDDEN => return Err(CredentialError::Forbidden),
            StatusCode::BAD_REQUEST => {
                let body: TokenErrorResponse = serde_json::from_slice(&response.body)
                    .map_err(|_| CredentialError::UnknownVendorError { status: 400 })?;
                if body.error.is_none() && body.error_description.is_none() {
                    return Err(CredentialError::UnknownVendorError { status: 400 });
                }
                return Err(CredentialError::Vendor {
                    error: body.error.unwrap_or_else(|| "unknown_error".to_owned()),
                    description: body.error_description.unwrap_or_default(),
                });
            }
            other => {
                return Err(CredentialError::UnknownVendorError {
                    status: other.as_u16(),
                });
            }
        }

        let body: TokenResponse = serde_json::from_slice(&response.body)
            .map_err(|e| CredentialError::InvalidResponse(e.to_string()))?;
        let access_token = Zeroizing::new(body.access_token);
        if access_token.is_empty() {
            return Err(CredentialError::InvalidResponse("empty access_token".into()));
        }
        if let Some(ref tt) = body.token_type
            && !tt.eq_ignore_ascii_case("bearer")
        {
            return Err(CredentialError::InvalidResponse(format!(
                "unsupported token type '{tt}'"
            )));
        }

        let lifetime = body
            .expires_in
            .map_or(self.config.default_ttl, Duration::from_secs);
        let expires_at = OffsetDateTime::now_utc().saturating_add(
            time::Duration::try_from(lifetime).unwrap_or(time::Duration::MAX),
        );

        Ok(Credential::new(
            access_token.as_str(),
            expires_at,
            body.token_type.unwrap_or_else(|| "Bearer".to_owned()),
        ))
    }
}

/// Remaining lifetime, clamped at zero.
fn ttl_until(expires_at: OffsetDateTime) -> Duration {
    let remaining = expires_at - OffsetDateTime::now_utc();
    Duration::try_from(remaining).unwrap_or(Duration::ZERO)
}
