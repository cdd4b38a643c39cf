use serde::Deserialize;
use std::time::Duration;
use url::Url;

use crate::error::CredentialError;
use crate::secret::SecretString;

pub const DEFAULT_TOKEN_PATH: &str = "/nbfc/v1/oauth/cc/accesstoken";
pub const DEFAULT_CACHE_KEY: &str = "vendor_access_token";

/// Client credentials for the vendor token endpoint.
///
/// `Debug` is derived; `password` is a [`SecretString`] and prints redacted.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialConfig {
    /// Vendor origin, e.g. `https://api.vendor.example`.
    pub base_url: String,

    #[serde(default = "default_token_path")]
    pub token_path: String,

    pub username: String,

    pub password: SecretString,

    /// Store key shared by every replica of the service.
    #[serde(default = "default_cache_key")]
    pub cache_key: String,

    /// Lifetime assumed when the vendor omits `expires_in` (default: 5m).
    #[serde(default = "default_ttl", with = "duration_str")]
    pub default_ttl: Duration,
}

fn default_token_path() -> String {
    DEFAULT_TOKEN_PATH.to_owned()
}

fn default_cache_key() -> String {
    DEFAULT_CACHE_KEY.to_owned()
}

fn default_ttl() -> Duration {
    Duration::from_secs(300)
}

mod duration_str {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(d: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(d)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}

impl CredentialConfig {
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: SecretString,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            token_path: default_token_path(),
            username: username.into(),
            password,
            cache_key: default_cache_key(),
            default_ttl: default_ttl(),
        }
    }

    /// # Errors
    /// Returns [`CredentialError::Config`] for empty credentials, an empty
    /// cache key, or a token URL that does not parse.
    pub fn validate(&self) -> Result<(), CredentialError> {
        if self.username.trim().is_empty() {
            return Err(CredentialError::Config("username must not be empty".into()));
        }
        if self.password.is_empty() {
            return Err(CredentialError::Config("password must not be empty".into()));
        }
        if self.cache_key.trim().is_empty() {
            return Err(CredentialError::Config("cache_key must not be empty".into()));
        }
        self.token_url().map(|_| ())
    }

    /// Absolute token endpoint URL.
    ///
    /// # Errors
    /// Returns [`CredentialError::Config`] if the joined URL is not valid.
    pub fn token_url(&self) -> Result<Url, CredentialError> {
        let joined = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.token_path.trim_start_matches('/')
        );
        Url::parse(&joined)
            .map_err(|e| CredentialError::Config(format!("invalid token URL '{joined}': {e}")))
    }
}
