use serde::Deserialize;
use vendor_auth::{CredentialConfig, SecretString};
use vendor_http::HttpTransportConfig;

use crate::error::GatewayError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Everything needed to talk to both vendor surfaces.
///
/// `Debug` is derived; the two cipher secrets and the token password are
/// [`SecretString`]s and print redacted.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Fintech/UPI gateway origin.
    pub base_url: String,

    /// Card-control gateway origin. Falls back to `base_url`.
    #[serde(default)]
    pub card_control_base_url: Option<String>,

    /// Attempts per logical call, including the first (default: 3).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    pub fintech_secret: SecretString,

    pub card_control_secret: SecretString,

    #[serde(default)]
    pub http: HttpTransportConfig,

    pub credentials: CredentialConfig,
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

impl GatewayConfig {
    #[must_use]
    pub fn card_control_base_url(&self) -> &str {
        self.card_control_base_url.as_deref().unwrap_or(&self.base_url)
    }

    /// # Errors
    /// Returns [`GatewayError::Config`] when a URL does not parse, attempts are
    /// zero, or the two surface secrets are empty or identical; credential
    /// config errors surface as [`GatewayError::Credential`].
    pub fn validate(&self) -> Result<(), GatewayError> {
        for (name, url) in [
            ("base_url", self.base_url.as_str()),
            ("card_control_base_url", self.card_control_base_url()),
        ] {
            url::Url::parse(url)
                .map_err(|e| GatewayError::Config(format!("{name} '{url}' is invalid: {e}")))?;
        }
        if self.max_attempts == 0 {
            return Err(GatewayError::Config("max_attempts must be at least 1".into()));
        }
        if self.fintech_secret.is_empty() || self.card_control_secret.is_empty() {
            return Err(GatewayError::Config("cipher secrets must not be empty".into()));
        }
        if self.fintech_secret.expose() == self.card_control_secret.expose() {
            return Err(GatewayError::Config(
                "fintech and card-control secrets must differ".into(),
            ));
        }
        self.credentials.validate()?;
        Ok(())
    }
}
