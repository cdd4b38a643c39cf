use std::path::Path;

use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Yaml};
use vendor_gateway::GatewayConfig;

/// Environment prefix; `VENDOR_GATEWAY__CREDENTIALS__PASSWORD` sets
/// `credentials.password`.
pub const ENV_PREFIX: &str = "VENDOR_GATEWAY__";

/// Layered load: serde defaults, then the YAML file (if any), then
/// `VENDOR_GATEWAY__*` environment variables. The result is validated.
pub fn load(path: Option<&Path>) -> Result<GatewayConfig> {
    let mut figment = Figment::new();
    if let Some(path) = path {
        if !path.is_file() {
            anyhow::bail!("config file does not exist: {}", path.display());
        }
        figment = figment.merge(Yaml::file(path));
    }
    figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: GatewayConfig = figment
        .extract()
        .context("failed to load vendor gateway configuration")?;
    config
        .validate()
        .context("vendor gateway configuration is invalid")?;
    Ok(config)
}

/// Effective configuration with every secret left out.
#[must_use]
pub fn redacted(config: &GatewayConfig) -> serde_json::Value {
    let http = &config.http;
    serde_json::json!({
        "base_url": config.base_url,
        "card_control_base_url": config.card_control_base_url(),
        "max_attempts": config.max_attempts,
        "fintech_secret": "[REDACTED]",
        "card_control_secret": "[REDACTED]",
        "http": {
            "request_timeout_ms": u64::try_from(http.request_timeout.as_millis()).unwrap_or(u64::MAX),
            "max_body_size": http.max_body_size,
            "user_agent": http.user_agent,
            "pool_max_idle_per_host": http.pool_max_idle_per_host,
        },
        "credentials": {
            "base_url": config.credentials.base_url,
            "token_path": config.credentials.token_path,
            "username": config.credentials.username,
            "password": "[REDACTED]",
            "cache_key": config.credentials.cache_key,
        },
    })
}
