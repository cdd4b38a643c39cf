use http::HeaderValue;
use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;
use zeroize::{Zeroize, Zeroizing};

use crate::secret::SecretString;

/// Value the store uses for "nothing cached" in some deployments.
pub(crate) const NULL_SENTINEL: &str = "null";

/// Short-lived bearer credential issued by the vendor token endpoint.
#[derive(Clone)]
pub struct Credential {
    value: SecretString,
    expires_at: OffsetDateTime,
    token_type: String,
}

/// Cache representation. Lives only long enough to (de)serialize.
#[derive(Serialize, Deserialize)]
struct CacheEntry {
    access_token: String,
    #[serde(with = "time::serde::timestamp")]
    expires_at: OffsetDateTime,
    #[serde(default = "default_token_type")]
    token_type: String,
}

fn default_token_type() -> String {
    "Bearer".to_owned()
}

impl Credential {
    pub fn new(
        value: impl Into<String>,
        expires_at: OffsetDateTime,
        token_type: impl Into<String>,
    ) -> Self {
        Self {
            value: SecretString::new(value),
            expires_at,
            token_type: token_type.into(),
        }
    }

    #[must_use]
    pub fn value(&self) -> &SecretString {
        &self.value
    }

    #[must_use]
    pub fn expires_at(&self) -> OffsetDateTime {
        self.expires_at
    }

    #[must_use]
    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(OffsetDateTime::now_utc())
    }

    /// `Authorization: Bearer <value>`, marked sensitive so it is never
    /// printed by `Debug` impls of header maps.
    ///
    /// # Errors
    /// Fails if the token contains bytes not allowed in a header value.
    pub fn bearer_header(&self) -> Result<HeaderValue, http::header::InvalidHeaderValue> {
        let raw = Zeroizing::new(format!("Bearer {}", self.value.expose()));
        let mut value = HeaderValue::from_str(&raw)?;
        value.set_sensitive(true);
        Ok(value)
    }

    pub(crate) fn to_cache_entry(&self) -> Result<Zeroizing<String>, serde_json::Error> {
        let mut entry = CacheEntry {
            access_token: self.value.expose().to_owned(),
            expires_at: self.expires_at,
            token_type: self.token_type.clone(),
        };
        let encoded = serde_json::to_string(&entry).map(Zeroizing::new);
        entry.access_token.zeroize();
        encoded
    }

    /// Decode a cached value. Empty, sentinel and malformed entries all read
    /// as "no credential".
    pub(crate) fn from_cache_entry(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() || raw == NULL_SENTINEL {
            return None;
        }
        let entry: CacheEntry = serde_json::from_str(raw).ok()?;
        if entry.access_token.is_empty() {
            return None;
        }
        let access_token = Zeroizing::new(entry.access_token);
        Some(Self::new(
            access_token.as_str(),
            entry.expires_at,
            entry.token_type,
        ))
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("value", &self.value)
            .field("expires_at", &self.expires_at)
            .field("token_type", &self.token_type)
            .finish()
    }
}
