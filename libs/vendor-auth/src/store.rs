//! Key/value cache holding the serialized vendor credential.

use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use thiserror::Error;
use zeroize::Zeroizing;

/// Failure reported by a [`CredentialStore`] backend.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error("credential store unavailable: {0}")]
    Unavailable(String),

    #[error("credential store backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend(Box::new(err))
    }
}

/// Shared cache for the bearer credential.
///
/// Several service replicas may point at the same backend. Entries expire on
/// their own after `ttl`; implementations must make an expired entry read as
/// absent.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// # Errors
    /// Returns [`StoreError`] if the backend cannot be reached.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// # Errors
    /// Returns [`StoreError`] if the backend rejects the write.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// # Errors
    /// Returns [`StoreError`] if the backend cannot be reached.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

struct Entry {
    value: Zeroizing<String>,
    expires_at: Instant,
}

/// Process-local [`CredentialStore`] with per-entry TTL.
///
/// Expired entries are evicted lazily on read.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    entries: DashMap<String, Entry>,
}

impl InMemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live, unexpired entries.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|e| e.expires_at > now).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for InMemoryCredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCredentialStore")
            .field("entries", &self.entries.len())
            .finish()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Instant::now();
        // Guard must drop before remove_if touches the same shard.
        let hit = self
            .entries
            .get(key)
            .map(|e| (e.expires_at > now).then(|| e.value.as_str().to_owned()));
        match hit {
            Some(Some(value)) => Ok(Some(value)),
            Some(None) => {
                self.entries.remove_if(key, |_, e| e.expires_at <= now);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let expires_at = Instant::now()
            .checked_add(ttl)
            .ok_or_else(|| StoreError::Unavailable(format!("ttl {} out of range", humantime::format_duration(ttl))))?;
        self.entries.insert(
            key.to_owned(),
            Entry {
                value: Zeroizing::new(value.to_owned()),
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}
