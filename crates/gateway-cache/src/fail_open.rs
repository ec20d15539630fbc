//! Fail-open access to a cache store.
//!
//! A store outage degrades throughput, never availability: read errors
//! become misses, write and delete errors are logged and swallowed.

use gateway_domain::Ttl;

use crate::store::SharedCacheStore;

/// Result of a cache lookup through the fail-open wrapper
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Hit(String),
    Miss,
    /// Store failed; treated as a miss by callers
    Unavailable,
}

impl Lookup {
    #[must_use]
    pub fn into_value(self) -> Option<String> {
        match self {
            Self::Hit(value) => Some(value),
            Self::Miss | Self::Unavailable => None,
        }
    }
}

/// Store wrapper applying the fail-open policy
#[derive(Clone)]
pub struct FailOpenCache {
    store: SharedCacheStore,
}

impl FailOpenCache {
    #[must_use]
    pub fn new(store: SharedCacheStore) -> Self {
        Self { store }
    }

    pub async fn lookup(&self, key: &str) -> Lookup {
        match self.store.get(key).await {
            Ok(Some(value)) => {
                tracing::debug!(key, "Cache hit");
                Lookup::Hit(value)
            }
            Ok(None) => {
                tracing::debug!(key, "Cache miss");
                Lookup::Miss
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    backend = self.store.backend_name(),
                    "Cache unavailable, treating lookup as miss"
                );
                Lookup::Unavailable
            }
        }
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        self.lookup(key).await.into_value()
    }

    /// Best-effort write; returns whether the entry was persisted
    pub async fn set(&self, key: &str, value: &str, ttl: Ttl) -> bool {
        match self.store.set(key, value, ttl).await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    backend = self.store.backend_name(),
                    "Failed to populate cache"
                );
                false
            }
        }
    }

    /// Idempotent delete; store errors report nothing removed
    pub async fn delete(&self, key: &str) -> bool {
        match self.store.delete(key).await {
            Ok(removed) => removed,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    backend = self.store.backend_name(),
                    "Failed to delete cache entry"
                );
                false
            }
        }
    }

    pub async fn is_reachable(&self) -> bool {
        self.store.ping().await.is_ok()
    }

    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }
}
