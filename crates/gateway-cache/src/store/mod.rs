//! # Cache Store
//!
//! Key-value storage with per-entry expiration. Stores own no business
//! logic: values are opaque serialized text, keys are used verbatim.

#[cfg(feature = "redis")]
pub mod redis_store;
pub mod memory;

use async_trait::async_trait;
use gateway_domain::Ttl;
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;

pub use memory::MemoryCacheStore;
#[cfg(feature = "redis")]
pub use redis_store::RedisCacheStore;

/// Store configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Redis connection URL (ignored by the in-memory store)
    pub url: String,
    /// Lifetime applied for `Ttl::StoreDefault`
    pub default_ttl: Duration,
    /// Upper bound on any single store round-trip
    pub op_timeout: Duration,
}

impl CacheConfig {
    /// Configuration for a Redis instance at `host:port`, database 0
    pub fn for_host(host: &str, port: u16) -> Self {
        Self {
            url: format!("redis://{host}:{port}/0"),
            ..Self::default()
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379/0".to_string(),
            default_ttl: Duration::from_secs(300),
            op_timeout: Duration::from_millis(250),
        }
    }
}

/// Concurrent key-value store with expiration
///
/// Implementations provide per-key atomicity; concurrent `set` on one key is
/// last-write-wins.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Value for `key`, `None` when absent or expired
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`; returns `false` when the TTL asked for no-store
    async fn set(&self, key: &str, value: &str, ttl: Ttl) -> Result<bool>;

    /// Remove `key`; returns whether anything was removed
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Reachability check
    async fn ping(&self) -> Result<()>;

    /// Short backend label for logs and readiness output
    fn backend_name(&self) -> &'static str;
}

/// Shared store handle
pub type SharedCacheStore = Arc<dyn CacheStore>;
