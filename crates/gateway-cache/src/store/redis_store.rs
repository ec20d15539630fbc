//! # Redis Cache Store
//!
//! Redis-backed `CacheStore`. The connection is opened lazily on first use
//! and re-attempted on later calls while Redis stays down, so a cache outage
//! at start-up does not keep the gateway from serving.

use async_trait::async_trait;
use gateway_domain::Ttl;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::future::Future;
use tokio::sync::OnceCell;

use super::{CacheConfig, CacheStore};
use crate::error::{CacheError, Result};

/// Redis cache store with a shared multiplexed connection
pub struct RedisCacheStore {
    client: Client,
    conn: OnceCell<ConnectionManager>,
    config: CacheConfig,
}

impl RedisCacheStore {
    /// Create a store; no connection is made until the first operation
    ///
    /// # Errors
    ///
    /// Returns an error if the Redis URL cannot be parsed.
    pub fn new(config: CacheConfig) -> Result<Self> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| CacheError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            client,
            conn: OnceCell::new(),
            config,
        })
    }

    async fn connection(&self) -> Result<ConnectionManager> {
        let conn = self
            .conn
            .get_or_try_init(|| async {
                tracing::info!(url = %self.config.url, "Connecting to Redis");
                let conn = ConnectionManager::new(self.client.clone()).await?;
                tracing::info!("Redis connected");
                Ok::<_, CacheError>(conn)
            })
            .await?;

        Ok(conn.clone())
    }

    /// Run one store round-trip under the configured operation timeout
    async fn bounded<T>(&self, op: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.config.op_timeout, op)
            .await
            .map_err(|_| CacheError::Timeout {
                timeout_ms: u64::try_from(self.config.op_timeout.as_millis()).unwrap_or(u64::MAX),
            })?
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.bounded(async {
            let mut conn = self.connection().await?;
            let value: Option<String> = conn.get(key).await?;
            Ok(value)
        })
        .await
    }

    async fn set(&self, key: &str, value: &str, ttl: Ttl) -> Result<bool> {
        let Some(lifetime) = ttl.resolve(self.config.default_ttl) else {
            return Ok(false);
        };
        // SETEX has whole-second resolution
        let secs = lifetime.as_secs().max(1);

        self.bounded(async {
            let mut conn = self.connection().await?;
            let _: () = conn.set_ex(key, value, secs).await?;
            Ok(true)
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.bounded(async {
            let mut conn = self.connection().await?;
            let deleted: i64 = conn.del(key).await?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn ping(&self) -> Result<()> {
        self.bounded(async {
            let mut conn = self.connection().await?;
            let _pong: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok(())
        })
        .await
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn unreachable_store() -> RedisCacheStore {
        RedisCacheStore::new(CacheConfig {
            url: "redis://127.0.0.1:1/0".to_string(),
            op_timeout: Duration::from_millis(500),
            ..CacheConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_invalid_url_rejected() {
        let result = RedisCacheStore::new(CacheConfig {
            url: "not a url".to_string(),
            ..CacheConfig::default()
        });

        assert!(matches!(result, Err(CacheError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_unreachable_redis_reports_error() {
        let store = unreachable_store();

        assert!(store.get("k").await.is_err());
        assert!(store.ping().await.is_err());
    }

    #[tokio::test]
    async fn test_no_store_skips_connection() {
        let store = unreachable_store();

        let stored = store.set("k", "v", Ttl::NoStore).await.unwrap();
        assert!(!stored);
    }
}
