//! In-process cache store with per-entry expiration.

use async_trait::async_trait;
use dashmap::DashMap;
use gateway_domain::Ttl;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::{CacheConfig, CacheStore};
use crate::error::Result;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// In-memory store for single-instance runs and tests
///
/// Each key is updated atomically under its shard lock. Expired entries are
/// dropped lazily on read and by `purge_expired`.
#[derive(Debug)]
pub struct MemoryCacheStore {
    entries: DashMap<String, Entry>,
    default_ttl: Duration,
}

impl MemoryCacheStore {
    #[must_use]
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            default_ttl,
        }
    }

    #[must_use]
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.default_ttl)
    }

    /// Number of stored entries, expired ones included until purged
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every expired entry; returns how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live(now));
        before.saturating_sub(self.entries.len())
    }

    /// Periodically purge expired entries until the store is dropped
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let store = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(store) = store.upgrade() else {
                    break;
                };
                let purged = store.purge_expired();
                if purged > 0 {
                    tracing::debug!(purged, "Purged expired cache entries");
                }
            }
        })
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Instant::now();
        match self.entries.get(key) {
            Some(entry) if entry.is_live(now) => return Ok(Some(entry.value.clone())),
            Some(_) => {}
            None => return Ok(None),
        }

        // Shard guard released above; drop the entry unless a writer replaced it
        self.entries.remove_if(key, |_, entry| !entry.is_live(now));
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl: Ttl) -> Result<bool> {
        let Some(lifetime) = ttl.resolve(self.default_ttl) else {
            return Ok(false);
        };

        let entry = Entry {
            value: value.to_string(),
            expires_at: Instant::now() + lifetime,
        };
        self.entries.insert(key.to_string(), entry);
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let now = Instant::now();
        let removed = self.entries.remove(key);
        Ok(removed.is_some_and(|(_, entry)| entry.is_live(now)))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn test_round_trip() {
        let store = MemoryCacheStore::default();

        let stored = assert_ok!(
            store
                .set("predict:{\"a\":1}", "{\"score\":0.9}", Ttl::from_secs(60))
                .await
        );
        assert!(stored);

        let value = assert_ok!(store.get("predict:{\"a\":1}").await);
        assert_eq!(value.as_deref(), Some("{\"score\":0.9}"));
    }

    #[tokio::test]
    async fn test_entry_expires() {
        let store = MemoryCacheStore::default();
        let unit = Duration::from_millis(50);

        store.set("k", "v", Ttl::Expires(unit)).await.unwrap();
        tokio::time::sleep(unit * 2).await;

        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_default_and_no_store_ttl() {
        let store = MemoryCacheStore::new(Duration::from_secs(60));

        assert!(store.set("a", "1", Ttl::from_secs(0)).await.unwrap());
        assert!(!store.set("b", "2", Ttl::from_secs(-1)).await.unwrap());

        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("1"));
        assert_eq!(store.get("b").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = MemoryCacheStore::default();
        store.set("k", "v", Ttl::StoreDefault).await.unwrap();

        assert!(store.delete("k").await.unwrap());
        assert!(!store.delete("k").await.unwrap());
        assert!(!store.delete("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let store = Arc::new(MemoryCacheStore::default());

        let writers: Vec<_> = (0..16)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store.set("shared", &i.to_string(), Ttl::StoreDefault).await
                })
            })
            .collect();
        for writer in writers {
            writer.await.unwrap().unwrap();
        }

        let value = store.get("shared").await.unwrap().unwrap();
        assert!(value.parse::<u32>().unwrap() < 16);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let store = MemoryCacheStore::default();
        store
            .set("short", "v", Ttl::Expires(Duration::from_millis(10)))
            .await
            .unwrap();
        store.set("long", "v", Ttl::from_secs(60)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.len(), 1);
    }
}
