//! # Gateway Cache Library
//!
//! Key-value cache layer used by the gateway to avoid redundant backend
//! calls.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Orchestrator                          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      FailOpenCache                          │
//! │        (errors → miss on read, logged on write/delete)      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    CacheStore trait                         │
//! └─────────────────────────────────────────────────────────────┘
//!                    │                   │
//!                    ▼                   ▼
//! ┌─────────────────────────┐   ┌──────────────────────────────┐
//! │    RedisCacheStore      │   │      MemoryCacheStore        │
//! │  (lazy ConnectionMgr)   │   │   (single instance, tests)   │
//! └─────────────────────────┘   └──────────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - `redis`: Enable the Redis store (default)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gateway_cache::{CacheConfig, FailOpenCache, RedisCacheStore};
//!
//! let store = RedisCacheStore::new(CacheConfig::for_host("redis", 6379))?;
//! let cache = FailOpenCache::new(Arc::new(store));
//!
//! if let Some(body) = cache.get("predict:{\"prompt\":\"hi\"}").await {
//!     // serve from cache
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod fail_open;
pub mod store;

pub use error::{CacheError, Result};
pub use fail_open::{FailOpenCache, Lookup};
pub use store::{CacheConfig, CacheStore, MemoryCacheStore, SharedCacheStore};
#[cfg(feature = "redis")]
pub use store::RedisCacheStore;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_config_for_host() {
        let config = CacheConfig::for_host("redis", 6380);
        assert_eq!(config.url, "redis://redis:6380/0");
    }
}
