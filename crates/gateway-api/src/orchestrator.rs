//! # Orchestrator
//!
//! Cache-aside orchestration of one gateway request:
//!
//! ```text
//! derive key ──► lookup ──hit──► Hit (stored text, verbatim)
//!                  │
//!                 miss / not cacheable
//!                  ▼
//!             backend call ──ok──► store with route TTL (unless null) ──► Miss / Bypass
//!                  │
//!                failed ──► ApiError (never cached)
//! ```

use gateway_cache::{FailOpenCache, Lookup};
use gateway_domain::{BackendResponse, CacheKey, Payload, RouteName, RouteTable};
use std::fmt;
use std::sync::Arc;

use crate::backend::Backend;
use crate::error::{ApiError, ApiResult};

/// Which path produced a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Served from cache
    Hit,
    /// Cacheable route, served by the backend
    Miss,
    /// Route does not cache
    Bypass,
}

impl CacheStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "HIT",
            Self::Miss => "MISS",
            Self::Bypass => "BYPASS",
        }
    }
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Successful orchestration result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatched {
    /// Serialized JSON body, identical to the cached text on a hit
    pub body: String,
    pub cache: CacheStatus,
}

/// Routes requests through the cache and the backends
#[derive(Clone)]
pub struct Orchestrator {
    routes: Arc<RouteTable>,
    backend: Arc<dyn Backend>,
    cache: FailOpenCache,
}

impl Orchestrator {
    pub fn new(routes: RouteTable, backend: Arc<dyn Backend>, cache: FailOpenCache) -> Self {
        Self {
            routes: Arc::new(routes),
            backend,
            cache,
        }
    }

    #[must_use]
    pub const fn cache(&self) -> &FailOpenCache {
        &self.cache
    }

    /// Serve `name` for `payload`, consulting the cache when the route allows it
    ///
    /// # Errors
    ///
    /// Returns `BackendRejected` or `BackendUnreachable` when the backend
    /// call fails. Cache failures are never returned.
    pub async fn dispatch(&self, name: RouteName, payload: Option<&Payload>) -> ApiResult<Dispatched> {
        let route = self.routes.get(name);

        let key = route.is_cacheable().then(|| {
            let empty = Payload::default();
            CacheKey::derive(name, payload.unwrap_or(&empty))
        });

        if let Some(key) = &key {
            match self.cache.lookup(key.as_str()).await {
                Lookup::Hit(body) => {
                    tracing::info!(route = %name, cache = "HIT", "Served from cache");
                    return Ok(Dispatched {
                        body,
                        cache: CacheStatus::Hit,
                    });
                }
                Lookup::Miss | Lookup::Unavailable => {}
            }
        }

        let value = match self.backend.call(route, payload).await {
            BackendResponse::Success { body, .. } => body,
            BackendResponse::Rejected { status, body } => {
                return Err(ApiError::BackendRejected {
                    route: name,
                    backend: route.backend,
                    detail: route.failure_detail,
                    status,
                    body,
                });
            }
            BackendResponse::Unreachable { failure, detail } => {
                return Err(ApiError::BackendUnreachable {
                    route: name,
                    backend: route.backend,
                    detail: route.failure_detail,
                    failure,
                    cause: detail,
                });
            }
        };

        let body = value.to_string();
        let cache = match key {
            Some(key) => {
                // An empty backend answer is passed through but never stored
                let stored =
                    !value.is_null() && self.cache.set(key.as_str(), &body, route.ttl()).await;
                tracing::info!(route = %name, cache = "MISS", stored, "Served from backend");
                CacheStatus::Miss
            }
            None => {
                tracing::info!(route = %name, cache = "BYPASS", "Served from backend");
                CacheStatus::Bypass
            }
        };

        Ok(Dispatched { body, cache })
    }

    /// Direct cache read by verbatim key
    ///
    /// # Errors
    ///
    /// Returns `KeyNotFound` when the key is absent, expired, or the cache
    /// is unreachable.
    pub async fn read_cached(&self, key: &str) -> ApiResult<String> {
        self.cache
            .get(key)
            .await
            .ok_or_else(|| ApiError::KeyNotFound(key.to_string()))
    }

    /// Direct cache delete by verbatim key; returns whether anything was removed
    pub async fn delete_cached(&self, key: &str) -> bool {
        let removed = self.cache.delete(key).await;
        tracing::info!(key, removed, "Cache entry delete requested");
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use gateway_cache::{CacheError, CacheStore, MemoryCacheStore};
    use gateway_domain::{BackendAddresses, Route, TransportFailure, Ttl};
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Backend answering every call with a fixed response
    struct CountingBackend {
        response: BackendResponse,
        calls: AtomicUsize,
    }

    impl CountingBackend {
        fn new(response: BackendResponse) -> Arc<Self> {
            Arc::new(Self {
                response,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Backend for CountingBackend {
        async fn call(&self, _route: &Route, _payload: Option<&Payload>) -> BackendResponse {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.response.clone()
        }
    }

    struct DownStore;

    #[async_trait]
    impl CacheStore for DownStore {
        async fn get(&self, _key: &str) -> gateway_cache::Result<Option<String>> {
            Err(CacheError::Unavailable("down".to_string()))
        }

        async fn set(&self, _key: &str, _value: &str, _ttl: Ttl) -> gateway_cache::Result<bool> {
            Err(CacheError::Unavailable("down".to_string()))
        }

        async fn delete(&self, _key: &str) -> gateway_cache::Result<bool> {
            Err(CacheError::Unavailable("down".to_string()))
        }

        async fn ping(&self) -> gateway_cache::Result<()> {
            Err(CacheError::Unavailable("down".to_string()))
        }

        fn backend_name(&self) -> &'static str {
            "down"
        }
    }

    fn success(body: Value) -> BackendResponse {
        BackendResponse::Success { status: 200, body }
    }

    fn orchestrator(backend: Arc<CountingBackend>, store: Arc<dyn CacheStore>) -> Orchestrator {
        Orchestrator::new(
            RouteTable::new(&BackendAddresses::default()),
            backend,
            FailOpenCache::new(store),
        )
    }

    fn payload(value: Value) -> Payload {
        Payload::try_from(value).unwrap()
    }

    #[tokio::test]
    async fn test_second_identical_request_is_a_hit() {
        let backend = CountingBackend::new(success(json!({"result": "x"})));
        let orch = orchestrator(backend.clone(), Arc::new(MemoryCacheStore::default()));
        let p = payload(json!({"a": 1}));

        let first = orch.dispatch(RouteName::Preprocess, Some(&p)).await.unwrap();
        let second = orch.dispatch(RouteName::Preprocess, Some(&p)).await.unwrap();

        assert_eq!(first.cache, CacheStatus::Miss);
        assert_eq!(second.cache, CacheStatus::Hit);
        assert_eq!(first.body, second.body);
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_key_order_shares_cache_entry() {
        let backend = CountingBackend::new(success(json!({"score": 0.5})));
        let orch = orchestrator(backend.clone(), Arc::new(MemoryCacheStore::default()));

        let a: Value = serde_json::from_str(r#"{"x": 1, "y": 2}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"y": 2, "x": 1}"#).unwrap();
        orch.dispatch(RouteName::Predict, Some(&payload(a))).await.unwrap();
        let hit = orch.dispatch(RouteName::Predict, Some(&payload(b))).await.unwrap();

        assert_eq!(hit.cache, CacheStatus::Hit);
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_hit_returns_stored_text_verbatim() {
        let backend = CountingBackend::new(success(json!({"never": "used"})));
        let store = Arc::new(MemoryCacheStore::default());
        let p = payload(json!({"prompt": "hi"}));
        let key = CacheKey::derive(RouteName::Predict, &p);
        let stored = "{ \"label\" :  \"cat\" }";
        store.set(key.as_str(), stored, Ttl::from_secs(60)).await.unwrap();

        let orch = orchestrator(backend.clone(), store);
        let hit = orch.dispatch(RouteName::Predict, Some(&p)).await.unwrap();

        assert_eq!(hit.body, stored);
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_with_route_ttl() {
        let backend = CountingBackend::new(success(json!({"ok": true})));
        let orch = orchestrator(backend.clone(), Arc::new(MemoryCacheStore::default()));
        let p = payload(json!({"a": 1}));
        let cache_status = |name: RouteName| {
            let orch = orch.clone();
            let p = p.clone();
            async move { orch.dispatch(name, Some(&p)).await.unwrap().cache }
        };

        cache_status(RouteName::Predict).await;
        cache_status(RouteName::Preprocess).await;

        tokio::time::advance(Duration::from_secs(599)).await;
        assert_eq!(cache_status(RouteName::Predict).await, CacheStatus::Hit);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache_status(RouteName::Predict).await, CacheStatus::Miss);
        assert_eq!(cache_status(RouteName::Preprocess).await, CacheStatus::Hit);

        tokio::time::advance(Duration::from_secs(3000)).await;
        assert_eq!(cache_status(RouteName::Preprocess).await, CacheStatus::Miss);
        assert_eq!(backend.calls(), 4);
    }

    #[tokio::test]
    async fn test_empty_success_not_cached() {
        let backend = CountingBackend::new(success(Value::Null));
        let store = Arc::new(MemoryCacheStore::default());
        let orch = orchestrator(backend.clone(), store.clone());
        let p = payload(json!({"prompt": "hi"}));

        let first = orch.dispatch(RouteName::Predict, Some(&p)).await.unwrap();
        let second = orch.dispatch(RouteName::Predict, Some(&p)).await.unwrap();

        assert_eq!(first.body, "null");
        assert_eq!(second.cache, CacheStatus::Miss);
        assert_eq!(backend.calls(), 2);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_non_cacheable_route_bypasses_cache() {
        let backend = CountingBackend::new(success(json!({"status": "started"})));
        let store = Arc::new(MemoryCacheStore::default());
        let orch = orchestrator(backend.clone(), store.clone());

        let first = orch.dispatch(RouteName::Train, None).await.unwrap();
        orch.dispatch(RouteName::Train, None).await.unwrap();

        assert_eq!(first.cache, CacheStatus::Bypass);
        assert_eq!(backend.calls(), 2);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_failure_is_never_cached() {
        let backend = CountingBackend::new(BackendResponse::Rejected {
            status: 503,
            body: "overloaded".to_string(),
        });
        let store = Arc::new(MemoryCacheStore::default());
        let orch = orchestrator(backend.clone(), store.clone());
        let p = payload(json!({"prompt": "hi"}));

        let err = orch.dispatch(RouteName::Predict, Some(&p)).await.unwrap_err();
        orch.dispatch(RouteName::Predict, Some(&p)).await.unwrap_err();

        assert!(matches!(err, ApiError::BackendRejected { status: 503, .. }));
        assert_eq!(backend.calls(), 2);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_backend_surfaces_error() {
        let backend = CountingBackend::new(BackendResponse::Unreachable {
            failure: TransportFailure::Connect,
            detail: "connection refused".to_string(),
        });
        let orch = orchestrator(backend, Arc::new(MemoryCacheStore::default()));

        let err = orch.dispatch(RouteName::Experiments, None).await.unwrap_err();

        assert!(matches!(
            err,
            ApiError::BackendUnreachable {
                failure: TransportFailure::Connect,
                detail: "experimentation failed",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_cache_outage_fails_open() {
        let backend = CountingBackend::new(success(json!({"label": "live"})));
        let orch = orchestrator(backend.clone(), Arc::new(DownStore));
        let p = payload(json!({"prompt": "hi"}));

        let first = orch.dispatch(RouteName::Predict, Some(&p)).await.unwrap();
        let second = orch.dispatch(RouteName::Predict, Some(&p)).await.unwrap();

        assert_eq!(first.body, r#"{"label":"live"}"#);
        assert_eq!(second.cache, CacheStatus::Miss);
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_direct_cache_access() {
        let backend = CountingBackend::new(success(json!({"result": "x"})));
        let orch = orchestrator(backend, Arc::new(MemoryCacheStore::default()));
        let p = payload(json!({"a": 1}));
        orch.dispatch(RouteName::Preprocess, Some(&p)).await.unwrap();

        let key = r#"preprocess:{"a":1}"#;
        assert_eq!(orch.read_cached(key).await.unwrap(), r#"{"result":"x"}"#);
        assert!(orch.delete_cached(key).await);
        assert!(!orch.delete_cached(key).await);
        assert!(matches!(
            orch.read_cached(key).await,
            Err(ApiError::KeyNotFound(_))
        ));
    }
}
