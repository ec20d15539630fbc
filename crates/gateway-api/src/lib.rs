//! # Model Services Gateway API
//!
//! Request-orchestration gateway fronting the data-processing,
//! model-training, model-serving and experiments services, with a
//! cache-aside layer that avoids redundant backend calls.
//!
//! ## Features
//!
//! - **Deterministic cache keys**: route-namespaced, independent of JSON key order
//! - **Per-route freshness**: preprocessing cached 1h, inference 10min, the rest never
//! - **Fail-open caching**: a cache outage costs throughput, never availability
//! - **Classified backend errors**: "backend said no" vs "backend unreachable"
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Axum HTTP Server                         │
//! │     (/preprocess /train /predict /experiments /cache)       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Orchestrator                           │
//! │            (RouteTable, key derivation, TTLs)               │
//! └─────────────────────────────────────────────────────────────┘
//!                    │                   │
//!                    ▼                   ▼
//! ┌─────────────────────────┐   ┌──────────────────────────────┐
//! │     FailOpenCache       │   │     HttpBackendClient        │
//! │   (Redis / in-memory)   │   │  (reqwest, single attempt)   │
//! └─────────────────────────┘   └──────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod config;
pub mod error;
pub mod handlers;
pub mod orchestrator;

use axum::{
    Router,
    http::Method,
    routing::{get, post},
};
use gateway_cache::{FailOpenCache, MemoryCacheStore, SharedCacheStore};
use gateway_domain::RouteTable;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use backend::{Backend, HttpBackendClient};
pub use config::{CacheBackend, Config, ConfigError};
pub use error::{ApiError, ApiResult};
pub use orchestrator::{CacheStatus, Dispatched, Orchestrator};

/// Application state for Axum handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Orchestrator,
}

impl AppState {
    #[must_use]
    pub const fn new(orchestrator: Orchestrator) -> Self {
        Self { orchestrator }
    }

    /// Wire the production orchestrator from configuration and a cache store
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &Config, store: SharedCacheStore) -> Result<Self, reqwest::Error> {
        let backend = HttpBackendClient::new(config.backend_timeout)?;
        let orchestrator = Orchestrator::new(
            RouteTable::new(&config.backends),
            Arc::new(backend),
            FailOpenCache::new(store),
        );
        Ok(Self::new(orchestrator))
    }
}

/// Build the cache store selected by configuration
///
/// The in-memory store gets a background sweeper for expired entries.
///
/// # Errors
///
/// Returns an error if the Redis URL is invalid.
pub fn build_cache_store(config: &Config) -> gateway_cache::Result<SharedCacheStore> {
    let cache_config = config.cache_config();

    match config.cache_backend {
        CacheBackend::Redis => Ok(Arc::new(gateway_cache::RedisCacheStore::new(cache_config)?)),
        CacheBackend::Memory => {
            let store = Arc::new(MemoryCacheStore::from_config(&cache_config));
            store.spawn_sweeper(Duration::from_secs(60));
            Ok(store)
        }
    }
}

/// Build the Axum router
pub fn build_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        // Orchestrated routes, with and without trailing slash
        .route("/preprocess", post(handlers::preprocess))
        .route("/preprocess/", post(handlers::preprocess))
        .route("/train", post(handlers::train))
        .route("/train/", post(handlers::train))
        .route("/predict", post(handlers::predict))
        .route("/predict/", post(handlers::predict))
        .route("/experiments", get(handlers::experiments))
        .route("/experiments/", get(handlers::experiments))
        // Cache inspection
        .route(
            "/cache/{key}",
            get(handlers::read_cache).delete(handlers::delete_cache),
        )
        // Health check
        .route("/health", get(handlers::health_check))
        .route("/health/ready", get(handlers::readiness))
        .route("/", get(handlers::root))
        // State and middleware
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
