//! # Model Services Gateway - Domain Model
//!
//! Core types shared by the cache layer, the orchestrator and the HTTP
//! surface: the route table, request payloads, cache-key derivation, TTL
//! policy and the classification of backend responses.
//!
//! Nothing in this crate performs I/O.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// ROUTES
// =============================================================================

/// Orchestrated gateway operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteName {
    Preprocess,
    Train,
    Predict,
    Experiments,
}

impl RouteName {
    pub const ALL: [Self; 4] = [Self::Preprocess, Self::Train, Self::Predict, Self::Experiments];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Preprocess => "preprocess",
            Self::Train => "train",
            Self::Predict => "predict",
            Self::Experiments => "experiments",
        }
    }

    /// Backend service that serves this route
    #[must_use]
    pub const fn backend(self) -> BackendService {
        match self {
            Self::Preprocess => BackendService::DataProcessing,
            Self::Train => BackendService::ModelTraining,
            Self::Predict => BackendService::ModelServing,
            Self::Experiments => BackendService::Experiments,
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::Preprocess => 0,
            Self::Train => 1,
            Self::Predict => 2,
            Self::Experiments => 3,
        }
    }
}

impl fmt::Display for RouteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RouteName {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| DomainError::UnknownRoute(s.to_string()))
    }
}

/// Opaque backend services fronted by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendService {
    DataProcessing,
    ModelTraining,
    ModelServing,
    Experiments,
}

impl BackendService {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DataProcessing => "data-processing",
            Self::ModelTraining => "model-training",
            Self::ModelServing => "model-serving",
            Self::Experiments => "experiments",
        }
    }
}

impl fmt::Display for BackendService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outbound HTTP method of a route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
}

/// Per-route cache freshness policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub enabled: bool,
    pub ttl: Duration,
}

impl CachePolicy {
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            enabled: false,
            ttl: Duration::ZERO,
        }
    }

    #[must_use]
    pub const fn for_secs(secs: u64) -> Self {
        Self {
            enabled: true,
            ttl: Duration::from_secs(secs),
        }
    }

    /// A zero TTL disables caching even when the flag is set
    #[must_use]
    pub const fn is_cacheable(&self) -> bool {
        self.enabled && !self.ttl.is_zero()
    }
}

/// One orchestrated operation mapped to exactly one backend endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub name: RouteName,
    pub backend: BackendService,
    pub base_url: String,
    pub method: HttpMethod,
    pub path: &'static str,
    pub cache: CachePolicy,
    /// Message surfaced to callers when the backend call fails
    pub failure_detail: &'static str,
}

impl Route {
    /// Standard wiring for a route against the given backend base address
    pub fn standard(name: RouteName, base_url: impl Into<String>) -> Self {
        let (method, path, cache, failure_detail) = match name {
            RouteName::Preprocess => (
                HttpMethod::Post,
                "/preprocess",
                CachePolicy::for_secs(3600),
                "preprocessing failed",
            ),
            RouteName::Train => (
                HttpMethod::Post,
                "/train",
                CachePolicy::disabled(),
                "training failed",
            ),
            RouteName::Predict => (
                HttpMethod::Post,
                "/predict",
                CachePolicy::for_secs(600),
                "inference failed",
            ),
            RouteName::Experiments => (
                HttpMethod::Get,
                "/run_tests",
                CachePolicy::disabled(),
                "experimentation failed",
            ),
        };

        Self {
            name,
            backend: name.backend(),
            base_url: base_url.into(),
            method,
            path,
            cache,
            failure_detail,
        }
    }

    /// Full backend URL for this route
    #[must_use]
    pub fn url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.path)
    }

    #[must_use]
    pub const fn is_cacheable(&self) -> bool {
        self.cache.is_cacheable()
    }

    /// TTL to store successful results with
    #[must_use]
    pub const fn ttl(&self) -> Ttl {
        if self.cache.is_cacheable() {
            Ttl::Expires(self.cache.ttl)
        } else {
            Ttl::NoStore
        }
    }
}

/// Base addresses of the four backend services
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendAddresses {
    pub data_processing: String,
    pub model_training: String,
    pub model_serving: String,
    pub experiments: String,
}

impl BackendAddresses {
    /// Every service behind the same base address (simulators, tests)
    pub fn uniform(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            data_processing: base_url.clone(),
            model_training: base_url.clone(),
            model_serving: base_url.clone(),
            experiments: base_url,
        }
    }

    #[must_use]
    pub fn for_service(&self, service: BackendService) -> &str {
        match service {
            BackendService::DataProcessing => &self.data_processing,
            BackendService::ModelTraining => &self.model_training,
            BackendService::ModelServing => &self.model_serving,
            BackendService::Experiments => &self.experiments,
        }
    }
}

impl Default for BackendAddresses {
    fn default() -> Self {
        Self {
            data_processing: "http://data-processing:5000".to_string(),
            model_training: "http://model-training:5000".to_string(),
            model_serving: "http://model-serving:5000".to_string(),
            experiments: "http://experiments:5000".to_string(),
        }
    }
}

/// Immutable table of every orchestrated route
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: [Route; 4],
}

impl RouteTable {
    #[must_use]
    pub fn new(addresses: &BackendAddresses) -> Self {
        let route = |name: RouteName| Route::standard(name, addresses.for_service(name.backend()));
        Self {
            routes: RouteName::ALL.map(route),
        }
    }

    #[must_use]
    pub const fn get(&self, name: RouteName) -> &Route {
        &self.routes[name.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }
}

// =============================================================================
// PAYLOAD & CACHE KEYS
// =============================================================================

/// Structured request body submitted by a caller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(Map<String, Value>);

impl Payload {
    /// Compact JSON with object keys sorted at every depth
    #[must_use]
    pub fn canonical_json(&self) -> String {
        canonicalize(&Value::Object(self.0.clone())).to_string()
    }
}

impl From<Map<String, Value>> for Payload {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

impl TryFrom<Value> for Payload {
    type Error = DomainError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(DomainError::PayloadNotObject(json_kind(&other))),
        }
    }
}

/// Rebuild a value with sorted object keys so serialization is order-independent
#[must_use]
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(fields) => {
            let mut keys: Vec<&String> = fields.keys().collect();
            keys.sort();
            let sorted = keys
                .into_iter()
                .map(|key| (key.clone(), canonicalize(&fields[key])))
                .collect::<Map<String, Value>>();
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Cache key, namespaced by route when derived
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Deterministic key for a route and payload: `{route}:{canonical-json}`
    #[must_use]
    pub fn derive(route: RouteName, payload: &Payload) -> Self {
        Self(format!("{}:{}", route.as_str(), payload.canonical_json()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// TTL
// =============================================================================

/// Expiration requested for a cache write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ttl {
    /// Use the store's configured default
    #[default]
    StoreDefault,
    /// Expire after the given duration
    Expires(Duration),
    /// Do not persist the entry at all
    NoStore,
}

impl Ttl {
    /// Zero means store default, negative means no-store
    #[must_use]
    pub fn from_secs(secs: i64) -> Self {
        match secs {
            0 => Self::StoreDefault,
            s if s < 0 => Self::NoStore,
            s => Self::Expires(Duration::from_secs(s.unsigned_abs())),
        }
    }

    /// Effective lifetime, `None` when nothing should be stored
    #[must_use]
    pub fn resolve(self, store_default: Duration) -> Option<Duration> {
        match self {
            Self::StoreDefault => Some(store_default),
            Self::Expires(d) if d.is_zero() => Some(store_default),
            Self::Expires(d) => Some(d),
            Self::NoStore => None,
        }
    }
}

// =============================================================================
// BACKEND RESPONSES
// =============================================================================

/// Coarse status classification of a backend exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusClass {
    Success,
    ClientError,
    ServerError,
}

impl StatusClass {
    /// 2xx success, 4xx client error, anything else server error
    #[must_use]
    pub const fn from_status(status: u16) -> Self {
        match status {
            200..=299 => Self::Success,
            400..=499 => Self::ClientError,
            _ => Self::ServerError,
        }
    }
}

/// Why a backend could not produce a usable response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportFailure {
    Connect,
    Timeout,
    Malformed,
    Transport,
}

impl TransportFailure {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Timeout => "timeout",
            Self::Malformed => "malformed",
            Self::Transport => "transport",
        }
    }
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized result of one backend call
#[derive(Debug, Clone, PartialEq)]
pub enum BackendResponse {
    /// 2xx with a JSON body, `null` when the backend sent none
    Success { status: u16, body: Value },
    /// Backend answered with a non-success status; body kept for diagnostics
    Rejected { status: u16, body: String },
    /// No usable answer (refused, timed out, malformed)
    Unreachable {
        failure: TransportFailure,
        detail: String,
    },
}

impl BackendResponse {
    #[must_use]
    pub const fn class(&self) -> StatusClass {
        match self {
            Self::Success { .. } => StatusClass::Success,
            Self::Rejected { status, .. } => StatusClass::from_status(*status),
            Self::Unreachable { .. } => StatusClass::ServerError,
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Domain validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("Unknown route: {0}")]
    UnknownRoute(String),

    #[error("Request payload must be a JSON object, got {0}")]
    PayloadNotObject(&'static str),
}
