//! # Gateway Configuration
//!
//! Environment-based configuration, read once at start-up and injected into
//! the cache store, backend client and orchestrator.

use gateway_cache::CacheConfig;
use gateway_domain::BackendAddresses;
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors reported at start-up
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {var}: '{value}' ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Which cache store implementation to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    Redis,
    Memory,
}

impl FromStr for CacheBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "redis" => Ok(Self::Redis),
            "memory" => Ok(Self::Memory),
            other => Err(format!("expected 'redis' or 'memory', got '{other}'")),
        }
    }
}

/// Redis connection configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
}

/// Gateway configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address
    pub server_addr: SocketAddr,

    /// Cache store implementation
    pub cache_backend: CacheBackend,

    /// Redis configuration
    pub redis: RedisConfig,

    /// Lifetime for writes that ask for the store default
    pub cache_default_ttl: Duration,

    /// Bound on each cache round-trip
    pub cache_op_timeout: Duration,

    /// Backend service base addresses
    pub backends: BackendAddresses,

    /// Per-call backend timeout
    pub backend_timeout: Duration,

    /// Logging level
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an unparseable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an unparseable value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = BackendAddresses::default();
        let string = |var: &str, default: &str| lookup(var).unwrap_or_else(|| default.to_string());

        Ok(Self {
            server_addr: parse(&lookup, "SERVER_ADDR", "0.0.0.0:8000".parse().ok())?,

            cache_backend: parse(&lookup, "CACHE_BACKEND", Some(CacheBackend::Redis))?,

            redis: RedisConfig {
                host: string("REDIS_HOST", "redis"),
                port: parse(&lookup, "REDIS_PORT", Some(6379))?,
            },

            cache_default_ttl: Duration::from_secs(nonzero(&lookup, "CACHE_DEFAULT_TTL_SECS", 300)?),

            cache_op_timeout: Duration::from_millis(nonzero(&lookup, "CACHE_OP_TIMEOUT_MS", 250)?),

            backends: BackendAddresses {
                data_processing: string("DATA_PROCESSING_URL", &defaults.data_processing),
                model_training: string("MODEL_TRAINING_URL", &defaults.model_training),
                model_serving: string("MODEL_SERVING_URL", &defaults.model_serving),
                experiments: string("EXPERIMENTS_URL", &defaults.experiments),
            },

            backend_timeout: Duration::from_secs(nonzero(&lookup, "BACKEND_TIMEOUT_SECS", 30)?),

            log_level: string("LOG_LEVEL", "info"),
        })
    }

    /// Cache store configuration derived from this config
    #[must_use]
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            default_ttl: self.cache_default_ttl,
            op_timeout: self.cache_op_timeout,
            ..CacheConfig::for_host(&self.redis.host, self.redis.port)
        }
    }
}

fn parse<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: Option<T>,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: ToString,
{
    let invalid = |value: String, reason: String| ConfigError::Invalid { var, value, reason };

    match lookup(var) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e: T::Err| invalid(value.clone(), e.to_string())),
        None => default.ok_or_else(|| invalid(String::new(), "missing".to_string())),
    }
}

/// Durations of zero would disable the cache or fail every backend call
fn nonzero(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: u64,
) -> Result<u64, ConfigError> {
    match parse(lookup, var, Some(default))? {
        0 => Err(ConfigError::Invalid {
            var,
            value: "0".to_string(),
            reason: "must be greater than zero".to_string(),
        }),
        value => Ok(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_with(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_with(&[]).unwrap();

        assert_eq!(config.server_addr, "0.0.0.0:8000".parse().unwrap());
        assert_eq!(config.cache_backend, CacheBackend::Redis);
        assert_eq!(config.redis.host, "redis");
        assert_eq!(config.redis.port, 6379);
        assert_eq!(config.backends, BackendAddresses::default());
        assert_eq!(config.backend_timeout, Duration::from_secs(30));
        assert_eq!(config.cache_config().url, "redis://redis:6379/0");
    }

    #[test]
    fn test_overrides() {
        let config = config_with(&[
            ("REDIS_HOST", "cache.internal"),
            ("REDIS_PORT", "6380"),
            ("MODEL_SERVING_URL", "http://inference:9000"),
            ("CACHE_BACKEND", "Memory"),
            ("CACHE_OP_TIMEOUT_MS", "50"),
        ])
        .unwrap();

        assert_eq!(config.cache_backend, CacheBackend::Memory);
        assert_eq!(config.backends.model_serving, "http://inference:9000");
        assert_eq!(config.backends.model_training, "http://model-training:5000");

        let cache = config.cache_config();
        assert_eq!(cache.url, "redis://cache.internal:6380/0");
        assert_eq!(cache.op_timeout, Duration::from_millis(50));
    }

    #[test]
    fn test_invalid_port_is_reported() {
        let err = config_with(&[("REDIS_PORT", "not-a-port")]).unwrap_err();

        assert!(matches!(err, ConfigError::Invalid { var: "REDIS_PORT", .. }));
    }

    #[test]
    fn test_invalid_cache_backend_is_reported() {
        let err = config_with(&[("CACHE_BACKEND", "memcached")]).unwrap_err();

        assert!(err.to_string().contains("CACHE_BACKEND"));
    }

    #[test]
    fn test_zero_durations_rejected() {
        for var in ["BACKEND_TIMEOUT_SECS", "CACHE_OP_TIMEOUT_MS", "CACHE_DEFAULT_TTL_SECS"] {
            let err = config_with(&[(var, "0")]).unwrap_err();

            assert!(matches!(err, ConfigError::Invalid { var: v, .. } if v == var));
        }
    }
}
