//! Cache layer error types

use thiserror::Error;

/// Cache layer errors
///
/// None of these reach gateway callers; the fail-open wrapper turns them
/// into misses and logged warnings.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    #[error("Redis error: {0}")]
    Redis(String),

    #[error("Cache operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Invalid cache configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_refusal() || err.is_connection_dropped() || err.is_io_error() {
            Self::Unavailable(err.to_string())
        } else {
            Self::Redis(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;
