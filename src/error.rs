//! Error types for the cache layer
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache layer.
///
/// A cache miss is not an error: reads return `Ok(None)` instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Malformed, incomplete or conflicting connection configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Store unreachable, connection refused, dropped or timed out
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    /// Value could not be encoded to or decoded from JSON
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Store accepted the connection but rejected the command
    #[error("Store error: {0}")]
    Store(String),
}

impl CacheError {
    /// Returns true for errors raised while reading configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(self, CacheError::Configuration(_))
    }

    /// Returns true for errors caused by an unreachable store.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, CacheError::Connectivity(_))
    }
}

// == Redis Error Mapping ==
impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_refusal() || err.is_timeout() || err.is_connection_dropped() {
            CacheError::Connectivity(err.to_string())
        } else if err.is_io_error() {
            CacheError::Connectivity(err.to_string())
        } else {
            CacheError::Store(err.to_string())
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache layer.
pub type Result<T> = std::result::Result<T, CacheError>;
