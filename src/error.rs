//! Error types for cache store operations
//!
//! These errors describe failures of the shared key-value store and the
//! connection to it. They stay inside the crate: every public read and
//! invalidation path recovers from them and logs instead of surfacing them
//! to callers.

use thiserror::Error;

/// Main error type for key-value store operations
#[derive(Error, Debug)]
pub enum CacheError {
    /// Connection error - network or connection manager issues
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Operation timeout
    #[error("Operation timed out after {timeout_ms}ms: {context}")]
    TimeoutError { timeout_ms: u64, context: String },

    /// Server-side script failed or returned an unexpected value
    #[error("Script error: {0}")]
    ScriptError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Serialization/Deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Redis driver error (wrapper)
    #[error("Redis driver error: {0}")]
    DriverError(#[from] redis::RedisError),

    /// Generic error with context
    #[error("Error: {0}")]
    Other(String),
}

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, CacheError>;

impl From<String> for CacheError {
    fn from(s: String) -> Self {
        CacheError::Other(s)
    }
}

impl From<&str> for CacheError {
    fn from(s: &str) -> Self {
        CacheError::Other(s.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        CacheError::SerializationError(e.to_string())
    }
}
