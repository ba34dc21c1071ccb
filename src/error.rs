//! Error types for cache operations
//!
//! Every failure surfaced by the cache layers, the store adapters and the
//! model/embedding providers is expressed as a [`CacheError`]. The cache layer
//! never retries store errors itself; they travel up to the caller.

use thiserror::Error;

/// Main error type for the layered cache
#[derive(Error, Debug)]
pub enum CacheError {
    /// Configuration error - missing connection string or credentials
    #[error("Configuration error: {0}")]
    Config(String),

    /// Store unavailable or rejected the command
    #[error("Store error: {0}")]
    Store(String),

    /// Redis client error (wrapper)
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Embedding could not be produced, so the semantic layer cannot proceed
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Model or embedding provider returned an error response
    #[error("Provider error{}: {message}", status_suffix(.status))]
    Provider {
        status: Option<u16>,
        message: String,
    },

    /// HTTP transport error (wrapper)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Operation timeout
    #[error("Operation timed out after {timeout_seconds}s: {context}")]
    Timeout {
        timeout_seconds: u64,
        context: String,
    },

    /// Serialization/Deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic error with context
    #[error("Error: {0}")]
    Other(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({s})")).unwrap_or_default()
}

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

impl CacheError {
    /// Whether a provider call failing with this error is worth retrying
    pub fn is_transient(&self) -> bool {
        match self {
            CacheError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            CacheError::Provider {
                status: Some(status),
                ..
            } => *status == 429 || *status >= 500,
            CacheError::Timeout { .. } => true,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        CacheError::Serialization(e.to_string())
    }
}

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
