//! Key-value store adapters
//!
//! Both cache layers persist through a [`KeyValueStore`]: L1 writes one key per
//! prompt/fingerprint pair, and the flat vector index used by L2 writes one key
//! per embedded record. Layers are isolated from each other (and from any other
//! user of the same store) purely by key prefix.

pub mod memory;
pub mod redis;

pub use self::memory::{start_auto_cleanup, MemoryStore};
pub use self::redis::RedisStore;

use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Minimal get/set-with-expiry contract over a string key-value store
///
/// Implementations must treat an entry whose TTL has elapsed as absent.
/// A zero TTL means the value is already expired: nothing is stored and any
/// previous value under the key is removed.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch a live value
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value that expires after `ttl`, replacing any existing value
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Remove a single key, reporting whether it existed
    async fn delete(&self, key: &str) -> Result<bool>;

    /// All live `(key, value)` pairs whose key starts with `prefix`
    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>>;

    /// Remove every key starting with `prefix`, returning how many were removed
    async fn delete_prefix(&self, prefix: &str) -> Result<usize>;
}

#[async_trait]
impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key).await
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        (**self).set_with_ttl(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        (**self).delete(key).await
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>> {
        (**self).scan_prefix(prefix).await
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<usize> {
        (**self).delete_prefix(prefix).await
    }
}
