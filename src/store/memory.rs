//! In-process store with per-key expiry
//!
//! Used for tests and for running the cache without an external server.
//! Expired keys are dropped lazily when read and in bulk by
//! [`MemoryStore::cleanup_expired`].

use super::KeyValueStore;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

struct StoredValue {
    value: String,
    expires_at: DateTime<Utc>,
}

impl StoredValue {
    fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// Thread-safe in-memory key-value store
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, StoredValue>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys, including any not yet cleaned up after expiry
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Remove all expired entries, returning how many were dropped
    pub async fn cleanup_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, stored| !stored.is_expired());
        let removed = before - entries.len();

        if removed > 0 {
            debug!("Cleaned up {} expired entries", removed);
        }
        removed
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some(stored) if !stored.is_expired() => return Ok(Some(stored.value.clone())),
                Some(_) => {}
            }
        }

        debug!("Store entry expired: {}", key);
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(StoredValue::is_expired) {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut entries = self.entries.write().await;

        if ttl.is_zero() {
            entries.remove(key);
            return Ok(());
        }

        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        let expires_at = Utc::now()
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        entries.insert(
            key.to_string(),
            StoredValue {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|(key, stored)| key.starts_with(prefix) && !stored.is_expired())
            .map(|(key, stored)| (key.clone(), stored.value.clone()))
            .collect())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<usize> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        Ok(before - entries.len())
    }
}

/// Background task for automatic expiry cleanup
pub async fn start_auto_cleanup(store: Arc<MemoryStore>, interval: Duration) {
    if interval.is_zero() {
        warn!("Auto cleanup interval is zero, cleanup task not started");
        return;
    }

    info!("Starting automatic store cleanup task (interval: {:?})", interval);

    loop {
        tokio::time::sleep(interval).await;
        store.cleanup_expired().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get() {
        let store = MemoryStore::new();
        store
            .set_with_ttl("k1", "v1", Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(store.get("k1").await.unwrap(), Some("v1".to_string()));
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_overwrite_replaces_value() {
        let store = MemoryStore::new();
        store.set_with_ttl("k", "old", Duration::from_secs(60)).await.unwrap();
        store.set_with_ttl("k", "new", Duration::from_secs(60)).await.unwrap();

        assert_eq!(store.get("k").await.unwrap(), Some("new".to_string()));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_zero_ttl_removes_value() {
        let store = MemoryStore::new();
        store.set_with_ttl("k", "v", Duration::from_secs(60)).await.unwrap();
        store.set_with_ttl("k", "v2", Duration::ZERO).await.unwrap();

        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_expiration() {
        let store = MemoryStore::new();
        store
            .set_with_ttl("k", "v", Duration::from_millis(50))
            .await
            .unwrap();
        assert!(store.get("k").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(store.scan_prefix("").await.unwrap().is_empty());
        // lazily removed on read
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_cleanup_expired() {
        let store = MemoryStore::new();
        store.set_with_ttl("a", "1", Duration::from_millis(20)).await.unwrap();
        store.set_with_ttl("b", "2", Duration::from_millis(20)).await.unwrap();
        store.set_with_ttl("c", "3", Duration::from_secs(60)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(60)).await;

        assert_eq!(store.cleanup_expired().await, 2);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_prefix_operations() {
        let store = MemoryStore::new();
        let ttl = Duration::from_secs(60);
        store.set_with_ttl("l1_cache:a", "1", ttl).await.unwrap();
        store.set_with_ttl("l1_cache:b", "2", ttl).await.unwrap();
        store.set_with_ttl("l1_cache_other:c", "3", ttl).await.unwrap();
        store.set_with_ttl("unrelated", "4", ttl).await.unwrap();

        let mut scanned = store.scan_prefix("l1_cache:").await.unwrap();
        scanned.sort();
        assert_eq!(
            scanned,
            vec![
                ("l1_cache:a".to_string(), "1".to_string()),
                ("l1_cache:b".to_string(), "2".to_string()),
            ]
        );

        assert_eq!(store.delete_prefix("l1_cache:").await.unwrap(), 2);
        assert!(store.get("l1_cache_other:c").await.unwrap().is_some());
        assert!(store.get("unrelated").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemoryStore::new();
        store.set_with_ttl("k", "v", Duration::from_secs(60)).await.unwrap();

        assert!(store.delete("k").await.unwrap());
        assert!(!store.delete("k").await.unwrap());
    }
}
