//! Layer 1: exact prompt/fingerprint match

use super::entry::StoredEntry;
use super::key::entry_key;
use super::{CachedGeneration, LlmCache};
use crate::config::LayerConfig;
use crate::error::Result;
use crate::store::KeyValueStore;
use async_trait::async_trait;
use tracing::{debug, info};

/// Exact-match cache over a [`KeyValueStore`]
///
/// Entries live under `{prefix}:{digest(prompt)}:{digest(fingerprint)}` and
/// expire after the layer's TTL. Clearing removes only keys under the prefix.
pub struct ExactMatchCache<S> {
    store: S,
    config: LayerConfig,
}

impl<S: KeyValueStore> ExactMatchCache<S> {
    pub fn new(store: S, config: LayerConfig) -> Self {
        info!(
            "Initializing exact-match cache (prefix: {}, ttl: {:?})",
            config.prefix, config.ttl
        );
        Self { store, config }
    }

    pub fn config(&self) -> &LayerConfig {
        &self.config
    }

    /// Store key for a prompt/fingerprint pair
    pub fn key(&self, prompt: &str, fingerprint: &str) -> String {
        entry_key(&self.config.prefix, prompt, fingerprint)
    }
}

#[async_trait]
impl<S: KeyValueStore> LlmCache for ExactMatchCache<S> {
    async fn lookup(&self, prompt: &str, fingerprint: &str) -> Result<Option<CachedGeneration>> {
        let key = self.key(prompt, fingerprint);

        let Some(json) = self.store.get(&key).await? else {
            debug!("L1 miss: {}", key);
            return Ok(None);
        };

        let entry = StoredEntry::<CachedGeneration>::from_json(&json)?;
        match entry.into_live() {
            Some(generation) => {
                debug!("L1 hit: {}", key);
                Ok(Some(generation))
            }
            None => {
                debug!("L1 entry expired: {}", key);
                Ok(None)
            }
        }
    }

    async fn update(&self, prompt: &str, fingerprint: &str, entry: &CachedGeneration) -> Result<()> {
        let key = self.key(prompt, fingerprint);
        let ttl = self.config.ttl_with_jitter();
        let json = StoredEntry::new(entry, ttl).to_json()?;

        self.store.set_with_ttl(&key, &json, ttl).await?;
        debug!("L1 write: {} (ttl: {:?})", key, ttl);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let removed = self.store.delete_prefix(&self.config.namespace()).await?;
        info!("Cleared {} entries from L1 ({})", removed, self.config.prefix);
        Ok(())
    }
}
