//! # Two-Level Prompt Cache
//!
//! Caches model generations keyed by prompt and model fingerprint.
//!
//! ## Architecture
//!
//! - Layer 1 ([`ExactMatchCache`]): exact prompt + fingerprint match in a
//!   key-value store
//! - Layer 2 ([`SemanticCache`]): nearest stored prompt embedding, accepted
//!   when the distance is strictly below a threshold
//! - [`LayeredCache`]: checks L1, falls through to L2, and promotes L2 hits
//!   into L1 under the prompt that produced them
//!
//! Every layer implements [`LlmCache`], so layers compose freely and callers
//! depend only on lookup/update/clear.
//!
//! ## Example
//!
//! ```rust
//! use llm_layered_cache::cache::{CachedGeneration, ExactMatchCache, LlmCache};
//! use llm_layered_cache::config::LayerConfig;
//! use llm_layered_cache::store::MemoryStore;
//!
//! # async fn example() -> llm_layered_cache::Result<()> {
//! let l1 = ExactMatchCache::new(MemoryStore::new(), LayerConfig::exact_match());
//!
//! l1.update("Hello", "modelA", &CachedGeneration::new("Hi!")).await?;
//!
//! if let Some(hit) = l1.lookup("Hello", "modelA").await? {
//!     println!("Cache hit: {}", hit.text);
//! }
//! # Ok(())
//! # }
//! ```

pub mod entry;
pub mod exact;
pub mod key;
pub mod layered;
pub mod semantic;
pub mod types;

pub use entry::StoredEntry;
pub use exact::ExactMatchCache;
pub use layered::LayeredCache;
pub use semantic::SemanticCache;
pub use types::{CacheLayer, CacheStats, CachedGeneration, LookupOutcome};

use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Lookup/update/clear contract shared by every cache layer
#[async_trait]
pub trait LlmCache: Send + Sync {
    /// Cached generation for `prompt` under `fingerprint`, if any
    async fn lookup(&self, prompt: &str, fingerprint: &str) -> Result<Option<CachedGeneration>>;

    /// Store `entry` for `prompt` under `fingerprint`
    async fn update(&self, prompt: &str, fingerprint: &str, entry: &CachedGeneration) -> Result<()>;

    /// Remove every entry this cache manages; no-op unless overridden
    async fn clear(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl<C: LlmCache + ?Sized> LlmCache for Arc<C> {
    async fn lookup(&self, prompt: &str, fingerprint: &str) -> Result<Option<CachedGeneration>> {
        (**self).lookup(prompt, fingerprint).await
    }

    async fn update(&self, prompt: &str, fingerprint: &str, entry: &CachedGeneration) -> Result<()> {
        (**self).update(prompt, fingerprint, entry).await
    }

    async fn clear(&self) -> Result<()> {
        (**self).clear().await
    }
}
