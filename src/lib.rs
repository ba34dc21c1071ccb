//! # llm-layered-cache
//!
//! A two-level response cache for large-language-model prompts.
//!
//! ## Features
//!
//! - L1 exact match on `(prompt, model fingerprint)` in a key-value store
//! - L2 semantic match on prompt embeddings with a strict distance threshold
//! - Fallthrough from L1 to L2, with L2 hits promoted into L1
//! - Redis and in-memory stores behind one [`store::KeyValueStore`] trait
//! - Gemini model and embedding clients, plus local fastembed embeddings
//!   behind the `local-embeddings` feature
//! - Timed invocation wrapper for measuring cache speedups
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use llm_layered_cache::cache::{ExactMatchCache, LayeredCache, SemanticCache};
//! use llm_layered_cache::config::CacheSettings;
//! use llm_layered_cache::embedding::GeminiEmbedder;
//! use llm_layered_cache::invoke::CachedModel;
//! use llm_layered_cache::llm::GeminiModel;
//! use llm_layered_cache::store::RedisStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = CacheSettings::from_env()?;
//!     let api_key = settings.require_api_key()?.to_string();
//!     let store = Arc::new(RedisStore::connect(&settings.redis_url).await?);
//!
//!     let l1 = ExactMatchCache::new(store.clone(), settings.l1.clone());
//!     let l2 = SemanticCache::with_store(
//!         store,
//!         GeminiEmbedder::new(api_key.clone(), settings.embedding_model.clone())?,
//!         settings.l2.clone(),
//!         settings.distance_metric,
//!         settings.distance_threshold,
//!     );
//!
//!     let model = GeminiModel::new(api_key, settings.model.clone())?;
//!     let cached = CachedModel::new(model, LayeredCache::new(l1, l2));
//!
//!     let response = cached.invoke("What is the capital city of France?").await?;
//!     println!("{} ({:?}, cached: {})", response.text(), response.elapsed, response.from_cache);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod embedding;
pub mod error;
pub mod invoke;
pub mod llm;
pub mod store;
pub mod vector;

// Re-export main types for convenience
pub use cache::{
    CacheLayer, CacheStats, CachedGeneration, ExactMatchCache, LayeredCache, LlmCache,
    LookupOutcome, SemanticCache,
};
pub use config::{CacheSettings, CacheSettingsBuilder, LayerConfig};
pub use embedding::{Embedder, GeminiEmbedder};
pub use error::{CacheError, Result};
pub use invoke::{speedup, CachedModel, TimedResponse};
pub use llm::{GeminiModel, LanguageModel, MockModel, ModelParams};
pub use store::{KeyValueStore, MemoryStore, RedisStore};
pub use vector::{DistanceMetric, FlatVectorIndex, VectorFilter, VectorIndex};

#[cfg(feature = "local-embeddings")]
pub use embedding::FastEmbedder;
