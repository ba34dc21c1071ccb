//! Layer 2: semantic similarity match
//!
//! The prompt is embedded and compared with stored prompt embeddings. Only
//! records generated under the same model fingerprint are candidates, so a
//! paraphrase never returns an answer produced by a different model or
//! parameter set. Records written by another embedding model are skipped the
//! same way, since their vectors are not comparable. A candidate is a hit only
//! when its distance is strictly below the threshold; a distance equal to the
//! threshold is always a miss.

use super::entry::StoredEntry;
use super::{CachedGeneration, LlmCache};
use crate::config::LayerConfig;
use crate::embedding::Embedder;
use crate::error::Result;
use crate::store::KeyValueStore;
use crate::vector::{DistanceMetric, FlatVectorIndex, VectorFilter, VectorIndex, VectorRecord};
use async_trait::async_trait;
use tracing::{debug, info};

/// Default maximum (exclusive) cosine distance for a hit
pub const DEFAULT_DISTANCE_THRESHOLD: f32 = 0.2;

/// Semantic cache over a [`VectorIndex`] and an [`Embedder`]
pub struct SemanticCache<I, E> {
    index: I,
    embedder: E,
    config: LayerConfig,
    threshold: f32,
}

impl<S: KeyValueStore, E: Embedder> SemanticCache<FlatVectorIndex<S>, E> {
    /// Semantic cache whose records live in `store` under the layer prefix
    pub fn with_store(
        store: S,
        embedder: E,
        config: LayerConfig,
        metric: DistanceMetric,
        threshold: f32,
    ) -> Self {
        let index = FlatVectorIndex::new(store, config.prefix.clone(), metric);
        Self::new(index, embedder, config, threshold)
    }
}

impl<I: VectorIndex, E: Embedder> SemanticCache<I, E> {
    pub fn new(index: I, embedder: E, config: LayerConfig, threshold: f32) -> Self {
        info!(
            "Initializing semantic cache (prefix: {}, ttl: {:?}, threshold: {}, embedder: {})",
            config.prefix,
            config.ttl,
            threshold,
            embedder.model_id()
        );
        Self {
            index,
            embedder,
            config,
            threshold,
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn config(&self) -> &LayerConfig {
        &self.config
    }

    /// Closest live entry for `prompt` and its distance, ignoring the threshold
    pub async fn nearest(
        &self,
        prompt: &str,
        fingerprint: &str,
    ) -> Result<Option<(CachedGeneration, f32)>> {
        let embedding = self.embedder.embed(prompt).await?;

        let filter = VectorFilter::default()
            .fingerprint(fingerprint)
            .embedding_model(self.embedder.model_id());

        let Some(found) = self.index.nearest(&embedding, &filter).await? else {
            return Ok(None);
        };

        let entry = StoredEntry::<CachedGeneration>::from_json(&found.record.payload)?;
        Ok(entry.into_live().map(|generation| (generation, found.distance)))
    }

    fn accepts(&self, distance: f32) -> bool {
        distance < self.threshold
    }
}

#[async_trait]
impl<I: VectorIndex, E: Embedder> LlmCache for SemanticCache<I, E> {
    async fn lookup(&self, prompt: &str, fingerprint: &str) -> Result<Option<CachedGeneration>> {
        match self.nearest(prompt, fingerprint).await? {
            Some((generation, distance)) if self.accepts(distance) => {
                debug!("L2 hit at distance {:.4} (< {})", distance, self.threshold);
                Ok(Some(generation))
            }
            Some((_, distance)) => {
                debug!("L2 miss: nearest distance {:.4} (>= {})", distance, self.threshold);
                Ok(None)
            }
            None => {
                debug!("L2 miss: no candidates");
                Ok(None)
            }
        }
    }

    async fn update(&self, prompt: &str, fingerprint: &str, entry: &CachedGeneration) -> Result<()> {
        let embedding = self.embedder.embed(prompt).await?;
        let ttl = self.config.ttl_with_jitter();
        let payload = StoredEntry::new(entry, ttl).to_json()?;

        let record = VectorRecord::new(prompt, fingerprint, embedding, payload)
            .with_embedding_model(self.embedder.model_id());
        self.index.insert(record, ttl).await?;
        debug!("L2 write ({} chars, ttl: {:?})", prompt.len(), ttl);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let removed = self.index.clear().await?;
        info!("Cleared {} entries from L2 ({})", removed, self.config.prefix);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;
    use crate::store::MemoryStore;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    /// Maps known phrases to fixed unit vectors
    struct TableEmbedder(HashMap<&'static str, Vec<f32>>, &'static str);

    #[async_trait]
    impl Embedder for TableEmbedder {
        fn model_id(&self) -> &str {
            self.1
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.0
                .get(text)
                .cloned()
                .ok_or_else(|| CacheError::Embedding(format!("no vector for '{text}'")))
        }
    }

    /// Unit vector at cosine distance `d` from `[1, 0]`
    fn at_distance(d: f32) -> Vec<f32> {
        let cos = 1.0 - d;
        vec![cos, (1.0 - cos * cos).sqrt()]
    }

    fn semantic(ttl: Duration) -> SemanticCache<FlatVectorIndex<Arc<MemoryStore>>, TableEmbedder> {
        let table = HashMap::from([
            ("Hello", vec![1.0, 0.0]),
            ("HELLO THERE", at_distance(0.1)),
            ("Goodbye", at_distance(0.9)),
            ("Exactly", vec![0.5, 0.0]),
        ]);
        let embedder = TableEmbedder(table, "table");
        SemanticCache::with_store(
            Arc::new(MemoryStore::new()),
            embedder,
            LayerConfig::new("l2_cache", ttl),
            DistanceMetric::Cosine,
            DEFAULT_DISTANCE_THRESHOLD,
        )
    }

    #[tokio::test]
    async fn test_similar_prompt_hits() {
        let l2 = semantic(Duration::from_secs(60));
        let entry = CachedGeneration::new("Hi!");
        l2.update("Hello", "modelA", &entry).await.unwrap();

        assert_eq!(l2.lookup("HELLO THERE", "modelA").await.unwrap(), Some(entry));
        assert!(l2.lookup("Goodbye", "modelA").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fingerprint_is_hard_filter() {
        let l2 = semantic(Duration::from_secs(60));
        l2.update("Hello", "modelA", &CachedGeneration::new("Hi!")).await.unwrap();

        assert!(l2.lookup("Hello", "modelB").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_threshold_boundary_is_excluded() {
        let mut l2 = semantic(Duration::from_secs(60));
        l2.update("Hello", "m", &CachedGeneration::new("Hi!")).await.unwrap();

        // pin the threshold to the exact observed distance
        let (_, distance) = l2.nearest("HELLO THERE", "m").await.unwrap().unwrap();
        l2.threshold = distance;

        for _ in 0..5 {
            assert!(l2.lookup("HELLO THERE", "m").await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn test_identical_direction_always_hits() {
        let l2 = semantic(Duration::from_secs(60));
        l2.update("Hello", "m", &CachedGeneration::new("Hi!")).await.unwrap();

        let (_, distance) = l2.nearest("Exactly", "m").await.unwrap().unwrap();
        assert_eq!(distance, 0.0);
        assert!(l2.lookup("Exactly", "m").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_zero_ttl_never_returned() {
        let l2 = semantic(Duration::ZERO);
        l2.update("Hello", "m", &CachedGeneration::new("Hi!")).await.unwrap();

        assert!(l2.lookup("Hello", "m").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_embedding_failure_aborts() {
        let l2 = semantic(Duration::from_secs(60));

        let err = l2.lookup("unknown phrase", "m").await.unwrap_err();
        assert!(matches!(err, CacheError::Embedding(_)));

        let err = l2
            .update("unknown phrase", "m", &CachedGeneration::new("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::Embedding(_)));
    }

    #[tokio::test]
    async fn test_switching_embedder_ignores_old_vectors() {
        let store = Arc::new(MemoryStore::new());
        let layer = LayerConfig::new("l2_cache", Duration::from_secs(60));

        let old = SemanticCache::with_store(
            store.clone(),
            TableEmbedder(HashMap::from([("Hello", vec![1.0, 0.0, 0.0])]), "old-3d"),
            layer.clone(),
            DistanceMetric::Cosine,
            DEFAULT_DISTANCE_THRESHOLD,
        );
        old.update("Hello", "m", &CachedGeneration::new("Hi!")).await.unwrap();

        let new = SemanticCache::with_store(
            store,
            TableEmbedder(HashMap::from([("Hello", vec![1.0, 0.0])]), "new-2d"),
            layer,
            DistanceMetric::Cosine,
            DEFAULT_DISTANCE_THRESHOLD,
        );

        // no dimension mismatch error, just a miss
        assert!(new.lookup("Hello", "m").await.unwrap().is_none());

        new.update("Hello", "m", &CachedGeneration::new("Hi again!")).await.unwrap();
        assert_eq!(new.lookup("Hello", "m").await.unwrap().unwrap().text, "Hi again!");
    }

    #[tokio::test]
    async fn test_clear() {
        let l2 = semantic(Duration::from_secs(60));
        l2.update("Hello", "m", &CachedGeneration::new("Hi!")).await.unwrap();

        l2.clear().await.unwrap();
        assert!(l2.lookup("Hello", "m").await.unwrap().is_none());
    }
}
