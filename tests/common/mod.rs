//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use llm_layered_cache::cache::{ExactMatchCache, LayeredCache, SemanticCache};
use llm_layered_cache::config::LayerConfig;
use llm_layered_cache::embedding::Embedder;
use llm_layered_cache::error::{CacheError, Result};
use llm_layered_cache::store::MemoryStore;
use llm_layered_cache::vector::{DistanceMetric, FlatVectorIndex};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub type TestL1 = ExactMatchCache<Arc<MemoryStore>>;
pub type TestL2 = SemanticCache<FlatVectorIndex<Arc<MemoryStore>>, Arc<StubEmbedder>>;
pub type TestCache = LayeredCache<TestL1, TestL2>;

/// Unit vector at cosine distance `d` from `[1, 0]`
pub fn at_distance(d: f32) -> Vec<f32> {
    let cos = 1.0 - d;
    vec![cos, (1.0 - cos * cos).sqrt()]
}

/// Embedder backed by a fixed phrase-to-vector table
#[derive(Default)]
pub struct StubEmbedder {
    table: Mutex<HashMap<String, Vec<f32>>>,
    calls: AtomicUsize,
}

impl StubEmbedder {
    pub fn new(entries: &[(&str, Vec<f32>)]) -> Self {
        let embedder = Self::default();
        for (phrase, vector) in entries {
            embedder.set(phrase, vector.clone());
        }
        embedder
    }

    pub fn set(&self, phrase: &str, vector: Vec<f32>) {
        self.table.lock().unwrap().insert(phrase.to_string(), vector);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for StubEmbedder {
    fn model_id(&self) -> &str {
        "stub"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.table
            .lock()
            .unwrap()
            .get(text)
            .cloned()
            .ok_or_else(|| CacheError::Embedding(format!("no vector for '{text}'")))
    }
}

/// Everything a layered-cache test needs to poke at
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub embedder: Arc<StubEmbedder>,
    pub cache: TestCache,
}

pub fn harness(embedder: StubEmbedder) -> Harness {
    harness_with_ttls(embedder, Duration::from_secs(3600), Duration::from_secs(7200))
}

pub fn harness_with_ttls(embedder: StubEmbedder, l1_ttl: Duration, l2_ttl: Duration) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let embedder = Arc::new(embedder);

    let l1 = ExactMatchCache::new(store.clone(), LayerConfig::new("l1_cache", l1_ttl));
    let l2 = SemanticCache::with_store(
        store.clone(),
        embedder.clone(),
        LayerConfig::new("l2_cache", l2_ttl),
        DistanceMetric::Cosine,
        0.2,
    );

    Harness {
        store,
        embedder,
        cache: LayeredCache::new(l1, l2),
    }
}
