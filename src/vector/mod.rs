//! Vector index adapters for the semantic layer

pub mod flat;

pub use flat::FlatVectorIndex;

use crate::error::{CacheError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Distance between two embeddings; lower always means more similar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// `1 - cos(a, b)`, in `[0, 2]`
    #[default]
    Cosine,

    /// L2 norm of `a - b`
    Euclidean,
}

impl DistanceMetric {
    /// Distance between two vectors of equal dimension
    pub fn distance(&self, a: &[f32], b: &[f32]) -> Result<f32> {
        if a.len() != b.len() {
            return Err(CacheError::Embedding(format!(
                "Embedding dimension mismatch: expected {}, got {}",
                b.len(),
                a.len()
            )));
        }

        let distance = match self {
            DistanceMetric::Cosine => {
                let mut dot = 0.0f32;
                let mut norm_a = 0.0f32;
                let mut norm_b = 0.0f32;
                for (x, y) in a.iter().zip(b) {
                    dot += x * y;
                    norm_a += x * x;
                    norm_b += y * y;
                }
                if norm_a == 0.0 || norm_b == 0.0 {
                    // zero vectors carry no direction; treat as orthogonal
                    1.0
                } else {
                    let cos = dot / (norm_a.sqrt() * norm_b.sqrt());
                    (1.0 - cos.clamp(-1.0, 1.0)).max(0.0)
                }
            }
            DistanceMetric::Euclidean => a
                .iter()
                .zip(b)
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f32>()
                .sqrt(),
        };

        Ok(distance)
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistanceMetric::Cosine => write!(f, "cosine"),
            DistanceMetric::Euclidean => write!(f, "euclidean"),
        }
    }
}

/// One embedded prompt and the serialized entry it maps to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Prompt the embedding was computed from
    pub prompt: String,

    /// Model fingerprint the entry was generated under
    pub fingerprint: String,

    /// Embedding model that produced `embedding`
    #[serde(default)]
    pub embedding_model: String,

    /// Embedding of `prompt`
    pub embedding: Vec<f32>,

    /// Serialized cache entry
    pub payload: String,

    pub created_at: DateTime<Utc>,
}

impl VectorRecord {
    pub fn new(
        prompt: impl Into<String>,
        fingerprint: impl Into<String>,
        embedding: Vec<f32>,
        payload: String,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            fingerprint: fingerprint.into(),
            embedding_model: String::new(),
            embedding,
            payload,
            created_at: Utc::now(),
        }
    }

    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }
}

/// Restricts which records a nearest-neighbour search may return
///
/// Records from another embedding model live in a different vector space, so
/// they are skipped rather than compared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VectorFilter<'a> {
    pub fingerprint: Option<&'a str>,
    pub embedding_model: Option<&'a str>,
}

impl<'a> VectorFilter<'a> {
    pub fn fingerprint(mut self, fingerprint: &'a str) -> Self {
        self.fingerprint = Some(fingerprint);
        self
    }

    pub fn embedding_model(mut self, model: &'a str) -> Self {
        self.embedding_model = Some(model);
        self
    }

    pub fn matches(&self, record: &VectorRecord) -> bool {
        self.fingerprint.map_or(true, |fp| fp == record.fingerprint)
            && self
                .embedding_model
                .map_or(true, |model| model == record.embedding_model)
    }
}

/// Nearest record found for a query embedding
#[derive(Debug, Clone)]
pub struct VectorMatch {
    pub record: VectorRecord,
    pub distance: f32,
}

/// Nearest-neighbour index with per-record expiry
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Store a record that expires after `ttl`
    ///
    /// A record for the same prompt and fingerprint replaces the previous one.
    async fn insert(&self, record: VectorRecord, ttl: Duration) -> Result<()>;

    /// The closest live record accepted by `filter`
    async fn nearest(
        &self,
        embedding: &[f32],
        filter: &VectorFilter<'_>,
    ) -> Result<Option<VectorMatch>>;

    /// Remove every record in this index's namespace
    async fn clear(&self) -> Result<usize>;
}
