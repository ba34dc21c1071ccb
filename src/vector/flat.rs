//! Exhaustive-scan vector index stored in a [`KeyValueStore`]
//!
//! Each record lives under `{prefix}:{digest(prompt)}:{digest(fingerprint)}`
//! as JSON, so it shares the store's expiry semantics with L1 entries. Lookups
//! scan the namespace and compute every distance, which keeps the index exact
//! and deterministic at the cost of O(n) per query.

use super::{DistanceMetric, VectorFilter, VectorIndex, VectorMatch, VectorRecord};
use crate::cache::key::entry_key;
use crate::error::{CacheError, Result};
use crate::store::KeyValueStore;
use async_trait::async_trait;
use std::cmp::Ordering;
use std::time::Duration;
use tracing::debug;

pub struct FlatVectorIndex<S> {
    store: S,
    prefix: String,
    metric: DistanceMetric,
}

impl<S: KeyValueStore> FlatVectorIndex<S> {
    pub fn new(store: S, prefix: impl Into<String>, metric: DistanceMetric) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            metric,
        }
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn namespace(&self) -> String {
        format!("{}:", self.prefix)
    }

    /// Number of live records
    pub async fn len(&self) -> Result<usize> {
        Ok(self.store.scan_prefix(&self.namespace()).await?.len())
    }
}

#[async_trait]
impl<S: KeyValueStore> VectorIndex for FlatVectorIndex<S> {
    async fn insert(&self, record: VectorRecord, ttl: Duration) -> Result<()> {
        if record.embedding.is_empty() {
            return Err(CacheError::Embedding("refusing to index an empty embedding".into()));
        }

        let key = entry_key(&self.prefix, &record.prompt, &record.fingerprint);
        let json = serde_json::to_string(&record)?;
        self.store.set_with_ttl(&key, &json, ttl).await?;

        debug!("Indexed vector record: {}", key);
        Ok(())
    }

    async fn nearest(
        &self,
        embedding: &[f32],
        filter: &VectorFilter<'_>,
    ) -> Result<Option<VectorMatch>> {
        let mut best: Option<(String, VectorMatch)> = None;

        for (key, json) in self.store.scan_prefix(&self.namespace()).await? {
            let record: VectorRecord = serde_json::from_str(&json).map_err(|e| {
                CacheError::Serialization(format!("corrupt vector record {key}: {e}"))
            })?;

            if !filter.matches(&record) {
                continue;
            }

            let distance = self.metric.distance(embedding, &record.embedding)?;

            // ties resolve to the smallest key so repeated queries agree
            let closer = match &best {
                None => true,
                Some((best_key, best_match)) => {
                    match distance.total_cmp(&best_match.distance) {
                        Ordering::Less => true,
                        Ordering::Equal => key < *best_key,
                        Ordering::Greater => false,
                    }
                }
            };

            if closer {
                best = Some((key, VectorMatch { record, distance }));
            }
        }

        if let Some((key, found)) = &best {
            debug!("Nearest vector record: {} ({} {:.4})", key, self.metric, found.distance);
        }
        Ok(best.map(|(_, found)| found))
    }

    async fn clear(&self) -> Result<usize> {
        self.store.delete_prefix(&self.namespace()).await
    }
}
