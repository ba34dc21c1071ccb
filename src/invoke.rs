//! Cached model invocation with latency measurement

use crate::cache::{CachedGeneration, LlmCache};
use crate::error::Result;
use crate::llm::LanguageModel;
use std::time::{Duration, Instant};
use tracing::debug;

/// A generation and how long it took to obtain
#[derive(Debug, Clone, PartialEq)]
pub struct TimedResponse {
    pub generation: CachedGeneration,

    /// Wall time of the whole invoke call, cache round trips included
    pub elapsed: Duration,

    /// Served from the cache without calling the model
    pub from_cache: bool,
}

impl TimedResponse {
    pub fn text(&self) -> &str {
        &self.generation.text
    }
}

/// How many times faster `other` was than `baseline`
pub fn speedup(baseline: Duration, other: Duration) -> f64 {
    if other.is_zero() {
        return f64::INFINITY;
    }
    baseline.as_secs_f64() / other.as_secs_f64()
}

/// A model fronted by a cache
///
/// Every call consults the cache under the model's fingerprint first; only a
/// miss reaches the model, and its result is written back before returning.
pub struct CachedModel<M, C> {
    model: M,
    cache: C,
}

impl<M: LanguageModel, C: LlmCache> CachedModel<M, C> {
    pub fn new(model: M, cache: C) -> Self {
        Self { model, cache }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Answer `prompt` from the cache, or from the model on a miss
    pub async fn invoke(&self, prompt: &str) -> Result<TimedResponse> {
        let start = Instant::now();
        let fingerprint = self.model.fingerprint();

        if let Some(generation) = self.cache.lookup(prompt, &fingerprint).await? {
            let elapsed = start.elapsed();
            debug!("Served from cache in {:?}", elapsed);
            return Ok(TimedResponse {
                generation,
                elapsed,
                from_cache: true,
            });
        }

        let generation = self.model.generate(prompt).await?;
        self.cache.update(prompt, &fingerprint, &generation).await?;

        let elapsed = start.elapsed();
        debug!("Generated and cached in {:?}", elapsed);
        Ok(TimedResponse {
            generation,
            elapsed,
            from_cache: false,
        })
    }
}
