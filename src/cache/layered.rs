//! Layered cache coordinator
//!
//! Lookup checks L1, falls through to L2 on a miss, and promotes an L2 hit
//! into L1 under the prompt that triggered it. Updates and clears touch L1
//! first and L2 second; nothing is rolled back when the second step fails.

use super::{CacheStats, CachedGeneration, LlmCache, LookupOutcome};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

#[derive(Debug, Default)]
struct AtomicStats {
    l1_hits: AtomicU64,
    l2_hits: AtomicU64,
    misses: AtomicU64,
    promotions: AtomicU64,
    updates: AtomicU64,
}

impl AtomicStats {
    fn record(&self, outcome: LookupOutcome) {
        let counter = match outcome {
            LookupOutcome::L1Hit => &self.l1_hits,
            LookupOutcome::L2Hit => &self.l2_hits,
            LookupOutcome::Miss => &self.misses,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> CacheStats {
        CacheStats {
            l1_hits: self.l1_hits.load(Ordering::Relaxed),
            l2_hits: self.l2_hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            promotions: self.promotions.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        for counter in [
            &self.l1_hits,
            &self.l2_hits,
            &self.misses,
            &self.promotions,
            &self.updates,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// Two-level cache: exact match in front of semantic match
pub struct LayeredCache<L1, L2> {
    l1: L1,
    l2: L2,
    stats: AtomicStats,
}

impl<L1: LlmCache, L2: LlmCache> LayeredCache<L1, L2> {
    pub fn new(l1: L1, l2: L2) -> Self {
        info!("Initializing layered cache (L1 -> L2 with promotion)");
        Self {
            l1,
            l2,
            stats: AtomicStats::default(),
        }
    }

    pub fn l1(&self) -> &L1 {
        &self.l1
    }

    pub fn l2(&self) -> &L2 {
        &self.l2
    }

    /// Lookup that also reports which layer served the entry
    pub async fn lookup_with_outcome(
        &self,
        prompt: &str,
        fingerprint: &str,
    ) -> Result<(Option<CachedGeneration>, LookupOutcome)> {
        if let Some(entry) = self.l1.lookup(prompt, fingerprint).await? {
            return Ok(self.finish(Some(entry), LookupOutcome::L1Hit));
        }

        let Some(entry) = self.l2.lookup(prompt, fingerprint).await? else {
            return Ok(self.finish(None, LookupOutcome::Miss));
        };

        self.l1.update(prompt, fingerprint, &entry).await?;
        self.stats.promotions.fetch_add(1, Ordering::Relaxed);
        debug!("Promoted L2 entry into L1");

        Ok(self.finish(Some(entry), LookupOutcome::L2Hit))
    }

    fn finish(
        &self,
        entry: Option<CachedGeneration>,
        outcome: LookupOutcome,
    ) -> (Option<CachedGeneration>, LookupOutcome) {
        self.stats.record(outcome);
        info!(outcome = outcome.as_str(), "cache lookup");
        (entry, outcome)
    }

    /// Get current statistics
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    /// Reset statistics
    pub fn reset_stats(&self) {
        self.stats.reset();
    }
}

#[async_trait]
impl<L1: LlmCache, L2: LlmCache> LlmCache for LayeredCache<L1, L2> {
    async fn lookup(&self, prompt: &str, fingerprint: &str) -> Result<Option<CachedGeneration>> {
        let (entry, _) = self.lookup_with_outcome(prompt, fingerprint).await?;
        Ok(entry)
    }

    async fn update(&self, prompt: &str, fingerprint: &str, entry: &CachedGeneration) -> Result<()> {
        self.l1.update(prompt, fingerprint, entry).await?;
        self.l2.update(prompt, fingerprint, entry).await?;
        self.stats.updates.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.l1.clear().await?;
        self.l2.clear().await?;
        info!("Cleared both cache layers");
        Ok(())
    }
}
