//! Core type definitions for the cache system

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A model result as stored in the cache: generated text plus metadata
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CachedGeneration {
    /// Generated text
    pub text: String,

    /// Structured metadata reported by the provider (finish reason, usage, ...)
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl CachedGeneration {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: Map::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Cache layer in the two-level architecture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CacheLayer {
    /// Layer 1: exact prompt/fingerprint match
    ExactMatch,

    /// Layer 2: semantic similarity (embedding-based)
    Semantic,
}

impl fmt::Display for CacheLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheLayer::ExactMatch => write!(f, "exact_match"),
            CacheLayer::Semantic => write!(f, "semantic"),
        }
    }
}

/// Terminal state of a layered lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupOutcome {
    /// Found in L1
    L1Hit,

    /// Found in L2 and promoted into L1
    L2Hit,

    /// Absent from both layers
    Miss,
}

impl LookupOutcome {
    pub fn is_hit(&self) -> bool {
        !matches!(self, LookupOutcome::Miss)
    }

    /// Layer that served the entry
    pub fn layer(&self) -> Option<CacheLayer> {
        match self {
            LookupOutcome::L1Hit => Some(CacheLayer::ExactMatch),
            LookupOutcome::L2Hit => Some(CacheLayer::Semantic),
            LookupOutcome::Miss => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LookupOutcome::L1Hit => "l1_hit",
            LookupOutcome::L2Hit => "l2_hit",
            LookupOutcome::Miss => "miss",
        }
    }
}

impl fmt::Display for LookupOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Statistics for layered cache performance monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CacheStats {
    /// Lookups served by L1
    pub l1_hits: u64,

    /// Lookups served by L2
    pub l2_hits: u64,

    /// Lookups that missed both layers
    pub misses: u64,

    /// L2 hits successfully written back into L1
    pub promotions: u64,

    /// Completed update calls (both layers written)
    pub updates: u64,
}

impl CacheStats {
    pub fn hits(&self) -> u64 {
        self.l1_hits + self.l2_hits
    }

    pub fn lookups(&self) -> u64 {
        self.hits() + self.misses
    }

    /// Calculate cache hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.lookups();
        if total == 0 {
            0.0
        } else {
            (self.hits() as f64 / total as f64) * 100.0
        }
    }

    /// Share of hits served by the semantic layer, as a percentage
    pub fn semantic_share(&self) -> f64 {
        let hits = self.hits();
        if hits == 0 {
            0.0
        } else {
            (self.l2_hits as f64 / hits as f64) * 100.0
        }
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CacheStats {{ l1_hits: {}, l2_hits: {}, misses: {}, hit_rate: {:.2}%, promotions: {}, updates: {} }}",
            self.l1_hits,
            self.l2_hits,
            self.misses,
            self.hit_rate(),
            self.promotions,
            self.updates
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_json_shape() {
        let generation = CachedGeneration::new("Hi!");
        assert_eq!(serde_json::to_string(&generation).unwrap(), r#"{"text":"Hi!"}"#);

        let with_meta = CachedGeneration::new("Paris").with_metadata("finish_reason", "STOP");
        let json = serde_json::to_value(&with_meta).unwrap();
        assert_eq!(json["metadata"]["finish_reason"], "STOP");

        let parsed: CachedGeneration = serde_json::from_str(r#"{"text":"Hi!"}"#).unwrap();
        assert_eq!(parsed, generation);
    }

    #[test]
    fn test_outcome_layers() {
        assert_eq!(LookupOutcome::L1Hit.layer(), Some(CacheLayer::ExactMatch));
        assert_eq!(LookupOutcome::L2Hit.layer(), Some(CacheLayer::Semantic));
        assert_eq!(LookupOutcome::Miss.layer(), None);
        assert!(!LookupOutcome::Miss.is_hit());
        assert_eq!(LookupOutcome::L2Hit.to_string(), "l2_hit");
    }

    #[test]
    fn test_cache_stats_hit_rate() {
        let stats = CacheStats {
            l1_hits: 60,
            l2_hits: 20,
            misses: 20,
            ..Default::default()
        };

        assert_eq!(stats.hit_rate(), 80.0);
        assert_eq!(stats.semantic_share(), 25.0);
    }

    #[test]
    fn test_cache_stats_zero_requests() {
        let stats = CacheStats::default();
        assert_eq!(stats.hit_rate(), 0.0);
        assert_eq!(stats.semantic_share(), 0.0);
    }

    #[test]
    fn test_cache_stats_display() {
        let stats = CacheStats {
            l1_hits: 3,
            l2_hits: 1,
            misses: 4,
            promotions: 1,
            updates: 4,
        };

        let display = stats.to_string();
        assert!(display.contains("l1_hits: 3"));
        assert!(display.contains("hit_rate: 50.00%"));
    }

    #[test]
    fn test_cache_layer_display() {
        assert_eq!(CacheLayer::ExactMatch.to_string(), "exact_match");
        assert_eq!(CacheLayer::Semantic.to_string(), "semantic");
    }
}
