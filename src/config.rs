//! Configuration for the layered cache
//!
//! Settings come from the environment (a `.env` file is honoured through
//! `dotenv`) or are assembled with [`CacheSettings::builder`]. A missing store
//! connection string is a startup-time [`CacheError::Config`].

use crate::error::{CacheError, Result};
use crate::llm::ModelParams;
use crate::vector::DistanceMetric;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

pub const ENV_REDIS_URL: &str = "REDIS_URL";
pub const ENV_GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";
pub const ENV_L1_PREFIX: &str = "LLM_CACHE_L1_PREFIX";
pub const ENV_L2_PREFIX: &str = "LLM_CACHE_L2_PREFIX";
pub const ENV_L1_TTL_SECS: &str = "LLM_CACHE_L1_TTL_SECS";
pub const ENV_L2_TTL_SECS: &str = "LLM_CACHE_L2_TTL_SECS";
pub const ENV_DISTANCE_THRESHOLD: &str = "LLM_CACHE_DISTANCE_THRESHOLD";
pub const ENV_EMBEDDING_MODEL: &str = "LLM_CACHE_EMBEDDING_MODEL";
pub const ENV_LLM_MODEL: &str = "LLM_MODEL";
pub const ENV_LLM_TEMPERATURE: &str = "LLM_TEMPERATURE";
pub const ENV_LLM_MAX_TOKENS: &str = "LLM_MAX_TOKENS";
pub const ENV_LLM_TIMEOUT_SECS: &str = "LLM_TIMEOUT_SECS";
pub const ENV_LLM_MAX_RETRIES: &str = "LLM_MAX_RETRIES";

/// Default embedding model used by the semantic layer
pub const DEFAULT_EMBEDDING_MODEL: &str = "models/gemini-embedding-001";

/// Namespace and expiry settings for one cache layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerConfig {
    /// Key prefix isolating this layer's entries inside a shared store
    pub prefix: String,

    /// Time-to-live applied to every write
    pub ttl: Duration,

    /// TTL jitter factor (0.0 - 1.0)
    /// Zero keeps expiry exact
    pub ttl_jitter: f64,
}

impl LayerConfig {
    pub fn new(prefix: impl Into<String>, ttl: Duration) -> Self {
        Self {
            prefix: prefix.into(),
            ttl,
            ttl_jitter: 0.0,
        }
    }

    /// Default L1 (exact match) layer: `l1_cache`, 1 hour
    pub fn exact_match() -> Self {
        Self::new("l1_cache", Duration::from_secs(3600))
    }

    /// Default L2 (semantic) layer: `l2_cache`, 2 hours
    pub fn semantic() -> Self {
        Self::new("l2_cache", Duration::from_secs(7200))
    }

    pub fn with_ttl_jitter(mut self, jitter: f64) -> Self {
        self.ttl_jitter = jitter;
        self
    }

    /// Calculate actual TTL with jitter applied
    pub fn ttl_with_jitter(&self) -> Duration {
        if self.ttl_jitter == 0.0 || self.ttl.is_zero() {
            return self.ttl;
        }

        let base_secs = self.ttl.as_secs_f64();
        let jitter_range = base_secs * self.ttl_jitter;
        let jitter = (rand::random::<f64>() * 2.0 - 1.0) * jitter_range;
        let final_secs = (base_secs + jitter).max(1.0);

        Duration::from_secs_f64(final_secs)
    }

    /// Prefix every key of this layer starts with, separator included
    pub fn namespace(&self) -> String {
        format!("{}:", self.prefix)
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.prefix.is_empty() {
            return Err("layer prefix must not be empty".to_string());
        }
        if self.prefix.contains(['*', '?', '[', ']']) {
            return Err(format!(
                "layer prefix '{}' must not contain glob characters",
                self.prefix
            ));
        }
        if !(0.0..=1.0).contains(&self.ttl_jitter) {
            return Err("ttl_jitter must be between 0.0 and 1.0".to_string());
        }
        Ok(())
    }
}

/// Complete settings for a Redis-backed layered cache and its model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Store connection string, e.g. `redis://:password@host:6379/0`
    pub redis_url: String,

    /// Exact-match layer
    pub l1: LayerConfig,

    /// Semantic layer
    pub l2: LayerConfig,

    /// Maximum (exclusive) distance for a semantic hit
    pub distance_threshold: f32,

    /// Metric used to compare embeddings; lower is more similar
    pub distance_metric: DistanceMetric,

    /// Embedding model identifier
    pub embedding_model: String,

    /// Generation parameters; part of every L1 key through the fingerprint
    pub model: ModelParams,

    /// Provider credentials
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl CacheSettings {
    /// Create a new builder for cache settings
    pub fn builder() -> CacheSettingsBuilder {
        CacheSettingsBuilder::default()
    }

    /// Load settings from the process environment, reading `.env` first
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenv::dotenv() {
            tracing::debug!("No .env file loaded: {}", e);
        }
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Load settings through an arbitrary variable lookup
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let redis_url = lookup(ENV_REDIS_URL)
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| CacheError::Config(format!("{ENV_REDIS_URL} not set")))?;

        let mut builder = Self::builder()
            .redis_url(redis_url)
            .api_key(lookup(ENV_GOOGLE_API_KEY));

        let defaults = ModelParams::default();
        let mut l1 = LayerConfig::exact_match();
        let mut l2 = LayerConfig::semantic();
        if let Some(prefix) = lookup(ENV_L1_PREFIX) {
            l1.prefix = prefix;
        }
        if let Some(prefix) = lookup(ENV_L2_PREFIX) {
            l2.prefix = prefix;
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, ENV_L1_TTL_SECS)? {
            l1.ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, ENV_L2_TTL_SECS)? {
            l2.ttl = Duration::from_secs(secs);
        }
        builder = builder.l1(l1).l2(l2);

        if let Some(threshold) = parse_var::<f32, _>(&lookup, ENV_DISTANCE_THRESHOLD)? {
            builder = builder.distance_threshold(threshold);
        }
        if let Some(model) = lookup(ENV_EMBEDDING_MODEL) {
            builder = builder.embedding_model(model);
        }

        let model = ModelParams {
            model: lookup(ENV_LLM_MODEL).unwrap_or(defaults.model),
            temperature: parse_var(&lookup, ENV_LLM_TEMPERATURE)?.unwrap_or(defaults.temperature),
            max_tokens: parse_var(&lookup, ENV_LLM_MAX_TOKENS)?.or(defaults.max_tokens),
            timeout: parse_var::<u64, _>(&lookup, ENV_LLM_TIMEOUT_SECS)?
                .map(Duration::from_secs)
                .or(defaults.timeout),
            max_retries: parse_var(&lookup, ENV_LLM_MAX_RETRIES)?.unwrap_or(defaults.max_retries),
        };

        let settings = builder.model(model).build()?;
        Ok(settings)
    }

    /// Validate the settings
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.redis_url.is_empty() {
            return Err("redis_url must not be empty".to_string());
        }

        self.l1.validate()?;
        self.l2.validate()?;

        if self.l1.prefix == self.l2.prefix {
            return Err(format!(
                "L1 and L2 must use distinct prefixes (both are '{}')",
                self.l1.prefix
            ));
        }

        // a clear of one layer deletes everything under its namespace
        let (l1_ns, l2_ns) = (self.l1.namespace(), self.l2.namespace());
        if l1_ns.starts_with(&l2_ns) || l2_ns.starts_with(&l1_ns) {
            return Err(format!(
                "L1 prefix '{}' and L2 prefix '{}' overlap; clearing one would clear the other",
                self.l1.prefix, self.l2.prefix
            ));
        }

        if !self.distance_threshold.is_finite() || self.distance_threshold < 0.0 {
            return Err("distance_threshold must be a non-negative number".to_string());
        }

        if self.distance_metric == DistanceMetric::Cosine && self.distance_threshold > 2.0 {
            return Err("cosine distance_threshold must be between 0.0 and 2.0".to_string());
        }

        self.model.validate()
    }

    /// Credentials for Gemini, or a configuration error
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| CacheError::Config(format!("{ENV_GOOGLE_API_KEY} not set")))
    }
}

fn parse_var<T, F>(lookup: &F, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| CacheError::Config(format!("invalid {name}='{raw}': {e}"))),
    }
}

/// Builder for cache settings with validation
#[derive(Debug, Default)]
pub struct CacheSettingsBuilder {
    redis_url: Option<String>,
    l1: Option<LayerConfig>,
    l2: Option<LayerConfig>,
    distance_threshold: Option<f32>,
    distance_metric: Option<DistanceMetric>,
    embedding_model: Option<String>,
    model: Option<ModelParams>,
    api_key: Option<String>,
}

impl CacheSettingsBuilder {
    pub fn redis_url(mut self, url: impl Into<String>) -> Self {
        self.redis_url = Some(url.into());
        self
    }

    pub fn l1(mut self, layer: LayerConfig) -> Self {
        self.l1 = Some(layer);
        self
    }

    pub fn l2(mut self, layer: LayerConfig) -> Self {
        self.l2 = Some(layer);
        self
    }

    pub fn distance_threshold(mut self, threshold: f32) -> Self {
        self.distance_threshold = Some(threshold);
        self
    }

    pub fn distance_metric(mut self, metric: DistanceMetric) -> Self {
        self.distance_metric = Some(metric);
        self
    }

    pub fn embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = Some(model.into());
        self
    }

    pub fn model(mut self, model: ModelParams) -> Self {
        self.model = Some(model);
        self
    }

    pub fn api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key;
        self
    }

    /// Build and validate the settings
    pub fn build(self) -> Result<CacheSettings> {
        let redis_url = self
            .redis_url
            .ok_or_else(|| CacheError::Config(format!("{ENV_REDIS_URL} not set")))?;

        let settings = CacheSettings {
            redis_url,
            l1: self.l1.unwrap_or_else(LayerConfig::exact_match),
            l2: self.l2.unwrap_or_else(LayerConfig::semantic),
            distance_threshold: self.distance_threshold.unwrap_or(0.2),
            distance_metric: self.distance_metric.unwrap_or_default(),
            embedding_model: self
                .embedding_model
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            model: self.model.unwrap_or_default(),
            api_key: self.api_key,
        };

        settings.validate().map_err(CacheError::Config)?;
        Ok(settings)
    }
}
