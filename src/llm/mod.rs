//! Language model providers
//!
//! A [`LanguageModel`] turns a prompt into a [`CachedGeneration`] and reports a
//! fingerprint of its identity and generation parameters. The fingerprint is
//! part of every cache key, so two models (or one model under two parameter
//! sets) never share entries.

pub mod gemini;
pub mod mock;

pub use gemini::GeminiModel;
pub use mock::MockModel;

use crate::cache::CachedGeneration;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Default chat model
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

/// Model identity and generation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    /// Model name, e.g. `gemini-3-flash-preview`
    pub model: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum output tokens (provider default when unset)
    pub max_tokens: Option<u32>,

    /// Per-request timeout (none when unset)
    pub timeout: Option<Duration>,

    /// Retries after a transient failure
    pub max_retries: u32,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.5,
            max_tokens: None,
            timeout: None,
            max_retries: 2,
        }
    }
}

impl ModelParams {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Canonical string of every field, with keys in sorted order
    pub fn fingerprint(&self) -> String {
        let mut fields: BTreeMap<&str, Value> = BTreeMap::new();
        fields.insert("max_retries", json!(self.max_retries));
        fields.insert("max_tokens", json!(self.max_tokens));
        fields.insert("model", json!(self.model));
        fields.insert("temperature", json!(self.temperature));
        fields.insert("timeout", json!(self.timeout.map(|t| t.as_secs_f64())));

        // a BTreeMap of JSON values always serializes
        serde_json::to_string(&fields).unwrap_or_default()
    }

    /// Validate the parameters
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.model.trim().is_empty() {
            return Err("model name must not be empty".to_string());
        }

        if !self.temperature.is_finite() || !(0.0..=2.0).contains(&self.temperature) {
            return Err("temperature must be between 0.0 and 2.0".to_string());
        }

        if self.max_tokens == Some(0) {
            return Err("max_tokens must be greater than 0".to_string());
        }

        if self.timeout.is_some_and(|t| t.is_zero()) {
            return Err("timeout must be greater than 0".to_string());
        }

        Ok(())
    }
}

/// Prompt in, generation out
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Identity plus generation parameters, stable across calls
    fn fingerprint(&self) -> String;

    async fn generate(&self, prompt: &str) -> Result<CachedGeneration>;
}

#[async_trait]
impl<M: LanguageModel + ?Sized> LanguageModel for Arc<M> {
    fn fingerprint(&self) -> String {
        (**self).fingerprint()
    }

    async fn generate(&self, prompt: &str) -> Result<CachedGeneration> {
        (**self).generate(prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params() {
        let params = ModelParams::default();
        assert_eq!(params.model, "gemini-3-flash-preview");
        assert_eq!(params.temperature, 0.5);
        assert_eq!(params.max_tokens, None);
        assert_eq!(params.timeout, None);
        assert_eq!(params.max_retries, 2);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_fingerprint_is_canonical() {
        let params = ModelParams::default();
        assert_eq!(params.fingerprint(), params.clone().fingerprint());
        assert_eq!(
            params.fingerprint(),
            r#"{"max_retries":2,"max_tokens":null,"model":"gemini-3-flash-preview","temperature":0.5,"timeout":null}"#
        );
    }

    #[test]
    fn test_fingerprint_changes_with_any_param() {
        let base = ModelParams::default();
        let variants = [
            ModelParams::new("other-model"),
            ModelParams {
                temperature: 0.0,
                ..base.clone()
            },
            ModelParams {
                max_tokens: Some(128),
                ..base.clone()
            },
            ModelParams {
                timeout: Some(Duration::from_secs(10)),
                ..base.clone()
            },
            ModelParams {
                max_retries: 0,
                ..base.clone()
            },
        ];

        for variant in &variants {
            assert_ne!(variant.fingerprint(), base.fingerprint());
        }
    }

    #[test]
    fn test_validate_rejects_bad_params() {
        assert!(ModelParams::new("").validate().is_err());
        assert!(ModelParams {
            temperature: 3.0,
            ..Default::default()
        }
        .validate()
        .is_err());
        assert!(ModelParams {
            max_tokens: Some(0),
            ..Default::default()
        }
        .validate()
        .is_err());
        assert!(ModelParams {
            timeout: Some(Duration::ZERO),
            ..Default::default()
        }
        .validate()
        .is_err());
    }
}
