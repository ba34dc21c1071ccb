//! Mock model for exercising the cache without a provider
//!
//! Returns canned responses per prompt and records every call, so tests can
//! assert exactly when the cache let a request through to the model.

use super::{LanguageModel, ModelParams};
use crate::cache::CachedGeneration;
use crate::error::{CacheError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Mock model with canned responses and a call log
#[derive(Clone)]
pub struct MockModel {
    params: ModelParams,
    responses: Arc<Mutex<HashMap<String, String>>>,
    call_history: Arc<Mutex<Vec<String>>>,
    latency: Duration,
    fail_with: Option<String>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockModel {
    pub fn new(params: ModelParams) -> Self {
        Self {
            params,
            responses: Arc::new(Mutex::new(HashMap::new())),
            call_history: Arc::new(Mutex::new(Vec::new())),
            latency: Duration::ZERO,
            fail_with: None,
        }
    }

    /// Canned response for an exact prompt
    pub fn with_response(self, prompt: impl Into<String>, response: impl Into<String>) -> Self {
        lock(&self.responses).insert(prompt.into(), response.into());
        self
    }

    /// Simulated generation time
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Fail every call with a provider error
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.fail_with = Some(message.into());
        self
    }

    /// Prompts seen so far, in call order
    pub fn call_history(&self) -> Vec<String> {
        lock(&self.call_history).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.call_history).len()
    }
}

impl Default for MockModel {
    fn default() -> Self {
        Self::new(ModelParams::new("mock-model"))
    }
}

#[async_trait]
impl LanguageModel for MockModel {
    fn fingerprint(&self) -> String {
        self.params.fingerprint()
    }

    async fn generate(&self, prompt: &str) -> Result<CachedGeneration> {
        lock(&self.call_history).push(prompt.to_string());

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if let Some(message) = &self.fail_with {
            return Err(CacheError::Provider {
                status: Some(500),
                message: message.clone(),
            });
        }

        let text = lock(&self.responses)
            .get(prompt)
            .cloned()
            .unwrap_or_else(|| format!("Mock response for: {prompt}"));

        Ok(CachedGeneration::new(text).with_metadata("model", self.params.model.clone()))
    }
}
