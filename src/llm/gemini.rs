//! Google Generative Language API client

use super::{LanguageModel, ModelParams};
use crate::cache::CachedGeneration;
use crate::error::{CacheError, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Generative Language REST endpoint
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Delay between retry attempts
const RETRY_DELAY: Duration = Duration::from_millis(500);

/// `models/`-qualified resource name
pub(crate) fn model_path(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{model}")
    }
}

/// Error for a non-success API response
pub(crate) async fn api_error(response: Response) -> CacheError {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|envelope| envelope.error.message)
        .unwrap_or(body);

    CacheError::Provider {
        status: Some(status.as_u16()),
        message,
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Gemini chat model with retries on transient failures
pub struct GeminiModel {
    client: Client,
    api_key: String,
    params: ModelParams,
    base_url: String,
    retry_delay: Duration,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
    model_version: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u64>,
    candidates_token_count: Option<u64>,
    total_token_count: Option<u64>,
}

impl GeminiModel {
    /// # Errors
    ///
    /// Returns a configuration error for an empty API key or invalid
    /// parameters, and an HTTP error if the client cannot be built.
    pub fn new(api_key: impl Into<String>, params: ModelParams) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(CacheError::Config("Gemini API key is empty".to_string()));
        }
        params.validate().map_err(CacheError::Config)?;

        let mut builder = Client::builder();
        if let Some(timeout) = params.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        info!(
            "Initializing Gemini model: {} (temperature: {}, max_retries: {})",
            params.model, params.temperature, params.max_retries
        );

        Ok(Self {
            client,
            api_key,
            params,
            base_url: GEMINI_API_BASE.to_string(),
            retry_delay: RETRY_DELAY,
        })
    }

    /// Point the client at a different API host
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn params(&self) -> &ModelParams {
        &self.params
    }

    fn request_body<'a>(&self, prompt: &'a str) -> GenerateRequest<'a> {
        GenerateRequest {
            contents: [Content {
                role: "user",
                parts: [Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.params.temperature,
                max_output_tokens: self.params.max_tokens,
            },
        }
    }

    async fn generate_once(&self, prompt: &str) -> Result<CachedGeneration> {
        let url = format!(
            "{}/{}:generateContent",
            self.base_url,
            model_path(&self.params.model)
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let body: GenerateResponse = response.json().await?;
        self.parse_generation(body)
    }

    fn transport_error(&self, error: reqwest::Error) -> CacheError {
        match self.params.timeout {
            Some(timeout) if error.is_timeout() => CacheError::Timeout {
                timeout_seconds: timeout.as_secs(),
                context: format!("generateContent ({})", self.params.model),
            },
            _ => CacheError::Http(error),
        }
    }

    fn parse_generation(&self, body: GenerateResponse) -> Result<CachedGeneration> {
        let candidate = body
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| CacheError::Provider {
                status: None,
                message: "response contained no candidates".to_string(),
            })?;

        let text: String = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();

        let model = body.model_version.unwrap_or_else(|| self.params.model.clone());
        let mut generation = CachedGeneration::new(text).with_metadata("model", model);

        if let Some(reason) = candidate.finish_reason {
            generation = generation.with_metadata("finish_reason", reason);
        }
        if let Some(usage) = body.usage_metadata {
            generation = generation.with_metadata(
                "usage",
                json!({
                    "input_tokens": usage.prompt_token_count,
                    "output_tokens": usage.candidates_token_count,
                    "total_tokens": usage.total_token_count,
                }),
            );
        }

        Ok(generation)
    }
}

#[async_trait]
impl LanguageModel for GeminiModel {
    fn fingerprint(&self) -> String {
        self.params.fingerprint()
    }

    async fn generate(&self, prompt: &str) -> Result<CachedGeneration> {
        let mut retry_count = 0;

        loop {
            let start = Instant::now();

            match self.generate_once(prompt).await {
                Ok(generation) => {
                    debug!(
                        "Generated {} chars in {:?} (retries: {})",
                        generation.text.len(),
                        start.elapsed(),
                        retry_count
                    );
                    return Ok(generation);
                }
                Err(e) if e.is_transient() && retry_count < self.params.max_retries => {
                    retry_count += 1;
                    warn!(
                        "generateContent failed (attempt {}/{}): {}",
                        retry_count,
                        self.params.max_retries + 1,
                        e
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> GeminiModel {
        GeminiModel::new("key", ModelParams::default()).unwrap()
    }

    #[test]
    fn test_model_path() {
        assert_eq!(model_path("gemini-3-flash-preview"), "models/gemini-3-flash-preview");
        assert_eq!(model_path("models/x"), "models/x");
    }

    #[test]
    fn test_rejects_empty_key_and_bad_params() {
        assert!(matches!(
            GeminiModel::new("", ModelParams::default()),
            Err(CacheError::Config(_))
        ));
        assert!(matches!(
            GeminiModel::new("key", ModelParams::new("")),
            Err(CacheError::Config(_))
        ));
    }

    #[test]
    fn test_request_body_shape() {
        let limited = GeminiModel::new(
            "key",
            ModelParams {
                max_tokens: Some(64),
                ..Default::default()
            },
        )
        .unwrap();

        let json = serde_json::to_value(limited.request_body("What is the capital of France?")).unwrap();
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "What is the capital of France?");
        assert_eq!(json["generationConfig"]["temperature"], 0.5);
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 64);

        let json = serde_json::to_value(model().request_body("x")).unwrap();
        assert!(json["generationConfig"].get("maxOutputTokens").is_none());
    }

    #[test]
    fn test_response_parsing() {
        let body: GenerateResponse = serde_json::from_str(
            r#"{
                "candidates": [{
                    "content": {"parts": [{"text": "The capital "}, {"text": "is Paris."}], "role": "model"},
                    "finishReason": "STOP"
                }],
                "usageMetadata": {"promptTokenCount": 8, "candidatesTokenCount": 5, "totalTokenCount": 13},
                "modelVersion": "gemini-3-flash-preview"
            }"#,
        )
        .unwrap();

        let generation = model().parse_generation(body).unwrap();
        assert_eq!(generation.text, "The capital is Paris.");
        assert_eq!(generation.metadata["finish_reason"], "STOP");
        assert_eq!(generation.metadata["model"], "gemini-3-flash-preview");
        assert_eq!(generation.metadata["usage"]["total_tokens"], 13);
    }

    #[test]
    fn test_empty_candidates_is_provider_error() {
        let body: GenerateResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        let err = model().parse_generation(body).unwrap_err();
        assert!(matches!(err, CacheError::Provider { status: None, .. }));
    }

    #[test]
    fn test_fingerprint_tracks_params() {
        assert_eq!(model().fingerprint(), ModelParams::default().fingerprint());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_retried_then_surfaced() {
        let model = GeminiModel::new(
            "key",
            ModelParams {
                max_retries: 1,
                timeout: Some(Duration::from_secs(2)),
                ..Default::default()
            },
        )
        .unwrap()
        .with_base_url("http://127.0.0.1:9")
        .with_retry_delay(Duration::from_millis(10));

        let err = model.generate("Hello").await.unwrap_err();
        assert!(err.is_transient());
    }
}
