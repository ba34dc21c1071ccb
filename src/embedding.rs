//! Embedding generation for the semantic layer

use crate::error::{CacheError, Result};
use crate::llm::gemini::{api_error, model_path, GEMINI_API_BASE};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Deterministic text-to-vector function
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Identifier of the embedding model
    fn model_id(&self) -> &str;

    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

#[async_trait]
impl<E: Embedder + ?Sized> Embedder for Arc<E> {
    fn model_id(&self) -> &str {
        (**self).model_id()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        (**self).embed(text).await
    }
}

/// Gemini `embedContent` client
pub struct GeminiEmbedder {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedRequest<'a> {
    model: &'a str,
    content: EmbedContent<'a>,
    task_type: &'static str,
}

#[derive(Serialize)]
struct EmbedContent<'a> {
    parts: [EmbedPart<'a>; 1],
}

#[derive(Serialize)]
struct EmbedPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

impl GeminiEmbedder {
    /// # Errors
    ///
    /// Returns a configuration error if the API key is empty.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(CacheError::Config("Gemini API key is empty".to_string()));
        }

        let model = model_path(&model.into());
        info!("Initializing Gemini embedder: {}", model);

        Ok(Self {
            client: Client::new(),
            api_key,
            model,
            base_url: GEMINI_API_BASE.to_string(),
        })
    }

    /// Point the client at a different API host
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/{}:embedContent", self.base_url, self.model);
        let request = EmbedRequest {
            model: &self.model,
            content: EmbedContent {
                parts: [EmbedPart { text }],
            },
            task_type: "SEMANTIC_SIMILARITY",
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| CacheError::Embedding(format!("embedContent request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let body: EmbedResponse = response
            .json()
            .await
            .map_err(|e| CacheError::Embedding(format!("invalid embedContent response: {e}")))?;

        if body.embedding.values.is_empty() {
            return Err(CacheError::Embedding("No embedding generated".to_string()));
        }

        debug!("Embedded {} chars -> {} dims", text.len(), body.embedding.values.len());
        Ok(body.embedding.values)
    }
}

#[cfg(feature = "local-embeddings")]
pub use local::FastEmbedder;

#[cfg(feature = "local-embeddings")]
mod local {
    use super::Embedder;
    use crate::error::{CacheError, Result};
    use async_trait::async_trait;
    use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
    use std::sync::Arc;
    use tracing::info;

    /// Local ONNX embedding model
    pub struct FastEmbedder {
        model: Arc<TextEmbedding>,
        model_id: String,
        dimension: usize,
    }

    impl FastEmbedder {
        /// Create an embedder with the multilingual E5 small model
        pub fn new() -> Result<Self> {
            Self::with_model(EmbeddingModel::MultilingualE5Small)
        }

        /// Create with a specific model
        pub fn with_model(model_name: EmbeddingModel) -> Result<Self> {
            info!("Initializing embedding model: {:?}", model_name);

            let dimension = match model_name {
                EmbeddingModel::MultilingualE5Small => 384,
                EmbeddingModel::MultilingualE5Base => 768,
                EmbeddingModel::MultilingualE5Large => 1024,
                EmbeddingModel::AllMiniLML6V2 => 384,
                EmbeddingModel::BGESmallENV15 => 384,
                EmbeddingModel::BGEBaseENV15 => 768,
                _ => 384,
            };
            let model_id = format!("{:?}", model_name);

            let mut options = InitOptions::default();
            options.model_name = model_name;
            options.show_download_progress = false;

            let model = TextEmbedding::try_new(options).map_err(|e| {
                CacheError::Embedding(format!("Failed to initialize embedding model: {e}"))
            })?;

            Ok(Self {
                model: Arc::new(model),
                model_id,
                dimension,
            })
        }

        pub fn dimension(&self) -> usize {
            self.dimension
        }
    }

    #[async_trait]
    impl Embedder for FastEmbedder {
        fn model_id(&self) -> &str {
            &self.model_id
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            // E5 models expect the same "query: " prefix on both sides of a
            // symmetric similarity comparison
            let prefixed = format!("query: {}", text);
            let model = Arc::clone(&self.model);

            let embeddings = tokio::task::spawn_blocking(move || model.embed(vec![prefixed], None))
                .await
                .map_err(|e| CacheError::Embedding(format!("embedding task failed: {e}")))?
                .map_err(|e| CacheError::Embedding(format!("Failed to generate embedding: {e}")))?;

            embeddings
                .into_iter()
                .next()
                .ok_or_else(|| CacheError::Embedding("No embedding generated".to_string()))
        }
    }
}
