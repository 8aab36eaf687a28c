use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::{lookup_or, EmbeddingsBackend};
use crate::gemini::GeminiClient;

/// Inputs sent per request to a batching embeddings endpoint
const EMBEDDING_BATCH_SIZE: usize = 32;

/// Representation of a vector embedding
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Embedding { values }
    }

    pub fn dimensions(&self) -> usize {
        self.values.len()
    }
}

/// Maps text to vectors through an external model
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate the embedding for a single text
    async fn embed(&self, text: &str) -> Result<Embedding>;

    /// Generate embeddings for several texts, in input order
    ///
    /// Default implementation calls `embed` sequentially.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Provider name for logging
    fn name(&self) -> &str;
}

/// Build the embedding provider selected by configuration
pub fn build_embedder(backend: &EmbeddingsBackend) -> Arc<dyn EmbeddingProvider> {
    match backend {
        EmbeddingsBackend::OpenAi(config) => Arc::new(OpenAiEmbedder::new(config.clone())),
        EmbeddingsBackend::Gemini(config) => Arc::new(GeminiClient::new(config.clone())),
    }
}

/// Configuration for an OpenAI-compatible embeddings endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct OpenAiEmbeddingsConfig {
    pub url: String,
    pub model: String,
    pub api_key: Option<String>,
}

impl OpenAiEmbeddingsConfig {
    /// Read the configuration through a variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        OpenAiEmbeddingsConfig {
            url: lookup_or(&lookup, "EMBEDDINGS_URL", "http://localhost:8080/v1/embeddings"),
            model: lookup_or(
                &lookup,
                "EMBEDDINGS_MODEL",
                "sentence-transformers/all-MiniLM-L6-v2",
            ),
            api_key: lookup("EMBEDDINGS_API_KEY").filter(|key| !key.is_empty()),
        }
    }
}

/// Client for OpenAI-compatible `/v1/embeddings` servers
/// (text-embeddings-inference, OpenAI, ...)
pub struct OpenAiEmbedder {
    config: OpenAiEmbeddingsConfig,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize, Debug)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize, Debug)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: Option<usize>,
}

impl OpenAiEmbedder {
    /// Create a new embeddings client
    pub fn new(config: OpenAiEmbeddingsConfig) -> Self {
        let client = reqwest::Client::new();
        OpenAiEmbedder { config, client }
    }

    async fn request_embeddings(&self, input: &[String]) -> Result<Vec<Embedding>> {
        let request = EmbeddingRequest {
            model: &self.config.model,
            input,
        };

        let mut builder = self.client.post(&self.config.url).json(&request);
        if let Some(api_key) = &self.config.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder
            .send()
            .await
            .with_context(|| format!("Embeddings request to {} failed", self.config.url))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow::anyhow!(
                "Embeddings API request failed: {} {}",
                status,
                error_text
            ));
        }

        let response_data: EmbeddingResponse = response
            .json()
            .await
            .context("Invalid embeddings response")?;

        order_embeddings(response_data.data, input.len())
    }
}

/// Put returned vectors back in input order and check none are missing
fn order_embeddings(mut data: Vec<EmbeddingData>, expected: usize) -> Result<Vec<Embedding>> {
    if data.len() != expected {
        return Err(anyhow::anyhow!(
            "Embeddings API returned {} vectors for {} inputs",
            data.len(),
            expected
        ));
    }

    if data.iter().all(|item| item.index.is_some()) {
        data.sort_by_key(|item| item.index);
    }

    Ok(data
        .into_iter()
        .map(|item| Embedding::new(item.embedding))
        .collect())
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        let input = [text.to_string()];
        self.request_embeddings(&input)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("No embedding returned"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(EMBEDDING_BATCH_SIZE) {
            debug!("Embedding batch of {} texts", batch.len());
            embeddings.extend(self.request_embeddings(batch).await?);
        }
        Ok(embeddings)
    }

    fn name(&self) -> &str {
        "openai"
    }
}
