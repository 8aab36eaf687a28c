use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::{lookup_or, require};
use crate::embeddings::{Embedding, EmbeddingProvider};
use crate::llm::{ChatModel, Prompt};

const DEFAULT_TEMPERATURE: f32 = 0.2;
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Configuration for Gemini API
#[derive(Clone, PartialEq)]
pub struct GeminiConfig {
    pub api_key: String,
    pub embeddings_url: String,
    pub generate_url: String,
    pub embedding_model: String,
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"<redacted>")
            .field("embeddings_url", &self.embeddings_url)
            .field("generate_url", &self.generate_url)
            .field("embedding_model", &self.embedding_model)
            .finish()
    }
}

impl GeminiConfig {
    /// Read the configuration through a variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(GeminiConfig {
            api_key: require(&lookup, "GEMINI_API_KEY")?,
            embeddings_url: lookup_or(
                &lookup,
                "GEMINI_EMBEDDINGS_URL",
                "https://generativelanguage.googleapis.com/v1beta/models/text-embedding-004:embedContent",
            ),
            generate_url: lookup_or(
                &lookup,
                "GEMINI_GENERATE_URL",
                "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent",
            ),
            embedding_model: lookup_or(
                &lookup,
                "GEMINI_EMBEDDING_MODEL",
                "models/text-embedding-004",
            ),
        })
    }
}

/// Client for interacting with Gemini API
#[derive(Clone)]
pub struct GeminiClient {
    config: GeminiConfig,
    temperature: f32,
    client: reqwest::Client,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(config: GeminiConfig) -> Self {
        let client = reqwest::Client::new();
        GeminiClient {
            config,
            temperature: DEFAULT_TEMPERATURE,
            client,
        }
    }

    /// Use a different sampling temperature for generation
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn build_generate_request<'a>(&self, prompt: &'a Prompt) -> GenerateRequest<'a> {
        GenerateRequest {
            system_instruction: Content::new(&prompt.system, None),
            contents: vec![Content::new(&prompt.user, Some("user"))],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                top_p: 0.8,
                top_k: 40,
                max_output_tokens: 1024,
            },
        }
    }

    async fn post<T: Serialize, R: DeserializeOwned>(&self, url: &str, body: &T) -> Result<R> {
        // The key travels in a header so it never shows up in a request URL
        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(body)
            .send()
            .await
            .context("Gemini API request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow::anyhow!(
                "API request failed: {} {}",
                status,
                error_text
            ));
        }

        response.json().await.context("Invalid Gemini API response")
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiClient {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        let request = EmbeddingRequest {
            model: &self.config.embedding_model,
            content: Content::new(text, None),
        };

        let response_data: EmbeddingResponse =
            self.post(&self.config.embeddings_url, &request).await?;

        Ok(Embedding::new(response_data.embedding.values))
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

#[async_trait]
impl ChatModel for GeminiClient {
    async fn complete(&self, prompt: &Prompt) -> Result<String> {
        let request = self.build_generate_request(prompt);
        let response_data: GenerateResponse =
            self.post(&self.config.generate_url, &request).await?;

        first_candidate_text(response_data)
    }

    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        self.config
            .generate_url
            .rsplit('/')
            .next()
            .and_then(|segment| segment.split(':').next())
            .unwrap_or("gemini")
    }
}

/// Extract the generated text from the response
fn first_candidate_text(response: GenerateResponse) -> Result<String> {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content.parts.into_iter().next())
        .map(|p| p.text)
        .ok_or_else(|| anyhow::anyhow!("No response generated"))
}

// Request/response structures for the Gemini API

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    content: Content<'a>,
}

#[derive(Deserialize, Debug)]
struct EmbeddingResponse {
    embedding: EmbeddingData,
}

#[derive(Deserialize, Debug)]
struct EmbeddingData {
    values: Vec<f32>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
}

impl<'a> Content<'a> {
    fn new(text: &'a str, role: Option<&'static str>) -> Self {
        Content {
            parts: vec![Part { text }],
            role,
        }
    }
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: i32,
    max_output_tokens: i32,
}

#[derive(Deserialize, Debug)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Deserialize, Debug)]
struct ResponseContent {
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Debug)]
struct ResponsePart {
    text: String,
}
