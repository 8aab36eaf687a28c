use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::{lookup_or, require};
use crate::llm::{ChatModel, Prompt};

/// Configuration for the Groq chat completions API
#[derive(Clone, PartialEq)]
pub struct GroqConfig {
    pub api_key: String,
    pub url: String,
    pub model: String,
}

impl std::fmt::Debug for GroqConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroqConfig")
            .field("api_key", &"<redacted>")
            .field("url", &self.url)
            .field("model", &self.model)
            .finish()
    }
}

impl GroqConfig {
    /// Read the configuration through a variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(GroqConfig {
            api_key: require(&lookup, "GROQ_API_KEY")?,
            url: lookup_or(
                &lookup,
                "GROQ_URL",
                "https://api.groq.com/openai/v1/chat/completions",
            ),
            model: lookup_or(&lookup, "GROQ_MODEL", "llama-3.1-8b-instant"),
        })
    }
}

/// Client for Groq's OpenAI-compatible chat completions endpoint
pub struct GroqClient {
    config: GroqConfig,
    temperature: f32,
    client: reqwest::Client,
}

impl GroqClient {
    /// Create a new Groq client
    pub fn new(config: GroqConfig, temperature: f32) -> Self {
        let client = reqwest::Client::new();
        GroqClient {
            config,
            temperature,
            client,
        }
    }

    fn build_request<'a>(&'a self, prompt: &'a Prompt) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            temperature: self.temperature,
        }
    }
}

#[async_trait]
impl ChatModel for GroqClient {
    async fn complete(&self, prompt: &Prompt) -> Result<String> {
        let request = self.build_request(prompt);
        debug!("Sending chat completion request to {}", self.config.url);

        let response = self
            .client
            .post(&self.config.url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("Chat completion request to {} failed", self.config.url))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow::anyhow!(
                "Groq API request failed: {} {}",
                status,
                error_text
            ));
        }

        let response_data: ChatResponse = response
            .json()
            .await
            .context("Invalid chat completion response")?;

        first_message(response_data)
    }

    fn name(&self) -> &str {
        "groq"
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

fn first_message(response: ChatResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| anyhow::anyhow!("No response generated"))
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize, Debug)]
struct ResponseMessage {
    content: Option<String>,
}
