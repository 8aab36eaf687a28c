use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::config::LlmBackend;
use crate::gemini::GeminiClient;
use crate::groq::GroqClient;

/// A chat prompt: system instruction plus a single user message
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Hosted generative model that completes a prompt
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Generate a completion for the prompt
    async fn complete(&self, prompt: &Prompt) -> Result<String>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Model identifier for logging
    fn model(&self) -> &str;
}

/// Build the chat model selected by configuration
pub fn build_chat_model(backend: &LlmBackend, temperature: f32) -> Arc<dyn ChatModel> {
    match backend {
        LlmBackend::Groq(config) => Arc::new(GroqClient::new(config.clone(), temperature)),
        LlmBackend::Gemini(config) => {
            Arc::new(GeminiClient::new(config.clone()).with_temperature(temperature))
        }
    }
}
