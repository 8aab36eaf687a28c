//! Test doubles for the external providers

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Mutex;

use crate::embeddings::{Embedding, EmbeddingProvider};
use crate::llm::{ChatModel, Prompt};

const VOCABULARY: [&str; 12] = [
    "application",
    "web",
    "architecture",
    "api",
    "invoice",
    "total",
    "document",
    "security",
    "login",
    "database",
    "deployment",
    "testing",
];

/// Counts vocabulary words, so texts sharing keywords end up close together
pub struct KeywordEmbedder;

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        let lower = text.to_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();

        let values = VOCABULARY
            .iter()
            .map(|term| words.iter().filter(|w| *w == term).count() as f32)
            .collect();

        Ok(Embedding::new(values))
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

pub struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Embedding> {
        Err(anyhow::anyhow!("embedding service unreachable"))
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Returns a fixed answer and records every prompt it receives
pub struct StaticChatModel {
    answer: String,
    prompts: Mutex<Vec<Prompt>>,
}

impl StaticChatModel {
    pub fn new(answer: &str) -> Self {
        StaticChatModel {
            answer: answer.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for StaticChatModel {
    async fn complete(&self, prompt: &Prompt) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.clone());
        Ok(self.answer.clone())
    }

    fn name(&self) -> &str {
        "static"
    }

    fn model(&self) -> &str {
        "static-model"
    }
}

pub struct FailingChatModel;

#[async_trait]
impl ChatModel for FailingChatModel {
    async fn complete(&self, _prompt: &Prompt) -> Result<String> {
        Err(anyhow::anyhow!("Groq API request failed: 503 Service Unavailable"))
    }

    fn name(&self) -> &str {
        "failing"
    }

    fn model(&self) -> &str {
        "failing-model"
    }
}
