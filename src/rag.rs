use anyhow::{Context, Result};
use log::{debug, info};
use std::sync::Arc;

use crate::chunking::{split_pages, TextChunk};
use crate::config::ServiceConfig;
use crate::document::Document;
use crate::embeddings::{build_embedder, EmbeddingProvider};
use crate::error::AskError;
use crate::index::{ScoredChunk, VectorIndex};
use crate::llm::{build_chat_model, ChatModel, Prompt};
use crate::retriever::Retriever;

/// System instruction; `{context}` is replaced by the retrieved chunks
pub const SYSTEM_PROMPT: &str = "You are an assistant for question-answering tasks. \
Use the following pieces of retrieved context to answer \
the question. If you don't know the answer, say that you \
don't know. Use three sentences maximum and keep the \
answer concise.\n\n{context}";

/// A generated answer and the chunks it was grounded on
#[derive(Debug, Clone)]
pub struct Answer {
    pub answer: String,
    pub context: Vec<ScoredChunk>,
}

/// RAG (Retrieval-Augmented Generation) engine
pub struct RagEngine {
    retriever: Retriever,
    llm: Arc<dyn ChatModel>,
}

impl RagEngine {
    /// Create a new RAG engine
    pub fn new(retriever: Retriever, llm: Arc<dyn ChatModel>) -> Self {
        RagEngine { retriever, llm }
    }

    /// Load, split, embed and index the configured document
    pub async fn initialize(config: &ServiceConfig) -> Result<Self> {
        let embedder = build_embedder(&config.embeddings);
        let llm = build_chat_model(&config.llm, config.temperature);

        let document = Document::from_file(&config.document_path).with_context(|| {
            format!("Failed to load document {}", config.document_path.display())
        })?;
        info!(
            "Loaded {} ({} pages, {} characters)",
            document.document_id,
            document.pages.len(),
            document.char_count()
        );

        let chunks = split_pages(&document.pages, &config.chunking);
        info!("Split into {} chunks", chunks.len());

        Self::index_chunks(chunks, embedder, llm, config.top_k).await
    }

    /// Embed the chunks and build an engine over them
    pub async fn index_chunks(
        chunks: Vec<TextChunk>,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn ChatModel>,
        top_k: usize,
    ) -> Result<Self> {
        info!("Generating embeddings with {}...", embedder.name());
        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let embeddings = embedder
            .embed_batch(&texts)
            .await
            .context("Failed to embed document chunks")?;

        let index = VectorIndex::new(chunks, embeddings).context("Failed to build vector index")?;
        info!(
            "Indexed {} chunks ({} dimensions)",
            index.len(),
            index.dimensions()
        );

        let retriever = Retriever::new(Arc::new(index), embedder, top_k);
        Ok(RagEngine::new(retriever, llm))
    }

    /// Answer a question from the indexed document
    pub async fn answer(&self, question: &str) -> Result<Answer, AskError> {
        let context = self.retriever.retrieve(question).await?;

        let prompt = build_prompt(question, &context);
        debug!(
            "Generating answer with {} ({}) from {} chunks",
            self.llm.name(),
            self.llm.model(),
            context.len()
        );

        let answer = self
            .llm
            .complete(&prompt)
            .await
            .map_err(AskError::generation)?;

        Ok(Answer { answer, context })
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }
}

/// Stuff the retrieved chunks into the system instruction
pub fn build_prompt(question: &str, context: &[ScoredChunk]) -> Prompt {
    let context = context
        .iter()
        .map(|scored| scored.chunk.text.as_str())
        .collect::<Vec<&str>>()
        .join("\n\n");

    Prompt {
        system: SYSTEM_PROMPT.replace("{context}", &context),
        user: question.to_string(),
    }
}
