use log::debug;
use std::sync::Arc;

use crate::embeddings::EmbeddingProvider;
use crate::error::AskError;
use crate::index::{ScoredChunk, VectorIndex};

/// Similarity search over the document index
pub struct Retriever {
    index: Arc<VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    top_k: usize,
}

impl Retriever {
    /// The embedder must be the one the index was built with
    pub fn new(index: Arc<VectorIndex>, embedder: Arc<dyn EmbeddingProvider>, top_k: usize) -> Self {
        Retriever {
            index,
            embedder,
            top_k,
        }
    }

    /// Embed the question and return the closest chunks, best first
    pub async fn retrieve(&self, question: &str) -> Result<Vec<ScoredChunk>, AskError> {
        let query = self
            .embedder
            .embed(question)
            .await
            .map_err(AskError::embedding)?;

        let results = self.index.search(&query, self.top_k)?;

        debug!(
            "Retrieved {} chunks, best score {:?}",
            results.len(),
            results.first().map(|r| r.score)
        );

        Ok(results)
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::TextChunk;
    use crate::embeddings::{Embedding, EmbeddingProvider};
    use crate::testing::{FailingEmbedder, KeywordEmbedder};

    async fn build(texts: &[&str], top_k: usize) -> Retriever {
        let embedder = Arc::new(KeywordEmbedder);
        let chunks: Vec<TextChunk> = texts
            .iter()
            .enumerate()
            .map(|(i, text)| TextChunk {
                text: text.to_string(),
                page: 0,
                start_position: 0,
                chunk_index: i,
            })
            .collect();
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = embedder.embed_batch(&texts).await.unwrap();
        let index = VectorIndex::new(chunks, embeddings).unwrap();

        Retriever::new(Arc::new(index), embedder, top_k)
    }

    #[tokio::test]
    async fn test_retrieves_most_similar_chunks() {
        let retriever = build(
            &[
                "The invoice total is due in thirty days.",
                "Our web application uses a layered architecture.",
                "The application exposes a REST API for the web client.",
            ],
            2,
        )
        .await;

        let results = retriever.retrieve("How is the web application built?").await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.chunk.text.contains("application")));
    }

    #[tokio::test]
    async fn test_embedding_failure() {
        let index = VectorIndex::new(Vec::new(), Vec::new()).unwrap();
        let retriever = Retriever::new(Arc::new(index), Arc::new(FailingEmbedder), 4);

        let err = retriever.retrieve("anything").await.unwrap_err();
        assert_eq!(err.kind(), "embedding");
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_a_retrieval_error() {
        let chunk = TextChunk {
            text: "web application".to_string(),
            page: 0,
            start_position: 0,
            chunk_index: 0,
        };
        let index = VectorIndex::new(vec![chunk], vec![Embedding::new(vec![1.0, 0.0])]).unwrap();
        let retriever = Retriever::new(Arc::new(index), Arc::new(KeywordEmbedder), 4);

        let err = retriever.retrieve("web application").await.unwrap_err();
        assert_eq!(err.kind(), "retrieval");
        assert!(err.to_string().starts_with("Retrieval failed: "));
    }
}
