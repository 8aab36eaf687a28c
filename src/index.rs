use std::cmp::Ordering;
use thiserror::Error;

use crate::chunking::TextChunk;
use crate::embeddings::Embedding;

#[derive(Debug, Error, PartialEq)]
pub enum IndexError {
    #[error("Got {embeddings} embeddings for {chunks} chunks")]
    LengthMismatch { chunks: usize, embeddings: usize },
    #[error("Embedding dimension mismatch: index holds {expected}-dimensional vectors, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// A chunk returned by a similarity search
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: TextChunk,
    /// Cosine similarity to the query, higher is closer
    pub score: f32,
}

struct IndexedChunk {
    chunk: TextChunk,
    embedding: Embedding,
}

/// In-memory nearest-neighbour index over chunk embeddings.
///
/// Built once from the document's chunks; there is no way to add or remove
/// entries afterwards.
pub struct VectorIndex {
    entries: Vec<IndexedChunk>,
    dimensions: usize,
}

impl VectorIndex {
    /// Pair each chunk with its embedding
    pub fn new(chunks: Vec<TextChunk>, embeddings: Vec<Embedding>) -> Result<Self, IndexError> {
        if chunks.len() != embeddings.len() {
            return Err(IndexError::LengthMismatch {
                chunks: chunks.len(),
                embeddings: embeddings.len(),
            });
        }

        let dimensions = embeddings.first().map(Embedding::dimensions).unwrap_or(0);
        if let Some(bad) = embeddings.iter().find(|e| e.dimensions() != dimensions) {
            return Err(IndexError::DimensionMismatch {
                expected: dimensions,
                actual: bad.dimensions(),
            });
        }

        let entries = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| IndexedChunk { chunk, embedding })
            .collect();

        Ok(VectorIndex {
            entries,
            dimensions,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Return the `limit` chunks most similar to `query`, best first.
    /// Equal scores keep document order.
    pub fn search(&self, query: &Embedding, limit: usize) -> Result<Vec<ScoredChunk>, IndexError> {
        if self.is_empty() {
            return Ok(Vec::new());
        }
        if query.dimensions() != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                actual: query.dimensions(),
            });
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (i, cosine_similarity(&query.values, &entry.embedding.values)))
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(limit);

        Ok(scored
            .into_iter()
            .map(|(i, score)| ScoredChunk {
                chunk: self.entries[i].chunk.clone(),
                score,
            })
            .collect())
    }
}

/// Cosine similarity; 0.0 when either vector has zero length
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str, chunk_index: usize) -> TextChunk {
        TextChunk {
            text: text.to_string(),
            page: 0,
            start_position: 0,
            chunk_index,
        }
    }

    fn index() -> VectorIndex {
        VectorIndex::new(
            vec![chunk("north", 0), chunk("east", 1), chunk("north-east", 2), chunk("also east", 3)],
            vec![
                Embedding::new(vec![0.0, 1.0]),
                Embedding::new(vec![1.0, 0.0]),
                Embedding::new(vec![1.0, 1.0]),
                Embedding::new(vec![2.0, 0.0]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_search_orders_by_similarity() {
        let results = index().search(&Embedding::new(vec![1.0, 0.1]), 3).unwrap();
        let texts: Vec<&str> = results.iter().map(|r| r.chunk.text.as_str()).collect();

        // "east" and "also east" score the same; document order breaks the tie
        assert_eq!(texts, vec!["east", "also east", "north-east"]);
        assert!(results[0].score >= results[2].score);
    }

    #[test]
    fn test_search_is_repeatable() {
        let index = index();
        let query = Embedding::new(vec![0.3, 0.7]);
        assert_eq!(index.search(&query, 4).unwrap(), index.search(&query, 4).unwrap());
    }

    #[test]
    fn test_limit_larger_than_index() {
        assert_eq!(index().search(&Embedding::new(vec![1.0, 1.0]), 10).unwrap().len(), 4);
    }

    #[test]
    fn test_empty_index() {
        let index = VectorIndex::new(Vec::new(), Vec::new()).unwrap();
        assert!(index.is_empty());
        assert!(index.search(&Embedding::new(vec![1.0]), 4).unwrap().is_empty());
    }

    #[test]
    fn test_dimension_mismatch() {
        let err = index().search(&Embedding::new(vec![1.0, 0.0, 0.0]), 4).unwrap_err();
        assert_eq!(err, IndexError::DimensionMismatch { expected: 2, actual: 3 });

        let err = VectorIndex::new(
            vec![chunk("a", 0), chunk("b", 1)],
            vec![Embedding::new(vec![1.0]), Embedding::new(vec![1.0, 2.0])],
        )
        .err()
        .unwrap();
        assert_eq!(err, IndexError::DimensionMismatch { expected: 1, actual: 2 });
    }

    #[test]
    fn test_length_mismatch() {
        let err = VectorIndex::new(vec![chunk("a", 0)], Vec::new()).err().unwrap();
        assert_eq!(err, IndexError::LengthMismatch { chunks: 1, embeddings: 0 });
    }
}
