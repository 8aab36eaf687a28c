pub mod chunking;
pub mod config;
pub mod document;
pub mod embeddings;
pub mod error;
pub mod gemini;
pub mod groq;
pub mod index;
pub mod llm;
pub mod rag;
pub mod retriever;
pub mod server;

#[cfg(test)]
mod testing;
