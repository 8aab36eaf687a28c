use anyhow::{Context, Result};
use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use crate::chunking::ChunkingConfig;
use crate::embeddings::OpenAiEmbeddingsConfig;
use crate::gemini::GeminiConfig;
use crate::groq::GroqConfig;

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_TOP_K: usize = 4;
const DEFAULT_TEMPERATURE: f32 = 0.5;

/// Where chunk and question embeddings are computed
#[derive(Debug, Clone, PartialEq)]
pub enum EmbeddingsBackend {
    OpenAi(OpenAiEmbeddingsConfig),
    Gemini(GeminiConfig),
}

/// Which hosted model generates answers
#[derive(Debug, Clone, PartialEq)]
pub enum LlmBackend {
    Groq(GroqConfig),
    Gemini(GeminiConfig),
}

/// Service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    /// Document indexed at startup
    pub document_path: PathBuf,
    pub chunking: ChunkingConfig,
    /// Chunks retrieved per question
    pub top_k: usize,
    /// Sampling temperature for answer generation
    pub temperature: f32,
    pub embeddings: EmbeddingsBackend,
    pub llm: LlmBackend,
}

impl ServiceConfig {
    /// Create a new configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create a configuration from any variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let chunking = ChunkingConfig {
            chunk_size: parse_or(&lookup, "CHUNK_SIZE", ChunkingConfig::default().chunk_size)?,
            chunk_overlap: parse_or(
                &lookup,
                "CHUNK_OVERLAP",
                ChunkingConfig::default().chunk_overlap,
            )?,
        };
        chunking.validate()?;

        let top_k = parse_or(&lookup, "RETRIEVER_TOP_K", DEFAULT_TOP_K)?;
        if top_k == 0 {
            return Err(anyhow::anyhow!("RETRIEVER_TOP_K must be greater than zero"));
        }

        let embeddings = match lookup_or(&lookup, "EMBEDDINGS_PROVIDER", "openai").as_str() {
            "openai" => EmbeddingsBackend::OpenAi(OpenAiEmbeddingsConfig::from_lookup(&lookup)),
            "gemini" => EmbeddingsBackend::Gemini(GeminiConfig::from_lookup(&lookup)?),
            other => {
                return Err(anyhow::anyhow!(
                    "Unknown EMBEDDINGS_PROVIDER '{}', expected 'openai' or 'gemini'",
                    other
                ))
            }
        };

        let llm = match lookup_or(&lookup, "LLM_PROVIDER", "groq").as_str() {
            "groq" => LlmBackend::Groq(GroqConfig::from_lookup(&lookup)?),
            "gemini" => LlmBackend::Gemini(GeminiConfig::from_lookup(&lookup)?),
            other => {
                return Err(anyhow::anyhow!(
                    "Unknown LLM_PROVIDER '{}', expected 'groq' or 'gemini'",
                    other
                ))
            }
        };

        Ok(ServiceConfig {
            host: lookup_or(&lookup, "HOST", "0.0.0.0"),
            port: parse_or(&lookup, "PORT", DEFAULT_PORT)?,
            document_path: PathBuf::from(lookup_or(&lookup, "DOCUMENT_PATH", "data/document.pdf")),
            chunking,
            top_k,
            temperature: parse_or(&lookup, "LLM_TEMPERATURE", DEFAULT_TEMPERATURE)?,
            embeddings,
            llm,
        })
    }

    /// Address the HTTP listener binds to
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Value of `key`, or `default` when unset or empty
pub(crate) fn lookup_or<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Value of `key`, which must be set
pub(crate) fn require<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|value| !value.is_empty())
        .with_context(|| format!("Missing {}", key))
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match lookup(key).filter(|value| !value.is_empty()) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid {} '{}': {}", key, value, e)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<ServiceConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServiceConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[("GROQ_API_KEY", "gsk-test")]).unwrap();

        assert_eq!(config.address(), "0.0.0.0:5000");
        assert_eq!(config.document_path, PathBuf::from("data/document.pdf"));
        assert_eq!(config.chunking, ChunkingConfig::default());
        assert_eq!(config.top_k, 4);
        assert_eq!(config.temperature, 0.5);
        assert!(matches!(config.embeddings, EmbeddingsBackend::OpenAi(_)));
        match config.llm {
            LlmBackend::Groq(groq) => assert_eq!(groq.api_key, "gsk-test"),
            other => panic!("unexpected backend {:?}", other),
        }
    }

    #[test]
    fn test_missing_groq_key() {
        let err = config_from(&[]).unwrap_err();
        assert_eq!(err.to_string(), "Missing GROQ_API_KEY");
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("PORT", "8080"),
            ("HOST", "127.0.0.1"),
            ("DOCUMENT_PATH", "docs/manual.pdf"),
            ("CHUNK_SIZE", "800"),
            ("CHUNK_OVERLAP", "100"),
            ("RETRIEVER_TOP_K", "6"),
            ("LLM_TEMPERATURE", "0.1"),
            ("EMBEDDINGS_PROVIDER", "gemini"),
            ("LLM_PROVIDER", "gemini"),
            ("GEMINI_API_KEY", "gemini-key"),
        ])
        .unwrap();

        assert_eq!(config.address(), "127.0.0.1:8080");
        assert_eq!(config.document_path, PathBuf::from("docs/manual.pdf"));
        assert_eq!(config.chunking.chunk_size, 800);
        assert_eq!(config.chunking.chunk_overlap, 100);
        assert_eq!(config.top_k, 6);
        assert_eq!(config.temperature, 0.1);
        assert!(matches!(config.embeddings, EmbeddingsBackend::Gemini(_)));
        assert!(matches!(config.llm, LlmBackend::Gemini(_)));
    }

    #[test]
    fn test_invalid_values() {
        let err = config_from(&[("GROQ_API_KEY", "k"), ("PORT", "http")]).unwrap_err();
        assert!(err.to_string().starts_with("Invalid PORT 'http'"));

        assert!(config_from(&[("GROQ_API_KEY", "k"), ("CHUNK_OVERLAP", "500")]).is_err());
        assert!(config_from(&[("GROQ_API_KEY", "k"), ("RETRIEVER_TOP_K", "0")]).is_err());
        assert!(config_from(&[("GROQ_API_KEY", "k"), ("LLM_PROVIDER", "openai")]).is_err());
    }
}
