//! Configuration for the claim decision service
//!
//! Values come from, in order of precedence: CLI flags, environment variables,
//! an optional TOML file, and the defaults below.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::retrieval::CorpusSource;

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaimConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Inbound authentication
    pub auth: AuthConfig,
    /// Policy corpus location
    pub corpus: CorpusConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// Decision generation configuration
    pub generation: GenerationConfig,
    /// Gemini backend settings
    pub gemini: GeminiConfig,
    /// Ollama backend settings
    pub ollama: OllamaConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Deadline for one search-and-decide request, in seconds
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            enable_cors: true,
            request_timeout_secs: 120,
        }
    }
}

/// Bearer-token authentication
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Shared secret expected in `Authorization: Bearer <api_key>`
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

/// Corpus source configuration. The first set field wins:
/// `snapshot_path`, then `snapshot_url`, then `csv_path`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    /// Chunk table with `chunk_id, source_doc, page, text` columns
    pub csv_path: Option<PathBuf>,
    /// Index snapshot written by `claim-rag-indexer`
    pub snapshot_path: Option<PathBuf>,
    /// Index snapshot downloaded at startup
    pub snapshot_url: Option<String>,
    /// Clauses retrieved per query
    pub top_k: usize,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            csv_path: None,
            snapshot_path: None,
            snapshot_url: None,
            top_k: 5,
        }
    }
}

impl CorpusConfig {
    /// Resolve the configured source
    pub fn source(&self) -> Option<CorpusSource> {
        if let Some(path) = &self.snapshot_path {
            Some(CorpusSource::Snapshot(path.clone()))
        } else if let Some(url) = &self.snapshot_url {
            Some(CorpusSource::SnapshotUrl(url.clone()))
        } else {
            self.csv_path.as_ref().map(|p| CorpusSource::Csv(p.clone()))
        }
    }
}

/// Embedding backend selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Local ONNX sentence-transformer
    #[default]
    Onnx,
    /// Remote Ollama embeddings
    Ollama,
    /// Deterministic token hashing, no model required
    Hashing,
}

impl EmbeddingBackend {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "onnx" => Some(Self::Onnx),
            "ollama" => Some(Self::Ollama),
            "hashing" => Some(Self::Hashing),
            _ => None,
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Backend to use
    pub backend: EmbeddingBackend,
    /// Model to use (default: all-MiniLM-L6-v2)
    pub model: String,
    /// Embedding dimensions (384 for MiniLM)
    pub dimensions: usize,
    /// Batch size for embedding generation
    pub batch_size: usize,
    /// Maximum sequence length
    pub max_length: usize,
    /// Cache directory for models
    pub cache_dir: PathBuf,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::Onnx,
            model: "all-MiniLM-L6-v2".to_string(),
            dimensions: 384,
            batch_size: 32,
            max_length: 256,
            cache_dir: dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("claim-rag")
                .join("models"),
        }
    }
}

/// Generation backend selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GenerationBackend {
    /// Google Gemini via the Generative Language API
    #[default]
    Gemini,
    /// Local Ollama server
    Ollama,
}

impl GenerationBackend {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "gemini" => Some(Self::Gemini),
            "ollama" => Some(Self::Ollama),
            _ => None,
        }
    }
}

/// Decision generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Backend to use
    pub backend: GenerationBackend,
    /// Model name; backend default when unset
    pub model: Option<String>,
    /// Temperature for generation
    pub temperature: f32,
    /// Upper bound on generated tokens
    pub max_output_tokens: u32,
    /// Ask the backend for a JSON-only reply where supported
    pub json_mode: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            backend: GenerationBackend::Gemini,
            model: None,
            temperature: 0.2,
            max_output_tokens: 2048,
            json_mode: true,
        }
    }
}

impl GenerationConfig {
    /// Effective model name for the selected backend
    pub fn model_name(&self) -> String {
        match (&self.model, self.backend) {
            (Some(model), _) => model.clone(),
            (None, GenerationBackend::Gemini) => "gemini-2.5-flash".to_string(),
            (None, GenerationBackend::Ollama) => "llama3.2:3b".to_string(),
        }
    }
}

/// Gemini settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// API key (usually from `GEMINI_API_KEY`)
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// API base URL
    pub base_url: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com".to_string(),
        }
    }
}

/// Ollama settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// Ollama base URL
    pub base_url: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
        }
    }
}

impl ClaimConfig {
    /// Load defaults, merge an optional TOML file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Parse a TOML file; missing sections fall back to defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read config '{}': {}", path.display(), e))
        })?;
        Self::from_toml(&raw)
            .map_err(|e| Error::config(format!("{} ({})", e, path.display())))
    }

    /// Parse TOML text
    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::config(format!("Invalid config: {}", e)))
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides using `lookup` as the environment
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("API_KEY") {
            self.auth.api_key = Some(key);
        }
        if let Some(key) = get("GEMINI_API_KEY") {
            self.gemini.api_key = Some(key);
        }
        if let Some(host) = get("CLAIM_RAG_HOST") {
            self.server.host = host;
        }
        if let Some(port) = get("CLAIM_RAG_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!("Ignoring invalid CLAIM_RAG_PORT '{}'", port),
            }
        }
        if let Some(path) = get("CLAIM_RAG_CORPUS") {
            self.corpus.csv_path = Some(PathBuf::from(path));
        }
        if let Some(path) = get("CLAIM_RAG_SNAPSHOT") {
            self.corpus.snapshot_path = Some(PathBuf::from(path));
        }
        if let Some(url) = get("CLAIM_RAG_SNAPSHOT_URL") {
            self.corpus.snapshot_url = Some(url);
        }
        if let Some(raw) = get("CLAIM_RAG_EMBEDDING_BACKEND") {
            match EmbeddingBackend::parse(&raw) {
                Some(backend) => self.embeddings.backend = backend,
                None => tracing::warn!("Ignoring unknown embedding backend '{}'", raw),
            }
        }
        if let Some(raw) = get("CLAIM_RAG_GENERATION_BACKEND") {
            match GenerationBackend::parse(&raw) {
                Some(backend) => self.generation.backend = backend,
                None => tracing::warn!("Ignoring unknown generation backend '{}'", raw),
            }
        }
    }

    /// Fail fast on settings the server cannot start without
    pub fn validate(&self) -> Result<()> {
        if self.auth.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
            return Err(Error::config(
                "API key for inbound requests is not set (API_KEY)",
            ));
        }
        if self.corpus.source().is_none() {
            return Err(Error::config(
                "No corpus configured: set corpus.csv_path, corpus.snapshot_path or corpus.snapshot_url",
            ));
        }
        if self.corpus.top_k == 0 {
            return Err(Error::config("corpus.top_k must be at least 1"));
        }
        if self.embeddings.dimensions == 0 {
            return Err(Error::config("embeddings.dimensions must be at least 1"));
        }
        if self.embeddings.batch_size == 0 {
            return Err(Error::config("embeddings.batch_size must be at least 1"));
        }
        Ok(())
    }

    /// Server socket address as `host:port`
    pub fn address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = ClaimConfig::default();
        assert_eq!(config.corpus.top_k, 5);
        assert_eq!(config.embeddings.model, "all-MiniLM-L6-v2");
        assert_eq!(config.embeddings.dimensions, 384);
        assert_eq!(config.generation.model_name(), "gemini-2.5-flash");
        assert!(config.corpus.source().is_none());
    }

    #[test]
    fn test_partial_toml() {
        let config = ClaimConfig::from_toml(
            r#"
            [server]
            port = 9000

            [corpus]
            csv_path = "data/chunks.csv"
            top_k = 3

            [embeddings]
            backend = "hashing"

            [generation]
            backend = "ollama"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.corpus.top_k, 3);
        assert_eq!(config.embeddings.backend, EmbeddingBackend::Hashing);
        assert_eq!(config.embeddings.dimensions, 384);
        assert_eq!(config.generation.model_name(), "llama3.2:3b");
        assert!(matches!(config.corpus.source(), Some(CorpusSource::Csv(_))));
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            ClaimConfig::from_toml("[server]\nport = \"high\""),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("API_KEY", "secret"),
            ("GEMINI_API_KEY", "g-key"),
            ("CLAIM_RAG_PORT", "7000"),
            ("CLAIM_RAG_CORPUS", "chunks.csv"),
            ("CLAIM_RAG_SNAPSHOT", "index.json"),
            ("CLAIM_RAG_EMBEDDING_BACKEND", "Hashing"),
            ("CLAIM_RAG_GENERATION_BACKEND", "bogus"),
        ]
        .into_iter()
        .collect();

        let mut config = ClaimConfig::default();
        config.apply_env_from(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.auth.api_key.as_deref(), Some("secret"));
        assert_eq!(config.gemini.api_key.as_deref(), Some("g-key"));
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.embeddings.backend, EmbeddingBackend::Hashing);
        assert_eq!(config.generation.backend, GenerationBackend::Gemini);
        // Snapshot takes precedence over CSV
        assert!(matches!(config.corpus.source(), Some(CorpusSource::Snapshot(_))));
    }

    #[test]
    fn test_validate() {
        let mut config = ClaimConfig::default();
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        config.auth.api_key = Some("secret".into());
        assert!(config.validate().is_err());

        config.corpus.csv_path = Some(PathBuf::from("chunks.csv"));
        assert!(config.validate().is_ok());

        config.corpus.top_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_secrets_not_serialized() {
        let mut config = ClaimConfig::default();
        config.auth.api_key = Some("secret".into());
        config.gemini.api_key = Some("g-key".into());

        let rendered = serde_json::to_string(&config).unwrap();
        assert!(!rendered.contains("secret"));
        assert!(!rendered.contains("g-key"));
    }
}
