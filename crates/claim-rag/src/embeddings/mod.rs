//! Text embedding backends and the corpus-owning [`Embedder`]

pub mod embedder;
pub mod hashing;
pub mod ollama;
pub mod onnx_embedder;

pub use embedder::Embedder;
pub use hashing::HashingEmbedder;
pub use ollama::OllamaEmbedder;
pub use onnx_embedder::OnnxEmbedder;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{ClaimConfig, EmbeddingBackend};
use crate::error::Result;
use crate::generation::OllamaClient;

/// Trait for generating text embeddings
///
/// Implementations:
/// - `OnnxEmbedder`: local sentence-transformer (all-MiniLM-L6-v2)
/// - `OllamaEmbedder`: Ollama server (nomic-embed-text, ...)
/// - `HashingEmbedder`: deterministic token hashing
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts, in input order
    ///
    /// Default implementation calls `embed` sequentially.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Embedding dimensions
    fn dimensions(&self) -> usize;

    /// Model identity; vectors from different models are not comparable
    fn model(&self) -> &str;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}

/// Construct the embedding provider selected in `config`
pub async fn build_provider(config: &ClaimConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let embeddings = &config.embeddings;

    let provider: Arc<dyn EmbeddingProvider> = match embeddings.backend {
        EmbeddingBackend::Onnx => Arc::new(OnnxEmbedder::new(embeddings).await?),
        EmbeddingBackend::Ollama => {
            let client = Arc::new(OllamaClient::new(&config.ollama, &config.generation)?);
            Arc::new(OllamaEmbedder::new(
                client,
                embeddings.model.clone(),
                embeddings.dimensions,
            ))
        }
        EmbeddingBackend::Hashing => Arc::new(HashingEmbedder::new(embeddings.dimensions)),
    };

    tracing::info!(
        provider = provider.name(),
        model = provider.model(),
        dimensions = provider.dimensions(),
        "Embedding provider ready"
    );

    Ok(provider)
}
