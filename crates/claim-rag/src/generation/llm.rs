//! LLM provider trait for decision generation

use async_trait::async_trait;

use crate::error::Result;

/// Trait for text-completion backends
///
/// Implementations:
/// - `GeminiClient`: Google Generative Language API (gemini-2.5-flash)
/// - `OllamaClient`: Local Ollama server (llama3.2, phi3, etc.)
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send one prompt and return the raw reply text
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
