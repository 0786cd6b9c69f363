//! Claim decision generation

pub mod decider;
pub mod gemini;
pub mod llm;
pub mod ollama;
pub mod parser;
pub mod prompt;

pub use decider::DecisionGenerator;
pub use gemini::GeminiClient;
pub use llm::LlmProvider;
pub use ollama::OllamaClient;
pub use parser::{parse_decision, strip_code_fence};
pub use prompt::PromptBuilder;

use std::sync::Arc;

use crate::config::{ClaimConfig, GenerationBackend};
use crate::error::Result;

/// Construct the generation backend selected in `config`
pub fn build_llm_provider(config: &ClaimConfig) -> Result<Arc<dyn LlmProvider>> {
    let llm: Arc<dyn LlmProvider> = match config.generation.backend {
        GenerationBackend::Gemini => {
            Arc::new(GeminiClient::new(&config.gemini, &config.generation)?)
        }
        GenerationBackend::Ollama => {
            Arc::new(OllamaClient::new(&config.ollama, &config.generation)?)
        }
    };

    tracing::info!(provider = llm.name(), model = llm.model(), "Generation provider ready");
    Ok(llm)
}
