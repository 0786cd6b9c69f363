//! Decision generation: prompt, one model call, strict parse

use std::sync::Arc;
use std::time::Instant;

use crate::error::Result;
use crate::types::Decision;

use super::llm::LlmProvider;
use super::parser::parse_decision;
use super::prompt::PromptBuilder;

/// Turns a query and retrieved clauses into a structured [`Decision`]
pub struct DecisionGenerator {
    llm: Arc<dyn LlmProvider>,
}

impl DecisionGenerator {
    /// Create a generator over `llm`
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    /// The underlying provider
    pub fn llm(&self) -> &Arc<dyn LlmProvider> {
        &self.llm
    }

    /// Decide on `query` given `context` clause texts, in ranked order
    pub async fn generate(&self, query: &str, context: &[String]) -> Result<Decision> {
        let prompt = PromptBuilder::build_decision_prompt(query, context);

        tracing::debug!(
            provider = self.llm.name(),
            model = self.llm.model(),
            clauses = context.len(),
            "Generation invoked"
        );

        let start = Instant::now();
        let raw = self.llm.complete(&prompt).await.map_err(|e| {
            tracing::warn!(provider = self.llm.name(), error = %e, "Generation failed");
            e
        })?;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match parse_decision(&raw) {
            Ok(decision) => {
                tracing::info!(
                    decision = %decision.decision,
                    amount = %decision.amount,
                    justifications = decision.justification.len(),
                    elapsed_ms,
                    "Decision generated"
                );
                Ok(decision)
            }
            Err(e) => {
                tracing::warn!(
                    provider = self.llm.name(),
                    elapsed_ms,
                    raw = %raw,
                    "Model reply could not be parsed"
                );
                Err(e)
            }
        }
    }
}
