//! Application state for the claim server

use parking_lot::RwLock;
use std::sync::Arc;

use crate::config::ClaimConfig;
use crate::embeddings::build_provider;
use crate::error::{Error, Result};
use crate::generation::{build_llm_provider, DecisionGenerator};
use crate::retrieval::SemanticSearch;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: ClaimConfig,
    /// Indexed policy corpus
    search: SemanticSearch,
    /// Decision generator
    generator: DecisionGenerator,
    /// Ready state
    ready: RwLock<bool>,
}

impl AppState {
    /// Build providers and index the corpus described by `config`
    pub async fn new(config: ClaimConfig) -> Result<Self> {
        tracing::info!("Initializing claim application state...");

        let source = config
            .corpus
            .source()
            .ok_or_else(|| Error::config("No corpus source configured"))?;

        // Generation credentials fail fast, before any model download
        let llm = build_llm_provider(&config)?;
        let provider = build_provider(&config).await?;

        let search = SemanticSearch::open(provider, &source).await?;
        tracing::info!(chunks = search.len(), "Semantic search initialized");

        Ok(Self::from_parts(config, search, DecisionGenerator::new(llm)))
    }

    /// Assemble state from prebuilt components
    pub fn from_parts(
        config: ClaimConfig,
        search: SemanticSearch,
        generator: DecisionGenerator,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                search,
                generator,
                ready: RwLock::new(true),
            }),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &ClaimConfig {
        &self.inner.config
    }

    /// Get semantic search
    pub fn search(&self) -> &SemanticSearch {
        &self.inner.search
    }

    /// Get decision generator
    pub fn generator(&self) -> &DecisionGenerator {
        &self.inner.generator
    }

    /// Check if ready
    pub fn is_ready(&self) -> bool {
        *self.inner.ready.read()
    }

    /// Set ready state; cleared once shutdown begins
    pub fn set_ready(&self, ready: bool) {
        *self.inner.ready.write() = ready;
    }
}
