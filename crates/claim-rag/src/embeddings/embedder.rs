//! Corpus embedder: one model, one index, row-aligned metadata

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Instant;

use crate::error::{Error, Result};
use crate::index::CorpusIndex;
use crate::retrieval::SearchResult;
use crate::types::Chunk;

use super::EmbeddingProvider;

/// Embeds a corpus and answers nearest-chunk queries against it.
///
/// The provider is fixed at construction, so corpus and query vectors always
/// come from the same model. The indexed corpus is an immutable
/// [`CorpusIndex`] that is replaced wholesale on rebuild; readers keep the
/// snapshot they started with.
pub struct Embedder {
    provider: Arc<dyn EmbeddingProvider>,
    current: RwLock<Option<Arc<CorpusIndex>>>,
}

impl Embedder {
    /// Create an embedder with no corpus
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            provider,
            current: RwLock::new(None),
        }
    }

    /// The embedding provider
    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    /// Embedding dimensions
    pub fn dimensions(&self) -> usize {
        self.provider.dimensions()
    }

    /// Whether a corpus has been indexed
    pub fn is_indexed(&self) -> bool {
        self.current.read().is_some()
    }

    /// Number of indexed chunks
    pub fn len(&self) -> usize {
        self.current.read().as_ref().map_or(0, |c| c.len())
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The current snapshot, if any
    pub fn snapshot(&self) -> Option<Arc<CorpusIndex>> {
        self.current.read().clone()
    }

    /// Embed `chunks` and replace the indexed corpus with them
    pub async fn index_corpus(&self, chunks: Vec<Chunk>) -> Result<usize> {
        if chunks.is_empty() {
            return Err(Error::EmptyCorpus);
        }

        let start = Instant::now();
        let vectors = self.embed_chunks(&chunks).await?;
        let corpus = CorpusIndex::build(
            self.provider.model(),
            self.provider.dimensions(),
            chunks,
            &vectors,
        )?;
        let count = corpus.len();

        *self.current.write() = Some(Arc::new(corpus));

        tracing::info!(
            chunks = count,
            dimensions = self.provider.dimensions(),
            model = self.provider.model(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Index built"
        );

        Ok(count)
    }

    /// Embed `chunks` and append them to the indexed corpus
    pub async fn append_corpus(&self, chunks: Vec<Chunk>) -> Result<usize> {
        if !self.is_indexed() {
            return Err(Error::NotIndexed);
        }
        if chunks.is_empty() {
            return Ok(self.len());
        }

        let vectors = self.embed_chunks(&chunks).await?;
        let added = chunks.len();

        // Derive from whatever is current under the write lock so concurrent appends serialize
        let total = {
            let mut current = self.current.write();
            let base = current.as_ref().ok_or(Error::NotIndexed)?;
            let next = base.appended(chunks, &vectors)?;
            let total = next.len();
            *current = Some(Arc::new(next));
            total
        };

        tracing::info!(added, total, "Index extended");
        Ok(total)
    }

    /// Adopt a previously built snapshot
    pub fn install(&self, corpus: CorpusIndex) -> Result<()> {
        if corpus.model() != self.provider.model() {
            return Err(Error::config(format!(
                "Index was built with model '{}' but the embedder uses '{}'",
                corpus.model(),
                self.provider.model()
            )));
        }
        if corpus.dimensions() != self.provider.dimensions() {
            return Err(Error::DimensionMismatch {
                expected: self.provider.dimensions(),
                actual: corpus.dimensions(),
            });
        }

        let count = corpus.len();
        *self.current.write() = Some(Arc::new(corpus));
        tracing::info!(chunks = count, model = self.provider.model(), "Index installed");
        Ok(())
    }

    /// Embed a query string with the corpus model
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let vector = self.provider.embed(text).await?;
        if vector.len() != self.provider.dimensions() {
            return Err(Error::DimensionMismatch {
                expected: self.provider.dimensions(),
                actual: vector.len(),
            });
        }
        Ok(vector)
    }

    /// The `k` chunks nearest to `text`, ascending by distance
    pub async fn query(&self, text: &str, k: usize) -> Result<Vec<SearchResult>> {
        let corpus = self.snapshot().ok_or(Error::NotIndexed)?;
        let vector = self.embed_query(text).await?;

        let results = corpus
            .nearest(&vector, k)?
            .into_iter()
            .map(|(chunk, distance)| SearchResult {
                chunk: chunk.clone(),
                distance,
            })
            .collect();

        Ok(results)
    }

    async fn embed_chunks(&self, chunks: &[Chunk]) -> Result<Vec<Vec<f32>>> {
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.provider.embed_batch(&texts).await?;

        if vectors.len() != chunks.len() {
            return Err(Error::model_unavailable(format!(
                "Provider returned {} embeddings for {} texts",
                vectors.len(),
                chunks.len()
            )));
        }
        Ok(vectors)
    }
}
