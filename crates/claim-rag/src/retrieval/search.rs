//! Semantic search over the indexed policy corpus

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use crate::embeddings::{Embedder, EmbeddingProvider};
use crate::error::{Error, Result};
use crate::ingestion::{corpus, snapshot};
use crate::types::Chunk;

use super::CorpusSource;

/// Default number of clauses retrieved per query
pub const DEFAULT_TOP_K: usize = 5;

/// A retrieved chunk and its squared L2 distance to the query
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    /// The retrieved chunk
    pub chunk: Chunk,
    /// Squared Euclidean distance (lower is closer)
    pub distance: f32,
}

/// Ranked retrieval of policy chunks for a query
///
/// Construction indexes the corpus fully before the first query. An empty
/// corpus is accepted and every search over it returns no results.
pub struct SemanticSearch {
    embedder: Arc<Embedder>,
}

impl SemanticSearch {
    /// Index an in-memory chunk list
    pub async fn from_chunks(
        provider: Arc<dyn EmbeddingProvider>,
        chunks: Vec<Chunk>,
    ) -> Result<Self> {
        let embedder = Arc::new(Embedder::new(provider));
        if chunks.is_empty() {
            tracing::warn!("Corpus is empty; searches will return no results");
        } else {
            embedder.index_corpus(chunks).await?;
        }
        Ok(Self { embedder })
    }

    /// Load and index a CSV corpus table
    pub async fn from_csv(
        provider: Arc<dyn EmbeddingProvider>,
        path: &std::path::Path,
    ) -> Result<Self> {
        let chunks = corpus::load_csv(path)?;
        Self::from_chunks(provider, chunks).await
    }

    /// Adopt a snapshot written by the indexer
    pub fn from_snapshot(
        provider: Arc<dyn EmbeddingProvider>,
        path: &std::path::Path,
    ) -> Result<Self> {
        let corpus = snapshot::load(path)?;
        let embedder = Embedder::new(provider);
        embedder.install(corpus)?;
        Ok(Self {
            embedder: Arc::new(embedder),
        })
    }

    /// Build from any configured corpus source
    pub async fn open(provider: Arc<dyn EmbeddingProvider>, source: &CorpusSource) -> Result<Self> {
        tracing::info!(source = %source, "Opening corpus");
        match source {
            CorpusSource::Csv(path) => Self::from_csv(provider, path).await,
            CorpusSource::Snapshot(path) => Self::from_snapshot(provider, path),
            CorpusSource::SnapshotUrl(url) => {
                let corpus = snapshot::fetch(url).await?;
                let embedder = Embedder::new(provider);
                embedder.install(corpus)?;
                Ok(Self {
                    embedder: Arc::new(embedder),
                })
            }
        }
    }

    /// Wrap an embedder that already holds an index
    pub fn from_embedder(embedder: Arc<Embedder>) -> Result<Self> {
        if !embedder.is_indexed() {
            return Err(Error::NotIndexed);
        }
        Ok(Self { embedder })
    }

    /// The underlying embedder
    pub fn embedder(&self) -> &Arc<Embedder> {
        &self.embedder
    }

    /// Number of searchable chunks
    pub fn len(&self) -> usize {
        self.embedder.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.embedder.is_empty()
    }

    /// Up to `top_k` chunks nearest to `query`, ascending by distance
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let start = Instant::now();
        let results = match self.embedder.query(query, top_k).await {
            Ok(results) => results,
            Err(Error::NotIndexed) => Vec::new(),
            Err(e) => return Err(e),
        };

        tracing::info!(
            top_k,
            results = results.len(),
            best_distance = results.first().map(|r| r.distance),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Query executed"
        );

        Ok(results)
    }

    /// Rebuild from `source`; the current index keeps serving if this fails
    pub async fn reindex(&self, source: &CorpusSource) -> Result<usize> {
        match source {
            CorpusSource::Csv(path) => {
                let chunks = corpus::load_csv(path)?;
                self.embedder.index_corpus(chunks).await
            }
            CorpusSource::Snapshot(path) => {
                let corpus = snapshot::load(path)?;
                let count = corpus.len();
                self.embedder.install(corpus)?;
                Ok(count)
            }
            CorpusSource::SnapshotUrl(url) => {
                let corpus = snapshot::fetch(url).await?;
                let count = corpus.len();
                self.embedder.install(corpus)?;
                Ok(count)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::HashingEmbedder;
    use crate::types::PageRef;
    use std::io::Write;

    fn provider() -> Arc<dyn EmbeddingProvider> {
        Arc::new(HashingEmbedder::new(128))
    }

    fn chunks() -> Vec<Chunk> {
        vec![
            Chunk::new(
                "c1",
                "policy.pdf",
                PageRef::Number(3),
                "Knee surgery is covered after 90 days",
            ),
            Chunk::new(
                "c2",
                "policy.pdf",
                PageRef::Number(7),
                "Cosmetic procedures are excluded",
            ),
            Chunk::new(
                "c3",
                "policy.pdf",
                PageRef::Number(9),
                "Claims must be filed within 30 days",
            ),
        ]
    }

    #[tokio::test]
    async fn test_empty_corpus_returns_empty() {
        let search = SemanticSearch::from_chunks(provider(), Vec::new()).await.unwrap();
        assert!(search.is_empty());
        assert!(search.search("knee surgery", DEFAULT_TOP_K).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_ranks_and_bounds() {
        let search = SemanticSearch::from_chunks(provider(), chunks()).await.unwrap();

        let results = search.search("knee surgery covered", 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.chunk_id, "c1");
        assert!(results[0].distance <= results[1].distance);

        assert_eq!(search.search("anything", 10).await.unwrap().len(), 3);
        assert!(search.search("anything", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_from_embedder_requires_index() {
        let embedder = Arc::new(Embedder::new(provider()));
        assert!(matches!(
            SemanticSearch::from_embedder(embedder.clone()),
            Err(Error::NotIndexed)
        ));

        embedder.index_corpus(chunks()).await.unwrap();
        let search = SemanticSearch::from_embedder(embedder).unwrap();
        assert_eq!(search.len(), 3);
    }

    #[tokio::test]
    async fn test_csv_and_snapshot_sources_agree() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("corpus.csv");
        let mut file = std::fs::File::create(&csv_path).unwrap();
        writeln!(file, "chunk_id,source_doc,page,text").unwrap();
        for chunk in chunks() {
            writeln!(file, "{},{},{},{}", chunk.chunk_id, chunk.source_doc, chunk.page, chunk.text)
                .unwrap();
        }
        drop(file);

        let from_csv = SemanticSearch::open(provider(), &CorpusSource::Csv(csv_path))
            .await
            .unwrap();
        let snapshot_path = dir.path().join("index.json");
        let current = from_csv.embedder().snapshot().unwrap();
        snapshot::save(&current, &snapshot_path).unwrap();

        let from_snapshot =
            SemanticSearch::open(provider(), &CorpusSource::Snapshot(snapshot_path.clone()))
                .await
                .unwrap();

        let a = from_csv.search("filing deadline for claims", 3).await.unwrap();
        let b = from_snapshot.search("filing deadline for claims", 3).await.unwrap();
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.chunk, y.chunk);
            assert_eq!(x.distance, y.distance);
        }

        // A different model cannot adopt the snapshot
        let other: Arc<dyn EmbeddingProvider> = Arc::new(HashingEmbedder::new(64));
        assert!(SemanticSearch::from_snapshot(other, &snapshot_path).is_err());
    }

    #[tokio::test]
    async fn test_failed_reindex_keeps_serving() {
        let search = SemanticSearch::from_chunks(provider(), chunks()).await.unwrap();
        let missing = CorpusSource::Csv("/nonexistent/corpus.csv".into());

        assert!(search.reindex(&missing).await.is_err());
        assert_eq!(search.len(), 3);
        assert_eq!(search.search("cosmetic", 1).await.unwrap()[0].chunk.chunk_id, "c2");
    }
}
