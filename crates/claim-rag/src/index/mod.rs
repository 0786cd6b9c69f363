//! Vector index and the row-aligned corpus snapshot built on it

pub mod flat;

pub use flat::{FlatL2Index, Neighbor};

use chrono::{DateTime, Utc};
use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::types::Chunk;

/// Immutable snapshot of an indexed corpus.
///
/// Row `i` of `index` was embedded from `chunks[i]`. Both sides only ever grow
/// together, through [`CorpusIndex::build`] and [`CorpusIndex::appended`].
#[derive(Debug, Clone)]
pub struct CorpusIndex {
    index: FlatL2Index,
    chunks: Vec<Chunk>,
    model: String,
    built_at: DateTime<Utc>,
}

impl CorpusIndex {
    /// Build a snapshot from chunks and their vectors, in corpus order
    pub fn build(
        model: impl Into<String>,
        dimensions: usize,
        chunks: Vec<Chunk>,
        vectors: &[Vec<f32>],
    ) -> Result<Self> {
        Self::from_parts(model, dimensions, chunks, vectors, Utc::now())
    }

    /// Rebuild a snapshot from persisted parts
    pub fn from_parts(
        model: impl Into<String>,
        dimensions: usize,
        chunks: Vec<Chunk>,
        vectors: &[Vec<f32>],
        built_at: DateTime<Utc>,
    ) -> Result<Self> {
        if chunks.is_empty() {
            return Err(Error::EmptyCorpus);
        }
        check_aligned(chunks.len(), vectors.len())?;
        check_unique(&[], &chunks)?;

        let mut index = FlatL2Index::new(dimensions);
        index.build(vectors)?;

        Ok(Self {
            index,
            chunks,
            model: model.into(),
            built_at,
        })
    }

    /// A new snapshot with `chunks` appended; `self` is left untouched
    pub fn appended(&self, chunks: Vec<Chunk>, vectors: &[Vec<f32>]) -> Result<Self> {
        check_aligned(chunks.len(), vectors.len())?;
        check_unique(&self.chunks, &chunks)?;

        let mut next = self.clone();
        next.index.insert(vectors)?;
        next.chunks.extend(chunks);
        next.built_at = Utc::now();
        Ok(next)
    }

    /// Nearest chunks to an already embedded query
    pub fn nearest(&self, query: &[f32], k: usize) -> Result<Vec<(&Chunk, f32)>> {
        let neighbors = self.index.query(query, k)?;
        neighbors
            .into_iter()
            .map(|n| {
                self.chunks
                    .get(n.row)
                    .map(|chunk| (chunk, n.distance))
                    .ok_or_else(|| {
                        Error::internal(format!("Index row {} has no chunk metadata", n.row))
                    })
            })
            .collect()
    }

    /// Embedding model that produced the vectors
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Embedding dimensions
    pub fn dimensions(&self) -> usize {
        self.index.dimensions()
    }

    /// Indexed chunks in row order
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Vectors in row order
    pub fn vectors(&self) -> Vec<Vec<f32>> {
        self.index.to_rows()
    }

    /// When this snapshot was built
    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    /// Number of indexed chunks
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

fn check_aligned(chunks: usize, vectors: usize) -> Result<()> {
    if chunks != vectors {
        return Err(Error::internal(format!(
            "{} chunks but {} vectors",
            chunks, vectors
        )));
    }
    Ok(())
}

/// Chunk ids must be unique across the existing rows and the incoming ones
fn check_unique(existing: &[Chunk], incoming: &[Chunk]) -> Result<()> {
    let mut seen: HashSet<&str> = existing.iter().map(|c| c.chunk_id.as_str()).collect();
    for chunk in incoming {
        if !seen.insert(&chunk.chunk_id) {
            return Err(Error::corpus("index", format!("Duplicate chunk_id '{}'", chunk.chunk_id)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PageRef;

    fn chunk(id: &str) -> Chunk {
        Chunk::new(id, "policy.pdf", PageRef::Number(1), format!("text {}", id))
    }

    #[test]
    fn test_rows_stay_aligned_across_appends() {
        let base = CorpusIndex::build("m", 1, vec![chunk("a")], &[vec![0.0]]).unwrap();
        let next = base
            .appended(vec![chunk("b"), chunk("c")], &[vec![10.0], vec![20.0]])
            .unwrap();
        let last = next.appended(vec![chunk("d")], &[vec![30.0]]).unwrap();

        for (x, id) in [(0.0, "a"), (10.0, "b"), (20.0, "c"), (30.0, "d")] {
            let hits = last.nearest(&[x], 1).unwrap();
            assert_eq!(hits[0].0.chunk_id, id);
        }

        // Earlier snapshots are unchanged
        assert_eq!(base.len(), 1);
        assert_eq!(next.len(), 3);
    }

    #[test]
    fn test_misaligned_input_rejected() {
        let err = CorpusIndex::build("m", 1, vec![chunk("a")], &[vec![0.0], vec![1.0]]);
        assert!(err.is_err());

        let base = CorpusIndex::build("m", 1, vec![chunk("a")], &[vec![0.0]]).unwrap();
        assert!(base.appended(vec![chunk("b")], &[]).is_err());
        assert!(base.appended(vec![chunk("b")], &[vec![1.0, 2.0]]).is_err());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let dupes = CorpusIndex::build(
            "m",
            1,
            vec![chunk("a"), chunk("a")],
            &[vec![0.0], vec![1.0]],
        );
        assert!(matches!(dupes, Err(Error::Corpus { .. })));

        let base = CorpusIndex::build("m", 1, vec![chunk("a")], &[vec![0.0]]).unwrap();
        let clash = base.appended(vec![chunk("a")], &[vec![1.0]]);
        assert!(matches!(clash, Err(Error::Corpus { ref message, .. }) if message.contains("'a'")));

        let within = base.appended(vec![chunk("b"), chunk("b")], &[vec![1.0], vec![2.0]]);
        assert!(matches!(within, Err(Error::Corpus { .. })));

        assert_eq!(base.len(), 1);
        assert_eq!(base.nearest(&[1.0], 5).unwrap().len(), 1);
    }

    #[test]
    fn test_empty_corpus_rejected() {
        assert!(matches!(
            CorpusIndex::build("m", 1, Vec::new(), &[]),
            Err(Error::EmptyCorpus)
        ));
    }
}
