//! Persisted corpus index snapshots
//!
//! Written by `claim-rag-indexer`, read by the server at startup from a path
//! or a URL. The embedding model identity travels with the vectors so a
//! snapshot is never queried with a different model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};
use crate::index::CorpusIndex;
use crate::types::Chunk;

#[derive(Serialize, Deserialize)]
struct PersistedSnapshot {
    model: String,
    dimensions: usize,
    built_at: DateTime<Utc>,
    chunks: Vec<Chunk>,
    vectors: Vec<Vec<f32>>,
}

/// Write `corpus` to `path` as JSON
pub fn save(corpus: &CorpusIndex, path: &Path) -> Result<()> {
    let snapshot = PersistedSnapshot {
        model: corpus.model().to_string(),
        dimensions: corpus.dimensions(),
        built_at: corpus.built_at(),
        chunks: corpus.chunks().to_vec(),
        vectors: corpus.vectors(),
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let file = std::fs::File::create(path)?;
    serde_json::to_writer(std::io::BufWriter::new(file), &snapshot)?;

    tracing::info!(
        path = %path.display(),
        chunks = snapshot.chunks.len(),
        model = %snapshot.model,
        "Snapshot saved"
    );
    Ok(())
}

/// Read a snapshot from `path`
pub fn load(path: &Path) -> Result<CorpusIndex> {
    let bytes = std::fs::read(path).map_err(|e| {
        Error::config(format!("Cannot read snapshot '{}': {}", path.display(), e))
    })?;
    from_slice(&bytes, &path.display().to_string())
}

/// Download a snapshot from `url`
pub async fn fetch(url: &str) -> Result<CorpusIndex> {
    tracing::info!("Downloading snapshot from: {}", url);

    let response = reqwest::get(url)
        .await
        .map_err(|e| Error::config(format!("Failed to download snapshot: {}", e)))?;

    if !response.status().is_success() {
        return Err(Error::config(format!(
            "Snapshot download failed: HTTP {}",
            response.status()
        )));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| Error::config(format!("Failed to read snapshot body: {}", e)))?;

    from_slice(&bytes, url)
}

/// Decode a snapshot from JSON bytes
pub fn from_slice(bytes: &[u8], origin: &str) -> Result<CorpusIndex> {
    let snapshot: PersistedSnapshot = serde_json::from_slice(bytes)
        .map_err(|e| Error::config(format!("Invalid snapshot '{}': {}", origin, e)))?;

    CorpusIndex::from_parts(
        snapshot.model,
        snapshot.dimensions,
        snapshot.chunks,
        &snapshot.vectors,
        snapshot.built_at,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PageRef;

    fn corpus() -> CorpusIndex {
        let chunks = vec![
            Chunk::new("a", "policy.pdf", PageRef::Number(1), "first"),
            Chunk::new("b", "policy.pdf", PageRef::Locator("Annexure".into()), "second"),
        ];
        CorpusIndex::build("hashing-2", 2, chunks, &[vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap()
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("index.json");
        let original = corpus();

        save(&original, &path).unwrap();
        let loaded = load(&path).unwrap();

        assert_eq!(loaded.model(), "hashing-2");
        assert_eq!(loaded.dimensions(), 2);
        assert_eq!(loaded.chunks(), original.chunks());
        assert_eq!(loaded.built_at(), original.built_at());

        let hits = loaded.nearest(&[0.1, 0.9], 2).unwrap();
        assert_eq!(hits[0].0.chunk_id, "b");
        assert_eq!(hits[1].0.chunk_id, "a");
    }

    #[test]
    fn test_rejects_garbage_and_misalignment() {
        assert!(matches!(from_slice(b"not json", "x"), Err(Error::Config(_))));

        let misaligned = br#"{"model":"m","dimensions":1,"built_at":"2024-01-01T00:00:00Z",
            "chunks":[{"chunk_id":"a","source_doc":"d","page":1,"text":"t"}],
            "vectors":[[0.0],[1.0]]}"#;
        assert!(from_slice(misaligned, "x").is_err());

        let wrong_dims = br#"{"model":"m","dimensions":2,"built_at":"2024-01-01T00:00:00Z",
            "chunks":[{"chunk_id":"a","source_doc":"d","page":1,"text":"t"}],
            "vectors":[[0.0]]}"#;
        assert!(matches!(
            from_slice(wrong_dims, "x"),
            Err(Error::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        assert!(matches!(
            load(Path::new("/nonexistent/index.json")),
            Err(Error::Config(_))
        ));
    }
}
