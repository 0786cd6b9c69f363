//! Corpus sources and semantic search

pub mod search;

pub use search::{SearchResult, SemanticSearch, DEFAULT_TOP_K};

use std::fmt;
use std::path::PathBuf;

/// Where the policy corpus comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorpusSource {
    /// CSV table embedded at startup
    Csv(PathBuf),
    /// Snapshot file written by the indexer
    Snapshot(PathBuf),
    /// Snapshot downloaded once at startup
    SnapshotUrl(String),
}

impl fmt::Display for CorpusSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Csv(path) => write!(f, "csv:{}", path.display()),
            Self::Snapshot(path) => write!(f, "snapshot:{}", path.display()),
            Self::SnapshotUrl(url) => write!(f, "snapshot-url:{}", url),
        }
    }
}
