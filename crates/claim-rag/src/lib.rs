//! claim-rag: Retrieval-augmented insurance claim decisions
//!
//! Policy clauses are embedded into an exact L2 vector index. A claim query
//! retrieves the nearest clauses, a language model reads them, and its reply
//! is parsed strictly into an approve/reject decision with clause-level
//! justification. The pipeline is exposed as a library and over HTTP.

pub mod config;
pub mod embeddings;
pub mod error;
pub mod generation;
pub mod index;
pub mod ingestion;
pub mod retrieval;
pub mod server;
pub mod types;

pub use config::ClaimConfig;
pub use embeddings::{Embedder, EmbeddingProvider};
pub use error::{Error, Result};
pub use generation::{DecisionGenerator, LlmProvider};
pub use index::{CorpusIndex, FlatL2Index};
pub use retrieval::{CorpusSource, SearchResult, SemanticSearch};
pub use types::{Amount, Chunk, Decision, JustificationItem, PageRef, QueryRequest, Verdict};
