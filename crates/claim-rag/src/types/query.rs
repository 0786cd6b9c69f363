//! Query request types

use serde::{Deserialize, Serialize};

/// Claim query accepted by the run endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Natural-language claim description
    pub query: String,

    /// Number of clauses to retrieve (defaults to the configured value)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<usize>,
}
