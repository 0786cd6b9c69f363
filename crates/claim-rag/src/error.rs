//! Error types for the claim decision pipeline

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline errors
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid configuration (credentials, model, corpus)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A vector did not match the index dimensionality
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Vector index queried before any build
    #[error("Vector index has not been built")]
    NotBuilt,

    /// Embedder queried before a corpus was indexed
    #[error("Corpus has not been indexed")]
    NotIndexed,

    /// Attempt to index zero chunks
    #[error("Cannot index an empty corpus")]
    EmptyCorpus,

    /// Corpus table could not be read
    #[error("Failed to load corpus '{source_name}': {message}")]
    Corpus {
        source_name: String,
        message: String,
    },

    /// Embedding backend could not be loaded or reached
    #[error("Embedding model unavailable: {0}")]
    ModelUnavailable(String),

    /// Generation backend failed
    #[error("Generation service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Generation backend answered with something that is not a decision
    #[error("Malformed model output: {message}")]
    MalformedModelOutput { message: String, raw: String },

    /// Bearer token missing or wrong
    #[error("Unauthorized")]
    Unauthorized,

    /// Retrieval produced no clauses to decide on
    #[error("No relevant information found")]
    NoRelevantClauses,

    /// Request payload rejected before processing
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Request deadline elapsed
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a corpus loading error
    pub fn corpus(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Corpus {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create an embedding backend error
    pub fn model_unavailable(message: impl Into<String>) -> Self {
        Self::ModelUnavailable(message.into())
    }

    /// Create a generation backend error
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }

    /// Create a malformed output error, keeping the raw text for diagnostics
    pub fn malformed(message: impl Into<String>, raw: impl Into<String>) -> Self {
        Self::MalformedModelOutput {
            message: message.into(),
            raw: raw.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// HTTP status and stable error type string for this error
    pub fn status_and_type(&self) -> (StatusCode, &'static str) {
        match self {
            Error::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            Error::DimensionMismatch { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "dimension_mismatch")
            }
            Error::NotBuilt => (StatusCode::INTERNAL_SERVER_ERROR, "index_not_built"),
            Error::NotIndexed => (StatusCode::INTERNAL_SERVER_ERROR, "corpus_not_indexed"),
            Error::EmptyCorpus => (StatusCode::INTERNAL_SERVER_ERROR, "empty_corpus"),
            Error::Corpus { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "corpus_error"),
            Error::ModelUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "model_unavailable"),
            Error::ServiceUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable")
            }
            Error::MalformedModelOutput { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "malformed_model_output")
            }
            Error::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            Error::NoRelevantClauses => (StatusCode::NOT_FOUND, "not_found"),
            Error::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            Error::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
            Error::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error"),
            Error::Json(_) => (StatusCode::BAD_REQUEST, "json_error"),
            Error::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type) = self.status_and_type();

        // Raw model text stays in the logs only
        let message = match &self {
            Error::MalformedModelOutput { .. } => "Invalid response from LLM".to_string(),
            other => other.to_string(),
        };

        if status.is_server_error() {
            tracing::error!(error_type, "{}", self);
        } else {
            tracing::debug!(error_type, "{}", self);
        }

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}
