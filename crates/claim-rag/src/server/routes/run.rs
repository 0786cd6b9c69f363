//! Claim decision endpoint

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{Decision, QueryRequest};

/// POST /hackrx/run - Retrieve relevant clauses and decide on a claim
pub async fn run_query(
    State(state): State<AppState>,
    payload: std::result::Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<Decision>> {
    let Json(request) = payload.map_err(|e| Error::InvalidRequest(e.body_text()))?;

    let query = request.query.trim();
    if query.is_empty() {
        return Err(Error::InvalidRequest("query must not be empty".to_string()));
    }
    let top_k = request.top_k.unwrap_or(state.config().corpus.top_k);
    if top_k == 0 {
        return Err(Error::InvalidRequest("top_k must be at least 1".to_string()));
    }

    let start = Instant::now();
    tracing::debug!(query = %query, top_k, "Claim query");

    let deadline = Duration::from_secs(state.config().server.request_timeout_secs);
    let decision = tokio::time::timeout(deadline, decide(&state, query, top_k))
        .await
        .map_err(|_| Error::Timeout(deadline))??;

    tracing::info!(
        decision = %decision.decision,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Claim decided"
    );

    Ok(Json(decision))
}

async fn decide(state: &AppState, query: &str, top_k: usize) -> Result<Decision> {
    let results = state.search().search(query, top_k).await?;
    if results.is_empty() {
        return Err(Error::NoRelevantClauses);
    }

    let context: Vec<String> = results.into_iter().map(|r| r.chunk.text).collect();
    state.generator().generate(query, &context).await
}
