//! HTTP server for claim decisions

pub mod auth;
pub mod routes;
pub mod state;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::ClaimConfig;
use crate::error::{Error, Result};
use state::AppState;

/// Claim decision HTTP server
pub struct ClaimServer {
    config: ClaimConfig,
    state: AppState,
}

impl ClaimServer {
    /// Create a new server, indexing the configured corpus
    pub async fn new(config: ClaimConfig) -> Result<Self> {
        let state = AppState::new(config.clone()).await?;
        Ok(Self { config, state })
    }

    /// Start the server; returns after Ctrl+C
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self
            .address()
            .parse()
            .map_err(|e| Error::config(format!("Invalid address: {}", e)))?;

        let router = router(self.state.clone());

        tracing::info!("Starting claim server on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::config(format!("Failed to bind: {}", e)))?;

        axum::serve(listener, router)
            .with_graceful_shutdown(drain_on(self.state, shutdown_signal()))
            .await
            .map_err(|e| Error::internal(format!("Server error: {}", e)))?;

        tracing::info!("Server stopped");
        Ok(())
    }

    /// Get the server address
    pub fn address(&self) -> String {
        self.config.address()
    }
}

/// Build the router with all routes
pub fn router(state: AppState) -> Router {
    let enable_cors = state.config().server.enable_cors;

    let router = Router::new()
        // GET also answers HEAD
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/ready", get(readiness))
        .merge(routes::api_routes(state.clone()))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new());

    if enable_cors {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    }
}

/// Service status
async fn root() -> Json<Value> {
    Json(json!({ "status": "Claim decision API running" }))
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Readiness check endpoint
async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// Wait for `signal`, then report not-ready while in-flight requests drain
async fn drain_on<F>(state: AppState, signal: F)
where
    F: std::future::Future<Output = ()>,
{
    signal.await;
    state.set_ready(false);
    tracing::info!("Draining in-flight requests");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::embeddings::HashingEmbedder;
    use crate::generation::{DecisionGenerator, LlmProvider};
    use crate::retrieval::SemanticSearch;

    struct SilentLlm;

    #[async_trait]
    impl LlmProvider for SilentLlm {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            Ok("{}".to_string())
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "silent"
        }

        fn model(&self) -> &str {
            "silent"
        }
    }

    async fn ready_status(state: &AppState) -> StatusCode {
        router(state.clone())
            .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_shutdown_signal_marks_not_ready() {
        let search = SemanticSearch::from_chunks(Arc::new(HashingEmbedder::new(16)), Vec::new())
            .await
            .unwrap();
        let state = AppState::from_parts(
            ClaimConfig::default(),
            search,
            DecisionGenerator::new(Arc::new(SilentLlm)),
        );
        assert_eq!(ready_status(&state).await, StatusCode::OK);

        drain_on(state.clone(), async {}).await;

        assert!(!state.is_ready());
        assert_eq!(ready_status(&state).await, StatusCode::SERVICE_UNAVAILABLE);
    }
}
