//! API routes for the claim server

pub mod run;

use axum::{middleware, routing::post, Router};

use crate::server::{auth, state::AppState};

/// Routes that require a bearer token
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/hackrx/run", post(run::run_query))
        .route_layer(middleware::from_fn_with_state(state, auth::require_bearer))
}
