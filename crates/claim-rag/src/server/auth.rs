//! Bearer token check for protected routes

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::error::{Error, Result};
use crate::server::state::AppState;

/// Token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();

    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Reject requests whose bearer token does not match the configured API key
pub async fn require_bearer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response> {
    let token = bearer_token(request.headers());
    let authorized = matches!(
        (token, state.config().auth.api_key.as_deref()),
        (Some(token), Some(key)) if token == key
    );

    if !authorized {
        tracing::warn!(
            path = %request.uri().path(),
            token_present = token.is_some(),
            "Authorization failed"
        );
        return Err(Error::Unauthorized);
    }

    Ok(next.run(request).await)
}
