//! API Middleware
//!
//! Per-client rate limiting and the bearer token check for guarded routes.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;
use tracing::debug;

use super::handlers::AppState;
use crate::error::{ApiError, Result};

/// Admits or rejects a request based on the caller's IP address.
///
/// Clients are keyed by IP only, so reconnecting from a new port does not
/// reset the bucket.
pub async fn rate_limit(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Result<Response> {
    let Some(ConnectInfo(addr)) = connect_info else {
        return Err(ApiError::Internal(
            "peer address unavailable for rate limiting".to_string(),
        ));
    };

    let client = addr.ip().to_string();
    if !state.limiter.admit(&client).is_allowed() {
        debug!("Rate limit exceeded for {}", client);
        return Err(ApiError::RateLimited);
    }

    Ok(next.run(request).await)
}

/// Rejects the request unless it carries `Authorization: Bearer <token>`
/// matching the configured token. A server without a token lets everything
/// through.
pub async fn require_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response> {
    if let Some(expected) = state.auth_token.as_deref() {
        let presented = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));

        if !presented.is_some_and(|token| token_matches(token, expected)) {
            return Err(ApiError::Unauthorized);
        }
    }

    Ok(next.run(request).await)
}

/// Compares tokens without an early exit on the first differing byte.
fn token_matches(presented: &str, expected: &str) -> bool {
    presented.as_bytes().ct_eq(expected.as_bytes()).into()
}
