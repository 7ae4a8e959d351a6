//! API Routes
//!
//! Configures the Axum router with all note server endpoints.

use std::time::Duration;

use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware,
    routing::get,
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::warn;

use super::handlers::{
    create_note, delete_note, get_note, health_handler, list_notes, peek_note, pop_note,
    stats_handler, update_note, AppState,
};
use super::middleware::{rate_limit, require_auth};

/// Upper bound on the time spent serving one request
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /note/` - List notes
/// - `POST /note/` - Create a note
/// - `GET /note/:uid` - Fetch a note (token required)
/// - `PATCH /note/:uid` - Replace a note's text
/// - `DELETE /note/:uid` - Delete a note (token required)
/// - `DELETE /note/api/` - Pop a note by id from the body
/// - `GET /note/api/?id=` - Check whether a note exists
/// - `GET /stats` - Store and limiter counters
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - Rate limiting on every `/note` route, keyed by peer IP
/// - CORS restricted to the configured origins
/// - Request timeout and tracing
///
/// Peer addresses come from `ConnectInfo`, so serve the router with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn create_router(state: AppState) -> Router {
    let auth = middleware::from_fn_with_state(state.clone(), require_auth);

    let note_routes = Router::new()
        .route("/note/", get(list_notes).post(create_note))
        .route(
            "/note/:uid",
            // PATCH is added after the layer so only GET and DELETE need a token.
            get(get_note)
                .delete(delete_note)
                .route_layer(auth)
                .patch(update_note),
        )
        .route("/note/api/", get(peek_note).delete(pop_note))
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit));

    Router::new()
        .merge(note_routes)
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors_layer(&state.allowed_origins))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([
            header::ORIGIN,
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::AUTHORIZATION,
            HeaderName::from_static("x-requested-with"),
        ])
        .allow_credentials(true)
}
