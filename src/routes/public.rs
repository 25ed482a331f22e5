use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a session.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for monitoring and load balancers.
        .route("/health", get(|| async { "ok" }))
        // POST /session
        // Exchanges a login token for a console session and kicks off the
        // permissions load.
        .route("/session", post(handlers::create_session))
        // GET /navigate?path=...&from=...
        // Gate decision for a console path. Must work without a session so
        // anonymous visitors get their login redirect.
        .route("/navigate", get(handlers::navigate))
}
