use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Authenticated Router Module
///
/// Endpoints for the signed-in principal. The router above wraps this module
/// in a middleware that rejects requests without a live session (401).
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        // The cached principal record.
        .route("/me", get(handlers::get_me))
        // POST /logout
        // Ends the session and empties the permissions snapshot.
        .route("/logout", post(handlers::logout))
        // GET /permissions
        // Current snapshot, loading flag included.
        .route("/permissions", get(handlers::get_permissions))
        // POST /permissions/refresh
        // Reloads grants and waits for the result.
        .route("/permissions/refresh", post(handlers::refresh_permissions))
}
