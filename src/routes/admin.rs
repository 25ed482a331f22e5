use crate::{AppState, handlers};
use axum::{Router, routing::post};

/// Admin Router Module
///
/// Endpoints reserved for admins. Nested under `/admin`; the role check
/// happens inside each handler after `ActivePrincipal` has resolved the
/// session.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // POST /admin/permissions/invalidate
        // Called after an admin edits a sub-admin's grants so the active
        // snapshot is reloaded.
        .route(
            "/permissions/invalidate",
            post(handlers::invalidate_permissions),
        )
}
