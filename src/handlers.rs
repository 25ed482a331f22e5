use crate::{
    AppState,
    auth::{ActivePrincipal, verify_session_token},
    models::{
        CreateSessionRequest, GateDecision, NavigateQuery, Navigation, PermissionsSnapshot, Principal,
    },
    permissions::Signal,
    route::RoutePath,
};
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};

// --- Session Handlers ---

/// create_session
///
/// [Public Route] Establishes the console session from a token produced by
/// the login flow.
///
/// *Ordering*: the permissions store is signalled before the response is
/// sent, so every navigation that follows sees the snapshot as loading
/// rather than the previous (empty) grants.
#[utoipa::path(
    post,
    path = "/session",
    request_body = CreateSessionRequest,
    responses(
        (status = 200, description = "Session established", body = Principal),
        (status = 401, description = "Token invalid or expired")
    )
)]
pub async fn create_session(
    State(state): State<AppState>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<Json<Principal>, StatusCode> {
    let verified = verify_session_token(
        &payload.token,
        &state.config.jwt_secret,
        state.gatekeeper.registry(),
    )
    .map_err(|e| {
        tracing::warn!(error = %e, "rejected session token");
        StatusCode::UNAUTHORIZED
    })?;

    let principal = verified.principal;
    state
        .sessions
        .establish(payload.token, principal.clone(), verified.expires_at);
    state.permissions.notify(Signal::SessionEstablished);

    Ok(Json(principal))
}

/// get_me
///
/// [Authenticated Route] Returns the signed-in principal.
#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "Current principal", body = Principal),
        (status = 401, description = "No session")
    )
)]
pub async fn get_me(ActivePrincipal(principal): ActivePrincipal) -> Json<Principal> {
    Json(principal)
}

/// logout
///
/// [Authenticated Route] Ends the session. The snapshot is emptied before
/// the response is sent; any permissions fetch still in flight is discarded.
#[utoipa::path(
    post,
    path = "/logout",
    responses((status = 204, description = "Logged out"))
)]
pub async fn logout(State(state): State<AppState>) -> StatusCode {
    state.sessions.clear();
    state.permissions.notify(Signal::SessionEnded);
    StatusCode::NO_CONTENT
}

// --- Navigation ---

/// navigate
///
/// [Public Route] Runs the gate for the requested console path and returns
/// what the frontend should do: render, redirect, or keep waiting.
///
/// Public pages (login, password recovery) go through the public gate;
/// every other path goes through the protected gate.
#[utoipa::path(
    get,
    path = "/navigate",
    params(NavigateQuery),
    responses(
        (status = 200, description = "Gate decision", body = GateDecision),
        (status = 400, description = "Path is empty")
    )
)]
pub async fn navigate(
    State(state): State<AppState>,
    Query(query): Query<NavigateQuery>,
) -> Result<Json<GateDecision>, StatusCode> {
    let path = RoutePath::parse(&query.path).map_err(|_| StatusCode::BAD_REQUEST)?;
    let mut navigation = Navigation::to(path);
    if let Some(from) = query.from.as_deref().and_then(|raw| RoutePath::parse(raw).ok()) {
        navigation = navigation.with_from(from);
    }

    let decision = state.gatekeeper.navigate(&navigation).await;
    tracing::debug!(path = %navigation.path, ?decision, "navigation decided");
    Ok(Json(decision))
}

// --- Permissions ---

/// get_permissions
///
/// [Authenticated Route] Returns the current permissions snapshot as-is,
/// including while it is loading.
#[utoipa::path(
    get,
    path = "/permissions",
    responses((status = 200, description = "Current snapshot", body = PermissionsSnapshot))
)]
pub async fn get_permissions(
    _principal: ActivePrincipal,
    State(state): State<AppState>,
) -> Json<PermissionsSnapshot> {
    Json(state.permissions.snapshot())
}

/// refresh_permissions
///
/// [Authenticated Route] Reloads grants and returns the settled snapshot.
#[utoipa::path(
    post,
    path = "/permissions/refresh",
    responses((status = 200, description = "Refreshed snapshot", body = PermissionsSnapshot))
)]
pub async fn refresh_permissions(
    _principal: ActivePrincipal,
    State(state): State<AppState>,
) -> Json<PermissionsSnapshot> {
    Json(state.permissions.refresh().await)
}

/// invalidate_permissions
///
/// [Admin Route] Signals that grants changed (e.g. after editing a
/// sub-admin). The reload happens in the background.
///
/// *Authorization*: explicitly checks that the principal is an admin.
#[utoipa::path(
    post,
    path = "/admin/permissions/invalidate",
    responses(
        (status = 202, description = "Reload queued"),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn invalidate_permissions(
    ActivePrincipal(principal): ActivePrincipal,
    State(state): State<AppState>,
) -> StatusCode {
    if !principal.is_admin() {
        return StatusCode::FORBIDDEN;
    }
    state.permissions.notify(Signal::PermissionsInvalidated);
    StatusCode::ACCEPTED
}
