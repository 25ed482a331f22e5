use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Route-authorization core.
pub mod guards;
pub mod permissions;
pub mod policy;
pub mod route;

// Collaborators and shared types.
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod notice;
pub mod profile;
pub mod session;

// HTTP surface.
pub mod handlers;
pub mod routes;
use auth::ActivePrincipal;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use guards::Gatekeeper;
pub use notice::{NotifierState, RecordingNotifier, TracingNotifier};
pub use permissions::{PermissionsStore, Signal};
pub use policy::{Decision, FallbackResolver, authorize};
pub use profile::{HttpProfileClient, MockProfileClient, ProfileState};
pub use session::{InMemorySessionStore, SessionState, SessionStore};

/// ApiDoc
///
/// OpenAPI document for the console gate, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::create_session, handlers::get_me, handlers::logout, handlers::navigate,
        handlers::get_permissions, handlers::refresh_permissions, handlers::invalidate_permissions
    ),
    components(
        schemas(
            models::Principal, models::Role, models::PermissionsSnapshot, models::Navigation,
            models::GateDecision, models::Notice, models::NoticeKind, models::CreateSessionRequest,
            route::RouteClass,
        )
    ),
    tags(
        (name = "console-gate", description = "Admin console route authorization API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Single shared container for the services every request needs. Cloning is
/// cheap: everything inside is reference counted.
#[derive(Clone)]
pub struct AppState {
    /// Session holder. Written by login/logout, read by gates.
    pub sessions: Arc<InMemorySessionStore>,
    /// Sole writer of the permissions snapshot.
    pub permissions: Arc<PermissionsStore>,
    /// Builds the protected/public gates for each navigation.
    pub gatekeeper: Gatekeeper,
    /// The loaded, immutable configuration.
    pub config: AppConfig,
}

impl AppState {
    /// new
    ///
    /// Wires the session store, permissions store and gates from the config.
    /// Must be called inside a Tokio runtime: it starts the permissions
    /// worker.
    pub fn new(config: AppConfig, profile: ProfileState, notifier: NotifierState) -> Self {
        // 1. Known console routes (fixed roots, plus any extra fallback entries).
        let registry = route::RouteRegistry::for_console(&config.fallback_priority);

        // 2. Session holder and the permissions store reading from it.
        let sessions = Arc::new(InMemorySessionStore::new());
        let session_state: SessionState = sessions.clone();
        let permissions = PermissionsStore::spawn(session_state.clone(), profile, registry.clone());

        // 3. Gates.
        let gatekeeper = Gatekeeper::new(
            session_state,
            permissions.clone(),
            FallbackResolver::new(config.fallback_priority.clone()),
            registry,
            notifier,
        )
        .with_login_path(config.login_path.clone())
        .with_permissions_wait(config.permissions_wait);

        Self {
            sessions,
            permissions,
            gatekeeper,
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for SessionState {
    fn from_ref(app_state: &AppState) -> SessionState {
        app_state.sessions.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// session_middleware
///
/// Rejects requests to the authenticated routes with 401 unless a live
/// session exists; the `ActivePrincipal` extractor does the check.
async fn session_middleware(_principal: ActivePrincipal, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the routes, applies scoped and global middleware and registers
/// the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header used to correlate every log line of one request.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation: Swagger UI plus the raw OpenAPI document.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public Routes: health, session creation and the navigation gate.
        .merge(public::public_routes())
        // Authenticated Routes: rejected with 401 unless a session is live.
        .merge(
            authenticated::authenticated_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), session_middleware)),
        )
        // Admin Routes: role checks happen in the handlers; the extractor there
        // still rejects requests without a session.
        .nest("/admin", admin::admin_routes())
        .with_state(state);

    // 3. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID Generation
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request Tracing, tagged with the request ID via `trace_span_logger`.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID Propagation back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer (outermost)
        .layer(cors)
}

/// trace_span_logger
///
/// Span for each HTTP request, tagged with the `x-request-id` set above so
/// every log line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
