use console_gate::{
    AppState, HttpProfileClient, ProfileState, TracingNotifier,
    config::{AppConfig, Env},
    create_router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Entry point: configuration, logging, the profile client, the permissions
/// worker and the HTTP server.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast in production).
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging. RUST_LOG wins over the defaults.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "console_gate=debug,tower_http=info".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Console gate starting in {:?} mode", config.env);

    // 3. Profile-fetch collaborator.
    let profile = HttpProfileClient::new(
        &config.api_base_url,
        &config.profile_path,
        config.profile_timeout,
    )
    .expect("FATAL: Failed to build the profile HTTP client.");
    tracing::info!(url = %profile.url(), "profile endpoint configured");
    let profile = Arc::new(profile) as ProfileState;

    // 4. Shared state (starts the permissions worker).
    let bind_addr = config.bind_addr.clone();
    let app_state = AppState::new(config, profile, Arc::new(TracingNotifier));

    // 5. Router and server.
    let app = create_router(app_state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("FATAL: Failed to bind {bind_addr}: {e}"));

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at: http://{}/swagger-ui", bind_addr);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "server stopped with an error");
    }
}
