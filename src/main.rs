use marketplace_gate::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    upstream::{HttpUpstream, UpstreamState},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, initializes logging, builds the upstream client and serves the
/// gateway.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load().expect("FATAL: invalid gateway configuration");

    // 2. Logging Filter Setup
    // RUST_LOG wins; otherwise verbose gateway logs and request summaries.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "marketplace_gate=debug,tower_http=info".into());

    // 3. Pretty logs locally, JSON for log aggregation in production.
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

    tracing::info!("Gateway starting in {:?} mode", config.env);

    // 4. Upstream (page layer) client
    let upstream = HttpUpstream::new(&config.upstream_url, config.upstream_timeout)
        .expect("FATAL: failed to build the upstream HTTP client");
    tracing::info!(upstream = upstream.base_url(), "Forwarding allowed requests upstream");
    let upstream = Arc::new(upstream) as UpstreamState;

    // 5. State, Router and Server Startup
    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(config, upstream).expect("FATAL: invalid token verification key");

    if state.validator.verifies_signatures() {
        tracing::info!(
            algorithms = ?state.validator.algorithms(),
            "Verifying access token signatures"
        );
    } else {
        tracing::warn!(
            "No AUTH_JWT_SECRET or AUTH_JWT_PUBLIC_KEY: access tokens are decoded WITHOUT \
             signature verification. Only run like this behind a hop that has already verified \
             the token."
        );
    }

    let app = create_router(state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: failed to bind the HTTP listener. Check BIND_ADDR.");

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at /gateway/docs");

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly");
}
