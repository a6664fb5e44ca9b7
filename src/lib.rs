use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRef},
    http::HeaderName,
    middleware,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core gateway components.
pub mod auth;
pub mod config;
pub mod error;
pub mod guard;
pub mod handlers;
pub mod models;
pub mod upstream;

// Route classification lists (Public, Guest-only, Member-only, Admin) and gateway endpoints.
pub mod routes;
use error::ConfigError;
use routes::{RouteTable, gateway};

// --- Public Re-exports ---

pub use auth::TokenValidator;
pub use config::AppConfig;
pub use guard::{AccessDecision, access_guard, decide, evaluate};
pub use routes::{MARKETPLACE_ROUTES, RouteCategory};
pub use upstream::{HttpUpstream, MockUpstream, UpstreamState};

/// ApiDoc
///
/// OpenAPI document for the endpoints the gateway answers itself. Served at
/// `/gateway/openapi.json` with Swagger UI at `/gateway/docs`.
#[derive(OpenApi)]
#[openapi(
    paths(handlers::health, handlers::get_session),
    components(schemas(models::SessionInfo, models::HealthResponse, auth::Role)),
    tags(
        (name = "marketplace-gate", description = "Marketplace access gateway")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared, immutable state handed to the guard and every handler.
#[derive(Clone)]
pub struct AppState {
    /// Configuration: The loaded, immutable environment configuration.
    pub config: AppConfig,
    /// The static route layout the guard classifies against.
    pub routes: RouteTable,
    /// Access token decoding and expiry checks.
    pub validator: TokenValidator,
    /// The page layer allowed requests are forwarded to.
    pub upstream: UpstreamState,
}

impl AppState {
    /// Builds the state for the marketplace route layout. Signatures are verified against
    /// the configured secret or public key; with neither, tokens are decoded only.
    pub fn new(config: AppConfig, upstream: UpstreamState) -> Result<Self, ConfigError> {
        let validator = match (config.jwt_secret.as_deref(), config.jwt_public_key.as_deref()) {
            (Some(secret), _) => TokenValidator::with_secret(secret),
            (None, Some(pem)) => TokenValidator::with_public_key_pem(pem.as_bytes()).map_err(|e| {
                ConfigError::Invalid {
                    name: "AUTH_JWT_PUBLIC_KEY",
                    value: "<pem>".to_string(),
                    reason: format!("not an RSA or EC public key: {e}"),
                }
            })?,
            (None, None) => TokenValidator::decode_only(),
        };

        Ok(Self {
            config,
            routes: MARKETPLACE_ROUTES,
            validator,
            upstream,
        })
    }

    /// State backed by a `MockUpstream`, for tests and local experiments.
    pub fn with_mock_upstream(config: AppConfig) -> Result<(Self, Arc<MockUpstream>), ConfigError> {
        let mock = Arc::new(MockUpstream::new());
        Ok((Self::new(config, mock.clone())?, mock))
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for UpstreamState {
    fn from_ref(app_state: &AppState) -> UpstreamState {
        app_state.upstream.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the gateway: its own endpoints, the upstream fallback, the access guard
/// wrapped around both, and the observability layers outermost.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation: Serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/gateway/docs").url("/gateway/openapi.json", ApiDoc::openapi()))
        .merge(gateway::gateway_routes())
        // Every other path belongs to the page layer.
        .fallback(handlers::forward_to_upstream)
        .layer(DefaultBodyLimit::max(upstream::MAX_FORWARD_BODY_BYTES))
        // The guard wraps all routes above, including the fallback.
        .layer(middleware::from_fn_with_state(state.clone(), access_guard))
        .with_state(state);

    // 3. Observability and Correlation Layers (Applied outermost/first)
    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for `TraceLayer` carrying method, URI and the `x-request-id` set above, so
/// every log line for one request (guard redirects included) is correlated.
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
