use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Gateway Router Module
///
/// Endpoints answered by the gateway itself rather than forwarded to the page layer.
/// They sit outside every access list, so the guard lets them through and only
/// attaches the visitor's credential when one is live.
pub fn gateway_routes() -> Router<AppState> {
    Router::new()
        // GET /gateway/health
        // Liveness endpoint for load balancers and uptime checks.
        .route("/gateway/health", get(handlers::health))
        // GET /gateway/session
        // The visitor's resolved session, for rendering sign-in state in the UI.
        .route("/gateway/session", get(handlers::get_session))
}
