use crate::{
    AppState,
    auth::AuthUser,
    error::GatewayError,
    models::{HealthResponse, SessionInfo},
    upstream::{UpstreamRequest, UpstreamState, forward_headers},
};
use axum::{
    Json,
    body::{Body, Bytes},
    extract::{State, rejection::BytesRejection},
    http::{HeaderMap, Method, Uri},
    response::Response,
};

// --- Handlers ---

/// health
///
/// Liveness check for load balancers. Also reports whether the gateway verifies token
/// signatures, so a misconfigured decode-only deployment is visible from outside.
#[utoipa::path(
    get,
    path = "/gateway/health",
    responses((status = 200, description = "Gateway is up", body = HealthResponse))
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        verifies_signatures: state.validator.verifies_signatures(),
    })
}

/// get_session
///
/// Reports the identity the access guard resolved from the visitor's cookie. Never
/// fails: a missing or expired token is reported as an anonymous session.
#[utoipa::path(
    get,
    path = "/gateway/session",
    responses((status = 200, description = "Current session", body = SessionInfo))
)]
pub async fn get_session(user: Option<AuthUser>) -> Json<SessionInfo> {
    Json(SessionInfo::from(user))
}

/// forward_to_upstream
///
/// Fallback for every path the gateway does not serve itself. The access guard has
/// already run; whatever reaches this handler is replayed against the page layer,
/// with the resolved identity attached as `x-user-id` / `x-user-role`.
///
/// Bodies over `MAX_FORWARD_BODY_BYTES` are refused with 413 before anything is sent.
pub async fn forward_to_upstream(
    State(upstream): State<UpstreamState>,
    user: Option<AuthUser>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, GatewayError> {
    let body = body?;
    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    tracing::debug!(
        %method,
        path = %path_and_query,
        authenticated = user.is_some(),
        "forwarding to upstream"
    );

    let forwarded = upstream
        .forward(UpstreamRequest {
            method,
            path_and_query,
            headers: forward_headers(&headers, user.as_ref()),
            body,
        })
        .await?;

    let mut response = Response::new(Body::from(forwarded.body));
    *response.status_mut() = forwarded.status;
    *response.headers_mut() = forwarded.headers;
    Ok(response)
}
