use async_trait::async_trait;
use axum::{
    body::Bytes,
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header},
};
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use crate::{
    auth::{AuthUser, Role},
    error::GatewayError,
};

/// Header carrying the authenticated account id to the page layer.
pub const X_USER_ID: HeaderName = HeaderName::from_static("x-user-id");
/// Header carrying the authenticated role to the page layer.
pub const X_USER_ROLE: HeaderName = HeaderName::from_static("x-user-role");

/// Largest request body the gateway buffers before forwarding.
pub const MAX_FORWARD_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Connection-scoped headers that must not travel across a proxy hop.
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// UpstreamRequest
///
/// A request the guard allowed, ready to be replayed against the page layer.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    /// Path plus query string, always starting with `/`.
    pub path_and_query: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// UpstreamResponse
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Upstream
///
/// Contract for the page layer behind the gateway. The real implementation talks HTTP;
/// tests swap in `MockUpstream`.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn forward(&self, request: UpstreamRequest) -> Result<UpstreamResponse, GatewayError>;
}

/// UpstreamState
///
/// The concrete type used to share the upstream across the application state.
pub type UpstreamState = Arc<dyn Upstream>;

/// forward_headers
///
/// Builds the header set sent upstream: hop-by-hop headers, `host` and `content-length`
/// are dropped, and the identity headers are replaced by the guard's verdict. A client
/// can never supply `x-user-id` or `x-user-role` itself.
pub fn forward_headers(incoming: &HeaderMap, identity: Option<&AuthUser>) -> HeaderMap {
    let mut headers = incoming.clone();
    strip_hop_by_hop(&mut headers);
    headers.remove(header::HOST);
    headers.remove(header::CONTENT_LENGTH);
    headers.remove(X_USER_ID);
    headers.remove(X_USER_ROLE);

    if let Some(user) = identity {
        match HeaderValue::from_str(&user.id) {
            Ok(value) => {
                headers.insert(X_USER_ID, value);
                headers.insert(X_USER_ROLE, HeaderValue::from_static(role_header(user.role)));
            }
            Err(_) => {
                tracing::warn!("subject claim is not a valid header value; forwarding anonymously")
            }
        }
    }
    headers
}

/// Removes headers that only describe the client's connection to the gateway.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP.iter() {
        headers.remove(name);
    }
}

fn role_header(role: Role) -> &'static str {
    match role {
        Role::User => "USER",
        Role::Admin => "ADMIN",
    }
}

/// HttpUpstream
///
/// Forwards requests to the page layer over HTTP with `reqwest`. Redirects issued by
/// the page layer are relayed to the client, never followed here.
#[derive(Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
    base_url: String,
}

impl HttpUpstream {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn forward(&self, request: UpstreamRequest) -> Result<UpstreamResponse, GatewayError> {
        let url = format!("{}{}", self.base_url, request.path_and_query);

        let response = self
            .client
            .request(request.method, url)
            .headers(request.headers)
            .body(request.body)
            .send()
            .await?;

        let status = response.status();
        let mut headers = response.headers().clone();
        strip_hop_by_hop(&mut headers);
        headers.remove(header::CONTENT_LENGTH);
        let body = response.bytes().await?;

        Ok(UpstreamResponse {
            status,
            headers,
            body,
        })
    }
}

/// MockUpstream
///
/// Records every forwarded request and answers `200 OK` with
/// `upstream:<METHOD> <path_and_query>` so tests can assert what got through.
#[derive(Default)]
pub struct MockUpstream {
    /// When true, every forward fails as if the page layer were down.
    pub should_fail: bool,
    received: Mutex<Vec<UpstreamRequest>>,
}

impl MockUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Requests seen so far, oldest first.
    pub fn received(&self) -> Vec<UpstreamRequest> {
        self.received
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl Upstream for MockUpstream {
    async fn forward(&self, request: UpstreamRequest) -> Result<UpstreamResponse, GatewayError> {
        if self.should_fail {
            return Err(GatewayError::Unavailable(
                "Mock Upstream Error: Simulation requested".to_string(),
            ));
        }

        let body = Bytes::from(format!("upstream:{} {}", request.method, request.path_and_query));
        self.received
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request);

        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        Ok(UpstreamResponse {
            status: StatusCode::OK,
            headers,
            body,
        })
    }
}
