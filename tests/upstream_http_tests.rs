use axum::{
    Router,
    body::{Body, to_bytes},
    extract::OriginalUri,
    http::{HeaderMap, Request, StatusCode, header},
    response::Redirect,
    routing::{get, post},
};
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use marketplace_gate::{
    AppConfig, AppState, HttpUpstream, create_router,
    upstream::{Upstream, UpstreamRequest, UpstreamState},
};
use serde_json::json;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::util::ServiceExt;

const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";

/// Stand-in for the page layer: echoes what it received.
async fn spawn_page_layer() -> String {
    let app = Router::new()
        .route(
            "/echo",
            post(|headers: HeaderMap, body: String| async move {
                let user = headers
                    .get("x-user-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("anonymous")
                    .to_string();
                format!("{user}|{body}")
            }),
        )
        .route(
            "/search",
            get(|OriginalUri(uri): OriginalUri| async move { uri.to_string() }),
        )
        .route("/moved", get(|| async { Redirect::permanent("/elsewhere") }))
        .route(
            "/missing",
            get(|| async { (StatusCode::NOT_FOUND, "no such page") }),
        )
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                "finally"
            }),
        );

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let address = format!("http://{}", listener.local_addr().unwrap());

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}

fn upstream_for(address: &str) -> HttpUpstream {
    HttpUpstream::new(address, Duration::from_secs(5)).unwrap()
}

fn get_request(path: &str) -> UpstreamRequest {
    UpstreamRequest {
        method: "GET".parse().unwrap(),
        path_and_query: path.to_string(),
        headers: HeaderMap::new(),
        body: Default::default(),
    }
}

#[tokio::test]
async fn test_query_string_reaches_page_layer() {
    let address = spawn_page_layer().await;

    let response = upstream_for(&address)
        .forward(get_request("/search?q=charcoal&page=3"))
        .await
        .unwrap();

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(&response.body[..], b"/search?q=charcoal&page=3");
}

#[tokio::test]
async fn test_redirects_are_relayed_not_followed() {
    let address = spawn_page_layer().await;

    let response = upstream_for(&address)
        .forward(get_request("/moved"))
        .await
        .unwrap();

    assert_eq!(response.status, StatusCode::PERMANENT_REDIRECT);
    assert_eq!(response.headers.get(header::LOCATION).unwrap(), "/elsewhere");
}

#[tokio::test]
async fn test_upstream_error_statuses_pass_through() {
    let address = spawn_page_layer().await;

    let response = upstream_for(&address)
        .forward(get_request("/missing"))
        .await
        .unwrap();

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(&response.body[..], b"no such page");
}

#[tokio::test]
async fn test_trailing_slash_in_base_url_is_ignored() {
    let address = spawn_page_layer().await;
    let upstream = upstream_for(&format!("{address}/"));

    assert_eq!(upstream.base_url(), address);
    let response = upstream.forward(get_request("/search")).await.unwrap();
    assert_eq!(&response.body[..], b"/search");
}

#[tokio::test]
async fn test_unreachable_page_layer_is_an_error() {
    // Bind and immediately drop to get a port nobody is listening on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let result = upstream_for(&address).forward(get_request("/")).await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_full_gateway_forwards_authenticated_post() {
    let address = spawn_page_layer().await;
    let mut config = AppConfig::default();
    config.jwt_secret = Some(TEST_JWT_SECRET.to_string());
    let state = AppState::new(config, Arc::new(upstream_for(&address)) as UpstreamState).unwrap();

    let now = Utc::now().timestamp();
    let claims = json!({ "sub": "artist-42", "role": "USER", "iat": now, "exp": now + 600 });
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .unwrap();

    let request = Request::builder()
        .method("POST")
        .uri("/echo")
        .header(header::COOKIE, format!("access_token={token}"))
        .header("x-user-id", "spoofed")
        .body(Body::from("hello"))
        .unwrap();

    let response = create_router(state).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"artist-42|hello");
}

#[tokio::test]
async fn test_slow_page_layer_maps_to_gateway_timeout() {
    let address = spawn_page_layer().await;
    let upstream = HttpUpstream::new(&address, Duration::from_millis(200)).unwrap();
    let state = AppState::new(AppConfig::default(), Arc::new(upstream) as UpstreamState).unwrap();

    let request = Request::builder().uri("/slow").body(Body::empty()).unwrap();
    let response = create_router(state).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["code"], "upstream_timeout");
}

#[tokio::test]
async fn test_unreachable_page_layer_maps_to_bad_gateway() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);
    let state =
        AppState::new(AppConfig::default(), Arc::new(upstream_for(&address)) as UpstreamState)
            .unwrap();

    let request = Request::builder().uri("/faq").body(Body::empty()).unwrap();
    let response = create_router(state).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}
