use std::time::Duration;

use axum::{
    Json, Router,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    routing::post,
};
use axum_test::TestServer;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use pulse_core::config::Config;
use pulse_submit_proxy::config::ProxyConfig;
use pulse_submit_proxy::router::build_router;
use pulse_submit_proxy::state::ProxyState;

async fn spawn_backend(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
    format!("http://{addr}")
}

fn proxy(events_url: &str) -> TestServer {
    let config = ProxyConfig::from_vars([
        ("EVENTS_URL".to_owned(), events_url.to_owned()),
        ("PROXY_TIMEOUT_MS".to_owned(), "300".to_owned()),
    ])
    .unwrap();
    TestServer::new(build_router(ProxyState::new(&config).unwrap())).unwrap()
}

fn accepting_backend() -> Router {
    Router::new().route(
        "/api/events",
        post(|Json(body): Json<Value>| async move {
            (
                StatusCode::CREATED,
                Json(json!({
                    "eventId": "evt-1",
                    "eventType": body["eventType"],
                    "status": "PENDING",
                    "retryCount": 0,
                })),
            )
        }),
    )
}

#[tokio::test]
async fn should_relay_backend_success() {
    let server = proxy(&spawn_backend(accepting_backend()).await);

    let response = server
        .post("/api/submit")
        .json(&json!({"eventType": "USER_ACTION", "payload": {"action": "click"}}))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["eventId"], "evt-1");
    assert_eq!(body["eventType"], "USER_ACTION");
    assert_eq!(body["status"], "PENDING");
}

#[tokio::test]
async fn should_wrap_backend_rejection() {
    let backend = Router::new().route(
        "/api/events",
        post(|| async {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({"kind": "INVALID_EVENT", "error": "invalid event"})),
            )
        }),
    );
    let server = proxy(&spawn_backend(backend).await);

    let response = server.post("/api/submit").json(&json!({})).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "backend submission failed");
    assert_eq!(body["details"]["kind"], "INVALID_EVENT");
}

#[tokio::test]
async fn should_use_empty_details_for_non_json_rejection() {
    let backend = Router::new().route(
        "/api/events",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    );
    let server = proxy(&spawn_backend(backend).await);

    let response = server.post("/api/submit").json(&json!({})).await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["details"], json!({}));
}

#[tokio::test]
async fn should_return_bad_gateway_when_backend_unreachable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let server = proxy(&format!("http://{addr}"));

    let response = server.post("/api/submit").json(&json!({})).await;

    response.assert_status(StatusCode::BAD_GATEWAY);
    let body: Value = response.json();
    assert_eq!(body["kind"], "BAD_GATEWAY");
}

#[tokio::test]
async fn should_return_gateway_timeout_when_backend_stalls() {
    let backend = Router::new().route(
        "/api/events",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            StatusCode::CREATED
        }),
    );
    let server = proxy(&spawn_backend(backend).await);

    let response = server.post("/api/submit").json(&json!({})).await;

    response.assert_status(StatusCode::GATEWAY_TIMEOUT);
    let body: Value = response.json();
    assert_eq!(body["kind"], "GATEWAY_TIMEOUT");
}

#[tokio::test]
async fn should_forward_request_id() {
    let backend = Router::new().route(
        "/api/events",
        post(|headers: HeaderMap| async move {
            let request_id = headers
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_owned();
            (StatusCode::CREATED, Json(json!({"requestId": request_id})))
        }),
    );
    let server = proxy(&spawn_backend(backend).await);

    let response = server
        .post("/api/submit")
        .add_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static("req-123"),
        )
        .json(&json!({}))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["requestId"], "req-123");
}

#[tokio::test]
async fn should_report_up_on_healthz() {
    let server = proxy("http://127.0.0.1:9");

    let response = server.get("/healthz").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "UP");
    assert_eq!(body["service"], "pulse-submit-proxy");
}
