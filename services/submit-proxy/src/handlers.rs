use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use tracing::{info, warn};

use pulse_core::error::AppError;
use pulse_core::health::{HealthStatus, up};
use pulse_core::middleware::REQUEST_ID_HEADER;

use crate::state::ProxyState;

// ── GET /healthz ─────────────────────────────────────────────────────────────

pub async fn healthz(State(state): State<ProxyState>) -> (StatusCode, Json<HealthStatus>) {
    up(state.service_name.as_str())
}

// ── POST /api/submit ─────────────────────────────────────────────────────────

/// Forward the body untouched. Successful responses are relayed as-is;
/// rejections keep the backend status with the backend body under `details`.
pub async fn submit(
    State(state): State<ProxyState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let mut request = state
        .client
        .post(&state.submit_url)
        .header(CONTENT_TYPE, "application/json")
        .body(body);
    if let Some(request_id) = headers.get(REQUEST_ID_HEADER) {
        request = request.header(REQUEST_ID_HEADER, request_id.as_bytes());
    }

    let response = request.send().await.map_err(transport_error)?;
    let status = response.status();
    let body = response.bytes().await.map_err(transport_error)?;

    if status.is_success() {
        info!(status = status.as_u16(), "submission forwarded");
        return Ok((status, [(CONTENT_TYPE, "application/json")], body).into_response());
    }

    warn!(status = status.as_u16(), "backend rejected submission");
    let details = serde_json::from_slice::<Value>(&body).unwrap_or_else(|_| json!({}));
    let body = json!({
        "error": "backend submission failed",
        "details": details,
    });
    Ok((status, Json(body)).into_response())
}

fn transport_error(e: reqwest::Error) -> AppError {
    if e.is_timeout() {
        AppError::GatewayTimeout
    } else {
        AppError::BadGateway(e.to_string())
    }
}
