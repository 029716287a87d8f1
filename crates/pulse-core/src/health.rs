use axum::Json;
use axum::http::StatusCode;
use serde::Serialize;

/// Body returned by `GET /healthz` and `GET /readyz`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub service: String,
}

/// Probe response for a service that is up.
pub fn up(service: impl Into<String>) -> (StatusCode, Json<HealthStatus>) {
    (
        StatusCode::OK,
        Json(HealthStatus {
            status: "UP",
            service: service.into(),
        }),
    )
}

/// Probe response for a service whose dependencies are unreachable.
pub fn down(service: impl Into<String>) -> (StatusCode, Json<HealthStatus>) {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(HealthStatus {
            status: "DOWN",
            service: service.into(),
        }),
    )
}
