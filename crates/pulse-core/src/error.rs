use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::Value;

/// Build the error body every Pulse endpoint returns: `{kind, error, details?}`.
pub fn error_body(kind: &str, error: &str, details: Option<Value>) -> Value {
    let mut body = serde_json::json!({
        "kind": kind,
        "error": error,
    });
    if let Some(details) = details {
        body["details"] = details;
    }
    body
}

/// Log a server-side failure. 4xx are expected client errors and are not logged
/// here; tower-http TraceLayer already records method/uri/status for all requests.
pub fn log_server_error(status: StatusCode, kind: &str, error: &dyn std::fmt::Display) {
    if status.is_server_error() {
        tracing::error!(error = %error, kind, status = status.as_u16(), "server error");
    }
}

/// Error variants shared by services that have no richer domain taxonomy.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("upstream unavailable: {0}")]
    BadGateway(String),
    #[error("upstream timed out")]
    GatewayTimeout,
    #[error("internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BadGateway(_) => "BAD_GATEWAY",
            Self::GatewayTimeout => "GATEWAY_TIMEOUT",
            Self::Internal(_) => "INTERNAL",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadGateway(_) => StatusCode::BAD_GATEWAY,
            Self::GatewayTimeout => StatusCode::GATEWAY_TIMEOUT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::Internal(e) => log_server_error(status, self.kind(), e),
            other => log_server_error(status, other.kind(), other),
        }
        let body = error_body(self.kind(), &self.to_string(), None);
        (status, axum::Json(body)).into_response()
    }
}
