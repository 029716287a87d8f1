use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::Value;

use pulse_core::error::{error_body, log_server_error};
use pulse_core::sea_ext::StoreError;
use pulse_domain::status::EventStatus;

/// Events service domain error variants.
#[derive(Debug, thiserror::Error)]
pub enum EventsServiceError {
    /// Rejected submission; the payload names the offending field.
    #[error("invalid event")]
    InvalidEvent(String),
    #[error("invalid request")]
    InvalidRequest(String),
    /// Store-level uniqueness violation on insert.
    #[error("duplicate event id: {0}")]
    DuplicateKey(String),
    /// Submission collided with an existing event id.
    #[error("event already exists: {0}")]
    Conflict(String),
    #[error("event not found")]
    EventNotFound,
    #[error("alert not found")]
    AlertNotFound,
    #[error("event {event_id} is {actual}, expected {expected}")]
    StaleTransition {
        event_id: String,
        expected: EventStatus,
        actual: EventStatus,
    },
    #[error("event {event_id} cannot move from {from} to {to}")]
    InvalidTransition {
        event_id: String,
        from: EventStatus,
        to: EventStatus,
    },
    #[error("storage unavailable")]
    StorageUnavailable(String),
    #[error("event {event_id} permanently failed: {reason}")]
    PermanentFailure { event_id: String, reason: String },
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl EventsServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidEvent(_) => "INVALID_EVENT",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::DuplicateKey(_) => "DUPLICATE_KEY",
            Self::Conflict(_) => "CONFLICT",
            Self::EventNotFound => "EVENT_NOT_FOUND",
            Self::AlertNotFound => "ALERT_NOT_FOUND",
            Self::StaleTransition { .. } => "STALE_TRANSITION",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::StorageUnavailable(_) => "STORAGE_UNAVAILABLE",
            Self::PermanentFailure { .. } => "PERMANENT_FAILURE",
            Self::Internal(_) => "INTERNAL",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidEvent(_) | Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::DuplicateKey(_)
            | Self::Conflict(_)
            | Self::StaleTransition { .. }
            | Self::InvalidTransition { .. } => StatusCode::CONFLICT,
            Self::EventNotFound | Self::AlertNotFound => StatusCode::NOT_FOUND,
            Self::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::PermanentFailure { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            Self::InvalidEvent(reason) | Self::InvalidRequest(reason) => {
                Some(Value::String(reason.clone()))
            }
            _ => None,
        }
    }
}

/// Timeouts and lost connections surface as `StorageUnavailable`; everything
/// else is an internal fault.
impl From<StoreError> for EventsServiceError {
    fn from(err: StoreError) -> Self {
        if err.is_transient() {
            Self::StorageUnavailable(err.to_string())
        } else {
            Self::Internal(anyhow::Error::new(err))
        }
    }
}

impl IntoResponse for EventsServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        // The anyhow chain and the store cause are only in the log, never the body.
        match &self {
            Self::Internal(e) => log_server_error(status, self.kind(), &format!("{e:#}")),
            Self::StorageUnavailable(cause) => log_server_error(status, self.kind(), cause),
            other => log_server_error(status, other.kind(), other),
        }
        let body = error_body(self.kind(), &self.to_string(), self.details());
        (status, axum::Json(body)).into_response()
    }
}
