use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use pulse_domain::id::EventId;
use pulse_domain::pagination::{RECENT_LIMIT_MAX, RecentWindow};
use pulse_domain::status::EventStatus;

use crate::domain::types::{
    BatchRejection, BatchReport, BatchStatus, Event, EventView, FailedEvent, Payload,
};
use crate::error::EventsServiceError;
use crate::state::AppState;
use crate::usecase::ingest::{SubmitEventInput, SubmitEventUseCase};
use crate::usecase::query::{GetEventUseCase, RecentEventsUseCase};

// ── Request types ────────────────────────────────────────────────────────────

/// `status` and `retryCount` are not accepted; the server always sets them.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitEventRequest {
    pub event_type: Option<String>,
    pub payload: Option<Value>,
    pub metadata: Option<Value>,
    pub event_id: Option<String>,
}

impl From<SubmitEventRequest> for SubmitEventInput {
    fn from(body: SubmitEventRequest) -> Self {
        Self {
            event_type: body.event_type,
            payload: body.payload,
            metadata: body.metadata,
            event_id: body.event_id,
        }
    }
}

#[derive(Deserialize, Default)]
pub struct LimitQuery {
    pub limit: Option<u32>,
}

impl LimitQuery {
    pub fn window(&self) -> RecentWindow {
        RecentWindow::new(self.limit.unwrap_or(RECENT_LIMIT_MAX)).clamped()
    }
}

// ── Response types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    pub event_id: String,
    pub event_type: String,
    #[serde(serialize_with = "pulse_core::serde::to_rfc3339_ms")]
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub payload: Payload,
    pub status: EventStatus,
    pub retry_count: u32,
    pub metadata: Option<Payload>,
}

impl From<Event> for EventResponse {
    fn from(event: Event) -> Self {
        Self {
            event_id: event.event_id.into_inner(),
            event_type: event.event_type,
            timestamp: event.timestamp,
            payload: event.payload,
            status: event.status,
            retry_count: event.retry_count,
            metadata: event.metadata,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventViewResponse {
    pub event_id: String,
    pub event_type: String,
    #[serde(serialize_with = "pulse_core::serde::to_rfc3339_ms")]
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub status: EventStatus,
    pub payload: Payload,
}

impl From<EventView> for EventViewResponse {
    fn from(view: EventView) -> Self {
        Self {
            event_id: view.event_id.into_inner(),
            event_type: view.event_type,
            timestamp: view.timestamp,
            status: view.status,
            payload: view.payload,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    pub total_events: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub status: BatchStatus,
    pub event_ids: Vec<String>,
    pub failures: Vec<BatchFailureResponse>,
}

#[derive(Serialize)]
pub struct BatchFailureResponse {
    pub index: usize,
    pub error: &'static str,
    pub message: String,
}

impl From<BatchRejection> for BatchFailureResponse {
    fn from(rejection: BatchRejection) -> Self {
        Self {
            index: rejection.index,
            error: rejection.kind,
            message: rejection.error,
        }
    }
}

impl From<BatchReport> for BatchResponse {
    fn from(report: BatchReport) -> Self {
        Self {
            total_events: report.total(),
            success_count: report.accepted.len(),
            failure_count: report.rejected.len(),
            status: report.status(),
            event_ids: report
                .accepted
                .into_iter()
                .map(|e| e.event_id.into_inner())
                .collect(),
            failures: report.rejected.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedEventResponse {
    pub id: uuid::Uuid,
    pub event_id: String,
    pub event_type: String,
    #[serde(serialize_with = "pulse_core::serde::to_rfc3339_ms")]
    pub original_timestamp: chrono::DateTime<chrono::Utc>,
    #[serde(serialize_with = "pulse_core::serde::to_rfc3339_ms")]
    pub failed_at: chrono::DateTime<chrono::Utc>,
    pub failure_reason: String,
    pub total_retries: u32,
    pub last_status: EventStatus,
    pub payload: Payload,
    pub service_name: String,
}

impl From<FailedEvent> for FailedEventResponse {
    fn from(failed: FailedEvent) -> Self {
        Self {
            id: failed.id,
            event_id: failed.event_id.into_inner(),
            event_type: failed.event_type,
            original_timestamp: failed.original_timestamp,
            failed_at: failed.failed_at,
            failure_reason: failed.failure_reason,
            total_retries: failed.total_retries,
            last_status: failed.last_status,
            payload: failed.payload,
            service_name: failed.service_name,
        }
    }
}

// ── POST /api/events ─────────────────────────────────────────────────────────

pub async fn submit_event(
    State(state): State<AppState>,
    body: Result<Json<SubmitEventRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<EventResponse>), EventsServiceError> {
    let Json(body) = body.map_err(|e| EventsServiceError::InvalidEvent(e.body_text()))?;
    let usecase = SubmitEventUseCase {
        events: state.event_repo(),
    };
    let event = usecase.execute(body.into()).await?;
    Ok((StatusCode::CREATED, Json(event.into())))
}

// ── POST /api/events/batch ───────────────────────────────────────────────────

pub async fn submit_batch(
    State(state): State<AppState>,
    body: Result<Json<Vec<SubmitEventRequest>>, JsonRejection>,
) -> Result<Json<BatchResponse>, EventsServiceError> {
    let Json(body) = body.map_err(|e| EventsServiceError::InvalidEvent(e.body_text()))?;
    let usecase = SubmitEventUseCase {
        events: state.event_repo(),
    };
    let report = usecase
        .execute_batch(body.into_iter().map(SubmitEventInput::from).collect())
        .await?;
    Ok(Json(report.into()))
}

// ── GET /api/events ──────────────────────────────────────────────────────────

pub async fn list_recent_events(
    State(state): State<AppState>,
    query: Result<Query<LimitQuery>, QueryRejection>,
) -> Result<Json<Vec<EventViewResponse>>, EventsServiceError> {
    let Query(query) = query.map_err(|e| EventsServiceError::InvalidRequest(e.body_text()))?;
    let usecase = RecentEventsUseCase {
        events: state.event_repo(),
    };
    let views = usecase.execute(query.window()).await?;
    Ok(Json(views.into_iter().map(EventViewResponse::from).collect()))
}

// ── GET /api/events/{event_id} ───────────────────────────────────────────────

pub async fn get_event(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<Json<EventViewResponse>, EventsServiceError> {
    let event_id = EventId::try_from(event_id).map_err(|_| EventsServiceError::EventNotFound)?;
    let usecase = GetEventUseCase {
        events: state.event_repo(),
    };
    let view = usecase.execute(&event_id).await?;
    Ok(Json(view.into()))
}

// ── GET /api/failed-events ───────────────────────────────────────────────────

pub async fn list_failed_events(
    State(state): State<AppState>,
    query: Result<Query<LimitQuery>, QueryRejection>,
) -> Result<Json<Vec<FailedEventResponse>>, EventsServiceError> {
    let Query(query) = query.map_err(|e| EventsServiceError::InvalidRequest(e.body_text()))?;
    let failed = state.dead_letter_sink().list(query.window()).await?;
    Ok(Json(failed.into_iter().map(FailedEventResponse::from).collect()))
}
