use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use pulse_domain::id::AlertId;
use pulse_domain::pagination::{RECENT_LIMIT_MAX, RecentWindow};

use crate::domain::types::{AlertRecord, MetricQuery, MetricRecord};
use crate::error::EventsServiceError;
use crate::state::AppState;

// ── Request types ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMetricRequest {
    pub metric_name: String,
    pub value: Value,
    pub unit: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct MetricListQuery {
    pub name: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
}

#[derive(Deserialize, Default)]
pub struct AlertListQuery {
    pub resolved: Option<bool>,
    pub limit: Option<u32>,
}

// ── Response types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricResponse {
    pub id: uuid::Uuid,
    pub metric_name: String,
    #[serde(serialize_with = "pulse_core::serde::to_rfc3339_ms")]
    pub timestamp: DateTime<Utc>,
    pub value: Value,
    pub unit: String,
}

impl From<MetricRecord> for MetricResponse {
    fn from(metric: MetricRecord) -> Self {
        Self {
            id: metric.id,
            metric_name: metric.metric_name,
            timestamp: metric.timestamp,
            value: metric.value,
            unit: metric.unit,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertResponse {
    pub id: AlertId,
    pub alert_type: String,
    #[serde(serialize_with = "pulse_core::serde::to_rfc3339_ms")]
    pub timestamp: DateTime<Utc>,
    pub resolved: bool,
    pub detail: String,
    #[serde(serialize_with = "pulse_core::serde::to_rfc3339_ms_opt")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl From<AlertRecord> for AlertResponse {
    fn from(alert: AlertRecord) -> Self {
        Self {
            id: alert.id,
            alert_type: alert.alert_type,
            timestamp: alert.timestamp,
            resolved: alert.resolved,
            detail: alert.detail,
            resolved_at: alert.resolved_at,
        }
    }
}

// ── POST /api/metrics ────────────────────────────────────────────────────────

pub async fn record_metric(
    State(state): State<AppState>,
    body: Result<Json<RecordMetricRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MetricResponse>), EventsServiceError> {
    let Json(body) = body.map_err(|e| EventsServiceError::InvalidRequest(e.body_text()))?;
    let metric = state
        .recorder()
        .record_metric(&body.metric_name, body.value, body.unit.as_deref(), Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(metric.into())))
}

// ── GET /api/metrics ─────────────────────────────────────────────────────────

pub async fn list_metrics(
    State(state): State<AppState>,
    query: Result<Query<MetricListQuery>, QueryRejection>,
) -> Result<Json<Vec<MetricResponse>>, EventsServiceError> {
    let Query(query) = query.map_err(|e| EventsServiceError::InvalidRequest(e.body_text()))?;
    let metrics = state
        .recorder()
        .metrics(MetricQuery {
            name: query.name,
            from: query.from,
            to: query.to,
            limit: query.limit.unwrap_or(RECENT_LIMIT_MAX),
        })
        .await?;
    Ok(Json(metrics.into_iter().map(MetricResponse::from).collect()))
}

// ── GET /api/alerts ──────────────────────────────────────────────────────────

pub async fn list_alerts(
    State(state): State<AppState>,
    query: Result<Query<AlertListQuery>, QueryRejection>,
) -> Result<Json<Vec<AlertResponse>>, EventsServiceError> {
    let Query(query) = query.map_err(|e| EventsServiceError::InvalidRequest(e.body_text()))?;
    let window = RecentWindow::new(query.limit.unwrap_or(RECENT_LIMIT_MAX));
    let alerts = state.recorder().alerts(query.resolved, window).await?;
    Ok(Json(alerts.into_iter().map(AlertResponse::from).collect()))
}

// ── PATCH /api/alerts/{alert_id} ─────────────────────────────────────────────

pub async fn resolve_alert(
    State(state): State<AppState>,
    Path(alert_id): Path<String>,
) -> Result<StatusCode, EventsServiceError> {
    let alert_id: AlertId = alert_id
        .parse()
        .map_err(|_| EventsServiceError::AlertNotFound)?;
    state.recorder().resolve_alert(alert_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
