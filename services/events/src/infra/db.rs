use std::time::Duration;

use anyhow::{Context as _, anyhow};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue::Set,
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
    sea_query::{Expr, OnConflict, Query},
};
use serde_json::Value;

use pulse_core::sea_ext::with_timeout;
use pulse_domain::id::{AlertId, EventId};
use pulse_domain::pagination::RecentWindow;
use pulse_domain::status::EventStatus;
use pulse_events_schema::{alerts, events, failed_events, metrics};

use crate::domain::repository::{DeadLetterRepository, EventRepository, MonitoringRepository};
use crate::domain::types::{
    AlertRecord, Event, FailedEvent, MetricQuery, MetricRecord, Payload, StatusCounts,
};
use crate::error::EventsServiceError;

// ── Event repository ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbEventRepository {
    pub db: DatabaseConnection,
    /// Deadline for each statement.
    pub timeout: Duration,
}

impl EventRepository for DbEventRepository {
    async fn insert(&self, event: &Event) -> Result<(), EventsServiceError> {
        let model = events::ActiveModel {
            event_id: Set(event.event_id.to_string()),
            event_type: Set(event.event_type.clone()),
            timestamp: Set(event.timestamp),
            payload: Set(Value::Object(event.payload.clone())),
            status: Set(event.status.as_str().to_owned()),
            retry_count: Set(db_count(event.retry_count)),
            metadata: Set(event.metadata.clone().map(Value::Object)),
            updated_at: Set(event.updated_at),
            processed_at: Set(event.processed_at),
        };
        let result = with_timeout(
            self.timeout,
            "insert event",
            events::Entity::insert(model).exec_without_returning(&self.db),
        )
        .await;
        match result {
            Ok(_) => Ok(()),
            Err(e) if e.is_unique_violation() => {
                Err(EventsServiceError::DuplicateKey(event.event_id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_event_id(
        &self,
        event_id: &EventId,
    ) -> Result<Option<Event>, EventsServiceError> {
        let model = with_timeout(
            self.timeout,
            "find event",
            events::Entity::find_by_id(event_id.as_str().to_owned()).one(&self.db),
        )
        .await?;
        model.map(event_from_model).transpose()
    }

    async fn update_status(
        &self,
        event_id: &EventId,
        from: EventStatus,
        to: EventStatus,
        retry_count: u32,
    ) -> Result<(), EventsServiceError> {
        let now = Utc::now();
        let mut update = events::Entity::update_many()
            .col_expr(events::Column::Status, Expr::value(to.as_str()))
            .col_expr(events::Column::RetryCount, Expr::value(db_count(retry_count)))
            .col_expr(events::Column::UpdatedAt, Expr::value(now));
        if to.is_terminal() {
            update = update.col_expr(events::Column::ProcessedAt, Expr::value(now));
        }
        // Compare-and-swap: the row only matches while it still holds `from`.
        let result = with_timeout(
            self.timeout,
            "update event status",
            update
                .filter(events::Column::EventId.eq(event_id.as_str()))
                .filter(events::Column::Status.eq(from.as_str()))
                .exec(&self.db),
        )
        .await?;
        if result.rows_affected > 0 {
            return Ok(());
        }

        match self.find_by_event_id(event_id).await? {
            None => Err(EventsServiceError::EventNotFound),
            Some(current) => Err(EventsServiceError::StaleTransition {
                event_id: event_id.to_string(),
                expected: from,
                actual: current.status,
            }),
        }
    }

    async fn list_recent(&self, window: RecentWindow) -> Result<Vec<Event>, EventsServiceError> {
        let models = with_timeout(
            self.timeout,
            "list recent events",
            events::Entity::find()
                .order_by_desc(events::Column::Timestamp)
                .order_by_desc(events::Column::EventId)
                .offset(u64::from(window.offset))
                .limit(u64::from(window.limit))
                .all(&self.db),
        )
        .await?;
        models.into_iter().map(event_from_model).collect()
    }

    async fn list_by_status(
        &self,
        status: EventStatus,
        limit: u32,
        updated_before: Option<DateTime<Utc>>,
    ) -> Result<Vec<Event>, EventsServiceError> {
        let mut query = events::Entity::find().filter(events::Column::Status.eq(status.as_str()));
        if let Some(before) = updated_before {
            query = query.filter(events::Column::UpdatedAt.lt(before));
        }
        let models = with_timeout(
            self.timeout,
            "list events by status",
            query
                .order_by_asc(events::Column::Timestamp)
                .order_by_asc(events::Column::EventId)
                .limit(u64::from(limit))
                .all(&self.db),
        )
        .await?;
        models.into_iter().map(event_from_model).collect()
    }

    async fn list_failed_without_dead_letter(
        &self,
        updated_before: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Event>, EventsServiceError> {
        let captured = Query::select()
            .column(failed_events::Column::EventId)
            .from(failed_events::Entity)
            .to_owned();
        let models = with_timeout(
            self.timeout,
            "list stranded failed events",
            events::Entity::find()
                .filter(events::Column::Status.eq(EventStatus::Failed.as_str()))
                .filter(events::Column::UpdatedAt.lt(updated_before))
                .filter(events::Column::EventId.not_in_subquery(captured))
                .order_by_asc(events::Column::Timestamp)
                .order_by_asc(events::Column::EventId)
                .limit(u64::from(limit))
                .all(&self.db),
        )
        .await?;
        models.into_iter().map(event_from_model).collect()
    }

    async fn count_by_status(&self) -> Result<StatusCounts, EventsServiceError> {
        let rows: Vec<(String, i64)> = with_timeout(
            self.timeout,
            "count events by status",
            events::Entity::find()
                .select_only()
                .column(events::Column::Status)
                .column_as(Expr::col(events::Column::EventId).count(), "count")
                .group_by(events::Column::Status)
                .into_tuple()
                .all(&self.db),
        )
        .await?;

        let mut counts = StatusCounts::default();
        for (status, count) in rows {
            let status: EventStatus = status.parse().context("decode event status")?;
            counts.add(status, u64::try_from(count).unwrap_or_default());
        }
        Ok(counts)
    }

    async fn count_created_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<u64, EventsServiceError> {
        let count = with_timeout(
            self.timeout,
            "count recent events",
            events::Entity::find()
                .filter(events::Column::Timestamp.gte(since))
                .count(&self.db),
        )
        .await?;
        Ok(count)
    }
}

fn event_from_model(model: events::Model) -> Result<Event, EventsServiceError> {
    let event_id = EventId::try_from(model.event_id).context("decode event id")?;
    Ok(Event {
        payload: object_from_json(model.payload)
            .with_context(|| format!("decode payload of {event_id}"))?,
        metadata: model
            .metadata
            .map(object_from_json)
            .transpose()
            .with_context(|| format!("decode metadata of {event_id}"))?,
        event_type: model.event_type,
        timestamp: model.timestamp,
        status: model.status.parse().context("decode event status")?,
        retry_count: u32::try_from(model.retry_count).context("decode retry count")?,
        updated_at: model.updated_at,
        processed_at: model.processed_at,
        event_id,
    })
}

// ── Dead-letter repository ───────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbDeadLetterRepository {
    pub db: DatabaseConnection,
    pub timeout: Duration,
}

impl DeadLetterRepository for DbDeadLetterRepository {
    async fn insert_if_absent(&self, failed: &FailedEvent) -> Result<bool, EventsServiceError> {
        let model = failed_events::ActiveModel {
            id: Set(failed.id),
            event_id: Set(failed.event_id.to_string()),
            event_type: Set(failed.event_type.clone()),
            original_timestamp: Set(failed.original_timestamp),
            failed_at: Set(failed.failed_at),
            failure_reason: Set(failed.failure_reason.clone()),
            total_retries: Set(db_count(failed.total_retries)),
            last_status: Set(failed.last_status.as_str().to_owned()),
            payload: Set(Value::Object(failed.payload.clone())),
            service_name: Set(failed.service_name.clone()),
        };
        let inserted = with_timeout(
            self.timeout,
            "capture failed event",
            failed_events::Entity::insert(model)
                .on_conflict(
                    OnConflict::column(failed_events::Column::EventId)
                        .do_nothing()
                        .to_owned(),
                )
                .exec_without_returning(&self.db),
        )
        .await?;
        Ok(inserted > 0)
    }

    async fn find_by_event_id(
        &self,
        event_id: &EventId,
    ) -> Result<Option<FailedEvent>, EventsServiceError> {
        let model = with_timeout(
            self.timeout,
            "find failed event",
            failed_events::Entity::find()
                .filter(failed_events::Column::EventId.eq(event_id.as_str()))
                .one(&self.db),
        )
        .await?;
        model.map(failed_event_from_model).transpose()
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<FailedEvent>, EventsServiceError> {
        let models = with_timeout(
            self.timeout,
            "list failed events",
            failed_events::Entity::find()
                .order_by_desc(failed_events::Column::FailedAt)
                .order_by_desc(failed_events::Column::EventId)
                .limit(u64::from(limit))
                .all(&self.db),
        )
        .await?;
        models.into_iter().map(failed_event_from_model).collect()
    }
}

fn failed_event_from_model(model: failed_events::Model) -> Result<FailedEvent, EventsServiceError> {
    let event_id = EventId::try_from(model.event_id).context("decode failed event id")?;
    Ok(FailedEvent {
        id: model.id,
        payload: object_from_json(model.payload)
            .with_context(|| format!("decode dead-letter payload of {event_id}"))?,
        event_type: model.event_type,
        original_timestamp: model.original_timestamp,
        failed_at: model.failed_at,
        failure_reason: model.failure_reason,
        total_retries: u32::try_from(model.total_retries).context("decode total retries")?,
        last_status: model.last_status.parse().context("decode last status")?,
        service_name: model.service_name,
        event_id,
    })
}

// ── Monitoring repository ────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbMonitoringRepository {
    pub db: DatabaseConnection,
    pub timeout: Duration,
}

impl MonitoringRepository for DbMonitoringRepository {
    async fn insert_metric(&self, metric: &MetricRecord) -> Result<(), EventsServiceError> {
        let model = metrics::ActiveModel {
            id: Set(metric.id),
            metric_name: Set(metric.metric_name.clone()),
            timestamp: Set(metric.timestamp),
            value: Set(metric.value.clone()),
            unit: Set(metric.unit.clone()),
        };
        with_timeout(
            self.timeout,
            "insert metric",
            metrics::Entity::insert(model).exec_without_returning(&self.db),
        )
        .await?;
        Ok(())
    }

    async fn list_metrics(
        &self,
        query: &MetricQuery,
    ) -> Result<Vec<MetricRecord>, EventsServiceError> {
        let mut select = metrics::Entity::find();
        if let Some(name) = &query.name {
            select = select.filter(metrics::Column::MetricName.eq(name.as_str()));
        }
        if let Some(from) = query.from {
            select = select.filter(metrics::Column::Timestamp.gte(from));
        }
        if let Some(to) = query.to {
            select = select.filter(metrics::Column::Timestamp.lte(to));
        }
        let models = with_timeout(
            self.timeout,
            "list metrics",
            select
                .order_by_desc(metrics::Column::Timestamp)
                .limit(u64::from(query.limit))
                .all(&self.db),
        )
        .await?;
        Ok(models.into_iter().map(metric_from_model).collect())
    }

    async fn insert_alert(&self, alert: &AlertRecord) -> Result<(), EventsServiceError> {
        let model = alerts::ActiveModel {
            id: Set(alert.id.0),
            alert_type: Set(alert.alert_type.clone()),
            timestamp: Set(alert.timestamp),
            resolved: Set(alert.resolved),
            detail: Set(alert.detail.clone()),
            resolved_at: Set(alert.resolved_at),
        };
        with_timeout(
            self.timeout,
            "insert alert",
            alerts::Entity::insert(model).exec_without_returning(&self.db),
        )
        .await?;
        Ok(())
    }

    async fn list_alerts(
        &self,
        resolved: Option<bool>,
        limit: u32,
    ) -> Result<Vec<AlertRecord>, EventsServiceError> {
        let mut select = alerts::Entity::find();
        if let Some(resolved) = resolved {
            select = select.filter(alerts::Column::Resolved.eq(resolved));
        }
        let models = with_timeout(
            self.timeout,
            "list alerts",
            select
                .order_by_desc(alerts::Column::Timestamp)
                .limit(u64::from(limit))
                .all(&self.db),
        )
        .await?;
        Ok(models.into_iter().map(alert_from_model).collect())
    }

    async fn resolve_alert(
        &self,
        alert_id: AlertId,
        resolved_at: DateTime<Utc>,
    ) -> Result<bool, EventsServiceError> {
        let result = with_timeout(
            self.timeout,
            "resolve alert",
            alerts::Entity::update_many()
                .col_expr(alerts::Column::Resolved, Expr::value(true))
                .col_expr(alerts::Column::ResolvedAt, Expr::value(resolved_at))
                .filter(alerts::Column::Id.eq(alert_id.0))
                .filter(alerts::Column::Resolved.eq(false))
                .exec(&self.db),
        )
        .await?;
        Ok(result.rows_affected > 0)
    }
}

fn metric_from_model(model: metrics::Model) -> MetricRecord {
    MetricRecord {
        id: model.id,
        metric_name: model.metric_name,
        timestamp: model.timestamp,
        value: model.value,
        unit: model.unit,
    }
}

fn alert_from_model(model: alerts::Model) -> AlertRecord {
    AlertRecord {
        id: AlertId(model.id),
        alert_type: model.alert_type,
        timestamp: model.timestamp,
        resolved: model.resolved,
        detail: model.detail,
        resolved_at: model.resolved_at,
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Counts are bounded by `max_retries`, far below `i32::MAX`.
fn db_count(count: u32) -> i32 {
    i32::try_from(count).unwrap_or(i32::MAX)
}

fn object_from_json(value: Value) -> anyhow::Result<Payload> {
    match value {
        Value::Object(object) => Ok(object),
        other => Err(anyhow!("expected a JSON object, found {other}")),
    }
}
