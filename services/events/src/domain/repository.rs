#![allow(async_fn_in_trait)]

use chrono::{DateTime, Utc};

use pulse_domain::id::{AlertId, EventId};
use pulse_domain::pagination::RecentWindow;
use pulse_domain::status::EventStatus;

use crate::domain::types::{
    AlertRecord, Event, FailedEvent, MetricQuery, MetricRecord, StatusCounts,
};
use crate::error::EventsServiceError;

/// Durable event records.
pub trait EventRepository: Send + Sync {
    /// Fails with `DuplicateKey` if the event id is taken.
    async fn insert(&self, event: &Event) -> Result<(), EventsServiceError>;

    async fn find_by_event_id(
        &self,
        event_id: &EventId,
    ) -> Result<Option<Event>, EventsServiceError>;

    /// Conditional write: applies only while the stored status equals `from`.
    ///
    /// Fails with `EventNotFound` for an unknown id and `StaleTransition` when
    /// the stored status differs. Stamps `updated_at`, and `processed_at` when
    /// `to` is terminal.
    async fn update_status(
        &self,
        event_id: &EventId,
        from: EventStatus,
        to: EventStatus,
        retry_count: u32,
    ) -> Result<(), EventsServiceError>;

    /// Newest first by `timestamp`, ties broken by event id descending.
    async fn list_recent(&self, window: RecentWindow) -> Result<Vec<Event>, EventsServiceError>;

    /// Oldest first by `timestamp`. With `updated_before`, only events whose
    /// last status change is strictly older.
    async fn list_by_status(
        &self,
        status: EventStatus,
        limit: u32,
        updated_before: Option<DateTime<Utc>>,
    ) -> Result<Vec<Event>, EventsServiceError>;

    /// `FAILED` events last changed before `updated_before` that have no
    /// dead-letter record. Oldest first.
    async fn list_failed_without_dead_letter(
        &self,
        updated_before: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Event>, EventsServiceError>;

    async fn count_by_status(&self) -> Result<StatusCounts, EventsServiceError>;

    /// Events whose `timestamp` is at or after `since`.
    async fn count_created_since(&self, since: DateTime<Utc>) -> Result<u64, EventsServiceError>;
}

/// Dead-letter records. Rows are created once and never updated.
pub trait DeadLetterRepository: Send + Sync {
    /// Insert unless a record for the same event id exists.
    /// Returns `true` if inserted, `false` if one was already there.
    async fn insert_if_absent(&self, failed: &FailedEvent) -> Result<bool, EventsServiceError>;

    async fn find_by_event_id(
        &self,
        event_id: &EventId,
    ) -> Result<Option<FailedEvent>, EventsServiceError>;

    /// Newest `failed_at` first.
    async fn list_recent(&self, limit: u32) -> Result<Vec<FailedEvent>, EventsServiceError>;
}

/// Metric and alert records.
pub trait MonitoringRepository: Send + Sync {
    async fn insert_metric(&self, metric: &MetricRecord) -> Result<(), EventsServiceError>;

    /// Newest first.
    async fn list_metrics(
        &self,
        query: &MetricQuery,
    ) -> Result<Vec<MetricRecord>, EventsServiceError>;

    async fn insert_alert(&self, alert: &AlertRecord) -> Result<(), EventsServiceError>;

    /// Newest first, optionally filtered by `resolved`.
    async fn list_alerts(
        &self,
        resolved: Option<bool>,
        limit: u32,
    ) -> Result<Vec<AlertRecord>, EventsServiceError>;

    /// Flip an unresolved alert to resolved. Returns `false` if the alert is
    /// absent or already resolved.
    async fn resolve_alert(
        &self,
        alert_id: AlertId,
        resolved_at: DateTime<Utc>,
    ) -> Result<bool, EventsServiceError>;
}
