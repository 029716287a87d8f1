use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use tracing::{info, warn};
use uuid::Uuid;

use pulse_domain::id::AlertId;
use pulse_domain::pagination::RecentWindow;

use crate::domain::repository::{EventRepository, MonitoringRepository};
use crate::domain::types::{
    ALERT_HIGH_ERROR_RATE, ALERT_HIGH_PROCESSING_QUEUE, AlertRecord, DEFAULT_METRIC_UNIT,
    METRIC_ERROR_RATE, METRIC_EVENTS_COMPLETED, METRIC_EVENTS_FAILED, METRIC_EVENTS_PENDING,
    METRIC_EVENTS_PROCESSING, METRIC_EVENTS_RECENT, METRIC_EVENTS_TOTAL, METRIC_THROUGHPUT,
    MetricQuery, MetricRecord, RECENT_EVENTS_WINDOW_SECS, StatusCounts,
};
use crate::error::EventsServiceError;

/// Unit of `events.error_rate`.
const PERCENT_UNIT: &str = "PERCENT";

/// Unit of `events.throughput`.
const PER_SECOND_UNIT: &str = "COUNT_PER_SECOND";

/// Appends metric and alert records. Write failures are returned, never swallowed.
pub struct MonitoringRecorder<M>
where
    M: MonitoringRepository,
{
    pub repo: M,
}

impl<M> MonitoringRecorder<M>
where
    M: MonitoringRepository,
{
    pub async fn record_metric(
        &self,
        name: &str,
        value: Value,
        unit: Option<&str>,
        timestamp: DateTime<Utc>,
    ) -> Result<MetricRecord, EventsServiceError> {
        if name.trim().is_empty() {
            return Err(EventsServiceError::InvalidRequest(
                "metricName must not be empty".into(),
            ));
        }
        if !(value.is_number() || value.is_object()) {
            return Err(EventsServiceError::InvalidRequest(
                "value must be a number or an object".into(),
            ));
        }
        let unit = match unit.map(str::trim) {
            Some(unit) if !unit.is_empty() => unit.to_owned(),
            _ => DEFAULT_METRIC_UNIT.to_owned(),
        };
        let metric = MetricRecord {
            id: Uuid::new_v4(),
            metric_name: name.to_owned(),
            timestamp,
            value,
            unit,
        };
        self.repo.insert_metric(&metric).await?;
        Ok(metric)
    }

    pub async fn raise_alert(
        &self,
        alert_type: &str,
        detail: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<AlertRecord, EventsServiceError> {
        if alert_type.trim().is_empty() {
            return Err(EventsServiceError::InvalidRequest(
                "alertType must not be empty".into(),
            ));
        }
        let alert = AlertRecord {
            id: AlertId(Uuid::new_v4()),
            alert_type: alert_type.to_owned(),
            timestamp,
            resolved: false,
            detail: detail.to_owned(),
            resolved_at: None,
        };
        self.repo.insert_alert(&alert).await?;
        warn!(alert_id = %alert.id, alert_type, detail, "alert raised");
        Ok(alert)
    }

    /// Fails with `AlertNotFound` if the alert is absent or already resolved.
    pub async fn resolve_alert(&self, alert_id: AlertId) -> Result<(), EventsServiceError> {
        if !self.repo.resolve_alert(alert_id, Utc::now()).await? {
            return Err(EventsServiceError::AlertNotFound);
        }
        info!(%alert_id, "alert resolved");
        Ok(())
    }

    pub async fn metrics(
        &self,
        mut query: MetricQuery,
    ) -> Result<Vec<MetricRecord>, EventsServiceError> {
        if let (Some(from), Some(to)) = (query.from, query.to) {
            if from > to {
                return Err(EventsServiceError::InvalidRequest(
                    "from must not be after to".into(),
                ));
            }
        }
        query.limit = RecentWindow::new(query.limit).clamped().limit;
        self.repo.list_metrics(&query).await
    }

    pub async fn alerts(
        &self,
        resolved: Option<bool>,
        window: RecentWindow,
    ) -> Result<Vec<AlertRecord>, EventsServiceError> {
        self.repo.list_alerts(resolved, window.clamped().limit).await
    }
}

/// One pass of the metrics collector.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionReport {
    pub counts: StatusCounts,
    pub error_rate: Option<f64>,
    /// Events per second since the previous `events.total` sample; `None` on
    /// the first pass.
    pub throughput: Option<f64>,
    /// Events created in the last minute.
    pub recent: u64,
    pub alerts: Vec<AlertRecord>,
}

/// Snapshot event counts into metrics and raise threshold alerts.
pub struct CollectMetricsUseCase<E, M>
where
    E: EventRepository,
    M: MonitoringRepository,
{
    pub events: E,
    pub recorder: MonitoringRecorder<M>,
    /// Percent; `HIGH_ERROR_RATE` fires strictly above it.
    pub error_rate_threshold: f64,
    /// `HIGH_PROCESSING_QUEUE` fires strictly above it.
    pub processing_alert_threshold: u64,
}

impl<E, M> CollectMetricsUseCase<E, M>
where
    E: EventRepository,
    M: MonitoringRepository,
{
    pub async fn execute(&self) -> Result<CollectionReport, EventsServiceError> {
        let counts = self.events.count_by_status().await?;
        let now = Utc::now();
        let recent = self
            .events
            .count_created_since(now - chrono::Duration::seconds(RECENT_EVENTS_WINDOW_SECS))
            .await?;

        // Read before this pass writes its own sample.
        let previous = self
            .recorder
            .metrics(MetricQuery {
                name: Some(METRIC_EVENTS_TOTAL.to_owned()),
                to: Some(now),
                limit: 1,
                ..MetricQuery::default()
            })
            .await?;
        let throughput = previous
            .first()
            .and_then(|previous| throughput_since(previous, counts.total(), now));

        for (name, value) in [
            (METRIC_EVENTS_TOTAL, counts.total()),
            (METRIC_EVENTS_PENDING, counts.pending),
            (METRIC_EVENTS_PROCESSING, counts.processing),
            (METRIC_EVENTS_COMPLETED, counts.completed),
            (METRIC_EVENTS_FAILED, counts.failed),
            (METRIC_EVENTS_RECENT, recent),
        ] {
            self.recorder
                .record_metric(name, json!(value), None, now)
                .await?;
        }
        if let Some(rate) = throughput {
            self.recorder
                .record_metric(METRIC_THROUGHPUT, json!(rate), Some(PER_SECOND_UNIT), now)
                .await?;
        }

        let mut alerts = Vec::new();
        let error_rate = counts.error_rate();
        if let Some(rate) = error_rate {
            self.recorder
                .record_metric(METRIC_ERROR_RATE, json!(rate), Some(PERCENT_UNIT), now)
                .await?;
            if rate > self.error_rate_threshold {
                let detail = format!(
                    "error rate {rate:.2}% exceeds {:.2}% ({} failed, {} completed)",
                    self.error_rate_threshold, counts.failed, counts.completed
                );
                alerts.push(
                    self.recorder
                        .raise_alert(ALERT_HIGH_ERROR_RATE, &detail, now)
                        .await?,
                );
            }
        }

        if counts.processing > self.processing_alert_threshold {
            let detail = format!(
                "{} events processing, threshold {}",
                counts.processing, self.processing_alert_threshold
            );
            alerts.push(
                self.recorder
                    .raise_alert(ALERT_HIGH_PROCESSING_QUEUE, &detail, now)
                    .await?,
            );
        }

        info!(
            total = counts.total(),
            pending = counts.pending,
            processing = counts.processing,
            completed = counts.completed,
            failed = counts.failed,
            recent,
            throughput,
            alerts = alerts.len(),
            "metrics collected"
        );
        Ok(CollectionReport {
            counts,
            error_rate,
            throughput,
            recent,
            alerts,
        })
    }
}

/// Growth of the event total per second since `previous` was sampled.
/// Deletions never make it negative.
fn throughput_since(previous: &MetricRecord, total: u64, now: DateTime<Utc>) -> Option<f64> {
    let previous_total = previous.value.as_u64()?;
    let elapsed = (now - previous.timestamp).num_milliseconds();
    if elapsed <= 0 {
        return None;
    }
    Some(total.saturating_sub(previous_total) as f64 * 1000.0 / elapsed as f64)
}
