use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use pulse_domain::id::{AlertId, EventId};
use pulse_domain::status::EventStatus;

/// Structured document carried by an event. Opaque beyond being an object.
pub type Payload = Map<String, Value>;

/// A submitted event and its processing state.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub event_id: EventId,
    pub event_type: String,
    /// Assigned at creation; never changes.
    pub timestamp: DateTime<Utc>,
    pub payload: Payload,
    pub status: EventStatus,
    pub retry_count: u32,
    /// Free-form provenance. Stored, never interpreted.
    pub metadata: Option<Payload>,
    pub updated_at: DateTime<Utc>,
    /// Set when the event reaches `COMPLETED` or `FAILED`.
    pub processed_at: Option<DateTime<Utc>>,
}

impl Event {
    /// A freshly submitted event: `PENDING`, no attempts yet.
    ///
    /// Status and retry count are always assigned here, never taken from the
    /// submitter.
    pub fn pending(
        event_id: EventId,
        event_type: String,
        payload: Payload,
        metadata: Option<Payload>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id,
            event_type,
            timestamp: now,
            payload,
            status: EventStatus::Pending,
            retry_count: 0,
            metadata,
            updated_at: now,
            processed_at: None,
        }
    }

    /// The state this event has after a successful `update_status` at `at`.
    pub fn transitioned(mut self, to: EventStatus, retry_count: u32, at: DateTime<Utc>) -> Self {
        self.status = to;
        self.retry_count = retry_count;
        self.updated_at = at;
        if to.is_terminal() {
            self.processed_at = Some(at);
        }
        self
    }
}

/// Dead-letter record for an event that exhausted its retries.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedEvent {
    pub id: Uuid,
    pub event_id: EventId,
    pub event_type: String,
    pub original_timestamp: DateTime<Utc>,
    pub failed_at: DateTime<Utc>,
    pub failure_reason: String,
    pub total_retries: u32,
    pub last_status: EventStatus,
    pub payload: Payload,
    pub service_name: String,
}

/// Append-only observability sample.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRecord {
    pub id: Uuid,
    pub metric_name: String,
    pub timestamp: DateTime<Utc>,
    /// A JSON number or object.
    pub value: Value,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlertRecord {
    pub id: AlertId,
    pub alert_type: String,
    pub timestamp: DateTime<Utc>,
    pub resolved: bool,
    pub detail: String,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Filter for metric listings. All bounds are inclusive.
#[derive(Debug, Clone, Default)]
pub struct MetricQuery {
    pub name: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: u32,
}

/// Read-only projection handed to monitoring consumers.
#[derive(Debug, Clone, PartialEq)]
pub struct EventView {
    pub event_id: EventId,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub status: EventStatus,
    pub payload: Payload,
}

impl From<Event> for EventView {
    fn from(event: Event) -> Self {
        Self {
            event_id: event.event_id,
            event_type: event.event_type,
            timestamp: event.timestamp,
            status: event.status,
            payload: event.payload,
        }
    }
}

/// Number of events in each status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub pending: u64,
    pub processing: u64,
    pub completed: u64,
    pub failed: u64,
}

impl StatusCounts {
    pub fn add(&mut self, status: EventStatus, count: u64) {
        match status {
            EventStatus::Pending => self.pending += count,
            EventStatus::Processing => self.processing += count,
            EventStatus::Completed => self.completed += count,
            EventStatus::Failed => self.failed += count,
        }
    }

    pub fn total(&self) -> u64 {
        self.pending + self.processing + self.completed + self.failed
    }

    /// `failed / (completed + failed) * 100`, or `None` before anything finished.
    pub fn error_rate(&self) -> Option<f64> {
        let finished = self.completed + self.failed;
        if finished == 0 {
            return None;
        }
        Some(self.failed as f64 / finished as f64 * 100.0)
    }
}

/// Result of reporting a failed processing attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum FailureOutcome {
    /// Back to `PENDING`; `retry_count` is the new attempt count.
    Retrying { retry_count: u32 },
    /// Retries exhausted; the event is `FAILED`.
    DeadLettered(FailedEvent),
}

/// Result of a dead-letter capture.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureOutcome {
    Captured(FailedEvent),
    /// A record for this event already existed; it is returned unchanged.
    AlreadyCaptured(FailedEvent),
}

/// Result of running a processor over a claimed event.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutcome {
    Completed(Event),
    Retrying { event_id: EventId, retry_count: u32 },
}

/// Result of a batch submission. Items are accepted or rejected independently.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub accepted: Vec<Event>,
    pub rejected: Vec<BatchRejection>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.accepted.len() + self.rejected.len()
    }

    /// `SUCCESS` only when nothing was rejected.
    pub fn status(&self) -> BatchStatus {
        if self.rejected.is_empty() {
            BatchStatus::Success
        } else {
            BatchStatus::PartialSuccess
        }
    }
}

/// One rejected batch item, by position in the submitted array.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRejection {
    pub index: usize,
    pub kind: &'static str,
    pub error: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    Success,
    PartialSuccess,
}

/// Most items a single batch submission may carry.
pub const BATCH_LIMIT_MAX: usize = 100;

/// Default number of failed attempts before an event is dead-lettered.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default number of events claimed per worker poll.
pub const DEFAULT_CLAIM_BATCH_SIZE: u32 = 100;

/// Unit recorded when a metric is written without one.
pub const DEFAULT_METRIC_UNIT: &str = "COUNT";

pub const METRIC_EVENTS_TOTAL: &str = "events.total";
pub const METRIC_EVENTS_PENDING: &str = "events.pending";
pub const METRIC_EVENTS_PROCESSING: &str = "events.processing";
pub const METRIC_EVENTS_COMPLETED: &str = "events.completed";
pub const METRIC_EVENTS_FAILED: &str = "events.failed";
pub const METRIC_ERROR_RATE: &str = "events.error_rate";
pub const METRIC_DEAD_LETTERED: &str = "events.dead_lettered";
/// Events created during the last [`RECENT_EVENTS_WINDOW_SECS`].
pub const METRIC_EVENTS_RECENT: &str = "events.recent";
/// Growth of `events.total` per second since the previous collection.
pub const METRIC_THROUGHPUT: &str = "events.throughput";

pub const RECENT_EVENTS_WINDOW_SECS: i64 = 60;

/// Failure reason written when the sweep dead-letters a `FAILED` event whose
/// capture was interrupted; the original reason was never persisted.
pub const RECOVERED_FAILURE_REASON: &str = "retries exhausted; dead-letter capture recovered";

pub const ALERT_EVENT_DEAD_LETTERED: &str = "EVENT_DEAD_LETTERED";
pub const ALERT_HIGH_ERROR_RATE: &str = "HIGH_ERROR_RATE";
pub const ALERT_HIGH_PROCESSING_QUEUE: &str = "HIGH_PROCESSING_QUEUE";
