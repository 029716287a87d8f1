use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};

use pulse_domain::id::EventId;

use crate::domain::repository::EventRepository;
use crate::domain::types::{BATCH_LIMIT_MAX, BatchRejection, BatchReport, Event, Payload};
use crate::error::EventsServiceError;

/// A submission as received. Absent fields stay `None` so validation can
/// name them.
#[derive(Debug, Clone, Default)]
pub struct SubmitEventInput {
    pub event_type: Option<String>,
    pub payload: Option<Value>,
    pub metadata: Option<Value>,
    /// Client-chosen id; generated when absent.
    pub event_id: Option<String>,
}

/// Sole creator of event rows.
pub struct SubmitEventUseCase<E>
where
    E: EventRepository,
{
    pub events: E,
}

impl<E> SubmitEventUseCase<E>
where
    E: EventRepository,
{
    pub async fn execute(&self, input: SubmitEventInput) -> Result<Event, EventsServiceError> {
        // 1. Validate shape → 400 before touching storage
        let event_type = input
            .event_type
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| invalid("eventType must be a non-empty string"))?
            .to_owned();

        let payload = match input.payload {
            Some(Value::Object(payload)) => payload,
            Some(_) => return Err(invalid("payload must be an object")),
            None => return Err(invalid("payload is required")),
        };

        let metadata: Option<Payload> = match input.metadata {
            Some(Value::Object(metadata)) => Some(metadata),
            Some(_) => return Err(invalid("metadata must be an object")),
            None => None,
        };

        // 2. Assign identity
        let event_id = match input.event_id {
            Some(id) => EventId::try_from(id).map_err(|e| invalid(&e.to_string()))?,
            None => EventId::generate(),
        };

        // 3. Store as PENDING; the store's uniqueness guarantee is the only arbiter
        let event = Event::pending(event_id, event_type, payload, metadata, Utc::now());
        match self.events.insert(&event).await {
            Ok(()) => {}
            Err(EventsServiceError::DuplicateKey(id)) => {
                return Err(EventsServiceError::Conflict(id));
            }
            Err(e) => return Err(e),
        }

        info!(event_id = %event.event_id, event_type = %event.event_type, "event submitted");
        Ok(event)
    }
}

impl<E> SubmitEventUseCase<E>
where
    E: EventRepository,
{
    /// Submit each item independently, in order. A rejected item does not
    /// stop the rest.
    ///
    /// Fails as a whole only for an empty or oversized batch, or when every
    /// item failed for a server-side reason.
    pub async fn execute_batch(
        &self,
        inputs: Vec<SubmitEventInput>,
    ) -> Result<BatchReport, EventsServiceError> {
        if inputs.is_empty() {
            return Err(invalid("batch must contain at least one event"));
        }
        if inputs.len() > BATCH_LIMIT_MAX {
            return Err(invalid(&format!(
                "batch holds {} events, at most {BATCH_LIMIT_MAX} allowed",
                inputs.len()
            )));
        }

        let total = inputs.len();
        let mut report = BatchReport {
            accepted: Vec::with_capacity(total),
            rejected: Vec::new(),
        };
        let mut server_error = None;
        let mut server_failures = 0usize;
        for (index, input) in inputs.into_iter().enumerate() {
            match self.execute(input).await {
                Ok(event) => report.accepted.push(event),
                Err(e) => {
                    warn!(index, kind = e.kind(), error = %e, "batch item rejected");
                    report.rejected.push(BatchRejection {
                        index,
                        kind: e.kind(),
                        error: rejection_message(&e),
                    });
                    if e.status().is_server_error() {
                        server_failures += 1;
                        server_error = Some(e);
                    }
                }
            }
        }

        if server_failures == total {
            if let Some(e) = server_error {
                return Err(e);
            }
        }
        info!(
            total,
            accepted = report.accepted.len(),
            rejected = report.rejected.len(),
            "event batch submitted"
        );
        Ok(report)
    }
}

/// Client-facing text for a rejected item; server-side causes stay in the log.
fn rejection_message(e: &EventsServiceError) -> String {
    match e {
        EventsServiceError::InvalidEvent(reason) => reason.clone(),
        other => other.to_string(),
    }
}

fn invalid(reason: &str) -> EventsServiceError {
    EventsServiceError::InvalidEvent(reason.to_owned())
}
