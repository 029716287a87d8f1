use anyhow::anyhow;
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use pulse_domain::id::EventId;
use pulse_domain::pagination::RecentWindow;

use crate::domain::repository::DeadLetterRepository;
use crate::domain::types::{CaptureOutcome, Event, FailedEvent};
use crate::error::EventsServiceError;

/// Sole writer of dead-letter records.
pub struct DeadLetterSink<D>
where
    D: DeadLetterRepository,
{
    pub repo: D,
    /// Recorded on every captured event.
    pub service_name: String,
}

impl<D> DeadLetterSink<D>
where
    D: DeadLetterRepository,
{
    /// Record `event` as permanently failed. A second capture of the same
    /// event id leaves the first record untouched and returns it.
    pub async fn capture(
        &self,
        event: &Event,
        failure_reason: &str,
    ) -> Result<CaptureOutcome, EventsServiceError> {
        let failed = FailedEvent {
            id: Uuid::new_v4(),
            event_id: event.event_id.clone(),
            event_type: event.event_type.clone(),
            original_timestamp: event.timestamp,
            failed_at: Utc::now(),
            failure_reason: failure_reason.to_owned(),
            total_retries: event.retry_count,
            last_status: event.status,
            payload: event.payload.clone(),
            service_name: self.service_name.clone(),
        };

        if self.repo.insert_if_absent(&failed).await? {
            info!(
                event_id = %failed.event_id,
                event_type = %failed.event_type,
                total_retries = failed.total_retries,
                reason = %failed.failure_reason,
                "event dead-lettered"
            );
            return Ok(CaptureOutcome::Captured(failed));
        }

        warn!(event_id = %event.event_id, "event already dead-lettered; capture skipped");
        let existing = self
            .repo
            .find_by_event_id(&event.event_id)
            .await?
            .ok_or_else(|| anyhow!("dead-letter record for {} vanished", event.event_id))?;
        Ok(CaptureOutcome::AlreadyCaptured(existing))
    }

    pub async fn find(
        &self,
        event_id: &EventId,
    ) -> Result<Option<FailedEvent>, EventsServiceError> {
        self.repo.find_by_event_id(event_id).await
    }

    /// Newest first, at most 50.
    pub async fn list(
        &self,
        window: RecentWindow,
    ) -> Result<Vec<FailedEvent>, EventsServiceError> {
        self.repo.list_recent(window.clamped().limit).await
    }
}
