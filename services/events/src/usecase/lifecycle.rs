use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, info, warn};

use pulse_domain::id::EventId;
use pulse_domain::status::EventStatus;

use crate::domain::processor::EventProcessor;
use crate::domain::repository::{DeadLetterRepository, EventRepository, MonitoringRepository};
use crate::domain::types::{
    ALERT_EVENT_DEAD_LETTERED, CaptureOutcome, Event, FailedEvent, FailureOutcome,
    METRIC_DEAD_LETTERED, ProcessOutcome, RECOVERED_FAILURE_REASON,
};
use crate::error::EventsServiceError;
use crate::usecase::dead_letter::DeadLetterSink;
use crate::usecase::monitoring::MonitoringRecorder;

/// Selection rounds per claim. The second round only runs when concurrent
/// claimers took some of the first round's candidates.
const CLAIM_ROUNDS: usize = 2;

/// Sole writer of event status and retry count.
///
/// Every transition is a compare-and-swap on the stored status; no locks are
/// held between calls.
pub struct LifecycleManager<E, D, M>
where
    E: EventRepository,
    D: DeadLetterRepository,
    M: MonitoringRepository,
{
    pub events: E,
    pub dead_letters: DeadLetterSink<D>,
    pub recorder: MonitoringRecorder<M>,
    /// Failed attempts before dead-lettering. At least 1.
    pub max_retries: u32,
}

impl<E, D, M> LifecycleManager<E, D, M>
where
    E: EventRepository,
    D: DeadLetterRepository,
    M: MonitoringRepository,
{
    /// Claim up to `batch_size` pending events, oldest first, moving each to
    /// `PROCESSING`. Events taken by a concurrent claimer are skipped.
    pub async fn claim_next(&self, batch_size: u32) -> Result<Vec<Event>, EventsServiceError> {
        let mut claimed: Vec<Event> = Vec::new();

        for _ in 0..CLAIM_ROUNDS {
            let wanted = batch_size.saturating_sub(claimed.len() as u32);
            if wanted == 0 {
                break;
            }
            let candidates = match self
                .events
                .list_by_status(EventStatus::Pending, wanted, None)
                .await
            {
                Ok(candidates) => candidates,
                Err(e) if !claimed.is_empty() => {
                    warn!(error = %e, claimed = claimed.len(), "claim round aborted");
                    break;
                }
                Err(e) => return Err(e),
            };
            if candidates.is_empty() {
                break;
            }

            let mut lost = 0usize;
            for event in candidates {
                let result = self
                    .events
                    .update_status(
                        &event.event_id,
                        EventStatus::Pending,
                        EventStatus::Processing,
                        event.retry_count,
                    )
                    .await;
                match result {
                    Ok(()) => {
                        let retry_count = event.retry_count;
                        claimed.push(event.transitioned(
                            EventStatus::Processing,
                            retry_count,
                            Utc::now(),
                        ));
                    }
                    Err(
                        EventsServiceError::StaleTransition { .. }
                        | EventsServiceError::EventNotFound,
                    ) => {
                        debug!(event_id = %event.event_id, "claim lost to another worker");
                        lost += 1;
                    }
                    // Already-claimed events stay PROCESSING; the stuck-event sweep recovers them.
                    Err(e) if !claimed.is_empty() => {
                        warn!(error = %e, claimed = claimed.len(), "claim round aborted");
                        return Ok(claimed);
                    }
                    Err(e) => return Err(e),
                }
            }
            if lost == 0 {
                break;
            }
        }

        if !claimed.is_empty() {
            debug!(claimed = claimed.len(), "events claimed");
        }
        Ok(claimed)
    }

    /// `PROCESSING → COMPLETED`.
    pub async fn complete(&self, event: &Event) -> Result<Event, EventsServiceError> {
        let completed = self
            .transition(event, EventStatus::Completed, event.retry_count)
            .await?;
        info!(
            event_id = %completed.event_id,
            event_type = %completed.event_type,
            "event completed"
        );
        Ok(completed)
    }

    /// Record a failed attempt. Below `max_retries` attempts the event goes
    /// back to `PENDING`; at `max_retries` it becomes `FAILED` and is
    /// dead-lettered.
    ///
    /// Safe to call again after an error: an event already `FAILED` skips
    /// straight to the capture.
    pub async fn fail(
        &self,
        event: &Event,
        reason: &str,
    ) -> Result<FailureOutcome, EventsServiceError> {
        let attempts = event.retry_count.saturating_add(1);

        if attempts < self.max_retries {
            self.transition(event, EventStatus::Pending, attempts).await?;
            info!(
                event_id = %event.event_id,
                retry_count = attempts,
                max_retries = self.max_retries,
                reason,
                "event returned to pending for retry"
            );
            return Ok(FailureOutcome::Retrying {
                retry_count: attempts,
            });
        }

        let failed = match event.status {
            EventStatus::Failed => event.clone(),
            _ => match self
                .transition(event, EventStatus::Failed, attempts.min(self.max_retries))
                .await
            {
                Ok(failed) => failed,
                // An earlier call got this far before its capture failed.
                Err(EventsServiceError::StaleTransition {
                    actual: EventStatus::Failed,
                    ..
                }) => self
                    .events
                    .find_by_event_id(&event.event_id)
                    .await?
                    .ok_or(EventsServiceError::EventNotFound)?,
                Err(e) => return Err(e),
            },
        };
        let failed_event = self.dead_letter(&failed, reason).await?;
        Ok(FailureOutcome::DeadLettered(failed_event))
    }

    /// Dead-letter `FAILED` events last touched before `older_than` that have
    /// no dead-letter record, as left behind by an interrupted `fail`.
    pub async fn recover_dead_letters(
        &self,
        older_than: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<EventId>, EventsServiceError> {
        let stranded = self
            .events
            .list_failed_without_dead_letter(older_than, limit)
            .await?;

        let mut recovered = Vec::with_capacity(stranded.len());
        for event in stranded {
            self.dead_letter(&event, RECOVERED_FAILURE_REASON).await?;
            warn!(
                event_id = %event.event_id,
                failed_since = %event.updated_at,
                "dead-letter record recovered"
            );
            recovered.push(event.event_id);
        }
        Ok(recovered)
    }

    /// Capture a `FAILED` event. The metric and alert are only emitted by the
    /// call that created the record.
    async fn dead_letter(
        &self,
        failed: &Event,
        reason: &str,
    ) -> Result<FailedEvent, EventsServiceError> {
        match self.dead_letters.capture(failed, reason).await? {
            CaptureOutcome::Captured(failed_event) => {
                let now = failed_event.failed_at;
                self.recorder
                    .record_metric(METRIC_DEAD_LETTERED, json!(1), None, now)
                    .await?;
                let detail = format!(
                    "event {} ({}) failed after {} attempts: {}",
                    failed_event.event_id,
                    failed_event.event_type,
                    failed_event.total_retries,
                    failed_event.failure_reason
                );
                self.recorder
                    .raise_alert(ALERT_EVENT_DEAD_LETTERED, &detail, now)
                    .await?;
                Ok(failed_event)
            }
            CaptureOutcome::AlreadyCaptured(existing) => Ok(existing),
        }
    }

    /// Run `processor` over a claimed event and record the result.
    /// A dead-lettered event is reported as `PermanentFailure`.
    pub async fn process<P>(
        &self,
        event: Event,
        processor: &P,
    ) -> Result<ProcessOutcome, EventsServiceError>
    where
        P: EventProcessor,
    {
        let reason = match processor.process(&event).await {
            Ok(()) => return Ok(ProcessOutcome::Completed(self.complete(&event).await?)),
            Err(e) => e.to_string(),
        };
        warn!(event_id = %event.event_id, reason = %reason, "event processing failed");

        match self.fail(&event, &reason).await? {
            FailureOutcome::Retrying { retry_count } => Ok(ProcessOutcome::Retrying {
                event_id: event.event_id,
                retry_count,
            }),
            FailureOutcome::DeadLettered(failed) => Err(EventsServiceError::PermanentFailure {
                event_id: failed.event_id.into_inner(),
                reason: failed.failure_reason,
            }),
        }
    }

    /// Return events stuck in `PROCESSING` since before `older_than` to
    /// `PENDING`, retry count unchanged. Events that moved meanwhile are skipped.
    pub async fn requeue_stuck(
        &self,
        older_than: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<EventId>, EventsServiceError> {
        let stuck = self
            .events
            .list_by_status(EventStatus::Processing, limit, Some(older_than))
            .await?;

        let mut requeued = Vec::with_capacity(stuck.len());
        for event in stuck {
            let result = self
                .events
                .update_status(
                    &event.event_id,
                    EventStatus::Processing,
                    EventStatus::Pending,
                    event.retry_count,
                )
                .await;
            match result {
                Ok(()) => {
                    warn!(
                        event_id = %event.event_id,
                        stuck_since = %event.updated_at,
                        "stuck event returned to pending"
                    );
                    requeued.push(event.event_id);
                }
                Err(
                    EventsServiceError::StaleTransition { .. } | EventsServiceError::EventNotFound,
                ) => {
                    debug!(event_id = %event.event_id, "stuck event moved before requeue");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(requeued)
    }

    /// Conditional `event.status → to`. On a lost race the event is re-read
    /// once: if it is still in the expected status the write is retried once,
    /// otherwise the transition is abandoned with `StaleTransition`.
    async fn transition(
        &self,
        event: &Event,
        to: EventStatus,
        retry_count: u32,
    ) -> Result<Event, EventsServiceError> {
        let from = event.status;
        if !from.can_transition_to(to) {
            return Err(EventsServiceError::InvalidTransition {
                event_id: event.event_id.to_string(),
                from,
                to,
            });
        }

        match self
            .events
            .update_status(&event.event_id, from, to, retry_count)
            .await
        {
            Ok(()) => return Ok(event.clone().transitioned(to, retry_count, Utc::now())),
            Err(EventsServiceError::StaleTransition { .. }) => {}
            Err(e) => return Err(e),
        }

        let current = self
            .events
            .find_by_event_id(&event.event_id)
            .await?
            .ok_or(EventsServiceError::EventNotFound)?;
        if current.status != from {
            warn!(
                event_id = %event.event_id,
                expected = %from,
                actual = %current.status,
                "transition abandoned"
            );
            return Err(EventsServiceError::StaleTransition {
                event_id: event.event_id.to_string(),
                expected: from,
                actual: current.status,
            });
        }

        self.events
            .update_status(&event.event_id, from, to, retry_count)
            .await?;
        Ok(current.transitioned(to, retry_count, Utc::now()))
    }
}
