//! Background tasks of the events binary: the processing worker, the
//! stuck-event sweep (which also repairs interrupted dead-lettering) and the
//! metrics collector.

use std::time::Duration;

use chrono::Utc;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::config::EventsConfig;
use crate::domain::processor::{EventProcessor, ProcessingError};
use crate::domain::repository::{DeadLetterRepository, EventRepository, MonitoringRepository};
use crate::domain::types::{Event, ProcessOutcome};
use crate::error::EventsServiceError;
use crate::state::AppState;
use crate::usecase::lifecycle::LifecycleManager;
use crate::usecase::monitoring::CollectMetricsUseCase;

/// Default processor: logs the event by type and accepts it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingProcessor;

impl EventProcessor for LoggingProcessor {
    async fn process(&self, event: &Event) -> Result<(), ProcessingError> {
        info!(
            event_id = %event.event_id,
            event_type = %event.event_type,
            retry_count = event.retry_count,
            "processing event"
        );
        Ok(())
    }
}

/// Claims pending events and runs them through a processor.
pub struct Worker<E, D, M, P>
where
    E: EventRepository,
    D: DeadLetterRepository,
    M: MonitoringRepository,
    P: EventProcessor,
{
    pub lifecycle: LifecycleManager<E, D, M>,
    pub processor: P,
    pub batch_size: u32,
}

impl<E, D, M, P> Worker<E, D, M, P>
where
    E: EventRepository,
    D: DeadLetterRepository,
    M: MonitoringRepository,
    P: EventProcessor,
{
    /// One poll: claim a batch and process each event. Per-event failures are
    /// logged and do not stop the batch. Returns the number of events claimed.
    pub async fn run_once(&self) -> Result<usize, EventsServiceError> {
        let claimed = self.lifecycle.claim_next(self.batch_size).await?;
        let count = claimed.len();
        for event in claimed {
            let event_id = event.event_id.clone();
            match self.lifecycle.process(event, &self.processor).await {
                Ok(ProcessOutcome::Completed(_)) => {}
                Ok(ProcessOutcome::Retrying { retry_count, .. }) => {
                    info!(%event_id, retry_count, "event scheduled for retry");
                }
                Err(e @ EventsServiceError::PermanentFailure { .. }) => {
                    warn!(%event_id, error = %e, "event permanently failed");
                }
                Err(e) => {
                    error!(
                        %event_id,
                        error = %e,
                        kind = e.kind(),
                        "failed to record processing result"
                    );
                }
            }
        }
        Ok(count)
    }

    pub async fn run(self, poll_interval: Duration) {
        let mut ticker = ticker(poll_interval);
        loop {
            ticker.tick().await;
            if let Err(e) = self.run_once().await {
                error!(error = %e, kind = e.kind(), "worker poll failed");
            }
        }
    }
}

fn ticker(period: Duration) -> Interval {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

/// Spawn the worker, the stuck-event sweep and the metrics collector.
/// They run until the process exits.
pub fn spawn_background_tasks(state: &AppState, config: &EventsConfig) {
    let worker = Worker {
        lifecycle: state.lifecycle(),
        processor: LoggingProcessor,
        batch_size: config.claim_batch_size,
    };
    tokio::spawn(worker.run(config.worker_poll_interval()));

    let sweep = state.lifecycle();
    let stuck_after = config.stuck_processing_after();
    let sweep_limit = config.claim_batch_size;
    tokio::spawn(async move {
        // Checking at a tenth of the threshold bounds how long past it an event can sit.
        let mut ticker = ticker((stuck_after / 10).max(Duration::from_secs(1)));
        loop {
            ticker.tick().await;
            let Some(cutoff) = chrono::Duration::from_std(stuck_after)
                .ok()
                .and_then(|age| Utc::now().checked_sub_signed(age))
            else {
                error!(?stuck_after, "stuck-event threshold out of range; sweep disabled");
                return;
            };
            match sweep.requeue_stuck(cutoff, sweep_limit).await {
                Ok(requeued) if !requeued.is_empty() => {
                    warn!(count = requeued.len(), "stuck events requeued");
                }
                Ok(_) => {}
                Err(e) => error!(error = %e, kind = e.kind(), "stuck-event sweep failed"),
            }
            match sweep.recover_dead_letters(cutoff, sweep_limit).await {
                Ok(recovered) if !recovered.is_empty() => {
                    warn!(count = recovered.len(), "stranded failed events dead-lettered");
                }
                Ok(_) => {}
                Err(e) => error!(error = %e, kind = e.kind(), "dead-letter recovery failed"),
            }
        }
    });

    let collector = CollectMetricsUseCase {
        events: state.event_repo(),
        recorder: state.recorder(),
        error_rate_threshold: config.error_rate_threshold,
        processing_alert_threshold: config.processing_alert_threshold,
    };
    let metrics_interval = config.metrics_interval();
    tokio::spawn(async move {
        let mut ticker = ticker(metrics_interval);
        loop {
            ticker.tick().await;
            if let Err(e) = collector.execute().await {
                error!(error = %e, kind = e.kind(), "metrics collection failed");
            }
        }
    });
}
