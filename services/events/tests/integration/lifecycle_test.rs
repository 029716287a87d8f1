use std::collections::HashSet;
use std::sync::atomic::Ordering;

use chrono::{Duration, Utc};

use pulse_domain::status::EventStatus;
use pulse_events::domain::types::{FailureOutcome, ProcessOutcome, RECOVERED_FAILURE_REASON};
use pulse_events::error::EventsServiceError;
use pulse_events::worker::LoggingProcessor;

use crate::helpers::{Harness, RejectingProcessor, pending_event, pending_events};

#[tokio::test]
async fn should_claim_oldest_pending_first() {
    let harness = Harness::new(pending_events(5));
    let lifecycle = harness.lifecycle(3);

    let claimed = lifecycle.claim_next(2).await.unwrap();

    let ids: Vec<&str> = claimed.iter().map(|e| e.event_id.as_str()).collect();
    assert_eq!(ids, ["evt-000", "evt-001"]);
    for event in &claimed {
        assert_eq!(event.status, EventStatus::Processing);
        let stored = harness.events.get(&event.event_id).unwrap();
        assert_eq!(stored.status, EventStatus::Processing);
    }
    let still_pending = harness.events.get(&"evt-002".parse().unwrap()).unwrap();
    assert_eq!(still_pending.status, EventStatus::Pending);
}

#[tokio::test]
async fn should_return_empty_batch_when_nothing_pending() {
    let harness = Harness::new(vec![]);
    let claimed = harness.lifecycle(3).claim_next(10).await.unwrap();
    assert!(claimed.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn should_never_hand_the_same_event_to_concurrent_claimers() {
    let harness = Harness::new(pending_events(40));

    let mut handles = Vec::new();
    for _ in 0..4 {
        let lifecycle = harness.lifecycle(3);
        handles.push(tokio::spawn(async move {
            let mut mine = Vec::new();
            loop {
                let batch = lifecycle.claim_next(5).await.unwrap();
                if batch.is_empty() {
                    break;
                }
                mine.extend(batch.into_iter().map(|e| e.event_id));
            }
            mine
        }));
    }

    let mut seen = HashSet::new();
    let mut total = 0;
    for handle in handles {
        for id in handle.await.unwrap() {
            total += 1;
            assert!(seen.insert(id.clone()), "event {id} claimed twice");
        }
    }
    assert_eq!(total, 40);
    assert_eq!(seen.len(), 40);
}

#[tokio::test]
async fn should_complete_processing_event() {
    let harness = Harness::new(pending_events(1));
    let lifecycle = harness.lifecycle(3);
    let claimed = lifecycle.claim_next(1).await.unwrap().remove(0);

    let completed = lifecycle.complete(&claimed).await.unwrap();

    assert_eq!(completed.status, EventStatus::Completed);
    assert!(completed.processed_at.is_some());
    let stored = harness.events.get(&claimed.event_id).unwrap();
    assert_eq!(stored.status, EventStatus::Completed);
    assert!(stored.processed_at.is_some());
    assert_eq!(stored.timestamp, claimed.timestamp);
}

#[tokio::test]
async fn should_reject_completing_a_pending_event() {
    let events = pending_events(1);
    let harness = Harness::new(events.clone());

    let result = harness.lifecycle(3).complete(&events[0]).await;

    assert!(
        matches!(result, Err(EventsServiceError::InvalidTransition { .. })),
        "expected InvalidTransition, got {result:?}"
    );
}

#[tokio::test]
async fn should_return_to_pending_until_last_attempt() {
    let harness = Harness::new(pending_events(1));
    let lifecycle = harness.lifecycle(3);

    for expected in 1..=2 {
        let claimed = lifecycle.claim_next(1).await.unwrap().remove(0);
        let outcome = lifecycle.fail(&claimed, "downstream timeout").await.unwrap();
        assert_eq!(
            outcome,
            FailureOutcome::Retrying {
                retry_count: expected
            }
        );
        let stored = harness.events.get(&claimed.event_id).unwrap();
        assert_eq!(stored.status, EventStatus::Pending);
        assert_eq!(stored.retry_count, expected);
    }
    assert!(harness.dead_letters.records.lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_dead_letter_exactly_once_after_max_retries() {
    let harness = Harness::new(pending_events(1));
    let lifecycle = harness.lifecycle(3);

    let mut last = None;
    for _ in 0..3 {
        let claimed = lifecycle.claim_next(1).await.unwrap().remove(0);
        last = Some(lifecycle.fail(&claimed, "schema mismatch").await.unwrap());
    }

    let Some(FailureOutcome::DeadLettered(failed)) = last else {
        panic!("expected DeadLettered after three failures");
    };
    assert_eq!(failed.total_retries, 3);
    assert_eq!(failed.failure_reason, "schema mismatch");
    assert_eq!(failed.last_status, EventStatus::Failed);
    assert_eq!(failed.service_name, "pulse-events");

    let stored = harness.events.get(&failed.event_id).unwrap();
    assert_eq!(stored.status, EventStatus::Failed);
    assert_eq!(stored.retry_count, 3);
    assert!(stored.processed_at.is_some());

    assert_eq!(harness.dead_letters.records.lock().unwrap().len(), 1);
    assert_eq!(
        harness.monitoring.metric_names(),
        vec!["events.dead_lettered".to_owned()]
    );
    assert_eq!(
        harness.monitoring.alert_types(),
        vec!["EVENT_DEAD_LETTERED".to_owned()]
    );

    // Nothing left to claim.
    assert!(lifecycle.claim_next(1).await.unwrap().is_empty());
}

#[tokio::test]
async fn should_dead_letter_on_first_failure_when_max_retries_is_one() {
    let harness = Harness::new(pending_events(1));
    let lifecycle = harness.lifecycle(1);
    let claimed = lifecycle.claim_next(1).await.unwrap().remove(0);

    let outcome = lifecycle.fail(&claimed, "bad payload").await.unwrap();

    assert!(matches!(outcome, FailureOutcome::DeadLettered(ref f) if f.total_retries == 1));
}

#[tokio::test]
async fn should_finish_dead_letter_when_fail_is_retried_after_capture_error() {
    let harness = Harness::new(pending_events(1));
    let lifecycle = harness.lifecycle(1);
    let claimed = lifecycle.claim_next(1).await.unwrap().remove(0);

    harness
        .dead_letters
        .fail_next_insert
        .store(true, Ordering::SeqCst);
    let result = lifecycle.fail(&claimed, "bad payload").await;
    assert!(
        matches!(result, Err(EventsServiceError::StorageUnavailable(_))),
        "expected StorageUnavailable, got {result:?}"
    );
    let stranded = harness.events.get(&claimed.event_id).unwrap();
    assert_eq!(stranded.status, EventStatus::Failed);
    assert!(harness.dead_letters.records.lock().unwrap().is_empty());

    // The caller still holds the PROCESSING copy it claimed.
    let outcome = lifecycle.fail(&claimed, "bad payload").await.unwrap();

    let FailureOutcome::DeadLettered(failed) = outcome else {
        panic!("expected DeadLettered, got {outcome:?}");
    };
    assert_eq!(failed.event_id, claimed.event_id);
    assert_eq!(failed.failure_reason, "bad payload");
    assert_eq!(failed.total_retries, 1);
    assert_eq!(harness.dead_letters.records.lock().unwrap().len(), 1);
    assert_eq!(
        harness.monitoring.alert_types(),
        vec!["EVENT_DEAD_LETTERED".to_owned()]
    );

    // A third call finds the record and emits nothing new.
    let again = lifecycle.fail(&stranded, "bad payload").await.unwrap();
    assert!(matches!(again, FailureOutcome::DeadLettered(ref f) if f.id == failed.id));
    assert_eq!(harness.monitoring.alert_types().len(), 1);
    assert_eq!(harness.monitoring.metric_names().len(), 1);
}

#[tokio::test]
async fn should_abandon_transition_when_event_moved_elsewhere() {
    let harness = Harness::new(pending_events(1));
    let lifecycle = harness.lifecycle(3);
    let claimed = lifecycle.claim_next(1).await.unwrap().remove(0);

    // Another actor finished the event behind our back.
    harness.events.force(&claimed.event_id, |e| {
        e.status = EventStatus::Completed;
    });

    let result = lifecycle.fail(&claimed, "late failure").await;

    assert!(
        matches!(
            result,
            Err(EventsServiceError::StaleTransition {
                expected: EventStatus::Processing,
                actual: EventStatus::Completed,
                ..
            })
        ),
        "expected StaleTransition, got {result:?}"
    );
    let stored = harness.events.get(&claimed.event_id).unwrap();
    assert_eq!(stored.status, EventStatus::Completed);
    assert_eq!(stored.retry_count, 0);
}

#[tokio::test]
async fn should_retry_once_after_spurious_lost_race() {
    let harness = Harness::new(pending_events(1));
    let lifecycle = harness.lifecycle(3);
    let claimed = lifecycle.claim_next(1).await.unwrap().remove(0);

    harness.events.spurious_stale.store(true, Ordering::SeqCst);
    let completed = lifecycle.complete(&claimed).await.unwrap();

    assert_eq!(completed.status, EventStatus::Completed);
    let stored = harness.events.get(&claimed.event_id).unwrap();
    assert_eq!(stored.status, EventStatus::Completed);
}

#[tokio::test]
async fn should_process_and_complete_with_accepting_processor() {
    let harness = Harness::new(pending_events(1));
    let lifecycle = harness.lifecycle(3);
    let claimed = lifecycle.claim_next(1).await.unwrap().remove(0);

    let outcome = lifecycle.process(claimed, &LoggingProcessor).await.unwrap();

    let ProcessOutcome::Completed(event) = outcome else {
        panic!("expected Completed");
    };
    assert_eq!(event.status, EventStatus::Completed);
}

#[tokio::test]
async fn should_report_permanent_failure_when_processing_exhausts_retries() {
    let harness = Harness::new(pending_events(1));
    let lifecycle = harness.lifecycle(2);
    let processor = RejectingProcessor("unknown event type");

    let first = lifecycle.claim_next(1).await.unwrap().remove(0);
    let outcome = lifecycle.process(first, &processor).await.unwrap();
    assert!(matches!(
        outcome,
        ProcessOutcome::Retrying { retry_count: 1, .. }
    ));

    let second = lifecycle.claim_next(1).await.unwrap().remove(0);
    let result = lifecycle.process(second, &processor).await;
    assert!(
        matches!(
            result,
            Err(EventsServiceError::PermanentFailure { ref reason, .. }) if reason == "unknown event type"
        ),
        "expected PermanentFailure, got {result:?}"
    );
}

#[tokio::test]
async fn should_requeue_only_events_stuck_past_threshold() {
    let base = Utc::now();
    let harness = Harness::new(vec![
        pending_event("evt-stuck", base, 30),
        pending_event("evt-fresh", base, 20),
        pending_event("evt-idle", base, 10),
    ]);
    let lifecycle = harness.lifecycle(3);
    let claimed = lifecycle.claim_next(2).await.unwrap();
    assert_eq!(claimed.len(), 2);

    let stuck_id = "evt-stuck".parse().unwrap();
    harness.events.force(&stuck_id, |e| {
        e.updated_at = base - Duration::minutes(10);
        e.retry_count = 1;
    });

    let requeued = lifecycle
        .requeue_stuck(base - Duration::minutes(5), 100)
        .await
        .unwrap();

    assert_eq!(requeued, vec![stuck_id.clone()]);
    let stuck = harness.events.get(&stuck_id).unwrap();
    assert_eq!(stuck.status, EventStatus::Pending);
    assert_eq!(stuck.retry_count, 1);
    let fresh = harness.events.get(&"evt-fresh".parse().unwrap()).unwrap();
    assert_eq!(fresh.status, EventStatus::Processing);
}

#[tokio::test]
async fn should_recover_failed_events_missing_a_dead_letter_record() {
    let base = Utc::now();
    let harness = Harness::new(vec![
        pending_event("evt-stranded", base, 30),
        pending_event("evt-captured", base, 20),
    ]);
    let lifecycle = harness.lifecycle(1);
    let claimed = lifecycle.claim_next(2).await.unwrap();

    harness
        .dead_letters
        .fail_next_insert
        .store(true, Ordering::SeqCst);
    assert!(lifecycle.fail(&claimed[0], "timeout").await.is_err());
    lifecycle.fail(&claimed[1], "timeout").await.unwrap();
    assert_eq!(harness.dead_letters.records.lock().unwrap().len(), 1);

    let stranded_id = claimed[0].event_id.clone();
    let cutoff = Utc::now() + Duration::seconds(1);

    let recovered = lifecycle.recover_dead_letters(cutoff, 100).await.unwrap();
    assert_eq!(recovered, vec![stranded_id]);

    let records = harness.dead_letters.records.lock().unwrap().clone();
    assert_eq!(records.len(), 2);
    let record = records
        .iter()
        .find(|r| r.event_id.as_str() == "evt-stranded")
        .unwrap();
    assert_eq!(record.failure_reason, RECOVERED_FAILURE_REASON);
    assert_eq!(record.last_status, EventStatus::Failed);
    assert_eq!(
        harness.monitoring.alert_types(),
        vec!["EVENT_DEAD_LETTERED".to_owned(), "EVENT_DEAD_LETTERED".to_owned()]
    );

    assert!(
        lifecycle
            .recover_dead_letters(cutoff, 100)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn should_leave_recently_failed_events_to_their_caller() {
    let harness = Harness::new(pending_events(1));
    let lifecycle = harness.lifecycle(1);
    let claimed = lifecycle.claim_next(1).await.unwrap().remove(0);
    harness
        .dead_letters
        .fail_next_insert
        .store(true, Ordering::SeqCst);
    assert!(lifecycle.fail(&claimed, "timeout").await.is_err());

    let recovered = lifecycle
        .recover_dead_letters(Utc::now() - Duration::minutes(5), 100)
        .await
        .unwrap();

    assert!(recovered.is_empty());
    assert!(harness.dead_letters.records.lock().unwrap().is_empty());
}
