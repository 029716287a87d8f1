use pulse_domain::status::EventStatus;
use pulse_events::worker::{LoggingProcessor, Worker};

use crate::helpers::{Harness, RejectingProcessor, pending_events};

#[tokio::test]
async fn should_complete_claimed_batch() {
    let harness = Harness::new(pending_events(5));
    let worker = Worker {
        lifecycle: harness.lifecycle(3),
        processor: LoggingProcessor,
        batch_size: 3,
    };

    assert_eq!(worker.run_once().await.unwrap(), 3);
    assert_eq!(worker.run_once().await.unwrap(), 2);
    assert_eq!(worker.run_once().await.unwrap(), 0);

    let events = harness.events.events.lock().unwrap();
    assert!(events.iter().all(|e| e.status == EventStatus::Completed));
}

#[tokio::test]
async fn should_dead_letter_events_the_processor_keeps_rejecting() {
    let harness = Harness::new(pending_events(2));
    let worker = Worker {
        lifecycle: harness.lifecycle(3),
        processor: RejectingProcessor("payload missing orderId"),
        batch_size: 10,
    };

    for _ in 0..3 {
        assert_eq!(worker.run_once().await.unwrap(), 2);
    }
    assert_eq!(worker.run_once().await.unwrap(), 0);

    {
        let events = harness.events.events.lock().unwrap();
        assert!(
            events
                .iter()
                .all(|e| e.status == EventStatus::Failed && e.retry_count == 3)
        );
    }
    let records = harness.dead_letters.records.lock().unwrap();
    assert_eq!(records.len(), 2);
    assert!(
        records
            .iter()
            .all(|r| r.failure_reason == "payload missing orderId" && r.total_retries == 3)
    );
}
