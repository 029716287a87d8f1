use chrono::{Duration, Utc};
use serde_json::json;

use pulse_domain::pagination::RecentWindow;
use pulse_events::domain::types::MetricQuery;
use pulse_events::error::EventsServiceError;
use pulse_events::usecase::monitoring::CollectMetricsUseCase;

use crate::helpers::{Harness, pending_event, pending_events};

#[tokio::test]
async fn should_filter_metrics_by_name_and_time_range() {
    let harness = Harness::new(vec![]);
    let recorder = harness.recorder();
    let now = Utc::now();

    for (name, minutes_ago) in [
        ("events.total", 30),
        ("events.total", 10),
        ("events.failed", 10),
        ("events.total", 1),
    ] {
        recorder
            .record_metric(name, json!(minutes_ago), None, now - Duration::minutes(minutes_ago))
            .await
            .unwrap();
    }

    let metrics = recorder
        .metrics(MetricQuery {
            name: Some("events.total".into()),
            from: Some(now - Duration::minutes(15)),
            to: Some(now),
            limit: 50,
        })
        .await
        .unwrap();

    let values: Vec<i64> = metrics.iter().filter_map(|m| m.value.as_i64()).collect();
    assert_eq!(values, [1, 10]);
    assert!(metrics.iter().all(|m| m.unit == "COUNT"));
}

#[tokio::test]
async fn should_reject_inverted_metric_range() {
    let harness = Harness::new(vec![]);
    let now = Utc::now();

    let result = harness
        .recorder()
        .metrics(MetricQuery {
            from: Some(now),
            to: Some(now - Duration::minutes(1)),
            ..MetricQuery::default()
        })
        .await;

    assert!(
        matches!(result, Err(EventsServiceError::InvalidRequest(_))),
        "expected InvalidRequest, got {result:?}"
    );
}

#[tokio::test]
async fn should_resolve_alert_once() {
    let harness = Harness::new(vec![]);
    let recorder = harness.recorder();
    let alert = recorder
        .raise_alert("HIGH_ERROR_RATE", "error rate 12.50% exceeds 5.00%", Utc::now())
        .await
        .unwrap();

    recorder.resolve_alert(alert.id).await.unwrap();

    let resolved = recorder
        .alerts(Some(true), RecentWindow::default())
        .await
        .unwrap();
    assert_eq!(resolved.len(), 1);
    assert!(resolved[0].resolved_at.is_some());
    assert!(
        recorder
            .alerts(Some(false), RecentWindow::default())
            .await
            .unwrap()
            .is_empty()
    );

    let again = recorder.resolve_alert(alert.id).await;
    assert!(
        matches!(again, Err(EventsServiceError::AlertNotFound)),
        "expected AlertNotFound, got {again:?}"
    );
}

#[tokio::test]
async fn should_raise_threshold_alerts_from_live_counts() {
    let harness = Harness::new(pending_events(6));
    let lifecycle = harness.lifecycle(1);

    // 2 completed, 2 dead-lettered, 2 left processing.
    let claimed = lifecycle.claim_next(6).await.unwrap();
    for event in &claimed[..2] {
        lifecycle.complete(event).await.unwrap();
    }
    for event in &claimed[2..4] {
        lifecycle.fail(event, "validation error").await.unwrap();
    }

    let collector = CollectMetricsUseCase {
        events: harness.events.clone(),
        recorder: harness.recorder(),
        error_rate_threshold: 5.0,
        processing_alert_threshold: 1,
    };
    let report = collector.execute().await.unwrap();

    assert_eq!(report.counts.completed, 2);
    assert_eq!(report.counts.failed, 2);
    assert_eq!(report.counts.processing, 2);
    assert_eq!(report.error_rate, Some(50.0));

    let raised: Vec<&str> = report.alerts.iter().map(|a| a.alert_type.as_str()).collect();
    assert_eq!(raised, ["HIGH_ERROR_RATE", "HIGH_PROCESSING_QUEUE"]);

    let alert_types = harness.monitoring.alert_types();
    assert_eq!(
        alert_types
            .iter()
            .filter(|t| t.as_str() == "EVENT_DEAD_LETTERED")
            .count(),
        2
    );
    assert!(
        harness
            .monitoring
            .metric_names()
            .contains(&"events.error_rate".to_owned())
    );
}

#[tokio::test]
async fn should_record_recent_events_and_throughput_since_last_total() {
    let base = Utc::now();
    let harness = Harness::new(vec![
        pending_event("evt-old", base, 600),
        pending_event("evt-a", base, 20),
        pending_event("evt-b", base, 10),
        pending_event("evt-c", base, 5),
    ]);
    let recorder = harness.recorder();
    recorder
        .record_metric("events.total", json!(1), None, base - Duration::seconds(30))
        .await
        .unwrap();

    let collector = CollectMetricsUseCase {
        events: harness.events.clone(),
        recorder: harness.recorder(),
        error_rate_threshold: 5.0,
        processing_alert_threshold: 100,
    };
    let report = collector.execute().await.unwrap();

    assert_eq!(report.counts.total(), 4);
    assert_eq!(report.recent, 3);
    let throughput = report.throughput.expect("previous total was sampled");
    assert!(
        (throughput - 0.1).abs() < 0.01,
        "expected about 3 events over 30s, got {throughput}"
    );

    let recent = recorder
        .metrics(MetricQuery {
            name: Some("events.recent".into()),
            limit: 1,
            ..MetricQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(recent[0].value, json!(3));
    let rate = recorder
        .metrics(MetricQuery {
            name: Some("events.throughput".into()),
            limit: 1,
            ..MetricQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(rate[0].unit, "COUNT_PER_SECOND");
}

#[tokio::test]
async fn should_skip_throughput_on_first_collection() {
    let harness = Harness::new(pending_events(2));
    let collector = CollectMetricsUseCase {
        events: harness.events.clone(),
        recorder: harness.recorder(),
        error_rate_threshold: 5.0,
        processing_alert_threshold: 100,
    };

    let first = collector.execute().await.unwrap();
    assert_eq!(first.throughput, None);
    assert!(
        !harness
            .monitoring
            .metric_names()
            .contains(&"events.throughput".to_owned())
    );

    // Nothing was submitted in between.
    let second = collector.execute().await.unwrap();
    assert_eq!(second.throughput.unwrap_or_default(), 0.0);
}
