use axum::{
    Router,
    routing::{get, patch, post},
};
use tower_http::trace::TraceLayer;

use pulse_core::middleware::{propagate_request_id_layer, request_id_layer};

use crate::handlers::{
    events::{get_event, list_failed_events, list_recent_events, submit_batch, submit_event},
    health::{healthz, readyz},
    monitoring::{list_alerts, list_metrics, record_metric, resolve_alert},
};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Events
        .route("/api/events", post(submit_event).get(list_recent_events))
        .route("/api/events/batch", post(submit_batch))
        .route("/api/events/{event_id}", get(get_event))
        .route("/api/failed-events", get(list_failed_events))
        // Monitoring
        .route("/api/metrics", post(record_metric).get(list_metrics))
        .route("/api/alerts", get(list_alerts))
        .route("/api/alerts/{alert_id}", patch(resolve_alert))
        .with_state(state)
        // Outermost last: the request id must exist before the trace span opens.
        .layer(propagate_request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(request_id_layer())
}
