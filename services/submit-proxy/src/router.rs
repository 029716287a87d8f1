use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use pulse_core::middleware::{propagate_request_id_layer, request_id_layer};

use crate::handlers::{healthz, submit};
use crate::state::ProxyState;

pub fn build_router(state: ProxyState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/submit", post(submit))
        .with_state(state)
        .layer(propagate_request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(request_id_layer())
}
