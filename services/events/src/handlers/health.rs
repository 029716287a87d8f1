use axum::{Json, extract::State, http::StatusCode};
use tracing::warn;

use pulse_core::health::{HealthStatus, down, up};

use crate::state::AppState;

// ── GET /healthz ─────────────────────────────────────────────────────────────

pub async fn healthz(State(state): State<AppState>) -> (StatusCode, Json<HealthStatus>) {
    up(state.service_name.as_str())
}

// ── GET /readyz ──────────────────────────────────────────────────────────────

/// Ready once the database answers a ping within the store timeout.
pub async fn readyz(State(state): State<AppState>) -> (StatusCode, Json<HealthStatus>) {
    match tokio::time::timeout(state.store_timeout, state.db.ping()).await {
        Ok(Ok(())) => up(state.service_name.as_str()),
        Ok(Err(e)) => {
            warn!(error = %e, "database ping failed");
            down(state.service_name.as_str())
        }
        Err(_) => {
            warn!("database ping timed out");
            down(state.service_name.as_str())
        }
    }
}
