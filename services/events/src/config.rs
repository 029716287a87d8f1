use std::time::Duration;

use anyhow::bail;
use serde::Deserialize;

use pulse_core::config::Config;

use crate::domain::types::{DEFAULT_CLAIM_BATCH_SIZE, DEFAULT_MAX_RETRIES};

/// Events service configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct EventsConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// TCP port to listen on (default 3120). Env var: `EVENTS_PORT`.
    #[serde(default = "default_events_port")]
    pub events_port: u16,
    /// Failed attempts before an event is dead-lettered. Must be at least 1.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Events claimed per worker poll.
    #[serde(default = "default_claim_batch_size")]
    pub claim_batch_size: u32,
    /// Deadline for every store operation, in milliseconds.
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,
    #[serde(default = "default_worker_poll_interval_ms")]
    pub worker_poll_interval_ms: u64,
    /// Age after which a `PROCESSING` event is returned to `PENDING`.
    #[serde(default = "default_stuck_processing_secs")]
    pub stuck_processing_secs: u64,
    #[serde(default = "default_metrics_interval_secs")]
    pub metrics_interval_secs: u64,
    /// Error rate (percent) above which `HIGH_ERROR_RATE` is raised.
    #[serde(default = "default_error_rate_threshold")]
    pub error_rate_threshold: f64,
    /// Processing count above which `HIGH_PROCESSING_QUEUE` is raised.
    #[serde(default = "default_processing_alert_threshold")]
    pub processing_alert_threshold: u64,
    /// Recorded on every dead-lettered event and in health responses.
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

fn default_events_port() -> u16 {
    3120
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_claim_batch_size() -> u32 {
    DEFAULT_CLAIM_BATCH_SIZE
}

fn default_store_timeout_ms() -> u64 {
    5000
}

fn default_worker_poll_interval_ms() -> u64 {
    1000
}

fn default_stuck_processing_secs() -> u64 {
    300
}

fn default_metrics_interval_secs() -> u64 {
    60
}

fn default_error_rate_threshold() -> f64 {
    5.0
}

fn default_processing_alert_threshold() -> u64 {
    100
}

fn default_service_name() -> String {
    "pulse-events".to_owned()
}

impl EventsConfig {
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn worker_poll_interval(&self) -> Duration {
        Duration::from_millis(self.worker_poll_interval_ms)
    }

    pub fn stuck_processing_after(&self) -> Duration {
        Duration::from_secs(self.stuck_processing_secs)
    }

    pub fn metrics_interval(&self) -> Duration {
        Duration::from_secs(self.metrics_interval_secs)
    }
}

impl Config for EventsConfig {
    fn validate(&self) -> anyhow::Result<()> {
        if self.max_retries == 0 {
            bail!("MAX_RETRIES must be at least 1");
        }
        if self.claim_batch_size == 0 {
            bail!("CLAIM_BATCH_SIZE must be at least 1");
        }
        if self.store_timeout_ms == 0 {
            bail!("STORE_TIMEOUT_MS must be positive");
        }
        if self.worker_poll_interval_ms == 0
            || self.metrics_interval_secs == 0
            || self.stuck_processing_secs == 0
        {
            bail!(
                "WORKER_POLL_INTERVAL_MS, METRICS_INTERVAL_SECS and STUCK_PROCESSING_SECS must be positive"
            );
        }
        if !(0.0..=100.0).contains(&self.error_rate_threshold) {
            bail!("ERROR_RATE_THRESHOLD must be a percentage between 0 and 100");
        }
        if self.service_name.trim().is_empty() {
            bail!("SERVICE_NAME must not be empty");
        }
        Ok(())
    }
}
