use std::time::Duration;

use sea_orm::DatabaseConnection;

use crate::config::EventsConfig;
use crate::infra::db::{DbDeadLetterRepository, DbEventRepository, DbMonitoringRepository};
use crate::usecase::dead_letter::DeadLetterSink;
use crate::usecase::lifecycle::LifecycleManager;
use crate::usecase::monitoring::MonitoringRecorder;

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    /// Deadline applied to every store operation.
    pub store_timeout: Duration,
    pub max_retries: u32,
    pub service_name: String,
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: &EventsConfig) -> Self {
        Self {
            db,
            store_timeout: config.store_timeout(),
            max_retries: config.max_retries,
            service_name: config.service_name.clone(),
        }
    }

    pub fn event_repo(&self) -> DbEventRepository {
        DbEventRepository {
            db: self.db.clone(),
            timeout: self.store_timeout,
        }
    }

    pub fn dead_letter_repo(&self) -> DbDeadLetterRepository {
        DbDeadLetterRepository {
            db: self.db.clone(),
            timeout: self.store_timeout,
        }
    }

    pub fn monitoring_repo(&self) -> DbMonitoringRepository {
        DbMonitoringRepository {
            db: self.db.clone(),
            timeout: self.store_timeout,
        }
    }

    pub fn dead_letter_sink(&self) -> DeadLetterSink<DbDeadLetterRepository> {
        DeadLetterSink {
            repo: self.dead_letter_repo(),
            service_name: self.service_name.clone(),
        }
    }

    pub fn recorder(&self) -> MonitoringRecorder<DbMonitoringRepository> {
        MonitoringRecorder {
            repo: self.monitoring_repo(),
        }
    }

    pub fn lifecycle(
        &self,
    ) -> LifecycleManager<DbEventRepository, DbDeadLetterRepository, DbMonitoringRepository> {
        LifecycleManager {
            events: self.event_repo(),
            dead_letters: self.dead_letter_sink(),
            recorder: self.recorder(),
            max_retries: self.max_retries,
        }
    }
}
