pub use sea_orm_migration::prelude::*;

mod m20261019_000001_create_events;
mod m20261019_000002_create_failed_events;
mod m20261019_000003_create_metrics;
mod m20261019_000004_create_alerts;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261019_000001_create_events::Migration),
            Box::new(m20261019_000002_create_failed_events::Migration),
            Box::new(m20261019_000003_create_metrics::Migration),
            Box::new(m20261019_000004_create_alerts::Migration),
        ]
    }
}
