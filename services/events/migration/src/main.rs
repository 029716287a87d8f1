use sea_orm_migration::prelude::*;

#[tokio::main]
async fn main() {
    cli::run_cli(pulse_events_migration::Migrator).await;
}
