use sea_orm::{ConnectOptions, Database};
use tracing::info;

use pulse_core::config::Config;
use pulse_core::tracing::init_tracing;
use pulse_events::config::EventsConfig;
use pulse_events::router::build_router;
use pulse_events::state::AppState;
use pulse_events::worker::spawn_background_tasks;

#[tokio::main]
async fn main() {
    init_tracing();

    let config = EventsConfig::load().expect("invalid events configuration");

    let mut options = ConnectOptions::new(config.database_url.clone());
    options
        .acquire_timeout(config.store_timeout())
        .sqlx_logging(false);
    let db = Database::connect(options)
        .await
        .expect("failed to connect to database");

    let state = AppState::new(db, &config);
    spawn_background_tasks(&state, &config);

    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.events_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");

    info!(
        max_retries = config.max_retries,
        batch_size = config.claim_batch_size,
        "events service listening on {addr}"
    );
    axum::serve(listener, router).await.expect("server error");
}
