use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Directives used when `RUST_LOG` is unset or unparsable. Query logging from
/// the database driver is noisy at `info`.
const DEFAULT_FILTER: &str = "info,sqlx=warn,sea_orm=warn";

/// Install the JSON stdout subscriber shared by every Pulse binary.
///
/// Event fields are flattened to the top level so log pipelines can index
/// `event_id`, `kind` and friends directly. Repeated calls are no-ops.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .json()
                .flatten_event(true)
                .with_current_span(false)
                .with_target(true),
        )
        .try_init();
}
