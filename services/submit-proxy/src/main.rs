use tracing::info;

use pulse_core::config::Config;
use pulse_core::tracing::init_tracing;
use pulse_submit_proxy::config::ProxyConfig;
use pulse_submit_proxy::router::build_router;
use pulse_submit_proxy::state::ProxyState;

#[tokio::main]
async fn main() {
    init_tracing();

    let config = ProxyConfig::load().expect("invalid proxy configuration");
    let state = ProxyState::new(&config).expect("failed to build proxy state");
    let submit_url = state.submit_url.clone();

    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.proxy_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");

    info!(%submit_url, "submit proxy listening on {addr}");
    axum::serve(listener, router).await.expect("server error");
}
