use std::time::Duration;

use anyhow::{Context as _, ensure};
use serde::Deserialize;
use url::Url;

use pulse_core::config::Config;

/// Submit proxy configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    /// Base URL of the events service, e.g. `http://events:3120`.
    pub events_url: String,
    #[serde(default = "default_proxy_port")]
    pub proxy_port: u16,
    /// Deadline for one forwarded request, in milliseconds.
    #[serde(default = "default_proxy_timeout_ms")]
    pub proxy_timeout_ms: u64,
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

fn default_proxy_port() -> u16 {
    3121
}

fn default_proxy_timeout_ms() -> u64 {
    10_000
}

fn default_service_name() -> String {
    "pulse-submit-proxy".to_owned()
}

impl ProxyConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.proxy_timeout_ms)
    }

    /// Where submissions are forwarded.
    pub fn submit_url(&self) -> String {
        format!("{}/api/events", self.events_url.trim_end_matches('/'))
    }
}

impl Config for ProxyConfig {
    fn validate(&self) -> anyhow::Result<()> {
        let url = Url::parse(&self.events_url).context("EVENTS_URL must be a valid URL")?;
        ensure!(
            matches!(url.scheme(), "http" | "https") && url.host_str().is_some(),
            "EVENTS_URL must be an http(s) URL with a host"
        );
        ensure!(self.proxy_timeout_ms > 0, "PROXY_TIMEOUT_MS must be positive");
        Ok(())
    }
}
