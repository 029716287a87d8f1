use anyhow::Context;
use reqwest::Client;

use crate::config::ProxyConfig;

#[derive(Clone)]
pub struct ProxyState {
    pub client: Client,
    pub submit_url: String,
    pub service_name: String,
}

impl ProxyState {
    pub fn new(config: &ProxyConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            submit_url: config.submit_url(),
            service_name: config.service_name.clone(),
        })
    }
}
