//! HTTP fetches for static assets (deployment config, contract ABIs).

use anyhow::anyhow;
use async_trait::async_trait;
use gloo_net::http::Request;
use gw_config::AppConfig;
use gw_contracts::AbiSource;
use tracing::{debug, warn};

pub struct HttpAbiSource;

#[async_trait(?Send)]
impl AbiSource for HttpAbiSource {
    async fn fetch(&self, path: &str) -> anyhow::Result<String> {
        let response = Request::get(path)
            .send()
            .await
            .map_err(|err| anyhow!("fetch {path}: {err}"))?;
        if !response.ok() {
            anyhow::bail!("{} {}", response.status(), response.status_text());
        }
        response
            .text()
            .await
            .map_err(|err| anyhow!("read {path}: {err}"))
    }
}

const CONFIG_PATH: &str = "config.json";

/// Deployment config served next to the page; falls back to the built-in
/// opBNB deployment when absent or invalid.
pub async fn load_config() -> AppConfig {
    let raw = match HttpAbiSource.fetch(CONFIG_PATH).await {
        Ok(raw) => raw,
        Err(err) => {
            debug!("no {CONFIG_PATH} ({err}); using built-in deployment");
            return AppConfig::opbnb();
        }
    };
    match AppConfig::from_json(&raw) {
        Ok(config) => config,
        Err(err) => {
            warn!("{CONFIG_PATH} rejected: {err}; using built-in deployment");
            AppConfig::opbnb()
        }
    }
}
