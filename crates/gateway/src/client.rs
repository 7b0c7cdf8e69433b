use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Gateway, GatewayError, GatewayRequest, GatewayResponse, Result};

pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    pub url: String,
    pub timeout_secs: u64,
    pub proxy: Option<String>,
}

impl GatewayConfig {
    pub fn new<S: Into<String>>(url: S) -> Self {
        Self {
            url: url.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            proxy: None,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Talks to the gateway over HTTP: every call is a JSON `POST` to the one
/// configured url.
pub struct HttpGateway {
    pub config: GatewayConfig,
    client: reqwest::Client,
}

impl HttpGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        /* build a new http client with optional proxy */
        let builder = reqwest::Client::builder().timeout(config.timeout());
        let client = if let Some(proxy_url) = &config.proxy {
            log::info!("Using proxy '{proxy_url}' for gateway '{}'.", config.url);
            builder.proxy(reqwest::Proxy::all(proxy_url)?).build()?
        } else {
            builder.build()?
        };

        Ok(Self {
            config: config.clone(),
            client,
        })
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn send(&self, request: GatewayRequest) -> Result<GatewayResponse> {
        let url = &self.config.url;
        log::debug!("Posting action '{}' to '{url}'.", request.action());

        /* perform post-request */
        let response = self.client.post(url).json(&request).send().await?;

        /* parse response */
        let status_code = response.status();
        if status_code.is_success() {
            let text = response.text().await?;
            Ok(serde_json::from_str(&text)?)
        } else {
            Err(GatewayError::InvalidResponse {
                status_code,
                url: url.clone(),
                response: response.text().await.ok(),
            })
        }
    }
}
