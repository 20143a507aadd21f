use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::types::*;
use super::CommandGateway;
use crate::config::GatewayConfig;
use crate::models::Olt;

/// HTTP client for the remote command-execution gateway
pub struct GatewayClient {
    base_url: String,
    defaults: GatewayConfig,
    client: Client,
}

impl GatewayClient {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            defaults: config.clone(),
            client,
        })
    }

    fn execute_url(&self) -> String {
        format!("{}/execute", self.base_url)
    }

    /// Connection block for an OLT; per-device credentials win over configured defaults
    pub fn device_connection(&self, olt: &Olt) -> DeviceConnection {
        let pick = |own: &Option<String>, fallback: &str| {
            own.clone().unwrap_or_else(|| fallback.to_string())
        };

        DeviceConnection {
            ip_address: olt.ip_address.clone(),
            username: pick(&olt.username, &self.defaults.username),
            password: pick(&olt.password, &self.defaults.password),
            enable_password: pick(&olt.enable_password, &self.defaults.enable_password),
            timeout: self.defaults.device_timeout_secs,
            retries: self.defaults.retries,
            connection_type: self.defaults.connection_type.clone(),
            port: olt.port.unwrap_or(self.defaults.port),
        }
    }
}

#[async_trait]
impl CommandGateway for GatewayClient {
    async fn execute(&self, olt: &Olt, commands: &[String], timeout: Duration) -> Result<Vec<String>> {
        let body = ExecuteRequest {
            device: self.device_connection(olt),
            commands,
        };

        let resp = self
            .client
            .post(self.execute_url())
            .header("Accept", "application/json")
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Gateway request failed for OLT {}", olt.name))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Gateway API error {}: {}", status, body));
        }

        let parsed: ExecuteResponse = resp
            .json()
            .await
            .context("Failed to decode gateway response")?;
        Ok(parsed.into_outputs(commands.len()))
    }
}
