pub mod client;
pub mod types;

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

use crate::models::Olt;

pub use client::GatewayClient;

/// Typed error for a failed device call, surfaced to API clients as 502
#[derive(Debug)]
pub struct GatewayError {
    pub olt: String,
    pub message: String,
}

impl GatewayError {
    pub fn new(olt: &Olt, err: &anyhow::Error) -> Self {
        Self {
            olt: olt.name.clone(),
            message: format!("{:#}", err),
        }
    }
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Command gateway failed for OLT {}: {}", self.olt, self.message)
    }
}

impl std::error::Error for GatewayError {}

/// Executes command lists against a physical device and returns one output per command
#[async_trait]
pub trait CommandGateway: Send + Sync {
    async fn execute(&self, olt: &Olt, commands: &[String], timeout: Duration) -> Result<Vec<String>>;
}

/// Run a read-only command list, retrying up to `attempts` times.
/// State-changing commands must go through `CommandGateway::execute` directly.
pub async fn execute_read<G: CommandGateway + ?Sized>(
    gateway: &G,
    olt: &Olt,
    commands: &[String],
    timeout: Duration,
    attempts: u32,
) -> Result<Vec<String>> {
    let attempts = attempts.max(1);
    let mut last_err = None;

    for attempt in 1..=attempts {
        match gateway.execute(olt, commands, timeout).await {
            Ok(outputs) => return Ok(outputs),
            Err(e) => {
                tracing::debug!("Read attempt {}/{} on OLT {} failed: {}", attempt, attempts, olt.name, e);
                last_err = Some(e);
            }
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("No attempts made against OLT {}", olt.name)))
}
