use serde::{Deserialize, Serialize};

// --- Command gateway API types ---

/// Telnet/SSH session parameters the gateway uses to reach the device
#[derive(Debug, Clone, Serialize)]
pub struct DeviceConnection {
    pub ip_address: String,
    pub username: String,
    pub password: String,
    pub enable_password: String,
    pub timeout: u64,
    pub retries: u32,
    pub connection_type: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecuteRequest<'a> {
    pub device: DeviceConnection,
    pub commands: &'a [String],
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommandOutput {
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExecuteResponse {
    #[serde(default)]
    pub results: Vec<CommandOutput>,
}

impl ExecuteResponse {
    /// Outputs aligned with the commands sent. Missing entries read as empty.
    pub fn into_outputs(self, expected: usize) -> Vec<String> {
        let mut outputs: Vec<String> = self
            .results
            .into_iter()
            .map(|r| r.output.unwrap_or_default())
            .collect();
        outputs.resize(expected, String::new());
        outputs
    }
}
