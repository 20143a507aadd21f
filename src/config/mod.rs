use std::env;
use std::time::Duration;

use crate::commands::SyntheticIds;

/// Config holds all application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub db_max_connections: u32,
    pub listen_addr: String,
    pub gateway: GatewayConfig,
    pub sync: SyncConfig,
    /// Service-port used for dialect B OLTs that don't declare their own
    pub default_service_port: u32,
    pub dialect_b_ids: SyntheticIds,
}

/// Connection defaults sent to the remote command gateway with every request
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub url: String,
    /// Upper bound for a single HTTP call to the gateway
    pub request_timeout_secs: u64,
    pub username: String,
    pub password: String,
    pub enable_password: String,
    pub port: u16,
    pub connection_type: String,
    /// Telnet session timeout the gateway applies on the device side
    pub device_timeout_secs: u64,
    pub retries: u32,
    /// Timeout for on-demand single-interface reads
    pub read_timeout_secs: u64,
    /// Timeout for state-changing command lists
    pub change_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Cron expression for scheduled passes. Empty disables the scheduler.
    pub schedule: String,
    pub detail_batch_size: usize,
    pub read_attempts: u32,
    pub config_timeout_secs: u64,
    pub detail_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn load() -> Self {
        Self {
            db_path: get_env("DB_PATH", "/data/olt-sync.db"),
            db_max_connections: get_env_parsed("DB_MAX_CONNECTIONS", 5),
            listen_addr: get_env("LISTEN_ADDR", "0.0.0.0:8080"),
            gateway: GatewayConfig {
                url: get_env("GATEWAY_URL", "http://127.0.0.1:8000"),
                request_timeout_secs: get_env_parsed("GATEWAY_TIMEOUT_SECS", 120),
                username: get_env("OLT_USERNAME", ""),
                password: get_env("OLT_PASSWORD", ""),
                enable_password: get_env("OLT_ENABLE_PASSWORD", ""),
                port: get_env_parsed("OLT_PORT", 23),
                connection_type: get_env("OLT_CONNECTION_TYPE", "telnet"),
                device_timeout_secs: get_env_parsed("OLT_DEVICE_TIMEOUT_SECS", 25),
                retries: get_env_parsed("OLT_RETRIES", 2),
                read_timeout_secs: get_env_parsed("OLT_READ_TIMEOUT_SECS", 45),
                change_timeout_secs: get_env_parsed("OLT_CHANGE_TIMEOUT_SECS", 120),
            },
            sync: SyncConfig {
                schedule: get_env("SYNC_SCHEDULE", "*/30 * * * *"),
                detail_batch_size: get_env_parsed("SYNC_DETAIL_BATCH_SIZE", 80),
                read_attempts: get_env_parsed("SYNC_READ_ATTEMPTS", 2),
                config_timeout_secs: get_env_parsed("SYNC_CONFIG_TIMEOUT_SECS", 90),
                detail_timeout_secs: get_env_parsed("SYNC_DETAIL_TIMEOUT_SECS", 75),
            },
            default_service_port: get_env_parsed("DEFAULT_SERVICE_PORT", 48),
            dialect_b_ids: SyntheticIds {
                profile_id: get_env_parsed("DIALECT_B_PROFILE_ID", 20),
                inbound_table_id: get_env_parsed("DIALECT_B_INBOUND_TABLE_ID", 900),
                outbound_table_id: get_env_parsed("DIALECT_B_OUTBOUND_TABLE_ID", 901),
            },
        }
    }
}

impl GatewayConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn change_timeout(&self) -> Duration {
        Duration::from_secs(self.change_timeout_secs)
    }
}

fn get_env(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn get_env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(v) => v.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid value for {}: {:?}", key, v);
            default
        }),
        Err(_) => default,
    }
}
