use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::commands::VendorDialect;

fn default_true() -> bool {
    true
}

// ========== OLT Models ==========

/// Olt is an access device whose subscriber interfaces are synchronized
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Olt {
    pub id: i64,
    pub name: String,
    pub ip_address: String,
    pub dialect: VendorDialect,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    #[serde(skip_serializing)]
    pub enable_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Default service-port for dialect B devices
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_port: Option<u32>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// CreateOltRequest for registering an OLT
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOltRequest {
    pub name: String,
    pub ip_address: String,
    pub dialect: VendorDialect,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub enable_password: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub service_port: Option<u32>,
    #[serde(default = "default_true")]
    pub active: bool,
}

// ========== Obtained Interface Models ==========

/// Cached snapshot of one subscriber interface, refreshed by every sync pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObtainedInterface {
    pub id: i64,
    pub olt_id: i64,
    pub gpon_interface: String,
    pub customer_name: String,
    pub config: String,
    pub admin_state: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<String>,
    pub last_sync_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Values written for an (OLT, interface) pair on upsert
#[derive(Debug, Clone, PartialEq)]
pub struct ObtainedInterfaceUpsert {
    pub olt_id: i64,
    pub gpon_interface: String,
    pub customer_name: String,
    pub config: String,
    pub admin_state: bool,
    pub speed: Option<String>,
    pub synced_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    Created,
    Updated,
}

/// Query filters for listing cached interfaces
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObtainedInterfaceQuery {
    #[serde(default)]
    pub olt_id: Option<i64>,
    /// Case-insensitive substring of the customer name
    #[serde(default)]
    pub customer: Option<String>,
}

// ========== Sync Models ==========

/// Canonical sync run status values
pub mod sync_status {
    pub const RUNNING: &str = "running";
    pub const COMPLETED: &str = "completed";
    pub const FAILED: &str = "failed";
}

/// Canonical sync trigger values
pub mod sync_trigger {
    pub const SCHEDULED: &str = "scheduled";
    pub const MANUAL: &str = "manual";
}

/// Outcome counters of one sync pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    pub processed_olts: i64,
    pub sections_found: i64,
    pub created: i64,
    pub updated: i64,
    pub duplicates_skipped: i64,
    #[serde(default)]
    pub errors: Vec<String>,
}

/// SyncRun records one sync pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRun {
    pub id: String,
    pub triggered_by: String,
    pub status: String,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub report: SyncReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncTriggered {
    pub message: String,
    pub run_id: String,
}
