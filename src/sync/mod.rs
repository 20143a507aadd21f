pub mod orchestrator;
pub mod service;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{ObtainedInterface, ObtainedInterfaceUpsert, Olt, UpsertOutcome};

pub use orchestrator::{sync_all_olts, SyncOptions};
pub use service::SyncService;

/// Persistence needed by a sync pass
#[async_trait]
pub trait SyncRepository: Send + Sync {
    async fn list_active_olts(&self) -> Result<Vec<Olt>>;

    async fn find_obtained_interface(&self, olt_id: i64, gpon_interface: &str) -> Result<Option<ObtainedInterface>>;

    /// Idempotent write keyed by (OLT, interface). A lost insert race surfaces as
    /// `db::DuplicateKeyError`.
    async fn upsert_obtained_interface(&self, record: &ObtainedInterfaceUpsert) -> Result<UpsertOutcome>;
}
