mod obtained_interfaces;
mod olts;
pub(crate) mod row_helpers;
mod sync_runs;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};

use crate::models::*;
use crate::sync::SyncRepository;

use obtained_interfaces::ObtainedInterfaceRepo;
use olts::OltRepo;
use sync_runs::SyncRunRepo;

/// Typed error for "resource not found", matched by downcast in the API error handler
#[derive(Debug)]
pub struct NotFoundError {
    pub resource: String,
    pub id: String,
}

impl NotFoundError {
    pub fn new(resource: &str, id: &str) -> Self {
        Self {
            resource: resource.to_string(),
            id: id.to_string(),
        }
    }
}

impl std::fmt::Display for NotFoundError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} not found: {}", self.resource, self.id)
    }
}

impl std::error::Error for NotFoundError {}

/// Typed error for a unique-key conflict on insert. Sync passes skip these.
#[derive(Debug)]
pub struct DuplicateKeyError {
    pub resource: String,
    pub key: String,
}

impl DuplicateKeyError {
    pub fn new(resource: &str, key: &str) -> Self {
        Self {
            resource: resource.to_string(),
            key: key.to_string(),
        }
    }
}

impl std::fmt::Display for DuplicateKeyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} already exists: {}", self.resource, self.key)
    }
}

impl std::error::Error for DuplicateKeyError {}

/// Turn a unique-constraint violation into `DuplicateKeyError`, pass anything else through
pub(crate) fn map_unique_violation(err: sqlx::Error, resource: &str, key: &str) -> anyhow::Error {
    match err {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            DuplicateKeyError::new(resource, key).into()
        }
        other => other.into(),
    }
}

/// Store handles all database operations, delegating to per-entity repo modules.
#[derive(Clone)]
pub struct Store {
    pool: Pool<Sqlite>,
}

impl Store {
    /// Create a new database store with a specific pool size
    pub async fn with_pool_size(db_path: &str, max_connections: u32) -> Result<Self> {
        let db_url = format!("sqlite:{}?mode=rwc", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(&db_url)
            .await
            .context("Failed to connect to database")?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Run database migrations
    async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    // ========== OLT Operations ==========

    pub async fn list_olts(&self) -> Result<Vec<Olt>> {
        OltRepo::list(&self.pool).await
    }

    pub async fn get_olt(&self, id: i64) -> Result<Option<Olt>> {
        OltRepo::get(&self.pool, id).await
    }

    pub async fn create_olt(&self, req: &CreateOltRequest) -> Result<Olt> {
        OltRepo::create(&self.pool, req).await
    }

    pub async fn delete_olt(&self, id: i64) -> Result<()> {
        OltRepo::delete(&self.pool, id).await
    }

    // ========== Obtained Interface Operations ==========

    pub async fn list_obtained_interfaces(&self, query: &ObtainedInterfaceQuery) -> Result<Vec<ObtainedInterface>> {
        ObtainedInterfaceRepo::list(&self.pool, query).await
    }

    pub async fn get_obtained_interface(&self, id: i64) -> Result<Option<ObtainedInterface>> {
        ObtainedInterfaceRepo::get(&self.pool, id).await
    }

    // ========== Sync Run Operations ==========

    pub async fn create_sync_run(&self, id: &str, triggered_by: &str) -> Result<SyncRun> {
        SyncRunRepo::create(&self.pool, id, triggered_by).await
    }

    pub async fn get_sync_run(&self, id: &str) -> Result<Option<SyncRun>> {
        SyncRunRepo::get(&self.pool, id).await
    }

    pub async fn list_sync_runs(&self, limit: i64) -> Result<Vec<SyncRun>> {
        SyncRunRepo::list_recent(&self.pool, limit).await
    }

    pub async fn last_sync_run_started(&self, triggered_by: &str) -> Result<Option<DateTime<Utc>>> {
        SyncRunRepo::last_started(&self.pool, triggered_by).await
    }

    pub async fn complete_sync_run(&self, id: &str, report: &SyncReport) -> Result<()> {
        SyncRunRepo::update_completed(&self.pool, id, report).await
    }

    pub async fn fail_sync_run(&self, id: &str, failure: &str) -> Result<()> {
        SyncRunRepo::update_failed(&self.pool, id, failure).await
    }
}

#[async_trait]
impl SyncRepository for Store {
    async fn list_active_olts(&self) -> Result<Vec<Olt>> {
        OltRepo::list_active(&self.pool).await
    }

    async fn find_obtained_interface(&self, olt_id: i64, gpon_interface: &str) -> Result<Option<ObtainedInterface>> {
        ObtainedInterfaceRepo::find(&self.pool, olt_id, gpon_interface).await
    }

    async fn upsert_obtained_interface(&self, record: &ObtainedInterfaceUpsert) -> Result<UpsertOutcome> {
        ObtainedInterfaceRepo::upsert(&self.pool, record).await
    }
}
