use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use croner::Cron;
use std::sync::Arc;
use std::time::Duration;

use super::{sync_all_olts, SyncOptions};
use crate::config::SyncConfig;
use crate::db::Store;
use crate::gateway::CommandGateway;
use crate::models::{sync_trigger, SyncRun};

/// SyncService records sync runs and starts them on demand or on a cron schedule
pub struct SyncService {
    store: Store,
    gateway: Arc<dyn CommandGateway>,
    options: SyncOptions,
    schedule: String,
}

impl SyncService {
    pub fn new(store: Store, gateway: Arc<dyn CommandGateway>, config: &SyncConfig) -> Arc<Self> {
        Arc::new(Self {
            store,
            gateway,
            options: SyncOptions::from_config(config),
            schedule: config.schedule.trim().to_string(),
        })
    }

    /// Run a full pass in the foreground and return the stored run
    pub async fn run(&self, triggered_by: &str) -> Result<SyncRun> {
        let run_id = uuid::Uuid::new_v4().to_string();
        self.store.create_sync_run(&run_id, triggered_by).await?;
        self.execute(&run_id).await
    }

    /// Record a manual run and execute it in the background. Returns the run id.
    pub async fn trigger(self: &Arc<Self>) -> Result<String> {
        let run_id = uuid::Uuid::new_v4().to_string();
        self.store.create_sync_run(&run_id, sync_trigger::MANUAL).await?;

        let svc = self.clone();
        let id = run_id.clone();
        tokio::spawn(async move {
            if let Err(e) = svc.execute(&id).await {
                tracing::error!("Sync run {} could not be recorded: {:#}", id, e);
            }
        });

        Ok(run_id)
    }

    /// Execute the pass for an already recorded run and store its outcome
    async fn execute(&self, run_id: &str) -> Result<SyncRun> {
        tracing::info!("Sync run {} started", run_id);

        match sync_all_olts(&self.store, self.gateway.as_ref(), &self.options).await {
            Ok(report) => {
                tracing::info!(
                    "Sync run {} completed: {} created, {} updated, {} errors",
                    run_id,
                    report.created,
                    report.updated,
                    report.errors.len()
                );
                self.store.complete_sync_run(run_id, &report).await?;
            }
            Err(e) => {
                tracing::error!("Sync run {} failed: {:#}", run_id, e);
                self.store.fail_sync_run(run_id, &format!("{:#}", e)).await?;
            }
        }

        self.store
            .get_sync_run(run_id)
            .await?
            .context("Sync run not found after completion")
    }

    /// Start the cron scheduler for sync passes
    pub fn start_scheduler(self: &Arc<Self>) {
        if self.schedule.is_empty() {
            tracing::info!("Sync scheduler disabled (empty schedule)");
            return;
        }

        let cron = match Cron::new(&self.schedule).parse() {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("Scheduler: invalid sync cron '{}': {}", self.schedule, e);
                return;
            }
        };

        tracing::info!("Sync scheduler started with schedule '{}'", self.schedule);

        let svc = self.clone();
        tokio::spawn(async move {
            let mut reference = match svc.store.last_sync_run_started(sync_trigger::SCHEDULED).await {
                Ok(Some(last)) => last,
                Ok(None) => Utc::now(),
                Err(e) => {
                    tracing::warn!("Scheduler: failed to load last scheduled run: {}", e);
                    Utc::now()
                }
            };

            let mut interval = tokio::time::interval(Duration::from_secs(30));
            loop {
                interval.tick().await;

                let now = Utc::now();
                if !is_due(&cron, &reference, &now) {
                    continue;
                }
                reference = now;

                tracing::info!("Scheduler: starting scheduled sync pass");
                let run_svc = svc.clone();
                tokio::spawn(async move {
                    if let Err(e) = run_svc.run(sync_trigger::SCHEDULED).await {
                        tracing::error!("Scheduler: sync run could not be recorded: {:#}", e);
                    }
                });
            }
        });
    }
}

/// Whether the schedule has an occurrence after `reference` that is not in the future
fn is_due(cron: &Cron, reference: &DateTime<Utc>, now: &DateTime<Utc>) -> bool {
    match cron.find_next_occurrence(reference, false) {
        Ok(next) => next <= *now,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::VendorDialect;
    use crate::models::{sync_status, CreateOltRequest};
    use crate::sync::orchestrator::tests::{running_config, FakeGateway};
    use chrono::TimeZone;

    fn sync_config() -> SyncConfig {
        SyncConfig {
            schedule: String::new(),
            detail_batch_size: 80,
            read_attempts: 1,
            config_timeout_secs: 1,
            detail_timeout_secs: 1,
        }
    }

    async fn store_with_olt(name: &str) -> Store {
        let store = Store::with_pool_size(":memory:", 1).await.unwrap();
        store
            .create_olt(&CreateOltRequest {
                name: name.to_string(),
                ip_address: "10.0.0.1".to_string(),
                dialect: VendorDialect::A,
                username: None,
                password: None,
                enable_password: None,
                port: None,
                service_port: None,
                active: true,
            })
            .await
            .unwrap();
        store
    }

    #[test]
    fn test_is_due() {
        let cron = Cron::new("*/30 * * * *").parse().unwrap();
        let reference = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();

        let before = Utc.with_ymd_and_hms(2024, 5, 1, 10, 29, 59).unwrap();
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 0).unwrap();
        assert!(!is_due(&cron, &reference, &before));
        assert!(is_due(&cron, &reference, &at));
    }

    #[tokio::test]
    async fn test_run_records_completed_pass() {
        let store = store_with_olt("centro").await;
        let mut gateway = FakeGateway::default();
        gateway.configs.insert("centro".to_string(), running_config(2));

        let svc = SyncService::new(store.clone(), Arc::new(gateway), &sync_config());
        let run = svc.run(sync_trigger::MANUAL).await.unwrap();

        assert_eq!(run.status, sync_status::COMPLETED);
        assert_eq!(run.triggered_by, sync_trigger::MANUAL);
        assert_eq!(run.report.created, 2);
        assert_eq!(run.report.processed_olts, 1);

        let second = svc.run(sync_trigger::SCHEDULED).await.unwrap();
        assert_eq!(second.report.created, 0);
        assert_eq!(second.report.updated, 2);
    }

    #[tokio::test]
    async fn test_run_records_gateway_errors() {
        let store = store_with_olt("norte").await;
        let gateway = FakeGateway {
            failing: vec!["norte".to_string()],
            ..Default::default()
        };

        let svc = SyncService::new(store, Arc::new(gateway), &sync_config());
        let run = svc.run(sync_trigger::MANUAL).await.unwrap();
        assert_eq!(run.status, sync_status::COMPLETED);
        assert_eq!(run.report.errors, vec!["Failed to get config from OLT: norte".to_string()]);
    }

    #[tokio::test]
    async fn test_trigger_returns_recorded_run_id() {
        let store = store_with_olt("centro").await;
        let svc = SyncService::new(store.clone(), Arc::new(FakeGateway::default()), &sync_config());

        let run_id = svc.trigger().await.unwrap();
        let run = store.get_sync_run(&run_id).await.unwrap();
        assert!(run.is_some());
    }
}
