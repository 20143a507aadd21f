use anyhow::{Context, Result};
use chrono::Utc;
use std::time::Duration;

use super::SyncRepository;
use crate::config::SyncConfig;
use crate::db::DuplicateKeyError;
use crate::gateway::{execute_read, CommandGateway};
use crate::models::{ObtainedInterfaceUpsert, Olt, SyncReport, UpsertOutcome};
use crate::parser::{parse_sections, speed_descriptor, state, DeviceSection};

const RUNNING_CONFIG_COMMAND: &str = "show running-config";

#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Interfaces per detail-info gateway call
    pub detail_batch_size: usize,
    /// Attempts for read-only gateway calls
    pub read_attempts: u32,
    pub config_timeout: Duration,
    pub detail_timeout: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            detail_batch_size: 80,
            read_attempts: 2,
            config_timeout: Duration::from_secs(90),
            detail_timeout: Duration::from_secs(75),
        }
    }
}

impl SyncOptions {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            detail_batch_size: config.detail_batch_size.max(1),
            read_attempts: config.read_attempts.max(1),
            config_timeout: Duration::from_secs(config.config_timeout_secs),
            detail_timeout: Duration::from_secs(config.detail_timeout_secs),
        }
    }
}

pub fn detail_command(gpon_interface: &str) -> String {
    format!("show gpon onu detail-info gpon-onu_{}", gpon_interface)
}

/// Synchronize every active OLT into the obtained-interface cache.
///
/// OLTs are processed one after another. A device that can't be read is
/// recorded in the report and skipped; only listing OLTs or a non-conflict
/// persistence error aborts the pass.
pub async fn sync_all_olts<R, G>(repo: &R, gateway: &G, options: &SyncOptions) -> Result<SyncReport>
where
    R: SyncRepository + ?Sized,
    G: CommandGateway + ?Sized,
{
    let olts = repo
        .list_active_olts()
        .await
        .context("Failed to list active OLTs")?;

    tracing::info!("Sync pass starting for {} active OLTs", olts.len());

    let mut report = SyncReport::default();
    for olt in &olts {
        sync_olt(repo, gateway, olt, options, &mut report).await?;
        report.processed_olts += 1;
    }

    tracing::info!(
        "Sync pass finished: {} OLTs, {} sections, {} created, {} updated, {} duplicates, {} errors",
        report.processed_olts,
        report.sections_found,
        report.created,
        report.updated,
        report.duplicates_skipped,
        report.errors.len()
    );

    Ok(report)
}

async fn sync_olt<R, G>(
    repo: &R,
    gateway: &G,
    olt: &Olt,
    options: &SyncOptions,
    report: &mut SyncReport,
) -> Result<()>
where
    R: SyncRepository + ?Sized,
    G: CommandGateway + ?Sized,
{
    let config = match fetch_running_config(gateway, olt, options).await {
        Some(config) => config,
        None => {
            report.errors.push(format!("Failed to get config from OLT: {}", olt.name));
            return Ok(());
        }
    };

    let sections = parse_sections(&config);
    report.sections_found += sections.len() as i64;
    tracing::debug!("OLT {}: {} interface sections", olt.name, sections.len());

    let details = fetch_details(gateway, olt, &sections, options, &mut report.errors).await;
    let synced_at = Utc::now();

    for (section, detail) in sections.iter().zip(details.iter()) {
        let raw = section.raw_text();
        let record = ObtainedInterfaceUpsert {
            olt_id: olt.id,
            gpon_interface: section.interface.clone(),
            customer_name: section.customer_name.clone(),
            admin_state: state::admin_state(detail, &raw),
            speed: speed_descriptor(&raw),
            config: raw,
            synced_at,
        };

        match repo.upsert_obtained_interface(&record).await {
            Ok(UpsertOutcome::Created) => report.created += 1,
            Ok(UpsertOutcome::Updated) => report.updated += 1,
            Err(e) if e.downcast_ref::<DuplicateKeyError>().is_some() => {
                tracing::warn!(
                    "Skipping duplicate interface {} on OLT {}: {}",
                    section.interface,
                    olt.name,
                    e
                );
                report.duplicates_skipped += 1;
            }
            Err(e) => {
                return Err(e.context(format!(
                    "Failed to store interface {} for OLT {}",
                    section.interface, olt.name
                )));
            }
        }
    }

    Ok(())
}

/// Full running configuration, or None when the device can't be read or returns nothing
async fn fetch_running_config<G: CommandGateway + ?Sized>(
    gateway: &G,
    olt: &Olt,
    options: &SyncOptions,
) -> Option<String> {
    let commands = [RUNNING_CONFIG_COMMAND.to_string()];
    match execute_read(gateway, olt, &commands, options.config_timeout, options.read_attempts).await {
        Ok(outputs) => outputs
            .into_iter()
            .next()
            .filter(|config| !config.trim().is_empty()),
        Err(e) => {
            tracing::warn!("Config fetch failed for OLT {} ({}): {:#}", olt.name, olt.ip_address, e);
            None
        }
    }
}

/// Detail output per section, positionally aligned. A failed batch leaves its entries
/// empty and adds one entry to `errors`.
async fn fetch_details<G: CommandGateway + ?Sized>(
    gateway: &G,
    olt: &Olt,
    sections: &[DeviceSection],
    options: &SyncOptions,
    errors: &mut Vec<String>,
) -> Vec<String> {
    let mut details = Vec::with_capacity(sections.len());

    for (index, batch) in sections.chunks(options.detail_batch_size.max(1)).enumerate() {
        let start = details.len();
        let commands: Vec<String> = batch.iter().map(|s| detail_command(&s.interface)).collect();

        match execute_read(gateway, olt, &commands, options.detail_timeout, options.read_attempts).await {
            Ok(outputs) => details.extend(outputs.into_iter().take(batch.len())),
            Err(e) => {
                let message = format!(
                    "Detail batch {} ({} interfaces) failed for OLT {}: {:#}",
                    index + 1,
                    batch.len(),
                    olt.name,
                    e
                );
                tracing::warn!("{}", message);
                errors.push(message);
            }
        }
        details.resize(start + batch.len(), String::new());
    }

    details
}
