use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Pool, Row, Sqlite};

use crate::models::*;

fn map_sync_run_row(row: &SqliteRow) -> SyncRun {
    let errors_json: String = row.get("errors");
    SyncRun {
        id: row.get("id"),
        triggered_by: row.get("triggered_by"),
        status: row.get("status"),
        started_at: row.get("started_at"),
        finished_at: row.get("finished_at"),
        report: SyncReport {
            processed_olts: row.get("processed_olts"),
            sections_found: row.get("sections_found"),
            created: row.get("created"),
            updated: row.get("updated"),
            duplicates_skipped: row.get("duplicates_skipped"),
            errors: serde_json::from_str(&errors_json).unwrap_or_default(),
        },
        failure: row.get("failure"),
    }
}

const SELECT_SYNC_RUN: &str = r#"
    SELECT id, triggered_by, status, started_at, finished_at, processed_olts, sections_found,
           created, updated, duplicates_skipped, errors, failure
    FROM sync_runs
"#;

pub struct SyncRunRepo;

impl SyncRunRepo {
    pub async fn create(pool: &Pool<Sqlite>, id: &str, triggered_by: &str) -> Result<SyncRun> {
        sqlx::query(
            "INSERT INTO sync_runs (id, triggered_by, status, started_at) VALUES (?, ?, ?, ?)",
        )
        .bind(id)
        .bind(triggered_by)
        .bind(sync_status::RUNNING)
        .bind(Utc::now())
        .execute(pool)
        .await?;

        Self::get(pool, id)
            .await?
            .context("Sync run not found after creation")
    }

    pub async fn get(pool: &Pool<Sqlite>, id: &str) -> Result<Option<SyncRun>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_SYNC_RUN))
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row.as_ref().map(map_sync_run_row))
    }

    pub async fn list_recent(pool: &Pool<Sqlite>, limit: i64) -> Result<Vec<SyncRun>> {
        let rows = sqlx::query(&format!("{} ORDER BY started_at DESC LIMIT ?", SELECT_SYNC_RUN))
            .bind(limit)
            .fetch_all(pool)
            .await?;
        Ok(rows.iter().map(map_sync_run_row).collect())
    }

    /// Most recent start time for runs with the given trigger
    pub async fn last_started(pool: &Pool<Sqlite>, triggered_by: &str) -> Result<Option<chrono::DateTime<Utc>>> {
        let row = sqlx::query("SELECT MAX(started_at) AS started_at FROM sync_runs WHERE triggered_by = ?")
            .bind(triggered_by)
            .fetch_one(pool)
            .await?;
        Ok(row.get("started_at"))
    }

    pub async fn update_completed(pool: &Pool<Sqlite>, id: &str, report: &SyncReport) -> Result<()> {
        let errors = serde_json::to_string(&report.errors)?;
        sqlx::query(
            r#"
            UPDATE sync_runs
            SET status = ?, finished_at = ?, processed_olts = ?, sections_found = ?, created = ?,
                updated = ?, duplicates_skipped = ?, errors = ?
            WHERE id = ?
            "#,
        )
        .bind(sync_status::COMPLETED)
        .bind(Utc::now())
        .bind(report.processed_olts)
        .bind(report.sections_found)
        .bind(report.created)
        .bind(report.updated)
        .bind(report.duplicates_skipped)
        .bind(&errors)
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn update_failed(pool: &Pool<Sqlite>, id: &str, failure: &str) -> Result<()> {
        sqlx::query("UPDATE sync_runs SET status = ?, failure = ?, finished_at = ? WHERE id = ?")
            .bind(sync_status::FAILED)
            .bind(failure)
            .bind(Utc::now())
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }
}
