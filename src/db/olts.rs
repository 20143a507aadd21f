use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{Pool, Sqlite};

use super::row_helpers::map_olt_row;
use super::{map_unique_violation, NotFoundError};
use crate::models::*;

const SELECT_OLT: &str = r#"
    SELECT id, name, ip_address, dialect, username, password, enable_password,
           port, service_port, active, created_at, updated_at
    FROM olts
"#;

pub struct OltRepo;

impl OltRepo {
    pub async fn list(pool: &Pool<Sqlite>) -> Result<Vec<Olt>> {
        let rows = sqlx::query(&format!("{} ORDER BY name", SELECT_OLT))
            .fetch_all(pool)
            .await?;
        Ok(rows.iter().map(map_olt_row).collect())
    }

    pub async fn list_active(pool: &Pool<Sqlite>) -> Result<Vec<Olt>> {
        let rows = sqlx::query(&format!("{} WHERE active = 1 ORDER BY id", SELECT_OLT))
            .fetch_all(pool)
            .await?;
        Ok(rows.iter().map(map_olt_row).collect())
    }

    pub async fn get(pool: &Pool<Sqlite>, id: i64) -> Result<Option<Olt>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_OLT))
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row.as_ref().map(map_olt_row))
    }

    pub async fn create(pool: &Pool<Sqlite>, req: &CreateOltRequest) -> Result<Olt> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO olts (name, ip_address, dialect, username, password, enable_password,
                              port, service_port, active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&req.name)
        .bind(&req.ip_address)
        .bind(req.dialect.as_str())
        .bind(&req.username)
        .bind(&req.password)
        .bind(&req.enable_password)
        .bind(req.port.map(i64::from))
        .bind(req.service_port.map(i64::from))
        .bind(req.active as i32)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .map_err(|e| map_unique_violation(e, "OLT", &req.name))?;

        Self::get(pool, result.last_insert_rowid())
            .await?
            .context("OLT not found after creation")
    }

    pub async fn delete(pool: &Pool<Sqlite>, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM olts WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(NotFoundError::new("OLT", &id.to_string()).into());
        }
        Ok(())
    }
}
