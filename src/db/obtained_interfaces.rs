use anyhow::Result;
use chrono::Utc;
use sqlx::{Pool, Sqlite};

use super::map_unique_violation;
use super::row_helpers::map_obtained_interface_row;
use crate::models::*;

const SELECT_OBTAINED: &str = r#"
    SELECT id, olt_id, gpon_interface, customer_name, config, admin_state, speed,
           last_sync_at, created_at, updated_at
    FROM obtained_interfaces
"#;

pub struct ObtainedInterfaceRepo;

impl ObtainedInterfaceRepo {
    pub async fn list(pool: &Pool<Sqlite>, query: &ObtainedInterfaceQuery) -> Result<Vec<ObtainedInterface>> {
        let customer = query
            .customer
            .as_deref()
            .filter(|c| !c.is_empty())
            .map(|c| format!("%{}%", c.to_lowercase()));

        let rows = sqlx::query(&format!(
            "{} WHERE (? IS NULL OR olt_id = ?) AND (? IS NULL OR lower(customer_name) LIKE ?) ORDER BY olt_id, gpon_interface",
            SELECT_OBTAINED
        ))
        .bind(query.olt_id)
        .bind(query.olt_id)
        .bind(&customer)
        .bind(&customer)
        .fetch_all(pool)
        .await?;
        Ok(rows.iter().map(map_obtained_interface_row).collect())
    }

    pub async fn get(pool: &Pool<Sqlite>, id: i64) -> Result<Option<ObtainedInterface>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_OBTAINED))
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row.as_ref().map(map_obtained_interface_row))
    }

    pub async fn find(pool: &Pool<Sqlite>, olt_id: i64, gpon_interface: &str) -> Result<Option<ObtainedInterface>> {
        let row = sqlx::query(&format!("{} WHERE olt_id = ? AND gpon_interface = ?", SELECT_OBTAINED))
            .bind(olt_id)
            .bind(gpon_interface)
            .fetch_optional(pool)
            .await?;
        Ok(row.as_ref().map(map_obtained_interface_row))
    }

    /// Insert a new record. A concurrent insert for the same key surfaces as `DuplicateKeyError`.
    pub async fn insert(pool: &Pool<Sqlite>, rec: &ObtainedInterfaceUpsert) -> Result<i64> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO obtained_interfaces (olt_id, gpon_interface, customer_name, config, admin_state,
                                             speed, last_sync_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(rec.olt_id)
        .bind(&rec.gpon_interface)
        .bind(&rec.customer_name)
        .bind(&rec.config)
        .bind(rec.admin_state as i32)
        .bind(&rec.speed)
        .bind(rec.synced_at)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .map_err(|e| {
            map_unique_violation(
                e,
                "Obtained interface",
                &format!("{}/{}", rec.olt_id, rec.gpon_interface),
            )
        })?;
        Ok(result.last_insert_rowid())
    }

    pub async fn update(pool: &Pool<Sqlite>, id: i64, rec: &ObtainedInterfaceUpsert) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE obtained_interfaces
            SET customer_name = ?, config = ?, admin_state = ?, speed = ?, last_sync_at = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&rec.customer_name)
        .bind(&rec.config)
        .bind(rec.admin_state as i32)
        .bind(&rec.speed)
        .bind(rec.synced_at)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Update the record for (OLT, interface) if it exists, insert it otherwise
    pub async fn upsert(pool: &Pool<Sqlite>, rec: &ObtainedInterfaceUpsert) -> Result<UpsertOutcome> {
        match Self::find(pool, rec.olt_id, &rec.gpon_interface).await? {
            Some(existing) => {
                Self::update(pool, existing.id, rec).await?;
                Ok(UpsertOutcome::Updated)
            }
            None => {
                Self::insert(pool, rec).await?;
                Ok(UpsertOutcome::Created)
            }
        }
    }
}
