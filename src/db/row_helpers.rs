use sqlx::{sqlite::SqliteRow, Row};

use crate::commands::VendorDialect;
use crate::models::*;

/// Filter empty strings to None (the DB may store empty text instead of NULL)
pub fn none_if_empty(opt: Option<String>) -> Option<String> {
    opt.filter(|s| !s.is_empty())
}

/// Booleans are stored as 0/1 integers
pub fn int_flag(row: &SqliteRow, column: &str) -> bool {
    row.get::<i32, _>(column) == 1
}

/// Map a SQLite row to an Olt struct
pub fn map_olt_row(row: &SqliteRow) -> Olt {
    let dialect_raw: String = row.get("dialect");
    let dialect = dialect_raw.parse().unwrap_or_else(|_| {
        tracing::warn!("OLT row has unknown dialect {:?}, assuming A", dialect_raw);
        VendorDialect::A
    });

    Olt {
        id: row.get("id"),
        name: row.get("name"),
        ip_address: row.get("ip_address"),
        dialect,
        username: none_if_empty(row.get("username")),
        password: none_if_empty(row.get("password")),
        enable_password: none_if_empty(row.get("enable_password")),
        port: row
            .get::<Option<i64>, _>("port")
            .and_then(|p| u16::try_from(p).ok()),
        service_port: row
            .get::<Option<i64>, _>("service_port")
            .and_then(|p| u32::try_from(p).ok()),
        active: int_flag(row, "active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Map a SQLite row to an ObtainedInterface struct
pub fn map_obtained_interface_row(row: &SqliteRow) -> ObtainedInterface {
    ObtainedInterface {
        id: row.get("id"),
        olt_id: row.get("olt_id"),
        gpon_interface: row.get("gpon_interface"),
        customer_name: row.get("customer_name"),
        config: row.get("config"),
        admin_state: int_flag(row, "admin_state"),
        speed: none_if_empty(row.get("speed")),
        last_sync_at: row.get("last_sync_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
