use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::commands::{DeviceCommandSet, Operation, OperationKind, VendorDialect};
use crate::handlers::ApiError;
use crate::services::interfaces::{ApplyOutcome, InterfaceInfo, SpeedSummary};
use crate::utils::is_valid_gpon_interface;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ServicePortQuery {
    #[serde(default)]
    pub service_port: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct SpeedChangeRequest {
    pub up_mbps: u32,
    pub down_mbps: u32,
    #[serde(default)]
    pub channel: Option<u32>,
    #[serde(default)]
    pub service_port: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    pub operation: OperationKind,
    #[serde(default)]
    pub up_mbps: Option<u32>,
    #[serde(default)]
    pub down_mbps: Option<u32>,
    #[serde(default)]
    pub channel: Option<u32>,
    #[serde(default)]
    pub service_port: Option<u32>,
}

fn validate_interface(iface: &str) -> Result<(), ApiError> {
    if is_valid_gpon_interface(iface) {
        Ok(())
    } else {
        Err(ApiError::bad_request(format!("invalid GPON interface: {}", iface)))
    }
}

fn validate_speed(up_mbps: u32, down_mbps: u32) -> Result<(), ApiError> {
    if up_mbps == 0 || down_mbps == 0 {
        return Err(ApiError::bad_request("up_mbps and down_mbps must be greater than zero"));
    }
    Ok(())
}

pub async fn get_speed(
    State(state): State<Arc<AppState>>,
    Path((id, iface)): Path<(i64, String)>,
    Query(query): Query<ServicePortQuery>,
) -> Result<Json<SpeedSummary>, ApiError> {
    validate_interface(&iface)?;
    let summary = state.interfaces.speed_summary(id, &iface, query.service_port).await?;
    Ok(Json(summary))
}

pub async fn get_info(
    State(state): State<Arc<AppState>>,
    Path((id, iface)): Path<(i64, String)>,
) -> Result<Json<InterfaceInfo>, ApiError> {
    validate_interface(&iface)?;
    let info = state.interfaces.interface_info(id, &iface).await?;
    Ok(Json(info))
}

pub async fn activate(
    State(state): State<Arc<AppState>>,
    Path((id, iface)): Path<(i64, String)>,
    Query(query): Query<ServicePortQuery>,
) -> Result<Json<ApplyOutcome>, ApiError> {
    validate_interface(&iface)?;
    let outcome = state
        .interfaces
        .apply(id, &iface, Operation::Activate, query.service_port)
        .await?;
    Ok(Json(outcome))
}

pub async fn deactivate(
    State(state): State<Arc<AppState>>,
    Path((id, iface)): Path<(i64, String)>,
    Query(query): Query<ServicePortQuery>,
) -> Result<Json<ApplyOutcome>, ApiError> {
    validate_interface(&iface)?;
    let outcome = state
        .interfaces
        .apply(id, &iface, Operation::Deactivate, query.service_port)
        .await?;
    Ok(Json(outcome))
}

pub async fn change_speed(
    State(state): State<Arc<AppState>>,
    Path((id, iface)): Path<(i64, String)>,
    Json(req): Json<SpeedChangeRequest>,
) -> Result<Json<ApplyOutcome>, ApiError> {
    validate_interface(&iface)?;
    validate_speed(req.up_mbps, req.down_mbps)?;

    let operation = state
        .interfaces
        .set_speed_operation(id, &iface, req.up_mbps, req.down_mbps, req.channel)
        .await?;
    let outcome = state
        .interfaces
        .apply(id, &iface, operation, req.service_port)
        .await?;
    Ok(Json(outcome))
}

/// Build the command list for an operation without contacting the device.
/// Dialect A set-speed needs an explicit `channel` here, since resolving the
/// main service would mean reading the interface.
pub async fn preview_commands(
    State(state): State<Arc<AppState>>,
    Path((id, iface)): Path<(i64, String)>,
    Json(req): Json<PreviewRequest>,
) -> Result<Json<DeviceCommandSet>, ApiError> {
    validate_interface(&iface)?;

    let operation = match req.operation {
        OperationKind::Activate => Operation::Activate,
        OperationKind::Deactivate => Operation::Deactivate,
        OperationKind::SetSpeed => {
            let (Some(up), Some(down)) = (req.up_mbps, req.down_mbps) else {
                return Err(ApiError::bad_request("set_speed requires up_mbps and down_mbps"));
            };
            validate_speed(up, down)?;
            let olt = state
                .store
                .get_olt(id)
                .await?
                .ok_or_else(|| ApiError::not_found("OLT"))?;
            let channel = match (olt.dialect, req.channel) {
                (_, Some(channel)) => channel,
                (VendorDialect::B, None) => 1,
                (VendorDialect::A, None) => {
                    return Err(ApiError::bad_request("set_speed preview requires channel"));
                }
            };
            Operation::SetSpeed {
                up_mbps: up,
                down_mbps: down,
                channel,
            }
        }
    };

    let command_set = state
        .interfaces
        .preview(id, &iface, operation, req.service_port)
        .await?;
    Ok(Json(command_set))
}
