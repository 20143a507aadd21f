use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::handlers::{created, ApiError, MessageResponse};
use crate::models::*;
use crate::utils::is_valid_ipv4;
use crate::AppState;

pub async fn list_olts(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Olt>>, ApiError> {
    let olts = state.store.list_olts().await?;
    Ok(Json(olts))
}

pub async fn get_olt(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Olt>, ApiError> {
    let olt = state
        .store
        .get_olt(id)
        .await?
        .ok_or_else(|| ApiError::not_found("OLT"))?;
    Ok(Json(olt))
}

pub async fn create_olt(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateOltRequest>,
) -> Result<(StatusCode, Json<Olt>), ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::bad_request("name is required"));
    }
    if !is_valid_ipv4(&req.ip_address) {
        return Err(ApiError::bad_request(format!("invalid ip_address: {}", req.ip_address)));
    }
    let olt = state.store.create_olt(&req).await?;
    tracing::info!("Registered OLT {} ({}, dialect {})", olt.name, olt.ip_address, olt.dialect);
    Ok(created(olt))
}

pub async fn delete_olt(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.store.delete_olt(id).await?;
    Ok(MessageResponse::new("OLT deleted"))
}
