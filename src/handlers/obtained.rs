use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;

use crate::handlers::ApiError;
use crate::models::*;
use crate::AppState;

pub async fn list_obtained_interfaces(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ObtainedInterfaceQuery>,
) -> Result<Json<Vec<ObtainedInterface>>, ApiError> {
    let records = state.store.list_obtained_interfaces(&query).await?;
    Ok(Json(records))
}

pub async fn get_obtained_interface(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<ObtainedInterface>, ApiError> {
    let record = state
        .store
        .get_obtained_interface(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Obtained interface"))?;
    Ok(Json(record))
}
