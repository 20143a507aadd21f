use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::handlers::{ApiError, LimitQuery};
use crate::models::*;
use crate::AppState;

/// Start a manual sync pass in the background
pub async fn trigger_sync(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<SyncTriggered>), ApiError> {
    let run_id = state.sync_service.trigger().await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(SyncTriggered {
            message: "Sync started".to_string(),
            run_id,
        }),
    ))
}

pub async fn list_sync_runs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<SyncRun>>, ApiError> {
    let runs = state.store.list_sync_runs(query.sanitize()).await?;
    Ok(Json(runs))
}

pub async fn get_sync_run(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SyncRun>, ApiError> {
    let run = state
        .store
        .get_sync_run(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Sync run"))?;
    Ok(Json(run))
}
