pub mod interfaces;
pub mod obtained;
pub mod olts;
pub mod sync;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::AppState;

/// Shared limit query parameter for list endpoints.
/// Default 50, max 500.
#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

impl LimitQuery {
    pub fn sanitize(&self) -> i64 {
        self.limit.clamp(1, 500)
    }
}

fn default_limit() -> i64 {
    50
}

/// Error response - {"error": "message"}
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// API error type
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }

    pub fn not_found(resource: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: format!("{} not found", resource),
        }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: msg.into(),
        }
    }

    pub fn bad_gateway(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: msg.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse::new(self.message)),
        )
            .into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        if let Some(nf) = err.downcast_ref::<crate::db::NotFoundError>() {
            return Self::not_found(&format!("{} {}", nf.resource, nf.id));
        }
        if let Some(dup) = err.downcast_ref::<crate::db::DuplicateKeyError>() {
            return Self::conflict(dup.to_string());
        }
        if let Some(invalid) = err.downcast_ref::<crate::commands::InvalidInterfaceError>() {
            return Self::bad_request(invalid.to_string());
        }
        if let Some(gw) = err.downcast_ref::<crate::gateway::GatewayError>() {
            return Self::bad_gateway(gw.to_string());
        }
        tracing::error!("Request failed: {:#}", err);
        Self::internal(err.to_string())
    }
}

/// Message response for simple status messages
#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(msg: impl Into<String>) -> Json<Self> {
        Json(Self { message: msg.into() })
    }
}

/// Response helper: return 201 Created with JSON body
pub fn created<T: Serialize>(item: T) -> (StatusCode, Json<T>) {
    (StatusCode::CREATED, Json(item))
}

/// Healthcheck endpoint, returns 200 OK with status
pub async fn healthcheck(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "olt-sync",
        "gateway": state.config.gateway.url,
        "sync_schedule": state.config.sync.schedule,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{DuplicateKeyError, NotFoundError};

    #[test]
    fn test_error_mapping() {
        let err: ApiError = anyhow::Error::new(NotFoundError::new("OLT", "9")).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let err: ApiError = anyhow::Error::new(DuplicateKeyError::new("OLT", "centro")).into();
        assert_eq!(err.status(), StatusCode::CONFLICT);

        let err: ApiError = anyhow::Error::new(crate::commands::InvalidInterfaceError {
            interface: "0/1/2".to_string(),
            reason: "expected <port>:<ont id>",
        })
        .into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err: ApiError = anyhow::anyhow!("boom").into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_limit_sanitize() {
        assert_eq!(LimitQuery { limit: 0 }.sanitize(), 1);
        assert_eq!(LimitQuery { limit: 10_000 }.sanitize(), 500);
        assert_eq!(LimitQuery { limit: 20 }.sanitize(), 20);
    }
}
