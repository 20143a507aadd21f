use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::AppState;

/// Build the application router with all routes
pub fn build(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(handlers::healthcheck))
        // OLT routes
        .route("/api/olts", get(handlers::olts::list_olts).post(handlers::olts::create_olt))
        .route("/api/olts/:id", get(handlers::olts::get_olt).delete(handlers::olts::delete_olt))
        // Cached interface records
        .route("/api/obtained-interfaces", get(handlers::obtained::list_obtained_interfaces))
        .route("/api/obtained-interfaces/:id", get(handlers::obtained::get_obtained_interface))
        // Sync routes
        .route("/api/sync", post(handlers::sync::trigger_sync))
        .route("/api/sync/runs", get(handlers::sync::list_sync_runs))
        .route("/api/sync/runs/:id", get(handlers::sync::get_sync_run))
        // Live interface routes (iface is percent-encoded, e.g. 1%2F2%2F1%3A7)
        .route("/api/olts/:id/interfaces/:iface/speed", get(handlers::interfaces::get_speed).post(handlers::interfaces::change_speed))
        .route("/api/olts/:id/interfaces/:iface/info", get(handlers::interfaces::get_info))
        .route("/api/olts/:id/interfaces/:iface/activate", post(handlers::interfaces::activate))
        .route("/api/olts/:id/interfaces/:iface/deactivate", post(handlers::interfaces::deactivate))
        .route("/api/olts/:id/interfaces/:iface/commands/preview", post(handlers::interfaces::preview_commands))
        // Add state and middleware
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::db::Store;
    use crate::gateway::CommandGateway;
    use crate::services::InterfaceService;
    use crate::sync::orchestrator::tests::FakeGateway;
    use crate::sync::SyncService;

    async fn app_with_gateway() -> (Router, Arc<FakeGateway>) {
        let mut config = Config::load();
        config.sync.schedule = String::new();
        let store = Store::with_pool_size(":memory:", 1).await.unwrap();
        let fake = Arc::new(FakeGateway::default());
        let gateway: Arc<dyn CommandGateway> = fake.clone();
        let state = Arc::new(AppState {
            store: store.clone(),
            sync_service: SyncService::new(store.clone(), gateway.clone(), &config.sync),
            interfaces: InterfaceService::new(store, gateway, &config),
            config,
        });
        (build(state), fake)
    }

    async fn app() -> Router {
        app_with_gateway().await.0
    }

    async fn register_olt(app: &Router, name: &str, dialect: &str) -> i64 {
        let request = json_request(
            "POST",
            "/api/olts",
            serde_json::json!({"name": name, "ip_address": "10.0.0.1", "dialect": dialect}),
        );
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await["id"].as_i64().unwrap()
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .await
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["service"], "olt-sync");
    }

    #[tokio::test]
    async fn test_missing_olt_is_404() {
        let response = app()
            .await
            .oneshot(Request::get("/api/olts/42").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_olt_rejects_bad_ip() {
        let request = json_request(
            "POST",
            "/api/olts",
            serde_json::json!({"name": "centro", "ip_address": "10.0.0", "dialect": "A"}),
        );
        let response = app().await.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_then_list_olts() {
        let app = app().await;
        let request = json_request(
            "POST",
            "/api/olts",
            serde_json::json!({"name": "centro", "ip_address": "10.0.0.1", "dialect": "huawei", "password": "secret"}),
        );
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = body_json(response).await;
        assert_eq!(created["dialect"], "B");
        assert!(created.get("password").is_none());

        let duplicate = json_request(
            "POST",
            "/api/olts",
            serde_json::json!({"name": "centro", "ip_address": "10.0.0.2", "dialect": "A"}),
        );
        let response = app.clone().oneshot(duplicate).await.unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = app
            .oneshot(Request::get("/api/olts").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await.as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn test_invalid_interface_is_400() {
        let response = app()
            .await
            .oneshot(
                Request::post("/api/olts/1/interfaces/1%2F2%3B%20reload/activate")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_preview_set_speed_requires_rates() {
        let request = json_request(
            "POST",
            "/api/olts/1/interfaces/1%2F2%2F1%3A7/commands/preview",
            serde_json::json!({"operation": "set_speed"}),
        );
        let response = app().await.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_preview_never_contacts_device() {
        let (app, gateway) = app_with_gateway().await;
        let id = register_olt(&app, "centro", "A").await;
        let uri = format!("/api/olts/{}/interfaces/1%2F2%2F1%3A7/commands/preview", id);

        let response = app
            .clone()
            .oneshot(json_request("POST", &uri, serde_json::json!({"operation": "set_speed", "up_mbps": 20, "down_mbps": 200})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .oneshot(json_request(
                "POST",
                &uri,
                serde_json::json!({"operation": "set_speed", "up_mbps": 20, "down_mbps": 200, "channel": 2}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["commands"][2], "channel 2 traffic-limit upstream 20Mbps downstream 200Mbps");

        assert!(gateway.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dialect_b_speed_change_without_ont_is_rejected() {
        let (app, gateway) = app_with_gateway().await;
        let id = register_olt(&app, "norte", "B").await;
        let uri = format!("/api/olts/{}/interfaces/0%2F1%2F2/speed", id);

        let response = app
            .oneshot(json_request("POST", &uri, serde_json::json!({"up_mbps": 20, "down_mbps": 200})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(gateway.calls.lock().unwrap().is_empty());
    }
}
