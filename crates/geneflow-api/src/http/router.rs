//! Axum router configuration with middleware.
//!
//! All routes are under `/api/v1/`.
//! Middleware: CORS, tracing.

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/sources", get(handlers::source::list_sources))
        .route("/workflows", get(handlers::workflow::list_workflows))
        .route("/workflows/{name}", get(handlers::workflow::get_workflow))
        .route("/workflows/{name}/run", post(handlers::workflow::run_workflow))
        .route("/request", post(handlers::request::process_request));

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /api/v1/health
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use geneflow_core::config::{ComponentFactory, ConfigError, ConfigurationManager};
    use geneflow_core::datasource::{BoxDataSource, DataSource, DataSourceError};
    use geneflow_types::config::EngineSettings;
    use geneflow_types::source::ComponentDefinition;

    struct EchoSource {
        calls: Arc<AtomicUsize>,
    }

    impl DataSource for EchoSource {
        fn name(&self) -> &str {
            "echo"
        }

        fn source_type(&self) -> &str {
            "echo"
        }

        async fn execute(&self, operation: &str, parameters: &Value) -> Result<Value, DataSourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!({"endpoint": operation, "params": parameters}))
        }

        async fn is_available(&self) -> bool {
            true
        }

        fn connection_info(&self) -> Value {
            json!({"type": "echo"})
        }
    }

    struct EchoFactory {
        calls: Arc<AtomicUsize>,
    }

    impl ComponentFactory for EchoFactory {
        fn create_data_source(
            &self,
            name: &str,
            definition: &ComponentDefinition,
        ) -> Result<BoxDataSource, ConfigError> {
            match definition.kind.as_str() {
                "echo" => Ok(BoxDataSource::new(EchoSource {
                    calls: self.calls.clone(),
                })),
                other => Err(ConfigError::UnknownSourceType {
                    name: name.to_string(),
                    kind: other.to_string(),
                }),
            }
        }
    }

    fn app() -> (Router, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut manager = ConfigurationManager::new();
        manager
            .load_configuration_from_value(
                json!({
                    "data_sources": {"echo": {"type": "echo"}},
                    "workflows": {
                        "gene_lookup": {
                            "description": "Look up one gene",
                            "steps": [{
                                "name": "fetch",
                                "operations": [{
                                    "name": "gene",
                                    "data_source": "echo",
                                    "endpoint": "getGeneInfo",
                                    "parameters": {"symbol": "${INPUT:gene_symbol}"}
                                }]
                            }]
                        }
                    }
                }),
                &EchoFactory {
                    calls: calls.clone(),
                },
            )
            .unwrap();
        let state = crate::state::AppState::from_manager(manager, EngineSettings::default());
        (build_router(state), calls)
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_and_listing() {
        let (router, _) = app();
        let (status, body) = send(
            router.clone(),
            Request::get("/api/v1/health").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        let (_, body) = send(
            router.clone(),
            Request::get("/api/v1/workflows").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"][0]["name"], "gene_lookup");
        assert!(body["meta"]["request_id"].is_string());

        let (_, body) = send(
            router,
            Request::get("/api/v1/sources").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(body["data"][0]["name"], "echo");
        assert!(body["data"][0].get("healthy").is_none());
    }

    #[tokio::test]
    async fn get_unknown_workflow_is_404() {
        let (router, _) = app();
        let (status, body) = send(
            router,
            Request::get("/api/v1/workflows/nope").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "WORKFLOW_NOT_FOUND");
    }

    #[tokio::test]
    async fn run_workflow_returns_result() {
        let (router, calls) = app();
        let (status, body) = send(
            router,
            post_json(
                "/api/v1/workflows/gene_lookup/run",
                json!({"input": {"gene_symbol": "COMT"}}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "succeeded");
        assert_eq!(
            body["data"]["outputs"]["gene"],
            json!({"endpoint": "getGeneInfo", "params": {"symbol": "COMT"}})
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn request_endpoint_enforces_broad_search_policy() {
        let (router, _) = app();
        let (status, body) = send(
            router.clone(),
            post_json(
                "/api/v1/request",
                json!({"name": "getResearchAssociations", "parameters": {}}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(
            body["error"]["message"],
            "At least one search parameter is required for this endpoint."
        );

        let (status, body) = send(
            router,
            post_json(
                "/api/v1/request",
                json!({"name": "getResearchAssociations", "parameters": {"gene_ids": ["COMT"]}}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
    }
}
