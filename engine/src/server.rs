//! HTTP front end
//!
//! Exposes one orchestrator over a small REST surface:
//!
//! - POST /query - Run one cycle, optionally switching the working directory first
//! - GET /state - Current agent state, working directory and model
//! - POST /clear_memory?days=N - Purge old memories
//! - GET /health - Liveness probe, plus whether a generation is running
//!
//! The orchestrator lives in router state behind an async mutex, so requests
//! against one server run their cycles one at a time.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use sdk::AgentResponse;
use serde::Deserialize;
use serde_json::json;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;

use crate::agent::Orchestrator;
use crate::llm::CompletionService;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    agent: Arc<Mutex<Orchestrator>>,
    // Read without the agent lock, which a running cycle holds
    completion: CompletionService,
    model: String,
    cleanup_days: u64,
}

impl AppState {
    pub fn new(agent: Orchestrator, model: impl Into<String>, cleanup_days: u64) -> Self {
        Self {
            completion: agent.completion().clone(),
            agent: Arc::new(Mutex::new(agent)),
            model: model.into(),
            cleanup_days,
        }
    }

    /// Handle to the shared orchestrator
    pub fn agent(&self) -> Arc<Mutex<Orchestrator>> {
        Arc::clone(&self.agent)
    }
}

#[derive(Debug, Deserialize)]
struct QueryRequest {
    query: String,
    #[serde(default)]
    working_dir: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClearMemoryParams {
    days: Option<u64>,
}

/// Error rendered as `{"error": ...}` with a status code
struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(json!({ "error": self.1 }))).into_response()
    }
}

/// Build the router for `state`
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/query", post(query_handler))
        .route("/state", get(state_handler))
        .route("/clear_memory", post(clear_memory_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    tracing::info!("HTTP server listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            shutdown.await;
            tracing::info!("HTTP server shutting down gracefully");
        })
        .await?;

    Ok(())
}

async fn query_handler(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<AgentResponse>, ApiError> {
    if request.query.trim().is_empty() {
        return Err(ApiError(
            StatusCode::BAD_REQUEST,
            "Query must not be empty".to_string(),
        ));
    }

    let mut agent = state.agent.lock().await;

    if let Some(dir) = request.working_dir.as_deref().filter(|d| !d.trim().is_empty()) {
        agent
            .set_working_directory(Path::new(dir))
            .map_err(|e| ApiError(StatusCode::BAD_REQUEST, e.to_string()))?;
    }

    Ok(Json(agent.process_query(&request.query).await))
}

async fn state_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let agent = state.agent.lock().await;
    Json(json!({
        "state": agent.state(),
        "working_dir": agent.working_directory().display().to_string(),
        "model": state.model,
    }))
}

async fn clear_memory_handler(
    State(state): State<AppState>,
    Query(params): Query<ClearMemoryParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let days = params.days.unwrap_or(state.cleanup_days);
    let agent = state.agent.lock().await;

    let cleared = agent.clear_memory(days).await.map_err(|e| {
        tracing::error!("Error clearing memory: {}", e);
        ApiError(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    Ok(Json(json!({
        "message": format!("Cleared memories older than {} days", days),
        "cleared": cleared,
    })))
}

async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "generating": state.completion.is_busy(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::llm::{CompletionBackend, GenerationParams, Result as LLMResult};
    use crate::tools::ToolExecutor;
    use axum::body::Body;
    use axum::http::Request;
    use tempfile::TempDir;
    use tower::ServiceExt;

    struct EchoBackend;

    impl CompletionBackend for EchoBackend {
        fn name(&self) -> &str {
            "echo"
        }

        fn complete(&mut self, _prompt: &str, _params: &GenerationParams) -> LLMResult<String> {
            Ok("echoed".to_string())
        }
    }

    struct SlowBackend;

    impl CompletionBackend for SlowBackend {
        fn name(&self) -> &str {
            "slow"
        }

        fn complete(&mut self, _prompt: &str, _params: &GenerationParams) -> LLMResult<String> {
            std::thread::sleep(std::time::Duration::from_millis(600));
            Ok("done".to_string())
        }
    }

    async fn test_state(dir: &TempDir) -> AppState {
        state_with_backend(dir, Box::new(EchoBackend)).await
    }

    async fn state_with_backend(dir: &TempDir, backend: Box<dyn CompletionBackend>) -> AppState {
        let db = Database::new(&dir.path().join("memory.db")).await.unwrap();
        let agent = Orchestrator::new(
            CompletionService::new(backend),
            Arc::new(db.memories()),
            ToolExecutor::new(dir.path()),
        );
        AppState::new(agent, "test-model", 30)
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let dir = TempDir::new().unwrap();
        let app = router(test_state(&dir).await);

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["generating"], false);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_health_reports_generation_in_flight() {
        let dir = TempDir::new().unwrap();
        let app = router(state_with_backend(&dir, Box::new(SlowBackend)).await);

        let query = tokio::spawn(
            app.clone()
                .oneshot(post_json("/query", json!({"query": "take your time"}))),
        );
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;

        let response = app
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_json(response).await["generating"], true);

        assert_eq!(query.await.unwrap().unwrap().status(), StatusCode::OK);
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_json(response).await["generating"], false);
    }

    #[tokio::test]
    async fn test_query_then_state() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir).await;

        let response = router(state.clone())
            .oneshot(post_json("/query", json!({"query": "hello"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["result"], "echoed");

        let response = router(state)
            .oneshot(Request::get("/state").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["state"], "completed");
        assert_eq!(body["model"], "test-model");
    }

    #[tokio::test]
    async fn test_query_rejects_missing_working_dir() {
        let dir = TempDir::new().unwrap();
        let app = router(test_state(&dir).await);
        let missing = dir.path().join("nope");

        let response = app
            .oneshot(post_json(
                "/query",
                json!({"query": "hello", "working_dir": missing.display().to_string()}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let dir = TempDir::new().unwrap();
        let app = router(test_state(&dir).await);

        let response = app
            .oneshot(post_json("/query", json!({"query": "  "})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_clear_memory_reports_count() {
        let dir = TempDir::new().unwrap();
        let app = router(test_state(&dir).await);

        let response = app
            .oneshot(
                Request::post("/clear_memory?days=7")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["cleared"], 0);
        assert_eq!(body["message"], "Cleared memories older than 7 days");
    }
}
