//! HTTP server for the task board API and event stream.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::events;
use crate::config::StreamConfig;
use crate::db::Database;
use crate::error::{ApiError, ApiResult};
use crate::types::{Task, TaskInput, TaskPatch, WatcherConfig};

/// Server state shared across handlers.
#[derive(Clone)]
pub struct ApiServer {
    /// Reference to the task database.
    db: Arc<Database>,
    /// Event stream settings.
    stream: StreamConfig,
}

impl ApiServer {
    pub fn new(db: Arc<Database>, stream: StreamConfig) -> Self {
        Self { db, stream }
    }

    /// Get the database reference.
    pub fn db(&self) -> &Arc<Database> {
        &self.db
    }

    /// Poll interval of the change-detection loop.
    pub fn poll_interval(&self) -> Duration {
        self.stream.poll_interval()
    }
}

/// Health check response.
#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

fn validate_progress(progress: Option<i64>) -> ApiResult<()> {
    match progress {
        Some(p) if !(0..=100).contains(&p) => Err(ApiError::invalid_value(
            "progress",
            "progress must be between 0 and 100",
        )),
        _ => Ok(()),
    }
}

async fn list_tasks(State(state): State<ApiServer>) -> ApiResult<Json<Vec<Task>>> {
    let tasks = state.db().list_tasks().map_err(ApiError::database)?;
    Ok(Json(tasks))
}

async fn create_task(
    State(state): State<ApiServer>,
    Json(input): Json<TaskInput>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    if input.title.trim().is_empty() {
        return Err(ApiError::missing_field("title"));
    }
    validate_progress(input.progress)?;

    let task = state.db().create_task(input).map_err(ApiError::database)?;
    Ok((StatusCode::CREATED, Json(task)))
}

async fn get_task(
    State(state): State<ApiServer>,
    Path(id): Path<String>,
) -> ApiResult<Json<Task>> {
    let task = state
        .db()
        .get_task(&id)
        .map_err(ApiError::database)?
        .ok_or_else(|| ApiError::task_not_found(&id))?;
    Ok(Json(task))
}

async fn update_task(
    State(state): State<ApiServer>,
    Path(id): Path<String>,
    Json(patch): Json<TaskPatch>,
) -> ApiResult<Json<Task>> {
    if let Some(title) = &patch.title {
        if title.trim().is_empty() {
            return Err(ApiError::invalid_value("title", "title must not be empty"));
        }
    }
    validate_progress(patch.progress)?;

    let task = state
        .db()
        .update_task(&id, patch)
        .map_err(ApiError::database)?
        .ok_or_else(|| ApiError::task_not_found(&id))?;
    Ok(Json(task))
}

async fn delete_task(
    State(state): State<ApiServer>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let deleted = state.db().delete_task(&id).map_err(ApiError::database)?;
    if !deleted {
        return Err(ApiError::task_not_found(&id));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn get_watcher(State(state): State<ApiServer>) -> ApiResult<Json<WatcherConfig>> {
    let config = state.db().watcher_config().map_err(ApiError::database)?;
    Ok(Json(config))
}

/// Body for the user-facing agent loop toggle.
#[derive(Debug, Deserialize)]
struct SetRunningRequest {
    is_running: bool,
}

async fn set_watcher_running(
    State(state): State<ApiServer>,
    Json(body): Json<SetRunningRequest>,
) -> ApiResult<Json<WatcherConfig>> {
    let config = state
        .db()
        .set_watcher_running(body.is_running)
        .map_err(ApiError::database)?;
    Ok(Json(config))
}

/// Heartbeat body sent by the external agent process.
#[derive(Debug, Deserialize)]
struct HeartbeatRequest {
    current_task_id: Option<String>,
    #[serde(default)]
    active_task_ids: Vec<String>,
}

async fn watcher_heartbeat(
    State(state): State<ApiServer>,
    Json(body): Json<HeartbeatRequest>,
) -> ApiResult<Json<WatcherConfig>> {
    let config = state
        .db()
        .record_watcher_heartbeat(body.current_task_id, body.active_task_ids)
        .map_err(ApiError::database)?;
    Ok(Json(config))
}

fn build_router(state: ApiServer) -> Router {
    // Browsers on other origins consume the stream directly
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route(
            "/api/tasks/{id}",
            get(get_task).patch(update_task).delete(delete_task),
        )
        .route("/api/watcher", get(get_watcher))
        .route("/api/watcher/running", post(set_watcher_running))
        .route("/api/watcher/heartbeat", post(watcher_heartbeat))
        .route("/api/events", get(events::events))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server on the specified port.
///
/// Returns a oneshot sender that signals shutdown, and the actual address
/// the server is bound to (pass port 0 for an ephemeral port).
pub async fn start_server(
    db: Arc<Database>,
    port: u16,
    stream: StreamConfig,
) -> anyhow::Result<(oneshot::Sender<()>, SocketAddr)> {
    let state = ApiServer::new(db, stream);
    let app = build_router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    info!("Task board API listening on http://{}", bound_addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                info!("Task board API shutting down");
            })
            .await
        {
            tracing::error!("Task board API server error: {}", e);
        }
    });

    Ok((shutdown_tx, bound_addr))
}
