//! HTTP surface: the MJPEG relay, record routes and a status endpoint.
//!
//! - `GET /proxy-stream`, `GET /api/proxy-stream`: live camera relay
//! - `GET|POST /api/soldiers`, `PUT|DELETE /api/soldiers/:id`
//! - `GET|POST /api/system-logs`, `GET|POST /api/threats`
//! - `GET /api/status`: uptime and relay counters

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE, EXPIRES, PRAGMA};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use sentinel_core::{
    CoreError, NewSystemLog, NewThreat, RecordId, RecordService, Soldier, SoldierFields,
    StreamRelay, SystemLog, Threat,
};

/// Sent with every relayed stream.
pub const NO_CACHE: &str = "no-cache, no-store, must-revalidate";

// ── State ───────────────────────────────────────────────────────────

/// Shared state for all handlers.
pub struct AppState {
    relay: StreamRelay,
    records: Option<RecordService>,
    content_type: String,
    started: Instant,
}

impl AppState {
    /// `records` is `None` when no store is configured; record routes then
    /// answer 503.
    pub fn new(relay: StreamRelay, records: Option<RecordService>, boundary: &str) -> Self {
        Self {
            relay,
            records,
            content_type: format!("multipart/x-mixed-replace; boundary={boundary}"),
            started: Instant::now(),
        }
    }

    fn records(&self) -> Result<&RecordService, ApiError> {
        self.records.as_ref().ok_or(ApiError::StoreNotConfigured)
    }
}

// ── Errors ──────────────────────────────────────────────────────────

/// Relay failures, answered in plain text.
#[derive(Debug)]
pub struct RelayError(CoreError);

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        match self.0 {
            CoreError::UpstreamStatus { status, reason } => {
                let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
                (status, format!("Camera stream error: {reason}")).into_response()
            }
            CoreError::UpstreamUnreachable { reason, .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to connect to camera stream: {reason}"),
            )
                .into_response(),
            other => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to connect to camera stream: {other}"),
            )
                .into_response(),
        }
    }
}

/// Record route failures, answered as `{"error": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    Core(CoreError),
    StoreNotConfigured,
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        Self::Core(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::StoreNotConfigured => (
                StatusCode::SERVICE_UNAVAILABLE,
                "record store is not configured".to_owned(),
            ),
            Self::Core(err @ CoreError::Validation { .. }) => {
                (StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
            }
            Self::Core(err @ CoreError::NotFound { .. }) => (StatusCode::NOT_FOUND, err.to_string()),
            Self::Core(err) => {
                warn!(error = %err, "record store request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

// ── Router ──────────────────────────────────────────────────────────

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/proxy-stream", get(proxy_stream))
        .route("/api/proxy-stream", get(proxy_stream))
        .route("/api/status", get(status))
        .route("/api/soldiers", get(list_soldiers).post(create_soldier))
        .route("/api/soldiers/:id", put(update_soldier).delete(delete_soldier))
        .route("/api/system-logs", get(list_logs).post(create_log))
        .route("/api/threats", get(list_threats).post(create_threat))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Serve until `shutdown` is cancelled.
///
/// Open relays are children of the same token, so they end with the
/// server instead of holding graceful shutdown open forever.
pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    info!(%addr, "relay listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("server stopped");
    Ok(())
}

// ── Relay ───────────────────────────────────────────────────────────

async fn proxy_stream(State(state): State<Arc<AppState>>) -> Result<Response, RelayError> {
    let body = state.relay.open().await.map_err(RelayError)?;
    let headers = [
        (CONTENT_TYPE, state.content_type.clone()),
        (CACHE_CONTROL, NO_CACHE.to_owned()),
        (PRAGMA, "no-cache".to_owned()),
        (EXPIRES, "0".to_owned()),
    ];
    Ok((headers, Body::from_stream(body)).into_response())
}

#[derive(Debug, Serialize)]
struct StatusBody {
    uptime_secs: u64,
    active_relays: usize,
    relays_started: u64,
    bytes_relayed: u64,
    store_configured: bool,
}

async fn status(State(state): State<Arc<AppState>>) -> Json<StatusBody> {
    let stats = state.relay.stats();
    Json(StatusBody {
        uptime_secs: state.started.elapsed().as_secs(),
        active_relays: stats.active_relays,
        relays_started: stats.relays_started,
        bytes_relayed: stats.bytes_relayed,
        store_configured: state.records.is_some(),
    })
}

// ── Soldiers ────────────────────────────────────────────────────────

async fn list_soldiers(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Soldier>>, ApiError> {
    Ok(Json(state.records()?.soldiers().await?))
}

async fn create_soldier(
    State(state): State<Arc<AppState>>,
    Json(fields): Json<SoldierFields>,
) -> Result<(StatusCode, Json<Soldier>), ApiError> {
    let soldier = state.records()?.add_soldier(&fields).await?;
    Ok((StatusCode::CREATED, Json(soldier)))
}

async fn update_soldier(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(fields): Json<SoldierFields>,
) -> Result<Json<Soldier>, ApiError> {
    let id = RecordId::from(id);
    Ok(Json(state.records()?.update_soldier(&id, &fields).await?))
}

async fn delete_soldier(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = RecordId::from(id);
    state.records()?.remove_soldier(&id).await?;
    Ok(Json(json!({ "ok": true })))
}

// ── System logs ─────────────────────────────────────────────────────

async fn list_logs(State(state): State<Arc<AppState>>) -> Result<Json<Vec<SystemLog>>, ApiError> {
    Ok(Json(state.records()?.system_logs().await?))
}

async fn create_log(
    State(state): State<Arc<AppState>>,
    Json(entry): Json<NewSystemLog>,
) -> Result<(StatusCode, Json<SystemLog>), ApiError> {
    let log = state.records()?.add_system_log(&entry).await?;
    Ok((StatusCode::CREATED, Json(log)))
}

// ── Threats ─────────────────────────────────────────────────────────

async fn list_threats(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Threat>>, ApiError> {
    Ok(Json(state.records()?.threats().await?))
}

async fn create_threat(
    State(state): State<Arc<AppState>>,
    Json(threat): Json<NewThreat>,
) -> Result<(StatusCode, Json<Threat>), ApiError> {
    let threat = state.records()?.add_threat(&threat).await?;
    Ok((StatusCode::CREATED, Json(threat)))
}
