mod activity;
mod catalog;
mod http;
mod import;
mod metrics;
mod models;
mod normalize;
mod queue;
mod settings;

use activity::LogEntry;
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use catalog::{CatalogGateway, UploadError, UploadOutcome};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use models::{ApiError, ProductDraft, QueuedItem};
use queue::{ImportSummary, QueueError, QueueRunner, RunnerConfig, RunnerState};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::json;
use settings::{AgentSettings, SettingsStore};
use std::{net::SocketAddr, sync::Arc};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};
use uuid::Uuid;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        error!(target = "catalog.api", "server crashed: {err:?}");
    }
}

async fn run() -> eyre::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let settings = SettingsStore::new(AgentSettings::from_env());
    let gateway = CatalogGateway::default();
    let (runner, _worker) = QueueRunner::spawn(
        Arc::new(gateway.clone()),
        settings.clone(),
        RunnerConfig::from_env(),
    );
    let prometheus_handle = PrometheusBuilder::new().install_recorder()?;
    let state = AppState {
        settings,
        runner,
        gateway,
        prometheus_handle,
    };

    let cors = CorsLayer::new()
        .allow_headers(Any)
        .allow_methods(Any)
        .allow_origin(Any);

    let app = router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::extract::DefaultBodyLimit::max(body_limit_from_env()));

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(8000);
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    info!(target = "catalog.api", "listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

#[derive(Clone)]
struct AppState {
    settings: SettingsStore,
    runner: QueueRunner,
    gateway: CatalogGateway,
    prometheus_handle: PrometheusHandle,
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/upload", post(upload_product))
        .route("/settings", get(get_settings).put(put_settings))
        .route("/queue", get(queue_status).post(enqueue_draft))
        .route("/queue/import", post(import_csv))
        .route("/queue/export", get(export_csv))
        .route("/queue/start", post(start_queue))
        .route("/queue/stop", post(stop_queue))
        .route("/logs", get(list_logs))
        .with_state(state)
}

/// Health and readiness check.
///
/// - Method: `GET`
/// - Path: `/health`
async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "catalog-agent-rs",
    }))
}

async fn metrics_endpoint(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
) -> Response {
    if let Ok(secret) = std::env::var("METRICS_KEY") {
        let presented = headers
            .get("X-Metrics-Key")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if presented != secret {
            return (StatusCode::UNAUTHORIZED, "unauthorized").into_response();
        }
    }
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.prometheus_handle.render(),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
struct UploadRequest {
    #[serde(default)]
    settings: AgentSettings,
    product: ProductDraft,
}

/// Push one product straight to the catalogue, bypassing the queue.
///
/// - Method: `POST`
/// - Path: `/api/upload`
/// - Body: `{ settings, product }`
/// - Response: `{ status: "simulated", payload }` or `{ status: "success", response }`
async fn upload_product(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<UploadOutcome>, AppError> {
    metrics::inc_requests("/api/upload");
    let request: UploadRequest = parse_json(&body)?;
    let product = normalize::normalize(&request.product);
    let outcome = state.gateway.upload(&product, &request.settings).await?;
    Ok(Json(outcome))
}

async fn get_settings(State(state): State<AppState>) -> Json<AgentSettings> {
    Json(state.settings.snapshot().await.redacted())
}

/// Replace operator settings. Takes effect from the next dispatched item.
async fn put_settings(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<AgentSettings>, AppError> {
    metrics::inc_requests("/settings");
    let incoming: AgentSettings = parse_json(&body)?;
    let settings = incoming.keep_secret_from(&state.settings.snapshot().await);
    info!(
        target = "catalog.api",
        mode = ?settings.mode,
        auto_start = settings.auto_start,
        "settings updated"
    );
    state.settings.replace(settings.clone()).await;
    Ok(Json(settings.redacted()))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueueView {
    state: RunnerState,
    active_item_id: Option<Uuid>,
    pending: Vec<QueuedItem>,
}

impl QueueView {
    fn current(runner: &QueueRunner) -> Self {
        let status = runner.status();
        Self {
            state: status.state,
            active_item_id: status.active_item_id,
            pending: status.pending,
        }
    }
}

async fn queue_status(State(state): State<AppState>) -> Json<QueueView> {
    Json(QueueView::current(&state.runner))
}

#[derive(Debug, Serialize)]
struct EnqueueResponse {
    id: String,
}

/// Queue one draft.
///
/// - Method: `POST`
/// - Path: `/queue`
/// - Body: `ProductDraft`
/// - Response: `{ id }`, or 400 when the title is blank
async fn enqueue_draft(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<EnqueueResponse>, AppError> {
    metrics::inc_requests("/queue");
    let draft: ProductDraft = parse_json(&body)?;
    let id = state.runner.enqueue(draft).await?;
    Ok(Json(EnqueueResponse { id: id.to_string() }))
}

/// Queue every row of a CSV file sent as the raw request body.
async fn import_csv(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ImportSummary>, AppError> {
    metrics::inc_requests("/queue/import");
    let content = std::str::from_utf8(&body)
        .map_err(|err| AppError::MalformedRequest(format!("csv body is not utf-8: {err}")))?;
    let summary = state.runner.import_csv(content).await?;
    info!(
        target = "catalog.api",
        queued = summary.queued,
        rejected = summary.rejected,
        "csv imported"
    );
    Ok(Json(summary))
}

async fn export_csv(State(state): State<AppState>) -> Response {
    let drafts: Vec<ProductDraft> = state
        .runner
        .status()
        .pending
        .into_iter()
        .map(|item| item.payload)
        .collect();
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"queue.csv\"",
            ),
        ],
        import::export_drafts(&drafts),
    )
        .into_response()
}

async fn start_queue(State(state): State<AppState>) -> Result<Json<QueueView>, AppError> {
    metrics::inc_requests("/queue/start");
    state.runner.start().await?;
    Ok(Json(QueueView::current(&state.runner)))
}

async fn stop_queue(State(state): State<AppState>) -> Result<Json<QueueView>, AppError> {
    metrics::inc_requests("/queue/stop");
    state.runner.stop().await?;
    Ok(Json(QueueView::current(&state.runner)))
}

/// Newest-first activity log, at most fifty entries.
async fn list_logs(State(state): State<AppState>) -> Json<Vec<LogEntry>> {
    Json(state.runner.status().logs)
}

fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, AppError> {
    serde_json::from_slice(body).map_err(|err| AppError::MalformedRequest(err.to_string()))
}

fn body_limit_from_env() -> usize {
    std::env::var("REQUEST_MAX_BYTES")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(1024 * 1024)
}

#[derive(Debug)]
enum AppError {
    Upload(UploadError),
    Queue(QueueError),
    MalformedRequest(String),
}

impl From<UploadError> for AppError {
    fn from(value: UploadError) -> Self {
        Self::Upload(value)
    }
}

impl From<QueueError> for AppError {
    fn from(value: QueueError) -> Self {
        Self::Queue(value)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, payload) = match self {
            AppError::Upload(err) => {
                let status = match &err {
                    UploadError::MissingFields(_) | UploadError::MissingCredentials(_) => {
                        StatusCode::BAD_REQUEST
                    }
                    UploadError::RemoteRejected { .. } => StatusCode::BAD_GATEWAY,
                    UploadError::RemoteUnreachable(_) => StatusCode::GATEWAY_TIMEOUT,
                };
                let detail = match &err {
                    UploadError::RemoteRejected { body, .. } => Some(body.to_string()),
                    _ => None,
                };
                (
                    status,
                    ApiError {
                        error: err.to_string(),
                        detail,
                    },
                )
            }
            AppError::Queue(err) => {
                let status = match &err {
                    QueueError::MissingTitle | QueueError::Schema(_) => StatusCode::BAD_REQUEST,
                    QueueError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
                };
                (
                    status,
                    ApiError {
                        error: err.to_string(),
                        detail: None,
                    },
                )
            }
            AppError::MalformedRequest(message) => (
                StatusCode::BAD_REQUEST,
                ApiError {
                    error: "malformed request body".to_string(),
                    detail: Some(message),
                },
            ),
        };
        (status, Json(payload)).into_response()
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    let _ = fmt().with_env_filter(filter).try_init();
}
