//! HTTP server implementation for the web dashboard.
//!
//! Serves the embedded dashboard page and a JSON API over the
//! [`DashboardStore`]. Every mutation goes through the store, so the API and
//! the periodic refresh share one source of truth.

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{delete, get, post},
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::templates;
use crate::config::UiConfig;
use crate::error::{ApiError, ApiResult};
use crate::store::{DashboardSnapshot, DashboardStore};
use crate::types::{FilterPatch, FilterSettings, Project, Widget, WidgetType};
use crate::widgets::WidgetView;

/// Dashboard server state shared across handlers.
#[derive(Clone)]
pub struct DashboardServer {
    store: Arc<DashboardStore>,
    port: u16,
}

impl DashboardServer {
    pub fn new(store: Arc<DashboardStore>, port: u16) -> Self {
        Self { store, port }
    }

    pub fn store(&self) -> &Arc<DashboardStore> {
        &self.store
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Debug, Deserialize)]
struct AddWidgetRequest {
    #[serde(rename = "type")]
    widget_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReorderRequest {
    from: usize,
    to: usize,
}

#[derive(Debug, Serialize)]
struct RemoveWidgetResponse {
    removed: bool,
}

fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}

/// Root endpoint - serves the dashboard page.
async fn root() -> Html<&'static str> {
    Html(templates::INDEX_TEMPLATE)
}

/// Health check endpoint.
async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// API root - returns available endpoints.
async fn api_root() -> impl IntoResponse {
    Json(serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "GET /api/health",
            "dashboard": "GET /api/dashboard",
            "projects": "GET /api/projects, GET /api/projects/{id}",
            "filters": "GET /api/filters, PATCH /api/filters",
            "widgets": "GET|POST /api/widgets, DELETE /api/widgets/{id}, POST /api/widgets/reorder, GET /api/widgets/{id}/view",
            "refresh": "POST /api/refresh",
        }
    }))
}

async fn api_dashboard(State(state): State<DashboardServer>) -> Json<DashboardSnapshot> {
    Json(state.store().snapshot())
}

async fn api_projects(State(state): State<DashboardServer>) -> Json<Vec<Project>> {
    Json(state.store().filtered_projects())
}

async fn api_project(
    State(state): State<DashboardServer>,
    Path(project_id): Path<u32>,
) -> ApiResult<Json<Project>> {
    state
        .store()
        .fetch_project(project_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::project_not_found(project_id))
}

async fn api_filters(State(state): State<DashboardServer>) -> Json<FilterSettings> {
    Json((*state.store().filters()).clone())
}

async fn api_update_filters(
    State(state): State<DashboardServer>,
    Json(patch): Json<FilterPatch>,
) -> Json<FilterSettings> {
    Json(state.store().update_filters(patch))
}

async fn api_widgets(State(state): State<DashboardServer>) -> Json<Vec<Widget>> {
    Json((*state.store().widgets()).clone())
}

async fn api_add_widget(
    State(state): State<DashboardServer>,
    Json(request): Json<AddWidgetRequest>,
) -> ApiResult<(StatusCode, Json<Widget>)> {
    let raw = request
        .widget_type
        .ok_or_else(|| ApiError::missing_field("type"))?;
    let widget_type: WidgetType = raw
        .parse()
        .map_err(|e: String| ApiError::invalid_value("type", &e))?;
    Ok((StatusCode::CREATED, Json(state.store().add_widget(widget_type))))
}

async fn api_remove_widget(
    State(state): State<DashboardServer>,
    Path(widget_id): Path<String>,
) -> Json<RemoveWidgetResponse> {
    Json(RemoveWidgetResponse {
        removed: state.store().remove_widget(&widget_id),
    })
}

async fn api_reorder_widgets(
    State(state): State<DashboardServer>,
    Json(request): Json<ReorderRequest>,
) -> ApiResult<Json<Vec<Widget>>> {
    state.store().reorder_widget(request.from, request.to)?;
    Ok(Json((*state.store().widgets()).clone()))
}

async fn api_widget_view(
    State(state): State<DashboardServer>,
    Path(widget_id): Path<String>,
) -> ApiResult<Json<WidgetView>> {
    let widget = state
        .store()
        .widget(&widget_id)
        .ok_or_else(|| ApiError::widget_not_found(&widget_id))?;
    let projects = state.store().filtered_projects();
    Ok(Json(WidgetView::render(widget.widget_type, &projects, today())))
}

async fn api_refresh(State(state): State<DashboardServer>) -> ApiResult<Json<DashboardSnapshot>> {
    state.store().refresh().await?;
    Ok(Json(state.store().snapshot()))
}

/// Build the router with all routes.
pub fn build_router(state: DashboardServer) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/api", get(api_root))
        .route("/api/health", get(health))
        .route("/api/dashboard", get(api_dashboard))
        .route("/api/projects", get(api_projects))
        .route("/api/projects/{project_id}", get(api_project))
        .route("/api/filters", get(api_filters).patch(api_update_filters))
        .route("/api/widgets", get(api_widgets).post(api_add_widget))
        .route("/api/widgets/reorder", post(api_reorder_widgets))
        .route("/api/widgets/{widget_id}", delete(api_remove_widget))
        .route("/api/widgets/{widget_id}/view", get(api_widget_view))
        .route("/api/refresh", post(api_refresh))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Status of the dashboard server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardStatus {
    /// Dashboard is running and serving requests.
    Running,
    /// Dashboard failed to start, retrying in background.
    Retrying,
    /// Dashboard has been shut down.
    Stopped,
}

/// Handle for managing the dashboard server lifecycle.
pub struct DashboardHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    status_rx: watch::Receiver<DashboardStatus>,
}

impl DashboardHandle {
    /// Get the current status of the dashboard.
    pub fn status(&self) -> DashboardStatus {
        *self.status_rx.borrow()
    }

    /// Wait until the status changes to `wanted`.
    pub async fn wait_for(&mut self, wanted: DashboardStatus) -> bool {
        self.status_rx.wait_for(|s| *s == wanted).await.is_ok()
    }

    /// Trigger shutdown of the dashboard server.
    pub fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Bind and serve on `127.0.0.1:port` (0 picks a free port).
///
/// Returns a sender that stops the server and the bound address.
pub async fn start_server(
    store: Arc<DashboardStore>,
    port: u16,
) -> anyhow::Result<(oneshot::Sender<()>, SocketAddr)> {
    let app = build_router(DashboardServer::new(store, port));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    info!("Dashboard server listening on http://{}", bound_addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                info!("Dashboard server shutting down");
            })
            .await
        {
            tracing::error!("Dashboard server error: {}", e);
        }
    });

    Ok((shutdown_tx, bound_addr))
}

/// `base_ms` shifted by a uniform jitter in `±jitter_ms`, at least one second.
fn jittered_delay(base_ms: u64, jitter_ms: u64) -> Duration {
    let jitter = if jitter_ms > 0 {
        let j = jitter_ms as i64;
        rand::thread_rng().gen_range(-j..=j)
    } else {
        0
    };
    Duration::from_millis((base_ms as i64 + jitter).max(1000) as u64)
}

/// Start the HTTP server, retrying in the background while the port is busy.
///
/// Never fails: bind errors are logged and retried with jittered exponential
/// backoff. The returned handle reports status and stops the server.
pub fn start_server_with_retry(store: Arc<DashboardStore>, ui_config: &UiConfig) -> DashboardHandle {
    let ui = ui_config.clone();

    let (status_tx, status_rx) = watch::channel(DashboardStatus::Retrying);
    let (handle_shutdown_tx, mut handle_shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let mut current_delay_ms = ui.retry_initial_ms;

        loop {
            match handle_shutdown_rx.try_recv() {
                Ok(()) | Err(oneshot::error::TryRecvError::Closed) => {
                    info!("Dashboard retry loop shutting down");
                    let _ = status_tx.send(DashboardStatus::Stopped);
                    break;
                }
                Err(oneshot::error::TryRecvError::Empty) => {}
            }

            match start_server(Arc::clone(&store), ui.port).await {
                Ok((server_shutdown_tx, bound_addr)) => {
                    info!("Dashboard available at http://{}", bound_addr);
                    let _ = status_tx.send(DashboardStatus::Running);

                    let _ = (&mut handle_shutdown_rx).await;
                    let _ = server_shutdown_tx.send(());
                    let _ = status_tx.send(DashboardStatus::Stopped);
                    break;
                }
                Err(e) => {
                    warn!(
                        "Failed to start dashboard on port {}: {}. Retrying in {:.1}s...",
                        ui.port,
                        e,
                        current_delay_ms as f64 / 1000.0
                    );
                    let _ = status_tx.send(DashboardStatus::Retrying);

                    tokio::select! {
                        _ = tokio::time::sleep(jittered_delay(current_delay_ms, ui.retry_jitter_ms)) => {}
                        _ = &mut handle_shutdown_rx => {
                            let _ = status_tx.send(DashboardStatus::Stopped);
                            break;
                        }
                    }

                    current_delay_ms =
                        ((current_delay_ms as f64 * ui.retry_multiplier) as u64).min(ui.retry_max_ms);
                }
            }
        }
    });

    DashboardHandle {
        shutdown_tx: Some(handle_shutdown_tx),
        status_rx,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "healthy",
            version: "0.1.0",
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("0.1.0"));
    }

    #[test]
    fn test_api_error_status_codes() {
        let response = ApiError::widget_not_found("nope").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = ApiError::new(ErrorCode::IndexOutOfRange, "bad").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_jittered_delay_bounds() {
        for _ in 0..100 {
            let delay = jittered_delay(15_000, 5_000);
            assert!(delay >= Duration::from_millis(10_000));
            assert!(delay <= Duration::from_millis(20_000));
        }
        assert_eq!(jittered_delay(10, 0), Duration::from_millis(1000));
    }

    #[test]
    fn test_add_widget_request_accepts_missing_type() {
        let request: AddWidgetRequest = serde_json::from_str("{}").unwrap();
        assert!(request.widget_type.is_none());
    }
}
