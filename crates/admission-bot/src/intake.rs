//! HTTP endpoint the registration forms post to
//!
//! Routes:
//! - `POST /submit/student`, `POST /submit/graduate` - form submissions
//! - `GET /health` - liveness with uptime
//! - `GET /metrics` - Prometheus text format
//!
//! A submission is answered with 200 as soon as the workflow has handled it,
//! whether or not the payload could be decoded: a broken payload is the
//! admins' problem, they get a notice in the admin chat.

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use admission_core::model::Role;
use admission_core::workflow::ModerationWorkflow;

pub const ACCEPTED_STATUS: &str = "Данные переданы на модерацию";
pub const BODY_READ_ERROR: &str = "Ошибка чтения тела запроса";
pub const UNKNOWN_PATH_ERROR: &str = "Неизвестный путь";

/// Shared state for the intake server
#[derive(Clone)]
pub struct IntakeState {
    workflow: Arc<ModerationWorkflow>,
    start_time: Instant,
}

impl IntakeState {
    pub fn new(workflow: Arc<ModerationWorkflow>) -> Self {
        Self {
            workflow,
            start_time: Instant::now(),
        }
    }
}

pub fn router(state: IntakeState) -> Router {
    Router::new()
        .route("/submit/{role}", post(submit_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .fallback(not_found_handler)
        .method_not_allowed_fallback(not_found_handler)
        .with_state(state)
}

/// Binds the intake address.
pub async fn bind(addr: SocketAddr) -> anyhow::Result<TcpListener> {
    TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind intake server to {}: {}", addr, e))
}

/// Serves `app` until `shutdown` is cancelled, then lets open requests finish.
pub async fn serve(listener: TcpListener, app: Router, shutdown: CancellationToken) -> anyhow::Result<()> {
    log::info!("Starting intake server on http://{}", listener.local_addr()?);
    log::info!("  /submit/student  - Student form submissions");
    log::info!("  /submit/graduate - Graduate form submissions");
    log::info!("  /health          - Health check");
    log::info!("  /metrics         - Prometheus metrics");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    log::info!("Intake server stopped");
    Ok(())
}

/// Handler for /submit/{role}
async fn submit_handler(
    State(state): State<IntakeState>,
    Path(role): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let Ok(role) = Role::from_str(&role) else {
        return not_found_handler().await.into_response();
    };

    let body = match body {
        Ok(body) => body,
        Err(e) => {
            log::error!("Failed to read {} submission body: {}", role, e);
            return (StatusCode::BAD_REQUEST, Json(json!({ "error": BODY_READ_ERROR }))).into_response();
        }
    };

    let outcome = state.workflow.intake(role, &body).await;
    log::info!("{} submission handled: {:?}", role, outcome);

    (StatusCode::OK, Json(json!({ "status": ACCEPTED_STATUS }))).into_response()
}

/// Handler for /health endpoint
async fn health_handler(State(state): State<IntakeState>) -> impl IntoResponse {
    let health_status = json!({
        "status": "healthy",
        "uptime_seconds": state.start_time.elapsed().as_secs(),
        "service": "admission-bot",
        "version": env!("CARGO_PKG_VERSION"),
    });

    (StatusCode::OK, Json(health_status))
}

/// Handler for /metrics endpoint
async fn metrics_handler(State(state): State<IntakeState>) -> Response {
    match state.workflow.metrics().render() {
        Ok((content_type, body)) => (StatusCode::OK, [(header::CONTENT_TYPE, content_type)], body).into_response(),
        Err(e) => {
            log::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
                .into_response()
        }
    }
}

async fn not_found_handler() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": UNKNOWN_PATH_ERROR })))
}
