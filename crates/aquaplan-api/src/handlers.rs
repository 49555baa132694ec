//! API Handlers
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use tracing::error;

use aquaplan_core::{ExecutionRequest, ExecutionResult, ToolSpec, AQUAPLAN_VERSION};

use crate::AppState;

/// Always 200: pipeline failures are reported inside the result.
pub async fn run_pipeline(
    State(state): State<AppState>,
    Json(request): Json<ExecutionRequest>,
) -> Json<ExecutionResult> {
    Json(state.executor.execute(request).await)
}

pub async fn list_tools(State(state): State<AppState>) -> Json<Vec<ToolSpec>> {
    Json(state.executor.registry().specs().cloned().collect())
}

pub async fn health() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "version": AQUAPLAN_VERSION })),
    )
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
