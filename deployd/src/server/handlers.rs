//! HTTP request handlers

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use crate::config::TargetId;
use crate::server::state::ServerState;
use crate::telemetry::{collect_health, HealthStatus};
use crate::webhook::dispatch::handle_update;

/// Uniform response envelope shared by every endpoint
#[derive(Debug, Serialize)]
pub struct ApiEnvelope {
    pub success: bool,
    pub message: String,
    pub data: Option<Value>,
}

/// Build an envelope response
pub fn envelope(status: StatusCode, success: bool, message: &str, data: Option<Value>) -> Response {
    (
        status,
        Json(ApiEnvelope {
            success,
            message: message.to_string(),
            data,
        }),
    )
        .into_response()
}

/// Health check handler
pub async fn health_handler(State(state): State<Arc<ServerState>>) -> Response {
    let report = collect_health(
        &state.config.service_name,
        state.config.server.port,
        state.started_at,
    );

    let (status, success, message) = match report.status {
        HealthStatus::Up => (StatusCode::OK, true, "Healthy"),
        HealthStatus::Degraded => (
            StatusCode::SERVICE_UNAVAILABLE,
            false,
            "System memory is running critically low.",
        ),
    };

    envelope(status, success, message, serde_json::to_value(&report).ok())
}

pub async fn backend_test_handler(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    handle_update(state, TargetId::BackendTest, headers, body).await
}

pub async fn backend_prod_handler(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    handle_update(state, TargetId::BackendProd, headers, body).await
}

pub async fn frontend_test_handler(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    handle_update(state, TargetId::FrontendTest, headers, body).await
}

pub async fn frontend_prod_handler(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    handle_update(state, TargetId::FrontendProd, headers, body).await
}
