//! HTTP server setup

use std::future::Future;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ServerOptions;
use crate::errors::DispatcherError;
use crate::server::handlers::{
    backend_prod_handler, backend_test_handler, frontend_prod_handler, frontend_test_handler,
    health_handler,
};
use crate::server::state::ServerState;

/// Build the application router
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        // Health
        .route("/api/v1/health", get(health_handler))
        // Deploy webhooks, one route per target
        .route("/api/v1/peers/backend/test", post(backend_test_handler))
        .route("/api/v1/peers/backend/prod", post(backend_prod_handler))
        .route("/api/v1/peers/frontend/test", post(frontend_test_handler))
        .route("/api/v1/peers/frontend/prod", post(frontend_prod_handler))
        // State and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Start the HTTP server
pub async fn serve(
    options: &ServerOptions,
    state: Arc<ServerState>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<JoinHandle<Result<(), DispatcherError>>, DispatcherError> {
    let app = router(state);

    let addr = format!("{}:{}", options.host, options.port);
    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| DispatcherError::ServerError(e.to_string()))?;

    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| DispatcherError::ServerError(e.to_string()))
    });

    Ok(handle)
}
