use axum::{
    Json, Router,
    http::header,
    response::IntoResponse,
    routing::get,
};
use serde::Serialize;
use crate::error::{Error, Result};
use crate::observability::metrics;
use crate::utils::shutdown::Shutdown;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

pub fn create_router() -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_text))
}

/// Liveness only: answers while the process runs, whatever the queue or store
/// are doing.
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy" })
}

async fn metrics_text() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::render(),
    )
}

pub async fn serve(bind_addr: String, shutdown: Shutdown) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "Health server listening");

    axum::serve(listener, create_router())
        .with_graceful_shutdown(shutdown.wait())
        .await
        .map_err(|e| Error::Server(e.to_string()))
}
