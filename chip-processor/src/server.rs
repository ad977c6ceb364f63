use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::dispatcher::Dispatcher;
use crate::error::ProcessorError;
use crate::handlers::Outcome;

pub fn build_router(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        .route("/api/events/{topic}", post(ingest))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .with_state(dispatcher)
}

async fn ingest(
    Path(topic): Path<String>,
    State(dispatcher): State<Arc<Dispatcher>>,
    body: Bytes,
) -> Result<Json<Outcome>, ProcessorError> {
    match dispatcher.handle(&topic, &body).await {
        Ok(outcome) => Ok(Json(outcome)),
        Err(e) => {
            if e.is_retryable() {
                warn!(%topic, error = %e, "message failed, redelivery may succeed");
            } else {
                error!(%topic, error = %e, "message rejected");
            }
            Err(e)
        }
    }
}

async fn healthz() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "chip-processor",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn readyz(State(dispatcher): State<Arc<Dispatcher>>) -> (StatusCode, Json<Value>) {
    match dispatcher.context().mutator.index().health().await {
        Ok(()) => (StatusCode::OK, Json(json!({"status": "ready"}))),
        Err(e) => {
            warn!(error = %e, "index is not ready");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"status": "unavailable", "error": e.to_string()})),
            )
        }
    }
}

pub async fn start_server(
    dispatcher: Arc<Dispatcher>,
    port: u16,
) -> Result<(), std::io::Error> {
    let app = build_router(dispatcher);
    let listener = TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    info!("start server on port {}", port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
