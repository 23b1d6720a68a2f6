//! Liveness handlers

use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// GET / - Plain-text banner
pub async fn home() -> &'static str {
    "🤖 Spendie is running!"
}

/// GET /health - Service status
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// GET /ping
pub async fn ping() -> &'static str {
    "pong"
}
