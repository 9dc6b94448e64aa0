//! Welcome and health check endpoints

use axum::{Json, Router, routing::get};
use serde::Serialize;

/// Welcome message response
#[derive(Serialize)]
pub struct WelcomeResponse {
    pub message: &'static str,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Build welcome/health router
pub fn router() -> Router {
    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
}

async fn home() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: "Welcome to AI Audio Processing API",
    })
}

/// Liveness probe - is the service running?
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
