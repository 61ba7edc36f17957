//! Health check and service banner

use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
    pub timestamp: String,
}

/// GET /health
///
/// Does not require authentication.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "hermon-api".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: hermon_common::time::now_rfc3339(),
    })
}

#[derive(Debug, Serialize)]
pub struct BannerResponse {
    pub success: bool,
    pub message: String,
    pub version: String,
    pub build: String,
}

/// GET /
pub async fn banner() -> Json<BannerResponse> {
    Json(BannerResponse {
        success: true,
        message: "Hermon Keerthanalu API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        build: env!("GIT_HASH").to_string(),
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

pub fn root_routes() -> Router<AppState> {
    Router::new().route("/", get(banner))
}
