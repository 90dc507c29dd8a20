//! Health check handler

use axum::{extract::State, Json};
use serde::Serialize;

use crate::inference::ModelMethod;
use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    timestamp: i64,
    /// True when either model answers with the random stand-in
    degraded: bool,
}

pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    let degraded = state
        .models
        .status()
        .iter()
        .any(|model| model.method == ModelMethod::Fallback);

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().timestamp(),
        degraded,
    })
}
