//! Model status handlers

use axum::{extract::State, Json};

use crate::inference::ModelStatus;
use crate::{AppResult, AppState};

/// Status of both models
pub async fn status(State(state): State<AppState>) -> Json<Vec<ModelStatus>> {
    Json(state.models.status())
}

/// Re-read both artifacts with the configured fallback policy
pub async fn reload(State(state): State<AppState>) -> AppResult<Json<Vec<ModelStatus>>> {
    tracing::info!("Reloading models (fallback policy: {})", state.models.policy());

    let models = state.models.clone();
    tokio::task::spawn_blocking(move || models.reload()).await??;
    Ok(Json(state.models.status()))
}
