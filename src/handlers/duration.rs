//! Signal duration prediction handler

use axum::{extract::State, Json};

use crate::models::{DurationResponse, PredictionRecord, TrafficStatsInput};
use crate::{AppResult, AppState};

/// Predict the green signal duration from traffic stats alone.
/// Without an image the manual emergency selector is used.
pub async fn predict(
    State(state): State<AppState>,
    Json(input): Json<TrafficStatsInput>,
) -> AppResult<Json<DurationResponse>> {
    let record = input.into_record(None)?;
    let response = predict_record(&state, record).await?;
    Ok(Json(response))
}

/// Run the regressor for an assembled record
pub async fn predict_record(state: &AppState, record: PredictionRecord) -> AppResult<DurationResponse> {
    if !state.config.response_delay.is_zero() {
        tokio::time::sleep(state.config.response_delay).await;
    }

    let models = state.models.clone();
    let prediction = tokio::task::spawn_blocking(move || models.predict_duration(&record)).await??;

    tracing::info!(
        "Duration prediction: {}s ({:?}) for {:?}",
        prediction.seconds, prediction.method, record.row()
    );

    Ok(DurationResponse::new(&record, prediction))
}
