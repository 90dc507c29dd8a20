//! Emergency vehicle detection handler

use axum::{extract::{Multipart, State}, Json};

use crate::handlers::form::DashboardForm;
use crate::intake::Upload;
use crate::models::{Detection, DetectionResponse};
use crate::{AppResult, AppState};

/// Classify an uploaded traffic image
pub async fn detect(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Json<DetectionResponse>> {
    let upload = DashboardForm::read(multipart).await?.require_image()?;
    let file_name = upload.file_name.clone();

    let detection = classify_upload(&state, upload).await?;

    tracing::info!(
        "Detection for {}: {}",
        file_name.as_deref().unwrap_or("<unnamed>"),
        detection.label()
    );

    Ok(Json(DetectionResponse::new(detection, file_name)))
}

/// Decode, resize and classify off the async runtime
pub async fn classify_upload(state: &AppState, upload: Upload) -> AppResult<Detection> {
    let models = state.models.clone();

    tokio::task::spawn_blocking(move || -> AppResult<Detection> {
        let image = upload.prepare()?;
        Ok(models.classify(&image)?)
    })
    .await?
}
