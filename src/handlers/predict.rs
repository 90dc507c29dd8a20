//! Combined dashboard handler: optional image plus traffic stats

use axum::{extract::{Multipart, State}, Json};

use crate::handlers::{detection::classify_upload, duration::predict_record, form::DashboardForm};
use crate::models::{DashboardResponse, DetectionResponse, TrafficStatsInput};
use crate::{AppResult, AppState};

/// When an image is attached its classification becomes the emergency
/// flag; otherwise the `emergency_flag` field is used.
pub async fn submit(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Json<DashboardResponse>> {
    let form = DashboardForm::read(multipart).await?;
    let input = TrafficStatsInput::from_form_fields(&form.fields)?;

    let detection = match form.image {
        Some(upload) => {
            let file_name = upload.file_name.clone();
            let detection = classify_upload(&state, upload).await?;
            Some(DetectionResponse::new(detection, file_name))
        }
        None => None,
    };

    let record = input.into_record(detection.as_ref().map(|d| d.is_emergency))?;
    let duration = predict_record(&state, record).await?;

    Ok(Json(DashboardResponse { detection, duration }))
}
