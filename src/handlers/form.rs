//! Multipart dashboard submissions

use std::collections::HashMap;

use axum::extract::Multipart;

use crate::intake::Upload;
use crate::{AppError, AppResult};

/// Field carrying the traffic image
pub const IMAGE_FIELD: &str = "image";

/// Parsed submission: the optional image plus every text field
#[derive(Debug, Default)]
pub struct DashboardForm {
    pub image: Option<Upload>,
    pub fields: HashMap<String, String>,
}

impl DashboardForm {
    pub async fn read(mut multipart: Multipart) -> AppResult<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            if name == IMAGE_FIELD {
                let file_name = field.file_name().map(str::to_string);
                let bytes = field.bytes().await?;
                // Browsers send an empty part when no file was picked
                if bytes.is_empty() && file_name.as_deref().unwrap_or_default().is_empty() {
                    continue;
                }
                form.image = Some(Upload { file_name, bytes });
            } else {
                let value = field.text().await?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }

    /// Image upload that must be present
    pub fn require_image(self) -> AppResult<Upload> {
        self.image
            .ok_or_else(|| AppError::ValidationError(format!("Missing '{}' file field", IMAGE_FIELD)))
    }
}
