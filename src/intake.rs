//! Image intake - format checks, decoding and resizing for the classifier

use std::path::Path;

use axum::body::Bytes;
use image::{imageops::FilterType, ImageFormat, RgbImage};

use crate::inference::CLASSIFIER_INPUT_SIZE;
use crate::{AppError, AppResult};

pub const ACCEPTED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// An uploaded image file
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: Option<String>,
    pub bytes: Bytes,
}

impl Upload {
    /// Decode and resize to the classifier input size
    pub fn prepare(&self) -> AppResult<RgbImage> {
        if let Some(name) = &self.file_name {
            check_extension(name)?;
        }
        if self.bytes.is_empty() {
            return Err(AppError::ValidationError("Uploaded image is empty".to_string()));
        }

        let format = sniff_format(&self.bytes)?;
        let decoded = image::load_from_memory_with_format(&self.bytes, format)
            .map_err(|e| AppError::ValidationError(format!("Could not decode image: {}", e)))?;

        Ok(decoded
            .resize_exact(CLASSIFIER_INPUT_SIZE, CLASSIFIER_INPUT_SIZE, FilterType::CatmullRom)
            .to_rgb8())
    }
}

fn check_extension(file_name: &str) -> AppResult<()> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    if ACCEPTED_EXTENSIONS.contains(&extension.as_str()) {
        Ok(())
    } else {
        Err(AppError::UnsupportedMedia(format!(
            "'{}' is not a JPG/JPEG/PNG file", file_name
        )))
    }
}

fn sniff_format(bytes: &[u8]) -> AppResult<ImageFormat> {
    match image::guess_format(bytes) {
        Ok(format @ (ImageFormat::Png | ImageFormat::Jpeg)) => Ok(format),
        Ok(other) => Err(AppError::UnsupportedMedia(format!(
            "{:?} images are not supported, upload JPG/JPEG/PNG", other
        ))),
        Err(_) => Err(AppError::UnsupportedMedia("Unrecognized image data".to_string())),
    }
}
