//! Deterministic models and fixtures for tests

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

use crate::models::FEATURE_COUNT;
use super::{DurationRegressor, EmergencyClassifier, InferenceError, ModelMethod};

/// Always answers the same class, counts calls
#[derive(Debug, Default)]
pub struct FixedClassifier {
    pub class_id: u8,
    pub calls: AtomicUsize,
}

impl FixedClassifier {
    pub fn new(class_id: u8) -> Self {
        Self { class_id, calls: AtomicUsize::new(0) }
    }
}

impl EmergencyClassifier for FixedClassifier {
    fn classify(&self, _image: &RgbImage) -> Result<u8, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.class_id)
    }

    fn method(&self) -> ModelMethod {
        ModelMethod::Onnx
    }
}

/// Echoes a raw value and remembers the last feature row
#[derive(Debug, Default)]
pub struct FixedRegressor {
    pub seconds: f64,
    pub last_features: parking_lot::Mutex<Option<[f32; FEATURE_COUNT]>>,
}

impl FixedRegressor {
    pub fn new(seconds: f64) -> Self {
        Self { seconds, last_features: parking_lot::Mutex::new(None) }
    }
}

impl DurationRegressor for FixedRegressor {
    fn predict(&self, features: &[f32; FEATURE_COUNT]) -> Result<f64, InferenceError> {
        *self.last_features.lock() = Some(*features);
        Ok(self.seconds)
    }

    fn method(&self) -> ModelMethod {
        ModelMethod::Onnx
    }
}

/// Loaded model whose every run fails
#[derive(Debug, Default, Clone, Copy)]
pub struct BrokenModel;

impl EmergencyClassifier for BrokenModel {
    fn classify(&self, _image: &RgbImage) -> Result<u8, InferenceError> {
        Err(InferenceError::Run("broken classifier".to_string()))
    }

    fn method(&self) -> ModelMethod {
        ModelMethod::Onnx
    }
}

impl DurationRegressor for BrokenModel {
    fn predict(&self, _features: &[f32; FEATURE_COUNT]) -> Result<f64, InferenceError> {
        Err(InferenceError::Run("broken regressor".to_string()))
    }

    fn method(&self) -> ModelMethod {
        ModelMethod::Onnx
    }
}

/// Encoded single-color image
pub fn encoded_image(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([200, 30, 30]));
    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut cursor, format)
        .expect("encode test image");
    cursor.into_inner()
}
