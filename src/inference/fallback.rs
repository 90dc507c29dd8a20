//! Random stand-ins used when no model artifact is available

use image::RgbImage;
use rand::Rng;

use crate::models::FEATURE_COUNT;
use super::{
    finish_duration, DurationRegressor, EmergencyClassifier, InferenceError, ModelMethod,
    MAX_DURATION_SECS, MIN_DURATION_SECS,
};

/// Unweighted coin flip between 0 and 1
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomClassifier;

impl EmergencyClassifier for RandomClassifier {
    fn classify(&self, _image: &RgbImage) -> Result<u8, InferenceError> {
        Ok(u8::from(rand::thread_rng().gen_bool(0.5)))
    }

    fn method(&self) -> ModelMethod {
        ModelMethod::Fallback
    }
}

/// Uniform duration in [10, 60], two decimals
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomRegressor;

impl DurationRegressor for RandomRegressor {
    fn predict(&self, _features: &[f32; FEATURE_COUNT]) -> Result<f64, InferenceError> {
        let raw = rand::thread_rng().gen_range(MIN_DURATION_SECS..=MAX_DURATION_SECS);
        finish_duration(raw)
    }

    fn method(&self) -> ModelMethod {
        ModelMethod::Fallback
    }
}
