//! Inference Module - emergency classifier and signal duration regressor
//!
//! Each model is either an ONNX artifact or a random stand-in. Loaders
//! return `Result`; whether a failure turns into a stand-in is decided by
//! the caller through [`FallbackPolicy`].

pub mod fallback;
pub mod onnx;
pub mod registry;

#[cfg(test)]
pub mod testing;

use std::fmt;
use std::str::FromStr;

use image::RgbImage;
use serde::Serialize;

use crate::models::FEATURE_COUNT;

pub use fallback::{RandomClassifier, RandomRegressor};
pub use onnx::{OnnxClassifier, OnnxRegressor};
pub use registry::{ModelRegistry, ModelStatus};

/// Side length of the square image the classifier expects
pub const CLASSIFIER_INPUT_SIZE: u32 = 128;

/// Green signal bounds, seconds
pub const MIN_DURATION_SECS: f64 = 10.0;
pub const MAX_DURATION_SECS: f64 = 60.0;

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("model artifact not found: {0}")]
    NotFound(String),

    #[error("failed to load model {path}: {reason}")]
    Load { path: String, reason: String },

    #[error("unexpected model output: {0}")]
    Shape(String),

    #[error("inference failed: {0}")]
    Run(String),
}

// ============================================================================
// MODEL TRAITS
// ============================================================================

/// How a prediction was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelMethod {
    Onnx,
    Fallback,
}

/// Binary emergency vehicle classifier over a 128×128 RGB image
pub trait EmergencyClassifier: Send + Sync {
    /// Returns 0 (no emergency vehicle) or 1 (emergency vehicle)
    fn classify(&self, image: &RgbImage) -> Result<u8, InferenceError>;
    fn method(&self) -> ModelMethod;
}

/// Green signal duration regressor over the encoded feature row
pub trait DurationRegressor: Send + Sync {
    fn predict(&self, features: &[f32; FEATURE_COUNT]) -> Result<f64, InferenceError>;
    fn method(&self) -> ModelMethod;
}

// ============================================================================
// FALLBACK POLICY
// ============================================================================

/// What to do when a model cannot be loaded or run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackPolicy {
    /// Log the cause and answer with the random stand-in
    #[default]
    Random,
    /// Surface the error
    Strict,
}

impl FallbackPolicy {
    /// Decide the fate of a model failure. `Ok` carries the message to keep
    /// on record when the stand-in takes over.
    pub fn absorb(self, what: &str, err: InferenceError) -> Result<String, InferenceError> {
        match self {
            FallbackPolicy::Random => {
                tracing::warn!("{} unavailable ({}), using random fallback", what, err);
                Ok(err.to_string())
            }
            FallbackPolicy::Strict => Err(err),
        }
    }
}

impl fmt::Display for FallbackPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackPolicy::Random => f.write_str("random"),
            FallbackPolicy::Strict => f.write_str("strict"),
        }
    }
}

impl FromStr for FallbackPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random" | "fallback" => Ok(FallbackPolicy::Random),
            "strict" => Ok(FallbackPolicy::Strict),
            other => Err(format!("unknown fallback policy '{}'", other)),
        }
    }
}

// ============================================================================
// HELPERS
// ============================================================================

/// Clamp into the green signal bounds and round to two decimals
pub fn finish_duration(raw: f64) -> Result<f64, InferenceError> {
    if !raw.is_finite() {
        return Err(InferenceError::Run(format!("non-finite duration {}", raw)));
    }
    let clamped = raw.clamp(MIN_DURATION_SECS, MAX_DURATION_SECS);
    Ok((clamped * 100.0).round() / 100.0)
}
