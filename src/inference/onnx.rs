//! ONNX models executed with tract
//!
//! Classifier input: NHWC `[1, 128, 128, 3]` f32 in [0, 1].
//! Regressor input: `[1, 5]` f32 in feature row order.

use std::fmt;
use std::path::{Path, PathBuf};

use image::RgbImage;
use tract_onnx::prelude::*;

use crate::models::FEATURE_COUNT;
use super::{
    finish_duration, DurationRegressor, EmergencyClassifier, InferenceError, ModelMethod,
    CLASSIFIER_INPUT_SIZE,
};

type Plan = TypedRunnableModel<TypedModel>;

const SIDE: usize = CLASSIFIER_INPUT_SIZE as usize;

/// Parse, fix the input fact, optimize
fn load_plan(path: &Path, input_shape: TVec<usize>) -> Result<Plan, InferenceError> {
    tracing::info!("Loading ONNX model from: {}", path.display());

    if !path.is_file() {
        return Err(InferenceError::NotFound(path.display().to_string()));
    }

    let plan = tract_onnx::onnx()
        .model_for_path(path)
        .and_then(|model| {
            model.with_input_fact(0, InferenceFact::dt_shape(f32::datum_type(), input_shape))
        })
        .and_then(|model| model.into_optimized())
        .and_then(|model| model.into_runnable())
        .map_err(|e| InferenceError::Load {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

    tracing::info!("ONNX model loaded successfully: {}", path.display());
    Ok(plan)
}

/// Single input tensor in, first output flattened
fn run_plan(plan: &Plan, shape: &[usize], data: &[f32]) -> Result<Vec<f32>, InferenceError> {
    let input = Tensor::from_shape(shape, data)
        .map_err(|e| InferenceError::Run(format!("tensor error: {}", e)))?;

    let outputs = plan
        .run(tvec!(input.into()))
        .map_err(|e| InferenceError::Run(e.to_string()))?;

    let output = outputs
        .first()
        .ok_or_else(|| InferenceError::Shape("model produced no outputs".to_string()))?;

    let view = output
        .to_array_view::<f32>()
        .map_err(|e| InferenceError::Shape(format!("extract error: {}", e)))?;

    Ok(view.iter().copied().collect())
}

/// One value is a probability, two values are class scores
pub(crate) fn class_from_output(output: &[f32]) -> Result<u8, InferenceError> {
    if output.iter().any(|v| !v.is_finite()) {
        return Err(InferenceError::Run(format!("non-finite classifier output {:?}", output)));
    }
    match output {
        [probability] => Ok(u8::from(*probability >= 0.5)),
        [no_emergency, emergency] => Ok(u8::from(emergency > no_emergency)),
        _ => Err(InferenceError::Shape(format!(
            "expected 1 or 2 classifier outputs, got {}",
            output.len()
        ))),
    }
}

// ============================================================================
// CLASSIFIER
// ============================================================================

pub struct OnnxClassifier {
    plan: Plan,
    path: PathBuf,
}

impl OnnxClassifier {
    pub fn load(path: &Path) -> Result<Self, InferenceError> {
        let plan = load_plan(path, tvec!(1, SIDE, SIDE, 3))?;
        Ok(Self { plan, path: path.to_path_buf() })
    }
}

impl fmt::Debug for OnnxClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnnxClassifier").field("path", &self.path).finish()
    }
}

impl EmergencyClassifier for OnnxClassifier {
    fn classify(&self, image: &RgbImage) -> Result<u8, InferenceError> {
        if image.dimensions() != (CLASSIFIER_INPUT_SIZE, CLASSIFIER_INPUT_SIZE) {
            return Err(InferenceError::Run(format!(
                "classifier expects {}x{} input, got {}x{}",
                SIDE, SIDE, image.width(), image.height()
            )));
        }

        let pixels: Vec<f32> = image.as_raw().iter().map(|&c| c as f32 / 255.0).collect();
        let output = run_plan(&self.plan, &[1, SIDE, SIDE, 3], &pixels)?;
        class_from_output(&output)
    }

    fn method(&self) -> ModelMethod {
        ModelMethod::Onnx
    }
}

// ============================================================================
// REGRESSOR
// ============================================================================

pub struct OnnxRegressor {
    plan: Plan,
    path: PathBuf,
}

impl OnnxRegressor {
    pub fn load(path: &Path) -> Result<Self, InferenceError> {
        let plan = load_plan(path, tvec!(1, FEATURE_COUNT))?;
        Ok(Self { plan, path: path.to_path_buf() })
    }
}

impl fmt::Debug for OnnxRegressor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnnxRegressor").field("path", &self.path).finish()
    }
}

impl DurationRegressor for OnnxRegressor {
    fn predict(&self, features: &[f32; FEATURE_COUNT]) -> Result<f64, InferenceError> {
        let output = run_plan(&self.plan, &[1, FEATURE_COUNT], features)?;
        let raw = output
            .first()
            .copied()
            .ok_or_else(|| InferenceError::Shape("regressor produced an empty output".to_string()))?;
        finish_duration(raw as f64)
    }

    fn method(&self) -> ModelMethod {
        ModelMethod::Onnx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tokio_test::assert_err;

    #[test]
    fn test_class_from_probability() {
        assert_eq!(class_from_output(&[0.93]).unwrap(), 1);
        assert_eq!(class_from_output(&[0.5]).unwrap(), 1);
        assert_eq!(class_from_output(&[0.12]).unwrap(), 0);
    }

    #[test]
    fn test_class_from_scores() {
        assert_eq!(class_from_output(&[0.2, 0.8]).unwrap(), 1);
        assert_eq!(class_from_output(&[3.1, -1.0]).unwrap(), 0);
    }

    #[test]
    fn test_class_from_bad_output() {
        assert!(matches!(class_from_output(&[]), Err(InferenceError::Shape(_))));
        assert!(matches!(class_from_output(&[0.1, 0.2, 0.7]), Err(InferenceError::Shape(_))));
        assert!(matches!(class_from_output(&[f32::NAN]), Err(InferenceError::Run(_))));
    }

    #[test]
    fn test_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.onnx");

        let err = assert_err!(OnnxClassifier::load(&path));
        assert!(matches!(err, InferenceError::NotFound(_)));

        let err = assert_err!(OnnxRegressor::load(&path));
        assert!(matches!(err, InferenceError::NotFound(_)));
    }

    #[test]
    fn test_corrupt_artifact() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"definitely not a protobuf graph").unwrap();

        let err = assert_err!(OnnxClassifier::load(file.path()));
        assert!(matches!(err, InferenceError::Load { .. }));

        let err = assert_err!(OnnxRegressor::load(file.path()));
        assert!(matches!(err, InferenceError::Load { .. }));
    }

    #[test]
    fn test_directory_is_not_an_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let err = assert_err!(OnnxRegressor::load(dir.path()));
        assert!(matches!(err, InferenceError::NotFound(_)));
    }
}
