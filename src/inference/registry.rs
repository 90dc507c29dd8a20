//! Model registry - loaded once, shared by every request
//!
//! Holds the classifier and the regressor behind `RwLock<Arc<..>>` so a
//! reload can swap them without blocking in-flight predictions.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use image::RgbImage;
use parking_lot::RwLock;
use serde::Serialize;

use crate::models::{Detection, DurationPrediction, PredictionRecord};
use super::{
    finish_duration, DurationRegressor, EmergencyClassifier, FallbackPolicy, InferenceError,
    ModelMethod, OnnxClassifier, OnnxRegressor, RandomClassifier, RandomRegressor,
};

pub const CLASSIFIER_NAME: &str = "emergency_cnn";
pub const REGRESSOR_NAME: &str = "signal_duration";

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Model status for the dashboard
#[derive(Debug, Clone, Serialize)]
pub struct ModelStatus {
    pub name: &'static str,
    pub artifact_path: String,
    pub method: ModelMethod,
    pub load_error: Option<String>,
    pub loaded_at: DateTime<Utc>,
    pub inference_count: u64,
    pub fallback_count: u64,
    pub avg_latency_ms: f32,
}

/// A model plus the outcome of loading it
pub struct Loaded<M: ?Sized> {
    pub model: Arc<M>,
    pub load_error: Option<String>,
}

struct Current<M: ?Sized> {
    model: Arc<M>,
    load_error: Option<String>,
    loaded_at: DateTime<Utc>,
}

struct ModelSlot<M: ?Sized> {
    name: &'static str,
    path: PathBuf,
    current: RwLock<Current<M>>,
    latency_sum_us: AtomicU64,
    inference_count: AtomicU64,
    fallback_count: AtomicU64,
}

impl<M: ?Sized> ModelSlot<M> {
    fn new(name: &'static str, path: PathBuf, loaded: Loaded<M>) -> Self {
        Self {
            name,
            path,
            current: RwLock::new(Current {
                model: loaded.model,
                load_error: loaded.load_error,
                loaded_at: Utc::now(),
            }),
            latency_sum_us: AtomicU64::new(0),
            inference_count: AtomicU64::new(0),
            fallback_count: AtomicU64::new(0),
        }
    }

    fn model(&self) -> Arc<M> {
        self.current.read().model.clone()
    }

    fn replace(&self, loaded: Loaded<M>) {
        *self.current.write() = Current {
            model: loaded.model,
            load_error: loaded.load_error,
            loaded_at: Utc::now(),
        };
    }

    fn record(&self, elapsed: Duration) {
        self.latency_sum_us.fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
        self.inference_count.fetch_add(1, Ordering::Relaxed);
    }

    fn status(&self, method: ModelMethod) -> ModelStatus {
        let current = self.current.read();
        let sum = self.latency_sum_us.load(Ordering::Relaxed);
        let count = self.inference_count.load(Ordering::Relaxed);
        let avg = if count > 0 { (sum as f32 / count as f32) / 1000.0 } else { 0.0 };

        ModelStatus {
            name: self.name,
            artifact_path: self.path.display().to_string(),
            method,
            load_error: current.load_error.clone(),
            loaded_at: current.loaded_at,
            inference_count: count,
            fallback_count: self.fallback_count.load(Ordering::Relaxed),
            avg_latency_ms: avg,
        }
    }
}

// ============================================================================
// LOADERS
// ============================================================================

/// Load the classifier artifact, substituting the coin flip per `policy`
pub fn load_classifier(
    path: &Path,
    policy: FallbackPolicy,
) -> Result<Loaded<dyn EmergencyClassifier>, InferenceError> {
    match OnnxClassifier::load(path) {
        Ok(model) => Ok(Loaded { model: Arc::new(model), load_error: None }),
        Err(e) => {
            let reason = policy.absorb("Emergency classifier", e)?;
            Ok(Loaded { model: Arc::new(RandomClassifier), load_error: Some(reason) })
        }
    }
}

/// Load the regressor artifact, substituting the uniform draw per `policy`
pub fn load_regressor(
    path: &Path,
    policy: FallbackPolicy,
) -> Result<Loaded<dyn DurationRegressor>, InferenceError> {
    match OnnxRegressor::load(path) {
        Ok(model) => Ok(Loaded { model: Arc::new(model), load_error: None }),
        Err(e) => {
            let reason = policy.absorb("Duration regressor", e)?;
            Ok(Loaded { model: Arc::new(RandomRegressor), load_error: Some(reason) })
        }
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

pub struct ModelRegistry {
    policy: FallbackPolicy,
    classifier: ModelSlot<dyn EmergencyClassifier>,
    regressor: ModelSlot<dyn DurationRegressor>,
}

impl ModelRegistry {
    /// Load both artifacts
    pub fn load(
        classifier_path: &Path,
        regressor_path: &Path,
        policy: FallbackPolicy,
    ) -> Result<Self, InferenceError> {
        let classifier = load_classifier(classifier_path, policy)?;
        let regressor = load_regressor(regressor_path, policy)?;

        Ok(Self {
            policy,
            classifier: ModelSlot::new(CLASSIFIER_NAME, classifier_path.to_path_buf(), classifier),
            regressor: ModelSlot::new(REGRESSOR_NAME, regressor_path.to_path_buf(), regressor),
        })
    }

    /// Registry around already-built models
    pub fn with_models(
        classifier: Arc<dyn EmergencyClassifier>,
        regressor: Arc<dyn DurationRegressor>,
        policy: FallbackPolicy,
    ) -> Self {
        Self {
            policy,
            classifier: ModelSlot::new(
                CLASSIFIER_NAME,
                PathBuf::from("<memory>"),
                Loaded { model: classifier, load_error: None },
            ),
            regressor: ModelSlot::new(
                REGRESSOR_NAME,
                PathBuf::from("<memory>"),
                Loaded { model: regressor, load_error: None },
            ),
        }
    }

    pub fn policy(&self) -> FallbackPolicy {
        self.policy
    }

    /// Re-read both artifacts. Nothing is swapped unless both loads succeed
    /// under the policy.
    pub fn reload(&self) -> Result<(), InferenceError> {
        let classifier = load_classifier(&self.classifier.path, self.policy)?;
        let regressor = load_regressor(&self.regressor.path, self.policy)?;

        self.classifier.replace(classifier);
        self.regressor.replace(regressor);

        tracing::info!("Models reloaded");
        Ok(())
    }

    /// Classify a 128×128 RGB image
    pub fn classify(&self, image: &RgbImage) -> Result<Detection, InferenceError> {
        let start = Instant::now();
        let model = self.classifier.model();

        let (class_id, method) = match model.classify(image) {
            Ok(class_id) => (class_id, model.method()),
            Err(e) => {
                self.policy.absorb("Emergency classifier", e)?;
                self.classifier.fallback_count.fetch_add(1, Ordering::Relaxed);
                (RandomClassifier.classify(image)?, ModelMethod::Fallback)
            }
        };

        self.classifier.record(start.elapsed());

        if class_id > 1 {
            return Err(InferenceError::Shape(format!("class {} is not binary", class_id)));
        }

        tracing::debug!("Classification: class={} method={:?}", class_id, method);
        Ok(Detection { class_id, method })
    }

    /// Predict the green signal duration for a record
    pub fn predict_duration(&self, record: &PredictionRecord) -> Result<DurationPrediction, InferenceError> {
        let start = Instant::now();
        let model = self.regressor.model();
        let features = record.features();

        let (raw, method) = match model.predict(&features) {
            Ok(seconds) => (seconds, model.method()),
            Err(e) => {
                self.policy.absorb("Duration regressor", e)?;
                self.regressor.fallback_count.fetch_add(1, Ordering::Relaxed);
                (RandomRegressor.predict(&features)?, ModelMethod::Fallback)
            }
        };

        self.regressor.record(start.elapsed());

        let seconds = finish_duration(raw)?;
        tracing::debug!("Duration: {}s method={:?} features={:?}", seconds, method, features);
        Ok(DurationPrediction { seconds, method })
    }

    pub fn status(&self) -> Vec<ModelStatus> {
        let classifier_method = self.classifier.model().method();
        let regressor_method = self.regressor.model().method();
        vec![
            self.classifier.status(classifier_method),
            self.regressor.status(regressor_method),
        ]
    }
}
