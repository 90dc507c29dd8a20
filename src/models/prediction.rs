//! Prediction outputs and their rendered labels

use serde::Serialize;

use crate::inference::{ModelMethod, CLASSIFIER_INPUT_SIZE};
use super::request::{EmergencySource, FeatureRow, PredictionRecord};

pub const EMERGENCY_LABEL: &str = "🚨 Emergency Vehicle Detected";
pub const NO_EMERGENCY_LABEL: &str = "🟢 No Emergency Vehicle";

/// Classifier output: class 1 is an emergency vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detection {
    pub class_id: u8,
    pub method: ModelMethod,
}

impl Detection {
    pub fn is_emergency(&self) -> bool {
        self.class_id == 1
    }

    pub fn label(&self) -> &'static str {
        if self.is_emergency() {
            EMERGENCY_LABEL
        } else {
            NO_EMERGENCY_LABEL
        }
    }
}

/// Regressor output in seconds, within the green signal bounds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurationPrediction {
    pub seconds: f64,
    pub method: ModelMethod,
}

impl DurationPrediction {
    pub fn display(&self) -> String {
        format!("⏱️ Recommended Green Signal Duration: {} seconds", self.seconds)
    }
}

#[derive(Debug, Serialize)]
pub struct DetectionResponse {
    pub class_id: u8,
    pub is_emergency: bool,
    pub label: &'static str,
    pub method: ModelMethod,
    pub input_size: [u32; 2],
    pub file_name: Option<String>,
}

impl DetectionResponse {
    pub fn new(detection: Detection, file_name: Option<String>) -> Self {
        Self {
            class_id: detection.class_id,
            is_emergency: detection.is_emergency(),
            label: detection.label(),
            method: detection.method,
            input_size: [CLASSIFIER_INPUT_SIZE; 2],
            file_name,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DurationResponse {
    pub duration_seconds: f64,
    pub display: String,
    pub record: FeatureRow,
    pub emergency_source: EmergencySource,
    pub method: ModelMethod,
}

impl DurationResponse {
    pub fn new(record: &PredictionRecord, prediction: DurationPrediction) -> Self {
        Self {
            duration_seconds: prediction.seconds,
            display: prediction.display(),
            record: record.row(),
            emergency_source: record.emergency_source,
            method: prediction.method,
        }
    }
}

/// Combined dashboard answer
#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub detection: Option<DetectionResponse>,
    pub duration: DurationResponse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        let hit = Detection { class_id: 1, method: ModelMethod::Fallback };
        let miss = Detection { class_id: 0, method: ModelMethod::Fallback };
        assert_eq!(hit.label(), EMERGENCY_LABEL);
        assert_eq!(miss.label(), NO_EMERGENCY_LABEL);
    }

    #[test]
    fn test_duration_display() {
        let prediction = DurationPrediction { seconds: 42.17, method: ModelMethod::Onnx };
        assert_eq!(prediction.display(), "⏱️ Recommended Green Signal Duration: 42.17 seconds");
    }
}
