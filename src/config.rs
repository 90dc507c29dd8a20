//! Configuration module

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::inference::FallbackPolicy;

const DEFAULT_MAX_UPLOAD_MB: usize = 10;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// Emergency vehicle classifier artifact (ONNX)
    pub cnn_model_path: PathBuf,

    /// Green signal duration regressor artifact (ONNX)
    pub xgb_model_path: PathBuf,

    /// What to do when an artifact cannot be loaded or run
    pub fallback_policy: FallbackPolicy,

    /// Artificial delay before a duration answer
    pub response_delay: Duration,

    /// Request body cap in bytes (image uploads)
    pub max_upload_bytes: usize,

    /// Emit JSON log lines instead of the pretty formatter
    pub json_logs: bool,

    /// Environment (development, production)
    pub environment: String,

    /// Values that were rejected while parsing, logged once tracing is up
    pub warnings: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut warnings = Vec::new();

        let fallback_policy = match lookup("MODEL_FALLBACK") {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warnings.push(format!("Unknown MODEL_FALLBACK '{}', using 'random'", raw));
                FallbackPolicy::Random
            }),
            None => FallbackPolicy::Random,
        };

        let max_upload_bytes = match lookup("MAX_UPLOAD_MB") {
            Some(raw) => raw
                .parse::<usize>()
                .ok()
                .and_then(|mb| mb.checked_mul(1024 * 1024))
                .unwrap_or_else(|| {
                    warnings.push(format!("Invalid MAX_UPLOAD_MB '{}', using 10", raw));
                    DEFAULT_MAX_UPLOAD_MB * 1024 * 1024
                }),
            None => DEFAULT_MAX_UPLOAD_MB * 1024 * 1024,
        };

        Self {
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),

            cnn_model_path: lookup("CNN_MODEL_PATH")
                .unwrap_or_else(|| "models/emergency_cnn.onnx".to_string())
                .into(),

            xgb_model_path: lookup("XGB_MODEL_PATH")
                .unwrap_or_else(|| "models/signal_duration.onnx".to_string())
                .into(),

            fallback_policy,

            response_delay: Duration::from_millis(
                lookup("RESPONSE_DELAY_MS")
                    .and_then(|d| d.parse().ok())
                    .unwrap_or(1000),
            ),

            max_upload_bytes,

            json_logs: lookup("LOG_FORMAT")
                .map(|f| f.eq_ignore_ascii_case("json"))
                .unwrap_or(false),

            environment: lookup("ENVIRONMENT")
                .unwrap_or_else(|| "development".to_string()),

            warnings,
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
