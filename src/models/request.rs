//! Traffic statistics input and the prediction request record

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{AppError, AppResult};

/// Number of features fed to the duration regressor
pub const FEATURE_COUNT: usize = 5;

pub const DEFAULT_VEHICLE_COUNT: u32 = 30;
pub const DEFAULT_AVG_SPEED: u32 = 35;

/// Weather condition selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Weather {
    #[default]
    Clear = 0,
    Rainy = 1,
    Foggy = 2,
}

impl Weather {
    pub const ALL: [Weather; 3] = [Weather::Clear, Weather::Rainy, Weather::Foggy];

    /// Encoded value used in the feature row
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Weather::Clear => "Clear",
            Weather::Rainy => "Rainy",
            Weather::Foggy => "Foggy",
        }
    }
}

impl fmt::Display for Weather {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Weather {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Weather::ALL
            .into_iter()
            .find(|w| w.as_str() == s)
            .ok_or_else(|| AppError::ValidationError(format!(
                "Unknown weather '{}', expected one of Clear, Rainy, Foggy", s
            )))
    }
}

/// Where the emergency flag of a record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EmergencySource {
    Detection,
    Manual,
}

/// Dashboard form values, as submitted
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TrafficStatsInput {
    #[serde(default = "default_vehicle_count")]
    #[validate(range(max = 100))]
    pub vehicle_count: u32,

    /// km/h
    #[serde(default = "default_avg_speed")]
    #[validate(range(max = 100))]
    pub avg_speed: u32,

    #[serde(default)]
    pub weather: Weather,

    #[serde(default)]
    pub accident_reported: bool,

    /// Manual selector; only read when no image was classified
    #[serde(default)]
    #[validate(range(max = 1))]
    pub emergency_flag: Option<u8>,
}

fn default_vehicle_count() -> u32 {
    DEFAULT_VEHICLE_COUNT
}

fn default_avg_speed() -> u32 {
    DEFAULT_AVG_SPEED
}

impl Default for TrafficStatsInput {
    fn default() -> Self {
        Self {
            vehicle_count: DEFAULT_VEHICLE_COUNT,
            avg_speed: DEFAULT_AVG_SPEED,
            weather: Weather::default(),
            accident_reported: false,
            emergency_flag: None,
        }
    }
}

impl TrafficStatsInput {
    /// Parse the text fields of a multipart dashboard submission.
    /// Missing fields keep the form defaults.
    pub fn from_form_fields(fields: &HashMap<String, String>) -> AppResult<Self> {
        let mut input = Self::default();

        if let Some(raw) = fields.get("vehicle_count") {
            input.vehicle_count = parse_integer("vehicle_count", raw)?;
        }
        if let Some(raw) = fields.get("avg_speed") {
            input.avg_speed = parse_integer("avg_speed", raw)?;
        }
        if let Some(raw) = fields.get("weather") {
            input.weather = raw.trim().parse()?;
        }
        if let Some(raw) = fields.get("accident_reported") {
            input.accident_reported = parse_checkbox("accident_reported", raw)?;
        }
        if let Some(raw) = fields.get("emergency_flag") {
            if !raw.trim().is_empty() {
                input.emergency_flag = Some(parse_integer("emergency_flag", raw)?);
            }
        }

        Ok(input)
    }

    /// Validate and assemble the record.
    ///
    /// When `detected` carries a classification result it becomes the
    /// emergency flag and the manual selector is ignored entirely.
    pub fn into_record(mut self, detected: Option<bool>) -> AppResult<PredictionRecord> {
        if detected.is_some() {
            self.emergency_flag = None;
        }
        self.validate()?;

        let (emergency_flag, emergency_source) = resolve_emergency_flag(detected, self.emergency_flag);

        Ok(PredictionRecord {
            vehicle_count: self.vehicle_count,
            avg_speed: self.avg_speed,
            weather: self.weather,
            accident_reported: self.accident_reported,
            emergency_flag,
            emergency_source,
        })
    }
}

/// Classification result wins; otherwise the manual selector (default 0)
pub fn resolve_emergency_flag(detected: Option<bool>, manual: Option<u8>) -> (bool, EmergencySource) {
    match detected {
        Some(is_emergency) => (is_emergency, EmergencySource::Detection),
        None => (manual == Some(1), EmergencySource::Manual),
    }
}

fn parse_integer<T: FromStr>(field: &str, raw: &str) -> AppResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::ValidationError(format!("{} must be a non-negative integer, got '{}'", field, raw)))
}

fn parse_checkbox(field: &str, raw: &str) -> AppResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" | "" => Ok(false),
        _ => Err(AppError::ValidationError(format!("{} must be a boolean, got '{}'", field, raw))),
    }
}

/// One-row record handed to the duration regressor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictionRecord {
    pub vehicle_count: u32,
    pub avg_speed: u32,
    pub weather: Weather,
    pub accident_reported: bool,
    pub emergency_flag: bool,
    pub emergency_source: EmergencySource,
}

/// Tabular encoding of a record, as the regressor sees it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeatureRow {
    pub vehicle_count: u32,
    pub avg_speed: u32,
    pub weather: u8,
    pub accident_reported: u8,
    pub emergency_flag: u8,
}

impl PredictionRecord {
    pub fn row(&self) -> FeatureRow {
        FeatureRow {
            vehicle_count: self.vehicle_count,
            avg_speed: self.avg_speed,
            weather: self.weather.code(),
            accident_reported: u8::from(self.accident_reported),
            emergency_flag: u8::from(self.emergency_flag),
        }
    }

    /// Feature vector in column order
    pub fn features(&self) -> [f32; FEATURE_COUNT] {
        let row = self.row();
        [
            row.vehicle_count as f32,
            row.avg_speed as f32,
            row.weather as f32,
            row.accident_reported as f32,
            row.emergency_flag as f32,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_weather_mapping_is_exact() {
        assert_eq!("Clear".parse::<Weather>().unwrap().code(), 0);
        assert_eq!("Rainy".parse::<Weather>().unwrap().code(), 1);
        assert_eq!("Foggy".parse::<Weather>().unwrap().code(), 2);

        for bad in ["clear", "RAINY", "Snowy", "", "0", " Foggy"] {
            assert!(bad.parse::<Weather>().is_err(), "'{}' should be rejected", bad);
        }
    }

    #[test]
    fn test_weather_json_rejects_unknown() {
        let ok: Weather = serde_json::from_str("\"Rainy\"").unwrap();
        assert_eq!(ok, Weather::Rainy);
        assert!(serde_json::from_str::<Weather>("\"Sunny\"").is_err());
        assert!(serde_json::from_str::<Weather>("1").is_err());
    }

    #[test]
    fn test_json_defaults_match_form() {
        let input: TrafficStatsInput = serde_json::from_str("{}").unwrap();
        assert_eq!(input.vehicle_count, 30);
        assert_eq!(input.avg_speed, 35);
        assert_eq!(input.weather, Weather::Clear);
        assert!(!input.accident_reported);
        assert_eq!(input.emergency_flag, None);
    }

    #[test]
    fn test_range_validation() {
        let input = TrafficStatsInput { vehicle_count: 101, ..Default::default() };
        assert!(input.into_record(None).is_err());

        let input = TrafficStatsInput { avg_speed: 250, ..Default::default() };
        assert!(input.into_record(None).is_err());

        let input = TrafficStatsInput { vehicle_count: 100, avg_speed: 0, ..Default::default() };
        assert!(input.into_record(None).is_ok());
    }

    #[test]
    fn test_manual_flag_used_without_detection() {
        let input = TrafficStatsInput { emergency_flag: Some(1), ..Default::default() };
        let record = input.into_record(None).unwrap();
        assert!(record.emergency_flag);
        assert_eq!(record.emergency_source, EmergencySource::Manual);

        let record = TrafficStatsInput::default().into_record(None).unwrap();
        assert!(!record.emergency_flag);
    }

    #[test]
    fn test_detection_overrides_manual_flag() {
        let input = TrafficStatsInput { emergency_flag: Some(1), ..Default::default() };
        let record = input.into_record(Some(false)).unwrap();
        assert!(!record.emergency_flag);
        assert_eq!(record.emergency_source, EmergencySource::Detection);

        // An out-of-range selector is not even looked at
        let input = TrafficStatsInput { emergency_flag: Some(7), ..Default::default() };
        let record = input.into_record(Some(true)).unwrap();
        assert!(record.emergency_flag);

        let input = TrafficStatsInput { emergency_flag: Some(7), ..Default::default() };
        assert!(input.into_record(None).is_err());
    }

    #[test]
    fn test_feature_row_encoding() {
        let input = TrafficStatsInput {
            vehicle_count: 42,
            avg_speed: 18,
            weather: Weather::Foggy,
            accident_reported: true,
            emergency_flag: Some(0),
        };
        let record = input.into_record(None).unwrap();
        assert_eq!(record.row(), FeatureRow {
            vehicle_count: 42,
            avg_speed: 18,
            weather: 2,
            accident_reported: 1,
            emergency_flag: 0,
        });
        assert_eq!(record.features(), [42.0, 18.0, 2.0, 1.0, 0.0]);
    }

    #[test]
    fn test_form_fields() {
        let input = TrafficStatsInput::from_form_fields(&fields(&[
            ("vehicle_count", "55"),
            ("avg_speed", " 60 "),
            ("weather", "Rainy"),
            ("accident_reported", "on"),
            ("emergency_flag", "1"),
        ])).unwrap();
        assert_eq!(input.vehicle_count, 55);
        assert_eq!(input.avg_speed, 60);
        assert_eq!(input.weather, Weather::Rainy);
        assert!(input.accident_reported);
        assert_eq!(input.emergency_flag, Some(1));

        let input = TrafficStatsInput::from_form_fields(&fields(&[("emergency_flag", "")])).unwrap();
        assert_eq!(input.emergency_flag, None);

        assert!(TrafficStatsInput::from_form_fields(&fields(&[("vehicle_count", "-3")])).is_err());
        assert!(TrafficStatsInput::from_form_fields(&fields(&[("weather", "Hail")])).is_err());
        assert!(TrafficStatsInput::from_form_fields(&fields(&[("accident_reported", "maybe")])).is_err());
    }
}
