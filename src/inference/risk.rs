//! Health-metric features, risk factors, confidence bands and the
//! two-model ensemble rule used by disease prediction.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::InferenceError;

/// Systolic blood pressure above this counts as a risk factor.
pub const HIGH_BLOOD_PRESSURE: f64 = 140.0;
/// Heart rate (bpm) above this counts as a risk factor.
pub const HIGH_HEART_RATE: f64 = 90.0;
/// Body temperature (°F) above this counts as a risk factor.
pub const FEVER_TEMPERATURE: f64 = 100.4;
/// BMI above this counts as a risk factor.
pub const OBESE_BMI: f64 = 30.0;

/// Points added to the risk score per factor.
pub const RISK_POINTS_PER_FACTOR: u32 = 25;
pub const MAX_RISK_SCORE: u32 = 100;

/// Number of model inputs: six raw metrics plus derived BMI.
pub const FEATURE_COUNT: usize = 7;

/// Raw health metrics as submitted, with training-time defaults for
/// anything absent. Height in centimeters, weight in kilograms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthMetrics {
    pub age: f64,
    pub blood_pressure: f64,
    pub heart_rate: f64,
    pub temperature: f64,
    pub weight: f64,
    pub height: f64,
}

impl Default for HealthMetrics {
    fn default() -> Self {
        Self {
            age: 30.0,
            blood_pressure: 120.0,
            heart_rate: 70.0,
            temperature: 98.6,
            weight: 70.0,
            height: 170.0,
        }
    }
}

impl HealthMetrics {
    /// Extract metrics from a request mapping. Keys use the client's
    /// camelCase names. Present values must be numbers or numeric strings.
    pub fn from_json(data: &Value) -> Result<Self, InferenceError> {
        let map = data.as_object().ok_or_else(|| {
            InferenceError::InvalidInput("health data must be a JSON object".into())
        })?;
        let defaults = Self::default();

        let metrics = Self {
            age: field(map, "age", defaults.age)?,
            blood_pressure: field(map, "bloodPressure", defaults.blood_pressure)?,
            heart_rate: field(map, "heartRate", defaults.heart_rate)?,
            temperature: field(map, "temperature", defaults.temperature)?,
            weight: field(map, "weight", defaults.weight)?,
            height: field(map, "height", defaults.height)?,
        };

        if metrics.height <= 0.0 {
            return Err(InferenceError::InvalidInput(
                "height must be greater than zero".into(),
            ));
        }
        if !metrics.bmi().is_finite() {
            return Err(InferenceError::InvalidInput(
                "weight and height do not yield a finite BMI".into(),
            ));
        }
        Ok(metrics)
    }

    /// Body-mass index from weight (kg) and height (cm).
    pub fn bmi(&self) -> f64 {
        let height_m = self.height / 100.0;
        self.weight / (height_m * height_m)
    }

    /// Model input in training column order:
    /// age, blood pressure, heart rate, temperature, weight, height, BMI.
    pub fn feature_vector(&self) -> [f64; FEATURE_COUNT] {
        [
            self.age,
            self.blood_pressure,
            self.heart_rate,
            self.temperature,
            self.weight,
            self.height,
            self.bmi(),
        ]
    }

    /// Count of independent threshold crossings (0–4).
    pub fn risk_factors(&self) -> u32 {
        [
            self.blood_pressure > HIGH_BLOOD_PRESSURE,
            self.heart_rate > HIGH_HEART_RATE,
            self.temperature > FEVER_TEMPERATURE,
            self.bmi() > OBESE_BMI,
        ]
        .into_iter()
        .filter(|crossed| *crossed)
        .count() as u32
    }
}

fn field(map: &Map<String, Value>, key: &str, default: f64) -> Result<f64, InferenceError> {
    let Some(value) = map.get(key) else {
        return Ok(default);
    };

    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match parsed {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(InferenceError::InvalidInput(format!(
            "'{key}' must be a finite number, got {value}"
        ))),
    }
}

/// Discretized risk score: 25 points per factor, capped at 100.
pub fn risk_score(risk_factors: u32) -> u32 {
    risk_factors
        .saturating_mul(RISK_POINTS_PER_FACTOR)
        .min(MAX_RISK_SCORE)
}

/// Confidence band for a 0–1 model confidence. Upper bounds are strict,
/// so exactly 0.8 is Medium and exactly 0.6 is Low.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    pub const HIGH_ABOVE: f64 = 0.8;
    pub const MEDIUM_ABOVE: f64 = 0.6;

    pub fn from_confidence(confidence: f64) -> Self {
        if confidence > Self::HIGH_ABOVE {
            Self::High
        } else if confidence > Self::MEDIUM_ABOVE {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl std::fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One model's decoded top class and its probability (0–1).
#[derive(Debug, Clone, PartialEq)]
pub struct ModelVote {
    pub disease: String,
    pub confidence: f64,
}

/// Combine the two disease models.
///
/// Agreement averages the confidences. Disagreement takes the strictly
/// more confident model; on an exact tie model A wins.
pub fn resolve_ensemble(model_a: ModelVote, model_b: ModelVote) -> ModelVote {
    if model_a.disease == model_b.disease {
        return ModelVote {
            confidence: (model_a.confidence + model_b.confidence) / 2.0,
            disease: model_a.disease,
        };
    }
    if model_b.confidence > model_a.confidence {
        model_b
    } else {
        model_a
    }
}
