use serde::Serialize;
use serde_json::Value;

use super::risk::ConfidenceLevel;
use super::treatment::TreatmentRecord;

pub const SYMPTOM_MODEL_TYPE: &str = "RandomForest Classifier";
pub const SYMPTOM_FEATURES: &str = "TF-IDF vectorized symptoms";
pub const DISEASE_MODEL_TYPE: &str = "Ensemble (RandomForest + XGBoost)";
pub const DISEASE_FEATURES: &str = "Age, BP, HR, Temp, Weight, Height, BMI";
pub const TREATMENT_MODEL_TYPE: &str = "Rule-based Medical Knowledge Base";
pub const TREATMENT_SOURCE: &str = "Trained Medical ML Model";
pub const PARTIAL_MATCH_NOTE: &str = "Partial match found";
pub const NOT_FOUND_SUGGESTION: &str =
    "Please check spelling or consult a healthcare professional";

/// Result of the symptom checker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymptomPrediction {
    pub symptoms: String,
    pub predicted_disease: String,
    /// Up to three `"<name> (<pct>%)"` entries, most likely first.
    pub possible_conditions: Vec<String>,
    /// Top class probability as a percentage.
    pub confidence_score: f64,
    pub model_type: &'static str,
    pub features_used: &'static str,
}

/// Result of the disease risk ensemble.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiseasePrediction {
    pub health_data: Value,
    pub predicted_disease: String,
    pub risk_score: u32,
    pub confidence_level: ConfidenceLevel,
    /// Ensemble confidence as a percentage.
    pub model_confidence: f64,
    pub risk_factors_identified: u32,
    pub model_type: &'static str,
    pub features_used: &'static str,
}

/// Treatment details returned for a matched disease.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreatmentInfo {
    pub disease_name: String,
    pub treatment_options: Vec<String>,
    pub medications: Vec<String>,
    pub lifestyle_changes: String,
    pub precautions: String,
    pub model_type: &'static str,
    pub source: &'static str,
    /// Set only for substring matches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<&'static str>,
}

impl TreatmentInfo {
    pub(crate) fn from_record(record: &TreatmentRecord, note: Option<&'static str>) -> Self {
        Self {
            disease_name: record.disease.clone(),
            treatment_options: record.treatments.clone(),
            medications: record.medications.clone(),
            lifestyle_changes: record.lifestyle_changes.clone(),
            precautions: record.precautions.clone(),
            model_type: TREATMENT_MODEL_TYPE,
            source: TREATMENT_SOURCE,
            note,
        }
    }

    pub fn is_partial(&self) -> bool {
        self.note.is_some()
    }
}

/// Outcome of a treatment lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "match", rename_all = "snake_case")]
pub enum TreatmentLookup {
    Exact(TreatmentInfo),
    Partial(TreatmentInfo),
    NotFound {
        disease_name: String,
        suggestion: &'static str,
        /// Every known disease, in table order, for did-you-mean hints.
        available_diseases: Vec<String>,
    },
}

/// Metadata describing the trained models.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInfo {
    pub models_loaded: usize,
    pub model_details: Value,
    pub models_directory: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelStatus {
    Loaded,
    NotLoaded,
}

impl ModelStatus {
    pub fn from_loaded(loaded: bool) -> Self {
        if loaded {
            Self::Loaded
        } else {
            Self::NotLoaded
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BundleStatus {
    pub symptom_checker: ModelStatus,
    pub disease_prediction: ModelStatus,
    pub treatment_recommendation: ModelStatus,
}

/// Engine load state. Healthy iff every bundle loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub models: BundleStatus,
    pub total_models: usize,
}
