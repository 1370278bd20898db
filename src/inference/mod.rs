//! Inference engine for symptom checking, disease risk prediction and
//! treatment lookup.
//!
//! Artifacts are produced offline and loaded once into strongly typed
//! structures (`artifacts`). After construction the engine is immutable and
//! can be shared across request handlers without locking.

pub mod artifacts;
pub mod classifier;
pub mod encoder;
pub mod engine;
pub mod risk;
pub mod scaler;
pub mod treatment;
pub mod types;
pub mod vectorizer;

pub use engine::InferenceEngine;
pub use types::*;

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// A named group of artifacts required for one inference capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Bundle {
    SymptomChecker,
    DiseasePrediction,
    TreatmentRecommendation,
}

impl Bundle {
    pub const ALL: [Bundle; 3] = [
        Bundle::SymptomChecker,
        Bundle::DiseasePrediction,
        Bundle::TreatmentRecommendation,
    ];

    /// Artifact file name inside the models directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::SymptomChecker => "symptom_checker.json",
            Self::DiseasePrediction => "disease_prediction.json",
            Self::TreatmentRecommendation => "treatment_recommendation.json",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SymptomChecker => "symptom_checker",
            Self::DiseasePrediction => "disease_prediction",
            Self::TreatmentRecommendation => "treatment_recommendation",
        }
    }
}

impl std::fmt::Display for Bundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SymptomChecker => write!(f, "Symptom checker"),
            Self::DiseasePrediction => write!(f, "Disease prediction"),
            Self::TreatmentRecommendation => write!(f, "Treatment recommendation"),
        }
    }
}

/// Companion metadata file describing the trained models.
pub const MODEL_INFO_FILE: &str = "model_info.json";

/// Failure to construct a bundle from disk.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Trained models not found: {bundle} artifact missing at {}", path.display())]
    ModelsNotFound { bundle: Bundle, path: PathBuf },

    #[error("Cannot read {bundle} artifact: {source}")]
    Io {
        bundle: Bundle,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt {bundle} artifact: {reason}")]
    Corrupt { bundle: Bundle, reason: String },

    #[error("Invalid {bundle} artifact: {reason}")]
    Invalid { bundle: Bundle, reason: String },
}

impl LoadError {
    pub fn bundle(&self) -> Bundle {
        match self {
            Self::ModelsNotFound { bundle, .. }
            | Self::Io { bundle, .. }
            | Self::Corrupt { bundle, .. }
            | Self::Invalid { bundle, .. } => *bundle,
        }
    }
}

/// Structured failure of an inference call. Never a panic.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InferenceError {
    #[error("{0} model not loaded")]
    ModelNotLoaded(Bundle),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Prediction failed: {0}")]
    Prediction(String),

    #[error("Model info unavailable: {0}")]
    MetadataUnavailable(String),
}
