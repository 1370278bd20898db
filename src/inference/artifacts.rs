//! On-disk artifact bundles and their load-time validation.
//!
//! Each bundle is a JSON document in the models directory:
//! - `symptom_checker.json`: `{ model, vectorizer, encoder }`
//! - `disease_prediction.json`: `{ models: { random_forest, xgboost }, scaler, encoder }`
//! - `treatment_recommendation.json`: array of treatment rows

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::classifier::Classifier;
use super::encoder::LabelEncoder;
use super::risk::FEATURE_COUNT;
use super::scaler::StandardScaler;
use super::treatment::TreatmentTable;
use super::vectorizer::TfidfVectorizer;
use super::{Bundle, LoadError};

/// Symptom text classifier with its preprocessing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymptomModel {
    pub model: Classifier,
    pub vectorizer: TfidfVectorizer,
    pub encoder: LabelEncoder,
}

impl SymptomModel {
    pub fn validate(&self) -> Result<(), String> {
        self.model.validate()?;
        self.vectorizer.validate()?;
        self.encoder.validate()?;
        if self.model.n_features() != self.vectorizer.n_features() {
            return Err(format!(
                "classifier expects {} features but vectorizer produces {}",
                self.model.n_features(),
                self.vectorizer.n_features()
            ));
        }
        check_classes(&self.model, &self.encoder)
    }
}

/// The two independently trained disease classifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseModels {
    pub random_forest: Classifier,
    pub xgboost: Classifier,
}

/// Disease risk ensemble sharing one scaler and one encoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseRiskModel {
    pub models: DiseaseModels,
    pub scaler: StandardScaler,
    pub encoder: LabelEncoder,
}

impl DiseaseRiskModel {
    pub fn validate(&self) -> Result<(), String> {
        self.scaler.validate()?;
        self.encoder.validate()?;
        if self.scaler.n_features() != FEATURE_COUNT {
            return Err(format!(
                "scaler has {} features, expected {FEATURE_COUNT}",
                self.scaler.n_features()
            ));
        }
        for (name, model) in [
            ("random_forest", &self.models.random_forest),
            ("xgboost", &self.models.xgboost),
        ] {
            model.validate().map_err(|e| format!("{name}: {e}"))?;
            if model.n_features() != FEATURE_COUNT {
                return Err(format!(
                    "{name} expects {} features, expected {FEATURE_COUNT}",
                    model.n_features()
                ));
            }
            check_classes(model, &self.encoder).map_err(|e| format!("{name}: {e}"))?;
        }
        Ok(())
    }
}

fn check_classes(model: &Classifier, encoder: &LabelEncoder) -> Result<(), String> {
    if model.n_classes() != encoder.len() {
        return Err(format!(
            "classifier has {} classes but encoder has {}",
            model.n_classes(),
            encoder.len()
        ));
    }
    Ok(())
}

/// Read and deserialize one bundle file.
fn read_bundle<T: DeserializeOwned>(dir: &Path, bundle: Bundle) -> Result<T, LoadError> {
    let path = dir.join(bundle.file_name());
    let bytes = std::fs::read(&path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            LoadError::ModelsNotFound {
                bundle,
                path: path.clone(),
            }
        } else {
            LoadError::Io { bundle, source }
        }
    })?;

    serde_json::from_slice(&bytes).map_err(|e| LoadError::Corrupt {
        bundle,
        reason: e.to_string(),
    })
}

pub fn load_symptom_model(dir: &Path) -> Result<SymptomModel, LoadError> {
    let model: SymptomModel = read_bundle(dir, Bundle::SymptomChecker)?;
    model.validate().map_err(|reason| LoadError::Invalid {
        bundle: Bundle::SymptomChecker,
        reason,
    })?;
    Ok(model)
}

pub fn load_disease_model(dir: &Path) -> Result<DiseaseRiskModel, LoadError> {
    let model: DiseaseRiskModel = read_bundle(dir, Bundle::DiseasePrediction)?;
    model.validate().map_err(|reason| LoadError::Invalid {
        bundle: Bundle::DiseasePrediction,
        reason,
    })?;
    Ok(model)
}

pub fn load_treatment_table(dir: &Path) -> Result<TreatmentTable, LoadError> {
    read_bundle(dir, Bundle::TreatmentRecommendation)
}

/// Write a bundle as pretty JSON. Used by fixtures and export tooling.
pub fn write_bundle<T: Serialize>(dir: &Path, bundle: Bundle, value: &T) -> std::io::Result<()> {
    let json = serde_json::to_vec_pretty(value).map_err(std::io::Error::other)?;
    std::fs::write(dir.join(bundle.file_name()), json)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::inference::classifier::tests::{constant_forest, stump};
    use crate::inference::classifier::{GradientBoosting, RandomForest, RegressionTree};
    use crate::inference::treatment::tests::sample_table;

    /// Symptom model over vocabulary {fever, cough, rash} with classes
    /// [Common Cold, Flu, Measles, Pneumonia]. One tree splits on "fever"
    /// (towards Flu), the other on "rash" (towards Measles).
    ///
    /// Distributions: no known term [.375, .1875, .0625, .375];
    /// "fever" [.1875, .5, 0, .3125]; "fever rash" [.0625, .4375, .4375, .0625].
    pub(crate) fn symptom_model() -> SymptomModel {
        let vocabulary = HashMap::from([
            ("fever".to_string(), 0),
            ("cough".to_string(), 1),
            ("rash".to_string(), 2),
        ]);
        let vectorizer = TfidfVectorizer::new(vocabulary, vec![1.0, 1.25, 1.5]).unwrap();
        let model = Classifier::RandomForest(RandomForest {
            n_classes: 4,
            n_features: 3,
            trees: vec![
                stump(0, 0.0, vec![4.0, 1.0, 1.0, 2.0], vec![1.0, 6.0, 0.0, 1.0]),
                stump(2, 0.0, vec![2.0, 2.0, 0.0, 4.0], vec![0.0, 1.0, 7.0, 0.0]),
            ],
        });
        let encoder = LabelEncoder::new(vec![
            "Common Cold".into(),
            "Flu".into(),
            "Measles".into(),
            "Pneumonia".into(),
        ])
        .unwrap();
        SymptomModel {
            model,
            vectorizer,
            encoder,
        }
    }

    /// Disease ensemble whose two models always vote the given weights.
    pub(crate) fn disease_model(rf: Vec<f64>, xgb_margins: Vec<f64>) -> DiseaseRiskModel {
        let classes = vec!["Fever".to_string(), "Healthy".into(), "Hypertension".into()];
        let xgboost = Classifier::GradientBoosting(GradientBoosting {
            n_classes: classes.len(),
            n_features: FEATURE_COUNT,
            base_margin: 0.0,
            trees: xgb_margins
                .into_iter()
                .map(|m| RegressionTree {
                    children_left: vec![-1],
                    children_right: vec![-1],
                    feature: vec![-2],
                    threshold: vec![0.0],
                    leaf_value: vec![m],
                })
                .collect(),
        });
        DiseaseRiskModel {
            models: DiseaseModels {
                random_forest: constant_forest(rf, FEATURE_COUNT),
                xgboost,
            },
            scaler: StandardScaler::new(vec![0.0; FEATURE_COUNT], vec![1.0; FEATURE_COUNT])
                .unwrap(),
            encoder: LabelEncoder::new(classes).unwrap(),
        }
    }

    /// Write all three bundles plus metadata into `dir`.
    pub(crate) fn write_all(dir: &Path) {
        write_bundle(dir, Bundle::SymptomChecker, &symptom_model()).unwrap();
        write_bundle(
            dir,
            Bundle::DiseasePrediction,
            &disease_model(vec![1.0, 8.0, 1.0], vec![0.0, 2.0, 0.0]),
        )
        .unwrap();
        write_bundle(dir, Bundle::TreatmentRecommendation, &sample_table()).unwrap();
        std::fs::write(
            dir.join(crate::inference::MODEL_INFO_FILE),
            r#"{"symptom_checker": {"type": "RandomForest"}}"#,
        )
        .unwrap();
    }

    #[test]
    fn fixtures_validate() {
        symptom_model().validate().unwrap();
        disease_model(vec![1.0, 1.0, 1.0], vec![0.0, 0.0, 0.0])
            .validate()
            .unwrap();
    }

    #[test]
    fn bundles_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        write_all(dir.path());
        assert_eq!(load_symptom_model(dir.path()).unwrap(), symptom_model());
        assert_eq!(load_treatment_table(dir.path()).unwrap(), sample_table());
        load_disease_model(dir.path()).unwrap();
    }

    #[test]
    fn missing_file_is_models_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_symptom_model(dir.path()).unwrap_err();
        assert!(matches!(
            err,
            LoadError::ModelsNotFound {
                bundle: Bundle::SymptomChecker,
                ..
            }
        ));
    }

    #[test]
    fn malformed_json_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(Bundle::TreatmentRecommendation.file_name()), "{oops").unwrap();
        let err = load_treatment_table(dir.path()).unwrap_err();
        assert!(matches!(err, LoadError::Corrupt { .. }));
    }

    #[test]
    fn class_count_mismatch_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = symptom_model();
        model.encoder = LabelEncoder::new(vec!["Flu".into(), "Measles".into()]).unwrap();
        write_bundle(dir.path(), Bundle::SymptomChecker, &model).unwrap();
        let err = load_symptom_model(dir.path()).unwrap_err();
        assert!(matches!(err, LoadError::Invalid { ref reason, .. } if reason.contains("classes")));
    }

    #[test]
    fn scaler_width_mismatch_is_invalid() {
        let mut model = disease_model(vec![1.0, 1.0, 1.0], vec![0.0, 0.0, 0.0]);
        model.scaler = StandardScaler::new(vec![0.0; 6], vec![1.0; 6]).unwrap();
        assert!(model.validate().unwrap_err().contains("scaler"));
    }
}
