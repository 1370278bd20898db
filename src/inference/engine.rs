use std::path::{Path, PathBuf};

use serde_json::Value;

use super::artifacts::{
    load_disease_model, load_symptom_model, load_treatment_table, DiseaseRiskModel, SymptomModel,
};
use super::classifier::{argmax, rank_classes, Classifier};
use super::encoder::LabelEncoder;
use super::risk::{resolve_ensemble, risk_score, ConfidenceLevel, HealthMetrics, ModelVote};
use super::treatment::{MatchKind, TreatmentTable};
use super::types::*;
use super::{Bundle, InferenceError, LoadError, MODEL_INFO_FILE};

/// Number of ranked candidates returned by the symptom checker.
const TOP_CONDITIONS: usize = 3;

/// Read-only inference engine over the three model bundles.
///
/// Built once at startup and shared behind an `Arc`. Nothing is mutated
/// after construction, so every operation may run concurrently.
#[derive(Debug)]
pub struct InferenceEngine {
    models_dir: PathBuf,
    symptom: Option<SymptomModel>,
    disease: Option<DiseaseRiskModel>,
    treatments: Option<TreatmentTable>,
}

impl InferenceEngine {
    /// Load every bundle from `models_dir`. Fails on the first bundle that
    /// is missing or unreadable.
    pub fn load(models_dir: impl AsRef<Path>) -> Result<Self, LoadError> {
        let models_dir = models_dir.as_ref().to_path_buf();
        tracing::info!(dir = %models_dir.display(), "Loading trained ML models");

        let symptom = load_symptom_model(&models_dir)?;
        let disease = load_disease_model(&models_dir)?;
        let treatments = load_treatment_table(&models_dir)?;

        tracing::info!(
            symptom_classes = symptom.encoder.len(),
            disease_classes = disease.encoder.len(),
            treatments = treatments.len(),
            "All ML models loaded"
        );

        Ok(Self {
            models_dir,
            symptom: Some(symptom),
            disease: Some(disease),
            treatments: Some(treatments),
        })
    }

    /// Load from the default models directory.
    pub fn load_default() -> Result<Self, LoadError> {
        Self::load(crate::config::default_models_dir())
    }

    /// Load whatever bundles are available. Failed bundles are logged and
    /// stay "not loaded"; they are never replaced with defaults or retried.
    pub fn load_lenient(models_dir: impl AsRef<Path>) -> Self {
        let models_dir = models_dir.as_ref().to_path_buf();
        tracing::info!(dir = %models_dir.display(), "Loading trained ML models");

        let symptom = keep_loaded(load_symptom_model(&models_dir));
        let disease = keep_loaded(load_disease_model(&models_dir));
        let treatments = keep_loaded(load_treatment_table(&models_dir));

        let engine = Self {
            models_dir,
            symptom,
            disease,
            treatments,
        };
        if engine.is_fully_loaded() {
            tracing::info!("All ML models loaded");
        } else {
            tracing::warn!(
                "Some ML models are unavailable; train and export them, then restart"
            );
        }
        engine
    }

    /// An engine with no bundles loaded.
    pub fn unavailable(models_dir: impl AsRef<Path>) -> Self {
        Self {
            models_dir: models_dir.as_ref().to_path_buf(),
            symptom: None,
            disease: None,
            treatments: None,
        }
    }

    /// Assemble an engine from already-constructed bundles.
    pub fn from_parts(
        models_dir: impl AsRef<Path>,
        symptom: Option<SymptomModel>,
        disease: Option<DiseaseRiskModel>,
        treatments: Option<TreatmentTable>,
    ) -> Self {
        Self {
            models_dir: models_dir.as_ref().to_path_buf(),
            symptom,
            disease,
            treatments,
        }
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    pub fn is_loaded(&self, bundle: Bundle) -> bool {
        match bundle {
            Bundle::SymptomChecker => self.symptom.is_some(),
            Bundle::DiseasePrediction => self.disease.is_some(),
            Bundle::TreatmentRecommendation => self.treatments.is_some(),
        }
    }

    pub fn is_fully_loaded(&self) -> bool {
        Bundle::ALL.iter().all(|b| self.is_loaded(*b))
    }

    /// Rank likely diseases for a free-text symptom description.
    pub fn predict_symptoms(&self, symptoms: &str) -> Result<SymptomPrediction, InferenceError> {
        let model = self
            .symptom
            .as_ref()
            .ok_or(InferenceError::ModelNotLoaded(Bundle::SymptomChecker))?;

        let features = model.vectorizer.transform(symptoms);
        let proba = model.model.predict_proba(&features)?;
        let ranking = rank_classes(&proba);

        let &top = ranking
            .first()
            .ok_or_else(|| InferenceError::Prediction("classifier returned no classes".into()))?;
        let predicted_disease = decode(&model.encoder, top)?.to_string();

        let possible_conditions = ranking
            .iter()
            .take(TOP_CONDITIONS)
            .map(|&i| {
                let name = decode(&model.encoder, i)?;
                Ok(format!("{name} ({:.1}%)", proba[i] * 100.0))
            })
            .collect::<Result<Vec<_>, InferenceError>>()?;

        Ok(SymptomPrediction {
            symptoms: symptoms.to_string(),
            predicted_disease,
            possible_conditions,
            confidence_score: proba[top] * 100.0,
            model_type: SYMPTOM_MODEL_TYPE,
            features_used: SYMPTOM_FEATURES,
        })
    }

    /// Predict a disease and risk score from health metrics.
    pub fn predict_disease(&self, health_data: &Value) -> Result<DiseasePrediction, InferenceError> {
        let model = self
            .disease
            .as_ref()
            .ok_or(InferenceError::ModelNotLoaded(Bundle::DiseasePrediction))?;

        let metrics = HealthMetrics::from_json(health_data)?;
        let scaled = model.scaler.transform(&metrics.feature_vector())?;

        let vote_a = vote(&model.models.random_forest, &model.encoder, &scaled)?;
        let vote_b = vote(&model.models.xgboost, &model.encoder, &scaled)?;
        tracing::debug!(
            model_a = %vote_a.disease,
            model_a_confidence = vote_a.confidence,
            model_b = %vote_b.disease,
            model_b_confidence = vote_b.confidence,
            "Disease ensemble votes"
        );
        let decision = resolve_ensemble(vote_a, vote_b);

        let risk_factors = metrics.risk_factors();

        Ok(DiseasePrediction {
            health_data: health_data.clone(),
            predicted_disease: decision.disease,
            risk_score: risk_score(risk_factors),
            confidence_level: ConfidenceLevel::from_confidence(decision.confidence),
            model_confidence: decision.confidence * 100.0,
            risk_factors_identified: risk_factors,
            model_type: DISEASE_MODEL_TYPE,
            features_used: DISEASE_FEATURES,
        })
    }

    /// Look up treatment details: exact name, then first substring match,
    /// otherwise a not-found result listing every known disease.
    pub fn get_treatment_info(&self, disease_name: &str) -> Result<TreatmentLookup, InferenceError> {
        let table = self
            .treatments
            .as_ref()
            .ok_or(InferenceError::ModelNotLoaded(Bundle::TreatmentRecommendation))?;

        Ok(match table.find(disease_name) {
            Some((row, MatchKind::Exact)) => TreatmentLookup::Exact(TreatmentInfo::from_record(row, None)),
            Some((row, MatchKind::Partial)) => {
                TreatmentLookup::Partial(TreatmentInfo::from_record(row, Some(PARTIAL_MATCH_NOTE)))
            }
            None => TreatmentLookup::NotFound {
                disease_name: disease_name.to_string(),
                suggestion: NOT_FOUND_SUGGESTION,
                available_diseases: table.disease_names(),
            },
        })
    }

    /// Read the companion metadata file. Its absence does not affect
    /// inference.
    pub fn get_model_info(&self) -> Result<ModelInfo, InferenceError> {
        let path = self.models_dir.join(MODEL_INFO_FILE);
        let raw = std::fs::read_to_string(&path).map_err(|e| {
            InferenceError::MetadataUnavailable(format!("{}: {e}", path.display()))
        })?;
        let model_details: Value = serde_json::from_str(&raw).map_err(|e| {
            InferenceError::MetadataUnavailable(format!("{}: {e}", path.display()))
        })?;

        Ok(ModelInfo {
            models_loaded: [Bundle::SymptomChecker, Bundle::DiseasePrediction]
                .into_iter()
                .filter(|b| self.is_loaded(*b))
                .count(),
            model_details,
            models_directory: self.models_dir.display().to_string(),
        })
    }

    /// Per-bundle load state. Never fails.
    pub fn health_check(&self) -> HealthReport {
        let models = BundleStatus {
            symptom_checker: ModelStatus::from_loaded(self.symptom.is_some()),
            disease_prediction: ModelStatus::from_loaded(self.disease.is_some()),
            treatment_recommendation: ModelStatus::from_loaded(self.treatments.is_some()),
        };
        HealthReport {
            status: if self.is_fully_loaded() {
                HealthStatus::Healthy
            } else {
                HealthStatus::Unhealthy
            },
            models,
            total_models: Bundle::ALL.len(),
        }
    }
}

fn keep_loaded<T>(result: Result<T, LoadError>) -> Option<T> {
    match result {
        Ok(bundle) => Some(bundle),
        Err(e) => {
            tracing::warn!(bundle = e.bundle().as_str(), error = %e, "Model bundle not loaded");
            None
        }
    }
}

fn decode(encoder: &LabelEncoder, index: usize) -> Result<&str, InferenceError> {
    encoder
        .decode(index)
        .ok_or_else(|| InferenceError::Prediction(format!("class index {index} has no label")))
}

fn vote(model: &Classifier, encoder: &LabelEncoder, features: &[f64]) -> Result<ModelVote, InferenceError> {
    let proba = model.predict_proba(features)?;
    let (index, confidence) = argmax(&proba)
        .ok_or_else(|| InferenceError::Prediction("classifier returned no classes".into()))?;
    Ok(ModelVote {
        disease: decode(encoder, index)?.to_string(),
        confidence,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::inference::artifacts::tests::{disease_model, symptom_model, write_all};
    use crate::inference::artifacts::{write_bundle, DiseaseModels};
    use crate::inference::classifier::tests::constant_forest;
    use crate::inference::risk::FEATURE_COUNT;
    use crate::inference::treatment::tests::sample_table;

    fn engine_with(disease: DiseaseRiskModel) -> InferenceEngine {
        InferenceEngine::from_parts(
            "/models",
            Some(symptom_model()),
            Some(disease),
            Some(sample_table()),
        )
    }

    fn engine() -> InferenceEngine {
        engine_with(disease_model(vec![1.0, 8.0, 1.0], vec![0.0, 2.0, 0.0]))
    }

    // ── Load contract ──────────────────────────────────────

    #[test]
    fn load_reads_all_bundles() {
        let dir = tempfile::tempdir().unwrap();
        write_all(dir.path());
        let engine = InferenceEngine::load(dir.path()).unwrap();
        assert!(engine.is_fully_loaded());
        assert_eq!(engine.health_check().status, HealthStatus::Healthy);
    }

    #[test]
    fn nonexistent_directory_fails_and_reports_unhealthy() {
        let dir = PathBuf::from("/definitely/not/a/models/dir");
        let err = InferenceEngine::load(&dir).unwrap_err();
        assert!(matches!(err, LoadError::ModelsNotFound { .. }));

        let report = InferenceEngine::load_lenient(&dir).health_check();
        assert_eq!(report.status, HealthStatus::Unhealthy);
        assert_eq!(report.models.symptom_checker, ModelStatus::NotLoaded);
        assert_eq!(report.models.disease_prediction, ModelStatus::NotLoaded);
        assert_eq!(report.models.treatment_recommendation, ModelStatus::NotLoaded);
        assert_eq!(report.total_models, 3);
    }

    #[test]
    fn lenient_load_keeps_available_bundles() {
        let dir = tempfile::tempdir().unwrap();
        write_bundle(dir.path(), Bundle::TreatmentRecommendation, &sample_table()).unwrap();

        let engine = InferenceEngine::load_lenient(dir.path());
        let report = engine.health_check();
        assert_eq!(report.status, HealthStatus::Unhealthy);
        assert_eq!(report.models.treatment_recommendation, ModelStatus::Loaded);
        assert_eq!(report.models.symptom_checker, ModelStatus::NotLoaded);

        assert!(engine.get_treatment_info("Diabetes").is_ok());
        assert_eq!(
            engine.predict_symptoms("fever").unwrap_err(),
            InferenceError::ModelNotLoaded(Bundle::SymptomChecker)
        );
    }

    #[test]
    fn unavailable_engine_returns_structured_errors() {
        let engine = InferenceEngine::unavailable("/models");
        assert_eq!(
            engine.predict_disease(&json!({})).unwrap_err(),
            InferenceError::ModelNotLoaded(Bundle::DiseasePrediction)
        );
        assert_eq!(
            engine.get_treatment_info("Flu").unwrap_err(),
            InferenceError::ModelNotLoaded(Bundle::TreatmentRecommendation)
        );
    }

    // ── Symptom checker ────────────────────────────────────

    #[test]
    fn symptom_prediction_ranks_top_three() {
        let result = engine().predict_symptoms("High fever since Monday").unwrap();
        assert_eq!(result.predicted_disease, "Flu");
        assert_eq!(result.confidence_score, 50.0);
        assert_eq!(result.possible_conditions.len(), 3);
        assert_eq!(result.possible_conditions[0], "Flu (50.0%)");
        assert!(result.possible_conditions[1].starts_with("Pneumonia ("));
        assert!(result.possible_conditions[2].starts_with("Common Cold ("));
    }

    #[test]
    fn symptom_ties_resolve_by_class_index() {
        // No known terms: Common Cold and Pneumonia tie at 37.5%.
        let result = engine().predict_symptoms("feeling odd").unwrap();
        assert_eq!(result.predicted_disease, "Common Cold");
        assert_eq!(result.possible_conditions[0], "Common Cold (37.5%)");
        assert_eq!(result.possible_conditions[1], "Pneumonia (37.5%)");
        assert!(result.possible_conditions[2].starts_with("Flu ("));

        // "fever rash": Flu and Measles tie at 43.75%.
        let result = engine().predict_symptoms("fever, rash").unwrap();
        assert_eq!(result.predicted_disease, "Flu");
        assert!(result.possible_conditions[1].starts_with("Measles ("));
    }

    #[test]
    fn symptom_confidence_in_range_and_sorted() {
        let engine = engine();
        for text in ["", "cough", "rash rash rash", "fever cough rash", "ünïcode text"] {
            let result = engine.predict_symptoms(text).unwrap();
            assert!((0.0..=100.0).contains(&result.confidence_score));
            assert!(result.possible_conditions.len() <= 3);
            let pcts: Vec<f64> = result
                .possible_conditions
                .iter()
                .map(|c| {
                    let start = c.rfind('(').unwrap() + 1;
                    c[start..c.len() - 2].parse().unwrap()
                })
                .collect();
            assert!(pcts.windows(2).all(|w| w[0] >= w[1]), "{text}: {pcts:?}");
        }
    }

    #[test]
    fn fewer_than_three_classes_does_not_fail() {
        let mut model = symptom_model();
        model.model = constant_forest(vec![3.0, 1.0], 3);
        model.encoder = LabelEncoder::new(vec!["Flu".into(), "Migraine".into()]).unwrap();
        let engine = InferenceEngine::from_parts("/models", Some(model), None, None);

        let result = engine.predict_symptoms("fever").unwrap();
        assert_eq!(
            result.possible_conditions,
            vec!["Flu (75.0%)".to_string(), "Migraine (25.0%)".to_string()]
        );
    }

    // ── Disease prediction ─────────────────────────────────

    #[test]
    fn default_health_data_has_no_risk() {
        let result = engine().predict_disease(&json!({})).unwrap();
        assert_eq!(result.predicted_disease, "Healthy");
        assert_eq!(result.risk_factors_identified, 0);
        assert_eq!(result.risk_score, 0);
        assert_eq!(result.health_data, json!({}));
    }

    #[test]
    fn agreeing_models_average_confidence() {
        // rf: 0.8 Healthy; xgb: e^2 / (2 + e^2) Healthy
        let result = engine().predict_disease(&json!({})).unwrap();
        let xgb = 2f64.exp() / (2.0 + 2f64.exp());
        let expected = (0.8 + xgb) / 2.0;
        assert!((result.model_confidence - expected * 100.0).abs() < 1e-9);
        assert_eq!(result.confidence_level, ConfidenceLevel::Medium);
    }

    #[test]
    fn disagreeing_models_take_the_more_confident() {
        // rf: Fever 0.6; xgb: Hypertension ~0.91
        let engine = engine_with(disease_model(vec![6.0, 2.0, 2.0], vec![0.0, 0.0, 3.0]));
        let result = engine.predict_disease(&json!({})).unwrap();
        assert_eq!(result.predicted_disease, "Hypertension");
        assert_eq!(result.confidence_level, ConfidenceLevel::High);
    }

    #[test]
    fn equal_confidence_disagreement_prefers_model_a() {
        let mut model = disease_model(vec![1.0, 1.0, 1.0], vec![0.0, 0.0, 0.0]);
        model.models = DiseaseModels {
            random_forest: constant_forest(vec![1.0, 0.0, 1.0], FEATURE_COUNT),
            xgboost: constant_forest(vec![0.0, 1.0, 1.0], FEATURE_COUNT),
        };
        let result = engine_with(model).predict_disease(&json!({})).unwrap();
        assert_eq!(result.predicted_disease, "Fever");
        assert_eq!(result.model_confidence, 50.0);
        assert_eq!(result.confidence_level, ConfidenceLevel::Low);
    }

    #[test]
    fn risk_factors_counted_from_metrics() {
        let data = json!({
            "age": 45,
            "bloodPressure": 150,
            "heartRate": "95",
            "temperature": 98.6,
            "weight": 80,
            "height": 175
        });
        let result = engine().predict_disease(&data).unwrap();
        assert_eq!(result.risk_factors_identified, 2);
        assert_eq!(result.risk_score, 50);
        assert_eq!(result.health_data, data);
    }

    #[test]
    fn invalid_metric_is_invalid_input() {
        let err = engine()
            .predict_disease(&json!({"temperature": "warm"}))
            .unwrap_err();
        assert!(matches!(err, InferenceError::InvalidInput(_)));
    }

    // ── Treatment lookup ───────────────────────────────────

    #[test]
    fn treatment_exact_match_has_no_note() {
        let lookup = engine().get_treatment_info("Diabetes").unwrap();
        let TreatmentLookup::Exact(info) = lookup else {
            panic!("expected exact match, got {lookup:?}");
        };
        assert_eq!(info.disease_name, "Diabetes");
        assert_eq!(info.note, None);
        assert_eq!(info.medications, vec!["Diabetes-mab"]);
    }

    #[test]
    fn treatment_substring_match_is_partial() {
        let lookup = engine().get_treatment_info("hyper").unwrap();
        let TreatmentLookup::Partial(info) = lookup else {
            panic!("expected partial match, got {lookup:?}");
        };
        assert_eq!(info.disease_name, "Hypertension");
        assert_eq!(info.note, Some(PARTIAL_MATCH_NOTE));
        assert!(info.is_partial());
    }

    #[test]
    fn treatment_not_found_lists_all_diseases() {
        let lookup = engine().get_treatment_info("Scurvy").unwrap();
        match lookup {
            TreatmentLookup::NotFound {
                disease_name,
                available_diseases,
                ..
            } => {
                assert_eq!(disease_name, "Scurvy");
                assert_eq!(available_diseases, sample_table().disease_names());
            }
            other => panic!("expected not found, got {other:?}"),
        }
    }

    #[test]
    fn load_default_reads_the_configured_models_dir() {
        let default_dir = crate::config::default_models_dir();
        match InferenceEngine::load_default() {
            Ok(engine) => assert_eq!(engine.models_dir(), default_dir.as_path()),
            Err(LoadError::ModelsNotFound { path, .. }) => assert!(path.starts_with(&default_dir)),
            // Artifacts exist on this machine but are unusable; still the default dir.
            Err(_) => assert!(default_dir.exists()),
        }
    }

    // ── Metadata & health ──────────────────────────────────

    #[test]
    fn model_info_reads_metadata_file() {
        let dir = tempfile::tempdir().unwrap();
        write_all(dir.path());
        let engine = InferenceEngine::load(dir.path()).unwrap();
        let info = engine.get_model_info().unwrap();
        // The treatment table is a lookup, not a model.
        assert_eq!(info.models_loaded, 2);
        assert_eq!(info.model_details["symptom_checker"]["type"], "RandomForest");
    }

    #[test]
    fn missing_model_info_is_non_fatal() {
        let engine = engine();
        let err = engine.get_model_info().unwrap_err();
        assert!(matches!(err, InferenceError::MetadataUnavailable(_)));
        assert!(engine.predict_symptoms("fever").is_ok());
    }

    #[test]
    fn engine_is_shareable_across_threads() {
        let engine = std::sync::Arc::new(engine());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let engine = engine.clone();
                std::thread::spawn(move || engine.predict_symptoms("fever").unwrap())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap().predicted_disease, "Flu");
        }
    }
}
