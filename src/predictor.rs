//! Multi-model ensemble prediction and consensus

use crate::artifacts::key::ModelKey;
use crate::artifacts::onnx::Classifier;
use crate::artifacts::store::ArtifactStore;
use crate::error::{EngineError, Result};
use crate::types::report::{Consensus, EnsembleReport, HealthStatus, ModelOutcome, RiskLevel, ServiceStatus};
use crate::types::{PatientRecord, FEATURE_COUNT};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Full catalog size: 4 families x 2 scalings.
const FULL_CATALOG: usize = 8;
const FULL_SCALERS: usize = 2;

/// Ensemble predictor over an immutable artifact catalog.
///
/// Stateless per request: every call works on request-scoped data and a
/// shared read-only store, so concurrent callers need no locking.
pub struct EnsemblePredictor {
    store: ArtifactStore,
}

impl EnsemblePredictor {
    pub fn new(store: ArtifactStore) -> Self {
        Self { store }
    }

    /// Keys of all models available for prediction.
    pub fn model_keys(&self) -> Vec<ModelKey> {
        self.store.model_keys()
    }

    /// Health surface: loaded-model count plus healthy/degraded status.
    ///
    /// Healthy means the full catalog (8 models, 2 scalers) loaded cleanly.
    pub fn health(&self) -> HealthStatus {
        let complete = self.store.model_count() == FULL_CATALOG
            && self.store.scaler_count() == FULL_SCALERS
            && self.store.load_errors().is_empty();

        HealthStatus {
            status: if complete {
                ServiceStatus::Healthy
            } else {
                ServiceStatus::Degraded
            },
            models_loaded: self.store.model_count(),
        }
    }

    /// Predict with a single model.
    ///
    /// Fails with `ModelNotFound` when the key is not in the catalog,
    /// before any transform runs; any other failure surfaces as a
    /// prediction error for the caller to report.
    pub fn predict_one(&self, record: &PatientRecord, key: &ModelKey) -> Result<ModelOutcome> {
        let model = self
            .store
            .get_model(key)
            .ok_or(EngineError::ModelNotFound(*key))?;

        self.run_model(model, key, &record.to_features())
    }

    /// Predict with every loaded model and compute the consensus.
    ///
    /// Models are independent: a failing model contributes an outcome with
    /// an error description instead of aborting the ensemble.
    pub fn predict_all(&self, record: &PatientRecord) -> EnsembleReport {
        let features = record.to_features();
        let mut predictions = BTreeMap::new();

        for (key, model) in self.store.models() {
            let outcome = match self.run_model(model, &key, &features) {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(model = %key, error = %e, "Model prediction failed");
                    ModelOutcome::failed(e.to_string())
                }
            };
            predictions.insert(key, outcome);
        }

        let consensus = Self::consensus(&predictions);
        EnsembleReport {
            predictions,
            consensus,
        }
    }

    /// Majority vote over the valid outcomes.
    ///
    /// Undefined (all fields absent, agreement 0) when no model produced a
    /// label. Ties resolve to the low-risk label; agreement is the winning
    /// side's share of valid predictions.
    pub fn consensus(outcomes: &BTreeMap<ModelKey, ModelOutcome>) -> Consensus {
        let valid: Vec<u8> = outcomes
            .values()
            .filter_map(|o| o.prediction)
            .collect();

        if valid.is_empty() {
            return Consensus::unavailable();
        }

        let positive = valid.iter().filter(|&&label| label == 1).count();
        let total = valid.len();

        let label = u8::from(positive as f64 / total as f64 > 0.5);
        let agreement_pct = positive.max(total - positive) as f64 / total as f64 * 100.0;
        let risk = RiskLevel::from_label(label);

        Consensus {
            prediction: Some(label),
            risk_level: Some(risk),
            agreement_pct,
            recommendation: Some(risk.recommendation().to_string()),
        }
    }

    /// Scale, predict, and (where supported) fetch the probability for one
    /// model. The scaler is chosen by the model's training regime.
    fn run_model(
        &self,
        model: &dyn Classifier,
        key: &ModelKey,
        features: &[f32; FEATURE_COUNT],
    ) -> Result<ModelOutcome> {
        let scaler_kind = key.scaling.scaler_kind();
        let scaler = self
            .store
            .get_scaler(scaler_kind)
            .ok_or(EngineError::ScalerUnavailable(scaler_kind))?;

        let scaled = scaler.transform(features);
        let label = model.predict(&scaled)?;

        let probability = if model.supports_probability() {
            match model.probability_of(&scaled, label) {
                Ok(p) => Some(p),
                Err(e) => {
                    // Label stands; probability is simply unknown.
                    warn!(model = %key, error = %e, "Probability retrieval failed");
                    None
                }
            }
        } else {
            None
        };

        debug!(model = %key, label = label, probability = ?probability, "Model outcome");
        Ok(ModelOutcome::labeled(label, probability))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::key::{ModelFamily, ScalingKind};
    use crate::artifacts::scaler::{FeatureScaler, ScalerKind};
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    /// Test double returning a fixed label, optionally with a probability
    /// or a forced failure.
    struct FakeClassifier {
        label: u8,
        probability: Option<f64>,
        fail_predict: bool,
        fail_probability: bool,
        seen: Option<Arc<Mutex<Vec<[f32; FEATURE_COUNT]>>>>,
    }

    impl FakeClassifier {
        fn labeled(label: u8, probability: Option<f64>) -> Self {
            Self {
                label,
                probability,
                fail_predict: false,
                fail_probability: false,
                seen: None,
            }
        }

        fn failing() -> Self {
            Self {
                label: 0,
                probability: None,
                fail_predict: true,
                fail_probability: false,
                seen: None,
            }
        }
    }

    impl Classifier for FakeClassifier {
        fn predict(&self, features: &[f32; FEATURE_COUNT]) -> Result<u8> {
            if let Some(seen) = &self.seen {
                seen.lock().unwrap().push(*features);
            }
            if self.fail_predict {
                return Err(EngineError::Prediction("synthetic inference failure".into()));
            }
            Ok(self.label)
        }

        fn supports_probability(&self) -> bool {
            self.probability.is_some() || self.fail_probability
        }

        fn probability_of(&self, _features: &[f32; FEATURE_COUNT], _label: u8) -> Result<f64> {
            if self.fail_probability {
                return Err(EngineError::Prediction("probability unavailable".into()));
            }
            self.probability
                .ok_or_else(|| EngineError::Prediction("no probability".into()))
        }
    }

    fn identity_scalers() -> BTreeMap<ScalerKind, FeatureScaler> {
        let dir = tempfile::tempdir().unwrap();
        write_scaler_fixtures(dir.path());
        let mut scalers = BTreeMap::new();
        for kind in ScalerKind::ALL {
            scalers.insert(
                kind,
                FeatureScaler::load(&dir.path().join(kind.filename()), kind).unwrap(),
            );
        }
        scalers
    }

    fn write_scaler_fixtures(dir: &Path) {
        let standard = serde_json::json!({
            "mean": vec![0.0; FEATURE_COUNT],
            "scale": vec![1.0; FEATURE_COUNT],
        });
        std::fs::write(dir.join("standard_scaler.json"), standard.to_string()).unwrap();
        let minmax = serde_json::json!({
            "data_min": vec![0.0; FEATURE_COUNT],
            "data_max": vec![1.0; FEATURE_COUNT],
        });
        std::fs::write(dir.join("minmax_scaler.json"), minmax.to_string()).unwrap();
    }

    fn predictor_with(
        models: Vec<(ModelKey, FakeClassifier)>,
    ) -> EnsemblePredictor {
        let mut map: BTreeMap<ModelKey, Box<dyn Classifier>> = BTreeMap::new();
        for (key, model) in models {
            map.insert(key, Box::new(model));
        }
        EnsemblePredictor::new(ArtifactStore::from_parts(map, identity_scalers()))
    }

    fn key(family: ModelFamily, scaling: ScalingKind) -> ModelKey {
        ModelKey::new(family, scaling)
    }

    fn sample_record() -> PatientRecord {
        PatientRecord {
            age: 63.0,
            sex: 1,
            cp: 3,
            trestbps: 145.0,
            chol: 233.0,
            fbs: 1,
            restecg: 0,
            thalach: 150.0,
            exang: 0,
            oldpeak: 2.3,
            slope: 0,
            ca: 0,
            thal: 1,
        }
    }

    #[test]
    fn test_one_outcome_per_loaded_model() {
        let predictor = predictor_with(vec![
            (key(ModelFamily::Knn, ScalingKind::Scaled), FakeClassifier::labeled(1, Some(0.9))),
            (key(ModelFamily::NaiveBayes, ScalingKind::Normalized), FakeClassifier::labeled(0, Some(0.6))),
            (key(ModelFamily::RandomForest, ScalingKind::Scaled), FakeClassifier::failing()),
        ]);

        let report = predictor.predict_all(&sample_record());

        assert_eq!(report.predictions.len(), 3);
        for outcome in report.predictions.values() {
            match outcome.prediction {
                Some(label) => assert!(label <= 1),
                None => assert!(outcome.error.is_some()),
            }
        }
    }

    #[test]
    fn test_consensus_three_of_four() {
        let predictor = predictor_with(vec![
            (key(ModelFamily::Knn, ScalingKind::Scaled), FakeClassifier::labeled(1, None)),
            (key(ModelFamily::LogisticRegression, ScalingKind::Scaled), FakeClassifier::labeled(1, None)),
            (key(ModelFamily::NaiveBayes, ScalingKind::Scaled), FakeClassifier::labeled(1, None)),
            (key(ModelFamily::RandomForest, ScalingKind::Scaled), FakeClassifier::labeled(0, None)),
        ]);

        let report = predictor.predict_all(&sample_record());

        assert_eq!(report.consensus.prediction, Some(1));
        assert_eq!(report.consensus.risk_level, Some(RiskLevel::High));
        assert_eq!(report.consensus.agreement_pct, 75.0);
        assert_eq!(
            report.consensus.recommendation.as_deref(),
            Some("Please consult a healthcare professional for a thorough evaluation.")
        );
    }

    #[test]
    fn test_consensus_tie_resolves_low() {
        let predictor = predictor_with(vec![
            (key(ModelFamily::Knn, ScalingKind::Scaled), FakeClassifier::labeled(1, None)),
            (key(ModelFamily::NaiveBayes, ScalingKind::Scaled), FakeClassifier::labeled(0, None)),
        ]);

        let report = predictor.predict_all(&sample_record());

        assert_eq!(report.consensus.prediction, Some(0));
        assert_eq!(report.consensus.risk_level, Some(RiskLevel::Low));
        assert_eq!(report.consensus.agreement_pct, 50.0);
    }

    #[test]
    fn test_no_consensus_when_every_model_fails() {
        let predictor = predictor_with(vec![(
            key(ModelFamily::Knn, ScalingKind::Scaled),
            FakeClassifier::failing(),
        )]);

        let report = predictor.predict_all(&sample_record());

        assert_eq!(report.predictions.len(), 1);
        let outcome = report.predictions.values().next().unwrap();
        assert!(outcome.prediction.is_none());
        assert!(outcome.error.is_some());

        assert!(report.consensus.prediction.is_none());
        assert!(report.consensus.risk_level.is_none());
        assert_eq!(report.consensus.agreement_pct, 0.0);
    }

    #[test]
    fn test_agreement_bounds() {
        let predictor = predictor_with(vec![
            (key(ModelFamily::Knn, ScalingKind::Scaled), FakeClassifier::labeled(0, None)),
            (key(ModelFamily::LogisticRegression, ScalingKind::Scaled), FakeClassifier::labeled(0, None)),
            (key(ModelFamily::NaiveBayes, ScalingKind::Scaled), FakeClassifier::labeled(1, None)),
        ]);

        let report = predictor.predict_all(&sample_record());
        let agreement = report.consensus.agreement_pct;

        assert!((50.0..=100.0).contains(&agreement));
        assert!((agreement - 66.666).abs() < 0.01);
    }

    #[test]
    fn test_unknown_key_is_not_found_before_any_transform() {
        // No scalers at all: if lookup did not short-circuit, this would
        // surface as a scaler error instead.
        let predictor = EnsemblePredictor::new(ArtifactStore::from_parts(
            BTreeMap::new(),
            BTreeMap::new(),
        ));

        let err = predictor
            .predict_one(&sample_record(), &key(ModelFamily::Knn, ScalingKind::Scaled))
            .unwrap_err();

        assert!(matches!(err, EngineError::ModelNotFound(_)));
    }

    #[test]
    fn test_missing_probability_capability_yields_absent() {
        let predictor = predictor_with(vec![(
            key(ModelFamily::Knn, ScalingKind::Normalized),
            FakeClassifier::labeled(1, None),
        )]);

        let outcome = predictor
            .predict_one(&sample_record(), &key(ModelFamily::Knn, ScalingKind::Normalized))
            .unwrap();

        assert_eq!(outcome.prediction, Some(1));
        assert_eq!(outcome.probability, None);
        assert_eq!(outcome.risk_level, Some(RiskLevel::High));
    }

    #[test]
    fn test_probability_retrieval_failure_keeps_label() {
        let mut model = FakeClassifier::labeled(0, None);
        model.fail_probability = true;
        let predictor = predictor_with(vec![(key(ModelFamily::Knn, ScalingKind::Scaled), model)]);

        let outcome = predictor
            .predict_one(&sample_record(), &key(ModelFamily::Knn, ScalingKind::Scaled))
            .unwrap();

        assert_eq!(outcome.prediction, Some(0));
        assert_eq!(outcome.probability, None);
        assert!(outcome.error.is_none());
    }

    #[test]
    fn test_missing_scaler_fails_only_that_model() {
        let scaled_key = key(ModelFamily::RandomForest, ScalingKind::Scaled);
        let normalized_key = key(ModelFamily::Knn, ScalingKind::Normalized);

        let mut models: BTreeMap<ModelKey, Box<dyn Classifier>> = BTreeMap::new();
        models.insert(scaled_key, Box::new(FakeClassifier::labeled(1, None)));
        models.insert(normalized_key, Box::new(FakeClassifier::labeled(0, None)));

        // Only the minmax scaler is present.
        let mut scalers = identity_scalers();
        scalers.remove(&ScalerKind::Standard);

        let predictor = EnsemblePredictor::new(ArtifactStore::from_parts(models, scalers));
        let report = predictor.predict_all(&sample_record());

        let failed = &report.predictions[&scaled_key];
        assert!(failed.prediction.is_none());
        assert!(failed.error.as_deref().unwrap().contains("standard"));

        let ok = &report.predictions[&normalized_key];
        assert_eq!(ok.prediction, Some(0));

        // consensus still computed from the surviving model
        assert_eq!(report.consensus.prediction, Some(0));
        assert_eq!(report.consensus.agreement_pct, 100.0);
    }

    #[test]
    fn test_scaler_routed_by_training_regime() {
        let seen_scaled = Arc::new(Mutex::new(Vec::new()));
        let seen_normalized = Arc::new(Mutex::new(Vec::new()));

        let mut scaled_model = FakeClassifier::labeled(1, None);
        scaled_model.seen = Some(seen_scaled.clone());
        let mut normalized_model = FakeClassifier::labeled(1, None);
        normalized_model.seen = Some(seen_normalized.clone());

        // Distinguishable scalers: standard shifts by 10, minmax divides by 100.
        let dir = tempfile::tempdir().unwrap();
        let standard = serde_json::json!({
            "mean": vec![10.0; FEATURE_COUNT],
            "scale": vec![1.0; FEATURE_COUNT],
        });
        std::fs::write(dir.path().join("standard_scaler.json"), standard.to_string()).unwrap();
        let minmax = serde_json::json!({
            "data_min": vec![0.0; FEATURE_COUNT],
            "data_max": vec![100.0; FEATURE_COUNT],
        });
        std::fs::write(dir.path().join("minmax_scaler.json"), minmax.to_string()).unwrap();

        let mut scalers = BTreeMap::new();
        for kind in ScalerKind::ALL {
            scalers.insert(
                kind,
                FeatureScaler::load(&dir.path().join(kind.filename()), kind).unwrap(),
            );
        }

        let mut models: BTreeMap<ModelKey, Box<dyn Classifier>> = BTreeMap::new();
        models.insert(key(ModelFamily::Knn, ScalingKind::Scaled), Box::new(scaled_model));
        models.insert(key(ModelFamily::Knn, ScalingKind::Normalized), Box::new(normalized_model));

        let predictor = EnsemblePredictor::new(ArtifactStore::from_parts(models, scalers));
        predictor.predict_all(&sample_record());

        // age = 63 -> standard: 53.0, minmax: 0.63
        let scaled_features = seen_scaled.lock().unwrap();
        assert!((scaled_features[0][0] - 53.0).abs() < 1e-6);
        let normalized_features = seen_normalized.lock().unwrap();
        assert!((normalized_features[0][0] - 0.63).abs() < 1e-6);
    }

    #[test]
    fn test_repeated_prediction_is_deterministic() {
        let predictor = predictor_with(vec![
            (key(ModelFamily::Knn, ScalingKind::Scaled), FakeClassifier::labeled(1, Some(0.91))),
            (key(ModelFamily::NaiveBayes, ScalingKind::Normalized), FakeClassifier::labeled(0, Some(0.7))),
        ]);
        let record = sample_record();
        let k = key(ModelFamily::Knn, ScalingKind::Scaled);

        let first = predictor.predict_one(&record, &k).unwrap();
        let second = predictor.predict_one(&record, &k).unwrap();

        assert_eq!(first.prediction, second.prediction);
        assert_eq!(first.probability, second.probability);
        assert_eq!(first.risk_level, second.risk_level);
    }

    #[test]
    fn test_health_degraded_on_partial_catalog() {
        let predictor = predictor_with(vec![(
            key(ModelFamily::Knn, ScalingKind::Scaled),
            FakeClassifier::labeled(1, None),
        )]);

        let health = predictor.health();
        assert_eq!(health.status, ServiceStatus::Degraded);
        assert_eq!(health.models_loaded, 1);
    }

    #[test]
    fn test_health_healthy_on_full_catalog() {
        let models: Vec<(ModelKey, FakeClassifier)> = ModelKey::catalog()
            .map(|k| (k, FakeClassifier::labeled(0, Some(0.8))))
            .collect();
        let predictor = predictor_with(models);

        let health = predictor.health();
        assert_eq!(health.status, ServiceStatus::Healthy);
        assert_eq!(health.models_loaded, 8);
    }

    #[test]
    fn test_report_serialization_uses_canonical_keys() {
        let predictor = predictor_with(vec![(
            key(ModelFamily::LogisticRegression, ScalingKind::Normalized),
            FakeClassifier::labeled(1, Some(0.8)),
        )]);

        let report = predictor.predict_all(&sample_record());
        let json = serde_json::to_string(&report).unwrap();

        assert!(json.contains("\"logistic_regression_normalized\""));
        assert!(json.contains("High risk of heart disease"));
    }
}
