//! Heart-Disease Ensemble Prediction Core
//!
//! Loads pre-trained binary heart-disease classifiers exported as ONNX
//! artifacts, routes feature vectors through the scaling transform each
//! model was trained against, and combines per-model predictions into a
//! majority-vote consensus with an agreement score.

pub mod artifacts;
pub mod config;
pub mod error;
pub mod predictor;
pub mod types;

pub use artifacts::{ArtifactStore, Classifier, ModelFamily, ModelKey, ScalerKind, ScalingKind};
pub use config::AppConfig;
pub use error::{EngineError, Result};
pub use predictor::EnsemblePredictor;
pub use types::{Consensus, EnsembleReport, HealthStatus, ModelOutcome, PatientRecord, RiskLevel};
