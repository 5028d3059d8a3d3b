//! Error types for the prediction engine

use crate::artifacts::key::ModelKey;
use crate::artifacts::scaler::ScalerKind;
use thiserror::Error;

/// Errors produced by the artifact store and the ensemble predictor.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Artifact file exists but cannot be read or parsed. Load of that
    /// entry aborts; the rest of the catalog is unaffected.
    #[error("corrupt artifact {name}: {reason}")]
    ArtifactCorrupt { name: String, reason: String },

    /// Requested model key is not in the catalog. Client error, not a
    /// server fault.
    #[error("model '{0}' not found")]
    ModelNotFound(ModelKey),

    /// The scaler a model depends on was not loaded.
    #[error("scaler '{0}' not available")]
    ScalerUnavailable(ScalerKind),

    /// Transform or inference failed for a single model.
    #[error("prediction failed: {0}")]
    Prediction(String),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("ONNX runtime error: {0}")]
    Onnx(#[from] ort::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EngineError>;
