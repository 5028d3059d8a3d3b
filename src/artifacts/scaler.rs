//! Fitted feature-scaling transforms
//!
//! Scaler parameters are exported at training time as JSON artifacts and
//! are never refit at inference time.

use crate::error::{EngineError, Result};
use crate::types::FEATURE_COUNT;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

/// Scaling technique, matching the artifact naming convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScalerKind {
    /// Standardization: (x - mean) / scale
    Standard,
    /// Min-max normalization: (x - min) / (max - min)
    MinMax,
}

impl ScalerKind {
    pub const ALL: [ScalerKind; 2] = [ScalerKind::Standard, ScalerKind::MinMax];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScalerKind::Standard => "standard",
            ScalerKind::MinMax => "minmax",
        }
    }

    /// Artifact filename for this scaler, by naming convention.
    pub fn filename(&self) -> &'static str {
        match self {
            ScalerKind::Standard => "standard_scaler.json",
            ScalerKind::MinMax => "minmax_scaler.json",
        }
    }
}

impl fmt::Display for ScalerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fitted parameters of a standard scaler.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StandardParams {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

/// Fitted parameters of a min-max scaler.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct MinMaxParams {
    data_min: Vec<f64>,
    data_max: Vec<f64>,
}

/// A fitted, stateless-at-inference feature transform.
#[derive(Debug, Clone)]
pub enum FeatureScaler {
    Standard(StandardScaler),
    MinMax(MinMaxScaler),
}

#[derive(Debug, Clone)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct MinMaxScaler {
    data_min: Vec<f64>,
    data_max: Vec<f64>,
}

impl FeatureScaler {
    /// Load a scaler's fitted parameters from a JSON artifact.
    ///
    /// An unreadable or malformed file is an `ArtifactCorrupt` error;
    /// existence checks belong to the caller.
    pub fn load(path: &Path, kind: ScalerKind) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| EngineError::ArtifactCorrupt {
            name: kind.filename().to_string(),
            reason: e.to_string(),
        })?;

        let scaler = match kind {
            ScalerKind::Standard => {
                let params: StandardParams =
                    serde_json::from_str(&raw).map_err(|e| EngineError::ArtifactCorrupt {
                        name: kind.filename().to_string(),
                        reason: e.to_string(),
                    })?;
                check_len(kind, "mean", params.mean.len())?;
                check_len(kind, "scale", params.scale.len())?;
                FeatureScaler::Standard(StandardScaler {
                    mean: params.mean,
                    scale: params.scale,
                })
            }
            ScalerKind::MinMax => {
                let params: MinMaxParams =
                    serde_json::from_str(&raw).map_err(|e| EngineError::ArtifactCorrupt {
                        name: kind.filename().to_string(),
                        reason: e.to_string(),
                    })?;
                check_len(kind, "data_min", params.data_min.len())?;
                check_len(kind, "data_max", params.data_max.len())?;
                FeatureScaler::MinMax(MinMaxScaler {
                    data_min: params.data_min,
                    data_max: params.data_max,
                })
            }
        };

        Ok(scaler)
    }

    /// Transform one feature vector using the fitted parameters.
    pub fn transform(&self, features: &[f32; FEATURE_COUNT]) -> [f32; FEATURE_COUNT] {
        let mut out = [0.0f32; FEATURE_COUNT];

        match self {
            FeatureScaler::Standard(s) => {
                for (i, &x) in features.iter().enumerate() {
                    // Zero-variance columns are left unscaled, matching the
                    // training-time convention.
                    let scale = if s.scale[i] == 0.0 { 1.0 } else { s.scale[i] };
                    out[i] = ((f64::from(x) - s.mean[i]) / scale) as f32;
                }
            }
            FeatureScaler::MinMax(s) => {
                for (i, &x) in features.iter().enumerate() {
                    let range = s.data_max[i] - s.data_min[i];
                    let range = if range == 0.0 { 1.0 } else { range };
                    out[i] = ((f64::from(x) - s.data_min[i]) / range) as f32;
                }
            }
        }

        out
    }
}

fn check_len(kind: ScalerKind, field: &str, len: usize) -> Result<()> {
    if len != FEATURE_COUNT {
        return Err(EngineError::ArtifactCorrupt {
            name: kind.filename().to_string(),
            reason: format!("{field} has {len} entries, expected {FEATURE_COUNT}"),
        });
    }
    Ok(())
}
