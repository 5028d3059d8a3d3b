//! Typed model keys for the artifact catalog

use crate::artifacts::scaler::ScalerKind;
use serde::de::{self, Deserialize, Deserializer};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Classifier algorithm family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ModelFamily {
    Knn,
    LogisticRegression,
    NaiveBayes,
    RandomForest,
}

impl ModelFamily {
    pub const ALL: [ModelFamily; 4] = [
        ModelFamily::Knn,
        ModelFamily::LogisticRegression,
        ModelFamily::NaiveBayes,
        ModelFamily::RandomForest,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelFamily::Knn => "knn",
            ModelFamily::LogisticRegression => "logistic_regression",
            ModelFamily::NaiveBayes => "naive_bayes",
            ModelFamily::RandomForest => "random_forest",
        }
    }
}

/// Feature-normalization convention a model was trained against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScalingKind {
    /// Standardization (zero mean, unit variance)
    Scaled,
    /// Min-max scaling to [0, 1]
    Normalized,
}

impl ScalingKind {
    pub const ALL: [ScalingKind; 2] = [ScalingKind::Scaled, ScalingKind::Normalized];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScalingKind::Scaled => "scaled",
            ScalingKind::Normalized => "normalized",
        }
    }

    /// The scaler each scaling convention requires. Fixed mapping, not
    /// configurable per call.
    pub fn scaler_kind(&self) -> ScalerKind {
        match self {
            ScalingKind::Scaled => ScalerKind::Standard,
            ScalingKind::Normalized => ScalerKind::MinMax,
        }
    }
}

/// Composite key identifying one classifier artifact.
///
/// Replaces the legacy substring convention (`'_scaled' in key`) with an
/// explicit `(family, scaling)` pair; the canonical string form
/// `{family}_{scaling}` is only a wire representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModelKey {
    pub family: ModelFamily,
    pub scaling: ScalingKind,
}

impl ModelKey {
    pub fn new(family: ModelFamily, scaling: ScalingKind) -> Self {
        Self { family, scaling }
    }

    /// All 8 canonical keys (4 families x 2 scalings), in catalog order.
    pub fn catalog() -> impl Iterator<Item = ModelKey> {
        ModelFamily::ALL.into_iter().flat_map(|family| {
            ScalingKind::ALL
                .into_iter()
                .map(move |scaling| ModelKey::new(family, scaling))
        })
    }

    /// Artifact filename for this model, by naming convention.
    pub fn model_filename(&self) -> String {
        format!("{}_model_{}.onnx", self.family.as_str(), self.scaling.as_str())
    }
}

impl fmt::Display for ModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.family.as_str(), self.scaling.as_str())
    }
}

impl FromStr for ModelKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Family names contain underscores, so split on the known suffix.
        let (family_str, scaling) = if let Some(prefix) = s.strip_suffix("_scaled") {
            (prefix, ScalingKind::Scaled)
        } else if let Some(prefix) = s.strip_suffix("_normalized") {
            (prefix, ScalingKind::Normalized)
        } else {
            return Err(format!("unknown scaling suffix in model key '{s}'"));
        };

        let family = ModelFamily::ALL
            .into_iter()
            .find(|f| f.as_str() == family_str)
            .ok_or_else(|| format!("unknown model family '{family_str}'"))?;

        Ok(ModelKey::new(family, scaling))
    }
}

// String form in JSON so keys read as "knn_scaled" in report maps.
impl Serialize for ModelKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ModelKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}
