//! Prediction report data structures

use crate::artifacts::key::ModelKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Two-way risk classification derived from a model label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    #[serde(rename = "Low risk of heart disease")]
    Low,
    #[serde(rename = "High risk of heart disease")]
    High,
}

impl RiskLevel {
    /// Map a model label (0 or 1) to its risk level.
    pub fn from_label(label: u8) -> Self {
        if label == 1 {
            RiskLevel::High
        } else {
            RiskLevel::Low
        }
    }

    /// Human-readable risk phrase.
    pub fn phrase(&self) -> &'static str {
        match self {
            RiskLevel::High => "High risk of heart disease",
            RiskLevel::Low => "Low risk of heart disease",
        }
    }

    /// Fixed recommendation text for this risk level.
    pub fn recommendation(&self) -> &'static str {
        match self {
            RiskLevel::High => {
                "Please consult a healthcare professional for a thorough evaluation."
            }
            RiskLevel::Low => {
                "Continue maintaining a healthy lifestyle with regular check-ups."
            }
        }
    }
}

/// Result of a single model's prediction.
///
/// A failed model keeps its slot in the report: `prediction` is absent and
/// `error` carries the description. `probability` is absent when the model
/// has no probability capability, never defaulted to 0.0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelOutcome {
    /// Predicted label (0 = low risk, 1 = high risk), absent on error
    pub prediction: Option<u8>,
    /// Probability of the predicted label, if the model supports it
    pub probability: Option<f64>,
    /// Risk phrase for the predicted label
    pub risk_level: Option<RiskLevel>,
    /// Error description when prediction failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ModelOutcome {
    /// Outcome for a successful prediction.
    pub fn labeled(label: u8, probability: Option<f64>) -> Self {
        Self {
            prediction: Some(label),
            probability,
            risk_level: Some(RiskLevel::from_label(label)),
            error: None,
        }
    }

    /// Outcome for a model whose prediction failed.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            prediction: None,
            probability: None,
            risk_level: None,
            error: Some(error.into()),
        }
    }

    /// True when this outcome carries a usable label.
    pub fn is_valid(&self) -> bool {
        self.prediction.is_some()
    }
}

/// Majority vote across all valid model outcomes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Consensus {
    /// Majority label, absent when no model produced a valid prediction
    pub prediction: Option<u8>,
    /// Risk phrase for the majority label
    pub risk_level: Option<RiskLevel>,
    /// Share of valid predictions on the winning side, 0-100
    pub agreement_pct: f64,
    /// Fixed recommendation text derived from the consensus label
    pub recommendation: Option<String>,
}

impl Consensus {
    /// The undefined consensus returned when no valid outcomes exist.
    pub fn unavailable() -> Self {
        Self {
            prediction: None,
            risk_level: None,
            agreement_pct: 0.0,
            recommendation: None,
        }
    }
}

/// Full ensemble response: one outcome per loaded model plus the consensus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsembleReport {
    /// Per-model outcomes, keyed by canonical model name
    pub predictions: BTreeMap<ModelKey, ModelOutcome>,
    /// Majority vote over the valid outcomes
    pub consensus: Consensus,
}

/// Catalog health as exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Healthy,
    Degraded,
}

/// Health surface: loaded-model count and derived status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: ServiceStatus,
    pub models_loaded: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_level_from_label() {
        assert_eq!(RiskLevel::from_label(1), RiskLevel::High);
        assert_eq!(RiskLevel::from_label(0), RiskLevel::Low);
    }

    #[test]
    fn test_risk_level_serializes_as_phrase() {
        let json = serde_json::to_string(&RiskLevel::High).unwrap();
        assert_eq!(json, "\"High risk of heart disease\"");

        let back: RiskLevel = serde_json::from_str(&json).unwrap();
        assert_eq!(back, RiskLevel::High);
    }

    #[test]
    fn test_failed_outcome_has_no_label() {
        let outcome = ModelOutcome::failed("inference blew up");

        assert!(!outcome.is_valid());
        assert!(outcome.prediction.is_none());
        assert!(outcome.probability.is_none());
        assert_eq!(outcome.error.as_deref(), Some("inference blew up"));
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = ModelOutcome::labeled(1, Some(0.87));

        let json = serde_json::to_string(&outcome).unwrap();
        let deserialized: ModelOutcome = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized.prediction, Some(1));
        assert_eq!(deserialized.probability, Some(0.87));
        assert_eq!(deserialized.risk_level, Some(RiskLevel::High));
        // error is skipped entirely when absent
        assert!(!json.contains("error"));
    }

    #[test]
    fn test_unavailable_consensus() {
        let consensus = Consensus::unavailable();
        assert!(consensus.prediction.is_none());
        assert!(consensus.risk_level.is_none());
        assert_eq!(consensus.agreement_pct, 0.0);
    }
}
